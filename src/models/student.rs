use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    /// Four ASCII digits, unique across all students.
    pub pin: String,
    pub teacher_id: Uuid,
    pub created_at: DateTime<Utc>,
}
