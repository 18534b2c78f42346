use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub exam_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssignmentDetail {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub exam_id: Uuid,
    pub exam_title: String,
    pub assigned_at: DateTime<Utc>,
}
