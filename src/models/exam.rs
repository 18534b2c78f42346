use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Exam {
    pub id: Uuid,
    pub title: String,
    pub teacher_id: Uuid,
    pub shuffle_questions: bool,
    pub created_at: DateTime<Utc>,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ExamChanges {
    pub title: Option<String>,
    pub shuffle_questions: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExamWithCount {
    pub id: Uuid,
    pub title: String,
    pub shuffle_questions: bool,
    pub created_at: DateTime<Utc>,
    pub question_count: i64,
}
