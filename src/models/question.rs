use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub audio_url: Option<String>,
    pub statement: Option<String>,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct QuestionOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub image_url: String,
    pub is_correct: bool,
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<QuestionOption>,
}

/// A validated question ready to be written. Options are in authored order.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub audio_url: Option<String>,
    pub statement: Option<String>,
    pub options: Vec<NewOption>,
}

#[derive(Debug, Clone)]
pub struct NewOption {
    pub image_url: String,
    pub is_correct: bool,
}
