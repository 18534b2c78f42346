use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::exam_result::ExamResult;

/// One row per (student, question); a resubmission replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StudentAnswer {
    pub id: Uuid,
    pub student_id: Uuid,
    pub question_id: Uuid,
    pub selected_option_id: Option<Uuid>,
    pub is_correct: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradedAnswer {
    pub question_id: Uuid,
    pub selected_option_id: Option<Uuid>,
    pub is_correct: bool,
}

/// Everything written by one `submit`, applied as a single unit.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub student_id: Uuid,
    pub exam_id: Uuid,
    pub score: f64,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub answers: Vec<GradedAnswer>,
}

#[derive(Debug, Clone)]
pub struct RecordedSubmission {
    pub result: ExamResult,
    pub answers: Vec<StudentAnswer>,
}
