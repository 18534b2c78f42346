use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per (student, exam); a resubmission replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: Uuid,
    pub student_id: Uuid,
    pub exam_id: Uuid,
    pub score: f64,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    pub exam_title: String,
    pub student_name: String,
    pub student_pin: String,
    pub score: f64,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub completed_at: DateTime<Utc>,
}
