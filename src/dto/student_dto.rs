//! Wire types of the student API. Field names are camelCase.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::question::QuestionOption;
use crate::models::student::Student;
use crate::services::assignment_service::VisibleExam;
use crate::services::composer_service::ComposedQuestion;
use crate::services::submission_service::{ClaimedScore, SubmittedAnswer};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePinRequest {
    pub pin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    pub id: Uuid,
    pub name: String,
    pub pin: String,
    pub teacher_id: Uuid,
}

impl From<Student> for StudentView {
    fn from(s: Student) -> Self {
        Self {
            id: s.id,
            name: s.name,
            pin: s.pin,
            teacher_id: s.teacher_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidatePinResponse {
    pub student: StudentView,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetExamsRequest {
    pub student_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetExamsResponse {
    pub exams: Vec<VisibleExam>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetQuestionsRequest {
    pub exam_id: Uuid,
}

/// Correctness never leaves the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionView {
    pub id: Uuid,
    pub image_url: String,
    pub order_index: i32,
}

impl From<QuestionOption> for OptionView {
    fn from(o: QuestionOption) -> Self {
        Self {
            id: o.id,
            image_url: o.image_url,
            order_index: o.order_index,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    pub order_index: i32,
    pub options: Vec<OptionView>,
}

impl From<ComposedQuestion> for QuestionView {
    fn from(q: ComposedQuestion) -> Self {
        Self {
            id: q.id,
            audio_url: q.audio_url,
            statement: q.statement,
            order_index: q.order_index,
            options: q.options.into_iter().map(OptionView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetQuestionsResponse {
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswer {
    pub question_id: Uuid,
    pub option_id: Option<Uuid>,
    pub is_correct: Option<bool>,
}

impl From<SubmitAnswer> for SubmittedAnswer {
    fn from(a: SubmitAnswer) -> Self {
        Self {
            question_id: a.question_id,
            option_id: a.option_id,
            claimed_correct: a.is_correct,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamRequest {
    pub student_id: Uuid,
    pub exam_id: Uuid,
    pub score: Option<f64>,
    pub total_questions: Option<i32>,
    pub correct_answers: Option<i32>,
    #[serde(default)]
    pub answers: Vec<SubmitAnswer>,
}

impl SubmitExamRequest {
    pub fn claimed(&self) -> ClaimedScore {
        ClaimedScore {
            score: self.score,
            total_questions: self.total_questions,
            correct_answers: self.correct_answers,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamResponse {
    pub success: bool,
    pub score: f64,
    pub total_questions: i32,
    pub correct_answers: i32,
}
