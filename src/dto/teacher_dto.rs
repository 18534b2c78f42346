use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::question::NewOption;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStudentPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateExamPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub shuffle_questions: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateExamPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub shuffle_questions: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionPayload {
    pub image_url: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl From<OptionPayload> for NewOption {
    fn from(payload: OptionPayload) -> Self {
        NewOption {
            image_url: payload.image_url,
            is_correct: payload.is_correct,
        }
    }
}

/// Used for both creating and replacing a question.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuestionPayload {
    pub statement: Option<String>,
    pub audio_url: Option<String>,
    #[validate(length(min = 2, max = 4))]
    pub options: Vec<OptionPayload>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignExamPayload {
    pub exam_id: Uuid,
    #[validate(length(min = 1))]
    pub student_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(option_count: usize) -> QuestionPayload {
        let options: Vec<_> = (0..option_count)
            .map(|i| json!({"image_url": format!("{}.png", i), "is_correct": i == 0}))
            .collect();
        serde_json::from_value(json!({"statement": "Cat?", "options": options})).unwrap()
    }

    #[test]
    fn option_count_is_bounded() {
        assert!(payload(1).validate().is_err());
        assert!(payload(2).validate().is_ok());
        assert!(payload(4).validate().is_ok());
        let err = payload(5).validate().unwrap_err();
        assert!(err.field_errors().contains_key("options"));
    }
}
