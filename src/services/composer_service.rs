use rand::seq::SliceRandom;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::EntityStore;
use crate::error::{Error, Result};
use crate::models::question::{QuestionOption, MAX_OPTIONS, MIN_OPTIONS};
use crate::utils::random::RandomSource;

/// A question as presented in one attempt. `order_index` is the dense
/// position in this presentation, not the stored value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedQuestion {
    pub id: Uuid,
    pub audio_url: Option<String>,
    pub statement: Option<String>,
    pub order_index: i32,
    pub options: Vec<QuestionOption>,
}

#[derive(Clone)]
pub struct ComposerService {
    store: Arc<dyn EntityStore>,
    random: RandomSource,
}

impl ComposerService {
    pub fn new(store: Arc<dyn EntityStore>, random: RandomSource) -> Self {
        Self { store, random }
    }

    /// Loads an exam's questions with their options in stored order, then
    /// shuffles the questions when the exam asks for it. Options keep their
    /// authored order.
    pub async fn compose_exam(&self, exam_id: Uuid) -> Result<Vec<ComposedQuestion>> {
        let exam = self
            .store
            .get_exam(exam_id)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))?;

        let questions = self.store.list_questions(exam.id).await?;
        if questions.is_empty() {
            return Err(Error::NotFound("Exam has no questions".to_string()));
        }

        let mut composed = Vec::with_capacity(questions.len());
        for question in questions {
            let options = self.store.list_options(question.id).await?;
            check_options(question.id, &options)?;
            composed.push(ComposedQuestion {
                id: question.id,
                audio_url: question.audio_url,
                statement: question.statement,
                order_index: question.order_index,
                options,
            });
        }

        if exam.shuffle_questions {
            self.random.with(|rng| composed.shuffle(rng));
        }
        for (position, question) in composed.iter_mut().enumerate() {
            question.order_index = position as i32;
        }

        tracing::debug!(
            %exam_id,
            questions = composed.len(),
            shuffled = exam.shuffle_questions,
            "Exam composed"
        );
        Ok(composed)
    }
}

fn check_options(question_id: Uuid, options: &[QuestionOption]) -> Result<()> {
    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        return Err(Error::Integrity(format!(
            "question {} has {} options",
            question_id,
            options.len()
        )));
    }
    let correct = options.iter().filter(|o| o.is_correct).count();
    if correct != 1 {
        return Err(Error::Integrity(format!(
            "question {} has {} correct options",
            question_id, correct
        )));
    }
    Ok(())
}
