use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::services::composer_service::ComposedQuestion;

/// How long feedback for an answer stays up before the next question.
pub const DEFAULT_FEEDBACK_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    AwaitingSelection {
        question_index: usize,
    },
    Evaluated {
        question_index: usize,
        is_correct: bool,
        ready_at: Instant,
    },
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Accepted { is_correct: bool },
    /// Feedback is showing or the attempt is over.
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub question_id: Uuid,
    pub option_id: Uuid,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
    pub score: f64,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub answers: Vec<AnswerRecord>,
}

/// `correct / total * 100` rounded to two decimals, 0 for an empty log.
/// Stored scores are `NUMERIC(5,2)`, so every store sees the same value.
pub fn score_percentage(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (correct as f64 / total as f64 * 10_000.0).round() / 100.0
}

/// Drives a single attempt through its questions. Nothing is persisted here;
/// dropping the scorer discards the partial log.
#[derive(Debug)]
pub struct AttemptScorer {
    questions: Vec<ComposedQuestion>,
    feedback_delay: Duration,
    state: AttemptState,
    log: Vec<AnswerRecord>,
}

impl AttemptScorer {
    pub fn new(questions: Vec<ComposedQuestion>, feedback_delay: Duration) -> Result<Self> {
        if questions.is_empty() {
            return Err(Error::Invalid("An attempt needs at least one question".to_string()));
        }
        Ok(Self {
            questions,
            feedback_delay,
            state: AttemptState::AwaitingSelection { question_index: 0 },
            log: Vec::new(),
        })
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn current_question(&self) -> Option<&ComposedQuestion> {
        match self.state {
            AttemptState::AwaitingSelection { question_index }
            | AttemptState::Evaluated { question_index, .. } => self.questions.get(question_index),
            AttemptState::Complete => None,
        }
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.log
    }

    pub fn select(&mut self, option_id: Uuid, now: Instant) -> Result<Selection> {
        let AttemptState::AwaitingSelection { question_index } = self.state else {
            return Ok(Selection::Ignored);
        };
        let question = &self.questions[question_index];
        let option = question
            .options
            .iter()
            .find(|o| o.id == option_id)
            .ok_or_else(|| {
                Error::Invalid(format!(
                    "Option {} does not belong to question {}",
                    option_id, question.id
                ))
            })?;

        let is_correct = option.is_correct;
        self.log.push(AnswerRecord {
            question_id: question.id,
            option_id,
            is_correct,
        });
        self.state = AttemptState::Evaluated {
            question_index,
            is_correct,
            ready_at: now + self.feedback_delay,
        };
        Ok(Selection::Accepted { is_correct })
    }

    /// Leaves feedback once its delay has passed. Returns the new state.
    pub fn advance(&mut self, now: Instant) -> AttemptState {
        if let AttemptState::Evaluated {
            question_index,
            ready_at,
            ..
        } = self.state
        {
            if now >= ready_at {
                let next = question_index + 1;
                self.state = if next < self.questions.len() {
                    AttemptState::AwaitingSelection {
                        question_index: next,
                    }
                } else {
                    AttemptState::Complete
                };
            }
        }
        self.state
    }

    /// Available once the attempt is complete.
    pub fn outcome(&self) -> Option<AttemptOutcome> {
        if self.state != AttemptState::Complete {
            return None;
        }
        let correct_answers = self.log.iter().filter(|a| a.is_correct).count();
        let total_questions = self.log.len();
        Some(AttemptOutcome {
            score: score_percentage(correct_answers, total_questions),
            total_questions,
            correct_answers,
            answers: self.log.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionOption;

    fn questions(n: usize) -> Vec<ComposedQuestion> {
        (0..n)
            .map(|i| {
                let id = Uuid::new_v4();
                ComposedQuestion {
                    id,
                    audio_url: None,
                    statement: Some(format!("Q{}", i)),
                    order_index: i as i32,
                    options: (0..2)
                        .map(|j| QuestionOption {
                            id: Uuid::new_v4(),
                            question_id: id,
                            image_url: format!("https://cdn.test/{}-{}.png", i, j),
                            is_correct: j == 0,
                            order_index: j,
                        })
                        .collect(),
                }
            })
            .collect()
    }

    fn answer(scorer: &mut AttemptScorer, correct: bool, now: &mut Instant) {
        let q = scorer.current_question().unwrap();
        let option = q.options.iter().find(|o| o.is_correct == correct).unwrap().id;
        scorer.select(option, *now).unwrap();
        *now += DEFAULT_FEEDBACK_DELAY;
        scorer.advance(*now);
    }

    #[test]
    fn three_of_four_scores_seventy_five() {
        let mut scorer = AttemptScorer::new(questions(4), DEFAULT_FEEDBACK_DELAY).unwrap();
        let mut now = Instant::now();
        for correct in [true, true, false, true] {
            answer(&mut scorer, correct, &mut now);
        }
        assert_eq!(scorer.state(), AttemptState::Complete);
        let outcome = scorer.outcome().unwrap();
        assert_eq!(outcome.score, 75.0);
        assert_eq!(outcome.correct_answers, 3);
        assert_eq!(outcome.total_questions, 4);
    }

    #[test]
    fn empty_log_scores_zero() {
        assert_eq!(score_percentage(0, 0), 0.0);
        assert_eq!(score_percentage(1, 3), 33.33);
        assert_eq!(score_percentage(2, 3), 66.67);
    }

    #[test]
    fn empty_exam_is_rejected() {
        assert!(AttemptScorer::new(Vec::new(), DEFAULT_FEEDBACK_DELAY).is_err());
    }

    #[test]
    fn second_selection_during_feedback_is_ignored() {
        let mut scorer = AttemptScorer::new(questions(2), DEFAULT_FEEDBACK_DELAY).unwrap();
        let now = Instant::now();
        let options: Vec<Uuid> = scorer
            .current_question()
            .unwrap()
            .options
            .iter()
            .map(|o| o.id)
            .collect();

        assert_eq!(
            scorer.select(options[0], now).unwrap(),
            Selection::Accepted { is_correct: true }
        );
        assert_eq!(scorer.select(options[1], now).unwrap(), Selection::Ignored);
        assert_eq!(scorer.answers().len(), 1);

        let early = scorer.advance(now + Duration::from_millis(100));
        assert!(matches!(early, AttemptState::Evaluated { .. }));
        let later = scorer.advance(now + DEFAULT_FEEDBACK_DELAY);
        assert_eq!(later, AttemptState::AwaitingSelection { question_index: 1 });
    }

    #[test]
    fn option_from_another_question_is_invalid() {
        let qs = questions(2);
        let foreign = qs[1].options[0].id;
        let mut scorer = AttemptScorer::new(qs, DEFAULT_FEEDBACK_DELAY).unwrap();
        assert!(matches!(
            scorer.select(foreign, Instant::now()),
            Err(Error::Invalid(_))
        ));
        assert!(scorer.outcome().is_none());
    }
}
