use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::EntityStore;
use crate::error::{Error, Result};
use crate::models::answer::{GradedAnswer, NewSubmission};
use crate::models::exam_result::ExamResult;
use crate::services::attempt_scorer::{score_percentage, AnswerRecord, AttemptOutcome};

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    pub option_id: Option<Uuid>,
    /// What the client believed; only compared, never stored.
    pub claimed_correct: Option<bool>,
}

impl From<AnswerRecord> for SubmittedAnswer {
    fn from(record: AnswerRecord) -> Self {
        Self {
            question_id: record.question_id,
            option_id: Some(record.option_id),
            claimed_correct: Some(record.is_correct),
        }
    }
}

/// Aggregates the client computed on its own. Kept for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClaimedScore {
    pub score: Option<f64>,
    pub total_questions: Option<i32>,
    pub correct_answers: Option<i32>,
}

impl From<&AttemptOutcome> for ClaimedScore {
    fn from(outcome: &AttemptOutcome) -> Self {
        Self {
            score: Some(outcome.score),
            total_questions: i32::try_from(outcome.total_questions).ok(),
            correct_answers: i32::try_from(outcome.correct_answers).ok(),
        }
    }
}

/// Which attempt survives when a student resubmits an exam.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultPolicy {
    /// The newest submission replaces the result and every answer.
    #[default]
    LatestWins,
}

#[derive(Clone)]
pub struct SubmissionService {
    store: Arc<dyn EntityStore>,
    policy: ResultPolicy,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            policy: ResultPolicy::default(),
        }
    }

    pub fn policy(&self) -> ResultPolicy {
        self.policy
    }

    /// Grades the answers against stored correctness and records the result
    /// with its answers as one unit.
    pub async fn submit(
        &self,
        student_id: Uuid,
        exam_id: Uuid,
        answers: Vec<SubmittedAnswer>,
        claimed: ClaimedScore,
    ) -> Result<ExamResult> {
        let student = self
            .store
            .get_student(student_id)
            .await?
            .ok_or_else(|| Error::NotFound("Student not found".to_string()))?;
        let exam = self
            .store
            .get_exam(exam_id)
            .await?
            .filter(|e| e.teacher_id == student.teacher_id)
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))?;

        let exam_questions: HashSet<Uuid> = self
            .store
            .list_questions(exam.id)
            .await?
            .into_iter()
            .map(|q| q.id)
            .collect();

        let mut seen = HashSet::with_capacity(answers.len());
        let mut graded = Vec::with_capacity(answers.len());
        let mut disagreements = 0usize;
        for answer in &answers {
            if !exam_questions.contains(&answer.question_id) {
                return Err(Error::Invalid(format!(
                    "Question {} is not part of this exam",
                    answer.question_id
                )));
            }
            if !seen.insert(answer.question_id) {
                return Err(Error::Invalid(format!(
                    "Question {} was answered twice",
                    answer.question_id
                )));
            }

            let options: HashMap<Uuid, bool> = self
                .store
                .list_options(answer.question_id)
                .await?
                .into_iter()
                .map(|o| (o.id, o.is_correct))
                .collect();
            let is_correct = match answer.option_id {
                Some(option_id) => *options.get(&option_id).ok_or_else(|| {
                    Error::Invalid(format!(
                        "Option {} does not belong to question {}",
                        option_id, answer.question_id
                    ))
                })?,
                None => false,
            };
            if answer.claimed_correct.is_some_and(|c| c != is_correct) {
                disagreements += 1;
            }
            graded.push(GradedAnswer {
                question_id: answer.question_id,
                selected_option_id: answer.option_id,
                is_correct,
            });
        }

        let total_questions = graded.len();
        let correct_answers = graded.iter().filter(|a| a.is_correct).count();
        let score = score_percentage(correct_answers, total_questions);

        let claimed_mismatch = claimed
            .score
            .is_some_and(|s| (s - score).abs() > 0.01)
            || claimed
                .total_questions
                .is_some_and(|t| t as usize != total_questions)
            || claimed
                .correct_answers
                .is_some_and(|c| c as usize != correct_answers);
        if claimed_mismatch || disagreements > 0 {
            tracing::warn!(
                %student_id,
                %exam_id,
                server_score = score,
                client_score = ?claimed.score,
                disagreements,
                "Client-reported score differs from server grading"
            );
        }

        let recorded = self
            .store
            .record_submission(NewSubmission {
                student_id,
                exam_id,
                score,
                total_questions: total_questions as i32,
                correct_answers: correct_answers as i32,
                answers: graded,
            })
            .await?;

        tracing::info!(
            %student_id,
            %exam_id,
            score,
            correct_answers,
            total_questions,
            "Submission recorded"
        );
        Ok(recorded.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::models::question::{NewOption, NewQuestion, QuestionWithOptions};
    use crate::models::teacher::NewTeacher;
    use crate::services::attempt_scorer::{AttemptScorer, DEFAULT_FEEDBACK_DELAY};
    use crate::services::composer_service::ComposerService;
    use crate::utils::random::RandomSource;
    use std::time::Instant;

    struct Fixture {
        store: Arc<MemoryStore>,
        student_id: Uuid,
        exam_id: Uuid,
        questions: Vec<QuestionWithOptions>,
    }

    async fn fixture(question_count: usize) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let teacher = store
            .insert_teacher(NewTeacher {
                name: "T".into(),
                email: "t@school.test".into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap();
        let student = store.insert_student(teacher.id, "Sam", "5678").await.unwrap();
        let exam = store.insert_exam(teacher.id, "Fruit", false).await.unwrap();
        let mut questions = Vec::new();
        for n in 0..question_count {
            questions.push(
                store
                    .insert_question(
                        exam.id,
                        NewQuestion {
                            audio_url: None,
                            statement: Some(format!("Q{}", n)),
                            options: vec![
                                NewOption {
                                    image_url: "https://cdn.test/right.png".into(),
                                    is_correct: true,
                                },
                                NewOption {
                                    image_url: "https://cdn.test/wrong.png".into(),
                                    is_correct: false,
                                },
                            ],
                        },
                    )
                    .await
                    .unwrap(),
            );
        }
        Fixture {
            store,
            student_id: student.id,
            exam_id: exam.id,
            questions,
        }
    }

    fn pick(q: &QuestionWithOptions, correct: bool) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id: q.question.id,
            option_id: q.options.iter().find(|o| o.is_correct == correct).map(|o| o.id),
            claimed_correct: None,
        }
    }

    #[tokio::test]
    async fn grades_from_stored_options() {
        let f = fixture(4).await;
        let service = SubmissionService::new(f.store.clone());
        let answers = vec![
            pick(&f.questions[0], true),
            pick(&f.questions[1], true),
            pick(&f.questions[2], false),
            pick(&f.questions[3], true),
        ];
        let result = service
            .submit(f.student_id, f.exam_id, answers, ClaimedScore::default())
            .await
            .unwrap();
        assert_eq!(result.score, 75.0);
        assert_eq!(result.correct_answers, 3);
        assert_eq!(result.total_questions, 4);
    }

    #[tokio::test]
    async fn partial_scores_are_stored_to_two_decimals() {
        let f = fixture(3).await;
        let service = SubmissionService::new(f.store.clone());
        let answers = vec![
            pick(&f.questions[0], true),
            pick(&f.questions[1], false),
            pick(&f.questions[2], false),
        ];
        let result = service
            .submit(f.student_id, f.exam_id, answers, ClaimedScore::default())
            .await
            .unwrap();
        assert_eq!(result.score, 33.33);
        let stored = f.store.list_results_for_exam(f.exam_id).await.unwrap();
        assert_eq!(stored[0].score, 33.33);
    }

    #[tokio::test]
    async fn scored_attempt_submits_with_matching_result() {
        let f = fixture(4).await;
        let composer = ComposerService::new(f.store.clone(), RandomSource::seeded(7));
        let composed = composer.compose_exam(f.exam_id).await.unwrap();
        let mut scorer = AttemptScorer::new(composed, DEFAULT_FEEDBACK_DELAY).unwrap();

        let mut now = Instant::now();
        let mut picks = [true, true, false, true].into_iter();
        while let Some(question) = scorer.current_question() {
            let correct = picks.next().unwrap();
            let option = question
                .options
                .iter()
                .find(|o| o.is_correct == correct)
                .unwrap()
                .id;
            scorer.select(option, now).unwrap();
            now += DEFAULT_FEEDBACK_DELAY;
            scorer.advance(now);
        }
        let outcome = scorer.outcome().unwrap();
        let claimed = ClaimedScore::from(&outcome);
        let answers = outcome.answers.into_iter().map(SubmittedAnswer::from).collect();

        let service = SubmissionService::new(f.store.clone());
        let result = service
            .submit(f.student_id, f.exam_id, answers, claimed)
            .await
            .unwrap();
        assert_eq!(result.score, outcome.score);
        assert_eq!(result.score, 75.0);
        assert_eq!(result.correct_answers, 3);
        assert_eq!(f.store.list_answers_for_student(f.student_id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn claimed_score_is_ignored() {
        let f = fixture(2).await;
        let service = SubmissionService::new(f.store.clone());
        let mut wrong = pick(&f.questions[0], false);
        wrong.claimed_correct = Some(true);
        let claimed = ClaimedScore {
            score: Some(100.0),
            total_questions: Some(1),
            correct_answers: Some(1),
        };
        let result = service
            .submit(f.student_id, f.exam_id, vec![wrong], claimed)
            .await
            .unwrap();
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn resubmission_replaces_result_and_answers() {
        let f = fixture(2).await;
        let service = SubmissionService::new(f.store.clone());
        let answers = vec![pick(&f.questions[0], true), pick(&f.questions[1], false)];

        let first = service
            .submit(f.student_id, f.exam_id, answers.clone(), ClaimedScore::default())
            .await
            .unwrap();
        let second = service
            .submit(f.student_id, f.exam_id, answers, ClaimedScore::default())
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(f.store.list_results_for_exam(f.exam_id).await.unwrap().len(), 1);
        assert_eq!(f.store.list_answers_for_student(f.student_id).await.unwrap().len(), 2);
        assert_eq!(service.policy(), ResultPolicy::LatestWins);
    }

    #[tokio::test]
    async fn empty_answer_log_scores_zero() {
        let f = fixture(1).await;
        let service = SubmissionService::new(f.store.clone());
        let result = service
            .submit(f.student_id, f.exam_id, Vec::new(), ClaimedScore::default())
            .await
            .unwrap();
        assert_eq!(result.score, 0.0);
        assert_eq!(result.total_questions, 0);
    }

    #[tokio::test]
    async fn rejects_foreign_questions_and_options() {
        let f = fixture(2).await;
        let service = SubmissionService::new(f.store.clone());

        let stray = SubmittedAnswer {
            question_id: Uuid::new_v4(),
            option_id: None,
            claimed_correct: None,
        };
        assert!(matches!(
            service
                .submit(f.student_id, f.exam_id, vec![stray], ClaimedScore::default())
                .await,
            Err(Error::Invalid(_))
        ));

        let mut crossed = pick(&f.questions[0], true);
        crossed.option_id = Some(f.questions[1].options[0].id);
        assert!(matches!(
            service
                .submit(f.student_id, f.exam_id, vec![crossed], ClaimedScore::default())
                .await,
            Err(Error::Invalid(_))
        ));

        let twice = vec![pick(&f.questions[0], true), pick(&f.questions[0], false)];
        assert!(service
            .submit(f.student_id, f.exam_id, twice, ClaimedScore::default())
            .await
            .is_err());
        assert!(f.store.list_results_for_exam(f.exam_id).await.unwrap().is_empty());
    }
}
