use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::EntityStore;
use crate::dto::teacher_dto::{CreateExamPayload, QuestionPayload, UpdateExamPayload};
use crate::error::{Error, Result};
use crate::models::exam::{Exam, ExamChanges, ExamWithCount};
use crate::models::question::{NewOption, QuestionWithOptions};
use crate::models::student::Student;
use crate::utils::validation::validate_question;

/// Authoring operations. Every call is scoped to the owning teacher; rows of
/// other teachers behave as if they did not exist.
#[derive(Clone)]
pub struct ExamService {
    store: Arc<dyn EntityStore>,
}

impl ExamService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    async fn owned_exam(&self, teacher_id: Uuid, exam_id: Uuid) -> Result<Exam> {
        self.store
            .get_exam(exam_id)
            .await?
            .filter(|e| e.teacher_id == teacher_id)
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))
    }

    async fn owned_question_exam(&self, teacher_id: Uuid, question_id: Uuid) -> Result<Exam> {
        let question = self
            .store
            .get_question(question_id)
            .await?
            .ok_or_else(|| Error::NotFound("Question not found".to_string()))?;
        self.owned_exam(teacher_id, question.exam_id)
            .await
            .map_err(|_| Error::NotFound("Question not found".to_string()))
    }

    pub async fn create_exam(&self, teacher_id: Uuid, payload: CreateExamPayload) -> Result<Exam> {
        let title = payload.title.trim();
        if title.is_empty() {
            return Err(Error::Invalid("Title must not be blank".to_string()));
        }
        let exam = self
            .store
            .insert_exam(teacher_id, title, payload.shuffle_questions.unwrap_or(false))
            .await?;
        tracing::info!(exam_id = %exam.id, %teacher_id, "Exam created");
        Ok(exam)
    }

    pub async fn list_exams(&self, teacher_id: Uuid) -> Result<Vec<ExamWithCount>> {
        let exams = self.store.list_exams_by_teacher(teacher_id).await?;
        let mut items = Vec::with_capacity(exams.len());
        for exam in exams {
            let question_count = self.store.count_questions(exam.id).await?;
            items.push(ExamWithCount {
                id: exam.id,
                title: exam.title,
                shuffle_questions: exam.shuffle_questions,
                created_at: exam.created_at,
                question_count,
            });
        }
        Ok(items)
    }

    pub async fn update_exam(
        &self,
        teacher_id: Uuid,
        exam_id: Uuid,
        payload: UpdateExamPayload,
    ) -> Result<Exam> {
        self.owned_exam(teacher_id, exam_id).await?;
        let title = payload.title.map(|t| t.trim().to_string());
        if title.as_deref().is_some_and(str::is_empty) {
            return Err(Error::Invalid("Title must not be blank".to_string()));
        }
        self.store
            .update_exam(
                exam_id,
                ExamChanges {
                    title,
                    shuffle_questions: payload.shuffle_questions,
                },
            )
            .await
    }

    pub async fn delete_exam(&self, teacher_id: Uuid, exam_id: Uuid) -> Result<()> {
        self.owned_exam(teacher_id, exam_id).await?;
        self.store.delete_exam(exam_id).await?;
        tracing::info!(%exam_id, %teacher_id, "Exam deleted");
        Ok(())
    }

    /// Questions in stored order, with correctness, for the authoring view.
    pub async fn list_questions(
        &self,
        teacher_id: Uuid,
        exam_id: Uuid,
    ) -> Result<Vec<QuestionWithOptions>> {
        self.owned_exam(teacher_id, exam_id).await?;
        let questions = self.store.list_questions(exam_id).await?;
        let mut items = Vec::with_capacity(questions.len());
        for question in questions {
            let options = self.store.list_options(question.id).await?;
            items.push(QuestionWithOptions { question, options });
        }
        Ok(items)
    }

    pub async fn add_question(
        &self,
        teacher_id: Uuid,
        exam_id: Uuid,
        payload: QuestionPayload,
    ) -> Result<QuestionWithOptions> {
        self.owned_exam(teacher_id, exam_id).await?;
        let question = validate_question(
            payload.statement,
            payload.audio_url,
            payload.options.into_iter().map(NewOption::from).collect(),
        )?;
        self.store.insert_question(exam_id, question).await
    }

    pub async fn replace_question(
        &self,
        teacher_id: Uuid,
        question_id: Uuid,
        payload: QuestionPayload,
    ) -> Result<QuestionWithOptions> {
        self.owned_question_exam(teacher_id, question_id).await?;
        let question = validate_question(
            payload.statement,
            payload.audio_url,
            payload.options.into_iter().map(NewOption::from).collect(),
        )?;
        self.store.replace_question(question_id, question).await
    }

    pub async fn delete_question(&self, teacher_id: Uuid, question_id: Uuid) -> Result<()> {
        self.owned_question_exam(teacher_id, question_id).await?;
        self.store.delete_question(question_id).await?;
        Ok(())
    }

    pub async fn list_students(&self, teacher_id: Uuid) -> Result<Vec<Student>> {
        self.store.list_students(teacher_id).await
    }

    pub async fn delete_student(&self, teacher_id: Uuid, student_id: Uuid) -> Result<()> {
        self.store
            .get_student(student_id)
            .await?
            .filter(|s| s.teacher_id == teacher_id)
            .ok_or_else(|| Error::NotFound("Student not found".to_string()))?;
        self.store.delete_student(student_id).await?;
        tracing::info!(%student_id, %teacher_id, "Student deleted");
        Ok(())
    }
}
