use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::answer::{NewSubmission, RecordedSubmission, StudentAnswer};
use crate::models::assignment::{Assignment, AssignmentDetail};
use crate::models::exam::{Exam, ExamChanges};
use crate::models::exam_result::{ExamResult, ResultSummary};
use crate::models::question::{NewQuestion, Question, QuestionOption, QuestionWithOptions};
use crate::models::student::Student;
use crate::models::teacher::{NewTeacher, Teacher};

/// Durable storage for every entity of the exam domain.
///
/// Implementations own the uniqueness rules: `students.pin`,
/// `(student_id, exam_id)` for assignments and results, and
/// `(student_id, question_id)` for answers. A write that would break one of
/// them fails with [`crate::error::Error::Conflict`], except the keyed
/// upserts which replace the existing row.
///
/// Deleting a student or an exam removes every row that references it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn insert_teacher(&self, teacher: NewTeacher) -> Result<Teacher>;
    async fn get_teacher(&self, id: Uuid) -> Result<Option<Teacher>>;
    async fn find_teacher_by_email(&self, email: &str) -> Result<Option<Teacher>>;
    async fn rename_teacher(&self, id: Uuid, name: &str) -> Result<Teacher>;

    async fn pin_exists(&self, pin: &str) -> Result<bool>;
    async fn insert_student(&self, teacher_id: Uuid, name: &str, pin: &str) -> Result<Student>;
    async fn get_student(&self, id: Uuid) -> Result<Option<Student>>;
    async fn find_student_by_pin(&self, pin: &str) -> Result<Option<Student>>;
    /// Newest first.
    async fn list_students(&self, teacher_id: Uuid) -> Result<Vec<Student>>;
    async fn delete_student(&self, id: Uuid) -> Result<bool>;

    async fn insert_exam(&self, teacher_id: Uuid, title: &str, shuffle_questions: bool)
        -> Result<Exam>;
    async fn get_exam(&self, id: Uuid) -> Result<Option<Exam>>;
    /// Newest first.
    async fn list_exams_by_teacher(&self, teacher_id: Uuid) -> Result<Vec<Exam>>;
    /// Newest first. Unknown ids are skipped.
    async fn list_exams_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Exam>>;
    async fn count_questions(&self, exam_id: Uuid) -> Result<i64>;
    async fn update_exam(&self, id: Uuid, changes: ExamChanges) -> Result<Exam>;
    async fn delete_exam(&self, id: Uuid) -> Result<bool>;

    /// Appends the question after the exam's last one.
    async fn insert_question(&self, exam_id: Uuid, question: NewQuestion)
        -> Result<QuestionWithOptions>;
    async fn get_question(&self, id: Uuid) -> Result<Option<Question>>;
    /// Ordered by `order_index`.
    async fn list_questions(&self, exam_id: Uuid) -> Result<Vec<Question>>;
    /// Ordered by `order_index`.
    async fn list_options(&self, question_id: Uuid) -> Result<Vec<QuestionOption>>;
    /// Rewrites statement and audio and recreates the options in one unit.
    async fn replace_question(&self, id: Uuid, question: NewQuestion)
        -> Result<QuestionWithOptions>;
    /// Removes the question and closes the gap in the exam's order.
    async fn delete_question(&self, id: Uuid) -> Result<bool>;

    async fn list_assignments_for_student(&self, student_id: Uuid) -> Result<Vec<Assignment>>;
    async fn list_assignments_for_teacher(&self, teacher_id: Uuid)
        -> Result<Vec<AssignmentDetail>>;
    async fn upsert_assignment(&self, student_id: Uuid, exam_id: Uuid) -> Result<Assignment>;
    async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>>;
    async fn delete_assignment(&self, id: Uuid) -> Result<bool>;

    /// Upserts the result and every answer atomically; nothing is written
    /// when any part fails.
    async fn record_submission(&self, submission: NewSubmission) -> Result<RecordedSubmission>;
    /// Newest first.
    async fn list_results_for_teacher(&self, teacher_id: Uuid) -> Result<Vec<ResultSummary>>;
    async fn list_results_for_exam(&self, exam_id: Uuid) -> Result<Vec<ExamResult>>;
    async fn list_answers_for_student(&self, student_id: Uuid) -> Result<Vec<StudentAnswer>>;
}
