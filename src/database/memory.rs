use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::store::EntityStore;
use crate::error::{Error, Result};
use crate::models::answer::{NewSubmission, RecordedSubmission, StudentAnswer};
use crate::models::assignment::{Assignment, AssignmentDetail};
use crate::models::exam::{Exam, ExamChanges};
use crate::models::exam_result::{ExamResult, ResultSummary};
use crate::models::question::{NewQuestion, Question, QuestionOption, QuestionWithOptions};
use crate::models::student::Student;
use crate::models::teacher::{NewTeacher, Teacher};

#[derive(Default)]
struct Tables {
    teachers: Vec<Teacher>,
    students: Vec<Student>,
    exams: Vec<Exam>,
    questions: Vec<Question>,
    options: Vec<QuestionOption>,
    assignments: Vec<Assignment>,
    results: Vec<ExamResult>,
    answers: Vec<StudentAnswer>,
}

impl Tables {
    fn options_for(&self, question_id: Uuid) -> Vec<QuestionOption> {
        let mut options: Vec<QuestionOption> = self
            .options
            .iter()
            .filter(|o| o.question_id == question_id)
            .cloned()
            .collect();
        options.sort_by_key(|o| o.order_index);
        options
    }

    fn push_options(&mut self, question_id: Uuid, question: &NewQuestion) -> Vec<QuestionOption> {
        let created: Vec<QuestionOption> = question
            .options
            .iter()
            .enumerate()
            .map(|(idx, opt)| QuestionOption {
                id: Uuid::new_v4(),
                question_id,
                image_url: opt.image_url.clone(),
                is_correct: opt.is_correct,
                order_index: idx as i32,
            })
            .collect();
        self.options.extend(created.iter().cloned());
        created
    }

    fn remove_question_rows(&mut self, question_ids: &[Uuid]) {
        self.questions.retain(|q| !question_ids.contains(&q.id));
        self.options.retain(|o| !question_ids.contains(&o.question_id));
        self.answers.retain(|a| !question_ids.contains(&a.question_id));
    }
}

/// Newest first; rows created in the same instant keep the later insert first.
fn newest_first<T: Clone>(
    rows: impl DoubleEndedIterator<Item = T>,
    key: impl Fn(&T) -> chrono::DateTime<Utc>,
) -> Vec<T> {
    let mut rows: Vec<T> = rows.rev().collect();
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

/// In-process store used when no `DATABASE_URL` is configured and by tests.
///
/// All tables live behind one lock, so every trait method is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn insert_teacher(&self, teacher: NewTeacher) -> Result<Teacher> {
        let mut t = self.tables.write().await;
        if t.teachers.iter().any(|x| x.email == teacher.email) {
            return Err(Error::Conflict("teachers_email_key".to_string()));
        }
        let row = Teacher {
            id: Uuid::new_v4(),
            name: teacher.name,
            email: teacher.email,
            password_hash: teacher.password_hash,
            created_at: Utc::now(),
        };
        t.teachers.push(row.clone());
        Ok(row)
    }

    async fn get_teacher(&self, id: Uuid) -> Result<Option<Teacher>> {
        let t = self.tables.read().await;
        Ok(t.teachers.iter().find(|x| x.id == id).cloned())
    }

    async fn find_teacher_by_email(&self, email: &str) -> Result<Option<Teacher>> {
        let t = self.tables.read().await;
        Ok(t.teachers.iter().find(|x| x.email == email).cloned())
    }

    async fn rename_teacher(&self, id: Uuid, name: &str) -> Result<Teacher> {
        let mut t = self.tables.write().await;
        let teacher = t
            .teachers
            .iter_mut()
            .find(|x| x.id == id)
            .ok_or_else(|| Error::NotFound("Teacher not found".to_string()))?;
        teacher.name = name.to_string();
        Ok(teacher.clone())
    }

    async fn pin_exists(&self, pin: &str) -> Result<bool> {
        let t = self.tables.read().await;
        Ok(t.students.iter().any(|s| s.pin == pin))
    }

    async fn insert_student(&self, teacher_id: Uuid, name: &str, pin: &str) -> Result<Student> {
        let mut t = self.tables.write().await;
        if t.students.iter().any(|s| s.pin == pin) {
            return Err(Error::Conflict("students_pin_key".to_string()));
        }
        if !t.teachers.iter().any(|x| x.id == teacher_id) {
            return Err(Error::NotFound("Teacher not found".to_string()));
        }
        let row = Student {
            id: Uuid::new_v4(),
            name: name.to_string(),
            pin: pin.to_string(),
            teacher_id,
            created_at: Utc::now(),
        };
        t.students.push(row.clone());
        Ok(row)
    }

    async fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
        let t = self.tables.read().await;
        Ok(t.students.iter().find(|s| s.id == id).cloned())
    }

    async fn find_student_by_pin(&self, pin: &str) -> Result<Option<Student>> {
        let t = self.tables.read().await;
        Ok(t.students.iter().find(|s| s.pin == pin).cloned())
    }

    async fn list_students(&self, teacher_id: Uuid) -> Result<Vec<Student>> {
        let t = self.tables.read().await;
        Ok(newest_first(
            t.students.iter().filter(|s| s.teacher_id == teacher_id).cloned(),
            |s| s.created_at,
        ))
    }

    async fn delete_student(&self, id: Uuid) -> Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.students.len();
        t.students.retain(|s| s.id != id);
        if t.students.len() == before {
            return Ok(false);
        }
        t.assignments.retain(|a| a.student_id != id);
        t.results.retain(|r| r.student_id != id);
        t.answers.retain(|a| a.student_id != id);
        Ok(true)
    }

    async fn insert_exam(
        &self,
        teacher_id: Uuid,
        title: &str,
        shuffle_questions: bool,
    ) -> Result<Exam> {
        let mut t = self.tables.write().await;
        if !t.teachers.iter().any(|x| x.id == teacher_id) {
            return Err(Error::NotFound("Teacher not found".to_string()));
        }
        let row = Exam {
            id: Uuid::new_v4(),
            title: title.to_string(),
            teacher_id,
            shuffle_questions,
            created_at: Utc::now(),
        };
        t.exams.push(row.clone());
        Ok(row)
    }

    async fn get_exam(&self, id: Uuid) -> Result<Option<Exam>> {
        let t = self.tables.read().await;
        Ok(t.exams.iter().find(|e| e.id == id).cloned())
    }

    async fn list_exams_by_teacher(&self, teacher_id: Uuid) -> Result<Vec<Exam>> {
        let t = self.tables.read().await;
        Ok(newest_first(
            t.exams.iter().filter(|e| e.teacher_id == teacher_id).cloned(),
            |e| e.created_at,
        ))
    }

    async fn list_exams_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Exam>> {
        let t = self.tables.read().await;
        Ok(newest_first(
            t.exams.iter().filter(|e| ids.contains(&e.id)).cloned(),
            |e| e.created_at,
        ))
    }

    async fn count_questions(&self, exam_id: Uuid) -> Result<i64> {
        let t = self.tables.read().await;
        Ok(t.questions.iter().filter(|q| q.exam_id == exam_id).count() as i64)
    }

    async fn update_exam(&self, id: Uuid, changes: ExamChanges) -> Result<Exam> {
        let mut t = self.tables.write().await;
        let exam = t
            .exams
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))?;
        if let Some(title) = changes.title {
            exam.title = title;
        }
        if let Some(shuffle) = changes.shuffle_questions {
            exam.shuffle_questions = shuffle;
        }
        Ok(exam.clone())
    }

    async fn delete_exam(&self, id: Uuid) -> Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.exams.len();
        t.exams.retain(|e| e.id != id);
        if t.exams.len() == before {
            return Ok(false);
        }
        let question_ids: Vec<Uuid> = t
            .questions
            .iter()
            .filter(|q| q.exam_id == id)
            .map(|q| q.id)
            .collect();
        t.remove_question_rows(&question_ids);
        t.assignments.retain(|a| a.exam_id != id);
        t.results.retain(|r| r.exam_id != id);
        Ok(true)
    }

    async fn insert_question(
        &self,
        exam_id: Uuid,
        question: NewQuestion,
    ) -> Result<QuestionWithOptions> {
        let mut t = self.tables.write().await;
        if !t.exams.iter().any(|e| e.id == exam_id) {
            return Err(Error::NotFound("Exam not found".to_string()));
        }
        let next_index = t.questions.iter().filter(|q| q.exam_id == exam_id).count();
        let row = Question {
            id: Uuid::new_v4(),
            exam_id,
            audio_url: question.audio_url.clone(),
            statement: question.statement.clone(),
            order_index: next_index as i32,
            created_at: Utc::now(),
        };
        t.questions.push(row.clone());
        let options = t.push_options(row.id, &question);
        Ok(QuestionWithOptions {
            question: row,
            options,
        })
    }

    async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
        let t = self.tables.read().await;
        Ok(t.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn list_questions(&self, exam_id: Uuid) -> Result<Vec<Question>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Question> = t
            .questions
            .iter()
            .filter(|q| q.exam_id == exam_id)
            .cloned()
            .collect();
        rows.sort_by_key(|q| q.order_index);
        Ok(rows)
    }

    async fn list_options(&self, question_id: Uuid) -> Result<Vec<QuestionOption>> {
        let t = self.tables.read().await;
        Ok(t.options_for(question_id))
    }

    async fn replace_question(
        &self,
        id: Uuid,
        question: NewQuestion,
    ) -> Result<QuestionWithOptions> {
        let mut t = self.tables.write().await;
        let row = {
            let existing = t
                .questions
                .iter_mut()
                .find(|q| q.id == id)
                .ok_or_else(|| Error::NotFound("Question not found".to_string()))?;
            existing.audio_url = question.audio_url.clone();
            existing.statement = question.statement.clone();
            existing.clone()
        };
        let stale: Vec<Uuid> = t
            .options
            .iter()
            .filter(|o| o.question_id == id)
            .map(|o| o.id)
            .collect();
        t.options.retain(|o| o.question_id != id);
        for answer in t.answers.iter_mut() {
            if answer.selected_option_id.is_some_and(|o| stale.contains(&o)) {
                answer.selected_option_id = None;
            }
        }
        let options = t.push_options(id, &question);
        Ok(QuestionWithOptions {
            question: row,
            options,
        })
    }

    async fn delete_question(&self, id: Uuid) -> Result<bool> {
        let mut t = self.tables.write().await;
        let Some(removed) = t.questions.iter().find(|q| q.id == id).cloned() else {
            return Ok(false);
        };
        t.remove_question_rows(&[id]);
        for q in t.questions.iter_mut() {
            if q.exam_id == removed.exam_id && q.order_index > removed.order_index {
                q.order_index -= 1;
            }
        }
        Ok(true)
    }

    async fn list_assignments_for_student(&self, student_id: Uuid) -> Result<Vec<Assignment>> {
        let t = self.tables.read().await;
        Ok(t.assignments
            .iter()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn list_assignments_for_teacher(
        &self,
        teacher_id: Uuid,
    ) -> Result<Vec<AssignmentDetail>> {
        let t = self.tables.read().await;
        let details = t.assignments.iter().filter_map(|a| {
            let student = t
                .students
                .iter()
                .find(|s| s.id == a.student_id && s.teacher_id == teacher_id)?;
            let exam = t.exams.iter().find(|e| e.id == a.exam_id)?;
            Some(AssignmentDetail {
                id: a.id,
                student_id: a.student_id,
                student_name: student.name.clone(),
                exam_id: a.exam_id,
                exam_title: exam.title.clone(),
                assigned_at: a.assigned_at,
            })
        });
        Ok(newest_first(details.collect::<Vec<_>>().into_iter(), |d| {
            d.assigned_at
        }))
    }

    async fn upsert_assignment(&self, student_id: Uuid, exam_id: Uuid) -> Result<Assignment> {
        let mut t = self.tables.write().await;
        if let Some(existing) = t
            .assignments
            .iter()
            .find(|a| a.student_id == student_id && a.exam_id == exam_id)
        {
            return Ok(existing.clone());
        }
        if !t.students.iter().any(|s| s.id == student_id) {
            return Err(Error::NotFound("Student not found".to_string()));
        }
        if !t.exams.iter().any(|e| e.id == exam_id) {
            return Err(Error::NotFound("Exam not found".to_string()));
        }
        let row = Assignment {
            id: Uuid::new_v4(),
            student_id,
            exam_id,
            assigned_at: Utc::now(),
        };
        t.assignments.push(row.clone());
        Ok(row)
    }

    async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>> {
        let t = self.tables.read().await;
        Ok(t.assignments.iter().find(|a| a.id == id).cloned())
    }

    async fn delete_assignment(&self, id: Uuid) -> Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.assignments.len();
        t.assignments.retain(|a| a.id != id);
        Ok(t.assignments.len() != before)
    }

    async fn record_submission(&self, submission: NewSubmission) -> Result<RecordedSubmission> {
        let mut t = self.tables.write().await;
        if !t.students.iter().any(|s| s.id == submission.student_id) {
            return Err(Error::NotFound("Student not found".to_string()));
        }
        if !t.exams.iter().any(|e| e.id == submission.exam_id) {
            return Err(Error::NotFound("Exam not found".to_string()));
        }
        if let Some(missing) = submission
            .answers
            .iter()
            .find(|a| !t.questions.iter().any(|q| q.id == a.question_id))
        {
            return Err(Error::NotFound(format!(
                "Question {} not found",
                missing.question_id
            )));
        }

        let now = Utc::now();
        let result_id = t
            .results
            .iter()
            .find(|r| r.student_id == submission.student_id && r.exam_id == submission.exam_id)
            .map(|r| r.id)
            .unwrap_or_else(Uuid::new_v4);
        t.results.retain(|r| {
            !(r.student_id == submission.student_id && r.exam_id == submission.exam_id)
        });
        let result = ExamResult {
            id: result_id,
            student_id: submission.student_id,
            exam_id: submission.exam_id,
            score: submission.score,
            total_questions: submission.total_questions,
            correct_answers: submission.correct_answers,
            completed_at: now,
        };
        t.results.push(result.clone());

        let mut answers = Vec::with_capacity(submission.answers.len());
        for graded in &submission.answers {
            let answer_id = t
                .answers
                .iter()
                .find(|a| {
                    a.student_id == submission.student_id && a.question_id == graded.question_id
                })
                .map(|a| a.id)
                .unwrap_or_else(Uuid::new_v4);
            t.answers.retain(|a| {
                !(a.student_id == submission.student_id && a.question_id == graded.question_id)
            });
            let row = StudentAnswer {
                id: answer_id,
                student_id: submission.student_id,
                question_id: graded.question_id,
                selected_option_id: graded.selected_option_id,
                is_correct: graded.is_correct,
                created_at: now,
            };
            t.answers.push(row.clone());
            answers.push(row);
        }

        Ok(RecordedSubmission { result, answers })
    }

    async fn list_results_for_teacher(&self, teacher_id: Uuid) -> Result<Vec<ResultSummary>> {
        let t = self.tables.read().await;
        let summaries: Vec<ResultSummary> = t
            .results
            .iter()
            .filter_map(|r| {
                let student = t
                    .students
                    .iter()
                    .find(|s| s.id == r.student_id && s.teacher_id == teacher_id)?;
                let exam = t.exams.iter().find(|e| e.id == r.exam_id)?;
                Some(ResultSummary {
                    exam_title: exam.title.clone(),
                    student_name: student.name.clone(),
                    student_pin: student.pin.clone(),
                    score: r.score,
                    total_questions: r.total_questions,
                    correct_answers: r.correct_answers,
                    completed_at: r.completed_at,
                })
            })
            .collect();
        Ok(newest_first(summaries.into_iter(), |s| s.completed_at))
    }

    async fn list_results_for_exam(&self, exam_id: Uuid) -> Result<Vec<ExamResult>> {
        let t = self.tables.read().await;
        Ok(newest_first(
            t.results.iter().filter(|r| r.exam_id == exam_id).cloned(),
            |r| r.completed_at,
        ))
    }

    async fn list_answers_for_student(&self, student_id: Uuid) -> Result<Vec<StudentAnswer>> {
        let t = self.tables.read().await;
        Ok(t.answers
            .iter()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::answer::GradedAnswer;
    use crate::models::question::NewOption;

    async fn seed_teacher(store: &MemoryStore) -> Teacher {
        store
            .insert_teacher(NewTeacher {
                name: "Ana".into(),
                email: format!("{}@school.test", Uuid::new_v4()),
                password_hash: "x".into(),
            })
            .await
            .unwrap()
    }

    fn two_option_question(statement: &str) -> NewQuestion {
        NewQuestion {
            audio_url: None,
            statement: Some(statement.into()),
            options: vec![
                NewOption {
                    image_url: "https://cdn.test/a.png".into(),
                    is_correct: true,
                },
                NewOption {
                    image_url: "https://cdn.test/b.png".into(),
                    is_correct: false,
                },
            ],
        }
    }

    #[tokio::test]
    async fn duplicate_pin_is_a_conflict() {
        let store = MemoryStore::new();
        let teacher = seed_teacher(&store).await;
        store.insert_student(teacher.id, "A", "1234").await.unwrap();
        let err = store.insert_student(teacher.id, "B", "1234").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.list_students(teacher.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_question_compacts_order() {
        let store = MemoryStore::new();
        let teacher = seed_teacher(&store).await;
        let exam = store.insert_exam(teacher.id, "Animals", false).await.unwrap();
        let first = store.insert_question(exam.id, two_option_question("1")).await.unwrap();
        store.insert_question(exam.id, two_option_question("2")).await.unwrap();
        store.insert_question(exam.id, two_option_question("3")).await.unwrap();

        assert!(store.delete_question(first.question.id).await.unwrap());

        let remaining = store.list_questions(exam.id).await.unwrap();
        let indices: Vec<i32> = remaining.iter().map(|q| q.order_index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(remaining[0].statement.as_deref(), Some("2"));
        assert!(store.list_options(first.question.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_student_cascades() {
        let store = MemoryStore::new();
        let teacher = seed_teacher(&store).await;
        let student = store.insert_student(teacher.id, "A", "4321").await.unwrap();
        let exam = store.insert_exam(teacher.id, "Colors", false).await.unwrap();
        let q = store.insert_question(exam.id, two_option_question("red?")).await.unwrap();
        store.upsert_assignment(student.id, exam.id).await.unwrap();
        store
            .record_submission(NewSubmission {
                student_id: student.id,
                exam_id: exam.id,
                score: 100.0,
                total_questions: 1,
                correct_answers: 1,
                answers: vec![GradedAnswer {
                    question_id: q.question.id,
                    selected_option_id: Some(q.options[0].id),
                    is_correct: true,
                }],
            })
            .await
            .unwrap();

        assert!(store.delete_student(student.id).await.unwrap());
        assert!(store.list_assignments_for_student(student.id).await.unwrap().is_empty());
        assert!(store.list_results_for_exam(exam.id).await.unwrap().is_empty());
        assert!(store.list_answers_for_student(student.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_assignment_keeps_one_row_per_pair() {
        let store = MemoryStore::new();
        let teacher = seed_teacher(&store).await;
        let student = store.insert_student(teacher.id, "A", "1111").await.unwrap();
        let exam = store.insert_exam(teacher.id, "Shapes", false).await.unwrap();
        let a = store.upsert_assignment(student.id, exam.id).await.unwrap();
        let b = store.upsert_assignment(student.id, exam.id).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(store.list_assignments_for_student(student.id).await.unwrap().len(), 1);
    }
}
