use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
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

/// `exam_results.score` is `NUMERIC(5,2)`; it is converted at this boundary.
#[derive(Debug, FromRow)]
struct ResultRow {
    id: Uuid,
    student_id: Uuid,
    exam_id: Uuid,
    score: Decimal,
    total_questions: i32,
    correct_answers: i32,
    completed_at: DateTime<Utc>,
}

impl From<ResultRow> for ExamResult {
    fn from(row: ResultRow) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            exam_id: row.exam_id,
            score: row.score.to_f64().unwrap_or(0.0),
            total_questions: row.total_questions,
            correct_answers: row.correct_answers,
            completed_at: row.completed_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ResultSummaryRow {
    exam_title: String,
    student_name: String,
    student_pin: String,
    score: Decimal,
    total_questions: i32,
    correct_answers: i32,
    completed_at: DateTime<Utc>,
}

impl From<ResultSummaryRow> for ResultSummary {
    fn from(row: ResultSummaryRow) -> Self {
        Self {
            exam_title: row.exam_title,
            student_name: row.student_name,
            student_pin: row.student_pin,
            score: row.score.to_f64().unwrap_or(0.0),
            total_questions: row.total_questions,
            correct_answers: row.correct_answers,
            completed_at: row.completed_at,
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_options(
        tx: &mut Transaction<'_, Postgres>,
        question_id: Uuid,
        question: &NewQuestion,
    ) -> Result<Vec<QuestionOption>> {
        let mut options = Vec::with_capacity(question.options.len());
        for (idx, opt) in question.options.iter().enumerate() {
            let option = sqlx::query_as::<_, QuestionOption>(
                r#"
                INSERT INTO question_options (id, question_id, image_url, is_correct, order_index)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, question_id, image_url, is_correct, order_index
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(question_id)
            .bind(&opt.image_url)
            .bind(opt.is_correct)
            .bind(idx as i32)
            .fetch_one(&mut **tx)
            .await?;
            options.push(option);
        }
        Ok(options)
    }
}

const EXAM_COLUMNS: &str = "id, title, teacher_id, shuffle_questions, created_at";
const QUESTION_COLUMNS: &str = "id, exam_id, audio_url, statement, order_index, created_at";

#[async_trait]
impl EntityStore for PgStore {
    async fn insert_teacher(&self, teacher: NewTeacher) -> Result<Teacher> {
        let row = sqlx::query_as::<_, Teacher>(
            r#"
            INSERT INTO teachers (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(teacher.name)
        .bind(teacher.email)
        .bind(teacher.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_teacher(&self, id: Uuid) -> Result<Option<Teacher>> {
        let row = sqlx::query_as::<_, Teacher>(
            r#"SELECT id, name, email, password_hash, created_at FROM teachers WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_teacher_by_email(&self, email: &str) -> Result<Option<Teacher>> {
        let row = sqlx::query_as::<_, Teacher>(
            r#"SELECT id, name, email, password_hash, created_at FROM teachers WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn rename_teacher(&self, id: Uuid, name: &str) -> Result<Teacher> {
        let row = sqlx::query_as::<_, Teacher>(
            r#"
            UPDATE teachers SET name = $2 WHERE id = $1
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn pin_exists(&self, pin: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM students WHERE pin = $1)"#)
                .bind(pin)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert_student(&self, teacher_id: Uuid, name: &str, pin: &str) -> Result<Student> {
        let row = sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (id, name, pin, teacher_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, pin, teacher_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(pin)
        .bind(teacher_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
        let row = sqlx::query_as::<_, Student>(
            r#"SELECT id, name, pin, teacher_id, created_at FROM students WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_student_by_pin(&self, pin: &str) -> Result<Option<Student>> {
        let row = sqlx::query_as::<_, Student>(
            r#"SELECT id, name, pin, teacher_id, created_at FROM students WHERE pin = $1"#,
        )
        .bind(pin)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_students(&self, teacher_id: Uuid) -> Result<Vec<Student>> {
        let rows = sqlx::query_as::<_, Student>(
            r#"
            SELECT id, name, pin, teacher_id, created_at FROM students
            WHERE teacher_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_student(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM students WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_exam(
        &self,
        teacher_id: Uuid,
        title: &str,
        shuffle_questions: bool,
    ) -> Result<Exam> {
        let sql = format!(
            "INSERT INTO exams (id, title, teacher_id, shuffle_questions) VALUES ($1, $2, $3, $4) RETURNING {}",
            EXAM_COLUMNS
        );
        let row = sqlx::query_as::<_, Exam>(&sql)
            .bind(Uuid::new_v4())
            .bind(title)
            .bind(teacher_id)
            .bind(shuffle_questions)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_exam(&self, id: Uuid) -> Result<Option<Exam>> {
        let sql = format!("SELECT {} FROM exams WHERE id = $1", EXAM_COLUMNS);
        let row = sqlx::query_as::<_, Exam>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_exams_by_teacher(&self, teacher_id: Uuid) -> Result<Vec<Exam>> {
        let sql = format!(
            "SELECT {} FROM exams WHERE teacher_id = $1 ORDER BY created_at DESC",
            EXAM_COLUMNS
        );
        let rows = sqlx::query_as::<_, Exam>(&sql)
            .bind(teacher_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_exams_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Exam>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM exams WHERE id = ANY($1) ORDER BY created_at DESC",
            EXAM_COLUMNS
        );
        let rows = sqlx::query_as::<_, Exam>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_questions(&self, exam_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM questions WHERE exam_id = $1"#)
            .bind(exam_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update_exam(&self, id: Uuid, changes: ExamChanges) -> Result<Exam> {
        let sql = format!(
            r#"
            UPDATE exams
            SET title = COALESCE($2, title),
                shuffle_questions = COALESCE($3, shuffle_questions)
            WHERE id = $1
            RETURNING {}
            "#,
            EXAM_COLUMNS
        );
        let row = sqlx::query_as::<_, Exam>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.shuffle_questions)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_exam(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM exams WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_question(
        &self,
        exam_id: Uuid,
        question: NewQuestion,
    ) -> Result<QuestionWithOptions> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent appends to the same exam.
        sqlx::query(r#"SELECT id FROM exams WHERE id = $1 FOR UPDATE"#)
            .bind(exam_id)
            .fetch_one(&mut *tx)
            .await?;

        let next_index: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM questions WHERE exam_id = $1"#)
                .bind(exam_id)
                .fetch_one(&mut *tx)
                .await?;

        let sql = format!(
            "INSERT INTO questions (id, exam_id, audio_url, statement, order_index) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            QUESTION_COLUMNS
        );
        let row = sqlx::query_as::<_, Question>(&sql)
            .bind(Uuid::new_v4())
            .bind(exam_id)
            .bind(&question.audio_url)
            .bind(&question.statement)
            .bind(next_index as i32)
            .fetch_one(&mut *tx)
            .await?;

        let options = Self::insert_options(&mut tx, row.id, &question).await?;
        tx.commit().await?;

        Ok(QuestionWithOptions {
            question: row,
            options,
        })
    }

    async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
        let sql = format!("SELECT {} FROM questions WHERE id = $1", QUESTION_COLUMNS);
        let row = sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_questions(&self, exam_id: Uuid) -> Result<Vec<Question>> {
        let sql = format!(
            "SELECT {} FROM questions WHERE exam_id = $1 ORDER BY order_index, created_at",
            QUESTION_COLUMNS
        );
        let rows = sqlx::query_as::<_, Question>(&sql)
            .bind(exam_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_options(&self, question_id: Uuid) -> Result<Vec<QuestionOption>> {
        let rows = sqlx::query_as::<_, QuestionOption>(
            r#"
            SELECT id, question_id, image_url, is_correct, order_index
            FROM question_options
            WHERE question_id = $1
            ORDER BY order_index
            "#,
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn replace_question(
        &self,
        id: Uuid,
        question: NewQuestion,
    ) -> Result<QuestionWithOptions> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE questions SET audio_url = $2, statement = $3 WHERE id = $1 RETURNING {}",
            QUESTION_COLUMNS
        );
        let row = sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .bind(&question.audio_url)
            .bind(&question.statement)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(r#"DELETE FROM question_options WHERE question_id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let options = Self::insert_options(&mut tx, id, &question).await?;
        tx.commit().await?;

        Ok(QuestionWithOptions {
            question: row,
            options,
        })
    }

    async fn delete_question(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let removed: Option<(Uuid, i32)> = sqlx::query_as(
            r#"DELETE FROM questions WHERE id = $1 RETURNING exam_id, order_index"#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((exam_id, order_index)) = removed else {
            return Ok(false);
        };

        sqlx::query(
            r#"
            UPDATE questions SET order_index = order_index - 1
            WHERE exam_id = $1 AND order_index > $2
            "#,
        )
        .bind(exam_id)
        .bind(order_index)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_assignments_for_student(&self, student_id: Uuid) -> Result<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, Assignment>(
            r#"
            SELECT id, student_id, exam_id, assigned_at
            FROM student_exam_assignments
            WHERE student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_assignments_for_teacher(
        &self,
        teacher_id: Uuid,
    ) -> Result<Vec<AssignmentDetail>> {
        let rows = sqlx::query_as::<_, AssignmentDetail>(
            r#"
            SELECT a.id, a.student_id, s.name AS student_name,
                   a.exam_id, e.title AS exam_title, a.assigned_at
            FROM student_exam_assignments a
            JOIN students s ON s.id = a.student_id
            JOIN exams e ON e.id = a.exam_id
            WHERE s.teacher_id = $1
            ORDER BY a.assigned_at DESC
            "#,
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_assignment(&self, student_id: Uuid, exam_id: Uuid) -> Result<Assignment> {
        let row = sqlx::query_as::<_, Assignment>(
            r#"
            INSERT INTO student_exam_assignments (id, student_id, exam_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (student_id, exam_id)
                DO UPDATE SET student_id = EXCLUDED.student_id
            RETURNING id, student_id, exam_id, assigned_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(exam_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>> {
        let row = sqlx::query_as::<_, Assignment>(
            r#"SELECT id, student_id, exam_id, assigned_at FROM student_exam_assignments WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_assignment(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM student_exam_assignments WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_submission(&self, submission: NewSubmission) -> Result<RecordedSubmission> {
        let score = Decimal::from_f64(submission.score)
            .map(|d| d.round_dp(2))
            .ok_or_else(|| Error::Invalid(format!("Invalid score: {}", submission.score)))?;

        let mut tx = self.pool.begin().await?;

        let result: ExamResult = sqlx::query_as::<_, ResultRow>(
            r#"
            INSERT INTO exam_results (id, student_id, exam_id, score, total_questions, correct_answers)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (student_id, exam_id) DO UPDATE SET
                score = EXCLUDED.score,
                total_questions = EXCLUDED.total_questions,
                correct_answers = EXCLUDED.correct_answers,
                completed_at = NOW()
            RETURNING id, student_id, exam_id, score, total_questions, correct_answers, completed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(submission.student_id)
        .bind(submission.exam_id)
        .bind(score)
        .bind(submission.total_questions)
        .bind(submission.correct_answers)
        .fetch_one(&mut *tx)
        .await?
        .into();

        let mut answers = Vec::with_capacity(submission.answers.len());
        for answer in &submission.answers {
            let row = sqlx::query_as::<_, StudentAnswer>(
                r#"
                INSERT INTO student_answers (id, student_id, question_id, selected_option_id, is_correct)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (student_id, question_id) DO UPDATE SET
                    selected_option_id = EXCLUDED.selected_option_id,
                    is_correct = EXCLUDED.is_correct,
                    created_at = NOW()
                RETURNING id, student_id, question_id, selected_option_id, is_correct, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(submission.student_id)
            .bind(answer.question_id)
            .bind(answer.selected_option_id)
            .bind(answer.is_correct)
            .fetch_one(&mut *tx)
            .await?;
            answers.push(row);
        }

        tx.commit().await?;
        Ok(RecordedSubmission { result, answers })
    }

    async fn list_results_for_teacher(&self, teacher_id: Uuid) -> Result<Vec<ResultSummary>> {
        let rows = sqlx::query_as::<_, ResultSummaryRow>(
            r#"
            SELECT e.title AS exam_title, s.name AS student_name, s.pin AS student_pin,
                   r.score, r.total_questions, r.correct_answers, r.completed_at
            FROM exam_results r
            JOIN students s ON s.id = r.student_id
            JOIN exams e ON e.id = r.exam_id
            WHERE s.teacher_id = $1
            ORDER BY r.completed_at DESC
            "#,
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ResultSummary::from).collect())
    }

    async fn list_results_for_exam(&self, exam_id: Uuid) -> Result<Vec<ExamResult>> {
        let rows = sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT id, student_id, exam_id, score, total_questions, correct_answers, completed_at
            FROM exam_results
            WHERE exam_id = $1
            ORDER BY completed_at DESC
            "#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ExamResult::from).collect())
    }

    async fn list_answers_for_student(&self, student_id: Uuid) -> Result<Vec<StudentAnswer>> {
        let rows = sqlx::query_as::<_, StudentAnswer>(
            r#"
            SELECT id, student_id, question_id, selected_option_id, is_correct, created_at
            FROM student_answers
            WHERE student_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
