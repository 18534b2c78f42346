use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::EntityStore;
use crate::error::{Error, Result};
use crate::models::assignment::{Assignment, AssignmentDetail};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleExam {
    pub id: Uuid,
    pub title: String,
}

#[derive(Clone)]
pub struct AssignmentService {
    store: Arc<dyn EntityStore>,
}

impl AssignmentService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Exams a student may take, newest first.
    ///
    /// With at least one assignment the student sees exactly the assigned
    /// exams; with none, every exam of their teacher.
    pub async fn list_visible_exams(&self, student_id: Uuid) -> Result<Vec<VisibleExam>> {
        let student = self
            .store
            .get_student(student_id)
            .await?
            .ok_or_else(|| Error::NotFound("Student not found".to_string()))?;

        let assignments = self.store.list_assignments_for_student(student.id).await?;
        let exams = if assignments.is_empty() {
            self.store.list_exams_by_teacher(student.teacher_id).await?
        } else {
            let ids: Vec<Uuid> = assignments.iter().map(|a| a.exam_id).collect();
            self.store.list_exams_by_ids(&ids).await?
        };

        Ok(exams
            .into_iter()
            .map(|e| VisibleExam {
                id: e.id,
                title: e.title,
            })
            .collect())
    }

    /// Assigns one exam to several students of the same teacher. Existing
    /// pairs are left as they are.
    pub async fn assign(
        &self,
        teacher_id: Uuid,
        exam_id: Uuid,
        student_ids: &[Uuid],
    ) -> Result<Vec<Assignment>> {
        let exam = self
            .store
            .get_exam(exam_id)
            .await?
            .filter(|e| e.teacher_id == teacher_id)
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))?;

        for student_id in student_ids {
            self.store
                .get_student(*student_id)
                .await?
                .filter(|s| s.teacher_id == teacher_id)
                .ok_or_else(|| Error::NotFound(format!("Student {} not found", student_id)))?;
        }

        let mut created = Vec::with_capacity(student_ids.len());
        for student_id in student_ids {
            created.push(self.store.upsert_assignment(*student_id, exam.id).await?);
        }
        tracing::info!(%exam_id, students = created.len(), "Exam assigned");
        Ok(created)
    }

    pub async fn list_assignments(&self, teacher_id: Uuid) -> Result<Vec<AssignmentDetail>> {
        self.store.list_assignments_for_teacher(teacher_id).await
    }

    pub async fn remove_assignment(&self, teacher_id: Uuid, assignment_id: Uuid) -> Result<()> {
        let assignment = self
            .store
            .get_assignment(assignment_id)
            .await?
            .ok_or_else(|| Error::NotFound("Assignment not found".to_string()))?;
        let owned = self
            .store
            .get_exam(assignment.exam_id)
            .await?
            .is_some_and(|e| e.teacher_id == teacher_id);
        if !owned {
            return Err(Error::NotFound("Assignment not found".to_string()));
        }
        self.store.delete_assignment(assignment_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::models::teacher::NewTeacher;

    async fn teacher(store: &MemoryStore, email: &str) -> Uuid {
        store
            .insert_teacher(NewTeacher {
                name: "T".into(),
                email: email.into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn unassigned_student_sees_all_teacher_exams_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let t = teacher(&store, "a@school.test").await;
        let other = teacher(&store, "b@school.test").await;
        let student = store.insert_student(t, "Kid", "2222").await.unwrap();
        let older = store.insert_exam(t, "Older", false).await.unwrap();
        let newer = store.insert_exam(t, "Newer", false).await.unwrap();
        store.insert_exam(other, "Foreign", false).await.unwrap();

        let service = AssignmentService::new(store.clone());
        let visible = service.list_visible_exams(student.id).await.unwrap();
        let ids: Vec<Uuid> = visible.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn assigned_student_sees_only_assigned_exams() {
        let store = Arc::new(MemoryStore::new());
        let t = teacher(&store, "a@school.test").await;
        let student = store.insert_student(t, "Kid", "3333").await.unwrap();
        let assigned = store.insert_exam(t, "Assigned", false).await.unwrap();
        store.insert_exam(t, "Hidden", false).await.unwrap();

        let service = AssignmentService::new(store.clone());
        service.assign(t, assigned.id, &[student.id]).await.unwrap();
        service.assign(t, assigned.id, &[student.id]).await.unwrap();

        let visible = service.list_visible_exams(student.id).await.unwrap();
        assert_eq!(
            visible,
            vec![VisibleExam {
                id: assigned.id,
                title: "Assigned".into()
            }]
        );
        assert_eq!(service.list_assignments(t).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cannot_assign_foreign_exam() {
        let store = Arc::new(MemoryStore::new());
        let t = teacher(&store, "a@school.test").await;
        let other = teacher(&store, "b@school.test").await;
        let student = store.insert_student(t, "Kid", "4444").await.unwrap();
        let foreign = store.insert_exam(other, "Foreign", false).await.unwrap();

        let service = AssignmentService::new(store.clone());
        let err = service.assign(t, foreign.id, &[student.id]).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_student_is_not_found() {
        let service = AssignmentService::new(Arc::new(MemoryStore::new()));
        let err = service.list_visible_exams(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
