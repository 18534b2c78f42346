use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::EntityStore;
use crate::dto::auth_dto::{LoginPayload, RegisterPayload};
use crate::error::{Error, Result};
use crate::models::teacher::{NewTeacher, Teacher};
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::token::issue_teacher_token;

#[derive(Clone)]
pub struct TeacherService {
    store: Arc<dyn EntityStore>,
    jwt_secret: String,
    jwt_expiration_seconds: u64,
}

impl TeacherService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        jwt_secret: String,
        jwt_expiration_seconds: u64,
    ) -> Self {
        Self {
            store,
            jwt_secret,
            jwt_expiration_seconds,
        }
    }

    pub fn token_ttl(&self) -> u64 {
        self.jwt_expiration_seconds
    }

    pub async fn register(&self, payload: RegisterPayload) -> Result<Teacher> {
        let email = payload.email.trim().to_lowercase();
        if self.store.find_teacher_by_email(&email).await?.is_some() {
            return Err(Error::Conflict("Email is already registered".to_string()));
        }
        let password_hash = hash_password(&payload.password)?;
        let teacher = self
            .store
            .insert_teacher(NewTeacher {
                name: payload.name.trim().to_string(),
                email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                Error::Conflict(_) => Error::Conflict("Email is already registered".to_string()),
                other => other,
            })?;
        tracing::info!(teacher_id = %teacher.id, "Teacher registered");
        Ok(teacher)
    }

    /// Returns the teacher with a freshly signed bearer token.
    pub async fn login(&self, payload: LoginPayload) -> Result<(Teacher, String)> {
        let email = payload.email.trim().to_lowercase();
        let teacher = self
            .store
            .find_teacher_by_email(&email)
            .await?
            .ok_or_else(|| Error::Unauthorized("Invalid email or password".to_string()))?;
        if !verify_password(&payload.password, &teacher.password_hash)? {
            tracing::warn!(teacher_id = %teacher.id, "Rejected login with wrong password");
            return Err(Error::Unauthorized("Invalid email or password".to_string()));
        }
        let token = issue_teacher_token(teacher.id, &self.jwt_secret, self.jwt_expiration_seconds)?;
        Ok((teacher, token))
    }

    pub async fn profile(&self, teacher_id: Uuid) -> Result<Teacher> {
        self.store
            .get_teacher(teacher_id)
            .await?
            .ok_or_else(|| Error::NotFound("Teacher not found".to_string()))
    }

    pub async fn rename(&self, teacher_id: Uuid, name: &str) -> Result<Teacher> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Invalid("Name must not be blank".to_string()));
        }
        self.store.rename_teacher(teacher_id, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::utils::token::verify_teacher_token;

    fn service() -> TeacherService {
        TeacherService::new(Arc::new(MemoryStore::new()), "secret".into(), 60)
    }

    fn register_payload(email: &str) -> RegisterPayload {
        RegisterPayload {
            name: "Ms. Rivera".into(),
            email: email.into(),
            password: "password123".into(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let service = service();
        let teacher = service.register(register_payload("Rivera@School.test")).await.unwrap();
        assert_eq!(teacher.email, "rivera@school.test");

        let (logged_in, token) = service
            .login(LoginPayload {
                email: "rivera@school.test".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.id, teacher.id);
        assert_eq!(verify_teacher_token(&token, "secret").unwrap(), teacher.id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let service = service();
        service.register(register_payload("a@school.test")).await.unwrap();
        let err = service.register(register_payload("a@school.test")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let service = service();
        service.register(register_payload("a@school.test")).await.unwrap();
        let err = service
            .login(LoginPayload {
                email: "a@school.test".into(),
                password: "nope-nope".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn rename_updates_display_name() {
        let service = service();
        let teacher = service.register(register_payload("a@school.test")).await.unwrap();
        let renamed = service.rename(teacher.id, "  Mr. Chen ").await.unwrap();
        assert_eq!(renamed.name, "Mr. Chen");
        assert!(service.rename(teacher.id, "   ").await.is_err());
    }
}
