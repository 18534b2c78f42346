use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

pub const TEACHER_ROLE: &str = "teacher";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

pub fn issue_teacher_token(teacher_id: Uuid, secret: &str, ttl_seconds: u64) -> Result<String> {
    let exp = Utc::now().timestamp() as u64 + ttl_seconds;
    let claims = Claims {
        sub: teacher_id.to_string(),
        exp: exp as usize,
        role: Some(TEACHER_ROLE.to_string()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("token signing failed: {}", e)))
}

/// Decodes an HS256 token and returns the teacher id it was issued for.
pub fn verify_teacher_token(token: &str, secret: &str) -> Result<Uuid> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| Error::Unauthorized("invalid_token".to_string()))?;

    let role = data.claims.role.unwrap_or_default();
    if !role.eq_ignore_ascii_case(TEACHER_ROLE) {
        return Err(Error::Unauthorized("forbidden".to_string()));
    }
    Uuid::parse_str(&data.claims.sub).map_err(|_| Error::Unauthorized("invalid_token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips_to_teacher_id() {
        let id = Uuid::new_v4();
        let token = issue_teacher_token(id, "s3cret", 60).unwrap();
        assert_eq!(verify_teacher_token(&token, "s3cret").unwrap(), id);
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = issue_teacher_token(Uuid::new_v4(), "one", 60).unwrap();
        let err = verify_teacher_token(&token, "two").unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn other_roles_are_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: (Utc::now().timestamp() + 60) as usize,
            role: Some("hr".into()),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"k"),
        )
        .unwrap();
        assert!(verify_teacher_token(&token, "k").is_err());
    }
}
