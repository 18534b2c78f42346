use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    dto::auth_dto::{AuthResponse, LoginPayload, RegisterPayload},
    error::Result,
    AppState,
};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let teacher = state.teacher_service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(teacher)))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (teacher, token) = state.teacher_service.login(payload).await?;
    Ok(Json(AuthResponse {
        token,
        token_type: "Bearer",
        expires_in: state.teacher_service.token_ttl(),
        teacher,
    }))
}
