use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        auth_dto::UpdateProfilePayload,
        teacher_dto::{
            AssignExamPayload, CreateExamPayload, CreateStudentPayload, QuestionPayload,
            UpdateExamPayload,
        },
    },
    error::Result,
    middleware::auth::TeacherContext,
    services::export_service::XLSX_CONTENT_TYPE,
    AppState,
};

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
) -> Result<impl IntoResponse> {
    let teacher = state.teacher_service.profile(ctx.teacher_id).await?;
    Ok(Json(teacher))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let teacher = state
        .teacher_service
        .rename(ctx.teacher_id, &payload.name)
        .await?;
    Ok(Json(teacher))
}

#[axum::debug_handler]
pub async fn list_students(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
) -> Result<impl IntoResponse> {
    let students = state.exam_service.list_students(ctx.teacher_id).await?;
    Ok(Json(students))
}

#[axum::debug_handler]
pub async fn create_student(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
    Json(payload): Json<CreateStudentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let student = state
        .pin_service
        .create_student(ctx.teacher_id, &payload.name)
        .await?;
    Ok((StatusCode::CREATED, Json(student)))
}

#[axum::debug_handler]
pub async fn delete_student(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.exam_service.delete_student(ctx.teacher_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_exams(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
) -> Result<impl IntoResponse> {
    let exams = state.exam_service.list_exams(ctx.teacher_id).await?;
    Ok(Json(exams))
}

#[axum::debug_handler]
pub async fn create_exam(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
    Json(payload): Json<CreateExamPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let exam = state.exam_service.create_exam(ctx.teacher_id, payload).await?;
    Ok((StatusCode::CREATED, Json(exam)))
}

#[axum::debug_handler]
pub async fn update_exam(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateExamPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let exam = state
        .exam_service
        .update_exam(ctx.teacher_id, id, payload)
        .await?;
    Ok(Json(exam))
}

#[axum::debug_handler]
pub async fn delete_exam(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.exam_service.delete_exam(ctx.teacher_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let questions = state
        .exam_service
        .list_questions(ctx.teacher_id, exam_id)
        .await?;
    Ok(Json(questions))
}

#[axum::debug_handler]
pub async fn add_question(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
    Path(exam_id): Path<Uuid>,
    Json(payload): Json<QuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let question = state
        .exam_service
        .add_question(ctx.teacher_id, exam_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

#[axum::debug_handler]
pub async fn replace_question(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let question = state
        .exam_service
        .replace_question(ctx.teacher_id, id, payload)
        .await?;
    Ok(Json(question))
}

#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.exam_service.delete_question(ctx.teacher_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_assignments(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
) -> Result<impl IntoResponse> {
    let assignments = state
        .assignment_service
        .list_assignments(ctx.teacher_id)
        .await?;
    Ok(Json(assignments))
}

#[axum::debug_handler]
pub async fn assign_exam(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
    Json(payload): Json<AssignExamPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let assignments = state
        .assignment_service
        .assign(ctx.teacher_id, payload.exam_id, &payload.student_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(assignments)))
}

#[axum::debug_handler]
pub async fn delete_assignment(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .assignment_service
        .remove_assignment(ctx.teacher_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_results(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
) -> Result<impl IntoResponse> {
    let results = state.result_service.list_results(ctx.teacher_id).await?;
    Ok(Json(results))
}

#[axum::debug_handler]
pub async fn export_results(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeacherContext>,
) -> Result<impl IntoResponse> {
    let buffer = state
        .result_service
        .export_results_xlsx(ctx.teacher_id)
        .await?;
    let filename = format!("results_{}.xlsx", chrono::Utc::now().format("%Y%m%d"));
    let disposition = format!("attachment; filename=\"{}\"", filename);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}
