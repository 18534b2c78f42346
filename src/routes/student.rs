use axum::{extract::State, response::IntoResponse, Json};

use crate::{
    dto::student_dto::{
        GetExamsRequest, GetExamsResponse, GetQuestionsRequest, GetQuestionsResponse,
        QuestionView, StudentView, SubmitExamRequest, SubmitExamResponse, ValidatePinRequest,
        ValidatePinResponse,
    },
    error::Result,
    services::submission_service::SubmittedAnswer,
    AppState,
};

#[axum::debug_handler]
pub async fn validate_pin(
    State(state): State<AppState>,
    Json(req): Json<ValidatePinRequest>,
) -> Result<impl IntoResponse> {
    let student = state.pin_service.authenticate(&req.pin).await?;
    Ok(Json(ValidatePinResponse {
        student: StudentView::from(student),
    }))
}

#[axum::debug_handler]
pub async fn get_exams(
    State(state): State<AppState>,
    Json(req): Json<GetExamsRequest>,
) -> Result<impl IntoResponse> {
    let exams = state
        .assignment_service
        .list_visible_exams(req.student_id)
        .await?;
    Ok(Json(GetExamsResponse { exams }))
}

#[axum::debug_handler]
pub async fn get_questions(
    State(state): State<AppState>,
    Json(req): Json<GetQuestionsRequest>,
) -> Result<impl IntoResponse> {
    let composed = state.composer_service.compose_exam(req.exam_id).await?;
    Ok(Json(GetQuestionsResponse {
        questions: composed.into_iter().map(QuestionView::from).collect(),
    }))
}

#[axum::debug_handler]
pub async fn submit_exam(
    State(state): State<AppState>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse> {
    let claimed = req.claimed();
    let answers = req.answers.into_iter().map(SubmittedAnswer::from).collect();
    let result = state
        .submission_service
        .submit(req.student_id, req.exam_id, answers, claimed)
        .await?;
    Ok(Json(SubmitExamResponse {
        success: true,
        score: result.score,
        total_questions: result.total_questions,
        correct_answers: result.correct_answers,
    }))
}
