pub mod auth;
pub mod health;
pub mod student;
pub mod teacher;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{middleware::auth::require_teacher, middleware::cors::api_cors, AppState};

pub fn create_router(state: AppState) -> Router {
    let student_api = Router::new()
        .route("/api/student/validate-pin", post(student::validate_pin))
        .route("/api/student/get-exams", post(student::get_exams))
        .route("/api/student/get-questions", post(student::get_questions))
        .route("/api/student/submit-exam", post(student::submit_exam));

    let auth_api = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    let teacher_api = Router::new()
        .route(
            "/api/teacher/profile",
            get(teacher::get_profile).patch(teacher::update_profile),
        )
        .route(
            "/api/teacher/students",
            get(teacher::list_students).post(teacher::create_student),
        )
        .route("/api/teacher/students/:id", delete(teacher::delete_student))
        .route(
            "/api/teacher/exams",
            get(teacher::list_exams).post(teacher::create_exam),
        )
        .route(
            "/api/teacher/exams/:id",
            patch(teacher::update_exam).delete(teacher::delete_exam),
        )
        .route(
            "/api/teacher/exams/:id/questions",
            get(teacher::list_questions).post(teacher::add_question),
        )
        .route(
            "/api/teacher/questions/:id",
            put(teacher::replace_question).delete(teacher::delete_question),
        )
        .route(
            "/api/teacher/assignments",
            get(teacher::list_assignments).post(teacher::assign_exam),
        )
        .route(
            "/api/teacher/assignments/:id",
            delete(teacher::delete_assignment),
        )
        .route("/api/teacher/results", get(teacher::list_results))
        .route("/api/teacher/results/export", get(teacher::export_results))
        .layer(from_fn_with_state(state.clone(), require_teacher));

    Router::new()
        .route("/health", get(health::health))
        .merge(student_api)
        .merge(auth_api)
        .merge(teacher_api)
        .with_state(state)
        .layer(api_cors())
        .layer(TraceLayer::new_for_http())
}
