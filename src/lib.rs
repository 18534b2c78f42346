pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::database::store::EntityStore;
use crate::services::{
    assignment_service::AssignmentService, composer_service::ComposerService,
    exam_service::ExamService, pin_service::PinService, result_service::ResultService,
    submission_service::SubmissionService, teacher_service::TeacherService,
};
use crate::utils::random::RandomSource;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// `"postgres"` or `"memory"`, reported by the health check.
    pub storage_kind: &'static str,
    pub pin_service: PinService,
    pub assignment_service: AssignmentService,
    pub composer_service: ComposerService,
    pub submission_service: SubmissionService,
    pub teacher_service: TeacherService,
    pub exam_service: ExamService,
    pub result_service: ResultService,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>, config: Config, storage_kind: &'static str) -> Self {
        Self::with_random(store, config, storage_kind, RandomSource::from_entropy())
    }

    /// Same as [`AppState::new`] with a caller-supplied random source, so PINs
    /// and shuffles can be reproduced.
    pub fn with_random(
        store: Arc<dyn EntityStore>,
        config: Config,
        storage_kind: &'static str,
        random: RandomSource,
    ) -> Self {
        let pin_service = PinService::new(store.clone(), random.clone());
        let assignment_service = AssignmentService::new(store.clone());
        let composer_service = ComposerService::new(store.clone(), random);
        let submission_service = SubmissionService::new(store.clone());
        let teacher_service = TeacherService::new(
            store.clone(),
            config.jwt_secret.clone(),
            config.jwt_expiration_seconds,
        );
        let exam_service = ExamService::new(store.clone());
        let result_service = ResultService::new(store);

        Self {
            config,
            storage_kind,
            pin_service,
            assignment_service,
            composer_service,
            submission_service,
            teacher_service,
            exam_service,
            result_service,
        }
    }
}
