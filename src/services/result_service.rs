use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::EntityStore;
use crate::error::Result;
use crate::models::exam_result::ResultSummary;
use crate::services::export_service::ExportService;

#[derive(Clone)]
pub struct ResultService {
    store: Arc<dyn EntityStore>,
}

impl ResultService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Results of the teacher's students, newest first.
    pub async fn list_results(&self, teacher_id: Uuid) -> Result<Vec<ResultSummary>> {
        self.store.list_results_for_teacher(teacher_id).await
    }

    pub async fn export_results_xlsx(&self, teacher_id: Uuid) -> Result<Vec<u8>> {
        let results = self.list_results(teacher_id).await?;
        ExportService::generate_results_xlsx(&results)
    }
}
