use crate::model::import::BatchResult;
use serde::Serialize;

/// Status of a background import job, as reported by `GET /api/imports/jobs/{job_id}`.
#[derive(Clone, Debug, Serialize)]
pub enum JobStatus {
    Pending,
    /// Rows written so far.
    InProgress(u32),
    Completed(BatchResult),
    Failed(String),
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed(_) | JobStatus::Failed(_) | JobStatus::Cancelled
        )
    }
}
