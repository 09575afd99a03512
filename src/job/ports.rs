use async_trait::async_trait;

use crate::{
    job::error::AnalysisError,
    report::{JobId, JobStatusResponse},
};

#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Creates an analysis job for an already validated, trimmed query.
    async fn submit_query(&self, query: &str) -> Result<JobId, AnalysisError>;

    async fn fetch_job(&self, job_id: &str) -> Result<JobStatusResponse, AnalysisError>;
}
