use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::report::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisErrorKind {
    InvalidQuery,
    Submission,
    PollTransport,
    PollTimeout,
    JobFailed,
    EmptyResult,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisError {
    pub kind: AnalysisErrorKind,
    pub message: String,
    pub job_id: Option<JobId>,
    pub http_status: Option<u16>,
}

impl AnalysisError {
    pub fn new(kind: AnalysisErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            job_id: None,
            http_status: None,
        }
    }

    pub fn with_job_id(mut self, job_id: impl Into<JobId>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Text shown to the person who submitted the query. Every kind ends the request.
    pub fn user_message(&self) -> &'static str {
        match self.kind {
            AnalysisErrorKind::InvalidQuery => "검색어를 입력해주세요",
            AnalysisErrorKind::Submission => "분석 대상을 가져오는데 실패했습니다. 다시 시도해주세요.",
            AnalysisErrorKind::PollTimeout => "분석 시간이 초과되었습니다. 다시 시도해주세요.",
            AnalysisErrorKind::PollTransport | AnalysisErrorKind::JobFailed => {
                "분석 중 오류가 발생했습니다."
            }
            AnalysisErrorKind::EmptyResult => "분석 결과를 불러올 수 없습니다",
            AnalysisErrorKind::Cancelled => "분석이 취소되었습니다.",
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.job_id, self.http_status) {
            (Some(job_id), Some(status)) => {
                write!(f, "{} (job={}, http_status={})", self.message, job_id, status)
            }
            (Some(job_id), None) => write!(f, "{} (job={})", self.message, job_id),
            (None, Some(status)) => write!(f, "{} (http_status={})", self.message, status),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for AnalysisError {}

pub fn invalid_query(message: impl Into<String>) -> AnalysisError {
    AnalysisError::new(AnalysisErrorKind::InvalidQuery, message)
}

pub fn submission_failed(message: impl Into<String>) -> AnalysisError {
    AnalysisError::new(AnalysisErrorKind::Submission, message)
}

pub fn poll_transport_failed(job_id: &str, message: impl Into<String>) -> AnalysisError {
    AnalysisError::new(AnalysisErrorKind::PollTransport, message).with_job_id(job_id)
}

pub fn poll_timed_out(job_id: &str, elapsed: Duration) -> AnalysisError {
    AnalysisError::new(
        AnalysisErrorKind::PollTimeout,
        format!(
            "job did not reach a terminal status within {}ms",
            elapsed.as_millis()
        ),
    )
    .with_job_id(job_id)
}

pub fn job_failed(job_id: &str, backend_error: Option<&str>) -> AnalysisError {
    AnalysisError::new(
        AnalysisErrorKind::JobFailed,
        backend_error.unwrap_or("Analysis failed"),
    )
    .with_job_id(job_id)
}

pub fn empty_result(job_id: &str) -> AnalysisError {
    AnalysisError::new(
        AnalysisErrorKind::EmptyResult,
        "job completed without a report",
    )
    .with_job_id(job_id)
}

pub fn cancelled(job_id: Option<&str>) -> AnalysisError {
    let err = AnalysisError::new(AnalysisErrorKind::Cancelled, "analysis was cancelled");
    match job_id {
        Some(job_id) => err.with_job_id(job_id),
        None => err,
    }
}
