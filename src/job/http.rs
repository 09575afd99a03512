use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url, header};
use serde_json::json;

use crate::{
    job::{
        error::{AnalysisError, poll_transport_failed, submission_failed},
        ports::AnalysisBackend,
    },
    report::{JobId, JobStatusResponse, SubmitJobResponse},
};

const ERROR_BODY_PREVIEW_CHARS: usize = 240;

#[derive(Clone)]
pub struct HttpAnalysisBackend {
    client: Client,
    api_base: String,
    submit_timeout: Duration,
    poll_timeout: Duration,
}

impl HttpAnalysisBackend {
    pub fn new(
        api_base: impl Into<String>,
        submit_timeout: Duration,
        poll_timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| submission_failed(format!("failed to build http client: {err}")))?;

        Ok(Self::with_client(client, api_base, submit_timeout, poll_timeout))
    }

    pub fn with_client(
        client: Client,
        api_base: impl Into<String>,
        submit_timeout: Duration,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            submit_timeout,
            poll_timeout,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn job_url(&self, job_id: &str) -> Result<Url, AnalysisError> {
        let mut url = Url::parse(&format!("{}/job", self.api_base)).map_err(|err| {
            poll_transport_failed(job_id, format!("invalid api base '{}': {err}", self.api_base))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                poll_transport_failed(job_id, format!("api base '{}' cannot carry a path", self.api_base))
            })?
            .push(job_id);
        Ok(url)
    }
}

#[async_trait]
impl AnalysisBackend for HttpAnalysisBackend {
    async fn submit_query(&self, query: &str) -> Result<JobId, AnalysisError> {
        let url = format!("{}/generate", self.api_base);
        let response = self
            .client
            .post(&url)
            .timeout(self.submit_timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|err| submission_failed(format!("job submission request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(submission_failed(with_body_preview(
                format!("backend returned status {}", status.as_u16()),
                &body,
            ))
            .with_http_status(status.as_u16()));
        }

        let created: SubmitJobResponse = response
            .json()
            .await
            .map_err(|err| submission_failed(format!("job submission response was malformed: {err}")))?;

        if created.job_id.trim().is_empty() {
            return Err(submission_failed("backend returned an empty job_id"));
        }

        tracing::debug!(target: "job", job_id = %created.job_id, "job_submitted");
        Ok(created.job_id)
    }

    async fn fetch_job(&self, job_id: &str) -> Result<JobStatusResponse, AnalysisError> {
        let url = self.job_url(job_id)?;
        let response = self
            .client
            .get(url)
            .timeout(self.poll_timeout)
            .send()
            .await
            .map_err(|err| poll_transport_failed(job_id, format!("job status request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(poll_transport_failed(
                job_id,
                with_body_preview(format!("backend returned status {}", status.as_u16()), &body),
            )
            .with_http_status(status.as_u16()));
        }

        response.json::<JobStatusResponse>().await.map_err(|err| {
            poll_transport_failed(job_id, format!("job status response was malformed: {err}"))
        })
    }
}

fn with_body_preview(message: String, body: &str) -> String {
    let preview = body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect::<String>();
    if preview.trim().is_empty() {
        message
    } else {
        format!("{message}: {preview}")
    }
}
