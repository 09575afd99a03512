use std::{sync::Arc, time::Duration};

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;

use crate::{
    events::{AnalysisEvent, AnalysisEventBus},
    job::{
        error::{AnalysisError, cancelled, invalid_query, poll_timed_out},
        ports::AnalysisBackend,
    },
    report::{AnalysisJob, JobId},
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Submits analysis queries and follows the resulting job until it settles.
#[derive(Clone)]
pub struct JobClient {
    backend: Arc<dyn AnalysisBackend>,
    policy: PollPolicy,
    events: Option<AnalysisEventBus>,
}

impl JobClient {
    pub fn new(backend: Arc<dyn AnalysisBackend>, policy: PollPolicy) -> Self {
        Self {
            backend,
            policy,
            events: None,
        }
    }

    pub fn with_events(mut self, events: AnalysisEventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub async fn submit_query(&self, query: &str) -> Result<JobId, AnalysisError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(invalid_query("query must not be blank"));
        }

        let job_id = self.backend.submit_query(query).await?;
        tracing::info!(target: "job", job_id = %job_id, query = %query, "job_created");
        self.publish(AnalysisEvent::JobSubmitted {
            job_id: job_id.clone(),
            query: query.to_string(),
        });
        Ok(job_id)
    }

    /// One status request; no retry.
    pub async fn poll_job(&self, job_id: &str) -> Result<AnalysisJob, AnalysisError> {
        let response = self.backend.fetch_job(job_id).await?;
        Ok(AnalysisJob::from_response(job_id, response))
    }

    /// Polls every `interval` until the job is terminal.
    ///
    /// The first poll fires one interval after the call. The first transport
    /// error stops polling and is returned as is. The deadline also aborts a
    /// poll that is still in flight.
    pub async fn poll_until_terminal(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
    ) -> Result<AnalysisJob, AnalysisError> {
        let started = Instant::now();
        let deadline = sleep(self.policy.timeout);
        tokio::pin!(deadline);

        let period = self.policy.interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(started + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut attempt: u32 = 0;
        loop {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(target: "job", job_id = %job_id, attempt, "job_polling_cancelled");
                    return Err(cancelled(Some(job_id)));
                }
                _ = &mut deadline => {
                    let elapsed = started.elapsed();
                    tracing::warn!(
                        target: "job",
                        job_id = %job_id,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "job_polling_timed_out"
                    );
                    return Err(poll_timed_out(job_id, elapsed));
                }
                polled = self.poll_on_tick(&mut ticker, job_id) => polled,
            };

            attempt = attempt.saturating_add(1);
            let job = match polled {
                Ok(job) => job,
                Err(err) => {
                    tracing::warn!(
                        target: "job",
                        job_id = %job_id,
                        attempt,
                        error = %err,
                        "job_polling_aborted"
                    );
                    return Err(err);
                }
            };

            tracing::debug!(
                target: "job",
                job_id = %job_id,
                attempt,
                status = job.status.as_str(),
                "job_polled"
            );
            self.publish(AnalysisEvent::JobPolled {
                job_id: job_id.to_string(),
                attempt,
                status: job.status,
            });

            if job.is_terminal() {
                return Ok(job);
            }
        }
    }

    async fn poll_on_tick(
        &self,
        ticker: &mut Interval,
        job_id: &str,
    ) -> Result<AnalysisJob, AnalysisError> {
        ticker.tick().await;
        self.poll_job(job_id).await
    }

    fn publish(&self, event: AnalysisEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}
