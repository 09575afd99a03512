use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use pin_analyzer::{
    events::{AnalysisEvent, AnalysisEventBus},
    job::{
        AnalysisBackend, AnalysisError, AnalysisErrorKind, JobClient, PollPolicy,
        error::poll_transport_failed,
    },
    report::{AnalysisReport, JobId, JobStatus, JobStatusResponse},
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct ScriptedBackend {
    script: Mutex<VecDeque<Result<JobStatusResponse, AnalysisError>>>,
    latency: Duration,
    submissions: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetch_starts: Mutex<Vec<Instant>>,
}

impl ScriptedBackend {
    fn new(script: Vec<Result<JobStatusResponse, AnalysisError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn fetch_count(&self) -> usize {
        self.fetch_starts.lock().expect("lock should succeed").len()
    }

    fn fetch_offsets(&self, started: Instant) -> Vec<Duration> {
        self.fetch_starts
            .lock()
            .expect("lock should succeed")
            .iter()
            .map(|at| at.duration_since(started))
            .collect()
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    async fn submit_query(&self, _query: &str) -> Result<JobId, AnalysisError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok("job-1".to_string())
    }

    async fn fetch_job(&self, _job_id: &str) -> Result<JobStatusResponse, AnalysisError> {
        self.fetch_starts
            .lock()
            .expect("lock should succeed")
            .push(Instant::now());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("lock should succeed")
            .pop_front()
            .unwrap_or(Ok(JobStatusResponse::Pending))
    }
}

fn completed() -> JobStatusResponse {
    JobStatusResponse::Completed {
        result: Some(AnalysisReport {
            report_title: "report".to_string(),
            ..AnalysisReport::default()
        }),
    }
}

fn client(backend: Arc<ScriptedBackend>) -> JobClient {
    JobClient::new(backend, PollPolicy::default())
}

#[tokio::test(start_paused = true)]
async fn given_job_completing_on_third_tick_when_polling_then_polls_every_interval() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        Ok(JobStatusResponse::Pending),
        Ok(JobStatusResponse::Pending),
        Ok(completed()),
    ]));
    let client = client(Arc::clone(&backend));
    let started = Instant::now();

    let job = client
        .poll_until_terminal("job-1", &CancellationToken::new())
        .await
        .expect("job should complete");

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.job_id, "job-1");
    assert!(job.result.is_some());
    assert_eq!(
        backend.fetch_offsets(started),
        vec![
            Duration::from_secs(3),
            Duration::from_secs(6),
            Duration::from_secs(9)
        ]
    );
    assert_eq!(started.elapsed(), Duration::from_secs(9));
}

#[tokio::test(start_paused = true)]
async fn given_job_never_settles_when_polling_then_times_out_at_deadline() {
    let backend = Arc::new(ScriptedBackend::new(Vec::new()));
    let client = client(Arc::clone(&backend));
    let started = Instant::now();

    let err = client
        .poll_until_terminal("job-1", &CancellationToken::new())
        .await
        .expect_err("polling should time out");

    assert_eq!(err.kind, AnalysisErrorKind::PollTimeout);
    assert_eq!(err.job_id.as_deref(), Some("job-1"));
    assert_eq!(started.elapsed(), Duration::from_secs(300));
    assert!(err.to_string().contains("300000ms"), "unexpected error: {err}");
    // Ticks at 3s..=297s poll; the tick coinciding with the deadline does not.
    assert_eq!(backend.fetch_count(), 99);
}

#[tokio::test(start_paused = true)]
async fn given_custom_policy_when_polling_then_timeout_follows_policy() {
    let backend = Arc::new(ScriptedBackend::new(Vec::new()));
    let client = JobClient::new(
        Arc::clone(&backend) as Arc<dyn AnalysisBackend>,
        PollPolicy {
            interval: Duration::from_millis(500),
            timeout: Duration::from_millis(1_750),
        },
    );
    let started = Instant::now();

    let err = client
        .poll_until_terminal("job-1", &CancellationToken::new())
        .await
        .expect_err("polling should time out");

    assert_eq!(err.kind, AnalysisErrorKind::PollTimeout);
    assert_eq!(started.elapsed(), Duration::from_millis(1_750));
    assert_eq!(backend.fetch_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn given_transport_error_when_polling_then_aborts_without_retry() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        Ok(JobStatusResponse::Pending),
        Err(poll_transport_failed("job-1", "connection reset").with_http_status(502)),
        Ok(completed()),
    ]));
    let client = client(Arc::clone(&backend));
    let started = Instant::now();

    let err = client
        .poll_until_terminal("job-1", &CancellationToken::new())
        .await
        .expect_err("transport error should abort polling");

    assert_eq!(err.kind, AnalysisErrorKind::PollTransport);
    assert_eq!(err.http_status, Some(502));
    assert_eq!(err.user_message(), "분석 중 오류가 발생했습니다.");
    assert_eq!(backend.fetch_count(), 2);
    assert_eq!(started.elapsed(), Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn given_failed_job_when_polling_then_returns_failed_job() {
    let backend = Arc::new(ScriptedBackend::new(vec![Ok(JobStatusResponse::Failed {
        error: Some("agent crashed".to_string()),
    })]));
    let client = client(Arc::clone(&backend));

    let job = client
        .poll_until_terminal("job-1", &CancellationToken::new())
        .await
        .expect("failed is a terminal status");

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("agent crashed"));
    assert_eq!(backend.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn given_cancellation_when_polling_then_stops_with_cancelled() {
    let backend = Arc::new(ScriptedBackend::new(Vec::new()));
    let client = client(Arc::clone(&backend));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(4)).await;
        trigger.cancel();
    });

    let err = client
        .poll_until_terminal("job-1", &cancel)
        .await
        .expect_err("cancellation should stop polling");

    assert_eq!(err.kind, AnalysisErrorKind::Cancelled);
    assert_eq!(backend.fetch_count(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.fetch_count(), 1, "no poll may outlive the task");
}

#[tokio::test(start_paused = true)]
async fn given_slow_backend_when_polling_then_polls_never_overlap() {
    let backend = Arc::new(
        ScriptedBackend::new(vec![
            Ok(JobStatusResponse::Pending),
            Ok(JobStatusResponse::Pending),
            Ok(completed()),
        ])
        .with_latency(Duration::from_secs(5)),
    );
    let client = client(Arc::clone(&backend));

    let job = client
        .poll_until_terminal("job-1", &CancellationToken::new())
        .await
        .expect("job should complete");

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(backend.fetch_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn given_poll_in_flight_at_deadline_when_polling_then_deadline_cancels_it() {
    let backend = Arc::new(ScriptedBackend::new(vec![Ok(completed())]).with_latency(Duration::from_secs(10)));
    let client = JobClient::new(
        Arc::clone(&backend) as Arc<dyn AnalysisBackend>,
        PollPolicy {
            interval: Duration::from_secs(3),
            timeout: Duration::from_secs(5),
        },
    );
    let started = Instant::now();

    let err = client
        .poll_until_terminal("job-1", &CancellationToken::new())
        .await
        .expect_err("deadline should win over the slow poll");

    assert_eq!(err.kind, AnalysisErrorKind::PollTimeout);
    assert_eq!(started.elapsed(), Duration::from_secs(5));
    assert_eq!(backend.fetch_count(), 1);
}

#[tokio::test]
async fn given_blank_query_when_submitting_then_rejects_before_io() {
    let backend = Arc::new(ScriptedBackend::new(Vec::new()));
    let client = client(Arc::clone(&backend));

    let err = client
        .submit_query("   \n")
        .await
        .expect_err("blank query should be rejected");

    assert_eq!(err.kind, AnalysisErrorKind::InvalidQuery);
    assert_eq!(err.user_message(), "검색어를 입력해주세요");
    assert_eq!(backend.submissions.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn given_event_bus_when_job_runs_then_publishes_progress() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        Ok(JobStatusResponse::Pending),
        Ok(completed()),
    ]));
    let events = AnalysisEventBus::default();
    let mut receiver = events.subscribe();
    let client = client(Arc::clone(&backend)).with_events(events);

    let job_id = client
        .submit_query("  이재명  ")
        .await
        .expect("submission should succeed");
    client
        .poll_until_terminal(&job_id, &CancellationToken::new())
        .await
        .expect("job should complete");

    assert_eq!(
        receiver.drain(),
        vec![
            AnalysisEvent::JobSubmitted {
                job_id: "job-1".to_string(),
                query: "이재명".to_string(),
            },
            AnalysisEvent::JobPolled {
                job_id: "job-1".to_string(),
                attempt: 1,
                status: JobStatus::Pending,
            },
            AnalysisEvent::JobPolled {
                job_id: "job-1".to_string(),
                attempt: 2,
                status: JobStatus::Completed,
            },
        ]
    );
}
