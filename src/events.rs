use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{
    job::error::AnalysisErrorKind,
    report::{JobId, JobStatus},
};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    JobSubmitted {
        job_id: JobId,
        query: String,
    },
    JobPolled {
        job_id: JobId,
        attempt: u32,
        status: JobStatus,
    },
    AnalysisCompleted {
        job_id: JobId,
        chain_count: usize,
    },
    AnalysisFailed {
        job_id: Option<JobId>,
        kind: AnalysisErrorKind,
        message: String,
    },
    StockQuoteResolved {
        company: String,
        position: usize,
        total: usize,
        ok: bool,
    },
    EnrichmentFinished {
        companies: usize,
        failures: usize,
        complete: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBusError {
    Closed,
    Lagged(u64),
}

impl std::fmt::Display for EventBusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventBusError::Closed => write!(f, "analysis event bus is closed"),
            EventBusError::Lagged(skipped) => {
                write!(f, "analysis event receiver lagged by {skipped} events")
            }
        }
    }
}

impl std::error::Error for EventBusError {}

/// Publish/subscribe channel for analysis progress, handed to components explicitly.
#[derive(Clone)]
pub struct AnalysisEventBus {
    sender: broadcast::Sender<AnalysisEvent>,
}

impl Default for AnalysisEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AnalysisEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: AnalysisEvent) {
        tracing::trace!(target: "events", event = ?event, "analysis_event_published");
        // No subscribers is fine; the event is simply dropped.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> AnalysisEventReceiver {
        AnalysisEventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub struct AnalysisEventReceiver {
    receiver: broadcast::Receiver<AnalysisEvent>,
}

impl AnalysisEventReceiver {
    pub async fn recv(&mut self) -> Result<AnalysisEvent, EventBusError> {
        self.receiver.recv().await.map_err(|err| match err {
            broadcast::error::RecvError::Closed => EventBusError::Closed,
            broadcast::error::RecvError::Lagged(skipped) => {
                tracing::warn!(target: "events", skipped, "analysis_event_receiver_lagged");
                EventBusError::Lagged(skipped)
            }
        })
    }

    /// Drains everything already buffered without waiting.
    pub fn drain(&mut self) -> Vec<AnalysisEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "events", skipped, "analysis_event_receiver_lagged");
                }
                Err(_) => break,
            }
        }
        events
    }
}
