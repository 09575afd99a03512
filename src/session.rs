use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    events::{AnalysisEvent, AnalysisEventBus},
    graph::{GraphLayout, InfluenceGraph, LayoutProfile, StockState, Tooltip},
    job::{
        AnalysisBackend, AnalysisError, JobClient, PollPolicy,
        error::{cancelled, empty_result, job_failed},
    },
    report::{AnalysisReport, JobId, JobStatus},
    stock::{DEFAULT_FETCH_SPACING, StockBoard, StockEnricher, StockQuoteSource},
};

/// Everything one analysis request produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub job_id: JobId,
    pub report: AnalysisReport,
    pub graph: InfluenceGraph,
    pub layout: GraphLayout,
    /// `None` when enrichment was disabled for the request.
    pub stocks: Option<StockBoard>,
}

impl AnalysisOutcome {
    pub fn tooltip(&self, node_id: &str) -> Option<Tooltip> {
        let node = self.graph.node(node_id)?;
        let empty = StockBoard::default();
        let board = self.stocks.as_ref().unwrap_or(&empty);
        Some(Tooltip::for_node(node, StockState::Ready(board)))
    }
}

/// Drives submit, poll, graph build and enrichment for one query at a time.
pub struct AnalysisSession {
    jobs: JobClient,
    stock_source: Option<Arc<dyn StockQuoteSource>>,
    fetch_spacing: Duration,
    profile: LayoutProfile,
    events: AnalysisEventBus,
}

impl AnalysisSession {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        policy: PollPolicy,
        profile: LayoutProfile,
        events: AnalysisEventBus,
    ) -> Self {
        Self {
            jobs: JobClient::new(backend, policy).with_events(events.clone()),
            stock_source: None,
            fetch_spacing: DEFAULT_FETCH_SPACING,
            profile,
            events,
        }
    }

    pub fn with_stock_source(mut self, source: Arc<dyn StockQuoteSource>, spacing: Duration) -> Self {
        self.stock_source = Some(source);
        self.fetch_spacing = spacing;
        self
    }

    pub fn events(&self) -> &AnalysisEventBus {
        &self.events
    }

    pub fn profile(&self) -> LayoutProfile {
        self.profile
    }

    pub async fn run(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        match self.run_inner(query, cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::warn!(
                    target: "session",
                    kind = ?err.kind,
                    job_id = err.job_id.as_deref().unwrap_or("-"),
                    error = %err,
                    "analysis_failed"
                );
                self.events.publish(AnalysisEvent::AnalysisFailed {
                    job_id: err.job_id.clone(),
                    kind: err.kind,
                    message: err.user_message().to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_inner(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let job_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(target: "session", "submission_cancelled");
                return Err(cancelled(None));
            }
            submitted = self.jobs.submit_query(query) => submitted?,
        };
        let job = self.jobs.poll_until_terminal(&job_id, cancel).await?;

        let report = match (job.status, job.result) {
            (JobStatus::Failed, _) => return Err(job_failed(&job_id, job.error.as_deref())),
            (JobStatus::Completed, Some(report)) => report,
            (JobStatus::Completed, None) | (JobStatus::Pending, _) => {
                return Err(empty_result(&job_id));
            }
        };

        let graph = InfluenceGraph::from_report(&report);
        let layout = GraphLayout::compute(&graph, self.profile);
        tracing::info!(
            target: "session",
            job_id = %job_id,
            chains = report.influence_chains.len(),
            nodes = graph.nodes().len(),
            edges = graph.edges().len(),
            "analysis_completed"
        );
        self.events.publish(AnalysisEvent::AnalysisCompleted {
            job_id: job_id.clone(),
            chain_count: report.influence_chains.len(),
        });

        let stocks = match &self.stock_source {
            Some(source) => {
                StockEnricher::new(Arc::clone(source), self.fetch_spacing)
                    .with_events(self.events.clone())
                    .enrich_once(&graph, cancel)
                    .await
            }
            None => None,
        };

        Ok(AnalysisOutcome {
            job_id,
            report,
            graph,
            layout,
            stocks,
        })
    }
}
