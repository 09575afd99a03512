use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    events::{AnalysisEvent, AnalysisEventBus},
    graph::{InfluenceGraph, NodeKind},
    report::StockPriceQuote,
    stock::ports::StockQuoteSource,
};

pub const DEFAULT_FETCH_SPACING: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StockLookup {
    Quote(StockPriceQuote),
    Failed { reason: String },
}

impl StockLookup {
    pub fn is_failed(&self) -> bool {
        matches!(self, StockLookup::Failed { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBoard {
    pub lookups: BTreeMap<String, StockLookup>,
    /// False when enrichment was cancelled before every company was fetched.
    pub complete: bool,
}

impl StockBoard {
    pub fn get(&self, company: &str) -> Option<&StockLookup> {
        self.lookups.get(company)
    }

    pub fn failures(&self) -> usize {
        self.lookups.values().filter(|lookup| lookup.is_failed()).count()
    }
}

/// Distinct company names across enterprise nodes, in node order.
pub fn collect_companies(graph: &InfluenceGraph) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut companies = Vec::new();
    for node in graph.nodes_of(NodeKind::Enterprise) {
        for company in node.companies() {
            if seen.insert(company) {
                companies.push(company.to_string());
            }
        }
    }
    companies
}

/// Fetches quotes for one graph load. A second call on the same enricher does nothing.
pub struct StockEnricher {
    source: Arc<dyn StockQuoteSource>,
    spacing: Duration,
    started: AtomicBool,
    events: Option<AnalysisEventBus>,
}

impl StockEnricher {
    pub fn new(source: Arc<dyn StockQuoteSource>, spacing: Duration) -> Self {
        Self {
            source,
            spacing,
            started: AtomicBool::new(false),
            events: None,
        }
    }

    pub fn with_events(mut self, events: AnalysisEventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub async fn enrich_once(
        &self,
        graph: &InfluenceGraph,
        cancel: &CancellationToken,
    ) -> Option<StockBoard> {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::debug!(target: "stock", "stock_enrichment_already_started");
            return None;
        }

        if !graph.has_enterprises() {
            return Some(StockBoard {
                lookups: BTreeMap::new(),
                complete: true,
            });
        }

        Some(self.fetch_sequentially(&collect_companies(graph), cancel).await)
    }

    async fn fetch_sequentially(&self, companies: &[String], cancel: &CancellationToken) -> StockBoard {
        let total = companies.len();
        let mut lookups = BTreeMap::new();
        let mut complete = true;

        tracing::info!(target: "stock", companies = total, "stock_enrichment_started");

        for (index, company) in companies.iter().enumerate() {
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                fetched = self.source.fetch_quote(company) => Some(fetched),
            };
            let Some(fetched) = fetched else {
                complete = false;
                break;
            };

            let lookup = match fetched {
                Ok(quote) => StockLookup::Quote(quote),
                Err(err) => {
                    tracing::warn!(
                        target: "stock",
                        company = %company,
                        error = %err,
                        "stock_quote_failed"
                    );
                    StockLookup::Failed {
                        reason: err.reason(),
                    }
                }
            };

            self.publish(AnalysisEvent::StockQuoteResolved {
                company: company.clone(),
                position: index + 1,
                total,
                ok: !lookup.is_failed(),
            });
            lookups.insert(company.clone(), lookup);

            if index + 1 < total {
                let interrupted = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    _ = tokio::time::sleep(self.spacing) => false,
                };
                if interrupted {
                    complete = false;
                    break;
                }
            }
        }

        let board = StockBoard { lookups, complete };
        tracing::info!(
            target: "stock",
            fetched = board.lookups.len(),
            failures = board.failures(),
            complete,
            "stock_enrichment_finished"
        );
        self.publish(AnalysisEvent::EnrichmentFinished {
            companies: board.lookups.len(),
            failures: board.failures(),
            complete,
        });
        board
    }

    fn publish(&self, event: AnalysisEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}
