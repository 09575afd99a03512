use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    events::{AnalysisEvent, AnalysisEventBus, AnalysisEventReceiver, EventBusError},
    graph::{GraphLayout, InfluenceGraph},
    job::HttpAnalysisBackend,
    render::{GraphView, OutputFormat, render},
    report::AnalysisReport,
    session::AnalysisSession,
    stock::{HttpStockQuoteSource, StockQuoteSource},
};

/// Client for the PIN political-influence analyzer
#[derive(Debug, Parser)]
#[command(name = "pin")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (defaults to ./pin.jsonc when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a query, wait for the report and print the influence graph
    Analyze {
        query: String,

        /// Viewport width used to pick the layout profile
        #[arg(long, value_name = "PX")]
        viewport_width: Option<u32>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Skip stock price enrichment
        #[arg(long)]
        no_stocks: bool,
    },

    /// Lay out a saved report without contacting the backend
    Layout {
        report: PathBuf,

        #[arg(long, value_name = "PX")]
        viewport_width: Option<u32>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Look up one stock quote
    Quote { company: String },
}

impl Command {
    /// Subcommand name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Analyze { .. } => "analyze",
            Command::Layout { .. } => "layout",
            Command::Quote { .. } => "quote",
        }
    }
}

enum ExitReason {
    Finished,
    Signal(&'static str),
}

pub async fn run(cli: Cli, mut config: Config) -> Result<()> {
    match cli.command {
        Command::Analyze {
            query,
            viewport_width,
            format,
            no_stocks,
        } => {
            if let Some(width) = viewport_width {
                config.layout.viewport_width_px = width;
            }
            if no_stocks {
                config.enrichment.enabled = false;
            }
            analyze(&config, &query, format).await
        }
        Command::Layout {
            report,
            viewport_width,
            format,
        } => {
            if let Some(width) = viewport_width {
                config.layout.viewport_width_px = width;
            }
            layout_saved_report(&config, &report, format)
        }
        Command::Quote { company } => quote(&config, &company).await,
    }
}

async fn analyze(config: &Config, query: &str, format: OutputFormat) -> Result<()> {
    let events = AnalysisEventBus::default();
    let session = build_session(config, events.clone())?;
    let progress = tokio::spawn(report_progress(events.subscribe()));

    let cancel = CancellationToken::new();
    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;

    let (outcome, exit_reason) = {
        let run = session.run(query, &cancel);
        tokio::pin!(run);
        let mut exit_reason = ExitReason::Finished;
        let outcome = loop {
            tokio::select! {
                outcome = &mut run => break outcome,
                _ = sigint.recv(), if !cancel.is_cancelled() => {
                    exit_reason = ExitReason::Signal("SIGINT");
                    cancel.cancel();
                }
                _ = sigterm.recv(), if !cancel.is_cancelled() => {
                    exit_reason = ExitReason::Signal("SIGTERM");
                    cancel.cancel();
                }
            }
        };
        (outcome, exit_reason)
    };

    drop(session);
    drop(events);
    let _ = progress.await;

    if let ExitReason::Signal(signal_name) = exit_reason {
        eprintln!("pin: received {signal_name}, analysis cancelled");
    }

    let outcome = outcome.map_err(|err| {
        let message = err.user_message();
        anyhow::Error::new(err).context(message)
    })?;
    let rendered = render(GraphView::from(&outcome), format).context("failed to render outcome")?;
    println!("{rendered}");
    Ok(())
}

fn layout_saved_report(config: &Config, path: &std::path::Path, format: OutputFormat) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read report {}", path.display()))?;
    let report: AnalysisReport = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse report {}", path.display()))?;

    let graph = InfluenceGraph::from_report(&report);
    let layout = GraphLayout::compute(&graph, config.layout.profile());
    let rendered = render(
        GraphView {
            job_id: None,
            report: &report,
            graph: &graph,
            layout: &layout,
            stocks: None,
        },
        format,
    )
    .context("failed to render layout")?;
    println!("{rendered}");
    Ok(())
}

async fn quote(config: &Config, company: &str) -> Result<()> {
    let source = HttpStockQuoteSource::new(&config.api.base_url, config.api.stock_timeout())
        .map_err(|err| anyhow!("failed to build stock client: {err}"))?;
    match source.fetch_quote(company).await {
        Ok(quote) => {
            println!(
                "{company}: {} {} {} ({})",
                quote.price,
                quote.direction.label(),
                quote.change,
                quote.change_percent
            );
            Ok(())
        }
        Err(err) => {
            let reason = err.reason();
            Err(anyhow::Error::new(err).context(reason))
        }
    }
}

fn build_session(config: &Config, events: AnalysisEventBus) -> Result<AnalysisSession> {
    let policy = config.polling.policy();
    let backend = HttpAnalysisBackend::new(
        &config.api.base_url,
        config.api.submit_timeout(),
        policy.timeout,
    )
    .map_err(|err| anyhow!("failed to build analysis client: {err}"))?;

    let session =
        AnalysisSession::new(Arc::new(backend), policy, config.layout.profile(), events);
    if !config.enrichment.enabled {
        return Ok(session);
    }

    let stocks = HttpStockQuoteSource::new(&config.api.base_url, config.api.stock_timeout())
        .map_err(|err| anyhow!("failed to build stock client: {err}"))?;
    Ok(session.with_stock_source(Arc::new(stocks), config.enrichment.delay()))
}

async fn report_progress(mut receiver: AnalysisEventReceiver) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                if let Some(line) = progress_line(&event) {
                    eprintln!("{line}");
                }
            }
            Err(EventBusError::Lagged(_)) => continue,
            Err(EventBusError::Closed) => break,
        }
    }
}

fn progress_line(event: &AnalysisEvent) -> Option<String> {
    match event {
        AnalysisEvent::JobSubmitted { job_id, .. } => Some(format!("분석 요청 접수: {job_id}")),
        AnalysisEvent::JobPolled { attempt, status, .. } => {
            Some(format!("분석 상태 확인 #{attempt}: {}", status.as_str()))
        }
        AnalysisEvent::AnalysisCompleted { chain_count, .. } => {
            Some(format!("분석 완료: 영향 경로 {chain_count}개"))
        }
        AnalysisEvent::AnalysisFailed { message, .. } => Some(message.clone()),
        AnalysisEvent::StockQuoteResolved {
            company,
            position,
            total,
            ok,
        } => Some(format!(
            "주가 조회 {position}/{total}: {company}{}",
            if *ok { "" } else { " (조회 실패)" }
        )),
        AnalysisEvent::EnrichmentFinished { .. } => None,
    }
}
