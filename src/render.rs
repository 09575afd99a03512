use std::{collections::BTreeMap, fmt::Write as _};

use serde::Serialize;

use crate::{
    graph::{GraphLayout, InfluenceGraph, NodeKind, StockState, Tooltip, truncate_label},
    report::AnalysisReport,
    session::AnalysisOutcome,
    stock::StockBoard,
};

pub const EMPTY_GRAPH_MESSAGE: &str = "관계도를 생성할 수 있는 데이터가 없습니다.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Borrowed view over a laid-out graph, with or without a backing job.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GraphView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<&'a str>,
    pub report: &'a AnalysisReport,
    pub graph: &'a InfluenceGraph,
    pub layout: &'a GraphLayout,
    pub stocks: Option<&'a StockBoard>,
}

impl<'a> From<&'a AnalysisOutcome> for GraphView<'a> {
    fn from(outcome: &'a AnalysisOutcome) -> Self {
        Self {
            job_id: Some(&outcome.job_id),
            report: &outcome.report,
            graph: &outcome.graph,
            layout: &outcome.layout,
            stocks: outcome.stocks.as_ref(),
        }
    }
}

impl GraphView<'_> {
    pub fn tooltips(&self) -> BTreeMap<String, Tooltip> {
        let empty = StockBoard::default();
        let board = self.stocks.unwrap_or(&empty);
        self.graph
            .nodes()
            .iter()
            .map(|node| (node.id.clone(), Tooltip::for_node(node, StockState::Ready(board))))
            .collect()
    }
}

pub fn render(view: GraphView<'_>, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(render_text(view)),
        OutputFormat::Json => render_json(view),
    }
}

pub fn render_json(view: GraphView<'_>) -> Result<String, serde_json::Error> {
    #[derive(Serialize)]
    struct Document<'a> {
        #[serde(flatten)]
        view: GraphView<'a>,
        tooltips: BTreeMap<String, Tooltip>,
    }

    serde_json::to_string_pretty(&Document {
        view,
        tooltips: view.tooltips(),
    })
}

pub fn render_text(view: GraphView<'_>) -> String {
    let mut out = String::new();
    let report = view.report;

    if !report.report_title.is_empty() {
        let _ = writeln!(out, "{}", report.report_title);
    }
    if !report.time_range.is_empty() {
        let _ = writeln!(out, "기간: {}", report.time_range);
    }
    if let Some(notes) = report.notes.as_deref().filter(|notes| !notes.trim().is_empty()) {
        let _ = writeln!(out, "참고: {notes}");
    }
    if let Some(job_id) = view.job_id {
        let _ = writeln!(out, "job: {job_id}");
    }

    if view.graph.is_empty() {
        let _ = writeln!(out, "{EMPTY_GRAPH_MESSAGE}");
        return out;
    }

    let layout = view.layout;
    let max_chars = layout.profile.label_max_chars;
    let _ = writeln!(
        out,
        "\ncanvas {}x{} ({:?})",
        layout.canvas.width, layout.canvas.height, layout.profile.kind
    );

    let tooltips = view.tooltips();
    for kind in NodeKind::COLUMN_ORDER {
        let mut nodes = view.graph.nodes_of(kind).peekable();
        if nodes.peek().is_none() {
            continue;
        }
        let _ = writeln!(out, "\n[{}]", kind.as_str());
        for node in nodes {
            let position = layout
                .position(&node.id)
                .map(|point| format!("({}, {})", point.x, point.y))
                .unwrap_or_else(|| "(-)".to_string());
            let _ = writeln!(
                out,
                "  {:<18} {} {}",
                node.id,
                truncate_label(&node.label, max_chars),
                position
            );
            if let Some(tooltip) = tooltips.get(&node.id) {
                for line in tooltip.lines().iter().skip(1) {
                    let _ = writeln!(out, "      {line}");
                }
            }
        }
    }

    let _ = writeln!(out, "\n[edges]");
    for edge in view.graph.edges() {
        let _ = writeln!(out, "  {} -> {}", edge.source, edge.target);
    }

    out
}
