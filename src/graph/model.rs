use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::report::{AnalysisReport, Evidence};

pub const INPUT_NODE_ID: &str = "input-1";
pub const UNKNOWN_POLITICIAN_LABEL: &str = "Unknown";
pub const UNKNOWN_SECTOR_LABEL: &str = "Unknown Sector";
pub const MISSING_IMPACT_TEXT: &str = "No description available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Input,
    Policy,
    Sector,
    Enterprise,
}

impl NodeKind {
    /// Left-to-right column order of the layered graph.
    pub const COLUMN_ORDER: [NodeKind; 4] = [
        NodeKind::Input,
        NodeKind::Policy,
        NodeKind::Sector,
        NodeKind::Enterprise,
    ];

    pub fn column(self) -> usize {
        match self {
            NodeKind::Input => 0,
            NodeKind::Policy => 1,
            NodeKind::Sector => 2,
            NodeKind::Enterprise => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Input => "input",
            NodeKind::Policy => "policy",
            NodeKind::Sector => "sector",
            NodeKind::Enterprise => "enterprise",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeDetail {
    Input,
    Policy {
        policy: String,
        evidence: Vec<Evidence>,
    },
    Sector {
        sector: String,
        impact_description: String,
    },
    Enterprise {
        symbol: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub detail: NodeDetail,
}

impl GraphNode {
    /// Company names behind an enterprise label; comma-joined labels name several.
    pub fn companies(&self) -> Vec<&str> {
        if self.kind != NodeKind::Enterprise {
            return Vec::new();
        }
        split_company_label(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl GraphEdge {
    fn between(source: &str, target: &str) -> Self {
        Self {
            id: format!("edge-{source}-{target}"),
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluenceGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl InfluenceGraph {
    pub fn from_report(report: &AnalysisReport) -> Self {
        let chains = &report.influence_chains;
        if chains.is_empty() {
            tracing::warn!(target: "graph", title = %report.report_title, "report_has_no_influence_chains");
            return Self::default();
        }

        let politician = chains
            .first()
            .map(|chain| chain.politician.trim())
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_POLITICIAN_LABEL);

        let mut policies = Vec::with_capacity(chains.len());
        let mut sectors = Vec::with_capacity(chains.len());
        let mut enterprises = Vec::new();

        for (idx, chain) in chains.iter().enumerate() {
            let policy = chain.policy_label().to_string();
            policies.push(GraphNode {
                id: format!("policy-{idx}"),
                kind: NodeKind::Policy,
                label: policy.clone(),
                detail: NodeDetail::Policy {
                    policy,
                    evidence: chain.evidence.clone(),
                },
            });

            let sector = non_blank_or(&chain.industry_or_sector, UNKNOWN_SECTOR_LABEL);
            sectors.push(GraphNode {
                id: format!("sector-{idx}"),
                kind: NodeKind::Sector,
                label: sector.clone(),
                detail: NodeDetail::Sector {
                    sector,
                    impact_description: non_blank_or(
                        &chain.impact_description,
                        MISSING_IMPACT_TEXT,
                    ),
                },
            });

            for (company_idx, company) in chain.companies.iter().enumerate() {
                if company.trim().is_empty() {
                    continue;
                }
                enterprises.push(GraphNode {
                    id: format!("enterprise-{idx}-{company_idx}"),
                    kind: NodeKind::Enterprise,
                    label: company.clone(),
                    detail: NodeDetail::Enterprise {
                        symbol: extract_symbol(company),
                    },
                });
            }
        }

        let mut nodes = Vec::with_capacity(1 + policies.len() + sectors.len() + enterprises.len());
        nodes.push(GraphNode {
            id: INPUT_NODE_ID.to_string(),
            kind: NodeKind::Input,
            label: politician.to_string(),
            detail: NodeDetail::Input,
        });
        nodes.extend(policies);
        nodes.extend(sectors);
        nodes.extend(enterprises);

        let edges = derive_edges(&nodes);
        tracing::debug!(
            target: "graph",
            nodes = nodes.len(),
            edges = edges.len(),
            chains = chains.len(),
            "influence_graph_built"
        );

        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(move |node| node.kind == kind)
    }

    pub fn outgoing(&self, source: &str) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |edge| edge.source == source)
    }

    pub fn has_enterprises(&self) -> bool {
        self.nodes_of(NodeKind::Enterprise).next().is_some()
    }
}

/// Adjacency is carried only by id convention: `input-1 → policy-i → sector-i → enterprise-i-j`.
pub fn derive_edges(nodes: &[GraphNode]) -> Vec<GraphEdge> {
    let ids: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
    let mut edges = Vec::new();

    for input in nodes.iter().filter(|node| node.kind == NodeKind::Input) {
        for policy in nodes.iter().filter(|node| node.kind == NodeKind::Policy) {
            edges.push(GraphEdge::between(&input.id, &policy.id));
        }
    }

    for policy in nodes.iter().filter(|node| node.kind == NodeKind::Policy) {
        let Some(idx) = policy.id.strip_prefix("policy-") else {
            continue;
        };
        let sector_id = format!("sector-{idx}");
        if ids.contains(sector_id.as_str()) {
            edges.push(GraphEdge::between(&policy.id, &sector_id));
        }
    }

    for sector in nodes.iter().filter(|node| node.kind == NodeKind::Sector) {
        let Some(idx) = sector.id.strip_prefix("sector-") else {
            continue;
        };
        let prefix = format!("enterprise-{idx}-");
        for enterprise in nodes
            .iter()
            .filter(|node| node.kind == NodeKind::Enterprise && node.id.starts_with(&prefix))
        {
            edges.push(GraphEdge::between(&sector.id, &enterprise.id));
        }
    }

    edges
}

pub fn split_company_label(label: &str) -> Vec<&str> {
    label
        .split(',')
        .map(str::trim)
        .filter(|company| !company.is_empty())
        .collect()
}

/// Listing code written in parentheses, e.g. `동신건설 (025950)`.
pub fn extract_symbol(company: &str) -> Option<String> {
    static SYMBOL: OnceLock<Regex> = OnceLock::new();
    let symbol = SYMBOL.get_or_init(|| Regex::new(r"\((\d+)\)").expect("symbol pattern must compile"));
    symbol
        .captures(company)
        .and_then(|captures| captures.get(1))
        .map(|code| code.as_str().to_string())
}

fn non_blank_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
