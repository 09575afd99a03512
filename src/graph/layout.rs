use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::model::{InfluenceGraph, NodeKind};

pub const DEFAULT_COMPACT_BREAKPOINT_PX: u32 = 768;

const SLOT_HEIGHT: f64 = 140.0;
const VERTICAL_GAP: f64 = 80.0;
const MIN_CANVAS_HEIGHT: f64 = 600.0;
const VERTICAL_MARGIN: f64 = 200.0;
const HORIZONTAL_MARGIN: f64 = 400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Wide,
    Compact,
}

/// Pixel preset for one viewport class. There are exactly two; nothing scales in between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutProfile {
    pub kind: ProfileKind,
    pub column_width: f64,
    pub node_width: f64,
    pub node_height: f64,
    pub corner_radius: f64,
    pub label_max_chars: usize,
}

impl LayoutProfile {
    pub const WIDE: LayoutProfile = LayoutProfile {
        kind: ProfileKind::Wide,
        column_width: 300.0,
        node_width: 250.0,
        node_height: 140.0,
        corner_radius: 10.0,
        label_max_chars: 20,
    };

    pub const COMPACT: LayoutProfile = LayoutProfile {
        kind: ProfileKind::Compact,
        column_width: 200.0,
        node_width: 200.0,
        node_height: 100.0,
        corner_radius: 8.0,
        label_max_chars: 15,
    };

    pub fn for_viewport(viewport_width_px: u32, compact_breakpoint_px: u32) -> Self {
        if viewport_width_px < compact_breakpoint_px {
            Self::COMPACT
        } else {
            Self::WIDE
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub corner_radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSegment {
    pub id: String,
    pub source: String,
    pub target: String,
    pub from: Point,
    pub to: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLayout {
    pub profile: LayoutProfile,
    pub canvas: Canvas,
    pub positions: BTreeMap<String, Point>,
    pub edges: Vec<EdgeSegment>,
}

impl GraphLayout {
    pub fn compute(graph: &InfluenceGraph, profile: LayoutProfile) -> Self {
        let columns: Vec<Vec<&str>> = NodeKind::COLUMN_ORDER
            .iter()
            .map(|kind| graph.nodes_of(*kind).map(|node| node.id.as_str()).collect())
            .collect();

        let column_count = columns.len() as f64;
        let max_nodes_in_column = columns.iter().map(Vec::len).max().unwrap_or(0) as f64;
        let height = MIN_CANVAS_HEIGHT
            .max(max_nodes_in_column * (SLOT_HEIGHT + VERTICAL_GAP) + VERTICAL_MARGIN);
        let width = column_count * profile.column_width + HORIZONTAL_MARGIN;
        let column_spacing = width / (column_count + 1.0);

        let mut positions = BTreeMap::new();
        for (column_index, column) in columns.iter().enumerate() {
            if column.is_empty() {
                continue;
            }
            let x = (column_index as f64 + 1.0) * column_spacing;
            let rows = column.len() as f64;
            let content_height = rows * SLOT_HEIGHT + (rows - 1.0) * VERTICAL_GAP;
            let start_y = (height - content_height) / 2.0;

            for (row_index, node_id) in column.iter().enumerate() {
                let y = start_y + row_index as f64 * (SLOT_HEIGHT + VERTICAL_GAP);
                positions.insert((*node_id).to_string(), Point { x, y });
            }
        }

        let edges = graph
            .edges()
            .iter()
            .filter_map(|edge| {
                let from = *positions.get(&edge.source)?;
                let to = *positions.get(&edge.target)?;
                Some(EdgeSegment {
                    id: edge.id.clone(),
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    from,
                    to,
                })
            })
            .collect();

        tracing::debug!(
            target: "graph",
            profile = ?profile.kind,
            width,
            height,
            positioned = positions.len(),
            "graph_layout_computed"
        );

        Self {
            profile,
            canvas: Canvas { width, height },
            positions,
            edges,
        }
    }

    pub fn position(&self, node_id: &str) -> Option<Point> {
        self.positions.get(node_id).copied()
    }

    /// Box drawn for a node, centered on its position.
    pub fn node_rect(&self, node_id: &str) -> Option<NodeRect> {
        let center = self.position(node_id)?;
        Some(NodeRect {
            x: center.x - self.profile.node_width / 2.0,
            y: center.y - self.profile.node_height / 2.0,
            width: self.profile.node_width,
            height: self.profile.node_height,
            corner_radius: self.profile.corner_radius,
        })
    }
}
