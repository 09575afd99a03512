pub mod layout;
pub mod model;
pub mod tooltip;

pub use layout::{
    Canvas, DEFAULT_COMPACT_BREAKPOINT_PX, EdgeSegment, GraphLayout, LayoutProfile, NodeRect,
    Point, ProfileKind,
};
pub use model::{GraphEdge, GraphNode, INPUT_NODE_ID, InfluenceGraph, NodeDetail, NodeKind};
pub use tooltip::{StockState, Tooltip, TooltipBody, truncate_label};
