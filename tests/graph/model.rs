use pin_analyzer::{
    graph::{INPUT_NODE_ID, InfluenceGraph, NodeDetail, NodeKind},
    report::{AnalysisReport, InfluenceChain, UNLINKED_POLICY_LABEL},
};

use crate::fixtures::{chain, report, uneven_report};

fn ids(graph: &InfluenceGraph, kind: NodeKind) -> Vec<String> {
    graph.nodes_of(kind).map(|node| node.id.clone()).collect()
}

#[test]
fn given_single_chain_with_one_company_when_building_then_has_four_nodes_and_three_edges() {
    let graph = InfluenceGraph::from_report(&report(vec![chain(
        "기본소득",
        "지역화폐",
        &["코나아이"],
    )]));

    let node_ids: Vec<&str> = graph.nodes().iter().map(|node| node.id.as_str()).collect();
    assert_eq!(
        node_ids,
        vec![INPUT_NODE_ID, "policy-0", "sector-0", "enterprise-0-0"]
    );
    let edge_ids: Vec<&str> = graph.edges().iter().map(|edge| edge.id.as_str()).collect();
    assert_eq!(
        edge_ids,
        vec![
            "edge-input-1-policy-0",
            "edge-policy-0-sector-0",
            "edge-sector-0-enterprise-0-0"
        ]
    );
    assert_eq!(graph.nodes()[0].label, "이재명");
}

#[test]
fn given_k_chains_when_building_then_counts_follow_chains_and_companies() {
    let report = uneven_report();
    let graph = InfluenceGraph::from_report(&report);

    assert_eq!(ids(&graph, NodeKind::Input), vec![INPUT_NODE_ID]);
    assert_eq!(ids(&graph, NodeKind::Policy).len(), 3);
    assert_eq!(ids(&graph, NodeKind::Sector).len(), 3);
    assert_eq!(ids(&graph, NodeKind::Enterprise).len(), 5);

    for (idx, chain) in report.influence_chains.iter().enumerate() {
        let sector_id = format!("sector-{idx}");
        assert_eq!(
            graph.outgoing(&sector_id).count(),
            chain.companies.len(),
            "{sector_id} out-degree"
        );
        assert_eq!(graph.outgoing(&format!("policy-{idx}")).count(), 1);
    }
    assert_eq!(graph.outgoing(INPUT_NODE_ID).count(), 3);
    assert_eq!(graph.edges().len(), 3 + 3 + 5);
}

#[test]
fn given_chains_when_building_then_nodes_are_ordered_by_column() {
    let graph = InfluenceGraph::from_report(&uneven_report());

    let columns: Vec<usize> = graph.nodes().iter().map(|node| node.kind.column()).collect();
    let mut sorted = columns.clone();
    sorted.sort();
    assert_eq!(columns, sorted);
    assert_eq!(
        ids(&graph, NodeKind::Enterprise),
        vec![
            "enterprise-0-0",
            "enterprise-0-1",
            "enterprise-2-0",
            "enterprise-2-1",
            "enterprise-2-2"
        ]
    );
}

#[test]
fn given_blank_fields_when_building_then_sentinel_labels_are_used() {
    let graph = InfluenceGraph::from_report(&report(vec![InfluenceChain {
        companies: vec!["".to_string(), "  ".to_string(), "한국전력".to_string()],
        ..InfluenceChain::default()
    }]));

    let input = graph.node(INPUT_NODE_ID).expect("input node");
    assert_eq!(input.label, "Unknown");

    let policy = graph.node("policy-0").expect("policy node");
    assert_eq!(policy.label, UNLINKED_POLICY_LABEL);

    let sector = graph.node("sector-0").expect("sector node");
    assert_eq!(sector.label, "Unknown Sector");
    assert!(matches!(
        &sector.detail,
        NodeDetail::Sector { impact_description, .. } if impact_description == "No description available"
    ));

    // Blank companies are skipped but keep their index slot.
    assert!(graph.node("enterprise-0-0").is_none());
    assert!(graph.node("enterprise-0-2").is_some());
    assert_eq!(graph.outgoing("sector-0").count(), 1);
}

#[test]
fn given_company_with_stock_code_when_building_then_symbol_is_extracted() {
    let graph = InfluenceGraph::from_report(&uneven_report());

    let symbol = |id: &str| match &graph.node(id).expect("enterprise node").detail {
        NodeDetail::Enterprise { symbol } => symbol.clone(),
        other => panic!("unexpected detail: {other:?}"),
    };
    assert_eq!(symbol("enterprise-0-0").as_deref(), Some("052400"));
    assert_eq!(symbol("enterprise-0-1"), None);
    assert_eq!(symbol("enterprise-2-2").as_deref(), Some("025950"));
}

#[test]
fn given_empty_report_when_building_then_graph_is_empty() {
    let graph = InfluenceGraph::from_report(&AnalysisReport::default());
    assert!(graph.is_empty());
    assert!(graph.edges().is_empty());
    assert!(!graph.has_enterprises());
}

#[test]
fn given_same_report_when_building_twice_then_graphs_are_identical() {
    let report = uneven_report();
    assert_eq!(
        InfluenceGraph::from_report(&report),
        InfluenceGraph::from_report(&report)
    );
}
