use std::sync::Arc;

use async_trait::async_trait;
use ragdb_core::traits::GraphBackend;
use ragdb_core::types::{GraphParams, Neighborhood, TextUnit};
use ragdb_core::{Error, Result};
use ragdb_graph::{GraphExpander, MemoryGraph, TitleCaseExtractor};

fn expander(graph: MemoryGraph) -> GraphExpander { GraphExpander::new(Arc::new(TitleCaseExtractor), Arc::new(graph)) }

#[tokio::test]
async fn entities_pull_in_their_neighbours() {
    let graph = MemoryGraph::from_edges([("Alice", "Bob"), ("Alice", "Eve"), ("Bob", "Carol")]);
    let units = [TextUnit::new("Alice wrote the report.")];
    let ctx = expander(graph).expand(&units, GraphParams::default()).await.unwrap().unwrap();
    let nodes: Vec<_> = ctx.nodes.iter().map(String::as_str).collect();
    assert_eq!(nodes, vec!["Alice", "Bob", "Eve"]);
    assert!(ctx.edges.contains(&("Alice".to_string(), "Bob".to_string())));
    assert!(!ctx.edges.contains(&("Bob".to_string(), "Carol".to_string())));
}

#[tokio::test]
async fn neighbour_cap_keeps_closest_then_lexicographic() {
    let graph = MemoryGraph::from_edges([("Hub", "Zed"), ("Hub", "Amy"), ("Hub", "Kim"), ("Amy", "Far")]);
    let units = [TextUnit::new("the Hub")];
    let params = GraphParams { neighbors: 2, depth: 2 };
    let ctx = expander(graph).expand(&units, params).await.unwrap().unwrap();
    let nodes: Vec<_> = ctx.nodes.iter().map(String::as_str).collect();
    assert_eq!(nodes, vec!["Amy", "Hub", "Kim"]);
}

#[tokio::test]
async fn no_edges_yields_absent_context() {
    let mut graph = MemoryGraph::from_edges([("Carol", "Dan")]);
    graph.add_node("Alice");
    let units = [TextUnit::new("Alice and Bob went home."), TextUnit::new("nothing capitalised")];
    assert!(expander(graph).expand(&units, GraphParams::default()).await.unwrap().is_none());
    let empty: [TextUnit; 0] = [];
    assert!(expander(MemoryGraph::new()).expand(&empty, GraphParams::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn invalid_params_are_rejected() {
    let err = expander(MemoryGraph::new()).expand(&[], GraphParams { neighbors: 0, depth: 1 }).await.unwrap_err();
    assert!(err.is_client_error());
}

struct Unreachable;

#[async_trait]
impl GraphBackend for Unreachable {
    async fn neighbors(&self, _entity: &str, _depth: usize) -> Result<Option<Neighborhood>> {
        Err(Error::collaborator("graph", "connection refused"))
    }
}

#[tokio::test]
async fn backend_failure_propagates() {
    let expander = GraphExpander::new(Arc::new(TitleCaseExtractor), Arc::new(Unreachable));
    let err = expander.expand(&[TextUnit::new("Alice")], GraphParams::default()).await.unwrap_err();
    assert!(matches!(err, Error::CollaboratorUnavailable { .. }));
}

#[tokio::test]
async fn edge_list_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");
    std::fs::write(&path, r#"[["Alice","Bob"],["Bob","Carol"]]"#).unwrap();
    let graph = MemoryGraph::load_json(&path).unwrap();
    assert_eq!((graph.node_count(), graph.edge_count()), (3, 2));

    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(MemoryGraph::load_json(&path).unwrap_err(), Error::CorruptState { .. }));
}
