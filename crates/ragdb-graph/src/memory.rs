use std::collections::{HashMap, VecDeque};
use std::path::Path;

use async_trait::async_trait;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use tracing::info;

use ragdb_core::traits::GraphBackend;
use ragdb_core::types::Neighborhood;
use ragdb_core::{Error, Result};

/// Undirected entity graph held in process memory.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    graph: UnGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl MemoryGraph {
    pub fn new() -> Self { Self::default() }

    pub fn from_edges<I, A, B>(edges: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut graph = Self::new();
        for (a, b) in edges {
            graph.add_edge(a, b);
        }
        graph
    }

    /// Load a JSON edge list: `[["Alice", "Bob"], ...]`.
    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        let edges: Vec<(String, String)> = serde_json::from_slice(&raw)
            .map_err(|e| Error::CorruptState { path: path.to_path_buf(), message: e.to_string() })?;
        let graph = Self::from_edges(edges);
        info!(path = %path.display(), nodes = graph.node_count(), edges = graph.edge_count(), "graph loaded");
        Ok(graph)
    }

    pub fn add_node(&mut self, name: impl Into<String>) -> NodeIndex {
        let name = name.into();
        if let Some(&idx) = self.node_map.get(&name) {
            return idx;
        }
        let idx = self.graph.add_node(name.clone());
        self.node_map.insert(name, idx);
        idx
    }

    pub fn add_edge(&mut self, a: impl Into<String>, b: impl Into<String>) {
        let a = self.add_node(a);
        let b = self.add_node(b);
        if self.graph.find_edge(a, b).is_none() {
            self.graph.add_edge(a, b, ());
        }
    }

    pub fn node_count(&self) -> usize { self.graph.node_count() }

    pub fn edge_count(&self) -> usize { self.graph.edge_count() }

    /// Breadth-first walk of at most `depth` hops. Edges are reported in
    /// their stored orientation.
    fn walk(&self, start: NodeIndex, depth: usize) -> Neighborhood {
        let mut hops: HashMap<NodeIndex, usize> = HashMap::from([(start, 0)]);
        let mut queue = VecDeque::from([start]);
        let mut edges = Vec::new();
        while let Some(node) = queue.pop_front() {
            let hop = hops[&node];
            if hop == depth {
                continue;
            }
            for edge in self.graph.edges(node) {
                let next = edge.target();
                if let Some((s, t)) = self.graph.edge_endpoints(edge.id()) {
                    let pair = (self.graph[s].clone(), self.graph[t].clone());
                    if !edges.contains(&pair) {
                        edges.push(pair);
                    }
                }
                if !hops.contains_key(&next) {
                    hops.insert(next, hop + 1);
                    queue.push_back(next);
                }
            }
        }
        let mut nodes: Vec<(usize, &str)> =
            hops.into_iter().filter(|(idx, _)| *idx != start).map(|(idx, hop)| (hop, self.graph[idx].as_str())).collect();
        nodes.sort();
        Neighborhood { nodes: nodes.into_iter().map(|(_, n)| n.to_string()).collect(), edges }
    }
}

#[async_trait]
impl GraphBackend for MemoryGraph {
    async fn neighbors(&self, entity: &str, depth: usize) -> Result<Option<Neighborhood>> {
        Ok(self.node_map.get(entity).map(|&idx| self.walk(idx, depth)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> MemoryGraph { MemoryGraph::from_edges([("Alice", "Bob"), ("Bob", "Carol"), ("Alice", "Eve"), ("Dave", "Alice")]) }

    #[tokio::test]
    async fn one_hop_neighbors_sorted() {
        let hood = chain().neighbors("Alice", 1).await.unwrap().unwrap();
        assert_eq!(hood.nodes, vec!["Bob", "Dave", "Eve"]);
        assert_eq!(hood.edges.len(), 3);
        assert!(hood.edges.contains(&("Dave".to_string(), "Alice".to_string())));
    }

    #[tokio::test]
    async fn deeper_walk_orders_by_hop() {
        let hood = chain().neighbors("Alice", 2).await.unwrap().unwrap();
        assert_eq!(hood.nodes, vec!["Bob", "Dave", "Eve", "Carol"]);
        assert!(hood.edges.contains(&("Bob".to_string(), "Carol".to_string())));
    }

    #[tokio::test]
    async fn unknown_entity_is_none() {
        assert!(chain().neighbors("Zed", 1).await.unwrap().is_none());
        let mut g = MemoryGraph::new();
        g.add_node("Loner");
        assert!(g.neighbors("Loner", 1).await.unwrap().unwrap().nodes.is_empty());
    }
}
