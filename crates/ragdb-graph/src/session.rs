//! Adapter for remote graph databases that are queried through sessions
//! (Neo4j-style drivers). One session is opened per lookup.
use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use ragdb_core::traits::GraphBackend;
use ragdb_core::types::Neighborhood;
use ragdb_core::{Error, Result};

/// One traversed edge. `node` is the far end of the path that used the
/// edge, reached after `hop` hops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRow {
    pub node: String,
    pub hop: usize,
    pub source: String,
    pub target: String,
}

#[async_trait]
pub trait GraphSession: Send {
    /// Run `query` with `$entity` bound to `entity`.
    async fn run(&mut self, query: &str, entity: &str) -> Result<Vec<PathRow>>;
    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait GraphClient: Send + Sync {
    type Session: GraphSession;
    async fn session(&self) -> Result<Self::Session>;
}

/// Cypher path query. Variable-length bounds cannot be parameterised, so
/// `depth` is inlined.
pub fn neighbor_query(depth: usize) -> String {
    format!(
        "MATCH p = (e {{name: $entity}})-[*1..{depth}]-(m) \
         WITH m, length(p) AS hop, last(relationships(p)) AS r \
         RETURN m.name AS node, hop, startNode(r).name AS source, endNode(r).name AS target"
    )
}

pub struct SessionGraph<C> {
    client: C,
}

impl<C: GraphClient> SessionGraph<C> {
    pub fn new(client: C) -> Self { Self { client } }
}

/// Collapse rows into a neighbourhood: closest hop first, then by name.
fn rows_to_neighborhood(entity: &str, rows: Vec<PathRow>) -> Neighborhood {
    let mut hops: HashMap<String, usize> = HashMap::new();
    let mut edges = Vec::new();
    for row in rows {
        if row.node != entity {
            let hop = hops.entry(row.node).or_insert(row.hop);
            *hop = (*hop).min(row.hop);
        }
        let edge = (row.source, row.target);
        if !edges.contains(&edge) {
            edges.push(edge);
        }
    }
    let mut nodes: Vec<(usize, String)> = hops.into_iter().map(|(n, h)| (h, n)).collect();
    nodes.sort();
    Neighborhood { nodes: nodes.into_iter().map(|(_, n)| n).collect(), edges }
}

#[async_trait]
impl<C: GraphClient> GraphBackend for SessionGraph<C> {
    /// A query returning no rows means the entity is absent or isolated;
    /// both yield `None`.
    async fn neighbors(&self, entity: &str, depth: usize) -> Result<Option<Neighborhood>> {
        let mut session = self.client.session().await.map_err(|e| Error::collaborator("graph", e))?;
        let result = session.run(&neighbor_query(depth), entity).await;
        session.close().await.map_err(|e| Error::collaborator("graph", e))?;
        let rows = result.map_err(|e| Error::collaborator("graph", e))?;
        debug!(entity, rows = rows.len(), "graph session query");
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(rows_to_neighborhood(entity, rows)))
    }
}
