//! Contracts for the external collaborators the retrieval core consumes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Neighborhood, ParsedSpan, StoredPoint, VectorPoint};

/// Maps text to dense vectors of a fixed dimensionality.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Nearest-neighbour service holding one collection of points.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn contains(&self, id: &str) -> Result<bool>;
    /// Insert or overwrite points by id.
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()>;
    /// Points ordered best first. An empty collection yields an empty list.
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<StoredPoint>>;
    async fn count(&self) -> Result<usize>;
    async fn drop_collection(&self) -> Result<()>;
}

/// Named-entity extraction over free text.
pub trait EntityExtractor: Send + Sync {
    /// Unique entities in order of first appearance.
    fn extract(&self, text: &str) -> Result<Vec<String>>;
}

/// Neighbour lookup over a relationship graph.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// `Ok(None)` when `entity` is not a node of the graph.
    async fn neighbors(&self, entity: &str, depth: usize) -> Result<Option<Neighborhood>>;
}

/// Turns raw uploaded bytes into ordered text spans.
pub trait DocumentParser: Send + Sync {
    /// Lowercase file extensions (without the dot) this parser accepts.
    fn kinds(&self) -> &[&'static str];
    fn parse(&self, bytes: &[u8], kind: &str) -> Result<Vec<ParsedSpan>>;
}

/// Generative answer model.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
