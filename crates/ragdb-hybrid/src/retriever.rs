use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use ragdb_core::config::RetrievalSettings;
use ragdb_core::types::{FusedResult, GraphContext, GraphParams, RetrievalMode, ScoredCandidate, Source, TextUnit};
use ragdb_core::{Error, Result};
use ragdb_graph::GraphExpander;
use ragdb_lexical::LexicalIndex;
use ragdb_vector::SemanticIndex;

use crate::fusion::{fuse, passthrough, DEFAULT_RRF_K};

/// Score reported for every semantic candidate; the vector store's own
/// similarity is not comparable across backends.
pub const NOMINAL_SEMANTIC_SCORE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalConfig {
    pub rrf_k: usize,
    pub default_top_k: usize,
    pub default_mode: RetrievalMode,
}

impl Default for RetrievalConfig {
    fn default() -> Self { Self { rrf_k: DEFAULT_RRF_K, default_top_k: 8, default_mode: RetrievalMode::Hybrid } }
}

impl RetrievalConfig {
    pub fn from_settings(settings: &RetrievalSettings) -> Result<Self> {
        Ok(Self { rrf_k: settings.rrf_k, default_top_k: settings.top_k, default_mode: settings.default_mode.parse()? })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    pub results: Vec<FusedResult>,
    pub graph: Option<GraphContext>,
}

impl Retrieval {
    pub fn units(&self) -> impl Iterator<Item = &TextUnit> { self.results.iter().map(|r| &r.unit) }
}

/// Runs semantic and/or lexical search for a query and fuses the rankings.
pub struct HybridRetriever {
    lexical: Arc<LexicalIndex>,
    semantic: SemanticIndex,
    graph: Option<GraphExpander>,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(lexical: Arc<LexicalIndex>, semantic: SemanticIndex, config: RetrievalConfig) -> Self {
        Self { lexical, semantic, graph: None, config }
    }

    pub fn with_graph(mut self, expander: GraphExpander) -> Self {
        self.graph = Some(expander);
        self
    }

    pub fn config(&self) -> &RetrievalConfig { &self.config }

    pub fn lexical(&self) -> &Arc<LexicalIndex> { &self.lexical }

    pub fn semantic(&self) -> &SemanticIndex { &self.semantic }

    /// Index units whose text is new. Returns the newly written point ids;
    /// the lexical corpus receives exactly those units.
    pub async fn add_units(&self, units: Vec<TextUnit>) -> Result<Vec<String>> {
        let ids = self.semantic.upsert(&units).await?;
        if ids.is_empty() {
            return Ok(ids);
        }
        let mut wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let fresh: Vec<TextUnit> = units.into_iter().filter(|u| wanted.remove(ragdb_core::content::point_id(&u.text).as_str())).collect();
        let lexical = Arc::clone(&self.lexical);
        tokio::task::spawn_blocking(move || lexical.add(fresh)).await.map_err(|e| Error::collaborator("lexical index", e))?;
        Ok(ids)
    }

    /// `graph`: expansion bounds, or `None` to skip expansion. Expansion also
    /// needs a configured graph; without one the context is absent.
    pub async fn retrieve(&self, query: &str, top_k: usize, mode: RetrievalMode, graph: Option<GraphParams>) -> Result<Retrieval> {
        let start = Instant::now();
        let results = match mode {
            RetrievalMode::Semantic => passthrough(self.semantic_candidates(query, top_k).await?, top_k),
            RetrievalMode::Lexical => passthrough(self.lexical_candidates(query, top_k).await?, top_k),
            RetrievalMode::Hybrid => {
                let (semantic, lexical) =
                    tokio::try_join!(self.semantic_candidates(query, top_k), self.lexical_candidates(query, top_k))?;
                debug!(semantic = semantic.len(), lexical = lexical.len(), "fusing candidates");
                fuse(&[semantic, lexical], self.config.rrf_k, top_k)
            }
        };

        let graph = match (graph, &self.graph) {
            (Some(params), Some(expander)) => {
                let units: Vec<TextUnit> = results.iter().map(|r| r.unit.clone()).collect();
                expander.expand(&units, params).await?
            }
            _ => None,
        };
        info!(%mode, top_k, results = results.len(), graph = graph.is_some(), ms = start.elapsed().as_millis() as u64, "retrieve");
        Ok(Retrieval { results, graph })
    }

    /// Like [`retrieve`](Self::retrieve) with the mode given as text.
    pub async fn retrieve_str(&self, query: &str, top_k: usize, mode: &str, graph: Option<GraphParams>) -> Result<Retrieval> {
        let mode: RetrievalMode = mode.parse()?;
        self.retrieve(query, top_k, mode, graph).await
    }

    async fn semantic_candidates(&self, query: &str, top_k: usize) -> Result<Vec<ScoredCandidate>> {
        let units = self.semantic.search(query, top_k).await?;
        Ok(units.into_iter().map(|unit| ScoredCandidate { unit, score: NOMINAL_SEMANTIC_SCORE, source: Source::Semantic }).collect())
    }

    async fn lexical_candidates(&self, query: &str, top_k: usize) -> Result<Vec<ScoredCandidate>> {
        let lexical = Arc::clone(&self.lexical);
        let query = query.to_string();
        tokio::task::spawn_blocking(move || lexical.score(&query, top_k)).await.map_err(|e| Error::collaborator("lexical index", e))
    }
}
