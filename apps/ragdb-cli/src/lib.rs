//! Wiring shared by the command-line binaries.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ragdb_core::config::{expand_path, Settings};
use ragdb_graph::{GraphExpander, MemoryGraph, TitleCaseExtractor};
use ragdb_hybrid::{HybridRetriever, QueryService, RetrievalConfig};
use ragdb_ingest::IngestPipeline;
use ragdb_lexical::{Bm25Params, LexicalIndex};
use ragdb_vector::SemanticIndex;

/// Log to stderr; `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

pub struct App {
    pub settings: Settings,
    pub retriever: Arc<HybridRetriever>,
    pub pipeline: IngestPipeline,
}

impl App {
    pub async fn open(settings: Settings) -> anyhow::Result<Self> {
        let embedder = ragdb_embed::embedder_from_settings(&settings.embedding)?;
        let store = ragdb_vector::open_store(&settings.vector, embedder.dim()).await?;
        let semantic = SemanticIndex::new(embedder, store);

        let corpus_path = expand_path(&settings.ingest.corpus_path);
        let lexical = LexicalIndex::load(&corpus_path, Bm25Params::default())
            .with_context(|| format!("loading lexical corpus from {}", corpus_path.display()))?;

        let mut retriever = HybridRetriever::new(Arc::new(lexical), semantic, RetrievalConfig::from_settings(&settings.retrieval)?);
        if let Some(graph) = Self::graph(&settings)? {
            retriever = retriever.with_graph(GraphExpander::new(Arc::new(TitleCaseExtractor), Arc::new(graph)));
        }
        let retriever = Arc::new(retriever);
        let pipeline = IngestPipeline::from_settings(Arc::clone(&retriever), &settings.ingest)?;
        info!(location = %settings.vector.location, collection = %settings.vector.collection, lexical_units = retriever.lexical().len(), "ragdb ready");
        Ok(Self { settings, retriever, pipeline })
    }

    fn graph(settings: &Settings) -> anyhow::Result<Option<MemoryGraph>> {
        if !settings.retrieval.graph_enabled {
            return Ok(None);
        }
        match &settings.retrieval.graph_path {
            Some(path) => {
                let path: PathBuf = expand_path(path);
                Ok(Some(MemoryGraph::load_json(&path).with_context(|| format!("loading graph from {}", path.display()))?))
            }
            None => Ok(Some(MemoryGraph::new())),
        }
    }

    pub fn query_service(&self) -> QueryService { QueryService::new(Arc::clone(&self.retriever)) }

    /// Empty both indices and forget which uploads were ingested, so the
    /// same files can be ingested again.
    pub async fn drop_all(&self) -> anyhow::Result<()> {
        self.retriever.semantic().drop_collection().await?;
        self.retriever.lexical().clear();
        self.retriever.lexical().save(&expand_path(&self.settings.ingest.corpus_path))?;
        let ledger = expand_path(&self.settings.ingest.ledger_path);
        if ledger.exists() {
            std::fs::remove_file(&ledger).with_context(|| format!("removing ledger {}", ledger.display()))?;
        }
        Ok(())
    }
}
