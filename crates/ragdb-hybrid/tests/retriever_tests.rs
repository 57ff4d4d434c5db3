use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ragdb_core::traits::{Generator, VectorStore};
use ragdb_core::types::{GraphParams, RetrievalMode, StoredPoint, TextUnit, VectorPoint, FILE_ID_TAG};
use ragdb_core::{Error, Result};
use ragdb_embed::HashEmbedder;
use ragdb_graph::{GraphExpander, MemoryGraph, TitleCaseExtractor};
use ragdb_hybrid::{evaluate, HybridRetriever, Provider, QueryRequest, QueryService, RetrievalConfig};
use ragdb_lexical::LexicalIndex;
use ragdb_vector::{MemoryVectorStore, SemanticIndex};

fn retriever_with(store: Arc<dyn VectorStore>) -> HybridRetriever {
    let semantic = SemanticIndex::new(Arc::new(HashEmbedder::new(64, 256)), store);
    HybridRetriever::new(Arc::new(LexicalIndex::new()), semantic, RetrievalConfig::default())
}

fn retriever() -> HybridRetriever { retriever_with(Arc::new(MemoryVectorStore::new())) }

fn corpus() -> Vec<TextUnit> {
    vec![
        TextUnit::new("alpha beta").tag(FILE_ID_TAG, "f1"),
        TextUnit::new("rareword appears").tag(FILE_ID_TAG, "f2"),
        TextUnit::new("gamma delta").tag(FILE_ID_TAG, "f3"),
    ]
}

#[tokio::test]
async fn lexical_mode_finds_rare_term() -> anyhow::Result<()> {
    let r = retriever();
    r.add_units(corpus()).await?;
    let out = r.retrieve("rareword", 3, RetrievalMode::Lexical, None).await?;
    assert_eq!(out.results[0].unit.text, "rareword appears");
    assert!(out.results[0].lexical_score.unwrap() > 0.0);
    assert!(out.results[0].semantic_score.is_none());
    assert!(out.graph.is_none());
    Ok(())
}

#[tokio::test]
async fn hybrid_mode_fuses_both_sources() -> anyhow::Result<()> {
    let r = retriever();
    r.add_units(corpus()).await?;
    let out = r.retrieve("rareword appears", 3, RetrievalMode::Hybrid, None).await?;
    assert_eq!(out.results.len(), 3);
    let top = &out.results[0];
    assert_eq!(top.unit.text, "rareword appears");
    assert_eq!(top.semantic_score, Some(1.0));
    assert!(top.lexical_score.is_some());
    assert_eq!(top.fused_score, 2.0 / 61.0);
    Ok(())
}

#[tokio::test]
async fn semantic_mode_scores_are_nominal() -> anyhow::Result<()> {
    let r = retriever();
    r.add_units(corpus()).await?;
    let out = r.retrieve("gamma delta", 2, RetrievalMode::Semantic, None).await?;
    assert_eq!(out.results.len(), 2);
    assert_eq!(out.results[0].unit.text, "gamma delta");
    assert!(out.results.iter().all(|x| x.semantic_score == Some(1.0) && x.lexical_score.is_none()));
    Ok(())
}

#[tokio::test]
async fn re_adding_units_writes_nothing() -> anyhow::Result<()> {
    let r = retriever();
    assert_eq!(r.add_units(corpus()).await?.len(), 3);
    assert!(r.add_units(corpus()).await?.is_empty());
    assert_eq!(r.lexical().len(), 3);
    assert_eq!(r.semantic().stats().await?.points_count, 3);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_of_one_text_index_it_once() -> anyhow::Result<()> {
    let r = retriever();
    let (a, b) = tokio::join!(
        r.add_units(vec![TextUnit::new("same text").tag(FILE_ID_TAG, "a")]),
        r.add_units(vec![TextUnit::new("same text").tag(FILE_ID_TAG, "b")]),
    );
    assert_eq!(a?.len() + b?.len(), 1);
    assert_eq!(r.lexical().len(), 1);
    assert_eq!(r.semantic().stats().await?.points_count, 1);
    Ok(())
}

#[tokio::test]
async fn empty_corpus_is_not_an_error() -> anyhow::Result<()> {
    let r = retriever();
    for mode in [RetrievalMode::Semantic, RetrievalMode::Lexical, RetrievalMode::Hybrid] {
        assert!(r.retrieve("anything", 5, mode, None).await?.results.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn unknown_mode_is_invalid_argument() {
    let err = retriever().retrieve_str("q", 5, "fuzzy", None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { what: "retrieval mode", .. }));
}

struct DownStore;

#[async_trait]
impl VectorStore for DownStore {
    async fn contains(&self, _id: &str) -> Result<bool> { Ok(false) }
    async fn upsert(&self, _points: Vec<VectorPoint>) -> Result<()> { Ok(()) }
    async fn search(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<StoredPoint>> {
        Err(Error::collaborator("vector store", "connection refused"))
    }
    async fn count(&self) -> Result<usize> { Ok(0) }
    async fn drop_collection(&self) -> Result<()> { Ok(()) }
}

#[tokio::test]
async fn failing_source_fails_hybrid_query() -> anyhow::Result<()> {
    let r = retriever_with(Arc::new(DownStore));
    r.add_units(corpus()).await?;
    let err = r.retrieve("alpha", 3, RetrievalMode::Hybrid, None).await.unwrap_err();
    assert!(!err.is_client_error());
    assert_eq!(r.retrieve("alpha", 3, RetrievalMode::Lexical, None).await?.results[0].unit.text, "alpha beta");
    Ok(())
}

#[tokio::test]
async fn graph_context_only_when_requested_and_configured() -> anyhow::Result<()> {
    let graph = MemoryGraph::from_edges([("Alice", "Bob")]);
    let r = retriever().with_graph(GraphExpander::new(Arc::new(TitleCaseExtractor), Arc::new(graph)));
    r.add_units(vec![TextUnit::new("Alice wrote the report"), TextUnit::new("Carol filed it")]).await?;

    let with = r.retrieve("report", 2, RetrievalMode::Hybrid, Some(GraphParams::default())).await?;
    let ctx = with.graph.expect("context");
    assert!(ctx.nodes.contains("Bob"));

    assert!(r.retrieve("report", 2, RetrievalMode::Hybrid, None).await?.graph.is_none());
    let unconfigured = retriever();
    unconfigured.add_units(corpus()).await?;
    assert!(unconfigured.retrieve("alpha", 2, RetrievalMode::Hybrid, Some(GraphParams::default())).await?.graph.is_none());
    Ok(())
}

#[derive(Default)]
struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        Ok("42".into())
    }
}

#[tokio::test]
async fn query_service_builds_citations_and_answer() -> anyhow::Result<()> {
    let r = Arc::new(retriever());
    r.add_units(corpus()).await?;
    let generator = Arc::new(RecordingGenerator::default());
    let service = QueryService::new(Arc::clone(&r)).with_generator(Provider::Ollama, generator.clone());

    let plain = service.query(QueryRequest { top_k: Some(2), ..QueryRequest::new("rareword") }).await?;
    assert_eq!(plain.answer, "");
    assert_eq!(plain.results.len(), 2);
    assert_eq!(plain.citations[0].file_id.as_deref(), plain.results[0].file_id.as_deref());
    assert!(generator.prompts.lock().map(|p| p.is_empty()).unwrap_or(false));

    let req = QueryRequest { top_k: Some(1), mode: Some("lexical".into()), provider: Some("ollama".into()), ..QueryRequest::new("rareword") };
    let answered = service.query(req).await?;
    assert_eq!(answered.answer, "42");
    let prompts = generator.prompts.lock().map(|p| p.clone()).unwrap_or_default();
    assert_eq!(prompts, vec!["Context:\nrareword appears\n\nQuestion: rareword\nAnswer:".to_string()]);

    let missing = QueryRequest { provider: Some("transformers".into()), ..QueryRequest::new("rareword") };
    assert!(matches!(service.query(missing).await.unwrap_err(), Error::CollaboratorUnavailable { .. }));
    let json = serde_json::to_value(&answered)?;
    assert!(json["results"][0]["scores"]["lexical"].as_f64().is_some());
    Ok(())
}

#[tokio::test]
async fn eval_harness_scores_labelled_queries() -> anyhow::Result<()> {
    let r = retriever();
    r.add_units(corpus()).await?;
    let dataset = vec![("rareword".to_string(), "f2".to_string()), ("gamma delta".to_string(), "f3".to_string())];
    let result = evaluate(&r, &dataset, 10).await?;
    assert_eq!(result.recall_at_10, 1.0);
    assert_eq!(result.mrr, 1.0);
    Ok(())
}
