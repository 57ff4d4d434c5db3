use ragdb_cli::App;
use ragdb_core::config::Settings;
use ragdb_hybrid::QueryRequest;

fn settings(dir: &std::path::Path) -> Settings {
    let mut settings = Settings::default();
    settings.ingest.upload_dir = dir.join("uploads").display().to_string();
    settings.ingest.ledger_path = dir.join("hashes.json").display().to_string();
    settings.ingest.corpus_path = dir.join("corpus.json").display().to_string();
    settings.embedding.dim = 64;
    settings
}

#[tokio::test]
async fn ingest_query_and_drop() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let app = App::open(settings(dir.path())).await?;
    let outcome = app.pipeline.ingest("field.md", b"Rainwater tanks need mesh screens.\n\nCompost heats up in summer.").await?;

    let response = app.query_service().query(QueryRequest::new("Compost")).await?;
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.citations[0].file_id.as_deref(), Some(outcome.job_id.as_str()));

    app.drop_all().await?;
    assert!(app.retriever.lexical().is_empty());
    assert_eq!(app.retriever.semantic().stats().await?.points_count, 0);
    assert!(!dir.path().join("hashes.json").exists());
    Ok(())
}

#[tokio::test]
async fn lexical_corpus_reloads_on_open() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    {
        let app = App::open(settings(dir.path())).await?;
        app.pipeline.ingest("a.txt", b"one paragraph only").await?;
    }
    let reopened = App::open(settings(dir.path())).await?;
    assert_eq!(reopened.retriever.lexical().len(), 1);
    assert_eq!(reopened.pipeline.ledger().len(), 1);
    Ok(())
}

#[tokio::test]
async fn graph_without_edges_file_is_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut s = settings(dir.path());
    s.retrieval.graph_enabled = true;
    let app = App::open(s).await?;
    app.pipeline.ingest("a.txt", b"Alice met Bob").await?;
    let req = QueryRequest { graph: true, ..QueryRequest::new("Alice") };
    assert!(app.query_service().query(req).await?.graph_context.is_none());

    let mut missing = settings(dir.path());
    missing.retrieval.graph_enabled = true;
    missing.retrieval.graph_path = Some(dir.path().join("nope.json").display().to_string());
    assert!(App::open(missing).await.is_err());
    Ok(())
}
