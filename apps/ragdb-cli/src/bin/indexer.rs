use std::env;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use walkdir::WalkDir;

use ragdb_cli::{init_tracing, App};
use ragdb_core::config::{expand_path, Config};
use ragdb_ingest::ParserRegistry;

/// Ingest every supported file under a directory.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let args: Vec<String> = env::args().skip(1).collect();
    let mut data_dir = None;
    let mut limit = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => {
                match args.get(i + 1).and_then(|v| v.parse::<usize>().ok()) {
                    Some(n) => limit = Some(n),
                    None => {
                        eprintln!("Error: --limit requires a number");
                        std::process::exit(1);
                    }
                }
                i += 1;
            }
            a if !a.starts_with('-') => data_dir = Some(expand_path(a)),
            _ => {}
        }
        i += 1;
    }
    let settings = config.settings()?;
    let data_dir = data_dir.unwrap_or_else(|| expand_path(&settings.ingest.data_dir));
    let app = App::open(settings).await?;

    let parsers = ParserRegistry::with_defaults();
    let mut files: Vec<PathBuf> = WalkDir::new(&data_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.to_str().is_some_and(|name| parsers.resolve(name).is_ok()))
        .collect();
    if let Some(n) = limit {
        files.truncate(n);
    }
    println!("Indexing {} files from {}", files.len(), data_dir.display());

    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")?);
    let (mut fresh, mut duplicate, mut failed) = (0usize, 0usize, 0usize);
    for path in &files {
        bar.set_message(path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string());
        let name = path.to_string_lossy();
        match tokio::fs::read(path).await {
            Ok(bytes) => match app.pipeline.ingest(&name, &bytes).await {
                Ok(outcome) if outcome.deduplicated => duplicate += 1,
                Ok(_) => fresh += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipped");
                    failed += 1;
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable");
                failed += 1;
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    let stats = app.retriever.semantic().stats().await?;
    println!("✅ {fresh} new, {duplicate} already ingested, {failed} failed");
    println!("📊 {} vector points, {} lexical units", stats.points_count, app.retriever.lexical().len());
    Ok(())
}
