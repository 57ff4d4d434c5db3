use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};

use ragdb_cli::{init_tracing, App};
use ragdb_core::config::Config;
use ragdb_core::types::GraphParams;
use ragdb_hybrid::{evaluate, meets_targets, EvalTargets, QueryRequest};

const USAGE: &str = "Usage: ragdb <ingest|query|stats|drop|eval> [args...]
  ingest <file>...
  query \"<text>\" [--top-k N] [--mode semantic|lexical|hybrid] [--provider P] [--graph] [--neighbors N] [--depth N]
  stats
  drop
  eval <dataset.json> [--top-k N]";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn number(args: &[String], i: usize, flag: &str) -> anyhow::Result<usize> {
    args.get(i + 1).and_then(|v| v.parse().ok()).with_context(|| format!("{flag} requires a number"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let (cmd, args) = parse_args();
    let app = App::open(config.settings()?).await?;

    match cmd.as_str() {
        "ingest" => {
            if args.is_empty() {
                bail!("ingest needs at least one file");
            }
            for path in args.iter().map(PathBuf::from) {
                let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                let outcome = app.pipeline.ingest(name, &bytes).await?;
                println!("{}", serde_json::to_string(&outcome)?);
            }
        }
        "query" => {
            let Some(query) = args.first() else { bail!("query needs the query text") };
            let mut req = QueryRequest::new(query.clone());
            let mut params = GraphParams::default();
            let mut i = 1;
            while i < args.len() {
                match args[i].as_str() {
                    "--top-k" | "-k" => {
                        req.top_k = Some(number(&args, i, "--top-k")?);
                        i += 1;
                    }
                    "--mode" => {
                        req.mode = args.get(i + 1).cloned();
                        i += 1;
                    }
                    "--provider" => {
                        req.provider = args.get(i + 1).cloned();
                        i += 1;
                    }
                    "--graph" => req.graph = true,
                    "--neighbors" => {
                        params.neighbors = number(&args, i, "--neighbors")?;
                        i += 1;
                    }
                    "--depth" => {
                        params.depth = number(&args, i, "--depth")?;
                        i += 1;
                    }
                    other => bail!("unknown option {other}"),
                }
                i += 1;
            }
            req.graph_params = Some(params);
            let response = app.query_service().query(req).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        "stats" => {
            let stats = app.retriever.semantic().stats().await?;
            println!("vector points:   {}", stats.points_count);
            println!("lexical units:   {}", app.retriever.lexical().len());
            println!("ingested files:  {}", app.pipeline.ledger().len());
        }
        "drop" => {
            app.drop_all().await?;
            println!("Dropped collection {}", app.settings.vector.collection);
        }
        "eval" => {
            let Some(path) = args.first() else { bail!("eval needs a dataset file") };
            let top_k = match args.iter().position(|a| a == "--top-k") {
                Some(i) => number(&args, i, "--top-k")?,
                None => 10,
            };
            let raw = std::fs::read(path).with_context(|| format!("reading {path}"))?;
            let dataset: Vec<(String, String)> = serde_json::from_slice(&raw).context("dataset must be [[query, file_id], ...]")?;
            let result = evaluate(&app.retriever, &dataset, top_k).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !meets_targets(&result, &EvalTargets::default()) {
                eprintln!("below targets");
                std::process::exit(2);
            }
        }
        _ => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
    }
    Ok(())
}
