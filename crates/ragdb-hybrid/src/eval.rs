//! Offline retrieval quality harness: recall, MRR and tail latency over a
//! labelled query set.
use std::time::Instant;

use serde::Serialize;

use ragdb_core::types::RetrievalMode;
use ragdb_core::Result;

use crate::retriever::HybridRetriever;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvalResult {
    pub recall_at_10: f64,
    pub mrr: f64,
    pub p95_latency_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalTargets {
    pub recall_at_10: f64,
    pub mrr: f64,
    pub p95_latency_ms: f64,
}

impl Default for EvalTargets {
    fn default() -> Self { Self { recall_at_10: 0.85, mrr: 0.65, p95_latency_ms: 900.0 } }
}

/// Summarise per-query outcomes. `ranks` holds the 1-based rank of the
/// relevant file for each query, `None` on a miss.
pub fn summarize(ranks: &[Option<usize>], mut latencies_ms: Vec<f64>) -> EvalResult {
    let n = ranks.len();
    let (recall_at_10, mrr) = if n == 0 {
        (0.0, 0.0)
    } else {
        let hits = ranks.iter().filter(|r| r.is_some()).count();
        let rr: f64 = ranks.iter().flatten().map(|&r| 1.0 / r as f64).sum();
        (hits as f64 / n as f64, rr / n as f64)
    };
    let p95_latency_ms = if latencies_ms.is_empty() {
        0.0
    } else {
        latencies_ms.sort_by(|a, b| a.total_cmp(b));
        let idx = ((0.95 * latencies_ms.len() as f64) as usize).saturating_sub(1);
        latencies_ms[idx]
    };
    EvalResult { recall_at_10, mrr, p95_latency_ms }
}

/// Run every `(query, relevant_file_id)` pair in hybrid mode.
pub async fn evaluate(retriever: &HybridRetriever, dataset: &[(String, String)], top_k: usize) -> Result<EvalResult> {
    let mut ranks = Vec::with_capacity(dataset.len());
    let mut latencies = Vec::with_capacity(dataset.len());
    for (query, relevant) in dataset {
        let start = Instant::now();
        let retrieval = retriever.retrieve(query, top_k, RetrievalMode::Hybrid, None).await?;
        latencies.push(start.elapsed().as_secs_f64() * 1000.0);
        ranks.push(retrieval.units().position(|u| u.file_id() == Some(relevant.as_str())).map(|p| p + 1));
    }
    Ok(summarize(&ranks, latencies))
}

pub fn meets_targets(result: &EvalResult, targets: &EvalTargets) -> bool {
    result.recall_at_10 >= targets.recall_at_10 && result.mrr >= targets.mrr && result.p95_latency_ms <= targets.p95_latency_ms
}
