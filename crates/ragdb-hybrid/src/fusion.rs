//! Reciprocal Rank Fusion.
//!
//! RRF score = Σ 1/(k + rank_L(u)) over every list `L` containing `u`, with
//! 1-based ranks. Only positions matter, so sources with incomparable score
//! scales can be merged without calibration.

use std::collections::HashMap;

use ragdb_core::types::{FusedResult, ScoredCandidate, Source};

pub const DEFAULT_RRF_K: usize = 60;

struct Entry<'a> {
    candidate: &'a ScoredCandidate,
    fused: f64,
    semantic: Option<f64>,
    lexical: Option<f64>,
}

fn record(entry: &mut Entry<'_>, c: &ScoredCandidate) {
    let slot = match c.source {
        Source::Semantic => &mut entry.semantic,
        Source::Lexical => &mut entry.lexical,
    };
    slot.get_or_insert(c.score);
}

/// Merge ranked lists by RRF and keep the best `top_k`.
///
/// Units are identified by exact text. The first unit seen for a text is the
/// one returned, so its tags win. Equal fused scores keep first-encounter
/// order, scanning `lists` in the order given.
pub fn fuse(lists: &[Vec<ScoredCandidate>], k: usize, top_k: usize) -> Vec<FusedResult> {
    let mut entries: Vec<Entry<'_>> = Vec::new();
    let mut by_text: HashMap<&str, usize> = HashMap::new();
    for list in lists {
        for (pos, candidate) in list.iter().enumerate() {
            let contribution = 1.0 / (k as f64 + (pos + 1) as f64);
            let idx = *by_text.entry(candidate.unit.text.as_str()).or_insert_with(|| {
                entries.push(Entry { candidate, fused: 0.0, semantic: None, lexical: None });
                entries.len() - 1
            });
            let entry = &mut entries[idx];
            entry.fused += contribution;
            record(entry, candidate);
        }
    }
    // Stable: ties stay in first-encounter order.
    entries.sort_by(|a, b| b.fused.partial_cmp(&a.fused).unwrap_or(std::cmp::Ordering::Equal));
    entries
        .into_iter()
        .take(top_k)
        .enumerate()
        .map(|(i, e)| FusedResult {
            unit: e.candidate.unit.clone(),
            rank: i + 1,
            fused_score: e.fused,
            semantic_score: e.semantic,
            lexical_score: e.lexical,
        })
        .collect()
}

/// Single-source shortcut: keep the list order and the source's own score.
pub fn passthrough(list: Vec<ScoredCandidate>, top_k: usize) -> Vec<FusedResult> {
    list.into_iter()
        .take(top_k)
        .enumerate()
        .map(|(i, c)| {
            let (semantic_score, lexical_score) = match c.source {
                Source::Semantic => (Some(c.score), None),
                Source::Lexical => (None, Some(c.score)),
            };
            FusedResult { unit: c.unit, rank: i + 1, fused_score: c.score, semantic_score, lexical_score }
        })
        .collect()
}
