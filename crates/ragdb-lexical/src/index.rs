use std::fs;
use std::path::Path;

use parking_lot::RwLock;
use tracing::{debug, info};

use ragdb_core::types::{ScoredCandidate, Source, TextUnit};
use ragdb_core::{Error, Result};

use crate::bm25::{Bm25, Bm25Params};

#[derive(Default)]
struct Corpus {
    units: Vec<TextUnit>,
    scorer: Option<Bm25>,
}

/// In-memory BM25 index over an append-only corpus of text units.
///
/// Every `add` rebuilds the scoring structure over the whole corpus, so its
/// cost is linear in the total number of corpus tokens. Scoring takes a
/// shared lock; a rebuild is exclusive, so queries never observe a
/// half-built structure.
pub struct LexicalIndex {
    params: Bm25Params,
    corpus: RwLock<Corpus>,
}

impl Default for LexicalIndex {
    fn default() -> Self { Self::new() }
}

impl LexicalIndex {
    pub fn new() -> Self { Self::with_params(Bm25Params::default()) }

    pub fn with_params(params: Bm25Params) -> Self { Self { params, corpus: RwLock::new(Corpus::default()) } }

    /// Append units and rebuild. Duplicate texts are kept as separate entries.
    pub fn add(&self, units: impl IntoIterator<Item = TextUnit>) -> usize {
        let mut corpus = self.corpus.write();
        let before = corpus.units.len();
        corpus.units.extend(units);
        let added = corpus.units.len() - before;
        if added > 0 {
            corpus.scorer = Some(Bm25::build(corpus.units.iter().map(|u| u.text.as_str()), self.params));
            debug!(added, total = corpus.units.len(), "lexical index rebuilt");
        }
        added
    }

    /// Score every corpus entry against `query` and return the best `top_k`.
    ///
    /// Entries with a zero score are still returned when the corpus has fewer
    /// than `top_k` better matches. Equal scores keep corpus insertion order.
    pub fn score(&self, query: &str, top_k: usize) -> Vec<ScoredCandidate> {
        let corpus = self.corpus.read();
        let Some(scorer) = corpus.scorer.as_ref() else { return Vec::new() };
        if top_k == 0 {
            return Vec::new();
        }
        let scores = scorer.scores(query);
        let mut order: Vec<usize> = (0..scores.len()).collect();
        // `sort_by` is stable: ties stay in insertion order.
        order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(std::cmp::Ordering::Equal));
        order
            .into_iter()
            .take(top_k)
            .map(|i| ScoredCandidate { unit: corpus.units[i].clone(), score: scores[i], source: Source::Lexical })
            .collect()
    }

    /// Remove every unit.
    pub fn clear(&self) {
        let mut corpus = self.corpus.write();
        corpus.units.clear();
        corpus.scorer = None;
    }

    pub fn len(&self) -> usize { self.corpus.read().units.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Copy of the corpus in insertion order.
    pub fn units(&self) -> Vec<TextUnit> { self.corpus.read().units.clone() }

    /// Rebuild from a snapshot written by [`save`](Self::save). A missing file
    /// yields an empty index.
    pub fn load(path: &Path, params: Bm25Params) -> Result<Self> {
        let index = Self::with_params(params);
        if !path.exists() {
            return Ok(index);
        }
        let raw = fs::read(path)?;
        let units: Vec<TextUnit> = serde_json::from_slice(&raw)
            .map_err(|e| Error::CorruptState { path: path.to_path_buf(), message: e.to_string() })?;
        let count = index.add(units);
        info!(path = %path.display(), units = count, "lexical corpus loaded");
        Ok(index)
    }

    /// Write the corpus as JSON, replacing any previous snapshot atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec(&self.corpus.read().units)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
