//! Okapi BM25 scoring structure.
//!
//! `idf(t) = ln((N - df + 0.5) / (df + 0.5))`. Terms that occur in more than
//! half of the corpus get a negative idf, which is replaced by
//! `epsilon * mean(idf)` over the whole vocabulary.

use std::collections::HashMap;

use crate::tokenize::tokenize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 1.5, b: 0.75, epsilon: 0.25 } }
}

#[derive(Debug, Clone)]
pub(crate) struct Bm25 {
    params: Bm25Params,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    avgdl: f64,
    idf: HashMap<String, f64>,
}

impl Bm25 {
    pub(crate) fn build<'a>(texts: impl IntoIterator<Item = &'a str>, params: Bm25Params) -> Self {
        let mut term_freqs = Vec::new();
        let mut doc_lens = Vec::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_tokens = 0usize;

        for text in texts {
            let tokens = tokenize(text);
            total_tokens += tokens.len();
            doc_lens.push(tokens.len());
            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token.to_string()).or_default() += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_default() += 1;
            }
            term_freqs.push(tf);
        }

        let n = doc_lens.len() as f64;
        let avgdl = if doc_lens.is_empty() { 0.0 } else { total_tokens as f64 / n };

        let mut idf = HashMap::with_capacity(doc_freq.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (term, df) in doc_freq {
            let df = df as f64;
            let value = (n - df + 0.5).ln() - (df + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }
        if !idf.is_empty() {
            let floor = params.epsilon * idf_sum / idf.len() as f64;
            for term in negative {
                idf.insert(term, floor);
            }
        }

        Self { params, term_freqs, doc_lens, avgdl, idf }
    }

    /// One score per document, in corpus order. Repeated query tokens count
    /// once per occurrence.
    pub(crate) fn scores(&self, query: &str) -> Vec<f64> {
        let Bm25Params { k1, b, .. } = self.params;
        let avgdl = if self.avgdl > 0.0 { self.avgdl } else { 1.0 };
        let mut scores = vec![0.0; self.doc_lens.len()];
        for token in tokenize(query) {
            let Some(&idf) = self.idf.get(token) else { continue };
            for (doc, score) in scores.iter_mut().enumerate() {
                let Some(&tf) = self.term_freqs[doc].get(token) else { continue };
                let tf = f64::from(tf);
                let norm = k1 * (1.0 - b + b * self.doc_lens[doc] as f64 / avgdl);
                *score += idf * (tf * (k1 + 1.0) / (tf + norm));
            }
        }
        scores
    }
}
