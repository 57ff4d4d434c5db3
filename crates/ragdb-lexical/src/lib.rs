//! ragdb-lexical
//!
//! In-memory BM25 keyword index. See `index` for the concurrency model and
//! `bm25` for the scoring formula.
pub mod bm25;
pub mod index;
pub mod tokenize;

pub use bm25::Bm25Params;
pub use index::LexicalIndex;
pub use tokenize::tokenize;
