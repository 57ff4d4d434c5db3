//! ragdb-hybrid
//!
//! Rank fusion, the hybrid retriever, query answering and the evaluation
//! harness.
pub mod answer;
pub mod eval;
pub mod fusion;
pub mod retriever;

pub use answer::{build_prompt, Citation, Provider, QueryRequest, QueryResponse, QueryService, RankedDocument, RetrieverScores};
pub use eval::{evaluate, meets_targets, EvalResult, EvalTargets};
pub use fusion::{fuse, passthrough, DEFAULT_RRF_K};
pub use retriever::{HybridRetriever, Retrieval, RetrievalConfig};
