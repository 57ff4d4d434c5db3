//! File ingestion: content-addressed dedup of uploads, parsing, chunking and
//! indexing into the hybrid retriever.
pub mod dedup;
pub mod job;
pub mod ledger;
pub mod parser;
pub mod pipeline;

pub use dedup::Deduplicator;
pub use job::{Artifact, JobBoard, JobState, JobStatus, DEFAULT_TRACKED_JOBS};
pub use ledger::{IngestionLedger, JsonFileLedger, MemoryLedger};
pub use parser::{ParserRegistry, PdfParser, PlainTextParser};
pub use pipeline::{IngestConfig, IngestOutcome, IngestPipeline};
