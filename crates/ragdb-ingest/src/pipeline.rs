//! Upload ingestion: size guard, content dedup, parse, chunk, index.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use ragdb_core::chunking::{ChunkingConfig, TextSplitter};
use ragdb_core::config::{expand_path, IngestSettings};
use ragdb_core::content;
use ragdb_core::types::{IngestionRecord, ParsedSpan, TextUnit, FILE_ID_TAG, PAGE_TAG, SPAN_TAG};
use ragdb_core::{Error, Result};
use ragdb_hybrid::HybridRetriever;

use crate::dedup::Deduplicator;
use crate::job::{Artifact, JobBoard, JobState, JobStatus, DEFAULT_TRACKED_JOBS};
use crate::ledger::{IngestionLedger, JsonFileLedger};
use crate::parser::ParserRegistry;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub chunking: ChunkingConfig,
    /// Where to snapshot the lexical corpus after each ingest, if anywhere.
    pub corpus_path: Option<PathBuf>,
    /// Job statuses kept for lookup; older finished jobs are dropped.
    pub max_tracked_jobs: usize,
}

impl IngestConfig {
    pub fn from_settings(settings: &IngestSettings) -> Self {
        Self {
            upload_dir: expand_path(&settings.upload_dir),
            max_upload_bytes: settings.max_upload_bytes,
            chunking: settings.chunking(),
            corpus_path: Some(expand_path(&settings.corpus_path)),
            max_tracked_jobs: DEFAULT_TRACKED_JOBS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub job_id: String,
    /// True when identical bytes were ingested before and nothing was written.
    pub deduplicated: bool,
    pub status: JobStatus,
}

pub struct IngestPipeline {
    retriever: Arc<HybridRetriever>,
    ledger: Arc<dyn IngestionLedger>,
    dedup: Deduplicator,
    parsers: ParserRegistry,
    splitter: TextSplitter,
    config: IngestConfig,
    jobs: RwLock<JobBoard>,
}

impl IngestPipeline {
    pub fn new(retriever: Arc<HybridRetriever>, ledger: Arc<dyn IngestionLedger>, config: IngestConfig) -> Result<Self> {
        let splitter = TextSplitter::new(config.chunking)?;
        let jobs = RwLock::new(JobBoard::new(config.max_tracked_jobs));
        Ok(Self {
            retriever,
            ledger,
            dedup: Deduplicator::new(),
            parsers: ParserRegistry::with_defaults(),
            splitter,
            config,
            jobs,
        })
    }

    /// Pipeline backed by the JSON ledger named in `settings`.
    pub fn from_settings(retriever: Arc<HybridRetriever>, settings: &IngestSettings) -> Result<Self> {
        let ledger = JsonFileLedger::open(expand_path(&settings.ledger_path))?;
        Self::new(retriever, Arc::new(ledger), IngestConfig::from_settings(settings))
    }

    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn retriever(&self) -> &Arc<HybridRetriever> { &self.retriever }

    pub fn ledger(&self) -> &Arc<dyn IngestionLedger> { &self.ledger }

    pub fn job(&self, job_id: &str) -> Option<JobStatus> { self.jobs.read().get(job_id).cloned() }

    /// Ingest one uploaded file.
    ///
    /// Identical bytes map to the same job id regardless of `filename`; the
    /// second and later uploads write nothing. Concurrent uploads of the same
    /// bytes are serialized so only one of them does the work.
    pub async fn ingest(&self, filename: &str, bytes: &[u8]) -> Result<IngestOutcome> {
        if bytes.len() > self.config.max_upload_bytes {
            return Err(Error::PayloadTooLarge { size: bytes.len(), limit: self.config.max_upload_bytes });
        }
        let hash = content::digest(bytes).into_string();
        let _slot = self.dedup.acquire(&hash).await;

        if let Some(record) = self.ledger.get(&hash)? {
            info!(filename, job_id = %record.job_id, "duplicate upload");
            let status = self.job(&record.job_id).unwrap_or_else(|| JobStatus { status: JobState::Done, ..JobStatus::pending(&record.job_id) });
            return Ok(IngestOutcome { job_id: record.job_id, deduplicated: true, status });
        }

        let (parser, kind) = self.parsers.resolve(filename)?;
        let job_id = uuid::Uuid::new_v4().to_string();
        let mut status = JobStatus::pending(&job_id);
        status.start();
        self.jobs.write().record(status.clone());

        let start = Instant::now();
        let result = async {
            let dest = self.config.upload_dir.join(format!("{job_id}.{kind}"));
            tokio::fs::create_dir_all(&self.config.upload_dir).await?;
            tokio::fs::write(&dest, bytes).await?;

            let spans = parser.parse(bytes, &kind)?;
            let pages = spans.iter().filter_map(|s| s.page).max().unwrap_or(0);
            let units = self.chunk(&job_id, &spans);
            let chunks = units.len();
            self.retriever.add_units(units).await?;
            if let Some(path) = &self.config.corpus_path {
                self.save_corpus(path.clone()).await?;
            }
            self.ledger.insert(IngestionRecord { content_hash: hash.clone(), job_id: job_id.clone() })?;
            Ok::<_, Error>(Artifact { file_id: job_id.clone(), pages, chunks })
        }
        .await;

        match result {
            Ok(artifact) => {
                info!(filename, %job_id, pages = artifact.pages, chunks = artifact.chunks, ms = start.elapsed().as_millis() as u64, "ingested");
                status.finish(artifact);
                self.jobs.write().record(status.clone());
                Ok(IngestOutcome { job_id, deduplicated: false, status })
            }
            Err(e) => {
                warn!(filename, %job_id, error = %e, "ingest failed");
                status.fail(e.to_string());
                self.jobs.write().record(status);
                Err(e)
            }
        }
    }

    /// Split every span and tag the pieces with their provenance.
    fn chunk(&self, file_id: &str, spans: &[ParsedSpan]) -> Vec<TextUnit> {
        let mut units = Vec::new();
        for span in spans {
            for chunk in self.splitter.split_located(&span.text) {
                let mut unit = TextUnit::new(chunk.text).tag(FILE_ID_TAG, file_id);
                if let Some(page) = span.page {
                    unit = unit.tag(PAGE_TAG, page);
                }
                if let (Some((base, _)), Some((start, end))) = (span.span, chunk.span) {
                    unit = unit.tag(SPAN_TAG, json!([base + start, base + end]));
                }
                units.push(unit);
            }
        }
        units
    }

    async fn save_corpus(&self, path: PathBuf) -> Result<()> {
        let lexical = Arc::clone(self.retriever.lexical());
        tokio::task::spawn_blocking(move || lexical.save(&path))
            .await
            .map_err(|e| Error::collaborator("lexical index", e))?
    }
}
