//! Persistent `content hash → job id` records used to skip re-ingesting
//! identical uploads.
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use ragdb_core::types::IngestionRecord;
use ragdb_core::{Error, Result};

pub trait IngestionLedger: Send + Sync {
    fn get(&self, content_hash: &str) -> Result<Option<IngestionRecord>>;

    /// Insert unless a record for the hash exists. Returns the record that
    /// is stored afterwards, which is the earlier one on conflict.
    fn insert(&self, record: IngestionRecord) -> Result<IngestionRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool { self.len() == 0 }
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryLedger {
    pub fn new() -> Self { Self::default() }
}

impl IngestionLedger for MemoryLedger {
    fn get(&self, content_hash: &str) -> Result<Option<IngestionRecord>> {
        Ok(self.records.lock().get(content_hash).map(|job_id| IngestionRecord { content_hash: content_hash.to_string(), job_id: job_id.clone() }))
    }

    fn insert(&self, record: IngestionRecord) -> Result<IngestionRecord> {
        let mut records = self.records.lock();
        let job_id = records.entry(record.content_hash.clone()).or_insert(record.job_id).clone();
        Ok(IngestionRecord { content_hash: record.content_hash, job_id })
    }

    fn len(&self) -> usize { self.records.lock().len() }
}

/// Ledger stored as a JSON object `{ "<sha256>": "<job id>" }`.
///
/// Every insert rewrites the file through a temporary sibling and a rename,
/// so a crash leaves either the old or the new file.
#[derive(Debug)]
pub struct JsonFileLedger {
    path: PathBuf,
    records: Mutex<BTreeMap<String, String>>,
}

impl JsonFileLedger {
    /// Load the ledger, or start empty when the file does not exist. An
    /// unreadable or malformed file is `CorruptState`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            let corrupt = |message: String| Error::CorruptState { path: path.clone(), message };
            let raw = fs::read(&path).map_err(|e| corrupt(e.to_string()))?;
            serde_json::from_slice::<BTreeMap<String, String>>(&raw).map_err(|e| corrupt(e.to_string()))?
        } else {
            BTreeMap::new()
        };
        info!(path = %path.display(), records = records.len(), "ingestion ledger opened");
        Ok(Self { path, records: Mutex::new(records) })
    }

    pub fn path(&self) -> &Path { &self.path }

    fn persist(&self, records: &BTreeMap<String, String>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec(records)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl IngestionLedger for JsonFileLedger {
    fn get(&self, content_hash: &str) -> Result<Option<IngestionRecord>> {
        Ok(self.records.lock().get(content_hash).map(|job_id| IngestionRecord { content_hash: content_hash.to_string(), job_id: job_id.clone() }))
    }

    fn insert(&self, record: IngestionRecord) -> Result<IngestionRecord> {
        let mut records = self.records.lock();
        if let Some(existing) = records.get(&record.content_hash) {
            return Ok(IngestionRecord { content_hash: record.content_hash, job_id: existing.clone() });
        }
        records.insert(record.content_hash.clone(), record.job_id.clone());
        if let Err(e) = self.persist(&records) {
            records.remove(&record.content_hash);
            return Err(e);
        }
        debug!(hash = %record.content_hash, job_id = %record.job_id, "ledger record written");
        Ok(record)
    }

    fn len(&self) -> usize { self.records.lock().len() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: &str, job: &str) -> IngestionRecord { IngestionRecord { content_hash: hash.into(), job_id: job.into() } }

    #[test]
    fn first_insert_wins() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.insert(record("h", "job-1")).unwrap().job_id, "job-1");
        assert_eq!(ledger.insert(record("h", "job-2")).unwrap().job_id, "job-1");
        assert_eq!(ledger.get("h").unwrap().unwrap().job_id, "job-1");
        assert!(ledger.get("other").unwrap().is_none());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn json_ledger_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uploads/hashes.json");
        let ledger = JsonFileLedger::open(&path).unwrap();
        assert!(ledger.is_empty());
        ledger.insert(record("abc", "job-1")).unwrap();
        drop(ledger);

        let raw: BTreeMap<String, String> = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw.get("abc").map(String::as_str), Some("job-1"));
        let reopened = JsonFileLedger::open(&path).unwrap();
        assert_eq!(reopened.get("abc").unwrap().unwrap().job_id, "job-1");
    }

    #[test]
    fn corrupt_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hashes.json");
        fs::write(&path, b"[1, 2").unwrap();
        let err = JsonFileLedger::open(&path).unwrap_err();
        assert!(matches!(err, Error::CorruptState { .. }));
        assert!(!err.is_client_error());
    }
}
