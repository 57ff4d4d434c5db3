use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How many job statuses a pipeline remembers by default.
pub const DEFAULT_TRACKED_JOBS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Done,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub file_id: String,
    pub pages: u32,
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: String,
    pub status: JobState,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatus {
    pub fn pending(job_id: impl Into<String>) -> Self {
        Self { job_id: job_id.into(), status: JobState::Pending, started_at: None, ended_at: None, duration_ms: None, artifacts: Vec::new(), error: None }
    }

    pub fn is_finished(&self) -> bool { matches!(self.status, JobState::Done | JobState::Error) }

    pub fn start(&mut self) {
        self.status = JobState::Processing;
        self.started_at = Some(Utc::now());
    }

    pub fn finish(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
        self.close(JobState::Done);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.close(JobState::Error);
    }

    fn close(&mut self, state: JobState) {
        let now = Utc::now();
        self.status = state;
        self.ended_at = Some(now);
        self.duration_ms = self.started_at.map(|s| u64::try_from((now - s).num_milliseconds()).unwrap_or(0));
    }
}

/// Recent job statuses keyed by id. Past `capacity`, the oldest finished
/// jobs are forgotten first; unfinished jobs are never evicted.
#[derive(Debug)]
pub struct JobBoard {
    capacity: usize,
    jobs: HashMap<String, JobStatus>,
    order: VecDeque<String>,
}

impl JobBoard {
    pub fn new(capacity: usize) -> Self { Self { capacity: capacity.max(1), jobs: HashMap::new(), order: VecDeque::new() } }

    pub fn get(&self, job_id: &str) -> Option<&JobStatus> { self.jobs.get(job_id) }

    pub fn len(&self) -> usize { self.jobs.len() }

    pub fn is_empty(&self) -> bool { self.jobs.is_empty() }

    /// Insert or replace the status stored under its job id.
    pub fn record(&mut self, status: JobStatus) {
        let job_id = status.job_id.clone();
        if self.jobs.insert(job_id.clone(), status).is_none() {
            self.order.push_back(job_id);
        }
        self.evict();
    }

    fn evict(&mut self) {
        let mut excess = self.jobs.len().saturating_sub(self.capacity);
        if excess == 0 {
            return;
        }
        let jobs = &mut self.jobs;
        self.order.retain(|id| {
            if excess == 0 || !jobs.get(id).is_some_and(JobStatus::is_finished) {
                return true;
            }
            jobs.remove(id);
            excess -= 1;
            false
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_sets_timings() {
        let mut job = JobStatus::pending("j");
        assert_eq!(job.status, JobState::Pending);
        job.start();
        job.finish(Artifact { file_id: "j".into(), pages: 1, chunks: 3 });
        assert_eq!(job.status, JobState::Done);
        assert!(job.ended_at >= job.started_at);
        assert!(job.duration_ms.is_some());
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "done");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_records_message() {
        let mut job = JobStatus::pending("j");
        job.start();
        job.fail("boom");
        assert_eq!(job.status, JobState::Error);
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    fn done(id: &str) -> JobStatus {
        let mut job = JobStatus::pending(id);
        job.start();
        job.finish(Artifact { file_id: id.into(), pages: 0, chunks: 0 });
        job
    }

    #[test]
    fn board_forgets_oldest_finished_jobs() {
        let mut board = JobBoard::new(2);
        let mut running = JobStatus::pending("running");
        running.start();
        board.record(running);
        board.record(done("a"));
        board.record(done("b"));
        assert_eq!(board.len(), 2);
        assert!(board.get("running").is_some());
        assert!(board.get("a").is_none());
        assert!(board.get("b").is_some());

        board.record(done("running"));
        board.record(done("c"));
        assert_eq!(board.len(), 2);
        assert!(board.get("running").is_none());
        assert_eq!(board.get("c").map(|j| j.status), Some(JobState::Done));
    }

    #[test]
    fn board_keeps_unfinished_jobs_past_capacity() {
        let mut board = JobBoard::new(1);
        for id in ["x", "y"] {
            let mut job = JobStatus::pending(id);
            job.start();
            board.record(job);
        }
        assert_eq!(board.len(), 2);
        board.record(done("x"));
        assert_eq!(board.len(), 1);
        assert!(board.get("y").is_some());
    }
}
