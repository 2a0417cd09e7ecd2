//! Concurrency-safe job status registry.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use tracing::warn;

use super::types::{JobId, JobRecord, JobState};

/// Process-wide map from job id to status record.
///
/// Construct one instance at startup and share it by `Arc`. Records are never
/// deleted; the registry grows for the lifetime of the process. Transitions
/// out of a terminal state are refused.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly submitted job.
    pub fn insert_queued(&self, record: JobRecord) {
        let mut jobs = self.jobs.write().unwrap();
        jobs.insert(record.id, record);
    }

    /// Current state; `NotFound` for ids the registry has never seen.
    pub fn state(&self, id: JobId) -> JobState {
        let jobs = self.jobs.read().unwrap();
        jobs.get(&id).map_or(JobState::NotFound, |r| r.state)
    }

    /// Full record for `id`, if known.
    pub fn get(&self, id: JobId) -> Option<JobRecord> {
        let jobs = self.jobs.read().unwrap();
        jobs.get(&id).cloned()
    }

    /// All records currently queued or running, in submission order.
    pub fn active(&self) -> Vec<JobRecord> {
        let jobs = self.jobs.read().unwrap();
        let mut active: Vec<_> = jobs
            .values()
            .filter(|r| r.state.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|r| (r.enqueued_at, r.id.0));
        active
    }

    /// Number of records currently `Running`.
    pub fn running_count(&self) -> usize {
        let jobs = self.jobs.read().unwrap();
        jobs.values()
            .filter(|r| r.state == JobState::Running)
            .count()
    }

    pub fn mark_running(&self, id: JobId) {
        self.transition(id, |record| {
            record.state = JobState::Running;
            record.started_at = Some(Utc::now());
        });
    }

    pub fn mark_completed(&self, id: JobId, result: Option<serde_json::Value>) {
        self.transition(id, |record| {
            record.state = JobState::Completed;
            record.completed_at = Some(Utc::now());
            record.result = result;
        });
    }

    pub fn mark_cancelled(&self, id: JobId) {
        self.transition(id, |record| {
            record.state = JobState::Cancelled;
            record.completed_at = Some(Utc::now());
        });
    }

    pub fn mark_failed(&self, id: JobId, error: impl Into<String>) {
        let error = error.into();
        self.transition(id, |record| {
            record.state = JobState::Failed;
            record.completed_at = Some(Utc::now());
            record.error_message = Some(error);
        });
    }

    fn transition(&self, id: JobId, apply: impl FnOnce(&mut JobRecord)) {
        let mut jobs = self.jobs.write().unwrap();
        match jobs.get_mut(&id) {
            Some(record) if record.state.is_terminal() => {
                warn!(job_id = %id, state = ?record.state, "refusing transition out of terminal state");
            }
            Some(record) => apply(record),
            None => warn!(job_id = %id, "transition requested for unknown job"),
        }
    }
}
