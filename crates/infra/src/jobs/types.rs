//! Core job types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::StoreError;

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job execution state.
///
/// `NotFound` is a query-time sentinel for unknown ids; it is never stored in
/// the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Queued, waiting for a concurrency slot
    Queued,
    /// Currently being executed
    Running,
    /// Completed successfully
    Completed,
    /// Failed with an error
    Failed,
    /// Cancelled before completion
    Cancelled,
    /// Unknown id (query-time sentinel)
    NotFound,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Queued | JobState::Running)
    }
}

/// Status record for a submitted job.
///
/// Records are kept for the lifetime of the process; the registry grows with
/// every submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub name: String,
    pub state: JobState,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

impl JobRecord {
    /// Fresh record for a just-submitted job.
    pub fn queued(id: JobId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            state: JobState::Queued,
            enqueued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error_message: None,
        }
    }

    /// Wall-clock run time, available once the job started and finished.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => Some(completed - started),
            _ => None,
        }
    }
}

/// Error surfaced by a job body.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The body observed its cancellation signal and stopped.
    #[error("job was cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),
}

impl JobError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        Self::Failed(err.to_string())
    }
}

impl From<serde_json::Error> for JobError {
    fn from(err: serde_json::Error) -> Self {
        Self::Failed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_and_active_partitions() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::NotFound.is_terminal());

        assert!(JobState::Queued.is_active());
        assert!(JobState::Running.is_active());
        assert!(!JobState::Completed.is_active());
    }

    #[test]
    fn duration_needs_both_timestamps() {
        let mut record = JobRecord::queued(JobId::new(), "test");
        assert!(record.duration().is_none());

        let started = Utc::now();
        record.started_at = Some(started);
        assert!(record.duration().is_none());

        record.completed_at = Some(started + Duration::milliseconds(250));
        assert_eq!(record.duration(), Some(Duration::milliseconds(250)));
    }
}
