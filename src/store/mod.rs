//! Durable job records.
//!
//! Every state change is a conditional write: it only lands if the record is
//! still in the expected state. That is what gives each job a single writer.
//! The dispatcher inserts PENDING, the worker that wins the
//! PENDING -> GENERATING claim owns every later write.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::job::{JobId, JobStatus, ReportJob};

pub use memory::InMemoryJobStore;

/// Where a completed job's artifact lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: String,
    pub size: String,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new PENDING job. Fails if the id already exists.
    async fn insert(&self, job: &ReportJob) -> Result<()>;

    /// Fetch a job by id.
    async fn get(&self, id: JobId) -> Result<ReportJob>;

    /// Move a job from `from` to `to`, only if it is currently in `from`.
    async fn transition(&self, id: JobId, from: JobStatus, to: JobStatus) -> Result<ReportJob>;

    /// GENERATING -> COMPLETED, setting path, size and generated date together.
    async fn complete(&self, id: JobId, artifact: Artifact, at: DateTime<Utc>)
    -> Result<ReportJob>;

    /// GENERATING -> FAILED with a diagnostic.
    async fn fail(&self, id: JobId, reason: &str, at: DateTime<Utc>) -> Result<ReportJob>;

    /// Jobs newest first, optionally filtered by status.
    async fn list(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<ReportJob>>;

    /// PENDING job ids, oldest first.
    async fn pending_ids(&self, limit: usize) -> Result<Vec<JobId>>;
}

/// Validate a state transition, returning an error if disallowed.
pub(crate) fn validate_transition(from: JobStatus, to: JobStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
