//! In-process job store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Artifact, JobStore, validate_transition};
use crate::error::{Error, Result};
use crate::model::job::{JobId, JobStatus, ReportJob};

/// Job store backed by a map behind a lock. Each conditional write checks
/// and mutates under the same write guard.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, ReportJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, id: JobId, from: JobStatus, to: JobStatus, apply: F) -> Result<ReportJob>
    where
        F: FnOnce(&mut ReportJob),
    {
        validate_transition(from, to)?;

        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("report job {id}")))?;

        if job.status != from {
            return Err(Error::InvalidTransition {
                from: job.status.to_string(),
                to: to.to_string(),
            });
        }

        job.status = to;
        apply(job);
        Ok(job.clone())
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: &ReportJob) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(Error::Other(format!("report job {} already exists", job.id)));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<ReportJob> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("report job {id}")))
    }

    async fn transition(&self, id: JobId, from: JobStatus, to: JobStatus) -> Result<ReportJob> {
        self.update(id, from, to, |_| {}).await
    }

    async fn complete(
        &self,
        id: JobId,
        artifact: Artifact,
        at: DateTime<Utc>,
    ) -> Result<ReportJob> {
        self.update(id, JobStatus::Generating, JobStatus::Completed, |job| {
            job.file_path = Some(artifact.path);
            job.file_size = Some(artifact.size);
            job.generated_date = Some(at);
        })
        .await
    }

    async fn fail(&self, id: JobId, reason: &str, at: DateTime<Utc>) -> Result<ReportJob> {
        self.update(id, JobStatus::Generating, JobStatus::Failed, |job| {
            job.failure_reason = Some(reason.to_string());
            job.generated_date = Some(at);
        })
        .await
    }

    async fn list(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<ReportJob>> {
        let jobs = self.jobs.read().await;
        let mut matching: Vec<ReportJob> = jobs
            .values()
            .filter(|j| status.is_none_or(|s| j.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn pending_ids(&self, limit: usize) -> Result<Vec<JobId>> {
        let jobs = self.jobs.read().await;
        let mut pending: Vec<&ReportJob> = jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending)
            .collect();
        pending.sort_by_key(|j| j.created_at);
        Ok(pending.into_iter().take(limit).map(|j| j.id).collect())
    }
}
