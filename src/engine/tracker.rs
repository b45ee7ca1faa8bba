//! Read-only views for polling clients.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::model::job::{Download, JobId, JobStatus, ReportJob, ReportSummary};
use crate::source::ReportDataSource;
use crate::storage::{FileStorage, StorageError};
use crate::store::JobStore;

#[derive(Clone)]
pub struct Tracker {
    store: Arc<dyn JobStore>,
    storage: Arc<dyn FileStorage>,
    source: Arc<dyn ReportDataSource>,
}

impl Tracker {
    pub fn new(
        store: Arc<dyn JobStore>,
        storage: Arc<dyn FileStorage>,
        source: Arc<dyn ReportDataSource>,
    ) -> Self {
        Self {
            store,
            storage,
            source,
        }
    }

    /// Full job record.
    pub async fn get(&self, id: JobId) -> Result<ReportJob> {
        self.store.get(id).await
    }

    /// Client-facing view, with the municipality name resolved.
    pub async fn summary(&self, id: JobId) -> Result<ReportSummary> {
        let job = self.store.get(id).await?;
        self.summarize(job).await
    }

    /// Recent jobs, newest first.
    pub async fn list(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<ReportSummary>> {
        let jobs = self.store.list(status, limit).await?;
        let mut summaries = Vec::with_capacity(jobs.len());
        for job in jobs {
            summaries.push(self.summarize(job).await?);
        }
        Ok(summaries)
    }

    /// Artifact bytes of a completed job.
    pub async fn download(&self, id: JobId) -> Result<Download> {
        let job = self.store.get(id).await?;
        if job.status != JobStatus::Completed {
            return Err(Error::NotReady { status: job.status });
        }
        let path = job
            .file_path
            .as_deref()
            .ok_or_else(|| Error::NotFound(format!("artifact for report job {id}")))?;

        let bytes = self
            .storage
            .download_file(path)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(p) => Error::NotFound(format!("artifact {p}")),
                other => Error::Storage(other),
            })?;

        let filename = path.rsplit('/').next().unwrap_or(path).to_string();
        Ok(Download { filename, bytes })
    }

    /// Poll until the job is terminal or `timeout` passes.
    ///
    /// On timeout the error carries the last status seen.
    pub async fn wait_for_terminal(
        &self,
        id: JobId,
        poll: Duration,
        timeout: Duration,
    ) -> Result<ReportJob> {
        let started = Instant::now();
        loop {
            let job = self.store.get(id).await?;
            if job.status.is_terminal() {
                return Ok(job);
            }
            if started.elapsed() >= timeout {
                return Err(Error::NotReady { status: job.status });
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn summarize(&self, job: ReportJob) -> Result<ReportSummary> {
        let municipality_name = match job.filters.municipality_id {
            Some(ref id) => self.source.municipality_name(id).await?,
            None => None,
        };
        Ok(ReportSummary {
            id: job.id,
            title: job.title,
            report_type: job.report_type,
            period: job.period,
            generated_date: job.generated_date,
            status: job.status,
            format: job.format,
            file_size: job.file_size,
            municipality_name,
            generated_by: job.requested_by,
        })
    }
}
