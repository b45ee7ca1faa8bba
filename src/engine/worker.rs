//! One job's generation, end to end.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, error, info, warn};

use crate::builder::{BuilderRegistry, format_file_size};
use crate::error::{Error, Result};
use crate::model::job::{JobId, JobStatus, ReportJob};
use crate::source::ReportDataSource;
use crate::storage::FileStorage;
use crate::store::{Artifact, JobStore};
use crate::telemetry::job::{record_state_transition, start_job_span};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;

/// Longest failure reason persisted on a job.
const MAX_REASON_LEN: usize = 500;

/// What a worker did with a dispatched job id.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(ReportJob),
    Failed(ReportJob),
    /// The job was not PENDING. Someone else owns it, or it already finished.
    Skipped,
}

/// Executes jobs. Cheap to share; holds only handles.
#[derive(Clone)]
pub struct Worker {
    store: Arc<dyn JobStore>,
    storage: Arc<dyn FileStorage>,
    builders: Arc<BuilderRegistry>,
    source: Arc<dyn ReportDataSource>,
    job_timeout: Option<Duration>,
}

impl Worker {
    pub fn new(
        store: Arc<dyn JobStore>,
        storage: Arc<dyn FileStorage>,
        builders: Arc<BuilderRegistry>,
        source: Arc<dyn ReportDataSource>,
    ) -> Self {
        Self {
            store,
            storage,
            builders,
            source,
            job_timeout: None,
        }
    }

    /// Fail jobs whose build and upload take longer than `limit`.
    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.job_timeout = limit;
        self
    }

    /// Claim and execute one job.
    ///
    /// Errors are only returned when the job store itself fails. Build and
    /// storage failures end up on the job as FAILED.
    pub async fn run(&self, id: JobId) -> Result<RunOutcome> {
        // Claim: PENDING -> GENERATING, or walk away.
        let job = match self
            .store
            .transition(id, JobStatus::Pending, JobStatus::Generating)
            .await
        {
            Ok(job) => job,
            Err(Error::InvalidTransition { from, .. }) => {
                debug!(job_id = %id, status = %from, "job not pending, skipping");
                metrics::duplicate_dispatches().add(1, &[]);
                return Ok(RunOutcome::Skipped);
            }
            Err(e) => return Err(e),
        };
        record_metric_transition(JobStatus::Pending, JobStatus::Generating);

        let span = start_job_span(&job);
        record_state_transition(&span, JobStatus::Pending, JobStatus::Generating);

        async {
            let started = Instant::now();
            let result = self.generate(&job).await;
            let duration_ms = started.elapsed().as_millis() as f64;

            match result {
                Ok(artifact) => {
                    info!(path = %artifact.path, size = %artifact.size, duration_ms, "report completed");
                    let done = self.store.complete(job.id, artifact, Utc::now()).await?;
                    record_state_transition(&span, JobStatus::Generating, JobStatus::Completed);
                    record_metric_transition(JobStatus::Generating, JobStatus::Completed);
                    record_duration(&job, "completed", duration_ms);
                    Ok(RunOutcome::Completed(done))
                }
                Err(e) => {
                    let reason = failure_reason(&e);
                    error!(%reason, duration_ms, "report failed");
                    let failed = self.store.fail(job.id, &reason, Utc::now()).await?;
                    record_state_transition(&span, JobStatus::Generating, JobStatus::Failed);
                    record_metric_transition(JobStatus::Generating, JobStatus::Failed);
                    record_duration(&job, "failed", duration_ms);
                    Ok(RunOutcome::Failed(failed))
                }
            }
        }
        .instrument(span.clone())
        .await
    }

    /// Build and store the artifact in a separate task, so a panicking
    /// builder or an exhausted time budget still ends in a FAILED write.
    async fn generate(&self, job: &ReportJob) -> Result<Artifact> {
        let this = self.clone();
        let owned = job.clone();
        let mut task = tokio::spawn(
            async move { this.build_and_store(&owned).await }.in_current_span(),
        );

        let joined = match self.job_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    warn!(limit_secs = limit.as_secs_f64(), "generation exceeded time budget");
                    return Err(Error::Generation(format!(
                        "generation timed out after {:.1}s",
                        limit.as_secs_f64()
                    )));
                }
            },
            None => task.await,
        };

        joined.map_err(|e| {
            if e.is_panic() {
                Error::Generation("content builder panicked".to_string())
            } else {
                Error::Generation(format!("generation task aborted: {e}"))
            }
        })?
    }

    async fn build_and_store(&self, job: &ReportJob) -> Result<Artifact> {
        let bytes = self.builders.render(job, self.source.as_ref()).await?;
        let path = self
            .storage
            .save_file(&bytes, &job.artifact_name())
            .await?;

        metrics::artifact_bytes().record(
            bytes.len() as u64,
            &[KeyValue::new("format", job.format.as_str())],
        );
        Ok(Artifact {
            path,
            size: format_file_size(bytes.len() as u64),
        })
    }
}

/// Short diagnostic for the job record.
fn failure_reason(e: &Error) -> String {
    let mut reason = match e {
        Error::Storage(inner) => format!("storage: {inner}"),
        other => other.to_string(),
    };
    if reason.len() > MAX_REASON_LEN {
        let mut cut = MAX_REASON_LEN;
        while !reason.is_char_boundary(cut) {
            cut -= 1;
        }
        reason.truncate(cut);
    }
    reason
}

fn record_metric_transition(from: JobStatus, to: JobStatus) {
    metrics::job_state_transitions().add(
        1,
        &[
            KeyValue::new("from", from.as_str()),
            KeyValue::new("to", to.as_str()),
        ],
    );
}

fn record_duration(job: &ReportJob, outcome: &'static str, duration_ms: f64) {
    metrics::generation_duration_ms().record(
        duration_ms,
        &[
            KeyValue::new("report_type", job.report_type.as_str()),
            KeyValue::new("outcome", outcome),
        ],
    );
}
