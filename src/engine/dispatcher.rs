//! Submission path: validate, persist PENDING, hand off to the pool.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::pool::JobQueue;
use crate::error::Result;
use crate::model::job::{ReportJob, ReportRequest, Submission};
use crate::store::JobStore;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;

#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn JobStore>,
    queue: Option<JobQueue>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn JobStore>, queue: JobQueue) -> Self {
        Self {
            store,
            queue: Some(queue),
        }
    }

    /// A dispatcher with no local pool. Jobs stay PENDING until a pool
    /// scanning the same store claims them.
    pub fn unqueued(store: Arc<dyn JobStore>) -> Self {
        Self { store, queue: None }
    }

    /// Validate and persist a request, then schedule it.
    ///
    /// Returns as soon as the PENDING record is written. Generation happens
    /// on the pool; callers observe it by polling the tracker.
    pub async fn submit(&self, request: &ReportRequest, requested_by: &str) -> Result<Submission> {
        let config = match request.validate() {
            Ok(config) => config,
            Err(e) => {
                metrics::jobs_submitted().add(
                    1,
                    &[
                        KeyValue::new("report_type", request.report_type.clone()),
                        KeyValue::new("result", "invalid"),
                    ],
                );
                return Err(e);
            }
        };

        let job = ReportJob::pending(config, requested_by);
        self.store.insert(&job).await?;

        metrics::jobs_submitted().add(
            1,
            &[
                KeyValue::new("report_type", job.report_type.as_str()),
                KeyValue::new("result", "ok"),
            ],
        );
        info!(
            job_id = %job.id,
            report_type = %job.report_type,
            format = %job.format,
            requested_by,
            "report job submitted"
        );

        // The record is already PENDING, so a pool that scans the store
        // will still find it if this send fails.
        match self.queue {
            Some(ref queue) => {
                if let Err(e) = queue.enqueue(job.id) {
                    warn!(job_id = %job.id, "job left pending: {e}");
                }
            }
            None => debug!(job_id = %job.id, "no local pool, left for a scanning pool"),
        }

        Ok(Submission {
            id: job.id,
            status: job.status,
        })
    }
}
