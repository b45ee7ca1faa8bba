//! Report job span helpers.
//!
//! Provides span creation and state-transition recording for jobs flowing
//! through the worker pool.

use tracing::Span;

use crate::model::job::{JobStatus, ReportJob};

/// Start a span covering one job's generation.
///
/// The `job.status` field is declared empty and updated via
/// [`record_state_transition`].
pub fn start_job_span(job: &ReportJob) -> Span {
    tracing::info_span!(
        "report.generate",
        "job.id" = %job.id,
        "job.type" = job.report_type.as_str(),
        "job.format" = job.format.as_str(),
        "job.status" = tracing::field::Empty,
    )
}

/// Record a state transition on the given span.
pub fn record_state_transition(span: &Span, from: JobStatus, to: JobStatus) {
    span.record("job.status", to.as_str());
    span.in_scope(|| {
        tracing::info!(from = from.as_str(), to = to.as_str(), "state_transition");
    });
}
