//! Metric instrument factories for reportq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"reportq"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for reportq instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("reportq")
}

/// Counter: report submissions.
/// Labels: `report_type`, `result` ("ok" | "invalid").
pub fn jobs_submitted() -> Counter<u64> {
    meter()
        .u64_counter("reportq.jobs.submitted")
        .with_description("Number of report jobs submitted")
        .build()
}

/// Counter: job state transitions.
/// Labels: `from`, `to`.
pub fn job_state_transitions() -> Counter<u64> {
    meter()
        .u64_counter("reportq.jobs.state_transitions")
        .with_description("Number of report job state transitions")
        .build()
}

/// Counter: dispatches dropped by the pickup guard (job no longer pending).
pub fn duplicate_dispatches() -> Counter<u64> {
    meter()
        .u64_counter("reportq.jobs.duplicate_dispatches")
        .with_description("Dispatches rejected because the job was not pending")
        .build()
}

/// Histogram: generation duration in milliseconds.
/// Labels: `report_type`, `outcome`.
pub fn generation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("reportq.generation.duration_ms")
        .with_description("Report generation duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Histogram: stored artifact size in bytes.
/// Labels: `format`.
pub fn artifact_bytes() -> Histogram<u64> {
    meter()
        .u64_histogram("reportq.artifact.bytes")
        .with_description("Size of stored report artifacts")
        .with_unit("By")
        .build()
}
