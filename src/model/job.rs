//! Report jobs: identity, immutable request config, and lifecycle state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

// ---------------------------------------------------------------------------
// Report Job
// ---------------------------------------------------------------------------

/// A report-generation job tracked by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportJob {
    /// Unique identifier, assigned at creation.
    pub id: JobId,

    pub title: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub period: Period,
    pub format: ReportFormat,
    pub include_charts: bool,
    pub filters: ReportFilters,

    /// Current lifecycle state.
    pub status: JobStatus,

    /// Storage path of the artifact. Set only on COMPLETED.
    pub file_path: Option<String>,
    /// Human-readable artifact size. Set only on COMPLETED.
    pub file_size: Option<String>,
    /// Short diagnostic. Set only on FAILED.
    pub failure_reason: Option<String>,
    /// When the job reached a terminal state.
    pub generated_date: Option<DateTime<Utc>>,

    /// Opaque identity of the submitting actor.
    pub requested_by: String,
    pub created_at: DateTime<Utc>,
}

impl ReportJob {
    /// Create a PENDING job from a validated config.
    pub fn pending(config: ReportConfig, requested_by: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            title: config.title,
            report_type: config.report_type,
            period: config.period,
            format: config.format,
            include_charts: config.include_charts,
            filters: config.filters,
            status: JobStatus::Pending,
            file_path: None,
            file_size: None,
            failure_reason: None,
            generated_date: None,
            requested_by: requested_by.into(),
            created_at: Utc::now(),
        }
    }

    /// Artifact name: `report-{id}-{type}.{ext}`.
    pub fn artifact_name(&self) -> String {
        format!(
            "report-{}-{}.{}",
            self.id.0,
            self.report_type,
            self.format.extension()
        )
    }
}

/// Newtype for job IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
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

impl std::str::FromStr for JobId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(JobId)
            .map_err(|e| Error::InvalidId(format!("'{s}': {e}")))
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a report job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Persisted, waiting for a worker.
    Pending,
    /// A worker owns the job and is building the artifact.
    Generating,
    /// Artifact stored. Terminal.
    Completed,
    /// Generation or storage failed. Terminal.
    Failed,
}

impl JobStatus {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, to),
            (Pending, Generating) | (Generating, Completed) | (Generating, Failed)
        )
    }

    /// Is this a terminal state?
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Generating => "generating",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "generating" => Ok(JobStatus::Generating),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::Other(format!("unknown job status: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Report config enums
// ---------------------------------------------------------------------------

/// Which content builder renders the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Performance,
    Collections,
    Predictive,
    Other,
}

impl ReportType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Performance => "performance",
            ReportType::Collections => "collections",
            ReportType::Predictive => "predictive",
            ReportType::Other => "other",
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for ReportType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "performance" => Ok(ReportType::Performance),
            "collections" => Ok(ReportType::Collections),
            "predictive" => Ok(ReportType::Predictive),
            "other" => Ok(ReportType::Other),
            _ => Err(Error::invalid("type")),
        }
    }
}

/// Reporting period. Also drives the default date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Quarterly => "quarterly",
            Period::Yearly => "yearly",
        }
    }

    /// Length of the default reporting window in days.
    pub fn window_days(self) -> i64 {
        match self {
            Period::Daily => 1,
            Period::Weekly => 7,
            Period::Monthly => 30,
            Period::Quarterly => 91,
            Period::Yearly => 365,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            "quarterly" => Ok(Period::Quarterly),
            "yearly" => Ok(Period::Yearly),
            _ => Err(Error::invalid("period")),
        }
    }
}

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Pdf,
    Excel,
    /// PDF and workbook bundled into one zip artifact.
    Both,
}

impl ReportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Excel => "excel",
            ReportFormat::Both => "both",
        }
    }

    /// File extension of the stored artifact.
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Excel => "xlsx",
            ReportFormat::Both => "zip",
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(ReportFormat::Pdf),
            "excel" => Ok(ReportFormat::Excel),
            "both" => Ok(ReportFormat::Both),
            _ => Err(Error::invalid("format")),
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Optional scoping applied by content builders when pulling data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilters {
    pub municipality_id: Option<String>,
    pub collector_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ReportFilters {
    /// Resolve the inclusive date window for a report.
    ///
    /// Explicit bounds win. A missing end defaults to `today`; a missing
    /// start is the period's window length before the end.
    pub fn window(&self, period: Period, today: NaiveDate) -> DateWindow {
        let end = self.end_date.unwrap_or(today);
        let start = self
            .start_date
            .unwrap_or_else(|| end - chrono::Duration::days(period.window_days() - 1));
        DateWindow { start, end }
    }
}

/// Inclusive date range handed to data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Request / validated config
// ---------------------------------------------------------------------------

/// Raw submission as received from a client. Nothing is trusted yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type")]
    pub report_type: String,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub format: String,
    pub include_charts: Option<bool>,
    pub municipality_id: Option<String>,
    pub collector_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ReportRequest {
    pub fn new(
        title: impl Into<String>,
        report_type: impl Into<String>,
        period: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            report_type: report_type.into(),
            period: period.into(),
            format: format.into(),
            ..Self::default()
        }
    }

    pub fn include_charts(mut self, include: bool) -> Self {
        self.include_charts = Some(include);
        self
    }

    pub fn municipality(mut self, id: impl Into<String>) -> Self {
        self.municipality_id = Some(id.into());
        self
    }

    pub fn collector(mut self, id: impl Into<String>) -> Self {
        self.collector_id = Some(id.into());
        self
    }

    pub fn date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// Validate every field, collecting all offenders before failing.
    pub fn validate(&self) -> Result<ReportConfig, Error> {
        let mut fields = Vec::new();

        let title = self.title.trim();
        if title.is_empty() {
            fields.push("title".to_string());
        }
        let report_type = parse_required::<ReportType>(&self.report_type, "type", &mut fields);
        let period = parse_required::<Period>(&self.period, "period", &mut fields);
        let format = parse_required::<ReportFormat>(&self.format, "format", &mut fields);
        if self.include_charts.is_none() {
            fields.push("includeCharts".to_string());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                fields.push("dateRange".to_string());
            }
        }

        match (report_type, period, format, self.include_charts) {
            (Some(report_type), Some(period), Some(format), Some(include_charts))
                if fields.is_empty() =>
            {
                Ok(ReportConfig {
                    title: title.to_string(),
                    report_type,
                    period,
                    format,
                    include_charts,
                    filters: ReportFilters {
                        municipality_id: non_blank(&self.municipality_id),
                        collector_id: non_blank(&self.collector_id),
                        start_date: self.start_date,
                        end_date: self.end_date,
                    },
                })
            }
            _ => Err(Error::Validation { fields }),
        }
    }
}

fn parse_required<T: std::str::FromStr>(
    raw: &str,
    field: &str,
    fields: &mut Vec<String>,
) -> Option<T> {
    let parsed = raw.trim().to_ascii_lowercase().parse().ok();
    if parsed.is_none() {
        fields.push(field.to_string());
    }
    parsed
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A validated submission. Immutable once a job is created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub title: String,
    pub report_type: ReportType,
    pub period: Period,
    pub format: ReportFormat,
    pub include_charts: bool,
    pub filters: ReportFilters,
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Returned by a successful submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub id: JobId,
    pub status: JobStatus,
}

/// Listing row exposed to polling clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: JobId,
    pub title: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub period: Period,
    pub generated_date: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub format: ReportFormat,
    pub file_size: Option<String>,
    pub municipality_name: Option<String>,
    pub generated_by: String,
}

/// Artifact bytes plus the filename clients should save them under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub bytes: Vec<u8>,
}
