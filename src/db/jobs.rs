//! Report job persistence: insert, guarded state transitions, listing.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::job::*;
use crate::store::{Artifact, JobStore, validate_transition};

const SELECT_JOB: &str = "SELECT id, title, report_type, period, format, include_charts, municipality_id, collector_id, start_date, end_date, status, file_path, file_size, failure_reason, generated_date, requested_by, created_at
     FROM report_jobs";

impl super::Db {
    /// Conditional update shared by every transition. Zero rows affected
    /// means the job was missing or no longer in `from`.
    #[allow(clippy::too_many_arguments)]
    async fn guarded_update(
        &self,
        id: JobId,
        from: JobStatus,
        to: JobStatus,
        file_path: Option<&str>,
        file_size: Option<&str>,
        failure_reason: Option<&str>,
        generated_date: Option<DateTime<Utc>>,
    ) -> Result<ReportJob> {
        validate_transition(from, to)?;

        let rows_affected = sqlx::query(
            "UPDATE report_jobs
             SET status = $1,
                 file_path = COALESCE($2, file_path),
                 file_size = COALESCE($3, file_size),
                 failure_reason = COALESCE($4, failure_reason),
                 generated_date = COALESCE($5, generated_date),
                 updated_at = now()
             WHERE id = $6 AND status = $7",
        )
        .bind(to.as_str())
        .bind(file_path)
        .bind(file_size)
        .bind(failure_reason)
        .bind(generated_date)
        .bind(id.0)
        .bind(from.as_str())
        .execute(self.pool())
        .await?
        .rows_affected();

        if rows_affected == 0 {
            // Distinguish "missing" from "lost the race".
            let current = self.get(id).await?;
            return Err(Error::InvalidTransition {
                from: current.status.to_string(),
                to: to.to_string(),
            });
        }

        self.get(id).await
    }
}

#[async_trait]
impl JobStore for super::Db {
    async fn insert(&self, job: &ReportJob) -> Result<()> {
        sqlx::query(
            "INSERT INTO report_jobs (id, title, report_type, period, format, include_charts, municipality_id, collector_id, start_date, end_date, status, requested_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)",
        )
        .bind(job.id.0)
        .bind(&job.title)
        .bind(job.report_type.as_str())
        .bind(job.period.as_str())
        .bind(job.format.as_str())
        .bind(job.include_charts)
        .bind(&job.filters.municipality_id)
        .bind(&job.filters.collector_id)
        .bind(job.filters.start_date)
        .bind(job.filters.end_date)
        .bind(job.status.as_str())
        .bind(&job.requested_by)
        .bind(job.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<ReportJob> {
        let row: Option<ReportJobRow> = sqlx::query_as(&format!("{SELECT_JOB} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(self.pool())
            .await?;

        row.ok_or_else(|| Error::NotFound(format!("report job {id}")))?
            .try_into_job()
    }

    async fn transition(&self, id: JobId, from: JobStatus, to: JobStatus) -> Result<ReportJob> {
        self.guarded_update(id, from, to, None, None, None, None)
            .await
    }

    async fn complete(
        &self,
        id: JobId,
        artifact: Artifact,
        at: DateTime<Utc>,
    ) -> Result<ReportJob> {
        self.guarded_update(
            id,
            JobStatus::Generating,
            JobStatus::Completed,
            Some(&artifact.path),
            Some(&artifact.size),
            None,
            Some(at),
        )
        .await
    }

    async fn fail(&self, id: JobId, reason: &str, at: DateTime<Utc>) -> Result<ReportJob> {
        self.guarded_update(
            id,
            JobStatus::Generating,
            JobStatus::Failed,
            None,
            None,
            Some(reason),
            Some(at),
        )
        .await
    }

    async fn list(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<ReportJob>> {
        let rows: Vec<ReportJobRow> = sqlx::query_as(&format!(
            "{SELECT_JOB} WHERE ($1::text IS NULL OR status = $1) ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(status.map(JobStatus::as_str))
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(ReportJobRow::try_into_job).collect()
    }

    async fn pending_ids(&self, limit: usize) -> Result<Vec<JobId>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM report_jobs WHERE status = 'pending' ORDER BY created_at ASC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(|(id,)| JobId(id)).collect())
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct ReportJobRow {
    id: Uuid,
    title: String,
    report_type: String,
    period: String,
    format: String,
    include_charts: bool,
    municipality_id: Option<String>,
    collector_id: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    status: String,
    file_path: Option<String>,
    file_size: Option<String>,
    failure_reason: Option<String>,
    generated_date: Option<DateTime<Utc>>,
    requested_by: String,
    created_at: DateTime<Utc>,
}

impl ReportJobRow {
    fn try_into_job(self) -> Result<ReportJob> {
        let id = self.id;
        let corrupt =
            |field: &str, value: &str| Error::Other(format!("report job {id}: bad {field} '{value}'"));

        Ok(ReportJob {
            id: JobId(id),
            report_type: self
                .report_type
                .parse()
                .map_err(|_| corrupt("report_type", &self.report_type))?,
            period: self
                .period
                .parse()
                .map_err(|_| corrupt("period", &self.period))?,
            format: self
                .format
                .parse()
                .map_err(|_| corrupt("format", &self.format))?,
            status: self.status.parse()?,
            title: self.title,
            include_charts: self.include_charts,
            filters: ReportFilters {
                municipality_id: self.municipality_id,
                collector_id: self.collector_id,
                start_date: self.start_date,
                end_date: self.end_date,
            },
            file_path: self.file_path,
            file_size: self.file_size,
            failure_reason: self.failure_reason,
            generated_date: self.generated_date,
            requested_by: self.requested_by,
            created_at: self.created_at,
        })
    }
}
