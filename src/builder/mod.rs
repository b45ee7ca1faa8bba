//! Content builders: one strategy per report type.
//!
//! A strategy turns a job plus its data source into document sections. The
//! registry owns the type -> strategy mapping, adds the common header and
//! encodes the document in the job's format. New report types plug in with
//! [`BuilderRegistry::register`].

pub mod collections;
pub mod generic;
pub mod performance;
pub mod predictive;
pub mod render;
pub mod size;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::model::job::{ReportJob, ReportType};
use crate::source::{DataScope, ReportDataSource};

pub use collections::CollectionsBuilder;
pub use generic::GenericBuilder;
pub use performance::PerformanceBuilder;
pub use predictive::PredictiveBuilder;
pub use render::{Chart, Document, Section, Table};
pub use size::format_file_size;

/// Everything a strategy may read while building.
pub struct BuildContext<'a> {
    pub job: &'a ReportJob,
    pub scope: DataScope,
    pub source: &'a dyn ReportDataSource,
}

/// A per-report-type rendering strategy.
#[async_trait]
pub trait ContentBuilder: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Produce the body sections for one job.
    async fn build(&self, ctx: &BuildContext<'_>) -> Result<Vec<Section>>;
}

/// Registry of content builders, keyed by report type.
pub struct BuilderRegistry {
    builders: HashMap<ReportType, Arc<dyn ContentBuilder>>,
    fallback: Arc<dyn ContentBuilder>,
}

impl BuilderRegistry {
    /// A registry where every type resolves to the generic builder.
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
            fallback: Arc::new(GenericBuilder),
        }
    }

    /// The built-in strategies: performance, collections, predictive.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(ReportType::Performance, Arc::new(PerformanceBuilder));
        registry.register(ReportType::Collections, Arc::new(CollectionsBuilder));
        registry.register(ReportType::Predictive, Arc::new(PredictiveBuilder::default()));
        registry
    }

    /// Add or replace the strategy for a report type.
    pub fn register(&mut self, report_type: ReportType, builder: Arc<dyn ContentBuilder>) {
        self.builders.insert(report_type, builder);
    }

    /// Replace the strategy used for unregistered types.
    pub fn set_fallback(&mut self, builder: Arc<dyn ContentBuilder>) {
        self.fallback = builder;
    }

    /// Look up the strategy for a type, falling back to the generic one.
    pub fn builder_for(&self, report_type: ReportType) -> &Arc<dyn ContentBuilder> {
        self.builders.get(&report_type).unwrap_or(&self.fallback)
    }

    /// Render a job into artifact bytes, using today as the window anchor.
    pub async fn render(&self, job: &ReportJob, source: &dyn ReportDataSource) -> Result<Vec<u8>> {
        self.render_on(job, source, Utc::now().date_naive()).await
    }

    /// Render a job with an explicit anchor date for the default window.
    pub async fn render_on(
        &self,
        job: &ReportJob,
        source: &dyn ReportDataSource,
        today: NaiveDate,
    ) -> Result<Vec<u8>> {
        let document = self.compose(job, source, today).await?;
        render::encode(&document, job.format)
    }

    /// Build the format-agnostic document for a job: header plus the
    /// strategy's sections.
    pub async fn compose(
        &self,
        job: &ReportJob,
        source: &dyn ReportDataSource,
        today: NaiveDate,
    ) -> Result<Document> {
        let builder = self.builder_for(job.report_type);
        let ctx = BuildContext {
            job,
            scope: DataScope::for_job(job, today),
            source,
        };
        debug!(job_id = %job.id, builder = builder.name(), "building report content");

        let mut document = header(&ctx).await?;
        document.sections = builder.build(&ctx).await?;
        Ok(document)
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Title block shared by every report type.
async fn header(ctx: &BuildContext<'_>) -> Result<Document> {
    let job = ctx.job;
    let mut document = Document::new(&job.title);
    document.meta("Report type", job.report_type.as_str());
    document.meta("Period", job.period.as_str());
    document.meta("Date range", ctx.scope.window.to_string());

    if let Some(ref municipality_id) = ctx.scope.municipality_id {
        let name = ctx
            .source
            .municipality_name(municipality_id)
            .await?
            .unwrap_or_else(|| municipality_id.clone());
        document.meta("Municipality", name);
    }
    if let Some(ref collector_id) = ctx.scope.collector_id {
        document.meta("Collector", collector_id.clone());
    }
    document.meta("Requested by", job.requested_by.clone());
    document.meta("Generated", Utc::now().format("%Y-%m-%d %H:%M UTC").to_string());
    Ok(document)
}
