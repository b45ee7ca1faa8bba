//! Input data for content builders.
//!
//! Aggregation queries belong to the surrounding platform. Builders only see
//! the [`ReportDataSource`] trait and the already-aggregated rows it returns.

pub mod fixture;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::job::{DateWindow, ReportJob};

pub use fixture::StaticDataSource;

/// Filters a builder passes to the data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataScope {
    pub municipality_id: Option<String>,
    pub collector_id: Option<String>,
    pub window: DateWindow,
}

impl DataScope {
    /// Scope for a job, with the date window resolved against `today`.
    pub fn for_job(job: &ReportJob, today: NaiveDate) -> Self {
        Self {
            municipality_id: job.filters.municipality_id.clone(),
            collector_id: job.filters.collector_id.clone(),
            window: job.filters.window(job.period, today),
        }
    }

    /// Same filters over a different window.
    pub fn with_window(&self, window: DateWindow) -> Self {
        Self {
            window,
            ..self.clone()
        }
    }

    pub fn matches(&self, municipality_id: &str, collector_id: Option<&str>) -> bool {
        let municipality_ok = self
            .municipality_id
            .as_deref()
            .is_none_or(|m| m == municipality_id);
        let collector_ok = match (self.collector_id.as_deref(), collector_id) {
            (None, _) => true,
            (Some(wanted), Some(actual)) => wanted == actual,
            (Some(_), None) => false,
        };
        municipality_ok && collector_ok
    }
}

/// Service-request handling figures for one collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorPerformance {
    pub collector_id: String,
    pub collector_name: String,
    pub assigned: u64,
    pub completed: u64,
    pub pending: u64,
    /// Mean hours from request to completion, over completed requests.
    pub avg_completion_hours: Option<f64>,
}

impl CollectorPerformance {
    pub fn completion_rate(&self) -> f64 {
        if self.assigned == 0 {
            0.0
        } else {
            self.completed as f64 / self.assigned as f64
        }
    }
}

/// Collected volume for one day, municipality and waste type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionVolume {
    pub date: NaiveDate,
    pub municipality_id: String,
    pub waste_type: String,
    pub pickups: u64,
    pub weight_kg: f64,
}

#[async_trait]
pub trait ReportDataSource: Send + Sync {
    /// Per-collector service-request statistics within the scope.
    async fn collector_performance(&self, scope: &DataScope) -> Result<Vec<CollectorPerformance>>;

    /// Daily collection volumes within the scope.
    async fn collection_volumes(&self, scope: &DataScope) -> Result<Vec<CollectionVolume>>;

    /// Display name of a municipality, if known.
    async fn municipality_name(&self, id: &str) -> Result<Option<String>>;
}
