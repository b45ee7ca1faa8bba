//! Data source backed by a static dataset, loaded from TOML.
//!
//! Stands in for the platform's aggregation queries in the CLI and tests.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::{CollectionVolume, CollectorPerformance, DataScope, ReportDataSource};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Municipality {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collector {
    pub id: String,
    pub name: String,
    pub municipality_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

/// One service request raised by a household.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceRequest {
    pub collector_id: Option<String>,
    pub municipality_id: String,
    pub status: RequestStatus,
    pub requested_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

/// One pickup recorded by a collector.
#[derive(Debug, Clone, Deserialize)]
pub struct Pickup {
    pub date: NaiveDate,
    pub municipality_id: String,
    pub collector_id: Option<String>,
    pub waste_type: String,
    pub weight_kg: f64,
}

/// Whole dataset as it appears in the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub municipalities: Vec<Municipality>,
    #[serde(default)]
    pub collectors: Vec<Collector>,
    #[serde(default)]
    pub requests: Vec<ServiceRequest>,
    #[serde(default)]
    pub pickups: Vec<Pickup>,
}

#[derive(Debug, Clone, Default)]
pub struct StaticDataSource {
    data: Dataset,
}

impl StaticDataSource {
    pub fn new(data: Dataset) -> Self {
        Self { data }
    }

    /// A source with no rows. Reports still render, with empty tables.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let data: Dataset = toml::from_str(content)
            .map_err(|e| Error::Config(format!("bad dataset: {e}")))?;
        Ok(Self::new(data))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read dataset {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    fn collector_name(&self, id: &str) -> String {
        self.data
            .collectors
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

#[async_trait]
impl ReportDataSource for StaticDataSource {
    async fn collector_performance(&self, scope: &DataScope) -> Result<Vec<CollectorPerformance>> {
        // BTreeMap keeps collector order stable across runs.
        let mut by_collector: BTreeMap<&str, (u64, u64, u64, f64)> = BTreeMap::new();

        for req in &self.data.requests {
            let Some(collector_id) = req.collector_id.as_deref() else {
                continue;
            };
            if !scope.window.contains(req.requested_at.date())
                || !scope.matches(&req.municipality_id, Some(collector_id))
            {
                continue;
            }

            let entry = by_collector.entry(collector_id).or_default();
            entry.0 += 1;
            match req.status {
                RequestStatus::Completed => {
                    entry.1 += 1;
                    if let Some(done) = req.completed_at {
                        entry.3 += (done - req.requested_at).num_minutes() as f64 / 60.0;
                    }
                }
                RequestStatus::Pending | RequestStatus::InProgress => entry.2 += 1,
                RequestStatus::Cancelled => {}
            }
        }

        Ok(by_collector
            .into_iter()
            .map(|(id, (assigned, completed, pending, hours))| CollectorPerformance {
                collector_id: id.to_string(),
                collector_name: self.collector_name(id),
                assigned,
                completed,
                pending,
                avg_completion_hours: (completed > 0).then(|| hours / completed as f64),
            })
            .collect())
    }

    async fn collection_volumes(&self, scope: &DataScope) -> Result<Vec<CollectionVolume>> {
        let mut grouped: HashMap<(NaiveDate, &str, &str), (u64, f64)> = HashMap::new();

        for pickup in &self.data.pickups {
            if !scope.window.contains(pickup.date)
                || !scope.matches(&pickup.municipality_id, pickup.collector_id.as_deref())
            {
                continue;
            }
            let entry = grouped
                .entry((pickup.date, &pickup.municipality_id, &pickup.waste_type))
                .or_default();
            entry.0 += 1;
            entry.1 += pickup.weight_kg;
        }

        let mut volumes: Vec<CollectionVolume> = grouped
            .into_iter()
            .map(|((date, municipality_id, waste_type), (pickups, weight_kg))| CollectionVolume {
                date,
                municipality_id: municipality_id.to_string(),
                waste_type: waste_type.to_string(),
                pickups,
                weight_kg,
            })
            .collect();
        volumes.sort_by(|a, b| {
            (a.date, &a.municipality_id, &a.waste_type).cmp(&(
                b.date,
                &b.municipality_id,
                &b.waste_type,
            ))
        });
        Ok(volumes)
    }

    async fn municipality_name(&self, id: &str) -> Result<Option<String>> {
        Ok(self
            .data
            .municipalities
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.name.clone()))
    }
}
