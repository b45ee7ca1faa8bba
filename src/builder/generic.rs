//! Fallback for report types without a dedicated strategy.

use async_trait::async_trait;

use super::render::{Cell, Chart, Section, Table};
use super::{BuildContext, ContentBuilder};
use crate::error::Result;

/// Activity overview combining request and collection totals.
pub struct GenericBuilder;

#[async_trait]
impl ContentBuilder for GenericBuilder {
    fn name(&self) -> &'static str {
        "generic"
    }

    async fn build(&self, ctx: &BuildContext<'_>) -> Result<Vec<Section>> {
        let performance = ctx.source.collector_performance(&ctx.scope).await?;
        let volumes = ctx.source.collection_volumes(&ctx.scope).await?;

        let assigned: u64 = performance.iter().map(|p| p.assigned).sum();
        let completed: u64 = performance.iter().map(|p| p.completed).sum();
        let pickups: u64 = volumes.iter().map(|v| v.pickups).sum();
        let weight: f64 = volumes.iter().map(|v| v.weight_kg).sum();

        let mut table = Table::new(["Metric", "Value"]);
        table.row(vec![Cell::from("Active collectors"), Cell::from(performance.len() as u64)]);
        table.row(vec![Cell::from("Service requests"), Cell::from(assigned)]);
        table.row(vec![Cell::from("Requests completed"), Cell::from(completed)]);
        table.row(vec![Cell::from("Pickups"), Cell::from(pickups)]);
        table.row(vec![Cell::from("Weight collected (kg)"), Cell::from(weight)]);

        let mut overview = Section::new("Activity overview").table(table);
        if ctx.job.include_charts {
            overview = overview.chart(
                Chart::new("Requests")
                    .bar("Completed", completed as f64)
                    .bar("Open", assigned.saturating_sub(completed) as f64),
            );
        }
        Ok(vec![overview])
    }
}
