//! Collection volumes by waste type and day.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::render::{Cell, Chart, Section, Table};
use super::{BuildContext, ContentBuilder};
use crate::error::Result;

pub struct CollectionsBuilder;

#[async_trait]
impl ContentBuilder for CollectionsBuilder {
    fn name(&self) -> &'static str {
        "collections"
    }

    async fn build(&self, ctx: &BuildContext<'_>) -> Result<Vec<Section>> {
        let volumes = ctx.source.collection_volumes(&ctx.scope).await?;

        let mut by_type: BTreeMap<&str, (u64, f64)> = BTreeMap::new();
        for v in &volumes {
            let entry = by_type.entry(v.waste_type.as_str()).or_default();
            entry.0 += v.pickups;
            entry.1 += v.weight_kg;
        }
        let total_pickups: u64 = by_type.values().map(|(p, _)| p).sum();
        let total_kg: f64 = by_type.values().map(|(_, kg)| kg).sum();

        let mut totals = Table::new(["Waste type", "Pickups", "Weight (kg)", "Share %"]);
        for (waste_type, (pickups, kg)) in &by_type {
            let share = if total_kg > 0.0 { kg / total_kg * 100.0 } else { 0.0 };
            totals.row(vec![
                Cell::from(*waste_type),
                Cell::from(*pickups),
                Cell::from(*kg),
                Cell::from(share),
            ]);
        }
        let mut summary = Section::new("Totals by waste type")
            .paragraph(format!("Pickups: {total_pickups}"))
            .paragraph(format!("Weight collected: {total_kg:.1} kg"))
            .table(totals);

        if ctx.job.include_charts {
            let chart = by_type
                .iter()
                .fold(Chart::new("Weight by waste type (kg)"), |chart, (t, (_, kg))| {
                    chart.bar(*t, *kg)
                });
            summary = summary.chart(chart);
        }

        let mut daily = Table::new(["Date", "Municipality", "Waste type", "Pickups", "Weight (kg)"]);
        for v in &volumes {
            daily.row(vec![
                Cell::from(v.date.to_string()),
                Cell::from(v.municipality_id.as_str()),
                Cell::from(v.waste_type.as_str()),
                Cell::from(v.pickups),
                Cell::from(v.weight_kg),
            ]);
        }

        Ok(vec![summary, Section::new("Daily volumes").table(daily)])
    }
}
