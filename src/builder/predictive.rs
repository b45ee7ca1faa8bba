//! Volume forecast from recent history.
//!
//! Fits a least-squares line through daily collected weight over the report
//! window and projects it forward. Crude, but it is what the dashboards use.

use async_trait::async_trait;
use chrono::Duration;
use std::collections::BTreeMap;

use super::render::{Cell, Chart, Section, Table};
use super::{BuildContext, ContentBuilder};
use crate::error::Result;

pub struct PredictiveBuilder {
    /// Maximum number of days to project.
    pub max_horizon_days: i64,
}

impl Default for PredictiveBuilder {
    fn default() -> Self {
        Self {
            max_horizon_days: 14,
        }
    }
}

/// Slope and intercept of the least-squares line through `ys` at x = 0, 1, ...
fn linear_fit(ys: &[f64]) -> (f64, f64) {
    let n = ys.len() as f64;
    if ys.len() < 2 {
        return (0.0, ys.first().copied().unwrap_or(0.0));
    }
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (mut cov, mut var) = (0.0, 0.0);
    for (x, y) in ys.iter().enumerate() {
        let dx = x as f64 - mean_x;
        cov += dx * (y - mean_y);
        var += dx * dx;
    }
    let slope = cov / var;
    (slope, mean_y - slope * mean_x)
}

#[async_trait]
impl ContentBuilder for PredictiveBuilder {
    fn name(&self) -> &'static str {
        "predictive"
    }

    async fn build(&self, ctx: &BuildContext<'_>) -> Result<Vec<Section>> {
        let window = ctx.scope.window;
        let volumes = ctx.source.collection_volumes(&ctx.scope).await?;

        // Dense daily series: days without pickups count as zero.
        let mut daily: BTreeMap<_, f64> = window
            .start
            .iter_days()
            .take_while(|d| *d <= window.end)
            .map(|d| (d, 0.0))
            .collect();
        let mut by_type: BTreeMap<&str, f64> = BTreeMap::new();
        for v in &volumes {
            *daily.entry(v.date).or_default() += v.weight_kg;
            *by_type.entry(v.waste_type.as_str()).or_default() += v.weight_kg;
        }

        let series: Vec<f64> = daily.values().copied().collect();
        let (slope, intercept) = linear_fit(&series);
        let horizon = ctx.job.period.window_days().min(self.max_horizon_days);
        let history_kg: f64 = series.iter().sum();

        let basis = Section::new("Basis")
            .paragraph(format!("History: {window} ({} days)", series.len()))
            .paragraph(format!("Collected in history: {history_kg:.1} kg"))
            .paragraph(format!("Trend: {slope:+.2} kg/day"))
            .paragraph("Projection: least-squares linear trend, floored at zero.");

        let mut projection = Table::new(["Date", "Projected weight (kg)"]);
        let mut chart = Chart::new("Projected daily weight (kg)");
        let mut projected_total = 0.0;
        for step in 1..=horizon {
            let date = window.end + Duration::days(step);
            let x = (series.len() as i64 - 1 + step) as f64;
            let kg = (intercept + slope * x).max(0.0);
            projected_total += kg;
            projection.row(vec![Cell::from(date.to_string()), Cell::from(kg)]);
            chart = chart.bar(date.format("%m-%d").to_string(), kg);
        }
        let mut forecast = Section::new("Forecast")
            .paragraph(format!(
                "Projected over next {horizon} days: {projected_total:.1} kg"
            ))
            .table(projection);
        if ctx.job.include_charts {
            forecast = forecast.chart(chart);
        }

        // Split the projection by each waste type's historical share.
        let mut mix = Table::new(["Waste type", "Historical share %", "Projected (kg)"]);
        for (waste_type, kg) in &by_type {
            let share = if history_kg > 0.0 { kg / history_kg } else { 0.0 };
            mix.row(vec![
                Cell::from(*waste_type),
                Cell::from(share * 100.0),
                Cell::from(projected_total * share),
            ]);
        }

        Ok(vec![basis, forecast, Section::new("Projected mix").table(mix)])
    }
}
