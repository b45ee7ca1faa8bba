//! Collector performance: service-request throughput and turnaround.

use async_trait::async_trait;

use super::render::{Cell, Chart, Section, Table};
use super::{BuildContext, ContentBuilder};
use crate::error::Result;

pub struct PerformanceBuilder;

#[async_trait]
impl ContentBuilder for PerformanceBuilder {
    fn name(&self) -> &'static str {
        "performance"
    }

    async fn build(&self, ctx: &BuildContext<'_>) -> Result<Vec<Section>> {
        let stats = ctx.source.collector_performance(&ctx.scope).await?;

        let assigned: u64 = stats.iter().map(|s| s.assigned).sum();
        let completed: u64 = stats.iter().map(|s| s.completed).sum();
        let pending: u64 = stats.iter().map(|s| s.pending).sum();
        // Weighted by completed requests, not a mean of means.
        let total_hours: f64 = stats
            .iter()
            .filter_map(|s| s.avg_completion_hours.map(|h| h * s.completed as f64))
            .sum();

        let mut summary = Section::new("Summary")
            .paragraph(format!("Collectors: {}", stats.len()))
            .paragraph(format!("Requests assigned: {assigned}"))
            .paragraph(format!("Requests completed: {completed}"))
            .paragraph(format!("Requests pending: {pending}"));
        if assigned > 0 {
            summary = summary.paragraph(format!(
                "Completion rate: {:.1}%",
                completed as f64 / assigned as f64 * 100.0
            ));
        }
        if completed > 0 {
            summary = summary.paragraph(format!(
                "Average completion time: {:.1} h",
                total_hours / completed as f64
            ));
        }

        let mut table = Table::new([
            "Collector",
            "Assigned",
            "Completed",
            "Pending",
            "Completion %",
            "Avg hours",
        ]);
        for s in &stats {
            table.row(vec![
                Cell::from(s.collector_name.as_str()),
                Cell::from(s.assigned),
                Cell::from(s.completed),
                Cell::from(s.pending),
                Cell::from(s.completion_rate() * 100.0),
                s.avg_completion_hours
                    .map(Cell::from)
                    .unwrap_or_else(|| Cell::from("-")),
            ]);
        }
        let mut detail = Section::new("Collector performance").table(table);

        if ctx.job.include_charts {
            let chart = stats.iter().fold(Chart::new("Completion rate (%)"), |chart, s| {
                chart.bar(s.collector_name.clone(), s.completion_rate() * 100.0)
            });
            detail = detail.chart(chart);
        }

        Ok(vec![summary, detail])
    }
}
