//! Content builders, encoders and size formatting.

use async_trait::async_trait;
use chrono::NaiveDate;
use reportq::builder::render::{Cell, PAGE_LINES, encode, pdf_pages};
use reportq::builder::{
    BuildContext, BuilderRegistry, Chart, ContentBuilder, Document, Section, Table,
    format_file_size,
};
use reportq::model::job::*;
use reportq::source::StaticDataSource;
use std::io::{Cursor, Read};
use std::sync::Arc;

const DATASET: &str = r#"
[[municipalities]]
id = "mun-1"
name = "Riverside"

[[collectors]]
id = "col-1"
name = "Ana"
municipality_id = "mun-1"

[[collectors]]
id = "col-2"
name = "Ben"
municipality_id = "mun-1"

[[requests]]
collector_id = "col-1"
municipality_id = "mun-1"
status = "completed"
requested_at = "2026-01-05T08:00:00"
completed_at = "2026-01-05T10:00:00"

[[requests]]
collector_id = "col-2"
municipality_id = "mun-1"
status = "in_progress"
requested_at = "2026-01-06T08:00:00"

[[pickups]]
date = "2026-01-05"
municipality_id = "mun-1"
collector_id = "col-1"
waste_type = "organic"
weight_kg = 100.0

[[pickups]]
date = "2026-01-06"
municipality_id = "mun-1"
collector_id = "col-2"
waste_type = "plastic"
weight_kg = 50.0
"#;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn job(report_type: &str, format: &str, charts: bool) -> ReportJob {
    let config = ReportRequest::new("Riverside January", report_type, "monthly", format)
        .include_charts(charts)
        .municipality("mun-1")
        .date_range(Some(date(2026, 1, 1)), Some(date(2026, 1, 31)))
        .validate()
        .unwrap();
    ReportJob::pending(config, "analyst")
}

fn source() -> StaticDataSource {
    StaticDataSource::from_toml_str(DATASET).unwrap()
}

fn zip_entries(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

fn zip_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

// ---------------------------------------------------------------------------
// Size formatting
// ---------------------------------------------------------------------------

#[test]
fn file_sizes_are_human_readable() {
    assert_eq!(format_file_size(0), "0 B");
    assert_eq!(format_file_size(500), "500 B");
    assert_eq!(format_file_size(1024), "1.0 KB");
    assert_eq!(format_file_size(2048), "2.0 KB");
    assert_eq!(format_file_size(1536), "1.5 KB");
    assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn standard_registry_maps_known_types() {
    let registry = BuilderRegistry::standard();
    assert_eq!(registry.builder_for(ReportType::Performance).name(), "performance");
    assert_eq!(registry.builder_for(ReportType::Collections).name(), "collections");
    assert_eq!(registry.builder_for(ReportType::Predictive).name(), "predictive");
    assert_eq!(registry.builder_for(ReportType::Other).name(), "generic");
}

#[test]
fn empty_registry_falls_back_to_generic() {
    let registry = BuilderRegistry::empty();
    assert_eq!(registry.builder_for(ReportType::Performance).name(), "generic");
}

struct Notes;

#[async_trait]
impl ContentBuilder for Notes {
    fn name(&self) -> &'static str {
        "notes"
    }

    async fn build(&self, ctx: &BuildContext<'_>) -> reportq::error::Result<Vec<Section>> {
        Ok(vec![
            Section::new("Notes").paragraph(format!("Window {}", ctx.scope.window)),
        ])
    }
}

#[tokio::test]
async fn custom_strategy_can_be_registered() {
    let mut registry = BuilderRegistry::standard();
    registry.register(ReportType::Other, Arc::new(Notes));
    assert_eq!(registry.builder_for(ReportType::Other).name(), "notes");

    let text = document_text(&registry, &job("other", "pdf", false), &source()).await;
    assert!(text.contains("Window 2026-01-01 to 2026-01-31"));
}

// ---------------------------------------------------------------------------
// Document content
// ---------------------------------------------------------------------------

async fn document_text(
    registry: &BuilderRegistry,
    job: &ReportJob,
    source: &StaticDataSource,
) -> String {
    let document = registry
        .compose(job, source, date(2026, 2, 1))
        .await
        .unwrap();
    let mut text = document.title.clone();
    for line in document.text_lines() {
        text.push('\n');
        text.push_str(&line);
    }
    text
}

#[tokio::test]
async fn performance_report_has_header_and_collectors() {
    let text = document_text(
        &BuilderRegistry::standard(),
        &job("performance", "pdf", true),
        &source(),
    )
    .await;

    assert!(text.starts_with("Riverside January"));
    assert!(text.contains("Municipality: Riverside"));
    assert!(text.contains("Requested by: analyst"));
    assert!(text.contains("Ana"));
    assert!(text.contains("Ben"));
    assert!(text.contains("Completion rate: 50.0%"));
    assert!(text.contains("Chart: Completion rate"));
}

#[tokio::test]
async fn charts_are_omitted_when_not_requested() {
    let text = document_text(
        &BuilderRegistry::standard(),
        &job("performance", "pdf", false),
        &source(),
    )
    .await;
    assert!(!text.contains("Chart:"));
}

#[tokio::test]
async fn predictive_report_renders_with_no_history() {
    let text = document_text(
        &BuilderRegistry::standard(),
        &job("predictive", "pdf", true),
        &StaticDataSource::empty(),
    )
    .await;
    assert!(text.contains("FORECAST"));
    assert!(text.contains("Collected in history: 0.0 kg"));
}

// ---------------------------------------------------------------------------
// Encodings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn performance_pdf_is_a_pdf() {
    let bytes = BuilderRegistry::standard()
        .render(&job("performance", "pdf", true), &source())
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn collections_excel_is_a_workbook() {
    let bytes = BuilderRegistry::standard()
        .render(&job("collections", "excel", true), &source())
        .await
        .unwrap();
    assert!(bytes.starts_with(b"PK"));

    let entries = zip_entries(&bytes);
    assert!(entries.contains(&"[Content_Types].xml".to_string()));
    assert!(entries.contains(&"xl/workbook.xml".to_string()));
    assert!(entries.contains(&"xl/worksheets/sheet1.xml".to_string()));
    assert!(entries.contains(&"xl/worksheets/sheet2.xml".to_string()));

    let workbook = zip_entry(&bytes, "xl/workbook.xml");
    assert!(workbook.contains(r#"name="Summary""#));
    assert!(workbook.contains("Totals by waste type"));
}

#[tokio::test]
async fn both_format_bundles_pdf_and_workbook() {
    let bytes = BuilderRegistry::standard()
        .render(&job("predictive", "both", true), &source())
        .await
        .unwrap();
    assert_eq!(zip_entries(&bytes), vec!["report.pdf", "report.xlsx"]);
}

#[test]
fn long_documents_span_several_pages() {
    let mut table = Table::new(["Row"]);
    for i in 0..200u64 {
        table.row(vec![Cell::from(i)]);
    }
    let mut document = Document::new("Long");
    document.sections.push(Section::new("Rows").table(table));

    // Blank line, heading, column header and rule precede the 200 rows.
    let pages = pdf_pages(&document);
    assert_eq!(pages.len(), 4);
    assert!(pages.iter().all(|p| p.len() <= PAGE_LINES));
    assert_eq!(pages[3].last().map(String::as_str), Some("199"));

    let bytes = encode(&document, ReportFormat::Pdf).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn empty_document_still_has_one_page() {
    let document = Document::new("Nothing");
    assert_eq!(pdf_pages(&document).len(), 1);
    assert!(encode(&document, ReportFormat::Pdf).unwrap().starts_with(b"%PDF-"));
}

#[test]
fn non_ascii_text_encodes() {
    let mut document = Document::new("Gestão de Resíduos (net) \\ gross");
    document.meta("Município", "São Paulo");
    assert!(encode(&document, ReportFormat::Pdf).unwrap().starts_with(b"%PDF-"));
    assert!(encode(&document, ReportFormat::Excel).unwrap().starts_with(b"PK"));
}

#[test]
fn workbook_keeps_markup_as_text() {
    let mut document = Document::new("A & B <test>");
    document.sections.push(
        Section::new("Chart only: [load]").chart(Chart::new("Load").bar("x<y", 1.0)),
    );
    let bytes = encode(&document, ReportFormat::Excel).unwrap();

    let strings = zip_entry(&bytes, "xl/sharedStrings.xml");
    assert!(strings.contains("A &amp; B &lt;test"));
    let workbook = zip_entry(&bytes, "xl/workbook.xml");
    assert!(workbook.contains(r#"name="2 Chart only load""#));
}
