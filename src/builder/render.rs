//! Format-agnostic report documents and their PDF / XLSX / zip encodings.
//!
//! Builders only produce a [`Document`]. The PDF is laid out with
//! `printpdf` using the built-in Helvetica fonts, the workbook is written by
//! `rust_xlsxwriter`, and `both` bundles the two in a zip.

use std::io::{Cursor, Write};

use printpdf::{BuiltinFont, Mm, PdfDocument};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use zip::ZipWriter;
use zip::write::FileOptions;

use crate::error::{Error, Result};
use crate::model::job::ReportFormat;

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub title: String,
    pub metadata: Vec<(String, String)>,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.push((key.into(), value.into()));
    }

    /// Flatten to printable lines for text encodings.
    pub fn text_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (key, value) in &self.metadata {
            lines.push(format!("{key}: {value}"));
        }
        for section in &self.sections {
            lines.push(String::new());
            lines.push(section.heading.to_uppercase());
            lines.extend(section.paragraphs.iter().cloned());
            if let Some(ref table) = section.table {
                lines.extend(table.text_lines());
            }
            if let Some(ref chart) = section.chart {
                lines.extend(chart.text_lines());
            }
        }
        lines
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub heading: String,
    pub paragraphs: Vec<String>,
    pub table: Option<Table>,
    pub chart: Option<Chart>,
}

impl Section {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            ..Self::default()
        }
    }

    pub fn paragraph(mut self, text: impl Into<String>) -> Self {
        self.paragraphs.push(text.into());
        self
    }

    pub fn table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    pub fn chart(mut self, chart: Chart) -> Self {
        self.chart = Some(chart);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 => format!("{n:.0}"),
            Cell::Number(n) => format!("{n:.2}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<u64> for Cell {
    fn from(n: u64) -> Self {
        Cell::Number(n as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<Cell>) {
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn text_lines(&self) -> Vec<String> {
        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| r.iter().map(Cell::display).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                rendered
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(String::len)
                    .chain(std::iter::once(c.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let pad = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, &w)| format!("{c:<w$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut lines = vec![pad(self.columns.as_slice())];
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("  "),
        );
        if rendered.is_empty() {
            lines.push("(no data)".to_string());
        }
        lines.extend(rendered.iter().map(|r| pad(r.as_slice())));
        lines
    }
}

/// A labelled bar chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chart {
    pub title: String,
    pub bars: Vec<(String, f64)>,
}

impl Chart {
    const WIDTH: f64 = 40.0;

    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            bars: Vec::new(),
        }
    }

    pub fn bar(mut self, label: impl Into<String>, value: f64) -> Self {
        self.bars.push((label.into(), value));
        self
    }

    fn text_lines(&self) -> Vec<String> {
        let max = self.bars.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
        let label_width = self.bars.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
        let mut lines = vec![format!("Chart: {}", self.title)];
        for (label, value) in &self.bars {
            let len = if max > 0.0 {
                ((value / max) * Self::WIDTH).round() as usize
            } else {
                0
            };
            lines.push(format!("{label:<label_width$} |{} {value:.1}", "#".repeat(len)));
        }
        lines
    }
}

// ---------------------------------------------------------------------------
// Encoders
// ---------------------------------------------------------------------------

/// Encode a document in the requested output format.
pub fn encode(document: &Document, format: ReportFormat) -> Result<Vec<u8>> {
    match format {
        ReportFormat::Pdf => to_pdf(document),
        ReportFormat::Excel => to_xlsx(document),
        ReportFormat::Both => {
            let pdf = to_pdf(document)?;
            let xlsx = to_xlsx(document)?;
            zip_parts(&[("report.pdf", pdf.as_slice()), ("report.xlsx", xlsx.as_slice())])
        }
    }
}

/// Body lines per PDF page, below the title block.
pub const PAGE_LINES: usize = 54;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN_MM: f32 = 18.0;
const LINE_MM: f32 = 4.6;

/// Split a document's text into PDF pages. There is always at least one.
pub fn pdf_pages(document: &Document) -> Vec<Vec<String>> {
    let lines = document.text_lines();
    let mut pages: Vec<Vec<String>> = lines.chunks(PAGE_LINES).map(<[String]>::to_vec).collect();
    if pages.is_empty() {
        pages.push(Vec::new());
    }
    pages
}

/// A4 text PDF set in the built-in Helvetica fonts.
pub fn to_pdf(document: &Document) -> Result<Vec<u8>> {
    let pdf_err = |e: printpdf::Error| Error::Generation(format!("pdf: {e}"));

    let pages = pdf_pages(document);
    let total = pages.len();
    let (doc, first_page, first_layer) =
        PdfDocument::new(pdf_text(&document.title), PAGE_WIDTH, PAGE_HEIGHT, "Body");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_err)?;

    for (i, lines) in pages.iter().enumerate() {
        let (page, layer) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Body")
        };
        let layer = doc.get_page(page).get_layer(layer);

        let mut y = PAGE_HEIGHT.0 - MARGIN_MM;
        if i == 0 {
            layer.use_text(pdf_text(&document.title), 16.0, Mm(MARGIN_MM), Mm(y), &bold);
            y -= LINE_MM * 3.0;
        }
        for line in lines {
            layer.use_text(pdf_text(line), 9.0, Mm(MARGIN_MM), Mm(y), &regular);
            y -= LINE_MM;
        }
        layer.use_text(
            format!("Page {} of {total}", i + 1),
            8.0,
            Mm(MARGIN_MM),
            Mm(MARGIN_MM / 2.0),
            &regular,
        );
    }

    doc.save_to_bytes().map_err(pdf_err)
}

/// The built-in fonts only cover ASCII.
fn pdf_text(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

/// Workbook with a summary sheet plus one sheet per section.
pub fn to_xlsx(document: &Document) -> Result<Vec<u8>> {
    let xlsx_err = |e: XlsxError| Error::Generation(format!("xlsx: {e}"));
    let heading = Format::new().set_bold();
    let mut workbook = Workbook::new();

    let summary = workbook.add_worksheet();
    summary.set_name("Summary").map_err(xlsx_err)?;
    summary
        .write_string_with_format(0, 0, &document.title, &heading)
        .map_err(xlsx_err)?;
    for (row, (key, value)) in (1u32..).zip(&document.metadata) {
        summary.write_string(row, 0, key).map_err(xlsx_err)?;
        summary.write_string(row, 1, value).map_err(xlsx_err)?;
    }

    for (i, section) in document.sections.iter().enumerate() {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(sheet_name(&section.heading, i + 2))
            .map_err(xlsx_err)?;
        write_section(sheet, section, &heading).map_err(xlsx_err)?;
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}

fn write_section(
    sheet: &mut Worksheet,
    section: &Section,
    heading: &Format,
) -> std::result::Result<(), XlsxError> {
    let mut row: u32 = 0;
    for paragraph in &section.paragraphs {
        sheet.write_string(row, 0, paragraph)?;
        row += 1;
    }

    if let Some(ref table) = section.table {
        if row > 0 {
            row += 1;
        }
        for (col, name) in (0u16..).zip(&table.columns) {
            sheet.write_string_with_format(row, col, name, heading)?;
        }
        row += 1;
        for cells in &table.rows {
            for (col, cell) in (0u16..).zip(cells) {
                match cell {
                    Cell::Number(n) if n.is_finite() => {
                        sheet.write_number(row, col, *n)?;
                    }
                    other => {
                        sheet.write_string(row, col, other.display())?;
                    }
                }
            }
            row += 1;
        }
    }

    if let Some(ref chart) = section.chart {
        row += 1;
        sheet.write_string_with_format(row, 0, &chart.title, heading)?;
        row += 1;
        for (label, value) in &chart.bars {
            sheet.write_string(row, 0, label)?;
            sheet.write_number(row, 1, *value)?;
            row += 1;
        }
    }
    Ok(())
}

/// Sheet names: max 31 chars, none of `[]:*?/\'`, unique by position.
fn sheet_name(heading: &str, position: usize) -> String {
    let cleaned: String = heading
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\' | '\''))
        .take(27)
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        format!("Sheet{position}")
    } else {
        format!("{position} {cleaned}")
    }
}

fn zip_parts(parts: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let zip_err = |e: zip::result::ZipError| Error::Generation(format!("zip: {e}"));

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, bytes) in parts {
        zip.start_file(*name, options).map_err(zip_err)?;
        zip.write_all(bytes)
            .map_err(|e| Error::Generation(format!("zip write {name}: {e}")))?;
    }
    Ok(zip.finish().map_err(zip_err)?.into_inner())
}
