//! # apptrack-core
//!
//! Core domain model and traits for the apptrack daily hits report.
//!
//! This crate provides:
//! - Domain types: `ReportCursor`, `ReportRow`, `SectionBlock`, `Report`
//! - The fixed section catalogue (`catalogue::CATALOGUE`)
//! - The layout fold that turns per-section counts into rows and merge regions
//! - Core traits: `CountSource`, `Renderer`
//! - Error types
//!
//! The model is independent of any spreadsheet library: rows and merge
//! regions are plain data, rendered to XLSX by `apptrack-render`.
//!
//! ## Example
//!
//! ```rust
//! use apptrack_core::{catalogue::CATALOGUE, layout::layout_report, ReportCursor};
//! use chrono::NaiveDate;
//!
//! let counts: Vec<Vec<i64>> = CATALOGUE
//!     .iter()
//!     .map(|section| vec![1; section.sub_items.len()])
//!     .collect();
//! let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
//! let report = layout_report(CATALOGUE, &counts, date);
//!
//! assert_eq!(report.sections.len(), 9);
//! assert_eq!(report.cursor.serial_number, 10);
//! assert_eq!(report.last_row(), ReportCursor::START.current_row + 20);
//! ```

pub mod catalogue;
pub mod layout;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Sheet geometry
// ============================================================================

/// Row holding the column headers (1-based, like the spreadsheet)
pub const HEADER_ROW: u32 = 1;

/// Non-breaking space used to pad labels in the padded layout
pub const NBSP: char = '\u{00A0}';

/// Logical report column.
///
/// Column positions depend on the [`LayoutVariant`]; the model only refers to
/// columns by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Serial,
    Events,
    TotalHits,
    SuccessLabel,
    SuccessCount,
    ExceptionReported,
    Failure,
    WrongHits,
    WrongHitDetails,
    Remarks,
}

impl Column {
    /// Header caption
    pub fn header(self) -> &'static str {
        match self {
            Column::Serial => "S#",
            Column::Events => "Events",
            Column::TotalHits => "Total No. of Hits",
            Column::SuccessLabel | Column::SuccessCount => "Success",
            Column::ExceptionReported => "Exception Reported",
            Column::Failure => "Failure",
            Column::WrongHits => "Wrong Hits",
            Column::WrongHitDetails => "Details of Wrong Hits",
            Column::Remarks => "Remarks",
        }
    }
}

/// Spreadsheet layout revision
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutVariant {
    /// Single Success column; label and count joined with NBSP padding
    Padded,
    /// Success split into a label column and a count column
    #[default]
    Split,
}

impl LayoutVariant {
    const PADDED_COLUMNS: [Column; 9] = [
        Column::Serial,
        Column::Events,
        Column::TotalHits,
        Column::SuccessLabel,
        Column::ExceptionReported,
        Column::Failure,
        Column::WrongHits,
        Column::WrongHitDetails,
        Column::Remarks,
    ];

    const SPLIT_COLUMNS: [Column; 10] = [
        Column::Serial,
        Column::Events,
        Column::TotalHits,
        Column::SuccessLabel,
        Column::SuccessCount,
        Column::ExceptionReported,
        Column::Failure,
        Column::WrongHits,
        Column::WrongHitDetails,
        Column::Remarks,
    ];

    /// Columns in sheet order
    pub fn columns(self) -> &'static [Column] {
        match self {
            LayoutVariant::Padded => &Self::PADDED_COLUMNS,
            LayoutVariant::Split => &Self::SPLIT_COLUMNS,
        }
    }

    /// 1-based sheet column of a logical column, if the layout has it
    pub fn column_index(self, column: Column) -> Option<u16> {
        self.columns()
            .iter()
            .position(|c| *c == column)
            .map(|i| i as u16 + 1)
    }

    pub fn column_count(self) -> u16 {
        self.columns().len() as u16
    }

    /// Fixed column width (auto-fit is never used)
    pub fn column_width(self, column: Column) -> f64 {
        match (self, column) {
            (_, Column::Serial) => 5.0,
            (_, Column::Events) => 20.0,
            (_, Column::TotalHits) => 15.0,
            (LayoutVariant::Padded, Column::SuccessLabel) => 45.0,
            (LayoutVariant::Split, Column::SuccessLabel) => 35.0,
            (_, Column::SuccessCount) => 10.0,
            (_, Column::ExceptionReported) => 20.0,
            (_, Column::Failure | Column::WrongHits) => 10.0,
            (_, Column::WrongHitDetails) => 25.0,
            (_, Column::Remarks) => 60.0,
        }
    }
}

// ============================================================================
// Cells
// ============================================================================

/// Typed cell content
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Count(i64),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn as_count(&self) -> Option<i64> {
        match self {
            CellValue::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Count(n) => write!(f, "{n}"),
        }
    }
}

/// Success cell of one row: an optional sub-item label and its count
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuccessCell {
    /// `None` for single-count sections
    pub label: Option<String>,
    pub count: i64,
    /// Target width of `label + padding` in the padded layout
    pub pad_width: usize,
}

impl SuccessCell {
    /// Label and count joined in one text cell, padded with NBSP so that the
    /// counts line up under right alignment.
    pub fn padded(&self) -> CellValue {
        match &self.label {
            None => CellValue::Count(self.count),
            Some(label) => {
                let len = label.chars().count();
                let padding: String = std::iter::repeat(NBSP)
                    .take(self.pad_width.saturating_sub(len))
                    .collect();
                CellValue::Text(format!("{label}{padding}{}", self.count))
            }
        }
    }
}

/// Background fill used on the Events column, alternating per section
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionFill {
    Cream,
    Blue,
}

impl SectionFill {
    /// Odd serials get cream, even serials blue
    pub fn for_serial(serial: u32) -> Self {
        if serial % 2 == 1 {
            SectionFill::Cream
        } else {
            SectionFill::Blue
        }
    }

    /// RGB value as `0xRRGGBB`
    pub fn rgb(self) -> u32 {
        match self {
            SectionFill::Cream => 0xFFF1CB,
            SectionFill::Blue => 0xC2E2FA,
        }
    }
}

// ============================================================================
// Rows, sections, report
// ============================================================================

/// Position threaded through the section builders
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportCursor {
    /// Next row to write (1-based, always past the header)
    pub current_row: u32,
    /// Serial number of the next top-level section
    pub serial_number: u32,
}

impl ReportCursor {
    pub const START: ReportCursor = ReportCursor {
        current_row: HEADER_ROW + 1,
        serial_number: 1,
    };

    /// Cursor after a section that wrote `rows` rows
    pub fn advance(self, rows: u32) -> Self {
        Self {
            current_row: self.current_row + rows,
            serial_number: self.serial_number + 1,
        }
    }
}

impl Default for ReportCursor {
    fn default() -> Self {
        Self::START
    }
}

/// One rendered row of the report
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportRow {
    /// 1-based sheet row
    pub row: u32,
    pub serial: CellValue,
    pub event: CellValue,
    pub total_hits: CellValue,
    pub success: SuccessCell,
    pub exception: CellValue,
    pub failure: CellValue,
    pub wrong_hits: CellValue,
    pub wrong_hit_details: CellValue,
    pub remarks: CellValue,
}

impl ReportRow {
    /// Value of a logical column, as the split layout shows it
    pub fn value(&self, column: Column) -> CellValue {
        match column {
            Column::Serial => self.serial.clone(),
            Column::Events => self.event.clone(),
            Column::TotalHits => self.total_hits.clone(),
            Column::SuccessLabel => self
                .success
                .label
                .clone()
                .map_or(CellValue::Empty, CellValue::Text),
            Column::SuccessCount => CellValue::Count(self.success.count),
            Column::ExceptionReported => self.exception.clone(),
            Column::Failure => self.failure.clone(),
            Column::WrongHits => self.wrong_hits.clone(),
            Column::WrongHitDetails => self.wrong_hit_details.clone(),
            Column::Remarks => self.remarks.clone(),
        }
    }
}

/// Vertical merge of one column across consecutive rows
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeRegion {
    pub column: Column,
    pub first_row: u32,
    pub last_row: u32,
}

impl MergeRegion {
    pub fn contains(&self, row: u32, column: Column) -> bool {
        self.column == column && (self.first_row..=self.last_row).contains(&row)
    }
}

/// One top-level report section after layout
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionBlock {
    pub serial: u32,
    pub name: String,
    pub fill: SectionFill,
    /// Sum of the sub-item counts
    pub total_hits: i64,
    pub rows: Vec<ReportRow>,
    pub merges: Vec<MergeRegion>,
}

impl SectionBlock {
    pub fn first_row(&self) -> u32 {
        self.rows.first().map_or(0, |r| r.row)
    }

    pub fn last_row(&self) -> u32 {
        self.rows.last().map_or(0, |r| r.row)
    }

    pub fn row_count(&self) -> u32 {
        self.rows.len() as u32
    }
}

/// The whole report, ready to render
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// Day the counts describe (yesterday at build time)
    pub report_date: NaiveDate,
    pub sections: Vec<SectionBlock>,
    /// Cursor after the last section
    pub cursor: ReportCursor,
}

impl Report {
    pub fn rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.sections.iter().flat_map(|s| s.rows.iter())
    }

    pub fn row(&self, row: u32) -> Option<&ReportRow> {
        self.rows().find(|r| r.row == row)
    }

    pub fn merges(&self) -> impl Iterator<Item = &MergeRegion> {
        self.sections.iter().flat_map(|s| s.merges.iter())
    }

    pub fn section(&self, name: &str) -> Option<&SectionBlock> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Last data row, or the header row for an empty report
    pub fn last_row(&self) -> u32 {
        self.cursor.current_row - 1
    }

    /// Cell value at a 1-based row
    pub fn value(&self, row: u32, column: Column) -> Option<CellValue> {
        self.row(row).map(|r| r.value(column))
    }

    /// Sum of every section's total hits
    pub fn grand_total(&self) -> i64 {
        self.sections.iter().map(|s| s.total_hits).sum()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Provider of scalar event counts, keyed by method name
#[async_trait]
pub trait CountSource: Send + Sync {
    /// Count for one method key; a missing or NULL result is `0`
    async fn count(&self, method: &str) -> Result<i64, QueryError>;
}

/// Output rendering
pub trait Renderer {
    type Output;

    /// Render a laid-out report to the output format
    fn render(&self, report: &Report) -> Result<Self::Output, ReportError>;
}

/// In-memory count source for dry runs and tests.
///
/// Unknown method keys count as `0`.
#[derive(Clone, Debug, Default)]
pub struct FixedCounts {
    counts: HashMap<String, i64>,
}

impl FixedCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, method: impl Into<String>, count: i64) -> Self {
        self.counts.insert(method.into(), count);
        self
    }
}

#[async_trait]
impl CountSource for FixedCounts {
    async fn count(&self, method: &str) -> Result<i64, QueryError> {
        Ok(self.counts.get(method).copied().unwrap_or(0))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Count query error
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Count query for '{method}' failed: {message}")]
    Execution { method: String, message: String },
}

/// Report build error
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_advances_rows_and_one_serial() {
        let cursor = ReportCursor::START.advance(4);
        assert_eq!(cursor.current_row, 6);
        assert_eq!(cursor.serial_number, 2);
    }

    #[test]
    fn padded_success_uses_nbsp_to_target_width() {
        let cell = SuccessCell {
            label: Some("Invalid Inputs".into()),
            count: 7,
            pad_width: 50,
        };
        let CellValue::Text(text) = cell.padded() else {
            panic!("expected text");
        };
        assert!(text.starts_with("Invalid Inputs"));
        assert!(text.ends_with('7'));
        assert_eq!(text.chars().filter(|c| *c == NBSP).count(), 50 - 14);
    }

    #[test]
    fn padded_success_never_underflows() {
        let cell = SuccessCell {
            label: Some("A label longer than its width".into()),
            count: 3,
            pad_width: 4,
        };
        assert_eq!(
            cell.padded(),
            CellValue::text("A label longer than its width3")
        );
    }

    #[test]
    fn single_count_success_is_numeric() {
        let cell = SuccessCell {
            label: None,
            count: 42,
            pad_width: 0,
        };
        assert_eq!(cell.padded(), CellValue::Count(42));
    }

    #[test]
    fn layout_columns() {
        assert_eq!(LayoutVariant::Padded.column_count(), 9);
        assert_eq!(LayoutVariant::Split.column_count(), 10);
        assert_eq!(LayoutVariant::Padded.column_index(Column::SuccessCount), None);
        assert_eq!(LayoutVariant::Padded.column_index(Column::Remarks), Some(9));
        assert_eq!(LayoutVariant::Split.column_index(Column::ExceptionReported), Some(6));
        assert_eq!(LayoutVariant::Split.column_index(Column::Events), Some(2));
    }

    #[test]
    fn fills_alternate_by_serial() {
        assert_eq!(SectionFill::for_serial(1), SectionFill::Cream);
        assert_eq!(SectionFill::for_serial(2), SectionFill::Blue);
        assert_eq!(SectionFill::Cream.rgb(), 0xFFF1CB);
    }

    #[test]
    fn cell_value_display() {
        assert_eq!(CellValue::Count(5).to_string(), "5");
        assert_eq!(CellValue::text("No").to_string(), "No");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[tokio::test]
    async fn fixed_counts_default_to_zero() {
        let source = FixedCounts::new().with("AuthorizeAgent", 42);
        assert_eq!(source.count("AuthorizeAgent").await.unwrap(), 42);
        assert_eq!(source.count("LabResult").await.unwrap(), 0);
    }
}
