//! Excel hits report renderer
//!
//! Writes the report model into a single-sheet XLSX workbook:
//!
//! ```text
//! Sheet: Appointment Tracking (split layout)
//! | S# | Events               | Total No. of Hits | Success                | Exception | Failure | Wrong | Details | Remarks |
//! |----|----------------------|-------------------|------------------------|-----------|---------|-------|---------|---------|
//! | 1  | Authorize Agent      | 42                |                   | 42 | No        | 0       |       |         |         |
//! | 2  | Patient Verification | 16                | Exact Patient Match| 10 | No        | 0       | 0     |         |         |
//! |    |   (merged)           |   (merged)        | Multiple Patients  | 2  |  (merged) |(merged) |       |         |         |
//! ```
//!
//! ## Styling
//!
//! - Header row: bold, black on light green, centered both ways
//! - Events column: section fill alternating cream/blue per serial number
//! - Events and Total Hits: centered both ways; Exception and Failure centered
//! - Thick border around the whole data range, thin borders between cells
//! - Fixed column widths, no auto-fit
//!
//! Formats in `rust_xlsxwriter` are attached per write, so each cell's
//! format is composed from its position (borders), column (alignment) and
//! section (fill) at the time it is written.

use apptrack_core::{
    CellValue, Column, LayoutVariant, MergeRegion, Renderer, Report, ReportError, ReportRow,
    SectionFill, HEADER_ROW,
};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, FormatPattern, Workbook, Worksheet, XlsxError};

/// Default sheet name
pub const SHEET_NAME: &str = "Appointment Tracking";

const HEADER_FILL: u32 = 0xABE7B2;
const FONT_BLACK: u32 = 0x000000;

fn format_err(e: XlsxError) -> ReportError {
    ReportError::Format(e.to_string())
}

/// Excel hits report renderer
#[derive(Clone, Debug)]
pub struct ExcelRenderer {
    /// Column layout revision
    pub variant: LayoutVariant,
    /// Worksheet name
    pub sheet_name: String,
}

impl Default for ExcelRenderer {
    fn default() -> Self {
        Self {
            variant: LayoutVariant::default(),
            sheet_name: SHEET_NAME.into(),
        }
    }
}

impl ExcelRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the column layout revision
    pub fn layout(mut self, variant: LayoutVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Set the worksheet name
    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    /// Create the sheet and write the header row
    pub fn begin(&self) -> Result<ReportSheet, ReportError> {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(&self.sheet_name).map_err(format_err)?;
        let mut sheet = ReportSheet {
            worksheet,
            variant: self.variant,
        };
        sheet.write_header()?;
        Ok(sheet)
    }

    /// Generate workbook bytes in one go
    pub fn render_to_bytes(&self, report: &Report) -> Result<Vec<u8>, ReportError> {
        let mut sheet = self.begin()?;
        sheet.write_sections(report)?;
        sheet.apply_column_widths()?;
        sheet.into_bytes()
    }
}

impl Renderer for ExcelRenderer {
    type Output = Vec<u8>;

    fn render(&self, report: &Report) -> Result<Vec<u8>, ReportError> {
        if report.sections.is_empty() {
            return Err(ReportError::Format("No sections to render".into()));
        }
        self.render_to_bytes(report)
    }
}

/// A worksheet being filled in, stage by stage
pub struct ReportSheet {
    worksheet: Worksheet,
    variant: LayoutVariant,
}

impl ReportSheet {
    /// 0-based sheet column for a logical column
    fn col(&self, column: Column) -> Option<u16> {
        self.variant.column_index(column).map(|c| c - 1)
    }

    fn last_col(&self) -> u16 {
        self.variant.column_count() - 1
    }

    /// Border edges for a cell range: thick on the outline, thin inside
    fn bordered(&self, format: Format, first_row: u32, last_row: u32, col: u16, data_last_row: u32) -> Format {
        let edge = |outer: bool| if outer { FormatBorder::Thick } else { FormatBorder::Thin };
        format
            .set_border_top(edge(first_row == 0))
            .set_border_bottom(edge(last_row == data_last_row))
            .set_border_left(edge(col == 0))
            .set_border_right(edge(col == self.last_col()))
    }

    fn header_format(&self, col: u16) -> Format {
        let format = Format::new()
            .set_bold()
            .set_font_color(FONT_BLACK)
            .set_pattern(FormatPattern::Solid)
            .set_background_color(HEADER_FILL)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        // Bottom edge stays thin; the data rows close the outline.
        self.bordered(format, 0, 0, col, u32::MAX)
    }

    fn body_format(&self, row: &ReportRow, column: Column, fill: SectionFill, last_row: u32, data_last_row: u32) -> Format {
        let mut format = Format::new();
        match column {
            Column::Events => {
                format = format
                    .set_pattern(FormatPattern::Solid)
                    .set_background_color(fill.rgb())
                    .set_align(FormatAlign::Center)
                    .set_align(FormatAlign::VerticalCenter);
            }
            Column::TotalHits => {
                format = format
                    .set_align(FormatAlign::Center)
                    .set_align(FormatAlign::VerticalCenter);
            }
            Column::ExceptionReported | Column::Failure => {
                format = format.set_align(FormatAlign::Center);
            }
            Column::SuccessLabel
                if self.variant == LayoutVariant::Padded && row.success.label.is_some() =>
            {
                format = format.set_align(FormatAlign::Right);
            }
            _ => {}
        }
        let col = self.col(column).unwrap_or_default();
        let first_row = row.row - 1;
        self.bordered(format, first_row, last_row - 1, col, data_last_row - 1)
    }

    /// Value a layout shows for a logical column
    fn cell_value(&self, row: &ReportRow, column: Column) -> CellValue {
        match (self.variant, column) {
            (LayoutVariant::Padded, Column::SuccessLabel) => row.success.padded(),
            _ => row.value(column),
        }
    }

    fn write_value(&mut self, row: u32, col: u16, value: &CellValue, format: &Format) -> Result<(), ReportError> {
        match value {
            CellValue::Empty => self.worksheet.write_blank(row, col, format),
            CellValue::Text(text) => self.worksheet.write_string_with_format(row, col, text.as_str(), format),
            CellValue::Count(n) => self.worksheet.write_number_with_format(row, col, *n as f64, format),
        }
        .map_err(format_err)?;
        Ok(())
    }

    /// Header row; in the split layout "Success" spans both success columns
    fn write_header(&mut self) -> Result<(), ReportError> {
        let row = HEADER_ROW - 1;
        for &column in self.variant.columns() {
            let Some(col) = self.col(column) else { continue };
            let format = self.header_format(col);
            match column {
                Column::SuccessCount => continue,
                Column::SuccessLabel if self.variant == LayoutVariant::Split => {
                    let last = self.col(Column::SuccessCount).unwrap_or(col);
                    self.worksheet
                        .merge_range(row, col, row, last, column.header(), &format)
                        .map_err(format_err)?;
                }
                _ => {
                    self.worksheet
                        .write_string_with_format(row, col, column.header(), &format)
                        .map_err(format_err)?;
                }
            }
        }
        Ok(())
    }

    /// Write every section's rows and merge regions
    pub fn write_sections(&mut self, report: &Report) -> Result<(), ReportError> {
        let data_last_row = report.last_row();
        for section in &report.sections {
            for row in &section.rows {
                for &column in self.variant.columns() {
                    let Some(col) = self.col(column) else { continue };
                    let merge = section.merges.iter().find(|m| m.contains(row.row, column));
                    match merge {
                        Some(m) if m.first_row != row.row => {}
                        Some(m) => self.write_merge(row, m, section.fill, data_last_row)?,
                        None => {
                            let format = self.body_format(row, column, section.fill, row.row, data_last_row);
                            let value = self.cell_value(row, column);
                            self.write_value(row.row - 1, col, &value, &format)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn write_merge(&mut self, top: &ReportRow, merge: &MergeRegion, fill: SectionFill, data_last_row: u32) -> Result<(), ReportError> {
        let Some(col) = self.col(merge.column) else {
            return Ok(());
        };
        let format = self.body_format(top, merge.column, fill, merge.last_row, data_last_row);
        let (first, last) = (merge.first_row - 1, merge.last_row - 1);
        let value = self.cell_value(top, merge.column);
        let text = match &value {
            CellValue::Text(text) => text.as_str(),
            _ => "",
        };
        self.worksheet
            .merge_range(first, col, last, col, text, &format)
            .map_err(format_err)?;
        if let CellValue::Count(_) = value {
            // Non-string data goes into the merged range's top-left cell.
            self.write_value(first, col, &value, &format)?;
        }
        Ok(())
    }

    /// Fixed widths for every column
    pub fn apply_column_widths(&mut self) -> Result<(), ReportError> {
        for &column in self.variant.columns() {
            if let Some(col) = self.col(column) {
                self.worksheet
                    .set_column_width(col, self.variant.column_width(column))
                    .map_err(format_err)?;
            }
        }
        Ok(())
    }

    /// Finish the workbook and serialize it
    pub fn into_bytes(self) -> Result<Vec<u8>, ReportError> {
        let mut workbook = Workbook::new();
        workbook.push_worksheet(self.worksheet);
        workbook.save_to_buffer().map_err(format_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apptrack_core::catalogue::CATALOGUE;
    use apptrack_core::layout::layout_report;
    use chrono::NaiveDate;

    fn sample_report() -> Report {
        let counts: Vec<Vec<i64>> = CATALOGUE
            .iter()
            .enumerate()
            .map(|(i, s)| (0..s.sub_items.len()).map(|j| (i * 10 + j) as i64).collect())
            .collect();
        layout_report(CATALOGUE, &counts, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap())
    }

    #[test]
    fn excel_renderer_defaults() {
        let renderer = ExcelRenderer::new();
        assert_eq!(renderer.variant, LayoutVariant::Split);
        assert_eq!(renderer.sheet_name, "Appointment Tracking");
    }

    #[test]
    fn excel_renderer_with_options() {
        let renderer = ExcelRenderer::new()
            .layout(LayoutVariant::Padded)
            .sheet_name("Hits");
        assert_eq!(renderer.variant, LayoutVariant::Padded);
        assert_eq!(renderer.sheet_name, "Hits");
    }

    #[test]
    fn excel_produces_valid_output() {
        let bytes = ExcelRenderer::new().render(&sample_report()).unwrap();
        // XLSX files start with PK (ZIP header)
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[0..2], b"PK");
    }

    #[test]
    fn padded_layout_produces_valid_output() {
        let bytes = ExcelRenderer::new()
            .layout(LayoutVariant::Padded)
            .render(&sample_report())
            .unwrap();
        assert_eq!(&bytes[0..2], b"PK");
    }

    #[test]
    fn excel_empty_report_fails() {
        let report = Report {
            report_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            sections: vec![],
            cursor: apptrack_core::ReportCursor::START,
        };
        assert!(ExcelRenderer::new().render(&report).is_err());
    }

    #[test]
    fn invalid_sheet_name_is_a_format_error() {
        let renderer = ExcelRenderer::new().sheet_name("bad/name");
        assert!(matches!(renderer.begin(), Err(ReportError::Format(_))));
    }

    #[test]
    fn padded_success_cell_is_text_with_nbsp() {
        let report = sample_report();
        let sheet = ExcelRenderer::new().layout(LayoutVariant::Padded).begin().unwrap();
        let row = report.row(3).unwrap();
        let CellValue::Text(text) = sheet.cell_value(row, Column::SuccessLabel) else {
            panic!("padded success should be text");
        };
        assert!(text.starts_with("Exact Patient Match\u{a0}"));
        assert_eq!(text.chars().count(), 44 + 2);
    }
}
