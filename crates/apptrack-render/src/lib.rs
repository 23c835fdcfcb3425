//! # apptrack-render
//!
//! Rendering backends and report assembly for apptrack.
//!
//! This crate provides:
//! - Excel hits report (the artifact that is mailed out)
//! - Plain-text table (for previews on a terminal)
//! - `ReportAssembler`: counts, layout, render and save in one call
//!
//! ## Example
//!
//! ```rust,ignore
//! use apptrack_core::Renderer;
//! use apptrack_render::{ExcelRenderer, TextRenderer};
//!
//! let xlsx_bytes = ExcelRenderer::new().render(&report)?;
//! std::fs::write("hits.xlsx", xlsx_bytes)?;
//!
//! println!("{}", TextRenderer::new().render(&report)?);
//! ```

pub mod assembler;
pub mod excel;

pub use assembler::{report_file_name, BuildStage, ReportAssembler, ReportSettings};
pub use excel::{ExcelRenderer, ReportSheet};

use apptrack_core::{Column, Renderer, Report, ReportError};
use std::fmt::Write;

/// Plain-text table renderer
#[derive(Clone, Debug)]
pub struct TextRenderer {
    /// Show the grand total under the table
    pub show_total: bool,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self { show_total: true }
    }
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Omit the grand total line
    pub fn no_total(mut self) -> Self {
        self.show_total = false;
        self
    }

    fn columns() -> [(Column, usize); 7] {
        [
            (Column::Serial, 3),
            (Column::Events, 22),
            (Column::TotalHits, 6),
            (Column::SuccessLabel, 26),
            (Column::SuccessCount, 6),
            (Column::ExceptionReported, 9),
            (Column::Failure, 7),
        ]
    }
}

impl Renderer for TextRenderer {
    type Output = String;

    fn render(&self, report: &Report) -> Result<String, ReportError> {
        let fmt_err = |e: std::fmt::Error| ReportError::Format(e.to_string());
        let mut out = String::new();
        writeln!(out, "Appointment API hits for {}", report.report_date.format("%d-%m-%Y")).map_err(fmt_err)?;

        let header: Vec<String> = Self::columns()
            .iter()
            .map(|(column, width)| {
                let caption = match column {
                    Column::TotalHits => "Total",
                    Column::SuccessCount => "Count",
                    Column::ExceptionReported => "Exception",
                    other => other.header(),
                };
                format!("{caption:<width$}")
            })
            .collect();
        writeln!(out, "{}", header.join(" | ").trim_end()).map_err(fmt_err)?;
        let rule_width: usize = Self::columns().iter().map(|(_, w)| w + 3).sum::<usize>() - 3;
        writeln!(out, "{}", "-".repeat(rule_width)).map_err(fmt_err)?;

        for row in report.rows() {
            let cells: Vec<String> = Self::columns()
                .iter()
                .map(|(column, width)| format!("{:<width$}", row.value(*column).to_string()))
                .collect();
            writeln!(out, "{}", cells.join(" | ").trim_end()).map_err(fmt_err)?;
        }

        if self.show_total {
            writeln!(out, "{}", "-".repeat(rule_width)).map_err(fmt_err)?;
            writeln!(out, "Total hits: {}", report.grand_total()).map_err(fmt_err)?;
        }
        Ok(out)
    }
}
