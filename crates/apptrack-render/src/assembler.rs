//! Report Assembler
//!
//! Builds the day's spreadsheet end to end:
//!
//! 1. ensure the reports directory exists
//! 2. create the sheet and write the header (`HeaderWritten`)
//! 3. query every section and write its rows (`SectionsPopulated`)
//! 4. apply column widths (`Formatted`)
//! 5. write the file to a timestamped path (`Saved`)
//!
//! A failure at any stage is logged with the stage reached and returned.
//! Nothing is rolled back: a partial file may be left behind, and every run
//! writes a new file.

use crate::excel::ExcelRenderer;
use apptrack_core::catalogue::{SectionSpec, CATALOGUE};
use apptrack_core::layout::build_report;
use apptrack_core::{CountSource, LayoutVariant, ReportError};
use chrono::{Duration, Local, NaiveDateTime};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Default file name prefix
pub const FILE_PREFIX: &str = "FDA Agent API Hits Report";

/// `[report]` configuration
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Directory the spreadsheets are written to
    pub directory: PathBuf,
    /// File name prefix, followed by the timestamp
    pub file_prefix: String,
    /// Column layout revision
    pub layout: LayoutVariant,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("reports"),
            file_prefix: FILE_PREFIX.into(),
            layout: LayoutVariant::default(),
        }
    }
}

/// Progress of one report build
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildStage {
    NotStarted,
    HeaderWritten,
    SectionsPopulated,
    Formatted,
    Saved,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStage::NotStarted => "not started",
            BuildStage::HeaderWritten => "header written",
            BuildStage::SectionsPopulated => "sections populated",
            BuildStage::Formatted => "formatted",
            BuildStage::Saved => "saved",
        };
        f.write_str(name)
    }
}

/// File name for a report built at `now`; the stamp is one day back, the
/// day the counts describe.
pub fn report_file_name(prefix: &str, now: NaiveDateTime) -> String {
    let stamp = now - Duration::days(1);
    format!("{prefix} {}.xlsx", stamp.format("%d-%m-%Y %H-%M-%S"))
}

/// Orchestrates one report build
pub struct ReportAssembler {
    source: Arc<dyn CountSource>,
    settings: ReportSettings,
    catalogue: &'static [SectionSpec],
}

impl ReportAssembler {
    pub fn new(source: Arc<dyn CountSource>, settings: ReportSettings) -> Self {
        Self {
            source,
            settings,
            catalogue: CATALOGUE,
        }
    }

    /// Use a different section catalogue
    pub fn with_catalogue(mut self, catalogue: &'static [SectionSpec]) -> Self {
        self.catalogue = catalogue;
        self
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Build the report for yesterday and return the saved file's path
    pub async fn build_report(&self) -> Result<PathBuf, ReportError> {
        self.build_report_at(Local::now().naive_local()).await
    }

    /// Build the report as if run at `now`
    pub async fn build_report_at(&self, now: NaiveDateTime) -> Result<PathBuf, ReportError> {
        info!("Starting report generation");
        let mut stage = BuildStage::NotStarted;
        match self.run(now, &mut stage).await {
            Ok(path) => {
                info!("Report saved to: {}", path.display());
                Ok(path)
            }
            Err(e) => {
                error!(%stage, "Report generation failed: {e}");
                Err(e)
            }
        }
    }

    async fn run(&self, now: NaiveDateTime, stage: &mut BuildStage) -> Result<PathBuf, ReportError> {
        let directory: &Path = &self.settings.directory;
        std::fs::create_dir_all(directory)?;
        let path = directory.join(report_file_name(&self.settings.file_prefix, now));

        let renderer = ExcelRenderer::new().layout(self.settings.layout);
        let mut sheet = renderer.begin()?;
        advance(stage, BuildStage::HeaderWritten);

        let report_date = (now - Duration::days(1)).date();
        let report = build_report(self.source.as_ref(), self.catalogue, report_date).await?;
        sheet.write_sections(&report)?;
        info!("Total hit records: {}", report.grand_total());
        advance(stage, BuildStage::SectionsPopulated);

        sheet.apply_column_widths()?;
        advance(stage, BuildStage::Formatted);

        std::fs::write(&path, sheet.into_bytes()?)?;
        advance(stage, BuildStage::Saved);
        Ok(path)
    }
}

fn advance(stage: &mut BuildStage, next: BuildStage) {
    debug!(from = %stage, to = %next, "report build stage");
    *stage = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn file_name_is_stamped_one_day_back() {
        let name = report_file_name(FILE_PREFIX, at(2025, 3, 1, 6, 30, 5));
        assert_eq!(name, "FDA Agent API Hits Report 28-02-2025 06-30-05.xlsx");
    }

    #[test]
    fn file_name_uses_24_hour_clock() {
        let name = report_file_name("Hits", at(2025, 7, 10, 18, 0, 0));
        assert_eq!(name, "Hits 09-07-2025 18-00-00.xlsx");
    }

    #[test]
    fn settings_defaults() {
        let settings = ReportSettings::default();
        assert_eq!(settings.directory, PathBuf::from("reports"));
        assert_eq!(settings.file_prefix, FILE_PREFIX);
        assert_eq!(settings.layout, LayoutVariant::Split);
    }

    #[test]
    fn stage_names() {
        assert_eq!(BuildStage::SectionsPopulated.to_string(), "sections populated");
    }
}
