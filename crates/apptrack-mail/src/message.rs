//! Recipients and message composition

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Subject line of every report mail
pub const SUBJECT: &str = "FDA Agent API Calls Report";

const FOOTER: &str =
    "<p style='margin-top:1px;'> Note: This is an auto generated email. Please do not reply to this email. </p>";

/// `[recipients]` configuration
///
/// Both lists are semicolon-delimited strings as operators write them.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecipientSettings {
    pub to: String,
    pub bcc: String,
}

impl RecipientSettings {
    pub fn to_list(&self) -> Vec<String> {
        split_addresses(&self.to)
    }

    pub fn bcc_list(&self) -> Vec<String> {
        split_addresses(&self.bcc)
    }
}

/// Split on `;`, trim each entry and drop empty ones
pub fn split_addresses(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect()
}

/// A composed report mail
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationMessage {
    pub subject: String,
    pub html_body: String,
    pub to: Vec<String>,
    pub bcc: Vec<String>,
    pub attachment: PathBuf,
}

impl NotificationMessage {
    pub fn new(report_date: NaiveDate, to: Vec<String>, bcc: Vec<String>, attachment: &Path) -> Self {
        Self {
            subject: SUBJECT.to_string(),
            html_body: html_body(report_date),
            to,
            bcc,
            attachment: attachment.to_path_buf(),
        }
    }

    /// File name shown to recipients
    pub fn attachment_name(&self) -> String {
        self.attachment
            .file_name()
            .map_or_else(|| "report.xlsx".to_string(), |n| n.to_string_lossy().into_owned())
    }
}

fn html_body(report_date: NaiveDate) -> String {
    format!(
        "<div><p>Please find attached the FDA Agent API calls report for {}.</p></br>{FOOTER}</div>",
        report_date.format("%d-%m-%Y")
    )
}
