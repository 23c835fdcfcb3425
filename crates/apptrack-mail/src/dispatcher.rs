//! Notification Dispatcher
//!
//! Build the report, then mail it. Build and send failures are kept apart so
//! the status says which phase went wrong.

use crate::{Mailer, NotificationMessage, RecipientSettings};
use apptrack_render::ReportAssembler;
use chrono::{Duration, Local, NaiveDateTime};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of one `send_report` run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchStatus {
    Sent { path: PathBuf },
    NoRecipients,
    BuildFailed { reason: String },
    SendFailed { path: PathBuf, reason: String },
}

impl DispatchStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchStatus::Sent { .. })
    }

    /// Report file, if the build got that far
    pub fn report_path(&self) -> Option<&PathBuf> {
        match self {
            DispatchStatus::Sent { path } | DispatchStatus::SendFailed { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchStatus::Sent { .. } => f.write_str("Email sent successfully."),
            DispatchStatus::NoRecipients => f.write_str("No email found"),
            DispatchStatus::BuildFailed { reason } => {
                write!(f, "Something went wrong while building the report: {reason}")
            }
            DispatchStatus::SendFailed { reason, .. } => {
                write!(f, "Something went wrong while sending the email: {reason}")
            }
        }
    }
}

/// Builds the report and mails it to the configured recipients
pub struct NotificationDispatcher {
    assembler: ReportAssembler,
    recipients: RecipientSettings,
    mailer: Arc<dyn Mailer>,
}

impl NotificationDispatcher {
    pub fn new(assembler: ReportAssembler, recipients: RecipientSettings, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            assembler,
            recipients,
            mailer,
        }
    }

    pub async fn send_report(&self) -> DispatchStatus {
        self.send_report_at(Local::now().naive_local()).await
    }

    /// Build and send as if run at `now`
    pub async fn send_report_at(&self, now: NaiveDateTime) -> DispatchStatus {
        let status = self.dispatch(now).await;
        match &status {
            DispatchStatus::Sent { .. } => info!("{status}"),
            DispatchStatus::NoRecipients => warn!("{status}"),
            _ => error!("{status}"),
        }
        status
    }

    async fn dispatch(&self, now: NaiveDateTime) -> DispatchStatus {
        let path = match self.assembler.build_report_at(now).await {
            Ok(path) => path,
            Err(e) => return DispatchStatus::BuildFailed { reason: e.to_string() },
        };

        let to = self.recipients.to_list();
        if to.is_empty() {
            return DispatchStatus::NoRecipients;
        }
        let bcc = self.recipients.bcc_list();

        let report_date = (now - Duration::days(1)).date();
        let message = NotificationMessage::new(report_date, to, bcc, &path);
        match self.mailer.send(&message).await {
            Ok(()) => DispatchStatus::Sent { path },
            Err(e) => DispatchStatus::SendFailed {
                path,
                reason: e.to_string(),
            },
        }
    }
}
