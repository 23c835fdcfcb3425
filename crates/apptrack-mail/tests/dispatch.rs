//! End-to-end dispatch tests with stub mailers

use apptrack_core::{CountSource, FixedCounts, QueryError};
use apptrack_mail::{DispatchStatus, MailError, Mailer, NotificationDispatcher, NotificationMessage, RecipientSettings};
use apptrack_render::{ReportAssembler, ReportSettings};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<NotificationMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &NotificationMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct RefusingMailer;

#[async_trait]
impl Mailer for RefusingMailer {
    async fn send(&self, _message: &NotificationMessage) -> Result<(), MailError> {
        Err(MailError::Config("relay refused connection".into()))
    }
}

struct Unreachable;

#[async_trait]
impl CountSource for Unreachable {
    async fn count(&self, _method: &str) -> Result<i64, QueryError> {
        Err(QueryError::Connection("login timeout".into()))
    }
}

fn run_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 1)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap()
}

fn assembler(dir: &Path, source: Arc<dyn CountSource>) -> ReportAssembler {
    let settings = ReportSettings {
        directory: dir.to_path_buf(),
        ..ReportSettings::default()
    };
    ReportAssembler::new(source, settings)
}

fn recipients(to: &str, bcc: &str) -> RecipientSettings {
    RecipientSettings {
        to: to.into(),
        bcc: bcc.into(),
    }
}

fn files_in(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

#[tokio::test]
async fn sends_one_mail_with_the_report_attached() {
    let dir = tempfile::tempdir().unwrap();
    let mailer = Arc::new(RecordingMailer::default());
    let dispatcher = NotificationDispatcher::new(
        assembler(dir.path(), Arc::new(FixedCounts::new().with("AuthorizeAgent", 42))),
        recipients("ops@clinic.test", "audit@clinic.test; lead@clinic.test;"),
        mailer.clone(),
    );

    let status = dispatcher.send_report_at(run_time()).await;

    assert!(status.is_success(), "{status}");
    assert_eq!(status.to_string(), "Email sent successfully.");
    assert_eq!(files_in(&dir), 1);

    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["ops@clinic.test".to_string()]);
    assert_eq!(sent[0].bcc.len(), 2);
    assert_eq!(Some(&sent[0].attachment), status.report_path());
    assert!(sent[0].html_body.contains("28-02-2025"));
}

#[tokio::test]
async fn empty_recipient_list_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mailer = Arc::new(RecordingMailer::default());
    let dispatcher = NotificationDispatcher::new(
        assembler(dir.path(), Arc::new(FixedCounts::new())),
        recipients(" ; ", "audit@clinic.test"),
        mailer.clone(),
    );

    let status = dispatcher.send_report_at(run_time()).await;

    assert_eq!(status, DispatchStatus::NoRecipients);
    assert_eq!(status.to_string(), "No email found");
    assert!(mailer.sent.lock().unwrap().is_empty());
    // the build step has already run
    assert_eq!(files_in(&dir), 1);
}

#[tokio::test]
async fn smtp_failure_keeps_the_report() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = NotificationDispatcher::new(
        assembler(dir.path(), Arc::new(FixedCounts::new())),
        recipients("ops@clinic.test", ""),
        Arc::new(RefusingMailer),
    );

    let status = dispatcher.send_report_at(run_time()).await;

    assert!(status.to_string().contains("Something went wrong"));
    assert!(matches!(status, DispatchStatus::SendFailed { .. }));
    assert!(status.report_path().unwrap().exists());
}

#[tokio::test]
async fn build_failure_is_reported_without_sending() {
    let dir = tempfile::tempdir().unwrap();
    let mailer = Arc::new(RecordingMailer::default());
    let dispatcher = NotificationDispatcher::new(
        assembler(dir.path(), Arc::new(Unreachable)),
        recipients("ops@clinic.test", ""),
        mailer.clone(),
    );

    let status = dispatcher.send_report_at(run_time()).await;

    match &status {
        DispatchStatus::BuildFailed { reason } => assert!(reason.contains("login timeout")),
        other => panic!("expected build failure, got {other:?}"),
    }
    assert!(status.to_string().contains("Something went wrong"));
    assert!(mailer.sent.lock().unwrap().is_empty());
}
