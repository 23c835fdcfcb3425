//! SMTP delivery via lettre

use crate::{MailError, Mailer, NotificationMessage};
use async_trait::async_trait;
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

type HeaderParseError = Box<dyn std::error::Error + Send + Sync>;

/// `X-Priority: 1 (Highest)`
#[derive(Clone, Copy, Debug)]
struct XPriority;

impl Header for XPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(_: &str) -> Result<Self, HeaderParseError> {
        Ok(Self)
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), "1 (Highest)".to_string())
    }
}

/// `Importance: High`, the Outlook counterpart of `X-Priority`
#[derive(Clone, Copy, Debug)]
struct Importance;

impl Header for Importance {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Importance")
    }

    fn parse(_: &str) -> Result<Self, HeaderParseError> {
        Ok(Self)
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), "High".to_string())
    }
}

/// `[smtp]` configuration
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Upgrade the connection with STARTTLS
    pub ssl: bool,
    /// Sender address; the user name when unset
    pub from: Option<String>,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 587,
            username: String::new(),
            password: String::new(),
            ssl: true,
            from: None,
        }
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ssl", &self.ssl)
            .field("from", &self.from)
            .finish()
    }
}

impl SmtpSettings {
    /// Sender address
    pub fn sender(&self) -> Result<&str, MailError> {
        match self.from.as_deref() {
            Some(from) if !from.trim().is_empty() => Ok(from.trim()),
            _ if !self.username.trim().is_empty() => Ok(self.username.trim()),
            _ => Err(MailError::Config("no sender: set smtp.from or smtp.username".into())),
        }
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::Address {
        address: address.to_string(),
        message: e.to_string(),
    })
}

/// Mailer backed by an SMTP relay
#[derive(Clone, Debug)]
pub struct SmtpMailer {
    settings: SmtpSettings,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    /// Compose the MIME message: high priority, HTML body plus the
    /// spreadsheet attachment
    pub fn compose(&self, message: &NotificationMessage) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(mailbox(self.settings.sender()?)?)
            .subject(message.subject.clone())
            .header(XPriority)
            .header(Importance);
        for to in &message.to {
            builder = builder.to(mailbox(to)?);
        }
        for bcc in &message.bcc {
            builder = builder.bcc(mailbox(bcc)?);
        }

        let content = std::fs::read(&message.attachment)?;
        let content_type = ContentType::parse(XLSX_CONTENT_TYPE)
            .map_err(|e| MailError::Config(format!("content type: {e}")))?;
        let attachment = Attachment::new(message.attachment_name()).body(content, content_type);

        let body = MultiPart::mixed()
            .singlepart(SinglePart::html(message.html_body.clone()))
            .singlepart(attachment);
        Ok(builder.multipart(body)?)
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let settings = &self.settings;
        let builder = if settings.ssl {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        };
        let mut builder = builder.port(settings.port);
        if !settings.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ));
        }
        Ok(builder.build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &NotificationMessage) -> Result<(), MailError> {
        let email = self.compose(message)?;
        debug!(
            host = %self.settings.host,
            port = self.settings.port,
            to = message.to.len(),
            bcc = message.bcc.len(),
            "sending report mail"
        );
        let response = self.transport()?.send(email).await?;
        info!("SMTP accepted message: {}", response.code());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: "smtp.clinic.test".into(),
            username: "reports@clinic.test".into(),
            password: "hunter2".into(),
            ..SmtpSettings::default()
        }
    }

    #[test]
    fn sender_falls_back_to_username() {
        assert_eq!(settings().sender().unwrap(), "reports@clinic.test");

        let with_from = SmtpSettings {
            from: Some("noreply@clinic.test".into()),
            ..settings()
        };
        assert_eq!(with_from.sender().unwrap(), "noreply@clinic.test");
    }

    #[test]
    fn missing_sender_is_a_config_error() {
        assert!(matches!(SmtpSettings::default().sender(), Err(MailError::Config(_))));
    }

    #[test]
    fn debug_hides_password() {
        let text = format!("{:?}", settings());
        assert!(!text.contains("hunter2"));
        assert!(text.contains("<redacted>"));
    }

    #[test]
    fn compose_attaches_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hits.xlsx");
        std::fs::write(&path, b"PK\x03\x04").unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        let message = NotificationMessage::new(
            day,
            vec!["ops@clinic.test".into()],
            vec!["audit@clinic.test".into()],
            &path,
        );

        let email = SmtpMailer::new(settings()).compose(&message).unwrap();
        let raw = String::from_utf8_lossy(&email.formatted()).into_owned();

        assert!(raw.contains("Subject: FDA Agent API Calls Report"));
        assert!(raw.contains("To: ops@clinic.test"));
        assert!(raw.contains(XLSX_CONTENT_TYPE));
        assert!(raw.contains("hits.xlsx"));
    }

    #[test]
    fn compose_marks_high_priority() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hits.xlsx");
        std::fs::write(&path, b"PK").unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        let message = NotificationMessage::new(day, vec!["ops@clinic.test".into()], vec![], &path);

        let email = SmtpMailer::new(settings()).compose(&message).unwrap();
        let raw = String::from_utf8_lossy(&email.formatted()).into_owned();

        assert!(raw.contains("X-Priority: 1 (Highest)"));
        assert!(raw.contains("Importance: High"));
    }

    #[test]
    fn invalid_recipient_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hits.xlsx");
        std::fs::write(&path, b"PK").unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        let message = NotificationMessage::new(day, vec!["not an address".into()], vec![], &path);

        match SmtpMailer::new(settings()).compose(&message) {
            Err(MailError::Address { address, .. }) => assert_eq!(address, "not an address"),
            other => panic!("expected address error, got {other:?}"),
        }
    }
}
