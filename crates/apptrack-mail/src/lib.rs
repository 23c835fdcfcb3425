//! # apptrack-mail
//!
//! Sends the daily hits report by e-mail.
//!
//! The [`NotificationDispatcher`] builds the report through a
//! [`ReportAssembler`](apptrack_render::ReportAssembler), composes a
//! [`NotificationMessage`] and hands it to a [`Mailer`]. Every outcome is
//! reported as a [`DispatchStatus`]; nothing is raised to the caller.

pub mod dispatcher;
pub mod message;
pub mod smtp;

pub use dispatcher::{DispatchStatus, NotificationDispatcher};
pub use message::{NotificationMessage, RecipientSettings, SUBJECT};
pub use smtp::{SmtpMailer, SmtpSettings};

use async_trait::async_trait;
use thiserror::Error;

/// Outbound mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message
    async fn send(&self, message: &NotificationMessage) -> Result<(), MailError>;
}

/// Mail composition or delivery error
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address '{address}': {message}")]
    Address { address: String, message: String },

    #[error("Mail configuration error: {0}")]
    Config(String),

    #[error("Could not compose message: {0}")]
    Compose(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Could not read attachment: {0}")]
    Attachment(#[from] std::io::Error),
}
