//! `apptrack.toml` loading

use anyhow::{Context, Result};
use apptrack_mail::{RecipientSettings, SmtpSettings};
use apptrack_render::ReportSettings;
use apptrack_store::DatabaseSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DATABASE_URL_ENV: &str = "APPTRACK_DATABASE_URL";
pub const SMTP_PASSWORD_ENV: &str = "APPTRACK_SMTP_PASSWORD";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Append-only log file; `None` logs to stderr only
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("logs/apptrack.log")),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub smtp: SmtpSettings,
    pub recipients: RecipientSettings,
    pub report: ReportSettings,
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Read the file, then apply secrets from the environment
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::parse(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(DATABASE_URL_ENV) {
            self.database.url = url;
        }
        if let Some(password) = lookup(SMTP_PASSWORD_ENV) {
            self.smtp.password = password;
        }
    }
}
