//! # apptrack-store
//!
//! Count Query Gateway: turns a method key into query text and runs it as a
//! scalar count against the configured database.
//!
//! Every call opens its own short-lived connection and closes it afterwards;
//! nothing is pooled across the queries of a run. A missing row or a NULL
//! scalar counts as `0`. Connection and query failures are returned as-is,
//! there is no retry.
//!
//! ## Query template
//!
//! The query text comes from [`DatabaseSettings::count_query`] with two
//! placeholders:
//!
//! | Placeholder | Replaced with |
//! |-------------|---------------|
//! | `{method}` | the method key, single quotes doubled |
//! | `{day_offset}` | [`DatabaseSettings::day_offset`] (1 = yesterday) |
//!
//! ```rust
//! use apptrack_store::DatabaseSettings;
//!
//! let settings = DatabaseSettings {
//!     count_query: "EXEC sp_Appointment_Tracking_log @MethodName = '{method}'".into(),
//!     ..DatabaseSettings::default()
//! };
//! assert_eq!(
//!     settings.query_for("LabResult"),
//!     "EXEC sp_Appointment_Tracking_log @MethodName = 'LabResult'"
//! );
//! ```

use apptrack_core::{CountSource, QueryError};
use async_trait::async_trait;
use serde::Deserialize;
use sqlx::AnyConnection;
use sqlx::Connection;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Default count query, one row per logged API call.
///
/// Postgres date arithmetic; SQLite databases need [`SQLITE_COUNT_QUERY`].
pub const DEFAULT_COUNT_QUERY: &str = "SELECT COUNT(*) FROM appointment_tracking_log \
     WHERE method_name = '{method}' AND CAST(logged_at AS DATE) = CURRENT_DATE - {day_offset}";

/// The same count for SQLite, where dates are text
pub const SQLITE_COUNT_QUERY: &str = "SELECT COUNT(*) FROM appointment_tracking_log \
     WHERE method_name = '{method}' AND date(logged_at) = date('now', '-{day_offset} day')";

/// `[database]` configuration
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection URL (`postgres://...`, `sqlite://...`)
    pub url: String,
    /// Query template, see the crate docs
    pub count_query: String,
    /// How many days back the counts cover
    pub day_offset: u32,
    /// Replacement method keys, applied before rendering the template
    pub method_overrides: HashMap<String, String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            count_query: DEFAULT_COUNT_QUERY.into(),
            day_offset: 1,
            method_overrides: HashMap::new(),
        }
    }
}

impl DatabaseSettings {
    /// Method key after overrides
    pub fn resolve_method<'a>(&'a self, method: &'a str) -> &'a str {
        self.method_overrides
            .get(method)
            .map_or(method, String::as_str)
    }

    /// Query text for one method key
    pub fn query_for(&self, method: &str) -> String {
        let method = self.resolve_method(method).replace('\'', "''");
        self.count_query
            .replace("{method}", &method)
            .replace("{day_offset}", &self.day_offset.to_string())
    }
}

/// Gateway failure, before it is tied to a method key
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),
}

/// Count Query Gateway over `sqlx`'s driver-agnostic connection
#[derive(Clone, Debug)]
pub struct SqlCountGateway {
    settings: DatabaseSettings,
}

impl SqlCountGateway {
    pub fn new(settings: DatabaseSettings) -> Self {
        sqlx::any::install_default_drivers();
        Self { settings }
    }

    pub fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }

    /// Run `query` on a fresh connection and return its scalar as a count.
    pub async fn execute_count(&self, query: &str) -> Result<i64, StoreError> {
        let mut conn = AnyConnection::connect(&self.settings.url)
            .await
            .map_err(StoreError::Connect)?;

        let result = sqlx::query_scalar::<_, Option<i64>>(query)
            .fetch_optional(&mut conn)
            .await;

        if let Err(e) = conn.close().await {
            debug!("closing count connection failed: {e}");
        }

        let scalar = result.map_err(StoreError::Query)?;
        Ok(scalar.flatten().unwrap_or(0))
    }
}

#[async_trait]
impl CountSource for SqlCountGateway {
    async fn count(&self, method: &str) -> Result<i64, QueryError> {
        let query = self.settings.query_for(method);
        debug!(method, %query, "executing count query");
        self.execute_count(&query).await.map_err(|e| match e {
            StoreError::Connect(source) => QueryError::Connection(source.to_string()),
            StoreError::Query(source) => QueryError::Execution {
                method: method.to_string(),
                message: source.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_fills_both_placeholders() {
        let settings = DatabaseSettings::default();
        let query = settings.query_for("TaskCreation");
        assert!(query.contains("method_name = 'TaskCreation'"));
        assert!(query.ends_with("CURRENT_DATE - 1"));
    }

    #[test]
    fn method_quotes_are_doubled() {
        let settings = DatabaseSettings::default();
        assert!(settings.query_for("O'Brien").contains("'O''Brien'"));
    }

    #[test]
    fn overrides_replace_method_keys() {
        let mut settings = DatabaseSettings::default();
        settings
            .method_overrides
            .insert(String::new(), "Prescription".into());
        assert_eq!(settings.resolve_method(""), "Prescription");
        assert_eq!(settings.resolve_method("LabResult"), "LabResult");
        assert!(settings.query_for("").contains("'Prescription'"));
    }
}
