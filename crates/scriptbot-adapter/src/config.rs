//! Adapter configuration read from the environment.

use std::time::Duration;

use crate::error::AdapterError;

/// Default subscriber poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Startup configuration of the adapter binary.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// PostgreSQL connection string of the bus database.
    pub database_url: String,
    /// How long the subscriber sleeps without a notification.
    pub poll_interval: Duration,
}

impl AdapterConfig {
    /// Reads `DATABASE_URL` and `BUS_POLL_INTERVAL_MS`.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Config` if `DATABASE_URL` is missing or the
    /// poll interval is not a number.
    pub fn from_env() -> Result<Self, AdapterError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`AdapterConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AdapterError> {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            AdapterError::Config("DATABASE_URL environment variable must be set".into())
        })?;
        let poll_interval_ms = match lookup("BUS_POLL_INTERVAL_MS") {
            Some(raw) => raw.parse().map_err(|e| {
                AdapterError::Config(format!("BUS_POLL_INTERVAL_MS must be a number: {e}"))
            })?,
            None => DEFAULT_POLL_INTERVAL_MS,
        };
        Ok(Self {
            database_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
        })
    }
}
