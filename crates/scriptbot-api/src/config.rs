//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use scriptbot_script::domain::graph::{CyclePolicy, ScriptPolicy};

use crate::error::AppError;

/// Default interval between outbox flushes.
pub const DEFAULT_OUTBOX_FLUSH_INTERVAL_MS: u64 = 1000;

/// Where bots and participants are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL through `sqlx`.
    Postgres,
    /// Process memory; lost on restart.
    Memory,
}

/// Which bus connects the engine to the channel adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusBackend {
    /// `bus_messages` table, consumed by a separate adapter process.
    Postgres,
    /// In-process channel; the adapter runs inside the API server.
    Memory,
}

/// How outbound batches are handed to the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    /// Publish once; a failure is returned to the caller.
    Direct,
    /// Queue and retry failed batches in order.
    Outbox,
}

/// Startup configuration of the API server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Connection string, required by the PostgreSQL backends.
    pub database_url: Option<String>,
    /// Bind address.
    pub addr: SocketAddr,
    /// Bot and participant storage.
    pub storage: StorageBackend,
    /// Bus transport.
    pub bus: BusBackend,
    /// Script validation options.
    pub policy: ScriptPolicy,
    /// Publishing strategy.
    pub publish_mode: PublishMode,
    /// Period of the outbox flush task.
    pub outbox_flush_interval: Duration,
}

fn config_error(key: &str, value: &str, expected: &str) -> AppError {
    AppError::Config(format!("{key} must be {expected}, got {value:?}"))
}

impl ApiConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for a missing `DATABASE_URL` (when a
    /// PostgreSQL backend is selected) or any malformed value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`ApiConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("PORT").unwrap_or_else(|| "3000".to_string());
        let port: u16 = port
            .parse()
            .map_err(|_| config_error("PORT", &port, "a valid u16"))?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;

        let storage = match lookup("STORAGE_BACKEND").as_deref() {
            None | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(config_error("STORAGE_BACKEND", other, "\"postgres\" or \"memory\""));
            }
        };
        let bus = match lookup("BUS_BACKEND").as_deref() {
            None | Some("postgres") => BusBackend::Postgres,
            Some("memory") => BusBackend::Memory,
            Some(other) => {
                return Err(config_error("BUS_BACKEND", other, "\"postgres\" or \"memory\""));
            }
        };
        let publish_mode = match lookup("PUBLISH_MODE").as_deref() {
            None | Some("direct") => PublishMode::Direct,
            Some("outbox") => PublishMode::Outbox,
            Some(other) => {
                return Err(config_error("PUBLISH_MODE", other, "\"direct\" or \"outbox\""));
            }
        };

        let cycles = match lookup("SCRIPT_CYCLE_POLICY") {
            Some(raw) => CyclePolicy::parse(&raw)
                .map_err(|e| AppError::Config(format!("SCRIPT_CYCLE_POLICY: {e}")))?,
            None => CyclePolicy::default(),
        };

        let flush_ms = match lookup("OUTBOX_FLUSH_INTERVAL_MS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| config_error("OUTBOX_FLUSH_INTERVAL_MS", &raw, "a number"))?,
            None => DEFAULT_OUTBOX_FLUSH_INTERVAL_MS,
        };

        let database_url = lookup("DATABASE_URL");
        let needs_database = storage == StorageBackend::Postgres || bus == BusBackend::Postgres;
        if needs_database && database_url.is_none() {
            return Err(AppError::Config(
                "DATABASE_URL environment variable must be set".into(),
            ));
        }

        Ok(Self {
            database_url,
            addr,
            storage,
            bus,
            policy: ScriptPolicy { cycles },
            publish_mode,
            outbox_flush_interval: Duration::from_millis(flush_ms),
        })
    }
}
