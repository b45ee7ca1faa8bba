//! Typed configuration from environment variables.
//!
//! Loads once at startup and is passed down explicitly. Fails fast on
//! malformed values. The database URL is wrapped in `SecretString` so it
//! never ends up in logs.

use secrecy::SecretString;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::PoolConfig;
use crate::error::{Error, Result};

#[derive(Debug)]
pub struct Config {
    /// Postgres URL. When unset, jobs live in process memory.
    pub database_url: Option<SecretString>,
    /// Root directory for stored artifacts.
    pub storage_root: PathBuf,
    /// Concurrent generation slots.
    pub pool_size: usize,
    /// Per-job generation budget. None means unbounded.
    pub job_timeout: Option<Duration>,
    /// Interval between scans for PENDING jobs.
    pub poll_interval: Duration,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let pool_size: usize = parse_var(&var, "REPORT_POOL_SIZE")?.unwrap_or(4);
        if pool_size == 0 {
            return Err(Error::Config("REPORT_POOL_SIZE must be at least 1".to_string()));
        }

        Ok(Self {
            database_url: var("DATABASE_URL").map(SecretString::from),
            storage_root: var("REPORT_STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./reports")),
            pool_size,
            job_timeout: parse_var(&var, "REPORT_JOB_TIMEOUT_SECS")?
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            poll_interval: Duration::from_millis(
                parse_var(&var, "REPORT_POLL_INTERVAL_MS")?.unwrap_or(2000),
            ),
            otel_endpoint: var("OTEL_ENDPOINT"),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Worker pool settings derived from this config.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_workers: self.pool_size,
            poll_interval: Some(self.poll_interval),
            ..PoolConfig::default()
        }
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid value for {name} ('{raw}'): {e}")))
        })
        .transpose()
}
