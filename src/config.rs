use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;

use crate::utils::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Scylla,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "scylla" => Ok(StoreBackend::Scylla),
            other => bail!("unknown store backend '{}', expected 'memory' or 'scylla'", other),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub store_backend: StoreBackend,
    pub scylla_uri: String,
    pub scylla_keyspace: String,
    pub store_max_attempts: u32,
    pub store_initial_backoff: Duration,
    pub principal_id_header: String,
    pub principal_email_header: String,
    /// Principals allowed to add events. Empty means any signed-in member.
    pub admin_principals: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            store_backend: StoreBackend::Memory,
            scylla_uri: "127.0.0.1:9042".to_string(),
            scylla_keyspace: "osa_ks".to_string(),
            store_max_attempts: 3,
            store_initial_backoff: Duration::from_millis(100),
            principal_id_header: "x-principal-id".to_string(),
            principal_email_header: "x-principal-email".to_string(),
            admin_principals: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let store_max_attempts: u32 = match lookup("STORE_MAX_ATTEMPTS") {
            Some(v) => v.parse().context("STORE_MAX_ATTEMPTS must be a positive integer")?,
            None => defaults.store_max_attempts,
        };
        if store_max_attempts == 0 {
            bail!("STORE_MAX_ATTEMPTS must be at least 1");
        }

        let store_initial_backoff = match lookup("STORE_INITIAL_BACKOFF_MS") {
            Some(v) => Duration::from_millis(
                v.parse()
                    .context("STORE_INITIAL_BACKOFF_MS must be a number of milliseconds")?,
            ),
            None => defaults.store_initial_backoff,
        };

        let store_backend = match lookup("STORE_BACKEND") {
            Some(v) => v.parse().context("STORE_BACKEND is invalid")?,
            None => defaults.store_backend,
        };

        let admin_principals = lookup("ADMIN_PRINCIPALS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            store_backend,
            scylla_uri: lookup("SCYLLA_URI").unwrap_or(defaults.scylla_uri),
            scylla_keyspace: lookup("SCYLLA_KEYSPACE").unwrap_or(defaults.scylla_keyspace),
            store_max_attempts,
            store_initial_backoff,
            principal_id_header: lookup("PRINCIPAL_ID_HEADER")
                .unwrap_or(defaults.principal_id_header)
                .to_ascii_lowercase(),
            principal_email_header: lookup("PRINCIPAL_EMAIL_HEADER")
                .unwrap_or(defaults.principal_email_header)
                .to_ascii_lowercase(),
            admin_principals,
        })
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.store_max_attempts, self.store_initial_backoff)
    }
}
