//! Configuration management for athena-relay.
//!
//! Handles loading configuration from TOML files and environment variables.
//! Nothing here holds credentials: AWS access is resolved by the SDK's
//! default provider chain, optionally pinned to a named profile.

use crate::error::{RelayError, Result};
use crate::query::{ExponentialBackoff, FixedInterval, PollPolicy, WaitStrategy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Main configuration structure for athena-relay.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Query service settings.
    #[serde(default)]
    pub athena: AthenaConfig,

    /// Polling behavior while waiting for executions.
    #[serde(default)]
    pub polling: PollingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Returns the `host:port` string to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Athena connection and query placement configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AthenaConfig {
    /// AWS region. Falls back to the SDK provider chain when unset.
    pub region: Option<String>,

    /// Named AWS profile to load credentials from.
    pub profile: Option<String>,

    /// Endpoint override (e.g. a local emulator).
    pub endpoint_url: Option<String>,

    /// Database queries run against.
    pub database: Option<String>,

    /// Where Athena writes result files, e.g. `s3://bucket/prefix/`.
    pub output_location: Option<String>,

    /// Athena workgroup.
    pub workgroup: Option<String>,
}

impl AthenaConfig {
    /// Merges another config into this one, with the other taking precedence.
    pub fn merge(&mut self, other: &AthenaConfig) {
        if other.region.is_some() {
            self.region = other.region.clone();
        }
        if other.profile.is_some() {
            self.profile = other.profile.clone();
        }
        if other.endpoint_url.is_some() {
            self.endpoint_url = other.endpoint_url.clone();
        }
        if other.database.is_some() {
            self.database = other.database.clone();
        }
        if other.output_location.is_some() {
            self.output_location = other.output_location.clone();
        }
        if other.workgroup.is_some() {
            self.workgroup = other.workgroup.clone();
        }
    }

    /// Applies environment variables (ATHENA_DATABASE, AWS_REGION, etc.) as defaults.
    pub fn apply_env_defaults(&mut self) {
        if self.database.is_none() {
            self.database = std::env::var("ATHENA_DATABASE").ok();
        }
        if self.output_location.is_none() {
            self.output_location = std::env::var("ATHENA_OUTPUT_LOCATION").ok();
        }
        if self.workgroup.is_none() {
            self.workgroup = std::env::var("ATHENA_WORKGROUP").ok();
        }
        if self.region.is_none() {
            self.region = std::env::var("AWS_REGION").ok();
        }
        if self.profile.is_none() {
            self.profile = std::env::var("AWS_PROFILE").ok();
        }
    }

    /// Returns the configured database or a configuration error.
    pub fn require_database(&self) -> Result<&str> {
        self.database
            .as_deref()
            .filter(|db| !db.trim().is_empty())
            .ok_or_else(|| {
                RelayError::config("Database is required. Set [athena].database or ATHENA_DATABASE")
            })
    }

    /// Returns the configured output location after validating it.
    pub fn require_output_location(&self) -> Result<&str> {
        let location = self.output_location.as_deref().ok_or_else(|| {
            RelayError::config(
                "Output location is required. Set [athena].output_location or ATHENA_OUTPUT_LOCATION",
            )
        })?;
        validate_output_location(location)?;
        Ok(location)
    }

    /// Returns a display-safe summary for logs.
    pub fn display_string(&self) -> String {
        let database = self.database.as_deref().unwrap_or("unknown");
        let region = self.region.as_deref().unwrap_or("default region");
        let output = self.output_location.as_deref().unwrap_or("no output location");
        format!("{database} @ {region} -> {output}")
    }
}

/// Validates that `location` is an `s3://bucket/...` URI.
pub fn validate_output_location(location: &str) -> Result<Url> {
    let url = Url::parse(location)
        .map_err(|e| RelayError::config(format!("Invalid output location '{location}': {e}")))?;

    if url.scheme() != "s3" {
        return Err(RelayError::config(format!(
            "Invalid scheme '{}' in output location. Expected 's3'",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(RelayError::config(format!(
            "Output location '{location}' has no bucket"
        )));
    }

    Ok(url)
}

/// Upper bound for `polling.timeout_secs` (one day).
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Which wait strategy paces state checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitStrategyKind {
    #[default]
    Fixed,
    Exponential,
}

/// Polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingConfig {
    /// Base delay between state checks, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Maximum time to wait for a terminal state, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub strategy: WaitStrategyKind,

    /// Growth factor for the exponential strategy.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Upper bound on a single delay for the exponential strategy.
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// Ask the service to stop executions abandoned by timeout or cancellation.
    #[serde(default)]
    pub stop_on_abort: bool,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_interval_ms() -> u64 {
    10_000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_secs: default_timeout_secs(),
            strategy: WaitStrategyKind::default(),
            backoff_factor: default_backoff_factor(),
            max_interval_ms: default_max_interval_ms(),
            stop_on_abort: false,
        }
    }
}

impl PollingConfig {
    /// Checks that the polling settings describe a bounded wait.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(RelayError::config("polling.interval_ms must be greater than 0"));
        }
        if self.timeout_secs == 0 {
            return Err(RelayError::config("polling.timeout_secs must be greater than 0"));
        }
        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(RelayError::config(format!(
                "polling.timeout_secs must be at most {MAX_TIMEOUT_SECS}"
            )));
        }
        if self.strategy == WaitStrategyKind::Exponential {
            if self.backoff_factor < 1.0 {
                return Err(RelayError::config("polling.backoff_factor must be at least 1.0"));
            }
            if self.max_interval_ms < self.interval_ms {
                return Err(RelayError::config(
                    "polling.max_interval_ms must be at least polling.interval_ms",
                ));
            }
        }
        Ok(())
    }

    /// Builds the poll policy passed to the lifecycle.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.interval_ms),
            Duration::from_secs(self.timeout_secs),
        )
    }

    /// Builds the configured wait strategy.
    pub fn wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        match self.strategy {
            WaitStrategyKind::Fixed => Arc::new(FixedInterval),
            WaitStrategyKind::Exponential => Arc::new(ExponentialBackoff::new(
                self.backoff_factor,
                Duration::from_millis(self.max_interval_ms),
            )),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("athena-relay")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| RelayError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            RelayError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}
