//! Command-line argument parsing for athena-relay.
//!
//! CLI flags take precedence over the config file, which takes precedence
//! over environment variables.

use crate::config::{AthenaConfig, Config};
use crate::logging;
use clap::Parser;
use std::path::PathBuf;

/// HTTP relay that runs SQL on Amazon Athena and returns tabular results.
#[derive(Parser, Debug, Default)]
#[command(name = "athena-relay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short = 'H', long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Athena database queries run against
    #[arg(short = 'd', long, value_name = "DATABASE")]
    pub database: Option<String>,

    /// S3 URI Athena writes results to (e.g., s3://bucket/prefix/)
    #[arg(short = 'o', long, value_name = "URI")]
    pub output_location: Option<String>,

    /// AWS region
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// AWS profile to load credentials from
    #[arg(long, value_name = "PROFILE")]
    pub profile: Option<String>,

    /// Athena workgroup
    #[arg(long, value_name = "NAME")]
    pub workgroup: Option<String>,

    /// Delay between execution state checks, in milliseconds
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Maximum time to wait for a query, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Serve against an in-memory query service (for local testing)
    #[arg(long)]
    pub mock_service: bool,

    /// Write logs to a file (default location if PATH is omitted)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    pub log_file: Option<Option<PathBuf>>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path (CLI override or platform default).
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Returns the log file path, if file logging was requested.
    pub fn log_path(&self) -> Option<PathBuf> {
        match &self.log_file {
            Some(Some(path)) => Some(path.clone()),
            Some(None) => Some(logging::get_log_path()),
            None => None,
        }
    }

    /// Converts the Athena flags to an override config.
    pub fn to_athena_config(&self) -> AthenaConfig {
        AthenaConfig {
            region: self.region.clone(),
            profile: self.profile.clone(),
            endpoint_url: None,
            database: self.database.clone(),
            output_location: self.output_location.clone(),
            workgroup: self.workgroup.clone(),
        }
    }

    /// Applies CLI overrides on top of a loaded config.
    pub fn apply_to(&self, config: &mut Config) {
        config.athena.merge(&self.to_athena_config());

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(interval) = self.poll_interval_ms {
            config.polling.interval_ms = interval;
        }
        if let Some(timeout) = self.timeout_secs {
            config.polling.timeout_secs = timeout;
        }
    }
}
