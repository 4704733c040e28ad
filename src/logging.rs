//! Logging configuration for athena-relay.
//!
//! Logs go to stderr by default. With `--log-file` they are written to a
//! file instead, which keeps long-running deployments off the console.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging to the given file.
///
/// Falls back to stderr if the file cannot be created.
pub fn init_file_logging(log_path: &Path) {
    // Ensure parent directory exists
    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            init_stderr_logging();
            return;
        }
    }

    let log_file = match File::options().create(true).append(true).open(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file: {e}");
            init_stderr_logging();
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false) // No ANSI colors in file output
        .init();
}

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
}

/// Returns the default path for the log file.
///
/// Uses XDG state directory on Linux (`~/.local/state/athena-relay/athena-relay.log`),
/// or falls back to config directory on other platforms.
pub fn get_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("athena-relay").join("athena-relay.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("athena-relay").join("athena-relay.log");
    }

    std::env::temp_dir().join("athena-relay.log")
}
