//! Configuration loading integration tests.

use std::io::Write;

use athena_relay::config::{Config, WaitStrategyKind};
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
port = 8181

[athena]
database = "archive-db"
output_location = "s3://query-results/relay/"
profile = "analytics"

[polling]
interval_ms = 200
strategy = "exponential"
max_interval_ms = 2000
stop_on_abort = true
"#
    )
    .unwrap();

    let config = Config::load_from_file(file.path()).unwrap();

    assert_eq!(config.server.port, 8181);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.athena.require_database().unwrap(), "archive-db");
    assert_eq!(
        config.athena.require_output_location().unwrap(),
        "s3://query-results/relay/"
    );
    assert_eq!(config.athena.profile.as_deref(), Some("analytics"));
    assert_eq!(config.polling.strategy, WaitStrategyKind::Exponential);
    assert!(config.polling.stop_on_abort);
    assert!(config.polling.validate().is_ok());
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from_file(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.server.bind_address(), "127.0.0.1:8080");
    assert_eq!(config.polling.interval_ms, 1000);
    assert_eq!(config.polling.timeout_secs, 300);
}

#[test]
fn test_malformed_file_names_the_path() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[polling]\ninterval_ms = \"fast\"").unwrap();

    let err = Config::load_from_file(file.path()).unwrap_err();

    assert_eq!(err.category(), "Configuration Error");
    assert!(err
        .to_string()
        .contains(&file.path().display().to_string()));
}

#[test]
fn test_invalid_output_location_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[athena]\ndatabase = \"archive-db\"\noutput_location = \"/local/dir\""
    )
    .unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    assert!(config.athena.require_output_location().is_err());
}
