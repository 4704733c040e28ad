//! Athena integration tests.
//!
//! Runs real queries, so AWS credentials must be available through the
//! default provider chain.

use std::time::Duration;

use athena_relay::config::AthenaConfig;
use athena_relay::query::{PollPolicy, QueryLifecycle};
use athena_relay::service::{self, ExecutionState, QueryRequest};

/// Helper to build the Athena config from the environment.
fn get_test_config() -> Option<AthenaConfig> {
    let mut config = AthenaConfig {
        database: Some(std::env::var("ATHENA_TEST_DATABASE").ok()?),
        output_location: Some(std::env::var("ATHENA_TEST_OUTPUT_LOCATION").ok()?),
        ..Default::default()
    };
    config.apply_env_defaults();
    Some(config)
}

/// Helper to create a lifecycle against Athena.
async fn get_test_lifecycle() -> Option<(QueryLifecycle, AthenaConfig)> {
    let config = get_test_config()?;
    let service = service::connect(&config).await.ok()?;
    Some((QueryLifecycle::new(service), config))
}

fn request(config: &AthenaConfig, sql: &str) -> QueryRequest {
    QueryRequest::new(
        sql,
        config.database.clone().unwrap_or_default(),
        config.output_location.clone().unwrap_or_default(),
    )
}

#[tokio::test]
async fn test_select_literal() {
    let Some((lifecycle, config)) = get_test_lifecycle().await else {
        eprintln!("Skipping test: ATHENA_TEST_DATABASE not set");
        return;
    };

    let results = lifecycle
        .run_query(
            &request(&config, "SELECT 1 AS num, 'hello' AS greeting"),
            &PollPolicy::new(Duration::from_secs(1), Duration::from_secs(120)),
        )
        .await
        .unwrap();

    // Athena returns the column names as the first row
    assert_eq!(results.rows[0], vec!["num", "greeting"]);
    assert_eq!(results.rows[1], vec!["1", "hello"]);
}

#[tokio::test]
async fn test_invalid_sql_fails_execution() {
    let Some((lifecycle, config)) = get_test_lifecycle().await else {
        eprintln!("Skipping test: ATHENA_TEST_DATABASE not set");
        return;
    };

    let handle = match lifecycle
        .submit(&request(&config, "SELECT * FROM table_that_does_not_exist"))
        .await
    {
        Ok(handle) => handle,
        // Some analysis errors are raised at submission time
        Err(e) => {
            assert_eq!(e.category(), "Submission Error");
            return;
        }
    };

    let state = lifecycle
        .await_terminal(&handle, Duration::from_secs(1), Duration::from_secs(120))
        .await
        .unwrap();
    assert_eq!(state, ExecutionState::Failed);
}
