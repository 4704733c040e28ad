//! athena-relay - A thin HTTP relay in front of Amazon Athena.

use std::sync::Arc;

use athena_relay::cli::Cli;
use athena_relay::config::Config;
use athena_relay::error::Result;
use athena_relay::http::{self, AppState};
use athena_relay::logging;
use athena_relay::query::QueryLifecycle;
use athena_relay::service::{self, MockQueryService, QueryService};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Placement used by `--mock-service` when none is configured.
const MOCK_DATABASE: &str = "mock";
const MOCK_OUTPUT_LOCATION: &str = "s3://mock-results/";

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();

    match cli.log_path() {
        Some(path) => logging::init_file_logging(&path),
        None => logging::init_stderr_logging(),
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;

    // Precedence: CLI flags, then config file, then environment
    cli.apply_to(&mut config);
    config.athena.apply_env_defaults();
    config.polling.validate()?;

    if cli.mock_service {
        config
            .athena
            .database
            .get_or_insert_with(|| MOCK_DATABASE.to_string());
        config
            .athena
            .output_location
            .get_or_insert_with(|| MOCK_OUTPUT_LOCATION.to_string());
    }

    let database = config.athena.require_database()?.to_string();
    let output_location = config.athena.require_output_location()?.to_string();

    let service: Arc<dyn QueryService> = if cli.mock_service {
        warn!("Using in-memory mock query service");
        Arc::new(MockQueryService::new())
    } else {
        service::connect(&config.athena).await?
    };

    info!("Query service: {}", config.athena.display_string());

    let lifecycle = QueryLifecycle::new(service)
        .with_wait_strategy(config.polling.wait_strategy())
        .with_stop_on_abort(config.polling.stop_on_abort);

    let shutdown = CancellationToken::new();
    let state = AppState::new(
        lifecycle,
        database,
        output_location,
        config.polling.poll_policy(),
    )
    .with_shutdown(shutdown.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested, cancelling in-flight queries");
            shutdown.cancel();
        }
    });

    http::start_server(&config.server.bind_address(), state).await
}
