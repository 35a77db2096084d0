use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pushdrill_core::{
    cancel_pair, collect_users, load_config, load_config_from_env, validate_config, Config,
    DrillOrchestrator, OktaDirectory, OktaProvider, PushVerifier, SanitizedConfig,
    StatsAggregator, TokioTimer, VerifierSettings,
};

/// Default config file, used when `PUSHDRILL_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "pushdrill.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

/// Read configuration from the file if present, otherwise from the environment.
fn read_config() -> Result<Config> {
    let explicit = std::env::var("PUSHDRILL_CONFIG").ok().map(PathBuf::from);
    let config_path = explicit
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = if config_path.exists() || explicit.is_some() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        info!("No config file found, loading configuration from environment");
        load_config_from_env().context("Failed to load config from environment")?
    };

    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = read_config()?;
    let sanitized = serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default();
    info!("Configuration loaded successfully: {}", sanitized);
    info!("User selection based on: {:?}", config.directory.filter);

    let directory = OktaDirectory::new(&config.provider, &config.directory)
        .context("Failed to create directory client")?;
    let provider =
        Arc::new(OktaProvider::new(&config.provider).context("Failed to create provider client")?);

    let collected = collect_users(&directory, &config.directory.filter).await;
    if !collected.errors.is_empty() {
        warn!(
            "Directory listing finished with {} errors; continuing with {} users",
            collected.errors.len(),
            collected.users.len()
        );
    }

    let stats = Arc::new(StatsAggregator::new());
    let verifier = Arc::new(PushVerifier::new(
        provider,
        stats,
        Arc::new(TokioTimer),
        VerifierSettings::from(&config.drill),
    ));
    let orchestrator = DrillOrchestrator::new(config.drill.clone(), verifier);

    let (cancel_handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, canceling pending pushes");
                cancel_handle.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let report = orchestrator
        .run(collected.users, cancel)
        .await
        .context("Push drill failed")?;

    println!("{}", report);
    Ok(())
}
