//! ScholarSync server binary: resolves configuration, opens the database,
//! selects the model client, and serves the HTTP API.

mod cli;

use std::sync::Arc;

use clap::Parser;

use scholarsync_api::{create_router, AppState};
use scholarsync_chat::{DisabledModelClient, GeminiClient, ModelClient};
use scholarsync_core::config::{ModelConfig, ScholarConfig};
use scholarsync_storage::Database;

use crate::cli::CliArgs;

/// Pick the Gemini client when an API key is available.
fn build_model_client(
    config: &ModelConfig,
) -> Result<Arc<dyn ModelClient>, Box<dyn std::error::Error>> {
    match config.resolve_api_key() {
        Some(key) => {
            let client = GeminiClient::new(config, key)?;
            Ok(Arc::new(client))
        }
        None => {
            tracing::warn!(
                env = %config.api_key_env,
                "No model API key configured; chat turns will fail until one is set"
            );
            Ok(Arc::new(DisabledModelClient))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config_found = config_file.exists();
    let mut config = if config_found {
        ScholarConfig::load(&config_file)?
    } else {
        ScholarConfig::default()
    };
    config.general.port = args.resolve_port(config.general.port);
    config.general.log_level = args.resolve_log_level(&config.general.log_level);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting ScholarSync v{}", env!("CARGO_PKG_VERSION"));
    if config_found {
        tracing::info!(path = %config_file.display(), "Configuration loaded");
    } else {
        tracing::info!(path = %config_file.display(), "No configuration file; using defaults");
    }

    // Storage.
    let data_dir = args.resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db_path = data_dir.join("scholarsync.db");
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    // Model.
    let model = build_model_client(&config.model)?;
    tracing::info!(
        model = model.name(),
        grounding = config.model.search_grounding,
        "Model client ready"
    );

    // === API server ===

    let addr = format!("{}:{}", config.general.host, config.general.port);
    let port = config.general.port;
    let state = AppState::new(config, db, model);
    let router = create_router(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind; is another instance running?");
            tracing::error!("Try: SCHOLARSYNC_PORT={} scholarsync", port.saturating_add(1));
            return Err(e.into());
        }
    };

    tracing::info!(addr = %addr, "API server listening");

    axum::serve(listener, router).await?;

    Ok(())
}
