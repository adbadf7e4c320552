use anyhow::{Context, Result};
use intent_bridge::api::{create_app, AppState};
use intent_bridge::config::ServiceConfig;
use intent_bridge::control::ControlClient;
use intent_bridge::directory::{DirectoryStore, SharedDirectory};
use intent_bridge::orchestrator::Orchestrator;
use intent_bridge::parser::IntentParser;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intent_bridge=info".into()),
        )
        .init();

    info!("Intent bridge starting...");

    let config = ServiceConfig::load().context("Failed to load configuration")?;
    info!(
        bind_addr = %config.server.bind_addr,
        control_url = %config.control.base_url,
        directory = %config.directory.path.display(),
        presence_override = config.presence.entity_override.as_deref().unwrap_or("-"),
        semantic_fallback = config.semantic.api_key.is_some(),
        "Configuration loaded"
    );

    let directory = Arc::new(SharedDirectory::open(DirectoryStore::new(
        config.directory.path.clone(),
    )));
    let control = Arc::new(
        ControlClient::new(&config.control).context("Failed to initialize control client")?,
    );
    let parser = IntentParser::with_defaults(config.semantic.api_key.clone());

    let orchestrator = Orchestrator::new(
        parser,
        directory,
        control,
        config.presence.entity_override.clone(),
    );

    let app = create_app(AppState {
        orchestrator: Arc::new(orchestrator),
    });
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Intent bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
    }
    info!("Shutdown signal received");
}
