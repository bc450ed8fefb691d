use anyhow::Context;
use research_ideation::api::{build_router, AppState};
use research_ideation::config::{IdeationConfig, LoggingConfig};
use research_ideation::stream::{HttpBackendFactory, Orchestrator};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));

    if logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::args().nth(1);
    let config = IdeationConfig::load(config_path.as_deref())
        .context("Failed to load configuration")?;

    init_tracing(&config.logging);

    // Requests report configuration problems themselves
    if let Err(e) = config.validate() {
        warn!("Configuration incomplete: {}", e);
    }

    let addr = config.server.bind_addr();
    let orchestrator = Orchestrator::new(Arc::new(config), Arc::new(HttpBackendFactory));
    let app = build_router(AppState::new(Arc::new(orchestrator)));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Research ideation service listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
