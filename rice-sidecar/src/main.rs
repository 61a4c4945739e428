use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rice_sidecar::api::{routes::create_router, state::AppState};
use rice_sidecar::config::Config;
use rice_sidecar::store::StepRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before reading any configuration
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let repository = StepRepository::open(&config.db_path)
        .with_context(|| format!("Failed to open step database at {:?}", config.db_path))?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    let state = Arc::new(AppState::new(config, repository));
    let app = create_router(state);

    tracing::info!("RICE recording sidecar starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
