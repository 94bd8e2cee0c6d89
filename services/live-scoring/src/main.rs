use live_scoring::api::{create_router, AppState};
use live_scoring::config::ServiceConfig;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env();
    tracing::info!(
        version = live_scoring::SERVICE_VERSION,
        checkpoint_interval = config.engine.checkpoint_interval,
        enforce_free_hit = config.engine.enforce_free_hit,
        subscriber_queue = config.hub.subscriber_queue_capacity,
        "Starting live scoring service"
    );

    let state = AppState::new(&config);
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
