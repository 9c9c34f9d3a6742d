use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cache;
mod config;
mod middleware;
mod routes;
mod weather;

use config::Config;
use middleware::RateLimiter;
use routes::{create_router, AppState};
use weather::{service::WeatherService, visual_crossing::VisualCrossingClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_cache_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    // Redis being down is not fatal; the gateway just stops caching.
    let cache = cache::connect(&config).await;
    if config.cache_enabled() && !cache.is_enabled() {
        tracing::warn!("Serving without cache");
    }

    let fetcher = Arc::new(VisualCrossingClient::new(&config)?);
    let weather = Arc::new(WeatherService::new(cache, fetcher));

    let rate_limiter = Arc::new(RateLimiter::per_minute(config.rate_limit_per_minute));
    let sweeper = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweeper.window());
        loop {
            interval.tick().await;
            sweeper.cleanup_old_entries();
            tracing::debug!(clients = sweeper.tracked_clients(), "Swept rate limit windows");
        }
    });

    let state = AppState {
        weather,
        rate_limiter,
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server starting on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }

    tracing::info!("Shutting down gracefully...");
}
