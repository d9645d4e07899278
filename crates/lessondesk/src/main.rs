use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lessondesk::api::ApiClient;
use lessondesk::cache::QueryCache;
use lessondesk::config::DashboardConfig;
use lessondesk::dashboard::Dashboard;
use lessondesk::server::create_router;
use lessondesk::store::CredentialStore;
use lessondesk::types::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = DashboardConfig::from_env().context("failed to load configuration")?;
    info!(
        api = %config.api_base_url,
        bind = %config.bind_addr,
        "Starting lessondesk"
    );

    let store = Arc::new(
        CredentialStore::open(&config.credentials_db)
            .with_context(|| format!("failed to open {}", config.credentials_db.display()))?,
    );
    let api = ApiClient::new(&config, store).context("failed to build API client")?;
    let cache = QueryCache::new(config.stale_time(), config.gc_time());
    let state = Arc::new(AppState::new(Dashboard::new(api, cache)));

    let gc_state = state.clone();
    let gc_interval = config.gc_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(gc_interval);
        loop {
            ticker.tick().await;
            let removed = gc_state.dashboard.cache().collect_garbage();
            if removed > 0 {
                debug!(removed, "Collected unused cache entries");
            }
        }
    });

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
