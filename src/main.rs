use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod domain;
mod http;
mod live;
mod metrics;
mod service;
mod store;

use config::Config;
use http::AppState;
use live::LiveFeed;
use metrics::Metrics;
use service::OrderService;
use store::FileOrderStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging with environment-based filtering.
    // Default to INFO, override with RUST_LOG (e.g. RUST_LOG=debug).
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,orderdesk=debug")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        port = config.port,
        orders_file = %config.orders_file.display(),
        "Starting orderdesk"
    );

    let metrics = Arc::new(Metrics::new()?);
    let store = FileOrderStore::new(config.orders_file.clone());

    // Surface a corrupt order file at startup instead of on the first request.
    let existing = store.load_all().await?;
    tracing::info!(count = existing.len(), "Loaded persisted orders");

    let feed = LiveFeed::new();
    let service = Arc::new(OrderService::new(store, feed, metrics.clone()));

    http::run(AppState {
        service,
        metrics,
        config,
    })
    .await?;

    Ok(())
}
