use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use osa_enrollment::api::{self, AppState};
use osa_enrollment::config::{Config, StoreBackend};
use osa_enrollment::metrics::Metrics;
use osa_enrollment::store::{EntityStore, InMemoryStore, ScyllaStore};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,osa_enrollment=debug")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        store_backend = ?config.store_backend,
        max_attempts = config.store_max_attempts,
        "🚀 Starting OSA enrollment service"
    );

    // === 1. Storage ===
    let store: Arc<dyn EntityStore> = match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
        StoreBackend::Scylla => {
            Arc::new(ScyllaStore::connect(&config.scylla_uri, &config.scylla_keyspace).await?)
        }
    };

    // === 2. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!(
        "📊 Metrics registry created with {} metrics",
        metrics.registry().gather().len()
    );

    // === 3. Services, built once and shared by every worker ===
    let state = web::Data::new(AppState::new(store, &config, metrics.clone()));
    let metrics = web::Data::new(metrics);

    tracing::info!(bind_addr = %config.bind_addr, "Listening");
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(metrics.clone())
            .configure(api::configure)
    })
    .bind(config.bind_addr.as_str())?
    .run()
    .await?;

    tracing::info!("Shut down cleanly");
    Ok(())
}
