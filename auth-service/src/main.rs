use std::sync::Arc;
use std::time::Duration;

use tokio::signal;

use auth_service::config::AuthConfig;
use auth_service::services::{AuthManager, TokenService};
use auth_service::store::{MemoryUserStore, MongoUserStore, UserStore};
use service_core::bus::{serve, Dispatcher, RedisBus};
use service_core::observability::init_tracing;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("auth-service", "info");

    let config = AuthConfig::load()?;

    let store: Arc<dyn UserStore> = match config.storage.as_str() {
        "memory" => Arc::new(MemoryUserStore::new()),
        _ => {
            let store = MongoUserStore::connect(&config.mongo.uri, &config.mongo.database).await?;
            store.initialize_indexes().await?;
            Arc::new(store)
        }
    };

    let tokens = Arc::new(TokenService::new(&config.tokens));
    let manager = Arc::new(AuthManager::new(store, tokens));

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(manager);

    let bus = RedisBus::connect_with_timeout(
        &config.common.redis_uri,
        &config.common.bus_prefix,
        Duration::from_secs(config.common.bus_timeout_secs),
    )
    .await?;
    let workers = serve(&bus, &config.common.node_type, Arc::new(dispatcher));
    tracing::info!(node_type = %config.common.node_type, "auth-service serving bus calls");

    shutdown_signal().await;
    for worker in workers {
        worker.abort();
    }
    Ok(())
}
