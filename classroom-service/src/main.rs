use std::sync::Arc;
use std::time::Duration;

use tokio::signal;

use classroom_service::config::ClassroomConfig;
use classroom_service::services::ClassroomManager;
use classroom_service::store::{ClassroomStore, MemoryClassroomStore, MongoClassroomStore};
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
    init_tracing("classroom-service", "info");

    let config = ClassroomConfig::load()?;

    let store: Arc<dyn ClassroomStore> = match config.storage.as_str() {
        "memory" => Arc::new(MemoryClassroomStore::new()),
        _ => {
            Arc::new(MongoClassroomStore::connect(&config.mongo.uri, &config.mongo.database).await?)
        }
    };

    let bus = Arc::new(
        RedisBus::connect_with_timeout(
            &config.common.redis_uri,
            &config.common.bus_prefix,
            Duration::from_secs(config.common.bus_timeout_secs),
        )
        .await?,
    );

    let manager = Arc::new(ClassroomManager::new(
        store,
        bus.clone(),
        &config.common.node_type,
    ));

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(manager);

    let workers = serve(&bus, &config.common.node_type, Arc::new(dispatcher));
    tracing::info!(node_type = %config.common.node_type, "classroom-service serving bus calls");

    shutdown_signal().await;
    for worker in workers {
        worker.abort();
    }
    Ok(())
}
