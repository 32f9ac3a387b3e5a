use std::sync::Arc;
use std::time::Duration;

use tokio::signal;

use service_core::bus::{serve, Dispatcher, RedisBus};
use service_core::observability::init_tracing;
use student_service::config::StudentConfig;
use student_service::services::StudentManager;
use student_service::store::{MemoryStudentStore, MongoStudentStore, StudentStore};

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
    init_tracing("student-service", "info");

    let config = StudentConfig::load()?;

    let store: Arc<dyn StudentStore> = match config.storage.as_str() {
        "memory" => Arc::new(MemoryStudentStore::new()),
        _ => Arc::new(MongoStudentStore::connect(&config.mongo.uri, &config.mongo.database).await?),
    };

    let bus = Arc::new(
        RedisBus::connect_with_timeout(
            &config.common.redis_uri,
            &config.common.bus_prefix,
            Duration::from_secs(config.common.bus_timeout_secs),
        )
        .await?,
    );

    let manager = Arc::new(StudentManager::new(
        store,
        bus.clone(),
        &config.common.node_type,
    ));

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(manager);

    let workers = serve(&bus, &config.common.node_type, Arc::new(dispatcher));
    tracing::info!(node_type = %config.common.node_type, "student-service serving bus calls");

    shutdown_signal().await;
    for worker in workers {
        worker.abort();
    }
    Ok(())
}
