//! Tabula Daemon - Main Entry Point
//! JSON-RPC server + ingestion worker over a SQLite job store

mod config;

use anyhow::{Context, Result};
use config::{DaemonConfig, LogFormat};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import workspace crates
use tabula_api_rpc::{RpcHandler, RpcServer};
use tabula_core::application::{
    ingestion_channel, shutdown_channel, IngestionPipeline, IngestionWorker, JobStatusService,
    UploadService,
};
use tabula_core::port::id_provider::UuidProvider;
use tabula_core::port::time_provider::SystemTimeProvider;
use tabula_core::port::JobStore;
use tabula_infra_sqlite::{create_pool, run_migrations, SqliteJobStore};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

fn init_tracing(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("tabula=info"))
        .context("Failed to create env filter")?;

    match format {
        LogFormat::Json => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration and initialize logging
    let config = DaemonConfig::from_env()?;
    init_tracing(config.log_format)?;

    info!("Tabula v{} starting...", VERSION);
    info!(db_path = %config.db_path, "Initializing database...");

    // 2. Initialize database
    if let Some(parent) = Path::new(&config.db_path).parent() {
        if !config.db_path.starts_with("sqlite:") && !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }
    }
    let pool = create_pool(&config.database_url())
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 3. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let job_store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::new(pool.clone()));

    let job_service = Arc::new(JobStatusService::new(
        job_store.clone(),
        id_provider,
        time_provider.clone(),
    ));
    let pipeline = Arc::new(IngestionPipeline::new(
        job_store,
        time_provider,
        config.ingestion.retry_policy(),
    ));
    let (queue, queue_rx) = ingestion_channel(config.ingestion.queue_capacity);
    let upload_service = Arc::new(UploadService::new(job_service.clone(), queue));

    // 4. Start ingestion worker
    info!("Starting ingestion worker...");
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let worker = IngestionWorker::new(
        queue_rx,
        pipeline,
        config.ingestion.max_concurrent_jobs,
    );
    let worker_handle = tokio::spawn(async move {
        if let Err(e) = worker.run(shutdown_rx).await {
            tracing::error!(error = ?e, "Ingestion worker failed");
        }
    });

    // 5. Start JSON-RPC server
    info!("Starting JSON-RPC server...");
    let handler = Arc::new(RpcHandler::new(upload_service, job_service));
    let (addr, rpc_handle) = RpcServer::new(config.rpc.clone(), handler)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(addr = %addr, "System ready. Waiting for uploads...");
    info!("Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown: stop accepting requests, then let running jobs finish
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    shutdown_tx.shutdown();
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, worker_handle)
        .await
        .is_err()
    {
        tracing::warn!("Ingestion worker did not finish in time, unfinished jobs stay PROCESSING");
    }
    pool.close().await;

    info!("Shutdown complete.");

    Ok(())
}
