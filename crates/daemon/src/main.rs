//! Waitline Daemon - Main Entry Point

mod settings;
mod telemetry;

use anyhow::{Context, Result};
use settings::{DaemonConfig, LogFormat};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use waitline_api_rpc::{RpcServer, RpcServices};
use waitline_core::application::{
    shutdown_channel, DayCountResetScheduler, DestinationRegistry, FeedbackService,
    PositionResolver, PositionWatcher, QueueService,
};
use waitline_core::port::time_provider::SystemTimeProvider;
use waitline_core::port::TimeProvider;
use waitline_infra_device::LogNotifier;
use waitline_infra_sqlite::{
    create_pool, run_migrations, SqliteDestinationRepository, SqliteFeedbackRepository,
    SqliteQueueRepository, WriteLock,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("waitline=info"))
        .context("Failed to create env filter")?;
    let otel = telemetry::layer().context("Failed to initialise OpenTelemetry")?;

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(otel)
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(otel)
            .with(env_filter)
            .with(fmt::layer().pretty())
            .try_init(),
    }
    .context("Failed to install tracing subscriber")
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let config = DaemonConfig::load()?;
    init_logging(config.logging.format)?;

    info!(version = VERSION, "Waitline daemon starting");
    if telemetry::endpoint().is_some() && cfg!(not(feature = "telemetry")) {
        warn!("OTEL_EXPORTER_OTLP_ENDPOINT set but feature 'telemetry' not enabled");
    }

    // 2. Database
    let db_path = config.database_path();
    if let Some(parent) = Path::new(&db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    info!(db_path = %db_path, "Opening database");

    let pool = create_pool(&db_path)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 3. Wiring
    let write_lock = WriteLock::new();
    let destination_repo = Arc::new(SqliteDestinationRepository::new(
        pool.clone(),
        write_lock.clone(),
    ));
    let queue_repo = Arc::new(SqliteQueueRepository::new(pool.clone(), write_lock.clone()));
    let feedback_repo = Arc::new(SqliteFeedbackRepository::new(pool.clone(), write_lock));

    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let queue_policy = config.queue_policy();
    let retry = config.retry_policy();

    let registry = Arc::new(DestinationRegistry::new(
        destination_repo.clone(),
        time_provider.clone(),
        config.daily_boundary()?,
        retry.clone(),
        queue_policy.store_timeout,
    ));
    let queue = Arc::new(QueueService::new(
        queue_repo.clone(),
        queue_repo,
        time_provider.clone(),
        retry.clone(),
        queue_policy.store_timeout,
    ));
    let resolver = Arc::new(PositionResolver::new(
        queue.clone(),
        queue_policy.notify_threshold,
    ));
    let feedback = Arc::new(FeedbackService::new(
        destination_repo,
        feedback_repo,
        time_provider.clone(),
        retry,
        queue_policy.store_timeout,
    ));

    // 4. Catch up on a boundary passed while the daemon was down
    let scheduler = DayCountResetScheduler::new(
        registry.clone(),
        time_provider,
        config.day_count_check_interval(),
    );
    match scheduler.run_now().await {
        Ok(reset) => info!(reset, "Startup day-count check completed"),
        Err(e) => error!(error = %e, "Startup day-count check failed"),
    }

    // 5. Background tasks
    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let watcher = PositionWatcher::new(
        resolver.clone(),
        Arc::new(LogNotifier::new()),
        queue_policy.refresh_interval,
    );
    let watcher_handle = tokio::spawn(watcher.run(queue.subscribe(), shutdown_rx.clone()));
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    // 6. JSON-RPC server
    let rpc_server = RpcServer::new(
        config.rpc_server_config(),
        RpcServices {
            registry,
            queue,
            resolver,
            feedback,
        },
    );
    let (rpc_addr, rpc_handle) = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(rpc = %rpc_addr, "System ready");
    info!("Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Shutdown signal received");

    // 8. Graceful shutdown
    shutdown_tx.shutdown();
    if rpc_handle.stop().is_err() {
        warn!("RPC server already stopped");
    }

    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = tokio::join!(watcher_handle, scheduler_handle, rpc_handle.stopped());
    })
    .await;
    if drained.is_err() {
        warn!("Background tasks did not stop within {:?}", SHUTDOWN_GRACE);
    }

    pool.close().await;
    telemetry::shutdown();
    info!("Shutdown complete");

    Ok(())
}
