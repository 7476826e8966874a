use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use queuedesk_core::{
    create_audit_system, create_authenticator, load_config, validate_config, AuditEvent,
    AuditStore, CounterStore, MaintenanceScheduler, QueueChange, QueueService,
    SqliteAuditStore, SqliteCounterStore, SqliteTicketStore, StatusBroadcaster, TicketStore,
};
use queuedesk_server::{create_router, AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for audit event channel
const AUDIT_BUFFER_SIZE: usize = 1000;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("QUEUEDESK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    let authenticator =
        create_authenticator(&config.auth).context("Failed to create authenticator")?;
    info!("Using authenticator: {}", authenticator.method_name());

    // Stores share one SQLite file, each with its own connection
    let audit_store: Arc<dyn AuditStore> = Arc::new(
        SqliteAuditStore::new(&config.database.path).context("Failed to create audit store")?,
    );
    let ticket_store: Arc<dyn TicketStore> = Arc::new(
        SqliteTicketStore::new(&config.database.path).context("Failed to create ticket store")?,
    );
    let counter_store: Arc<dyn CounterStore> = Arc::new(
        SqliteCounterStore::new(&config.database.path)
            .context("Failed to create counter store")?,
    );
    info!("Stores initialized");

    let (audit_handle, audit_writer) =
        create_audit_system(Arc::clone(&audit_store), AUDIT_BUFFER_SIZE);
    let writer_handle = tokio::spawn(audit_writer.run());

    audit_handle
        .emit(AuditEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;

    // The broadcaster reads through the service's aggregator, and the service
    // pushes every change back to it, so the callback is wired late.
    let base_service = QueueService::new(
        &config.queue,
        &config.maintenance,
        Arc::clone(&ticket_store),
        Arc::clone(&counter_store),
    );
    let broadcaster =
        StatusBroadcaster::new(config.broadcaster.clone(), base_service.status_aggregator());

    let broadcaster_for_callback = broadcaster.clone();
    let queue = Arc::new(
        base_service
            .with_audit(audit_handle.clone())
            .with_update_callback(Arc::new(move |change: QueueChange| {
                broadcaster_for_callback.refresh(&change);
            })),
    );

    broadcaster.start();
    info!("Status broadcaster started");

    let scheduler = MaintenanceScheduler::new(config.maintenance.clone(), Arc::clone(&queue));
    scheduler.start();

    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        audit_store,
        Arc::clone(&queue),
        broadcaster.clone(),
    ));
    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(broadcaster.clone()))
    .await
    .context("Server error")?;

    info!("Server shutting down...");
    scheduler.stop();
    broadcaster.stop();

    audit_handle
        .emit(AuditEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // The writer exits once every AuditHandle is gone; the scheduler and
    // the queue service hold clones through `queue`.
    drop(scheduler);
    drop(queue);
    drop(audit_handle);

    let _ = writer_handle.await;
    info!("Audit writer stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM), then end the open SSE feeds
/// so graceful shutdown is not held up by connected displays.
async fn shutdown_signal(broadcaster: StatusBroadcaster) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    broadcaster.close_feeds();
}
