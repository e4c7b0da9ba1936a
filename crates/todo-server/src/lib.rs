//! Todo Server
//!
//! HTTP gateway for the to-do service: item routes, health check, and the
//! background past-due sweeper wired to the same lifecycle service.

#![warn(missing_docs)]

pub mod config;
pub mod dto;
pub mod handlers;

use config::ServerConfig;
use handlers::{create_router, AppState};
use std::sync::Arc;
use todo_lifecycle::LifecycleService;
use todo_store::{SqliteStore, StoreError};
use todo_sweeper::{SweepWorker, SweeperError};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Database could not be opened
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Sweeper could not be created
    #[error("Sweeper error: {0}")]
    Sweeper(#[from] SweeperError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over `default_filter`. Calling this twice is harmless;
/// the second subscriber is discarded.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Open the store and assemble shared state
///
/// The sweeper is created only when enabled in `config`.
pub fn build_state(config: &ServerConfig) -> Result<AppState, ServerError> {
    let store = SqliteStore::new(&config.database_path)?;
    let service = Arc::new(LifecycleService::new(store));

    let sweeper = if config.sweeper.enabled {
        Some(Arc::new(SweepWorker::new(
            Arc::clone(&service),
            &config.sweeper,
        )?))
    } else {
        None
    };

    Ok(AppState { service, sweeper })
}

/// Start the HTTP server
///
/// Opens the database, starts the sweeper, and serves until Ctrl+C. The
/// sweeper is stopped once in-flight requests have drained.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    init_tracing(&config.log_filter);

    info!("Starting todo server");
    info!("Bind address: {}", config.bind_addr());
    info!("Database: {}", config.database_path.display());

    let state = build_state(&config)?;

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let sweeper_task = state.sweeper.clone().map(|worker| {
        info!("Past-due sweep every {}s", config.sweeper.interval_secs);
        tokio::spawn(async move {
            worker
                .run_until(async move {
                    let _ = stop_rx.changed().await;
                })
                .await
        })
    });
    if sweeper_task.is_none() {
        info!("Past-due sweeper disabled");
    }

    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Server listening on {}", config.bind_addr());

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Server(e.to_string()));

    let _ = stop_tx.send(true);
    if let Some(task) = sweeper_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Sweeper stopped with error: {}", e),
            Err(e) => tracing::error!("Sweeper task failed: {}", e),
        }
    }

    served?;
    info!("Todo server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn memory_config() -> ServerConfig {
        ServerConfig {
            database_path: PathBuf::from(":memory:"),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_state_with_sweeper() {
        let state = build_state(&memory_config()).unwrap();
        assert!(state.sweeper.is_some());
    }

    #[test]
    fn test_build_state_without_sweeper() {
        let mut config = memory_config();
        config.sweeper.enabled = false;

        let state = build_state(&config).unwrap();
        assert!(state.sweeper.is_none());
    }

    #[test]
    fn test_build_state_bad_database_path() {
        let mut config = memory_config();
        config.database_path = PathBuf::from("/nonexistent/dir/todo.db");

        assert!(matches!(build_state(&config), Err(ServerError::Store(_))));
    }
}
