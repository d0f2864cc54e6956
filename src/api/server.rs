//! Server lifecycle: bind, spawn the axum server, stop on request.
//!
//! Shutdown is triggered by `POST /api/shutdown`, by `RunningServer::shutdown`,
//! or by Ctrl-C. In-flight requests finish before the task ends.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::api::router::app_router;
use crate::api::types::ApiContext;
use crate::config::AppConfig;
use crate::db;

/// Handle to a running server.
pub struct RunningServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl RunningServer {
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
        tracing::info!("Server shutdown signal sent");
    }

    /// Waits until the server task has stopped.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            tracing::error!("Server task failed: {e}");
        }
    }
}

/// Opens the database, binds `config.addr` and spawns the server.
pub async fn start_server(config: &AppConfig) -> Result<RunningServer, String> {
    // Fail fast on an unusable database instead of on the first request.
    db::open_database(&config.db_path)
        .map_err(|e| format!("Cannot open database {}: {e}", config.db_path.display()))?;

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {e}", config.addr))?;
    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let ctx = ApiContext::new(config);
    let shutdown = Arc::clone(&ctx.shutdown);
    let app = app_router(ctx, &config.static_dir);

    tracing::info!(
        %addr,
        db = %config.db_path.display(),
        static_dir = %config.static_dir.display(),
        "Server started"
    );

    let signal = Arc::clone(&shutdown);
    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            tokio::select! {
                _ = signal.notified() => tracing::info!("Shutdown requested"),
                _ = tokio::signal::ctrl_c() => tracing::info!("Ctrl-C received"),
            }
        };

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Server error: {e}");
        }

        tracing::info!("Server stopped");
    });

    Ok(RunningServer {
        addr,
        shutdown,
        task,
    })
}
