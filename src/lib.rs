pub mod api;
pub mod config;
pub mod csv_exchange;
pub mod db;
pub mod models;
pub mod prescription;

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Runs the server until it is asked to stop.
pub async fn run() -> Result<(), String> {
    init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::AppConfig::from_env();
    let server = api::start_server(&config).await?;
    server.wait().await;
    Ok(())
}
