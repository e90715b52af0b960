#![cfg(not(tarpaulin_include))]

use sheetscope::app;
use sheetscope::config::AppConfig;

/// Main entry point for the web application
///
/// Loads `.env` if present, initialises logging with `LOG_LEVEL` as the
/// default filter (overridable by `RUST_LOG`) and serves until interrupted.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = AppConfig::from_env();
    log::info!(
        "Starting with uploads in {} and graph at {}",
        config.upload_folder.display(),
        config.graph_path.display()
    );

    app::run(config).await
}
