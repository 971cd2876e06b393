//! Rowhouse server - main entry point

use anyhow::Result;
use rowhouse_common::logging::{init_logging, LogConfig};
use rowhouse_server::config::Config;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let mut log_config = LogConfig::from_env()?;
    if log_config.filter_directives.is_none() {
        log_config.filter_directives =
            Some("rowhouse_server=debug,tower_http=debug,sqlx=warn".to_string());
    }
    init_logging(&log_config)?;

    info!("Starting Rowhouse server");

    let config = Config::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        backend = ?config.ingest.backend,
        max_concurrent_jobs = config.ingest.max_concurrent_jobs,
        "Configuration loaded"
    );

    rowhouse_server::serve(config).await
}
