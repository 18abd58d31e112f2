use nellie_host::app::{NellieHost, load_config};
use nellie_host::error::NellieHostError;
use nellie_host::logger::initialize as LoggerInitialize;
use nellie_host::paths::HostPaths;

use log::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{e}");
        eprintln!("nellie-host: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), NellieHostError> {
    dotenvy::dotenv().ok();

    let paths = HostPaths::resolve()?;
    paths.ensure()?;

    // Initialize logger FIRST
    LoggerInitialize(&paths.log_dir)?;

    info!("Nellie bridge host starting");
    info!("Log directory: {}", paths.log_dir.display());

    let config = load_config(&paths)?;
    let host = NellieHost::start(paths, &config).await?;

    info!("Bridge host ready on port {}", host.handle().port());

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| NellieHostError::app(format!("Failed to listen for Ctrl+C: {e}")))?;

    host.shutdown().await;
    Ok(())
}
