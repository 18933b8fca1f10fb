//! atelier-server daemon

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use atelier_server::cli::Args;
use atelier_server::config::{ConfigLoader, SettingsStore};
use atelier_server::{Bridge, StartOutcome};
use atelier_utils::{LogConfig, LogOutput, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut log_config = LogConfig::server();
    if args.log_file_only {
        log_config.output = LogOutput::File;
    }
    atelier_utils::init_logging_with_config(log_config)?;

    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from_path(path)?,
        None => ConfigLoader::load()?,
    };
    args.apply(&mut config);
    ConfigLoader::validate(&config)?;

    if let Err(e) = atelier_utils::ensure_all_dirs() {
        warn!("Failed to create atelier directories: {}", e);
    }

    let settings = Arc::new(SettingsStore::load(config.tools.settings_file()));
    info!("Settings record at {}", settings.path().display());

    let bridge = Bridge::new(config, settings);
    match bridge.start().await? {
        StartOutcome::Started(addrs) | StartOutcome::AlreadyRunning(addrs) => {
            info!(
                "atelier bridge ready: ws://{} (assets http://{})",
                addrs.bridge, addrs.assets
            );
        }
    }

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received");
    bridge.shutdown().await;

    Ok(())
}
