//! Command-line arguments for the bridge daemon

use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;

/// atelier-server - local message bridge and asset server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config file (default: `<config dir>/config.toml`)
    #[arg(long, short = 'c', env = "ATELIER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Interface both listeners bind to
    #[arg(long)]
    pub host: Option<String>,

    /// WebSocket bridge port
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Asset server port
    #[arg(long)]
    pub asset_port: Option<u16>,

    /// Directory served under /assets/
    #[arg(long)]
    pub asset_root: Option<PathBuf>,

    /// Base of the URLs placed in asset references
    ///
    /// Example: http://192.168.0.10:8081
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Log only to the log file, not stderr
    #[arg(long, default_value_t = false)]
    pub log_file_only: bool,
}

impl Args {
    /// Overlay command-line values on a loaded config
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.bridge.host = host.clone();
            config.assets.host = host.clone();
        }
        if let Some(port) = self.port {
            config.bridge.port = port;
        }
        if let Some(port) = self.asset_port {
            config.assets.port = port;
        }
        if let Some(root) = &self.asset_root {
            config.assets.root = Some(root.clone());
        }
        if let Some(url) = &self.public_base_url {
            config.assets.public_base_url = Some(url.clone());
        }
    }
}
