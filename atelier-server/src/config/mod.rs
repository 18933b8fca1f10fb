//! Configuration management for the atelier bridge
//!
//! The application config is TOML and held behind an `ArcSwap` so handlers
//! can read it without locking. The settings record (credentials, install
//! paths) is a separate JSON store that tool actions may update.

mod defaults;
mod loader;
mod schema;
mod settings;

pub use defaults::DEFAULT_CONFIG_TOML;
pub use loader::ConfigLoader;
pub use schema::*;
pub use settings::{
    SettingsStore, AFTER_EFFECTS_PATH_KEY, PHOTOSHOP_PATH_KEY, PREMIERE_PATH_KEY,
};

use arc_swap::ArcSwap;
use std::sync::Arc;

/// Shared configuration handle
pub type ConfigHandle = Arc<ArcSwap<AppConfig>>;

/// Create a new config handle with defaults
pub fn new_config_handle() -> ConfigHandle {
    Arc::new(ArcSwap::from_pointee(AppConfig::default()))
}

/// Create a config handle from a loaded config
pub fn config_handle(config: AppConfig) -> ConfigHandle {
    Arc::new(ArcSwap::from_pointee(config))
}
