//! Path utilities for atelier
//!
//! Config, state, data and runtime directories following the XDG base
//! directory layout, plus the asset and bridging-script directories.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Application identifier for XDG directories
const APP_NAME: &str = "atelier";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the runtime directory
///
/// Location: `$XDG_RUNTIME_DIR/atelier`, `/tmp/atelier-$UID` on other Unix
/// systems, `%TEMP%\atelier` on Windows.
pub fn runtime_dir() -> PathBuf {
    if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(xdg_runtime).join(APP_NAME);
    }
    fallback_runtime_dir()
}

#[cfg(unix)]
fn fallback_runtime_dir() -> PathBuf {
    // SAFETY: getuid() is always safe to call
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/{}-{}", APP_NAME, uid))
}

#[cfg(not(unix))]
fn fallback_runtime_dir() -> PathBuf {
    std::env::temp_dir().join(APP_NAME)
}

/// Directory for temporary bridging scripts
///
/// Location: `<runtime dir>/scripts`
pub fn scripts_dir() -> PathBuf {
    runtime_dir().join("scripts")
}

/// Get the configuration directory
///
/// Location: `$XDG_CONFIG_HOME/atelier` or `~/.config/atelier`
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(fallback_config_dir)
}

/// Get the main configuration file path
///
/// Location: `$XDG_CONFIG_HOME/atelier/config.toml`
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the persisted settings record (credentials, tool install paths)
///
/// Location: `$XDG_CONFIG_HOME/atelier/settings.json`
pub fn settings_file() -> PathBuf {
    config_dir().join("settings.json")
}

/// Get the state directory
///
/// Location: `$XDG_STATE_HOME/atelier` or `~/.local/state/atelier`
pub fn state_dir() -> PathBuf {
    project_dirs()
        .and_then(|p| p.state_dir().map(|d| d.to_path_buf()))
        .unwrap_or_else(fallback_state_dir)
}

/// Get the data directory
///
/// Location: `$XDG_DATA_HOME/atelier` or `~/.local/share/atelier`
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(fallback_data_dir)
}

/// Default root of generated assets served by the asset server
///
/// Location: `$XDG_DATA_HOME/atelier/assets`
pub fn assets_dir() -> PathBuf {
    data_dir().join("assets")
}

/// Get the log directory
///
/// Location: `$XDG_STATE_HOME/atelier/log`
pub fn log_dir() -> PathBuf {
    state_dir().join("log")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Ensure all required directories exist
pub fn ensure_all_dirs() -> std::io::Result<()> {
    ensure_dir(&config_dir())?;
    ensure_dir(&state_dir())?;
    ensure_dir(&data_dir())?;
    ensure_dir(&assets_dir())?;
    ensure_dir(&log_dir())?;
    Ok(())
}

// Fallback implementations when ProjectDirs is unavailable

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir())
}

fn fallback_config_dir() -> PathBuf {
    home_dir().join(".config").join(APP_NAME)
}

fn fallback_state_dir() -> PathBuf {
    home_dir().join(".local").join("state").join(APP_NAME)
}

fn fallback_data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join(APP_NAME)
}
