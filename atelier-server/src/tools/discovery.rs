//! Executable discovery for installed desktop applications
//!
//! Resolution order:
//! 1. the path configured in the settings record, where a directory resolves
//!    to the application's default executable inside it;
//! 2. a scan of the well-known install root for subdirectories whose name
//!    contains the display name (case-insensitive), newest (last sorted)
//!    match first.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{AFTER_EFFECTS_PATH_KEY, PHOTOSHOP_PATH_KEY, PREMIERE_PATH_KEY};

/// How one application is found on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppSpec {
    /// Tool identifier in `EXECUTE_TOOL`
    pub tool: &'static str,
    /// Name shown in status messages and matched against install directories
    pub display_name: &'static str,
    /// Executable path relative to the install directory
    pub executable: &'static [&'static str],
    /// Settings key holding an operator-configured path
    pub settings_key: &'static str,
}

impl AppSpec {
    fn executable_in(&self, dir: &Path) -> PathBuf {
        self.executable
            .iter()
            .fold(dir.to_path_buf(), |path, part| path.join(part))
    }
}

pub const PHOTOSHOP: AppSpec = AppSpec {
    tool: "photoshop",
    display_name: "Photoshop",
    executable: &["Photoshop.exe"],
    settings_key: PHOTOSHOP_PATH_KEY,
};

pub const PREMIERE: AppSpec = AppSpec {
    tool: "premiere",
    display_name: "Premiere Pro",
    executable: &["Adobe Premiere Pro.exe"],
    settings_key: PREMIERE_PATH_KEY,
};

pub const AFTER_EFFECTS: AppSpec = AppSpec {
    tool: "after_effects",
    display_name: "After Effects",
    executable: &["Support Files", "After Effects.exe"],
    settings_key: AFTER_EFFECTS_PATH_KEY,
};

/// Resolve an operator-configured path
///
/// A file is taken as is; a directory resolves to the default executable.
pub fn resolve_configured(configured: &Path, app: &AppSpec) -> Option<PathBuf> {
    if configured.is_file() {
        return Some(configured.to_path_buf());
    }
    if configured.is_dir() {
        let exe = app.executable_in(configured);
        if exe.is_file() {
            return Some(exe);
        }
    }
    debug!(
        "Configured {} path {} does not resolve",
        app.display_name,
        configured.display()
    );
    None
}

/// Scan `root` for an install directory of `app`
pub fn scan_install_root(root: &Path, app: &AppSpec) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot scan {}: {}", root.display(), e);
            return None;
        }
    };

    let needle = app.display_name.to_lowercase();
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .to_lowercase()
                .contains(&needle)
        })
        .map(|entry| entry.path())
        .collect();

    candidates.sort();
    candidates
        .iter()
        .rev()
        .map(|dir| app.executable_in(dir))
        .find(|exe| exe.is_file())
}

/// Find the executable of `app`, configured path first
pub fn discover(configured: Option<&Path>, install_root: &Path, app: &AppSpec) -> Option<PathBuf> {
    if let Some(path) = configured.and_then(|c| resolve_configured(c, app)) {
        return Some(path);
    }

    let found = scan_install_root(install_root, app);
    match &found {
        Some(path) => debug!("Discovered {} at {}", app.display_name, path.display()),
        None => warn!(
            "{} not found under {}",
            app.display_name,
            install_root.display()
        ),
    }
    found
}
