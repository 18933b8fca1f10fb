//! Tool façade errors
//!
//! A `ToolError` never reaches the transport. The façade renders it into
//! the `message` of a terminal `ERROR` status.

use std::path::PathBuf;

use atelier_utils::AtelierError;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{app} could not be found. Check that it is installed or set its path in settings.")]
    NotFound { app: String },

    #[error("Request is missing `{0}`")]
    MissingField(&'static str),

    #[error("Script not found: {}", .0.display())]
    ScriptMissing(PathBuf),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {status}{}", stderr_suffix(.stderr))]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Could not open {target}")]
    Open { target: String },

    #[error("No generated {kind} found in {}", .root.display())]
    NoAsset { kind: &'static str, root: PathBuf },

    #[error("Invalid request data: {0}")]
    InvalidData(String),

    #[error("Failed to save settings: {0}")]
    Settings(#[from] AtelierError),

    #[error("Bridging script error: {0}")]
    Scratch(#[from] std::io::Error),

    #[error("Tool task failed: {0}")]
    Internal(String),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}
