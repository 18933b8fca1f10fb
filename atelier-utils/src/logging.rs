//! Logging infrastructure for atelier
//!
//! Provides unified logging setup using the tracing ecosystem.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{paths, AtelierError, Result};

/// Environment variable holding the log filter
pub const LOG_ENV_VAR: &str = "ATELIER_LOG";

/// Log output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Log to stderr (for the CLI)
    Stderr,
    /// Log to file
    File,
    /// Log to both stderr and file (for the bridge daemon)
    Both,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output destination
    pub output: LogOutput,
    /// Log level filter (e.g., "info", "atelier_server=debug,hyper=warn")
    pub filter: String,
    /// Include span events (enter/exit)
    pub span_events: bool,
    /// Include file/line in logs
    pub file_line: bool,
    /// Optional custom log file name (defaults to "atelier.log")
    pub file_name: Option<String>,
    /// Optional log directory (defaults to [`paths::log_dir`])
    pub dir: Option<PathBuf>,
    /// Start a fresh log file instead of appending
    pub truncate_on_start: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "info".into(),
            span_events: false,
            file_line: false,
            file_name: None,
            dir: None,
            truncate_on_start: false,
        }
    }
}

impl LogConfig {
    /// Config for the bridge daemon (stderr plus a per-run log file)
    pub fn server() -> Self {
        Self {
            output: LogOutput::Both,
            filter: filter_from_env(LOG_ENV_VAR, "info"),
            span_events: false,
            file_line: true,
            file_name: None,
            dir: None,
            truncate_on_start: true,
        }
    }

    /// Config for the one-shot CLI
    pub fn cli() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: filter_from_env(LOG_ENV_VAR, "warn"),
            ..Default::default()
        }
    }

    /// Full path of the log file this config writes to
    pub fn log_path(&self) -> PathBuf {
        let dir = self.dir.clone().unwrap_or_else(paths::log_dir);
        dir.join(self.file_name.as_deref().unwrap_or("atelier.log"))
    }
}

fn filter_from_env(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.into())
}

/// Initialize logging with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(LogConfig::default())
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| AtelierError::config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    let fmt_layer = if config.span_events {
        fmt_layer.with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    } else {
        fmt_layer
    };

    let fmt_layer = if config.file_line {
        fmt_layer.with_file(true).with_line_number(true)
    } else {
        fmt_layer.with_file(false).with_line_number(false)
    };

    match config.output {
        LogOutput::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| AtelierError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::File => {
            let file = open_log_file(&config)?;

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(file).with_ansi(false))
                .try_init()
                .map_err(|e| AtelierError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::Both => {
            let file = open_log_file(&config)?;

            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .with(file_layer)
                .try_init()
                .map_err(|e| AtelierError::internal(format!("Failed to init logging: {}", e)))?;
        }
    }

    Ok(())
}

/// Open (and optionally reset) the log file described by `config`
pub fn open_log_file(config: &LogConfig) -> Result<File> {
    let log_path = config.log_path();
    if let Some(log_dir) = log_path.parent() {
        std::fs::create_dir_all(log_dir).map_err(|e| AtelierError::FileWrite {
            path: log_dir.to_path_buf(),
            source: e,
        })?;
    }

    let mut options = OpenOptions::new();
    options.create(true);
    if config.truncate_on_start {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }

    let mut file = options.open(&log_path).map_err(|e| AtelierError::FileWrite {
        path: log_path.clone(),
        source: e,
    })?;

    if config.truncate_on_start {
        let started = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        writeln!(file, "--- Session started (unix {}) ---", started).map_err(|e| {
            AtelierError::FileWrite {
                path: log_path,
                source: e,
            }
        })?;
    }

    Ok(file)
}
