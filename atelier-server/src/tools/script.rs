//! Raster editor script execution
//!
//! The target script is not run directly. A short bridging script that asks
//! the editor's own scripting host to run it is written to the scratch
//! directory, executed, and removed again on every path out.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use atelier_protocol::{ToolRequest, ToolState};

use super::{CommandSpec, Outcome, Reporter, ToolContext, ToolError};
use crate::config::ScriptHostConfig;

/// Write the bridging script for `target` into `dir`
///
/// The file is deleted when the returned handle is dropped.
pub fn write_bridging_script(
    dir: &Path,
    host: &ScriptHostConfig,
    target: &Path,
) -> std::io::Result<NamedTempFile> {
    std::fs::create_dir_all(dir)?;

    let suffix = format!(".{}", host.extension.trim_start_matches('.'));
    let mut file = tempfile::Builder::new()
        .prefix("atelier-bridge-")
        .suffix(&suffix)
        .tempfile_in(dir)?;

    file.write_all(host.render(&target.to_string_lossy()).as_bytes())?;
    file.flush()?;
    debug!("Wrote bridging script {}", file.path().display());

    Ok(file)
}

pub(super) async fn execute_script(
    ctx: Arc<ToolContext>,
    request: ToolRequest,
    reporter: Reporter,
) -> Result<Outcome, ToolError> {
    let target = request
        .data_str("scriptPath")
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .ok_or(ToolError::MissingField("scriptPath"))?;

    match tokio::fs::metadata(&target).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Err(ToolError::ScriptMissing(target)),
    }

    let (host, scratch) = {
        let config = ctx.config.load();
        (
            config.tools.script_host.clone(),
            config.tools.scratch_dir(),
        )
    };

    let script_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| target.display().to_string());
    reporter.progress(ToolState::Running, format!("Running {}...", script_name));

    let bridge = write_bridging_script(&scratch, &host, &target)?;

    let mut args = host.args.clone();
    args.push(bridge.path().to_string_lossy().into_owned());
    let command = CommandSpec {
        program: host.program.clone(),
        args,
    };

    let result = ctx.launcher.run(&command).await;

    if let Err(e) = bridge.close() {
        warn!("Failed to remove bridging script: {}", e);
    }

    let output = result?;
    if output.success {
        Ok(Outcome::reply(format!("{} executed", script_name)))
    } else {
        Err(ToolError::ExitStatus {
            program: host.program,
            status: output.status,
            stderr: output.stderr,
        })
    }
}
