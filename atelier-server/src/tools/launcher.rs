//! External process and URL launching

use std::path::Path;
use std::process::Stdio;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::ToolError;

/// A process to run to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

/// Result of a process run to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub success: bool,
    /// Human-readable exit status ("exit code 1", "signal")
    pub status: String,
    pub stderr: String,
}

/// Side-effecting process capabilities used by tool handlers
pub trait Launcher: Send + Sync {
    /// Open a URL or protocol link with the desktop's default handler
    fn open_url<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), ToolError>>;

    /// Start an executable without waiting for it
    fn spawn_detached<'a>(&'a self, program: &'a Path) -> BoxFuture<'a, Result<(), ToolError>>;

    /// Run a process and wait for it to exit
    fn run<'a>(&'a self, command: &'a CommandSpec) -> BoxFuture<'a, Result<ProcessOutput, ToolError>>;
}

/// [`Launcher`] that spawns real processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

#[cfg(windows)]
fn opener(url: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "", url]);
    cmd
}

#[cfg(target_os = "macos")]
fn opener(url: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(not(any(windows, target_os = "macos")))]
fn opener(url: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
}

impl Launcher for SystemLauncher {
    fn open_url<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), ToolError>> {
        async move {
            let mut cmd = opener(url);
            let program = cmd.as_std().get_program().to_string_lossy().into_owned();
            let status = cmd
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .map_err(|source| ToolError::Spawn { program, source })?;

            if status.success() {
                debug!("Opened {}", url);
                Ok(())
            } else {
                warn!("Opening {} failed with {}", url, status);
                Err(ToolError::Open {
                    target: url.to_string(),
                })
            }
        }
        .boxed()
    }

    fn spawn_detached<'a>(&'a self, program: &'a Path) -> BoxFuture<'a, Result<(), ToolError>> {
        async move {
            let mut child = Command::new(program)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|source| ToolError::Spawn {
                    program: program.display().to_string(),
                    source,
                })?;

            debug!("Spawned {} (pid {:?})", program.display(), child.id());

            // Reap the child whenever it exits
            let name = program.display().to_string();
            tokio::spawn(async move {
                match child.wait().await {
                    Ok(status) => debug!("{} exited with {}", name, status),
                    Err(e) => warn!("Failed to wait for {}: {}", name, e),
                }
            });
            Ok(())
        }
        .boxed()
    }

    fn run<'a>(&'a self, command: &'a CommandSpec) -> BoxFuture<'a, Result<ProcessOutput, ToolError>> {
        async move {
            let output = Command::new(&command.program)
                .args(&command.args)
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|source| ToolError::Spawn {
                    program: command.program.clone(),
                    source,
                })?;

            let status = match output.status.code() {
                Some(code) => format!("exit code {}", code),
                None => "signal".to_string(),
            };

            Ok(ProcessOutput {
                success: output.status.success(),
                status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
        .boxed()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::PathBuf;

    use parking_lot::Mutex;

    use super::*;

    /// Call recorded by [`FakeLauncher`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum LaunchCall {
        Open(String),
        Spawn(PathBuf),
        Run(CommandSpec),
    }

    /// Launcher that records calls instead of spawning anything
    #[derive(Default)]
    pub struct FakeLauncher {
        pub calls: Mutex<Vec<LaunchCall>>,
        /// URLs whose open attempt fails
        pub failing_urls: Vec<String>,
        pub run_success: bool,
    }

    impl FakeLauncher {
        pub fn new() -> Self {
            Self {
                run_success: true,
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Vec<LaunchCall> {
            self.calls.lock().clone()
        }
    }

    impl Launcher for FakeLauncher {
        fn open_url<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), ToolError>> {
            self.calls.lock().push(LaunchCall::Open(url.to_string()));
            let failed = self.failing_urls.iter().any(|u| u == url);
            async move {
                if failed {
                    Err(ToolError::Open {
                        target: url.to_string(),
                    })
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn spawn_detached<'a>(&'a self, program: &'a Path) -> BoxFuture<'a, Result<(), ToolError>> {
            self.calls.lock().push(LaunchCall::Spawn(program.to_path_buf()));
            async { Ok(()) }.boxed()
        }

        fn run<'a>(&'a self, command: &'a CommandSpec) -> BoxFuture<'a, Result<ProcessOutput, ToolError>> {
            self.calls.lock().push(LaunchCall::Run(command.clone()));
            let success = self.run_success;
            async move {
                Ok(ProcessOutput {
                    success,
                    status: if success { "exit code 0" } else { "exit code 1" }.into(),
                    stderr: String::new(),
                })
            }
            .boxed()
        }
    }
}
