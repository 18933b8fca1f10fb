//! Tool Invocation Façade
//!
//! Maps a `(tool, action)` pair onto one external side effect and turns the
//! result into `TOOL_STATUS` envelopes. Every dispatched invocation runs on
//! its own task and ends with exactly one terminal status: the handler's
//! `Ok` becomes `COMPLETED`, its `Err` (or a panic) becomes `ERROR`.
//! Unhandled pairs are logged and get no response.

mod apps;
pub mod discovery;
mod error;
pub mod generation;
pub mod launcher;
pub mod script;
pub mod sink;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use atelier_protocol::ToolRequest;

use crate::config::{ConfigHandle, SettingsStore};
use crate::observability::Metrics;

pub use error::ToolError;
pub use generation::{GenerationKind, Scheduler, TokioScheduler};
pub use launcher::{CommandSpec, Launcher, ProcessOutput, SystemLauncher};
pub use sink::{Delivery, Outcome, RegistrySink, Reporter, StatusSink};

/// Collaborators available to every tool handler
pub struct ToolContext {
    pub config: ConfigHandle,
    pub settings: Arc<SettingsStore>,
    pub launcher: Arc<dyn Launcher>,
    pub scheduler: Arc<dyn Scheduler>,
}

/// Future returned by a tool handler
pub type ToolFuture = BoxFuture<'static, Result<Outcome, ToolError>>;

/// Entry of the dispatch table
pub type Handler = fn(Arc<ToolContext>, ToolRequest, Reporter) -> ToolFuture;

/// Dispatch table plus the invocation boundary
pub struct ToolFacade {
    ctx: Arc<ToolContext>,
    table: HashMap<&'static str, HashMap<&'static str, Handler>>,
    metrics: Arc<Metrics>,
}

impl ToolFacade {
    /// Façade with the standard dispatch table
    pub fn new(ctx: ToolContext, metrics: Arc<Metrics>) -> Self {
        let mut facade = Self {
            ctx: Arc::new(ctx),
            table: HashMap::new(),
            metrics,
        };
        facade.register_standard_tools();
        facade
    }

    fn register_standard_tools(&mut self) {
        self.register("figma", "launch", |ctx, _, rep| apps::launch_figma(ctx, rep).boxed());
        self.register("figma", "create_layout", |_, req, _| {
            apps::create_layout(req).boxed()
        });
        self.register("premiere", "launch", |ctx, _, rep| {
            apps::launch_app(ctx, &discovery::PREMIERE, rep).boxed()
        });
        self.register("premiere", "create_script", |_, _, _| {
            apps::create_cut_list().boxed()
        });
        self.register("after_effects", "launch", |ctx, _, rep| {
            apps::launch_app(ctx, &discovery::AFTER_EFFECTS, rep).boxed()
        });
        self.register("after_effects", "apply_motion", |_, req, _| {
            apps::apply_motion(req).boxed()
        });
        self.register("photoshop", "launch", |ctx, _, rep| {
            apps::launch_app(ctx, &discovery::PHOTOSHOP, rep).boxed()
        });
        self.register("photoshop", "execute_script", |ctx, req, rep| {
            script::execute_script(ctx, req, rep).boxed()
        });
        self.register("image_gen", "launch", |ctx, req, rep| {
            generation::simulate(ctx, GenerationKind::Image, req, rep).boxed()
        });
        self.register("animation_gen", "launch", |ctx, req, rep| {
            generation::simulate(ctx, GenerationKind::Animation, req, rep).boxed()
        });
        self.register("settings", "save", |ctx, req, rep| {
            apps::save_settings(ctx, req, rep).boxed()
        });
    }

    /// Add or replace a handler
    pub fn register(&mut self, tool: &'static str, action: &'static str, handler: Handler) {
        self.table.entry(tool).or_default().insert(action, handler);
    }

    fn lookup(&self, tool: &str, action: &str) -> Option<Handler> {
        self.table.get(tool)?.get(action).copied()
    }

    /// Whether a handler exists for the pair
    pub fn handles(&self, tool: &str, action: &str) -> bool {
        self.lookup(tool, action).is_some()
    }

    /// All registered pairs, sorted
    pub fn actions(&self) -> Vec<(&'static str, &'static str)> {
        let mut pairs: Vec<_> = self
            .table
            .iter()
            .flat_map(|(tool, actions)| actions.keys().map(move |action| (*tool, *action)))
            .collect();
        pairs.sort();
        pairs
    }

    /// Start an invocation
    ///
    /// Returns the invocation task, or `None` when no handler matches. The
    /// task is never cancelled by the requester going away.
    pub fn invoke(&self, request: ToolRequest, sink: Arc<dyn StatusSink>) -> Option<JoinHandle<()>> {
        let Some(handler) = self.lookup(&request.tool, &request.action) else {
            warn!(
                "No handler for tool '{}' action '{}'",
                request.tool, request.action
            );
            self.metrics.record_unhandled_tool();
            return None;
        };

        self.metrics.record_invocation(&request.tool, &request.action);

        let invocation = Uuid::new_v4();
        let span = info_span!(
            "tool",
            %invocation,
            tool = %request.tool,
            action = %request.action
        );
        let reporter = Reporter::new(request.tool.clone(), sink);
        let ctx = Arc::clone(&self.ctx);
        let metrics = Arc::clone(&self.metrics);

        let task = async move {
            info!("Invocation started");
            let result = AssertUnwindSafe(handler(ctx, request, reporter.clone()))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(ToolError::Internal("handler panicked".into())));

            match result {
                Ok(outcome) => {
                    info!("Invocation completed: {}", outcome.message);
                    reporter.completed(outcome);
                }
                Err(e) => {
                    warn!("Invocation failed: {}", e);
                    metrics.record_tool_error();
                    reporter.failed(e.to_string());
                }
            }
        };

        Some(tokio::spawn(task.instrument(span)))
    }
}


#[cfg(test)]
mod tests {
    use super::launcher::testing::LaunchCall;
    use super::testing::*;
    use super::*;
    use crate::registry::Frame;
    use atelier_protocol::{decode_str, Envelope, MessageKind, ToolState, ToolStatus};
    use serde_json::json;
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    fn status_of(frame: &Frame) -> ToolStatus {
        let env = decode_str(frame.as_str()).unwrap();
        assert_eq!(env.kind(), MessageKind::ToolStatus);
        ToolStatus::from_payload(&env.payload).unwrap()
    }

    fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<Envelope> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(decode_str(frame.as_str()).unwrap());
        }
        out
    }

    async fn run(facade: &ToolFacade, request: ToolRequest, sink: Arc<dyn StatusSink>) {
        facade.invoke(request, sink).expect("handled").await.unwrap();
    }

    #[test]
    fn test_standard_table() {
        let dir = tempdir().unwrap();
        let (ctx, _) = fake_context(test_config(dir.path()));
        let facade = ToolFacade::new(ctx, Arc::new(Metrics::new()));

        assert_eq!(facade.actions().len(), 11);
        assert!(facade.handles("photoshop", "execute_script"));
        assert!(facade.handles("settings", "save"));
        assert!(!facade.handles("photoshop", "explode"));
        assert!(!facade.handles("", ""));
    }

    #[tokio::test]
    async fn test_unhandled_pair_gets_no_response() {
        let dir = tempdir().unwrap();
        let (ctx, launcher) = fake_context(test_config(dir.path()));
        let metrics = Arc::new(Metrics::new());
        let facade = ToolFacade::new(ctx, Arc::clone(&metrics));
        let (registry, id, mut rx) = connected_registry();

        let handle = facade.invoke(
            ToolRequest::new("blender", "launch", json!({})),
            Arc::new(RegistrySink::new(registry, Some(id))),
        );

        assert!(handle.is_none());
        assert!(rx.try_recv().is_err());
        assert!(launcher.calls().is_empty());
        assert_eq!(
            metrics
                .unhandled_tools_total
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_photoshop_missing_yields_single_error_and_no_spawn() {
        let dir = tempdir().unwrap();
        let (ctx, launcher) = fake_context(test_config(dir.path()));
        let facade = ToolFacade::new(ctx, Arc::new(Metrics::new()));
        let (registry, id, mut rx) = connected_registry();

        run(
            &facade,
            ToolRequest::new("photoshop", "launch", json!({})),
            Arc::new(RegistrySink::new(registry, Some(id))),
        )
        .await;

        let envelopes = drain(&mut rx);
        assert_eq!(envelopes.len(), 1);
        let status = ToolStatus::from_payload(&envelopes[0].payload).unwrap();
        assert_eq!(status.tool, "photoshop");
        assert_eq!(status.status, ToolState::Error);
        assert!(status.message.contains("Photoshop"));
        assert!(launcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_photoshop_launch_from_configured_path() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let exe = dir.path().join("ps").join("Photoshop.exe");
        std::fs::create_dir_all(exe.parent().unwrap()).unwrap();
        std::fs::write(&exe, b"").unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            json!({"photoshopPath": dir.path().join("ps")}).to_string(),
        )
        .unwrap();

        let (ctx, launcher) = fake_context(config);
        let facade = ToolFacade::new(ctx, Arc::new(Metrics::new()));
        let (registry, id, mut rx) = connected_registry();

        run(
            &facade,
            ToolRequest::new("photoshop", "launch", json!({})),
            Arc::new(RegistrySink::new(registry, Some(id))),
        )
        .await;

        assert_eq!(status_of(&rx.try_recv().unwrap()).status, ToolState::Running);
        assert_eq!(status_of(&rx.try_recv().unwrap()).status, ToolState::Completed);
        assert!(rx.try_recv().is_err());
        assert_eq!(launcher.calls(), vec![LaunchCall::Spawn(exe)]);
    }

    #[tokio::test]
    async fn test_figma_launch_falls_back_to_web() {
        let dir = tempdir().unwrap();
        let launcher = Arc::new(super::launcher::testing::FakeLauncher {
            failing_urls: vec![apps::FIGMA_APP_URL.into()],
            ..super::launcher::testing::FakeLauncher::new()
        });
        let ctx = context(
            test_config(dir.path()),
            launcher.clone(),
            Arc::new(ImmediateScheduler),
        );
        let facade = ToolFacade::new(ctx, Arc::new(Metrics::new()));
        let (registry, id, mut rx) = connected_registry();

        run(
            &facade,
            ToolRequest::new("figma", "launch", json!({})),
            Arc::new(RegistrySink::new(registry, Some(id))),
        )
        .await;

        assert_eq!(
            launcher.calls(),
            vec![
                LaunchCall::Open(apps::FIGMA_APP_URL.into()),
                LaunchCall::Open(apps::FIGMA_WEB_URL.into()),
            ]
        );
        assert_eq!(status_of(&rx.try_recv().unwrap()).status, ToolState::Running);
        assert_eq!(status_of(&rx.try_recv().unwrap()).status, ToolState::Completed);
    }

    #[tokio::test]
    async fn test_figma_launch_both_targets_fail() {
        let dir = tempdir().unwrap();
        let launcher = Arc::new(super::launcher::testing::FakeLauncher {
            failing_urls: vec![apps::FIGMA_APP_URL.into(), apps::FIGMA_WEB_URL.into()],
            ..super::launcher::testing::FakeLauncher::new()
        });
        let ctx = context(test_config(dir.path()), launcher, Arc::new(ImmediateScheduler));
        let facade = ToolFacade::new(ctx, Arc::new(Metrics::new()));
        let (registry, id, mut rx) = connected_registry();

        run(
            &facade,
            ToolRequest::new("figma", "launch", json!({})),
            Arc::new(RegistrySink::new(registry, Some(id))),
        )
        .await;

        let statuses: Vec<_> = drain(&mut rx)
            .iter()
            .map(|e| ToolStatus::from_payload(&e.payload).unwrap().status)
            .collect();
        assert_eq!(statuses, vec![ToolState::Running, ToolState::Error]);
    }

    #[tokio::test]
    async fn test_create_layout_message_uses_layout_name() {
        let dir = tempdir().unwrap();
        let (ctx, _) = fake_context(test_config(dir.path()));
        let facade = ToolFacade::new(ctx, Arc::new(Metrics::new()));
        let (registry, id, mut rx) = connected_registry();

        // Legacy `payload` carrier
        let request = ToolRequest::from_payload(&json!({
            "tool": "figma",
            "action": "create_layout",
            "payload": {"layout": "Landing"}
        }));
        run(&facade, request, Arc::new(RegistrySink::new(registry, Some(id)))).await;

        let status = status_of(&rx.try_recv().unwrap());
        assert_eq!(status.status, ToolState::Completed);
        assert!(status.message.contains("'Landing'"));
    }

    #[tokio::test]
    async fn test_settings_save_persists_and_rejects_non_object() {
        let dir = tempdir().unwrap();
        let (ctx, _) = fake_context(test_config(dir.path()));
        let settings = Arc::clone(&ctx.settings);
        let facade = ToolFacade::new(ctx, Arc::new(Metrics::new()));
        let (registry, id, mut rx) = connected_registry();
        let sink: Arc<dyn StatusSink> = Arc::new(RegistrySink::new(registry, Some(id)));

        run(
            &facade,
            ToolRequest::new("settings", "save", json!({"figmaPat": "pat-1"})),
            Arc::clone(&sink),
        )
        .await;
        let statuses: Vec<_> = drain(&mut rx)
            .iter()
            .map(|e| ToolStatus::from_payload(&e.payload).unwrap().status)
            .collect();
        assert_eq!(statuses, vec![ToolState::Saving, ToolState::Completed]);
        assert_eq!(settings.get_str("figmaPat").as_deref(), Some("pat-1"));
        assert!(dir.path().join("settings.json").is_file());

        run(
            &facade,
            ToolRequest::new("settings", "save", json!("nope")),
            sink,
        )
        .await;
        let envelopes = drain(&mut rx);
        assert_eq!(envelopes.len(), 1);
        assert_eq!(
            ToolStatus::from_payload(&envelopes[0].payload).unwrap().status,
            ToolState::Error
        );
    }

    #[tokio::test]
    async fn test_panicking_handler_still_terminates() {
        let dir = tempdir().unwrap();
        let (ctx, _) = fake_context(test_config(dir.path()));
        let metrics = Arc::new(Metrics::new());
        let mut facade = ToolFacade::new(ctx, Arc::clone(&metrics));
        facade.register("broken", "launch", |_, _, _| {
            async { panic!("boom") }.boxed()
        });
        let (registry, id, mut rx) = connected_registry();

        run(
            &facade,
            ToolRequest::new("broken", "launch", json!({})),
            Arc::new(RegistrySink::new(registry, Some(id))),
        )
        .await;

        let status = status_of(&rx.try_recv().unwrap());
        assert_eq!(status.status, ToolState::Error);
        assert_eq!(
            metrics
                .tool_errors_total
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_invocation_survives_origin_disconnect() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::write(dir.path().join("assets").join("frame.png"), b"png").unwrap();
        let (ctx, _) = fake_context(config);
        let facade = ToolFacade::new(ctx, Arc::new(Metrics::new()));

        let (registry, origin, origin_rx) = connected_registry();
        let (tx, mut other_rx) = mpsc::channel(8);
        registry.register(tx, None);
        drop(origin_rx);
        registry.unregister(origin);

        run(
            &facade,
            ToolRequest::new("image_gen", "launch", json!({})),
            Arc::new(RegistrySink::new(registry, Some(origin))),
        )
        .await;

        let kinds: Vec<_> = drain(&mut other_rx).iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![MessageKind::PreviewUpdate, MessageKind::ToolStatus]);
    }
}
