//! Bridge lifecycle
//!
//! [`BridgeState`] is the shared state every connection and listener task
//! holds. [`Bridge`] owns the two listeners: `start` binds both before any
//! task is spawned, so a bind failure leaves nothing half-running, and a
//! second `start` while running is a no-op that reports the live addresses.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use atelier_utils::{AtelierError, Result};

use crate::assets;
use crate::config::{config_handle, AppConfig, ConfigHandle, SettingsStore};
use crate::handlers::Router;
use crate::observability::Metrics;
use crate::registry::ConnectionRegistry;
use crate::tools::{Launcher, Scheduler, SystemLauncher, TokioScheduler, ToolContext, ToolFacade};
use crate::transport;

/// How long `shutdown` waits for each listener task
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// State shared by all bridge tasks
pub struct BridgeState {
    pub config: ConfigHandle,
    pub settings: Arc<SettingsStore>,
    pub registry: Arc<ConnectionRegistry>,
    pub router: Router,
    pub metrics: Arc<Metrics>,
    /// Shutdown signal sender
    pub shutdown_tx: broadcast::Sender<()>,
}

impl BridgeState {
    pub fn new(
        config: AppConfig,
        settings: Arc<SettingsStore>,
        launcher: Arc<dyn Launcher>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let config = config_handle(config);
        let metrics = Arc::new(Metrics::new());
        let registry = Arc::new(ConnectionRegistry::new());

        let ctx = ToolContext {
            config: Arc::clone(&config),
            settings: Arc::clone(&settings),
            launcher,
            scheduler,
        };
        let facade = Arc::new(ToolFacade::new(ctx, Arc::clone(&metrics)));
        let router = Router::new(Arc::clone(&registry), facade, Arc::clone(&metrics));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            settings,
            registry,
            router,
            metrics,
            shutdown_tx,
        }
    }

    /// Subscribe to shutdown signal
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }
}

/// Addresses the listeners actually bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAddrs {
    pub bridge: SocketAddr,
    pub assets: SocketAddr,
}

/// Result of [`Bridge::start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(BoundAddrs),
    AlreadyRunning(BoundAddrs),
}

impl StartOutcome {
    pub fn addrs(&self) -> BoundAddrs {
        match self {
            Self::Started(addrs) | Self::AlreadyRunning(addrs) => *addrs,
        }
    }
}

struct Running {
    addrs: BoundAddrs,
    tasks: Vec<JoinHandle<()>>,
}

/// WebSocket bridge plus asset server
pub struct Bridge {
    state: Arc<BridgeState>,
    running: Mutex<Option<Running>>,
}

impl Bridge {
    /// Bridge with the system launcher and real timers
    pub fn new(config: AppConfig, settings: Arc<SettingsStore>) -> Self {
        Self::with_state(BridgeState::new(
            config,
            settings,
            Arc::new(SystemLauncher),
            Arc::new(TokioScheduler),
        ))
    }

    pub fn with_state(state: BridgeState) -> Self {
        Self {
            state: Arc::new(state),
            running: Mutex::new(None),
        }
    }

    pub fn state(&self) -> &Arc<BridgeState> {
        &self.state
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Bind both listeners and start serving
    pub async fn start(&self) -> Result<StartOutcome> {
        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            info!("Bridge already running on ws://{}", current.addrs.bridge);
            return Ok(StartOutcome::AlreadyRunning(current.addrs));
        }

        let (bridge_addr, asset_addr) = {
            let config = self.state.config.load();
            (config.bridge.bind_addr(), config.assets.bind_addr())
        };

        let bridge_listener = bind(&bridge_addr).await?;
        let asset_listener = bind(&asset_addr).await?;
        let addrs = BoundAddrs {
            bridge: bridge_listener.local_addr()?,
            assets: asset_listener.local_addr()?,
        };

        self.publish_asset_port(addrs.assets.port());

        let root = self.state.config.load().assets.root_dir();
        if let Err(e) = tokio::fs::create_dir_all(&root).await {
            warn!("Failed to create asset root {}: {}", root.display(), e);
        }

        // Subscribed before spawning so an immediate shutdown is not missed
        let tasks = vec![
            tokio::spawn(transport::run_accept_loop(
                bridge_listener,
                Arc::clone(&self.state),
                self.state.subscribe_shutdown(),
            )),
            tokio::spawn(assets::run_asset_server(
                asset_listener,
                Arc::clone(&self.state),
                self.state.subscribe_shutdown(),
            )),
        ];

        info!(
            "Bridge started: ws://{} assets http://{}",
            addrs.bridge, addrs.assets
        );
        *running = Some(Running { addrs, tasks });
        Ok(StartOutcome::Started(addrs))
    }

    /// Signal every task to stop and wait for the listeners
    pub async fn shutdown(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };

        info!("Shutting down bridge");
        let _ = self.state.shutdown_tx.send(());

        for task in running.tasks {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                warn!("Listener task did not stop within {:?}", SHUTDOWN_GRACE);
            }
        }
    }

    /// Asset URLs must name the port actually bound when port 0 was asked for
    fn publish_asset_port(&self, bound: u16) {
        let config = self.state.config.load_full();
        if config.assets.port == bound || config.assets.public_base_url.is_some() {
            return;
        }
        let mut updated = (*config).clone();
        updated.assets.port = bound;
        self.state.config.store(Arc::new(updated));
    }
}

async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| AtelierError::Bind {
            addr: addr.to_string(),
            source,
        })
}
