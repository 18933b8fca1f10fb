//! Simulated generation jobs
//!
//! Stand-ins for a real generation backend: report `RUNNING`, wait, then
//! publish the newest matching file from the asset root as the result. The
//! wait goes through [`Scheduler`] so tests can make it instant or gate it.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use atelier_protocol::{AssetRef, Envelope, ToolRequest, ToolState};

use super::{Outcome, Reporter, ToolContext, ToolError};

/// Timer used by simulated jobs
pub trait Scheduler: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// [`Scheduler`] backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed()
    }
}

/// What a simulated job produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Image,
    Animation,
}

impl GenerationKind {
    /// Tool identifier in `EXECUTE_TOOL`
    pub fn tool(&self) -> &'static str {
        match self {
            Self::Image => "image_gen",
            Self::Animation => "animation_gen",
        }
    }

    pub fn noun(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Animation => "animation",
        }
    }

    /// File extensions (lowercase) that count as a result
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Image => &["png", "jpg", "jpeg", "gif"],
            Self::Animation => &["mp4"],
        }
    }

    /// Asset-update envelope announcing a result
    pub fn envelope(&self, asset: &AssetRef) -> Envelope {
        match self {
            Self::Image => Envelope::preview_update(asset),
            Self::Animation => Envelope::video_update(asset),
        }
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map(|ext| self.extensions().contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

/// Name of the most recently modified result file directly under `root`
///
/// Ties on modification time go to the greater name.
pub fn newest_asset(root: &Path, kind: GenerationKind) -> Option<String> {
    let entries = std::fs::read_dir(root).ok()?;

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| kind.matches(&entry.path()))
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let name = entry.file_name().into_string().ok()?;
            Some((modified, name))
        })
        .max()
        .map(|(_, name)| name)
}

pub(super) async fn simulate(
    ctx: Arc<ToolContext>,
    kind: GenerationKind,
    request: ToolRequest,
    reporter: Reporter,
) -> Result<Outcome, ToolError> {
    let delay = ctx.config.load().tools.generation_delay();

    let running = match request.data_str("prompt") {
        Some(prompt) => format!("Generating {} for \"{}\"...", kind.noun(), prompt),
        None => format!("Generating {}...", kind.noun()),
    };
    reporter.progress(ToolState::Running, running);

    ctx.scheduler.sleep(delay).await;

    // Read after the delay so the result reflects the current asset root
    let assets = ctx.config.load().assets.clone();
    let root = assets.root_dir();

    let scan_root = root.clone();
    let name = tokio::task::spawn_blocking(move || newest_asset(&scan_root, kind))
        .await
        .map_err(|e| ToolError::Internal(e.to_string()))?
        .ok_or(ToolError::NoAsset {
            kind: kind.noun(),
            root,
        })?;

    let asset = AssetRef::new(assets.asset_url(&name), name.clone());
    debug!("Publishing {} as {}", name, asset.url);
    reporter.publish(kind.envelope(&asset));

    Ok(Outcome::publish(format!("Generated {}: {}", kind.noun(), name)))
}
