//! Configuration schema structs

use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

use atelier_protocol::{DEFAULT_ASSET_PORT, DEFAULT_BRIDGE_PORT};
use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bridge: BridgeConfig,
    pub assets: AssetsConfig,
    pub tools: ToolsConfig,
}

/// WebSocket message channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    /// Outbound frames buffered per connection
    pub outbound_queue: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_BRIDGE_PORT,
            outbound_queue: 256,
        }
    }
}

impl BridgeConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Asset HTTP server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub host: String,
    pub port: u16,
    /// Directory served under `/assets/` (default: `<data dir>/assets`)
    pub root: Option<PathBuf>,
    /// Base of the URLs placed in asset references
    pub public_base_url: Option<String>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_ASSET_PORT,
            root: None,
            public_base_url: None,
        }
    }
}

impl AssetsConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Effective asset root
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(atelier_utils::assets_dir)
    }

    /// Effective public base URL, without a trailing slash
    pub fn base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }

    /// URL under which the asset server serves `name`, percent-encoded
    pub fn asset_url(&self, name: &str) -> String {
        format!("{}{}", self.base_url(), atelier_protocol::asset_path(name))
    }
}

/// Tool façade settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Well-known installation root scanned during executable discovery
    pub install_root: PathBuf,
    /// Simulated generation duration
    pub generation_delay_ms: u64,
    /// Where bridging scripts are written (default: `<runtime dir>/scripts`)
    pub scratch_dir: Option<PathBuf>,
    /// Settings record location (default: `<config dir>/settings.json`)
    pub settings_file: Option<PathBuf>,
    pub script_host: ScriptHostConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            install_root: default_install_root(),
            generation_delay_ms: 3000,
            scratch_dir: None,
            settings_file: None,
            script_host: ScriptHostConfig::default(),
        }
    }
}

impl ToolsConfig {
    pub fn generation_delay(&self) -> Duration {
        Duration::from_millis(self.generation_delay_ms)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(atelier_utils::scripts_dir)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.settings_file
            .clone()
            .unwrap_or_else(atelier_utils::settings_file)
    }
}

#[cfg(windows)]
fn default_install_root() -> PathBuf {
    PathBuf::from(r"C:\Program Files\Adobe")
}

#[cfg(target_os = "macos")]
fn default_install_root() -> PathBuf {
    PathBuf::from("/Applications")
}

#[cfg(not(any(windows, target_os = "macos")))]
fn default_install_root() -> PathBuf {
    PathBuf::from("/opt/adobe")
}

/// Placeholder replaced by the target script path in [`ScriptHostConfig::template`]
pub const SCRIPT_PLACEHOLDER: &str = "{script}";

/// String literal the placeholder sits in, which decides how the path is escaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptQuote {
    /// Inserted verbatim
    #[default]
    None,
    /// VBScript `"..."`: quotes are doubled
    Vbs,
    /// AppleScript `"..."`: backslashes and quotes are backslash-escaped
    AppleScript,
    /// POSIX shell `'...'`: each quote becomes `'\''`
    Shell,
}

impl ScriptQuote {
    pub fn escape<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self {
            Self::None => Cow::Borrowed(value),
            Self::Vbs => Cow::Owned(value.replace('"', "\"\"")),
            Self::AppleScript => Cow::Owned(value.replace('\\', "\\\\").replace('"', "\\\"")),
            Self::Shell => Cow::Owned(value.replace('\'', "'\\''")),
        }
    }
}

/// How the raster editor's own scripting host is reached
///
/// The façade renders `template` into a temporary file with the given
/// `extension` and runs `program args... <file>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptHostConfig {
    pub program: String,
    pub args: Vec<String>,
    pub extension: String,
    pub template: String,
    pub quote: ScriptQuote,
}

#[cfg(windows)]
impl Default for ScriptHostConfig {
    fn default() -> Self {
        Self {
            program: "cscript".into(),
            args: vec!["//nologo".into()],
            extension: "vbs".into(),
            template: concat!(
                "Set app = CreateObject(\"Photoshop.Application\")\r\n",
                "app.DoJavaScriptFile \"{script}\"\r\n",
            )
            .into(),
            quote: ScriptQuote::Vbs,
        }
    }
}

#[cfg(target_os = "macos")]
impl Default for ScriptHostConfig {
    fn default() -> Self {
        Self {
            program: "osascript".into(),
            args: Vec::new(),
            extension: "applescript".into(),
            template: concat!(
                "tell application id \"com.adobe.Photoshop\"\n",
                "  do javascript file (POSIX file \"{script}\")\n",
                "end tell\n",
            )
            .into(),
            quote: ScriptQuote::AppleScript,
        }
    }
}

#[cfg(not(any(windows, target_os = "macos")))]
impl Default for ScriptHostConfig {
    fn default() -> Self {
        Self {
            program: "sh".into(),
            args: Vec::new(),
            extension: "sh".into(),
            template: "echo 'no scripting host configured for {script}' >&2\nexit 1\n".into(),
            quote: ScriptQuote::Shell,
        }
    }
}

impl ScriptHostConfig {
    /// Bridging script contents for `script`
    pub fn render(&self, script: &str) -> String {
        self.template.replace(SCRIPT_PLACEHOLDER, &self.quote.escape(script))
    }
}
