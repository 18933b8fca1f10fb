//! Typed payloads interpreted by the bridge
//!
//! The codec never validates payloads. Handlers extract what they need through
//! the `from_payload` constructors here, which default every missing or
//! mistyped field instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// State of an in-flight tool operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolState {
    Idle,
    Running,
    Saving,
    Completed,
    Error,
}

impl ToolState {
    /// Wire spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Saving => "SAVING",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        }
    }

    /// `COMPLETED` and `ERROR` end an invocation
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// Payload of a `TOOL_STATUS` envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStatus {
    pub tool: String,
    pub status: ToolState,
    pub message: String,
}

impl ToolStatus {
    pub fn new(tool: impl Into<String>, status: ToolState, message: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            status,
            message: message.into(),
        }
    }

    /// Parse a `TOOL_STATUS` payload, `None` if `status` is not a known state
    pub fn from_payload(payload: &Value) -> Option<Self> {
        serde_json::from_value(payload.clone()).ok()
    }
}

/// Reference to a file served by the asset server
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetRef {
    pub url: String,
    pub name: String,
}

impl AssetRef {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }
}

/// Where an `EXECUTE_TOOL` payload carried its action data
///
/// Current clients send `data`; older scripts nest the same object under
/// `payload`. When both are present and non-null, `data` wins.
#[derive(Debug, Clone, PartialEq)]
pub enum DataCarrier {
    /// `{tool, action, data}`
    Data(Value),
    /// `{tool, action, payload}`
    Legacy(Value),
    /// Neither field present (or both null)
    Absent,
}

impl DataCarrier {
    /// Detect the carrier of an `EXECUTE_TOOL` payload
    pub fn detect(payload: &Value) -> Self {
        let field = |key: &str| payload.get(key).filter(|v| !v.is_null()).cloned();
        match (field("data"), field("payload")) {
            (Some(data), _) => Self::Data(data),
            (None, Some(legacy)) => Self::Legacy(legacy),
            (None, None) => Self::Absent,
        }
    }

    /// Canonical action data, `{}` when absent
    pub fn into_data(self) -> Value {
        match self {
            Self::Data(v) | Self::Legacy(v) => v,
            Self::Absent => Value::Object(Map::new()),
        }
    }
}

/// Canonical form of an `EXECUTE_TOOL` request
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    pub tool: String,
    pub action: String,
    pub data: Value,
}

impl ToolRequest {
    pub fn new(tool: impl Into<String>, action: impl Into<String>, data: Value) -> Self {
        Self {
            tool: tool.into(),
            action: action.into(),
            data,
        }
    }

    /// Normalize a raw `EXECUTE_TOOL` payload
    ///
    /// Missing `tool`/`action` become empty strings; the façade then treats the
    /// pair as unhandled.
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            tool: str_field(payload, "tool"),
            action: str_field(payload, "action"),
            data: DataCarrier::detect(payload).into_data(),
        }
    }

    /// String field of the action data
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Payload of a `CHAT_MESSAGE` envelope
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatMessage {
    pub text: String,
}

impl ChatMessage {
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            text: str_field(payload, "text"),
        }
    }
}

/// Payload of an `INSERT_IMAGE` envelope
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InsertImage {
    /// base64 `data:` URL
    pub image_data: String,
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

fn str_field(payload: &Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
