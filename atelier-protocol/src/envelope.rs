//! The bridge envelope and its type vocabulary

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{AssetRef, ToolRequest, ToolStatus};

/// Known envelope types
///
/// The vocabulary is closed for the types the bridge interprets, but any other
/// string is carried through as [`MessageKind::Other`] so receivers can log and
/// ignore it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Client asks the bridge to run a tool action
    ExecuteTool,
    /// Bridge reports the state of a tool operation
    ToolStatus,
    /// Preview image update (script → dashboard)
    UpdatePreview,
    /// Preview image update (generation result)
    PreviewUpdate,
    /// Generated video is available
    VideoUpdate,
    /// Plugin-defined design element list
    DesignCommand,
    /// Image to be placed by the design plugin
    InsertImage,
    /// Free-text operator command
    ChatMessage,
    /// Anything else
    Other(String),
}

impl MessageKind {
    /// Wire name of this kind
    pub fn as_str(&self) -> &str {
        match self {
            Self::ExecuteTool => "EXECUTE_TOOL",
            Self::ToolStatus => "TOOL_STATUS",
            Self::UpdatePreview => "UPDATE_PREVIEW",
            Self::PreviewUpdate => "PREVIEW_UPDATE",
            Self::VideoUpdate => "VIDEO_UPDATE",
            Self::DesignCommand => "DESIGN_COMMAND",
            Self::InsertImage => "INSERT_IMAGE",
            Self::ChatMessage => "CHAT_MESSAGE",
            Self::Other(name) => name,
        }
    }

    /// Whether envelopes of this kind are relayed verbatim to the other clients
    pub fn is_rebroadcast(&self) -> bool {
        matches!(
            self,
            Self::UpdatePreview
                | Self::DesignCommand
                | Self::PreviewUpdate
                | Self::VideoUpdate
                | Self::InsertImage
        )
    }
}

impl From<&str> for MessageKind {
    fn from(value: &str) -> Self {
        match value {
            "EXECUTE_TOOL" => Self::ExecuteTool,
            "TOOL_STATUS" => Self::ToolStatus,
            "UPDATE_PREVIEW" => Self::UpdatePreview,
            "PREVIEW_UPDATE" => Self::PreviewUpdate,
            "VIDEO_UPDATE" => Self::VideoUpdate,
            "DESIGN_COMMAND" => Self::DesignCommand,
            "INSERT_IMAGE" => Self::InsertImage,
            "CHAT_MESSAGE" => Self::ChatMessage,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The atomic unit of bridge traffic
///
/// Serializes to exactly two top-level fields, `type` and `payload`. A
/// payload that is absent or `null` is normalized to an empty object, so an
/// envelope built through [`Envelope::new`] always round-trips through the
/// codec unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub payload: Value,
}

impl Envelope {
    /// Create an envelope, normalizing a `null` payload to `{}`
    pub fn new(msg_type: impl Into<String>, payload: Value) -> Self {
        let payload = match payload {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Self {
            msg_type: msg_type.into(),
            payload,
        }
    }

    /// Classify the envelope type
    pub fn kind(&self) -> MessageKind {
        MessageKind::from(self.msg_type.as_str())
    }

    /// Look up a string field of an object payload
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// `TOOL_STATUS` envelope
    pub fn tool_status(status: &ToolStatus) -> Self {
        Self::new(MessageKind::ToolStatus.as_str(), to_value(status))
    }

    /// `PREVIEW_UPDATE` envelope referencing a generated image
    pub fn preview_update(asset: &AssetRef) -> Self {
        Self::new(MessageKind::PreviewUpdate.as_str(), to_value(asset))
    }

    /// `VIDEO_UPDATE` envelope referencing a generated video
    pub fn video_update(asset: &AssetRef) -> Self {
        Self::new(MessageKind::VideoUpdate.as_str(), to_value(asset))
    }

    /// `EXECUTE_TOOL` envelope in canonical (`data`) form
    pub fn execute_tool(request: &ToolRequest) -> Self {
        Self::new(
            MessageKind::ExecuteTool.as_str(),
            serde_json::json!({
                "tool": request.tool,
                "action": request.action,
                "data": request.data,
            }),
        )
    }

    /// `CHAT_MESSAGE` envelope
    pub fn chat(text: impl Into<String>) -> Self {
        Self::new(
            MessageKind::ChatMessage.as_str(),
            serde_json::json!({ "text": text.into() }),
        )
    }
}

// Plain data structs with string keys cannot fail to convert.
fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| Value::Object(Map::new()))
}
