//! atelier-protocol: Shared envelope definitions for the local bridge
//!
//! This crate defines the `{type, payload}` envelope exchanged between the
//! bridge, the dashboard, automation scripts and the design-tool plugin, the
//! typed payloads the bridge itself interprets, and the JSON codec used on
//! every message frame.

pub mod asset_path;
pub mod codec;
pub mod envelope;
pub mod types;

// Re-export main types at crate root
pub use asset_path::{asset_path, decode_asset_name};
pub use codec::{decode, decode_str, encode, encode_envelope, encode_text, CodecError, DecodeError};
pub use envelope::{Envelope, MessageKind};
pub use types::{AssetRef, ChatMessage, DataCarrier, InsertImage, ToolRequest, ToolState, ToolStatus};

/// Default port of the WebSocket message channel
pub const DEFAULT_BRIDGE_PORT: u16 = 8080;

/// Default port of the asset HTTP server
pub const DEFAULT_ASSET_PORT: u16 = 8081;

/// Path prefix under which the asset server exposes files
pub const ASSET_ROUTE_PREFIX: &str = "/assets/";
