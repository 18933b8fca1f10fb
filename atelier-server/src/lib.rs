//! atelier-server: local message bridge between design clients and
//! desktop creative tools
//!
//! The bridge relays JSON envelopes between WebSocket clients, runs tool
//! actions on their behalf and serves generated assets over HTTP.

pub mod assets;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod handlers;
pub mod observability;
pub mod registry;
pub mod tools;
pub mod transport;

pub use bridge::{BoundAddrs, Bridge, BridgeState, StartOutcome};
pub use handlers::{RouteOutcome, Router};
pub use registry::{ConnectionId, ConnectionRegistry};
