//! Observability for the bridge
//!
//! Counters are owned by the bridge state and rendered in Prometheus text
//! format by the asset server's `/metrics` route.

pub mod metrics;

pub use metrics::{GaugeSnapshot, Metrics};
