//! Bridge metrics
//!
//! Plain atomic counters plus per-label counters in `DashMap`s. Labels are
//! limited to known envelope types and handled `(tool, action)` pairs so that
//! arbitrary client input cannot grow the maps.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use atelier_protocol::MessageKind;

/// Point-in-time gauge values collected on each metrics request
#[derive(Debug, Default)]
pub struct GaugeSnapshot {
    /// Number of open bridge connections
    pub active_connections: u64,
}

/// Bridge metrics collector
#[derive(Debug, Default)]
pub struct Metrics {
    /// Envelopes read from connections
    pub envelopes_received_total: AtomicU64,
    /// Frames that failed to decode
    pub decode_errors_total: AtomicU64,
    /// Envelopes relayed by broadcast
    pub broadcasts_total: AtomicU64,
    /// Frames accepted by connection queues during broadcasts
    pub broadcast_deliveries_total: AtomicU64,
    /// Unicast sends that found no open connection
    pub unicast_failures_total: AtomicU64,
    /// `EXECUTE_TOOL` requests with no handler
    pub unhandled_tools_total: AtomicU64,
    /// Tool invocations that ended in `ERROR`
    pub tool_errors_total: AtomicU64,
    /// Asset requests served
    pub asset_requests_total: AtomicU64,
    /// Asset requests answered 404 or 400
    pub asset_misses_total: AtomicU64,

    /// Received envelopes by type
    pub envelopes_by_type: DashMap<String, AtomicU64>,
    /// Tool invocations by `tool.action`
    pub invocations_by_tool: DashMap<String, AtomicU64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a received envelope
    pub fn record_envelope(&self, kind: &MessageKind) {
        self.envelopes_received_total.fetch_add(1, Ordering::Relaxed);
        let label = match kind {
            MessageKind::Other(_) => "other",
            known => known.as_str(),
        };
        bump(&self.envelopes_by_type, label);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a broadcast and how many connections accepted it
    pub fn record_broadcast(&self, delivered: usize) {
        self.broadcasts_total.fetch_add(1, Ordering::Relaxed);
        self.broadcast_deliveries_total
            .fetch_add(delivered as u64, Ordering::Relaxed);
    }

    pub fn record_unicast_failure(&self) {
        self.unicast_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatched tool invocation
    pub fn record_invocation(&self, tool: &str, action: &str) {
        bump(&self.invocations_by_tool, &format!("{}.{}", tool, action));
    }

    pub fn record_unhandled_tool(&self) {
        self.unhandled_tools_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tool_error(&self) {
        self.tool_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an asset request; `hit` is false for 404/400 answers
    pub fn record_asset_request(&self, hit: bool) {
        self.asset_requests_total.fetch_add(1, Ordering::Relaxed);
        if !hit {
            self.asset_misses_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Export metrics in Prometheus text format
    pub fn to_prometheus(&self, gauges: &GaugeSnapshot) -> String {
        use std::fmt::Write;

        let mut output = String::with_capacity(2048);

        macro_rules! counter {
            ($name:expr, $help:expr, $value:expr) => {
                let _ = writeln!(output, "# HELP {} {}", $name, $help);
                let _ = writeln!(output, "# TYPE {} counter", $name);
                let _ = writeln!(output, "{} {}", $name, $value.load(Ordering::Relaxed));
            };
        }

        macro_rules! labelled {
            ($name:expr, $help:expr, $label:expr, $map:expr) => {
                if !$map.is_empty() {
                    let _ = writeln!(output, "# HELP {} {}", $name, $help);
                    let _ = writeln!(output, "# TYPE {} counter", $name);
                    let mut rows: Vec<(String, u64)> = $map
                        .iter()
                        .map(|e| (e.key().clone(), e.value().load(Ordering::Relaxed)))
                        .collect();
                    rows.sort();
                    for (key, value) in rows {
                        let _ = writeln!(output, "{}{{{}=\"{}\"}} {}", $name, $label, key, value);
                    }
                }
            };
        }

        counter!(
            "atelier_envelopes_received_total",
            "Total envelopes received from connections",
            self.envelopes_received_total
        );
        counter!(
            "atelier_decode_errors_total",
            "Total frames dropped because they failed to decode",
            self.decode_errors_total
        );
        counter!(
            "atelier_broadcasts_total",
            "Total envelopes relayed by broadcast",
            self.broadcasts_total
        );
        counter!(
            "atelier_broadcast_deliveries_total",
            "Total frames queued to connections by broadcasts",
            self.broadcast_deliveries_total
        );
        counter!(
            "atelier_unicast_failures_total",
            "Total unicast sends with no open target",
            self.unicast_failures_total
        );
        counter!(
            "atelier_unhandled_tools_total",
            "Total tool requests with no handler",
            self.unhandled_tools_total
        );
        counter!(
            "atelier_tool_errors_total",
            "Total tool invocations that ended in ERROR",
            self.tool_errors_total
        );
        counter!(
            "atelier_asset_requests_total",
            "Total asset requests",
            self.asset_requests_total
        );
        counter!(
            "atelier_asset_misses_total",
            "Total asset requests answered with 404 or 400",
            self.asset_misses_total
        );

        labelled!(
            "atelier_envelopes_by_type_total",
            "Envelopes received by type",
            "type",
            self.envelopes_by_type
        );
        labelled!(
            "atelier_tool_invocations_total",
            "Tool invocations by tool and action",
            "tool",
            self.invocations_by_tool
        );

        let _ = writeln!(output, "# HELP atelier_active_connections Open bridge connections");
        let _ = writeln!(output, "# TYPE atelier_active_connections gauge");
        let _ = writeln!(output, "atelier_active_connections {}", gauges.active_connections);

        output
    }
}

fn bump(map: &DashMap<String, AtomicU64>, key: &str) {
    if let Some(counter) = map.get(key) {
        counter.fetch_add(1, Ordering::Relaxed);
        return;
    }
    map.entry(key.to_string())
        .or_insert_with(|| AtomicU64::new(0))
        .fetch_add(1, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = Metrics::new();
        assert_eq!(metrics.envelopes_received_total.load(Ordering::Relaxed), 0);
        assert!(metrics.envelopes_by_type.is_empty());
    }

    #[test]
    fn test_unknown_types_share_a_label() {
        let metrics = Metrics::new();
        metrics.record_envelope(&MessageKind::from("FOO"));
        metrics.record_envelope(&MessageKind::from("BAR"));
        metrics.record_envelope(&MessageKind::ExecuteTool);

        assert_eq!(metrics.envelopes_by_type.len(), 2);
        assert_eq!(
            metrics.envelopes_by_type.get("other").unwrap().load(Ordering::Relaxed),
            2
        );
        assert_eq!(metrics.envelopes_received_total.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_broadcast_accumulates_deliveries() {
        let metrics = Metrics::new();
        metrics.record_broadcast(3);
        metrics.record_broadcast(0);
        assert_eq!(metrics.broadcasts_total.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.broadcast_deliveries_total.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_asset_misses() {
        let metrics = Metrics::new();
        metrics.record_asset_request(true);
        metrics.record_asset_request(false);
        assert_eq!(metrics.asset_requests_total.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.asset_misses_total.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_prometheus_output() {
        let metrics = Metrics::new();
        metrics.record_envelope(&MessageKind::ChatMessage);
        metrics.record_invocation("figma", "launch");
        metrics.record_invocation("figma", "launch");

        let text = metrics.to_prometheus(&GaugeSnapshot {
            active_connections: 4,
        });

        assert!(text.contains("# TYPE atelier_envelopes_received_total counter"));
        assert!(text.contains("atelier_envelopes_received_total 1"));
        assert!(text.contains("atelier_envelopes_by_type_total{type=\"CHAT_MESSAGE\"} 1"));
        assert!(text.contains("atelier_tool_invocations_total{tool=\"figma.launch\"} 2"));
        assert!(text.contains("atelier_active_connections 4"));
    }

    #[test]
    fn test_prometheus_omits_empty_label_families() {
        let text = Metrics::new().to_prometheus(&GaugeSnapshot::default());
        assert!(!text.contains("atelier_tool_invocations_total"));
    }
}
