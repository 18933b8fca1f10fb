//! Status delivery for tool invocations

use std::sync::Arc;

use atelier_protocol::{Envelope, ToolState, ToolStatus};
use tracing::debug;

use crate::observability::Metrics;
use crate::registry::{ConnectionId, ConnectionRegistry};

/// Where a tool invocation's envelopes go
pub trait StatusSink: Send + Sync {
    /// Deliver to the requesting connection, or to everyone if there is none
    fn reply(&self, envelope: Envelope);

    /// Deliver to every open connection
    fn publish(&self, envelope: Envelope);
}

/// [`StatusSink`] backed by the connection registry
pub struct RegistrySink {
    registry: Arc<ConnectionRegistry>,
    origin: Option<ConnectionId>,
    metrics: Option<Arc<Metrics>>,
}

impl RegistrySink {
    pub fn new(registry: Arc<ConnectionRegistry>, origin: Option<ConnectionId>) -> Self {
        Self {
            registry,
            origin,
            metrics: None,
        }
    }

    /// Count deliveries and failed unicasts in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn broadcast(&self, envelope: &Envelope) -> usize {
        let delivered = self.registry.broadcast(envelope, None);
        if let Some(metrics) = &self.metrics {
            metrics.record_broadcast(delivered);
        }
        delivered
    }
}

impl StatusSink for RegistrySink {
    fn reply(&self, envelope: Envelope) {
        match self.origin {
            Some(id) => {
                // A closed origin only loses its own acknowledgements
                if !self.registry.unicast(id, &envelope) {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_unicast_failure();
                    }
                }
            }
            None => {
                self.broadcast(&envelope);
            }
        }
    }

    fn publish(&self, envelope: Envelope) {
        let delivered = self.broadcast(&envelope);
        debug!("Published {} to {} connection(s)", envelope.msg_type, delivered);
    }
}

/// How a terminal status is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Reply,
    Publish,
}

/// Successful end of an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub message: String,
    pub delivery: Delivery,
}

impl Outcome {
    /// `COMPLETED` acknowledged to the requester
    pub fn reply(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            delivery: Delivery::Reply,
        }
    }

    /// `COMPLETED` published to every connection
    pub fn publish(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            delivery: Delivery::Publish,
        }
    }
}

/// Handle a tool uses to report progress
///
/// Handlers may send progress statuses and asset envelopes; the terminal
/// status is sent by the façade from the handler's result.
#[derive(Clone)]
pub struct Reporter {
    tool: String,
    sink: Arc<dyn StatusSink>,
}

impl Reporter {
    pub fn new(tool: impl Into<String>, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            tool: tool.into(),
            sink,
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Reply with a non-terminal status
    pub fn progress(&self, status: ToolState, message: impl Into<String>) {
        debug_assert!(!status.is_terminal());
        self.sink.reply(self.status(status, message));
    }

    /// Publish an envelope (asset updates) to every connection
    pub fn publish(&self, envelope: Envelope) {
        self.sink.publish(envelope);
    }

    pub(crate) fn completed(&self, outcome: Outcome) {
        let envelope = self.status(ToolState::Completed, outcome.message);
        match outcome.delivery {
            Delivery::Reply => self.sink.reply(envelope),
            Delivery::Publish => self.sink.publish(envelope),
        }
    }

    pub(crate) fn failed(&self, message: impl Into<String>) {
        self.sink.reply(self.status(ToolState::Error, message));
    }

    fn status(&self, status: ToolState, message: impl Into<String>) -> Envelope {
        Envelope::tool_status(&ToolStatus::new(self.tool.clone(), status, message))
    }
}
