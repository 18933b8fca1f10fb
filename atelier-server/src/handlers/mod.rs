//! Bridge Router
//!
//! Classifies each incoming envelope and dispatches it. Routing is stateless
//! between envelopes: relay types are rebroadcast to every other connection,
//! tool requests go to the façade, chat text is turned into a tool request
//! or answered directly, and everything else is logged and dropped. No
//! outcome of routing ever closes the connection.

mod chat;

use std::sync::Arc;

use tracing::{debug, info, warn};

use atelier_protocol::{
    decode, ChatMessage, Envelope, MessageKind, ToolRequest, ToolState, ToolStatus,
};

use crate::observability::Metrics;
use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::tools::{RegistrySink, StatusSink, ToolFacade};

pub use chat::{ChatRule, ChatRules};

/// Tool name used in direct chat replies
pub const CHAT_TOOL: &str = "chat";

/// What the router did with one envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Relayed to the other connections
    Broadcast { delivered: usize },
    /// Handed to the tool façade
    ToolDispatched,
    /// No handler for the tool/action pair
    ToolUnhandled,
    /// Chat text turned into a tool request by the named rule
    ChatDispatched { rule: &'static str },
    /// Chat text answered directly
    ChatReplied,
    /// Type the bridge does not act on
    Ignored,
    /// Frame could not be decoded
    Dropped,
}

/// Per-envelope dispatcher shared by all connections
pub struct Router {
    registry: Arc<ConnectionRegistry>,
    facade: Arc<ToolFacade>,
    metrics: Arc<Metrics>,
    chat: ChatRules,
}

impl Router {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        facade: Arc<ToolFacade>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            registry,
            facade,
            metrics,
            chat: ChatRules::standard(),
        }
    }

    /// Decode and route one frame received from `origin`
    pub fn route_frame(&self, origin: Option<ConnectionId>, frame: &[u8]) -> RouteOutcome {
        match decode(frame) {
            Ok(envelope) => self.route(origin, envelope),
            Err(e) => {
                warn!("Dropping frame from {:?}: {}", origin, e);
                self.metrics.record_decode_error();
                RouteOutcome::Dropped
            }
        }
    }

    /// Route a decoded envelope
    pub fn route(&self, origin: Option<ConnectionId>, envelope: Envelope) -> RouteOutcome {
        let kind = envelope.kind();
        self.metrics.record_envelope(&kind);
        debug!("Received {} from {:?}", kind, origin);

        match kind {
            MessageKind::ExecuteTool => {
                self.dispatch_tool(origin, ToolRequest::from_payload(&envelope.payload))
            }
            MessageKind::ChatMessage => {
                self.handle_chat(origin, ChatMessage::from_payload(&envelope.payload))
            }
            kind if kind.is_rebroadcast() => {
                let delivered = self.registry.broadcast(&envelope, origin);
                self.metrics.record_broadcast(delivered);
                info!("Relayed {} to {} connection(s)", kind, delivered);
                RouteOutcome::Broadcast { delivered }
            }
            other => {
                debug!("Ignoring {} envelope", other);
                RouteOutcome::Ignored
            }
        }
    }

    fn sink(&self, origin: Option<ConnectionId>) -> Arc<dyn StatusSink> {
        Arc::new(
            RegistrySink::new(Arc::clone(&self.registry), origin)
                .with_metrics(Arc::clone(&self.metrics)),
        )
    }

    fn dispatch_tool(&self, origin: Option<ConnectionId>, request: ToolRequest) -> RouteOutcome {
        info!(
            "Tool request {}.{} from {:?}",
            request.tool, request.action, origin
        );
        match self.facade.invoke(request, self.sink(origin)) {
            Some(_) => RouteOutcome::ToolDispatched,
            None => RouteOutcome::ToolUnhandled,
        }
    }

    fn handle_chat(&self, origin: Option<ConnectionId>, message: ChatMessage) -> RouteOutcome {
        info!("Chat from {:?}: {}", origin, message.text);

        if let Some((rule, request)) = self.chat.resolve(&message.text) {
            debug!(
                "Chat rule '{}' synthesized {:?}",
                rule.name,
                Envelope::execute_tool(&request)
            );
            return match self.dispatch_tool(origin, request) {
                RouteOutcome::ToolDispatched => RouteOutcome::ChatDispatched { rule: rule.name },
                other => other,
            };
        }

        let reply = Envelope::tool_status(&ToolStatus::new(
            CHAT_TOOL,
            ToolState::Completed,
            ChatRules::fallback_message(&message.text),
        ));
        self.sink(origin).reply(reply);
        RouteOutcome::ChatReplied
    }
}
