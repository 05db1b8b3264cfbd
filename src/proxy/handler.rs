//! Agent callbacks and the binding gate that delivers them.

use std::sync::Arc;

use tokio::sync::watch;

use crate::protocol::{CfpQuery, OefErrorInfo, Proposals, SearchResultItem};

/// Callbacks invoked by the reader loop, one per node message.
///
/// Callbacks run on the reader task, in arrival order, and must not block.
/// Use the [`Proxy`](super::Proxy) send methods to reply; they only enqueue.
/// Every callback defaults to a debug log, so an agent overrides only the
/// ones it cares about.
#[allow(unused_variables)]
pub trait AgentHandler: Send + Sync {
    /// The node reports a failed directory operation.
    fn on_oef_error(&self, answer_id: u32, error: OefErrorInfo) {
        tracing::debug!(
            "Unhandled OEF error for {}: {:?} {}",
            answer_id,
            error.operation,
            error.cause
        );
    }

    /// A message in a dialogue could not be delivered.
    fn on_dialogue_error(&self, answer_id: u32, dialogue_id: u32, origin: &str) {
        tracing::debug!(
            "Unhandled dialogue error for {} in dialogue {} with {}",
            answer_id,
            dialogue_id,
            origin
        );
    }

    /// Agent or service search result.
    fn on_search_result(&self, search_id: u32, agents: Vec<String>) {
        tracing::debug!(
            "Unhandled search result {}: {} agents",
            search_id,
            agents.len()
        );
    }

    /// Network-wide service search result.
    fn on_search_result_wide(&self, search_id: u32, items: Vec<SearchResultItem>) {
        tracing::debug!(
            "Unhandled wide search result {}: {} nodes",
            search_id,
            items.len()
        );
    }

    /// Generic byte message from another agent.
    fn on_message(&self, answer_id: u32, dialogue_id: u32, origin: &str, content: Vec<u8>) {
        tracing::debug!(
            "Unhandled message {} from {} in dialogue {}",
            answer_id,
            origin,
            dialogue_id
        );
    }

    /// Call for proposals.
    fn on_cfp(&self, answer_id: u32, dialogue_id: u32, origin: &str, target: u32, query: CfpQuery) {
        tracing::debug!("Unhandled CFP {} from {}", answer_id, origin);
    }

    /// Proposal.
    fn on_propose(
        &self,
        answer_id: u32,
        dialogue_id: u32,
        origin: &str,
        target: u32,
        proposals: Proposals,
    ) {
        tracing::debug!("Unhandled propose {} from {}", answer_id, origin);
    }

    /// Acceptance.
    fn on_accept(&self, answer_id: u32, dialogue_id: u32, origin: &str, target: u32) {
        tracing::debug!("Unhandled accept {} from {}", answer_id, origin);
    }

    /// Refusal.
    fn on_decline(&self, answer_id: u32, dialogue_id: u32, origin: &str, target: u32) {
        tracing::debug!("Unhandled decline {} from {}", answer_id, origin);
    }
}

/// Write-once slot for the agent's handler.
///
/// The reader loop waits here until a handler is bound, so a message that
/// arrives before binding is held rather than dropped.
pub(crate) struct HandlerGate {
    slot: watch::Sender<Option<Arc<dyn AgentHandler>>>,
}

impl HandlerGate {
    pub(crate) fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot }
    }

    /// Bind `handler` unless one is already bound.
    pub(crate) fn bind(&self, handler: Arc<dyn AgentHandler>) -> bool {
        let mut handler = Some(handler);
        let bound = self.slot.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = handler.take();
            true
        });

        if !bound {
            tracing::warn!("Handler already bound, ignoring new handler");
        }
        bound
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Wait until a handler is bound.
    ///
    /// Returns `None` only if the gate is torn down while waiting.
    pub(crate) async fn wait(&self) -> Option<Arc<dyn AgentHandler>> {
        let mut rx = self.slot.subscribe();
        let slot = rx.wait_for(Option::is_some).await.ok()?;
        (*slot).clone()
    }
}
