//! Reader loop and dispatcher: turns node frames into handler callbacks.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use super::context::ContextStore;
use super::handler::{AgentHandler, HandlerGate};
use crate::codec;
use crate::error::Result;
use crate::protocol::{
    AgentContent, ContentMessage, FipaKind, OefErrorInfo, SearchResultItem, ServerMessage,
    ServerPayload,
};
use crate::transport::read_frame;

/// Read and dispatch frames until the stream fails or the session is
/// cancelled.
///
/// A frame that does not decode, or whose callback panics, is logged and
/// dropped. Dispatch waits for a handler to be bound. The context of a
/// content message is held in `contexts` while its callback runs.
pub(crate) async fn run<R>(
    mut reader: R,
    gate: &HandlerGate,
    contexts: &ContextStore,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            frame = read_frame(&mut reader) => frame?,
        };

        let message: ServerMessage = match codec::decode(&frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Dropping undecodable frame ({} bytes): {}", frame.len(), e);
                continue;
            },
        };

        if !gate.is_bound() {
            tracing::debug!("Holding {} until a handler is bound", message.payload.name());
        }
        let handler = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            handler = gate.wait() => match handler {
                Some(handler) => handler,
                None => return Ok(()),
            },
        };

        let answer_id = message.answer_id;
        let case = message.payload.name();
        tracing::trace!("Dispatching {} for {}", case, answer_id);

        let context = contexts.record(&message);
        let dispatched = catch_unwind(AssertUnwindSafe(|| dispatch(handler.as_ref(), message)));
        if let Some(key) = context {
            contexts.release(&key);
        }
        if dispatched.is_err() {
            tracing::error!("Handler panicked on {} for {}", case, answer_id);
        }
    }
}

/// Invoke the one callback matching `message`.
pub(crate) fn dispatch(handler: &dyn AgentHandler, message: ServerMessage) {
    let answer_id = message.answer_id;

    match message.payload {
        ServerPayload::OefError {
            operation,
            cause,
            detail,
        } => handler.on_oef_error(
            answer_id,
            OefErrorInfo {
                operation,
                cause,
                detail,
            },
        ),
        ServerPayload::DialogueError {
            dialogue_id,
            origin,
        } => handler.on_dialogue_error(answer_id, dialogue_id, &origin),
        ServerPayload::Agents { agents } => handler.on_search_result(answer_id, agents),
        ServerPayload::AgentsWide { result } => handler.on_search_result_wide(
            answer_id,
            result.iter().map(SearchResultItem::from).collect(),
        ),
        ServerPayload::Content(content) => dispatch_content(handler, answer_id, content),
        ServerPayload::Unknown => {
            tracing::warn!("Ignoring unknown message case for {}", answer_id);
        },
    }
}

fn dispatch_content(handler: &dyn AgentHandler, answer_id: u32, message: ContentMessage) {
    let ContentMessage {
        dialogue_id,
        origin,
        content,
        ..
    } = message;

    match content {
        AgentContent::Raw { content } => {
            handler.on_message(answer_id, dialogue_id, &origin, content);
        },
        AgentContent::Fipa(fipa) => match fipa.kind {
            FipaKind::Cfp { query } => {
                handler.on_cfp(answer_id, dialogue_id, &origin, fipa.target, query);
            },
            FipaKind::Propose { proposals } => {
                handler.on_propose(answer_id, dialogue_id, &origin, fipa.target, proposals);
            },
            FipaKind::Accept => handler.on_accept(answer_id, dialogue_id, &origin, fipa.target),
            FipaKind::Decline => handler.on_decline(answer_id, dialogue_id, &origin, fipa.target),
            FipaKind::Unsupported => {
                tracing::warn!(
                    "Ignoring unsupported FIPA message {} from {}",
                    answer_id,
                    origin
                );
            },
        },
        AgentContent::Unsupported => {
            tracing::warn!("Ignoring unsupported content {} from {}", answer_id, origin);
        },
    }
}
