//! Addressing context of the content messages being dispatched.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::protocol::{Context, ServerMessage, ServerPayload};

/// Identifies one inbound content message: answer id, dialogue id, origin.
pub(crate) type ContextKey = (u32, u32, String);

/// Contexts of content messages whose callback is running.
///
/// An entry lives only while its callback runs, so a handler can look up
/// the URIs of the message it is answering.
#[derive(Default)]
pub(crate) struct ContextStore {
    entries: Mutex<HashMap<ContextKey, Context>>,
}

impl ContextStore {
    /// Record the context of `message` if it carries agent content.
    pub(crate) fn record(&self, message: &ServerMessage) -> Option<ContextKey> {
        let ServerPayload::Content(content) = &message.payload else {
            return None;
        };

        let key = (message.answer_id, content.dialogue_id, content.origin.clone());
        let context = Context::from_uris(&content.target_uri, &content.source_uri);
        self.entries().insert(key.clone(), context);
        Some(key)
    }

    pub(crate) fn release(&self, key: &ContextKey) {
        self.entries().remove(key);
    }

    /// Context of the message, or an empty one if none is being dispatched.
    pub(crate) fn get(&self, answer_id: u32, dialogue_id: u32, origin: &str) -> Context {
        self.entries()
            .get(&(answer_id, dialogue_id, origin.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ContextKey, Context>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
