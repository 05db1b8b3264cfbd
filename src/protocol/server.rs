//! Inbound node messages.
//!
//! Everything the node sends after the handshake is a [`ServerMessage`]:
//! the id of the request it answers plus one payload case. Unknown cases
//! decode to `Unknown` so that newer nodes do not break older agents.

use serde::{Deserialize, Serialize};

use super::message::AgentContent;
use crate::codec::base64_bytes;

/// Node-to-agent message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    /// Id of the request this answers (search id for search results)
    pub answer_id: u32,
    /// Answer
    pub payload: ServerPayload,
}

/// Answer carried by a [`ServerMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "case")]
pub enum ServerPayload {
    /// A directory operation failed
    OefError {
        /// Operation that failed
        operation: ErrorOperation,
        /// Failure cause, if the node gave one
        #[serde(default)]
        cause: String,
        /// Free-form detail
        #[serde(default)]
        detail: String,
    },
    /// A message could not be delivered within a dialogue
    DialogueError {
        /// Dialogue concerned
        dialogue_id: u32,
        /// Public key of the other agent
        #[serde(default)]
        origin: String,
    },
    /// Search result: public keys of matching agents or services
    Agents {
        /// Matching public keys
        #[serde(default)]
        agents: Vec<String>,
    },
    /// Network-wide search result
    AgentsWide {
        /// Matching nodes and their agents
        #[serde(default)]
        result: Vec<WideSearchItem>,
    },
    /// Message relayed from another agent
    Content(ContentMessage),
    /// Payload case this SDK does not know
    #[serde(other)]
    Unknown,
}

impl ServerPayload {
    /// Wire tag of this payload case.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OefError { .. } => "OefError",
            Self::DialogueError { .. } => "DialogueError",
            Self::Agents { .. } => "Agents",
            Self::AgentsWide { .. } => "AgentsWide",
            Self::Content(_) => "Content",
            Self::Unknown => "Unknown",
        }
    }
}

/// Directory operation named by an `OefError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorOperation {
    /// Service registration
    RegisterService,
    /// Service removal
    UnregisterService,
    /// Agent registration
    RegisterDescription,
    /// Agent removal
    UnregisterDescription,
    /// Operation code this SDK does not know
    #[serde(other)]
    Unknown,
}

/// What an `OefError` reports, as handed to the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OefErrorInfo {
    /// Operation that failed
    pub operation: ErrorOperation,
    /// Failure cause
    pub cause: String,
    /// Free-form detail
    pub detail: String,
}

/// Message from another agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMessage {
    /// Dialogue the message belongs to
    pub dialogue_id: u32,
    /// Public key of the sender
    pub origin: String,
    /// URI of the sending service
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_uri: String,
    /// URI of the receiving service
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_uri: String,
    /// Message body
    pub content: AgentContent,
}

/// One node in a network-wide search result, as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideSearchItem {
    /// Node key
    #[serde(with = "base64_bytes")]
    pub key: Vec<u8>,
    /// Node IP address
    pub ip: String,
    /// Node port
    pub port: u16,
    /// Network distance to the node
    #[serde(default)]
    pub distance: f64,
    /// Node information
    #[serde(default)]
    pub info: String,
    /// Matching agents on the node
    #[serde(default)]
    pub agents: Vec<WideSearchAgent>,
}

/// Matching agent inside a [`WideSearchItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideSearchAgent {
    /// Agent key
    #[serde(with = "base64_bytes")]
    pub key: Vec<u8>,
    /// Match score
    #[serde(default)]
    pub score: f64,
}

/// One node in a network-wide search result, as handed to the handler.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResultItem {
    /// Node key
    pub key: String,
    /// Node address as `ip:port`
    pub uri: String,
    /// Network distance to the node
    pub distance: f64,
    /// Node information
    pub info: String,
    /// Matching agents on the node
    pub agents: Vec<AgentInfo>,
}

/// Matching agent inside a [`SearchResultItem`].
#[derive(Debug, Clone, PartialEq)]
pub struct AgentInfo {
    /// Agent key
    pub key: String,
    /// Match score
    pub score: f64,
}

impl From<&WideSearchAgent> for AgentInfo {
    fn from(agent: &WideSearchAgent) -> Self {
        Self {
            key: String::from_utf8_lossy(&agent.key).into_owned(),
            score: agent.score,
        }
    }
}

impl From<&WideSearchItem> for SearchResultItem {
    fn from(item: &WideSearchItem) -> Self {
        Self {
            key: String::from_utf8_lossy(&item.key).into_owned(),
            uri: format!("{}:{}", item.ip, item.port),
            distance: item.distance,
            info: item.info.clone(),
            agents: item.agents.iter().map(AgentInfo::from).collect(),
        }
    }
}
