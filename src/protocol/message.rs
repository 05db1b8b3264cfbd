//! Outbound envelopes.
//!
//! Every request an agent sends to its node is one [`Envelope`]: a message
//! id plus exactly one payload case.

use serde::{Deserialize, Serialize};

use super::fipa::{CfpQuery, FipaMessage, Proposals};
use super::schema::{Description, Query};
use super::uri::{Context, OefUri};
use crate::codec::base64_bytes;

/// Agent-to-node message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message id (search id for searches), echoed by the node as `answer_id`
    pub msg_id: u32,
    /// Service URI for service registration, empty otherwise
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub agent_uri: String,
    /// Request
    pub payload: EnvelopePayload,
}

/// Request carried by an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "case")]
pub enum EnvelopePayload {
    /// Add the agent to the node's agent directory
    RegisterAgent {
        /// Agent description
        description: Description,
    },
    /// Remove the agent from the agent directory
    UnregisterAgent,
    /// Add a service to the node's service directory
    RegisterService {
        /// Service description
        description: Description,
    },
    /// Remove a service from the service directory
    UnregisterService {
        /// Service description
        description: Description,
    },
    /// Search the agent directory
    SearchAgents {
        /// Search constraints
        query: Query,
    },
    /// Search the service directory of the local node
    SearchServices {
        /// Search constraints
        query: Query,
    },
    /// Search services across the OEF network
    SearchServicesWide {
        /// Search constraints
        query: Query,
    },
    /// Relay a message to another agent
    SendMessage(AgentMessage),
}

impl EnvelopePayload {
    /// Wire tag of this payload case.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterAgent { .. } => "RegisterAgent",
            Self::UnregisterAgent => "UnregisterAgent",
            Self::RegisterService { .. } => "RegisterService",
            Self::UnregisterService { .. } => "UnregisterService",
            Self::SearchAgents { .. } => "SearchAgents",
            Self::SearchServices { .. } => "SearchServices",
            Self::SearchServicesWide { .. } => "SearchServicesWide",
            Self::SendMessage(_) => "SendMessage",
        }
    }
}

/// Message for another agent, relayed by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Dialogue the message belongs to
    pub dialogue_id: u32,
    /// Public key of the recipient
    pub destination: String,
    /// URI of the sending service
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_uri: String,
    /// URI of the receiving service
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_uri: String,
    /// Message body
    pub content: AgentContent,
}

/// Body of an agent-to-agent message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentContent {
    /// Application-defined bytes
    Raw {
        /// Message bytes
        #[serde(with = "base64_bytes")]
        content: Vec<u8>,
    },
    /// FIPA negotiation message
    Fipa(FipaMessage),
    /// Content kind this SDK does not know; only produced when decoding.
    #[serde(other)]
    Unsupported,
}

impl Envelope {
    fn new(msg_id: u32, payload: EnvelopePayload) -> Self {
        Self {
            msg_id,
            agent_uri: String::new(),
            payload,
        }
    }

    fn agent_message(
        msg_id: u32,
        dialogue_id: u32,
        destination: &str,
        content: AgentContent,
    ) -> Self {
        Self::new(
            msg_id,
            EnvelopePayload::SendMessage(AgentMessage {
                dialogue_id,
                destination: destination.to_string(),
                source_uri: String::new(),
                target_uri: String::new(),
                content,
            }),
        )
    }

    /// Register the agent.
    pub fn register_agent(msg_id: u32, description: Description) -> Self {
        Self::new(msg_id, EnvelopePayload::RegisterAgent { description })
    }

    /// Unregister the agent.
    pub fn unregister_agent(msg_id: u32) -> Self {
        Self::new(msg_id, EnvelopePayload::UnregisterAgent)
    }

    /// Register a service under `service_uri`.
    pub fn register_service(msg_id: u32, description: Description, service_uri: &OefUri) -> Self {
        Self {
            agent_uri: service_uri.to_string(),
            ..Self::new(msg_id, EnvelopePayload::RegisterService { description })
        }
    }

    /// Unregister the service under `service_uri`.
    pub fn unregister_service(msg_id: u32, description: Description, service_uri: &OefUri) -> Self {
        Self {
            agent_uri: service_uri.to_string(),
            ..Self::new(msg_id, EnvelopePayload::UnregisterService { description })
        }
    }

    /// Search agents.
    pub fn search_agents(search_id: u32, query: Query) -> Self {
        Self::new(search_id, EnvelopePayload::SearchAgents { query })
    }

    /// Search services on the local node.
    pub fn search_services(search_id: u32, query: Query) -> Self {
        Self::new(search_id, EnvelopePayload::SearchServices { query })
    }

    /// Search services across the network.
    pub fn search_services_wide(search_id: u32, query: Query) -> Self {
        Self::new(search_id, EnvelopePayload::SearchServicesWide { query })
    }

    /// Generic byte message to another agent.
    pub fn message(msg_id: u32, dialogue_id: u32, destination: &str, content: Vec<u8>) -> Self {
        Self::agent_message(
            msg_id,
            dialogue_id,
            destination,
            AgentContent::Raw { content },
        )
    }

    /// Call for proposals.
    pub fn cfp(
        msg_id: u32,
        dialogue_id: u32,
        destination: &str,
        target: u32,
        query: CfpQuery,
    ) -> Self {
        Self::agent_message(
            msg_id,
            dialogue_id,
            destination,
            AgentContent::Fipa(FipaMessage::cfp(target, query)),
        )
    }

    /// Proposal.
    pub fn propose(
        msg_id: u32,
        dialogue_id: u32,
        destination: &str,
        target: u32,
        proposals: Proposals,
    ) -> Self {
        Self::agent_message(
            msg_id,
            dialogue_id,
            destination,
            AgentContent::Fipa(FipaMessage::propose(target, proposals)),
        )
    }

    /// Acceptance.
    pub fn accept(msg_id: u32, dialogue_id: u32, destination: &str, target: u32) -> Self {
        Self::agent_message(
            msg_id,
            dialogue_id,
            destination,
            AgentContent::Fipa(FipaMessage::accept(target)),
        )
    }

    /// Refusal.
    pub fn decline(msg_id: u32, dialogue_id: u32, destination: &str, target: u32) -> Self {
        Self::agent_message(
            msg_id,
            dialogue_id,
            destination,
            AgentContent::Fipa(FipaMessage::decline(target)),
        )
    }

    /// Address an agent message to the services named in `context`.
    ///
    /// No effect on directory and search requests.
    pub fn with_context(mut self, context: &Context) -> Self {
        if let EnvelopePayload::SendMessage(ref mut message) = self.payload {
            message.source_uri = context.source_uri.to_string();
            message.target_uri = context.target_uri.to_string();
        }
        self
    }
}
