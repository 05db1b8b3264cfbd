//! FIPA negotiation messages.
//!
//! A negotiation between two agents is a dialogue of CFP, Propose, Accept
//! and Decline messages. Every FIPA message names, as `target`, the message
//! id it answers within the dialogue.

use serde::{Deserialize, Serialize};

use super::schema::{Description, Query};
use crate::codec::base64_bytes;

/// What a Call For Proposals asks for.
///
/// The three cases stay distinct on the wire: `Nothing` is not the same as
/// empty `Bytes`, and neither is an empty structured `Query`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "payload", rename_all = "snake_case")]
pub enum CfpQuery {
    /// No query attached
    #[default]
    Nothing,
    /// Application-defined bytes
    Bytes {
        /// Raw query content
        #[serde(with = "base64_bytes")]
        content: Vec<u8>,
    },
    /// Structured query
    Query {
        /// Query payload
        query: Query,
    },
}

impl CfpQuery {
    /// CFP without a query.
    pub fn nothing() -> Self {
        Self::Nothing
    }

    /// CFP carrying raw bytes.
    pub fn bytes(content: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            content: content.into(),
        }
    }

    /// CFP carrying a structured query.
    pub fn query(query: Query) -> Self {
        Self::Query { query }
    }
}

/// What a Propose offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "payload", rename_all = "snake_case")]
pub enum Proposals {
    /// Application-defined bytes
    Bytes {
        /// Raw proposal content
        #[serde(with = "base64_bytes")]
        content: Vec<u8>,
    },
    /// One description per proposed offer
    Descriptions {
        /// Proposed offers
        #[serde(default)]
        objects: Vec<Description>,
    },
}

impl Proposals {
    /// Proposal carrying raw bytes.
    pub fn bytes(content: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            content: content.into(),
        }
    }

    /// Proposal carrying descriptions.
    pub fn descriptions(objects: impl IntoIterator<Item = Description>) -> Self {
        Self::Descriptions {
            objects: objects.into_iter().collect(),
        }
    }
}

/// FIPA performative and its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum FipaKind {
    /// Call for proposals
    Cfp {
        /// Requested resources
        query: CfpQuery,
    },
    /// Proposal answering a CFP
    Propose {
        /// Offered resources
        proposals: Proposals,
    },
    /// Acceptance of a proposal
    Accept,
    /// Refusal of a proposal
    Decline,
    /// Performative this SDK does not know; only produced when decoding.
    #[serde(other)]
    Unsupported,
}

impl FipaKind {
    /// Performative name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cfp { .. } => "cfp",
            Self::Propose { .. } => "propose",
            Self::Accept => "accept",
            Self::Decline => "decline",
            Self::Unsupported => "unsupported",
        }
    }
}

/// FIPA message inside an agent-to-agent envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FipaMessage {
    /// Id of the message this one answers, within the dialogue
    pub target: u32,
    /// Performative
    pub kind: FipaKind,
}

impl FipaMessage {
    /// Call for proposals.
    pub fn cfp(target: u32, query: CfpQuery) -> Self {
        Self {
            target,
            kind: FipaKind::Cfp { query },
        }
    }

    /// Proposal.
    pub fn propose(target: u32, proposals: Proposals) -> Self {
        Self {
            target,
            kind: FipaKind::Propose { proposals },
        }
    }

    /// Acceptance.
    pub fn accept(target: u32) -> Self {
        Self {
            target,
            kind: FipaKind::Accept,
        }
    }

    /// Refusal.
    pub fn decline(target: u32) -> Self {
        Self {
            target,
            kind: FipaKind::Decline,
        }
    }
}
