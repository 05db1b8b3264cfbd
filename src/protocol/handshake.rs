//! Handshake messages.
//!
//! ```text
//! Agent                               Node
//!   |------ Identify(public_key) ----->|
//!   |<----- Phrase(phrase) ------------|
//!   |------ Answer(phrase) ----------->|
//!   |<----- Connected(status) ---------|
//! ```
//!
//! The answer echoes the phrase verbatim; checking it is the node's job.

use serde::{Deserialize, Serialize};

/// Step 1, agent to node: who is connecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identify {
    /// Agent public key
    pub public_key: String,
}

/// Step 2, node to agent: the challenge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    /// Challenge text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phrase: Option<String>,
    /// Set by the node when it refuses the agent outright
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failure: bool,
}

impl Phrase {
    /// Challenge phrase to answer.
    pub fn challenge(text: impl Into<String>) -> Self {
        Self {
            phrase: Some(text.into()),
            failure: false,
        }
    }

    /// Refusal.
    pub fn refused() -> Self {
        Self {
            phrase: None,
            failure: true,
        }
    }

    /// The phrase to answer, if the node sent a usable one.
    pub fn text(&self) -> Option<&str> {
        if self.failure {
            return None;
        }
        self.phrase.as_deref().filter(|p| !p.is_empty())
    }
}

/// Step 3, agent to node: the echoed phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Echoed challenge text
    pub answer: String,
}

/// Step 4, node to agent: verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connected {
    /// Whether the session is accepted
    pub status: bool,
}
