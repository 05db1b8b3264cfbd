//! OEF agent protocol messages.
//!
//! Message types exchanged between an agent and its OEF node, and the
//! session state machine that governs when they may flow.
//!
//! # Protocol Overview
//!
//! ```text
//! Agent                                 Node
//!    |                                    |
//!    |------ Identify / Answer --------->|  Handshake (see handshake)
//!    |<----- Phrase / Connected ---------|
//!    |                                    |
//!    |====== Envelope (msg_id) =========>|  Directory, search, messages
//!    |<===== ServerMessage (answer_id) ==|  Results, errors, messages
//! ```
//!
//! ## State Machine
//!
//! | State         | Description                        | Valid Transitions          |
//! |---------------|------------------------------------|----------------------------|
//! | `Unconnected` | Nothing open                       | → Handshaking              |
//! | `Handshaking` | Socket open, handshake running     | → Active, Unconnected      |
//! | `Active`      | Loops running, sends accepted      | → Stopping                 |
//! | `Stopping`    | Loops winding down                 | → Stopped                  |
//! | `Stopped`     | Session over                       | (terminal)                 |
//!
//! ## Payloads
//!
//! Descriptions and queries are opaque here ([`Description`], [`Query`]).
//! FIPA negotiation uses [`CfpQuery`] and [`Proposals`]; neither collapses
//! its cases on the wire.

mod fipa;
mod handshake;
mod message;
mod schema;
mod server;
mod session;
mod uri;

pub use fipa::{CfpQuery, FipaKind, FipaMessage, Proposals};
pub use handshake::{Answer, Connected, Identify, Phrase};
pub use message::{AgentContent, AgentMessage, Envelope, EnvelopePayload};
pub use schema::{Description, Query};
pub use server::{
    AgentInfo, ContentMessage, ErrorOperation, OefErrorInfo, SearchResultItem, ServerMessage,
    ServerPayload, WideSearchAgent, WideSearchItem,
};
pub use session::SessionState;
pub use uri::{Context, OefUri, OefUriBuilder};
