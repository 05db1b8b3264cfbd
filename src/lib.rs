//! # OEF SDK - Agent Session Runtime
//!
//! Client-side runtime that connects an autonomous agent to an Open Economic
//! Framework (OEF) node: it authenticates the agent, keeps one full-duplex
//! framed session open, sends the agent's directory, search and negotiation
//! requests, and delivers everything the node sends back to the agent's
//! callbacks.
//!
//! ## Features
//!
//! - **Handshake**: identify, answer the node's phrase, await acceptance
//! - **Framing**: 4-byte little-endian length prefix, both directions
//! - **Ordered sends**: non-blocking enqueue, one writer in FIFO order
//! - **Dispatch**: one callback per node message, held until a handler binds
//! - **FIPA negotiation**: CFP, Propose, Accept and Decline dialogues
//!
//! ## Protocol Overview
//!
//! ### Architecture
//!
//! ```text
//! Agent A                        OEF node                         Agent B
//!    |                              |                                |
//!    |------ Identify ------------>|                                |
//!    |<----- Phrase ---------------|                                |
//!    |------ Answer -------------->|                                |
//!    |<----- Connected ------------|                                |
//!    |                              |                                |
//!    |====== RegisterService =====>|                                |
//!    |                              |<===== SearchServices ==========|
//!    |                              |====== Agents =================>|
//!    |<===== Content (CFP) ========|<===== SendMessage (CFP) =======|
//!    |====== SendMessage (Propose)>|====== Content (Propose) ======>|
//! ```
//!
//! ### State Machine
//!
//! ```text
//!                    connect()
//!     [Unconnected] ───────────> [Handshaking]
//!           ^                         │
//!           │ failure / timeout       │ Connected{true}
//!           └─────────────────────────┤
//!                                     v
//!                                 [Active]
//!                                     │ stop() or I/O error
//!                                     v
//!                                [Stopping] ───> [Stopped]
//!                                    both tasks exited
//!
//!     stop() while handshaking: [Handshaking] ───> [Stopped]
//! ```
//!
//! ### Message Cases
//!
//! | Agent → node          | Node → agent     |
//! |-----------------------|------------------|
//! | `RegisterAgent`       | `OefError`       |
//! | `UnregisterAgent`     | `DialogueError`  |
//! | `RegisterService`     | `Agents`         |
//! | `UnregisterService`   | `AgentsWide`     |
//! | `SearchAgents`        | `Content`        |
//! | `SearchServices`      |                  |
//! | `SearchServicesWide`  |                  |
//! | `SendMessage`         |                  |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oef::{AgentHandler, CfpQuery, Proposals, Proxy};
//!
//! struct Station {
//!     proxy: Proxy,
//! }
//!
//! impl AgentHandler for Station {
//!     fn on_cfp(&self, msg_id: u32, dialogue_id: u32, origin: &str, target: u32, _query: CfpQuery) {
//!         let _ = self.proxy.send_propose(
//!             msg_id + 1,
//!             dialogue_id,
//!             origin,
//!             target + 1,
//!             Proposals::bytes(b"price=50".to_vec()),
//!         );
//!     }
//! }
//!
//! let proxy = Proxy::new("weather_station", "127.0.0.1", 3333);
//! proxy.connect_agent(Arc::new(Station { proxy: proxy.clone() })).await?;
//! proxy.wait_until_stopped().await;
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod proxy;
pub mod transport;

// Re-exports for convenience
pub use config::ProxyConfig;
pub use error::{OefSdkError, Result};
pub use protocol::{
    CfpQuery, Context, Description, Envelope, OefErrorInfo, OefUri, Proposals, Query,
    SearchResultItem, SessionState,
};
pub use proxy::{AgentHandler, Proxy};
pub use transport::TcpTransport;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
