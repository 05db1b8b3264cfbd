//! Transport layer for the OEF agent protocol.
//!
//! A session runs over one duplex byte stream carrying length-prefixed
//! frames in both directions:
//!
//! ```text
//! ┌───────────────┐   [len:u32 LE][payload]   ┌───────────────┐
//! │     Agent     │ ────────────────────────> │   OEF node    │
//! │    (Proxy)    │ <──────────────────────── │               │
//! └───────────────┘                           └───────────────┘
//! ```
//!
//! [`TcpTransport`] opens the socket; [`write_frame`] and [`read_frame`]
//! work over any tokio stream, which is how tests drive the protocol over
//! in-memory pipes.

mod frame;
mod tcp;

pub use frame::{read_frame, write_frame, LENGTH_PREFIX_SIZE};
pub use tcp::TcpTransport;
