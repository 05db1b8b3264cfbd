//! TCP transport to an OEF node.

use tokio::net::TcpStream;

use crate::config::ProxyConfig;
use crate::error::{OefSdkError, Result};

/// TCP endpoint of an OEF node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpTransport {
    /// `host:port` of the node.
    addr: String,
}

impl TcpTransport {
    /// Create a new TCP transport.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Transport for the node named in a proxy config.
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(config.addr())
    }

    /// Open the socket.
    pub async fn connect(&self) -> Result<TcpStream> {
        let stream = TcpStream::connect(&self.addr).await.map_err(|e| {
            OefSdkError::Connection(format!("Failed to connect to {}: {}", self.addr, e))
        })?;

        // Frames are small and latency-sensitive
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Could not set TCP_NODELAY on {}: {}", self.addr, e);
        }

        tracing::debug!("TCP connection open to {}", self.addr);
        Ok(stream)
    }

    /// Address this transport connects to.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}
