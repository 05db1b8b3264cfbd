//! OEF resource identifiers and dialogue context.
//!
//! An OEF URI names an agent (or one of its services) at a node:
//!
//! ```text
//! tcp://<core host:port>/<core key>/<namespace>/.../<agent key>/<agent alias>
//! ```
//!
//! The alias selects one of several services registered by the same agent.

use std::fmt;
use std::str::FromStr;

use crate::error::OefSdkError;

/// Minimum number of `/`-separated parts in a full URI.
const MIN_URI_PARTS: usize = 7;

/// Identifier of an agent or service at an OEF node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OefUri {
    /// Transport scheme
    pub protocol: String,
    /// `host:port` of the node
    pub core_uri: String,
    /// Public key of the node
    pub core_key: String,
    /// Path segments between node key and agent key
    pub namespaces: Vec<String>,
    /// Public key of the agent
    pub agent_key: String,
    /// Service alias of the agent
    pub agent_alias: String,
    empty: bool,
}

impl Default for OefUri {
    fn default() -> Self {
        Self {
            protocol: "tcp".to_string(),
            core_uri: String::new(),
            core_key: String::new(),
            namespaces: Vec::new(),
            agent_key: String::new(),
            agent_alias: String::new(),
            empty: true,
        }
    }
}

impl OefUri {
    /// Start building a URI.
    pub fn builder() -> OefUriBuilder {
        OefUriBuilder::default()
    }

    /// URI naming an agent by `"key"` or `"key/alias"`.
    pub fn for_agent(agent: &str) -> Self {
        let mut uri = Self {
            empty: false,
            ..Default::default()
        };

        match agent.split_once('/') {
            None => uri.agent_key = agent.to_string(),
            Some((key, alias)) if !alias.contains('/') => {
                uri.agent_key = key.to_string();
                uri.agent_alias = alias.to_string();
            },
            Some(_) => {
                tracing::warn!("Got invalid agent key: {}", agent);
                uri.empty = true;
            },
        }

        uri
    }

    /// True for the default, unset URI, which renders as `""`.
    pub fn is_empty(&self) -> bool {
        self.empty
    }
}

impl fmt::Display for OefUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.empty {
            return Ok(());
        }
        write!(
            f,
            "{}://{}/{}/{}/{}/{}",
            self.protocol,
            self.core_uri,
            self.core_key,
            self.namespaces.join("/"),
            self.agent_key,
            self.agent_alias
        )
    }
}

impl FromStr for OefUri {
    type Err = OefSdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() < MIN_URI_PARTS {
            return Err(OefSdkError::InvalidMessage(format!("Invalid OEF URI: {s}")));
        }

        let len = parts.len();
        Ok(Self {
            protocol: parts[0].trim_end_matches(':').to_string(),
            core_uri: parts[2].to_string(),
            core_key: parts[3].to_string(),
            namespaces: parts[4..len - 2]
                .iter()
                .filter(|ns| !ns.is_empty())
                .map(|ns| (*ns).to_string())
                .collect(),
            agent_key: parts[len - 2].to_string(),
            agent_alias: parts[len - 1].to_string(),
            empty: false,
        })
    }
}

/// Builder for [`OefUri`].
#[derive(Debug, Clone)]
pub struct OefUriBuilder {
    uri: OefUri,
}

impl Default for OefUriBuilder {
    fn default() -> Self {
        Self {
            uri: OefUri {
                empty: false,
                ..Default::default()
            },
        }
    }
}

impl OefUriBuilder {
    /// Set the transport scheme.
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.uri.protocol = protocol.into();
        self
    }

    /// Set the node address.
    pub fn core_address(mut self, host: &str, port: u16) -> Self {
        self.uri.core_uri = format!("{host}:{port}");
        self
    }

    /// Set the node key.
    pub fn core_key(mut self, key: impl Into<String>) -> Self {
        self.uri.core_key = key.into();
        self
    }

    /// Append a namespace segment.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.uri.namespaces.push(namespace.into());
        self
    }

    /// Set the agent key.
    pub fn agent_key(mut self, key: impl Into<String>) -> Self {
        self.uri.agent_key = key.into();
        self
    }

    /// Set the service alias.
    pub fn agent_alias(mut self, alias: impl Into<String>) -> Self {
        self.uri.agent_alias = alias.into();
        self
    }

    /// Finish the URI.
    pub fn build(self) -> OefUri {
        self.uri
    }
}

/// Addressing context of an agent-to-agent message.
///
/// Lets a reply reach the specific service of the other agent that a
/// dialogue is about, rather than the agent as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    /// Where the message goes
    pub target_uri: OefUri,
    /// Where the message comes from
    pub source_uri: OefUri,
    /// Service addressed on the target
    pub service_id: String,
    /// Alias of the addressed service
    pub agent_alias: String,
}

impl Context {
    /// Context for a message received with the given URIs.
    pub fn from_uris(target: &str, source: &str) -> Self {
        let mut context = Self::default();
        context.update(target, source);
        context
    }

    /// Replace both URIs with parsed values; unparsable URIs stay empty.
    pub fn update(&mut self, target: &str, source: &str) {
        self.target_uri = parse_or_empty(target);
        self.source_uri = parse_or_empty(source);
        self.service_id = self.target_uri.agent_alias.clone();
        self.agent_alias = self.service_id.clone();
    }

    /// Turn a received context into the context of the reply.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.target_uri, &mut self.source_uri);
        self.service_id = self.target_uri.agent_alias.clone();
        self.agent_alias = self.target_uri.agent_alias.clone();
    }

    /// Address agents directly by `"key"` or `"key/alias"`.
    pub fn for_agent(&mut self, target: &str, source: &str, same_alias: bool) {
        self.target_uri = OefUri::for_agent(target);
        self.source_uri = OefUri::for_agent(source);
        if same_alias {
            self.source_uri.agent_alias = self.target_uri.agent_alias.clone();
        }
        self.service_id = self.target_uri.agent_alias.clone();
    }
}

fn parse_or_empty(uri: &str) -> OefUri {
    if uri.is_empty() {
        return OefUri::default();
    }
    uri.parse().unwrap_or_else(|e| {
        tracing::warn!("OEF URI parse failed: {}", e);
        OefUri::default()
    })
}
