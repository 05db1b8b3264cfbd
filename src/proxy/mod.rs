//! Agent-side session with an OEF node.
//!
//! A [`Proxy`] owns one connection to one node. After the handshake it runs
//! two tasks over the socket:
//!
//! ```text
//!                 ┌──────────────────────────────────────────┐
//!  send_*() ────> │ outbound queue ──> writer ──> [frames] ──┼──> node
//!                 │                                          │
//!  AgentHandler <─┼── dispatcher <── reader <── [frames] <───┼─── node
//!                 │        ^                                 │
//!                 │        └── handler gate (bind_handler)   │
//!                 └──────────────────────────────────────────┘
//! ```
//!
//! Sends only enqueue; the writer puts envelopes on the wire in enqueue
//! order. The reader hands each node message to the bound [`AgentHandler`],
//! holding messages until a handler is bound. When either task hits a
//! transport error, or [`Proxy::stop`] is called, both tasks wind down and
//! the session ends in [`SessionState::Stopped`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oef::proxy::{AgentHandler, Proxy};
//! use oef::protocol::Description;
//!
//! struct Weather;
//! impl AgentHandler for Weather {}
//!
//! let proxy = Proxy::new("weather_station", "127.0.0.1", 3333);
//! proxy.connect_agent(Arc::new(Weather)).await?;
//! proxy.register_service(0, Description::default(), "wind")?;
//! proxy.wait_until_stopped().await;
//! ```

mod context;
mod handler;
mod handshake;
mod reader;
mod writer;

pub use handler::AgentHandler;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::{CancellationToken, DropGuard};

use context::ContextStore;
use handler::HandlerGate;

use crate::config::ProxyConfig;
use crate::error::{OefSdkError, Result};
use crate::protocol::{
    CfpQuery, Context, Description, Envelope, OefUri, Proposals, Query, SessionState,
};
use crate::transport::TcpTransport;

/// Handle to an agent's session with its OEF node.
///
/// Cheap to clone; clones share the session. Dropping the last handle
/// cancels the session as [`stop`](Self::stop) would, without waiting. A
/// handler that keeps its own clone keeps the session alive until `stop`.
#[derive(Clone)]
pub struct Proxy {
    inner: Arc<Inner>,
    _cancel_on_drop: Arc<DropGuard>,
}

struct Inner {
    public_key: String,
    config: ProxyConfig,
    session_id: String,
    state: watch::Sender<SessionState>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Envelope>>>,
    gate: HandlerGate,
    contexts: ContextStore,
    cancel: CancellationToken,
    live_loops: AtomicUsize,
}

impl Proxy {
    /// Create a proxy for the agent `public_key` and the node at `host:port`.
    pub fn new(public_key: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self::with_config(public_key, ProxyConfig::new(host, port))
    }

    /// Create a proxy from a full configuration.
    pub fn with_config(public_key: impl Into<String>, config: ProxyConfig) -> Self {
        let (state, _) = watch::channel(SessionState::Unconnected);
        let cancel = CancellationToken::new();
        Self {
            _cancel_on_drop: Arc::new(cancel.clone().drop_guard()),
            inner: Arc::new(Inner {
                public_key: public_key.into(),
                config,
                session_id: uuid::Uuid::new_v4().to_string(),
                state,
                outbound: Mutex::new(None),
                gate: HandlerGate::new(),
                contexts: ContextStore::default(),
                cancel,
                live_loops: AtomicUsize::new(0),
            }),
        }
    }

    /// Agent public key.
    pub fn public_key(&self) -> &str {
        &self.inner.public_key
    }

    /// Session ID, used to correlate log lines.
    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Check if sends are currently accepted.
    pub fn is_connected(&self) -> bool {
        self.state().is_active()
    }

    /// Bind the agent's callbacks.
    ///
    /// Only the first call binds; later calls log a warning, leave the first
    /// handler in place and return `false`. May be called before or after
    /// [`connect`](Self::connect).
    pub fn bind_handler(&self, handler: Arc<dyn AgentHandler>) -> bool {
        self.inner.gate.bind(handler)
    }

    /// Connect to the configured node over TCP and perform the handshake.
    ///
    /// Fails with [`OefSdkError::AlreadyConnected`] unless the proxy is
    /// unconnected. On any failure the proxy returns to unconnected and no
    /// tasks are started, except that a [`stop`](Self::stop) issued while
    /// connecting fails the attempt with [`OefSdkError::Stopped`] and leaves
    /// the proxy stopped.
    pub async fn connect(&self) -> Result<()> {
        self.inner.config.validate()?;
        let transport = TcpTransport::from_config(&self.inner.config);
        self.establish(async move {
            let stream = transport.connect().await?;
            Ok::<_, OefSdkError>(stream.into_split())
        })
        .await
    }

    /// Perform the handshake over an already open stream.
    pub async fn connect_stream<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        self.establish(async move { Ok::<_, OefSdkError>(tokio::io::split(stream)) })
            .await
    }

    /// Bind `handler`, then [`connect`](Self::connect).
    pub async fn connect_agent(&self, handler: Arc<dyn AgentHandler>) -> Result<()> {
        self.bind_handler(handler);
        self.connect().await
    }

    /// End the session and wait until both tasks have exited.
    ///
    /// Envelopes still queued are discarded. Idempotent and safe to call
    /// concurrently; a no-op on a proxy that was never connected.
    pub async fn stop(&self) {
        self.inner.begin_shutdown("stop requested");
        self.wait_until_stopped().await;
    }

    /// Wait until the session has stopped.
    ///
    /// Returns immediately if the proxy is unconnected or already stopped.
    pub async fn wait_until_stopped(&self) {
        let mut state = self.inner.state.subscribe();
        let _ = state
            .wait_for(|s| matches!(s, SessionState::Unconnected | SessionState::Stopped))
            .await;
    }

    /// Addressing context of the content message a callback is handling.
    ///
    /// Only meaningful from inside the callback for that message; otherwise
    /// the context is empty. Swap it to address the reply:
    ///
    /// ```rust,ignore
    /// let mut context = proxy.context(msg_id, dialogue_id, origin);
    /// context.swap();
    /// proxy.send(Envelope::propose(msg_id + 1, dialogue_id, origin, msg_id, proposals)
    ///     .with_context(&context))?;
    /// ```
    pub fn context(&self, answer_id: u32, dialogue_id: u32, origin: &str) -> Context {
        self.inner.contexts.get(answer_id, dialogue_id, origin)
    }

    /// Enqueue a pre-built envelope.
    pub fn send(&self, envelope: Envelope) -> Result<()> {
        let guard = self.inner.outbound();
        let queue = guard.as_ref().ok_or(OefSdkError::NotConnected)?;
        queue.send(envelope).map_err(|_| OefSdkError::NotConnected)
    }

    /// Register the agent with the node's agent directory.
    pub fn register_agent(&self, msg_id: u32, description: Description) -> Result<()> {
        self.send(Envelope::register_agent(msg_id, description))
    }

    /// Remove the agent from the agent directory.
    pub fn unregister_agent(&self, msg_id: u32) -> Result<()> {
        self.send(Envelope::unregister_agent(msg_id))
    }

    /// Register a service offered under the alias `service_id`.
    pub fn register_service(
        &self,
        msg_id: u32,
        description: Description,
        service_id: &str,
    ) -> Result<()> {
        let uri = self.service_uri(service_id);
        self.send(Envelope::register_service(msg_id, description, &uri))
    }

    /// Remove the service offered under the alias `service_id`.
    pub fn unregister_service(
        &self,
        msg_id: u32,
        description: Description,
        service_id: &str,
    ) -> Result<()> {
        let uri = self.service_uri(service_id);
        self.send(Envelope::unregister_service(msg_id, description, &uri))
    }

    /// Search the agent directory; results arrive via
    /// [`AgentHandler::on_search_result`].
    pub fn search_agents(&self, search_id: u32, query: Query) -> Result<()> {
        self.send(Envelope::search_agents(search_id, query))
    }

    /// Search the service directory of the local node.
    pub fn search_services(&self, search_id: u32, query: Query) -> Result<()> {
        self.send(Envelope::search_services(search_id, query))
    }

    /// Search services across the OEF network; results arrive via
    /// [`AgentHandler::on_search_result_wide`].
    pub fn search_services_wide(&self, search_id: u32, query: Query) -> Result<()> {
        self.send(Envelope::search_services_wide(search_id, query))
    }

    /// Send raw bytes to another agent.
    pub fn send_message(
        &self,
        msg_id: u32,
        dialogue_id: u32,
        destination: &str,
        content: Vec<u8>,
    ) -> Result<()> {
        self.send(Envelope::message(msg_id, dialogue_id, destination, content))
    }

    /// Send a call for proposals.
    pub fn send_cfp(
        &self,
        msg_id: u32,
        dialogue_id: u32,
        destination: &str,
        target: u32,
        query: CfpQuery,
    ) -> Result<()> {
        self.send(Envelope::cfp(msg_id, dialogue_id, destination, target, query))
    }

    /// Send a proposal.
    pub fn send_propose(
        &self,
        msg_id: u32,
        dialogue_id: u32,
        destination: &str,
        target: u32,
        proposals: Proposals,
    ) -> Result<()> {
        self.send(Envelope::propose(
            msg_id,
            dialogue_id,
            destination,
            target,
            proposals,
        ))
    }

    /// Accept a proposal.
    pub fn send_accept(
        &self,
        msg_id: u32,
        dialogue_id: u32,
        destination: &str,
        target: u32,
    ) -> Result<()> {
        self.send(Envelope::accept(msg_id, dialogue_id, destination, target))
    }

    /// Decline a proposal.
    pub fn send_decline(
        &self,
        msg_id: u32,
        dialogue_id: u32,
        destination: &str,
        target: u32,
    ) -> Result<()> {
        self.send(Envelope::decline(msg_id, dialogue_id, destination, target))
    }

    fn service_uri(&self, service_id: &str) -> OefUri {
        OefUri::builder()
            .agent_key(self.inner.public_key.as_str())
            .agent_alias(service_id)
            .build()
    }

    /// Open the stream with `open`, handshake over it and start both tasks,
    /// all within the connect timeout.
    async fn establish<R, W, F>(&self, open: F) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        F: Future<Output = Result<(R, W)>>,
    {
        let inner = &self.inner;
        if !inner.transition(SessionState::Unconnected, SessionState::Handshaking) {
            return Err(OefSdkError::AlreadyConnected);
        }
        tracing::info!(
            "Session {} connecting to {} as {}",
            inner.session_id,
            inner.config.addr(),
            inner.public_key
        );

        let attempt = async {
            let (mut reader, mut writer) = open.await?;
            handshake::perform(&mut reader, &mut writer, &inner.public_key).await?;
            Ok::<_, OefSdkError>((reader, writer))
        };

        let result = tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => Err(OefSdkError::Stopped),
            result = tokio::time::timeout(inner.config.connect_timeout(), attempt) => match result {
                Ok(result) => result,
                Err(_) => Err(OefSdkError::ConnectTimeout(
                    inner.config.connect_timeout().as_secs(),
                )),
            },
        };

        match result {
            // A stop that lands after the handshake finished still wins
            Ok(_) if inner.cancel.is_cancelled() => {
                inner.transition(SessionState::Handshaking, SessionState::Stopped);
                tracing::info!("Session {} stopped before activation", inner.session_id);
                Err(OefSdkError::Stopped)
            },
            Ok((reader, writer)) => {
                self.start(reader, writer);
                tracing::info!("Session {} active", inner.session_id);
                Ok(())
            },
            Err(OefSdkError::Stopped) => {
                inner.transition(SessionState::Handshaking, SessionState::Stopped);
                tracing::info!("Session {} stopped while connecting", inner.session_id);
                Err(OefSdkError::Stopped)
            },
            Err(e) => {
                inner.transition(SessionState::Handshaking, SessionState::Unconnected);
                tracing::warn!("Session {} failed to connect: {}", inner.session_id, e);
                Err(e)
            },
        }
    }

    fn start<R, W>(&self, reader: R, writer: W)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.outbound() = Some(tx);
        self.inner.live_loops.store(2, Ordering::SeqCst);
        self.inner
            .transition(SessionState::Handshaking, SessionState::Active);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = writer::run(writer, rx, inner.cancel.clone()).await;
            inner.loop_exited("writer", result);
        });

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result =
                reader::run(reader, &inner.gate, &inner.contexts, inner.cancel.clone()).await;
            inner.loop_exited("reader", result);
        });
    }
}

impl Inner {
    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        debug_assert!(from.can_transition_to(to));
        self.state.send_if_modified(|state| {
            if *state != from {
                return false;
            }
            *state = to;
            true
        })
    }

    fn outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<Envelope>>> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move an active session to stopping: close the queue and cancel both
    /// tasks. During the handshake, cancel the connect attempt instead;
    /// `establish` then moves the session to stopped. Later calls do nothing.
    fn begin_shutdown(&self, reason: &str) {
        let mut seen = SessionState::Unconnected;
        self.state.send_if_modified(|state| {
            seen = *state;
            if *state != SessionState::Active {
                return false;
            }
            *state = SessionState::Stopping;
            true
        });

        match seen {
            SessionState::Active => {
                tracing::info!("Session {} stopping: {}", self.session_id, reason);
                self.outbound().take();
                self.cancel.cancel();
            },
            SessionState::Handshaking => {
                tracing::info!("Session {} abandoning handshake: {}", self.session_id, reason);
                self.cancel.cancel();
            },
            _ => {},
        }
    }

    fn loop_exited(&self, name: &str, result: Result<()>) {
        match result {
            Ok(()) => tracing::debug!("Session {} {} exited", self.session_id, name),
            Err(e) if e.is_disconnect() => {
                tracing::info!("Session {} closed by node", self.session_id);
            },
            Err(e) => tracing::warn!("Session {} {} failed: {}", self.session_id, name, e),
        }

        self.begin_shutdown(&format!("{name} exited"));
        if self.live_loops.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.transition(SessionState::Stopping, SessionState::Stopped);
            tracing::info!("Session {} stopped", self.session_id);
        }
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("public_key", &self.inner.public_key)
            .field("session_id", &self.inner.session_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
