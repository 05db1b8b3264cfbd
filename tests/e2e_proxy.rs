//! End-to-end proxy tests.
//!
//! These tests run the proxy against a mock OEF node listening on a real
//! TCP socket: handshake, ordered sends, dispatch, late handler binding and
//! shutdown.

use std::sync::Arc;
use std::time::Duration;

use oef::codec;
use oef::protocol::{
    AgentContent, Answer, Connected, ContentMessage, EnvelopePayload, ErrorOperation, FipaKind,
    FipaMessage, Identify, Phrase, ServerMessage, ServerPayload,
};
use oef::transport::{read_frame, write_frame};
use oef::{
    AgentHandler, CfpQuery, Description, Envelope, OefErrorInfo, OefSdkError, Proposals, Proxy,
    ProxyConfig, Query, SessionState,
};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Bind a mock node on an ephemeral port
async fn mock_node() -> (TcpListener, ProxyConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, ProxyConfig::new("127.0.0.1", port))
}

/// Accept one agent and run the node side of the handshake.
///
/// Returns the socket and the public key the agent identified with.
async fn accept_agent(listener: &TcpListener, phrase: Phrase, status: bool) -> (TcpStream, String) {
    let (mut stream, _) = listener.accept().await.unwrap();
    let identify: Identify = codec::decode(&read_frame(&mut stream).await.unwrap()).unwrap();

    write_frame(&mut stream, &codec::encode(&phrase).unwrap())
        .await
        .unwrap();
    let Some(expected) = phrase.text() else {
        return (stream, identify.public_key);
    };

    let answer: Answer = codec::decode(&read_frame(&mut stream).await.unwrap()).unwrap();
    assert_eq!(answer.answer, expected);

    write_frame(&mut stream, &codec::encode(&Connected { status }).unwrap())
        .await
        .unwrap();
    (stream, identify.public_key)
}

/// Connect a proxy to a fresh mock node
async fn connected_pair(public_key: &str) -> (Proxy, TcpStream) {
    init_tracing();
    let (listener, config) = mock_node().await;
    let proxy = Proxy::with_config(public_key, config);

    let (connected, (node, key)) = tokio::join!(
        proxy.connect(),
        accept_agent(&listener, Phrase::challenge("RandomlyGeneratedString"), true)
    );
    connected.unwrap();
    assert_eq!(key, public_key);
    (proxy, node)
}

async fn send_to_agent(node: &mut TcpStream, message: &ServerMessage) {
    write_frame(node, &codec::encode(message).unwrap())
        .await
        .unwrap();
}

async fn recv_from_agent(node: &mut TcpStream) -> Envelope {
    let frame = timeout(WAIT, read_frame(node))
        .await
        .expect("Timed out waiting for envelope")
        .unwrap();
    codec::decode(&frame).unwrap()
}

fn fipa_from(answer_id: u32, origin: &str, fipa: FipaMessage) -> ServerMessage {
    ServerMessage {
        answer_id,
        payload: ServerPayload::Content(ContentMessage {
            dialogue_id: 1,
            origin: origin.to_string(),
            source_uri: String::new(),
            target_uri: String::new(),
            content: AgentContent::Fipa(fipa),
        }),
    }
}

/// Reports every callback as a line on a channel
struct Events(mpsc::UnboundedSender<String>);

impl Events {
    fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self(tx)), rx)
    }

    fn emit(&self, event: String) {
        let _ = self.0.send(event);
    }
}

impl AgentHandler for Events {
    fn on_oef_error(&self, answer_id: u32, error: OefErrorInfo) {
        self.emit(format!("oef_error {} {:?}", answer_id, error.operation));
    }

    fn on_search_result(&self, search_id: u32, agents: Vec<String>) {
        self.emit(format!("search {} {}", search_id, agents.join(",")));
    }

    fn on_message(&self, answer_id: u32, _dialogue_id: u32, origin: &str, content: Vec<u8>) {
        let text = String::from_utf8_lossy(&content).into_owned();
        self.emit(format!("message {} {} {}", answer_id, origin, text));
    }

    fn on_cfp(&self, answer_id: u32, _dialogue_id: u32, _origin: &str, _target: u32, query: CfpQuery) {
        self.emit(format!("cfp {} {:?}", answer_id, query));
    }

    fn on_accept(&self, answer_id: u32, _dialogue_id: u32, _origin: &str, target: u32) {
        self.emit(format!("accept {} {}", answer_id, target));
    }
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(WAIT, events.recv())
        .await
        .expect("Timed out waiting for callback")
        .unwrap()
}

#[tokio::test]
async fn test_handshake_activates_session() {
    let (proxy, _node) = connected_pair("weather_station").await;

    assert_eq!(proxy.state(), SessionState::Active);
    assert!(proxy.is_connected());

    proxy.stop().await;
}

#[tokio::test]
async fn test_register_then_unregister_arrive_in_order() {
    let (proxy, mut node) = connected_pair("weather_station").await;

    proxy
        .register_agent(0, Description::new(json!({"name": "weather_station"})))
        .unwrap();
    proxy.unregister_agent(1).unwrap();

    let first = recv_from_agent(&mut node).await;
    assert_eq!(first.msg_id, 0);
    assert!(matches!(first.payload, EnvelopePayload::RegisterAgent { .. }));

    let second = recv_from_agent(&mut node).await;
    assert_eq!(second.msg_id, 1);
    assert_eq!(second.payload, EnvelopePayload::UnregisterAgent);

    proxy.stop().await;
}

#[tokio::test]
async fn test_sends_from_many_tasks_keep_per_task_order() {
    let (proxy, mut node) = connected_pair("weather_station").await;

    let mut producers = Vec::new();
    for dialogue in 0..4u32 {
        let proxy = proxy.clone();
        producers.push(tokio::spawn(async move {
            for seq in 0..25u32 {
                proxy
                    .send_message(seq, dialogue, "client", seq.to_string().into_bytes())
                    .unwrap();
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    let mut next_seq = [0u32; 4];
    for _ in 0..100 {
        let envelope = recv_from_agent(&mut node).await;
        let EnvelopePayload::SendMessage(message) = envelope.payload else {
            panic!("unexpected payload");
        };
        let dialogue = message.dialogue_id as usize;
        assert_eq!(envelope.msg_id, next_seq[dialogue]);
        next_seq[dialogue] += 1;
    }

    proxy.stop().await;
}

#[tokio::test]
async fn test_empty_phrase_fails_connect() {
    init_tracing();
    let (listener, config) = mock_node().await;
    let proxy = Proxy::with_config("weather_station", config);

    let (connected, (mut node, _)) = tokio::join!(
        proxy.connect(),
        accept_agent(&listener, Phrase::challenge(""), true)
    );

    assert!(matches!(connected, Err(OefSdkError::Handshake(_))));
    assert_eq!(proxy.state(), SessionState::Unconnected);

    // Socket dropped, no loops left behind
    assert!(matches!(
        timeout(WAIT, read_frame(&mut node)).await.unwrap(),
        Err(OefSdkError::ConnectionClosed)
    ));
    assert!(matches!(
        proxy.unregister_agent(0),
        Err(OefSdkError::NotConnected)
    ));
}

#[tokio::test]
async fn test_refused_agent_fails_connect() {
    init_tracing();
    let (listener, config) = mock_node().await;
    let proxy = Proxy::with_config("weather_station", config);

    let (refused, _) = tokio::join!(
        proxy.connect(),
        accept_agent(&listener, Phrase::refused(), true)
    );
    assert!(matches!(refused, Err(OefSdkError::Handshake(_))));

    let (rejected, _) = tokio::join!(
        proxy.connect(),
        accept_agent(&listener, Phrase::challenge("abc"), false)
    );
    assert!(matches!(rejected, Err(OefSdkError::Handshake(_))));
    assert_eq!(proxy.state(), SessionState::Unconnected);
}

#[tokio::test]
async fn test_connect_refused() {
    let (listener, config) = mock_node().await;
    drop(listener);

    let proxy = Proxy::with_config("weather_station", config);
    let err = proxy.connect().await.unwrap_err();

    assert!(matches!(err, OefSdkError::Connection(_)));
    assert_eq!(proxy.state(), SessionState::Unconnected);
}

#[tokio::test]
async fn test_silent_node_times_out() {
    let (listener, config) = mock_node().await;
    let proxy = Proxy::with_config(
        "weather_station",
        config.with_connect_timeout(Duration::from_secs(1)),
    );

    // Accept but never answer
    let node = tokio::spawn(async move { listener.accept().await });

    let err = proxy.connect().await.unwrap_err();
    assert!(matches!(err, OefSdkError::ConnectTimeout(1)));
    assert_eq!(proxy.state(), SessionState::Unconnected);
    drop(node);
}

#[tokio::test]
async fn test_late_binding_delivers_exactly_once() {
    let (proxy, mut node) = connected_pair("weather_station").await;
    let (events, mut rx) = Events::channel();

    send_to_agent(
        &mut node,
        &ServerMessage {
            answer_id: 7,
            payload: ServerPayload::Agents {
                agents: vec!["station_a".to_string(), "station_b".to_string()],
            },
        },
    )
    .await;

    // Give the reader time to receive the frame while unbound
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());

    assert!(proxy.bind_handler(events));
    assert_eq!(next_event(&mut rx).await, "search 7 station_a,station_b");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());

    proxy.stop().await;
}

#[tokio::test]
async fn test_second_handler_is_ignored() {
    let (proxy, mut node) = connected_pair("weather_station").await;
    let (first, mut first_rx) = Events::channel();
    let (second, mut second_rx) = Events::channel();

    assert!(proxy.bind_handler(first));
    assert!(!proxy.bind_handler(second));

    send_to_agent(&mut node, &fipa_from(3, "client", FipaMessage::accept(2))).await;
    assert_eq!(next_event(&mut first_rx).await, "accept 3 2");
    assert!(second_rx.try_recv().is_err());

    proxy.stop().await;
}

#[tokio::test]
async fn test_bad_frame_between_good_frames() {
    let (proxy, mut node) = connected_pair("weather_station").await;
    let (events, mut rx) = Events::channel();
    proxy.bind_handler(events);

    send_to_agent(
        &mut node,
        &ServerMessage {
            answer_id: 1,
            payload: ServerPayload::OefError {
                operation: ErrorOperation::RegisterService,
                cause: "duplicate".to_string(),
                detail: String::new(),
            },
        },
    )
    .await;
    write_frame(&mut node, b"\x00\x01garbage").await.unwrap();
    send_to_agent(&mut node, &fipa_from(2, "client", FipaMessage::accept(0))).await;

    assert_eq!(next_event(&mut rx).await, "oef_error 1 RegisterService");
    assert_eq!(next_event(&mut rx).await, "accept 2 0");
    assert!(proxy.is_connected());

    proxy.stop().await;
}

#[tokio::test]
async fn test_unknown_case_is_ignored() {
    let (proxy, mut node) = connected_pair("weather_station").await;
    let (events, mut rx) = Events::channel();
    proxy.bind_handler(events);

    let unknown = json!({"answer_id": 4, "payload": {"case": "Heartbeat"}});
    write_frame(&mut node, &serde_json::to_vec(&unknown).unwrap())
        .await
        .unwrap();
    send_to_agent(&mut node, &fipa_from(5, "client", FipaMessage::accept(1))).await;

    assert_eq!(next_event(&mut rx).await, "accept 5 1");

    proxy.stop().await;
}

#[tokio::test]
async fn test_concurrent_stop_closes_once() {
    let (proxy, mut node) = connected_pair("weather_station").await;

    let other = proxy.clone();
    tokio::join!(proxy.stop(), other.stop());

    assert_eq!(proxy.state(), SessionState::Stopped);
    assert!(matches!(
        timeout(WAIT, read_frame(&mut node)).await.unwrap(),
        Err(OefSdkError::ConnectionClosed)
    ));

    // Later calls are no-ops
    timeout(WAIT, proxy.stop()).await.unwrap();
}

#[tokio::test]
async fn test_remote_disconnect_stops_session() {
    let (proxy, node) = connected_pair("weather_station").await;
    drop(node);

    timeout(WAIT, proxy.wait_until_stopped())
        .await
        .expect("Session did not stop");

    assert_eq!(proxy.state(), SessionState::Stopped);
    assert!(matches!(
        proxy.search_services(1, Query::default()),
        Err(OefSdkError::NotConnected)
    ));
}

#[tokio::test]
async fn test_cfp_nothing_stays_distinct_from_empty_bytes() {
    let (proxy, mut node) = connected_pair("weather_station").await;

    proxy
        .send_cfp(0, 1, "station", 0, CfpQuery::nothing())
        .unwrap();
    proxy
        .send_cfp(1, 2, "station", 0, CfpQuery::bytes(Vec::new()))
        .unwrap();

    let mut received = Vec::new();
    for _ in 0..2 {
        let envelope = recv_from_agent(&mut node).await;
        let EnvelopePayload::SendMessage(message) = envelope.payload else {
            panic!("unexpected payload");
        };
        let AgentContent::Fipa(FipaMessage {
            kind: FipaKind::Cfp { query },
            ..
        }) = message.content
        else {
            panic!("unexpected content");
        };
        received.push(query);
    }

    assert_eq!(received[0], CfpQuery::Nothing);
    assert_eq!(received[1], CfpQuery::bytes(Vec::new()));
    assert_ne!(received[0], received[1]);

    proxy.stop().await;
}

/// Answers every CFP with a proposal through its own proxy
struct Station {
    proxy: Proxy,
}

impl AgentHandler for Station {
    fn on_cfp(&self, msg_id: u32, dialogue_id: u32, origin: &str, target: u32, _query: CfpQuery) {
        self.proxy
            .send_propose(
                msg_id + 1,
                dialogue_id,
                origin,
                target + 1,
                Proposals::bytes(b"price=50".to_vec()),
            )
            .unwrap();
    }
}

#[tokio::test]
async fn test_handler_replies_from_callback() {
    init_tracing();
    let (listener, config) = mock_node().await;
    let proxy = Proxy::with_config("weather_station", config);
    let station = Arc::new(Station {
        proxy: proxy.clone(),
    });

    let (connected, (mut node, _)) = tokio::join!(
        proxy.connect_agent(station),
        accept_agent(&listener, Phrase::challenge("abc"), true)
    );
    connected.unwrap();

    send_to_agent(
        &mut node,
        &fipa_from(1, "client", FipaMessage::cfp(0, CfpQuery::nothing())),
    )
    .await;

    let reply = recv_from_agent(&mut node).await;
    assert_eq!(reply.msg_id, 2);
    let EnvelopePayload::SendMessage(message) = reply.payload else {
        panic!("unexpected payload");
    };
    assert_eq!(message.destination, "client");
    assert_eq!(
        message.content,
        AgentContent::Fipa(FipaMessage::propose(1, Proposals::bytes(b"price=50".to_vec())))
    );

    proxy.stop().await;
}

#[tokio::test]
async fn test_raw_message_reaches_handler() {
    let (proxy, mut node) = connected_pair("weather_station").await;
    let (events, mut rx) = Events::channel();
    proxy.bind_handler(events);

    send_to_agent(
        &mut node,
        &ServerMessage {
            answer_id: 9,
            payload: ServerPayload::Content(ContentMessage {
                dialogue_id: 3,
                origin: "client".to_string(),
                source_uri: String::new(),
                target_uri: String::new(),
                content: AgentContent::Raw {
                    content: b"hello".to_vec(),
                },
            }),
        },
    )
    .await;

    assert_eq!(next_event(&mut rx).await, "message 9 client hello");

    proxy.stop().await;
}

#[tokio::test]
async fn test_stop_mid_handshake_returns() {
    init_tracing();
    let (listener, config) = mock_node().await;
    let proxy = Proxy::with_config("weather_station", config);
    let connecting = {
        let proxy = proxy.clone();
        tokio::spawn(async move { proxy.connect().await })
    };

    let (mut node, _) = listener.accept().await.unwrap();
    let _: Identify = codec::decode(&read_frame(&mut node).await.unwrap()).unwrap();
    assert_eq!(proxy.state(), SessionState::Handshaking);

    let stopping = {
        let proxy = proxy.clone();
        tokio::spawn(async move { proxy.stop().await })
    };
    let connected = timeout(WAIT, connecting)
        .await
        .expect("connect() did not return")
        .unwrap();
    assert!(matches!(connected, Err(OefSdkError::Stopped)));

    // The node finishes its side anyway; the agent is already gone
    let phrase = codec::encode(&Phrase::challenge("abc")).unwrap();
    let _ = write_frame(&mut node, &phrase).await;
    let accepted = codec::encode(&Connected { status: true }).unwrap();
    let _ = write_frame(&mut node, &accepted).await;

    timeout(WAIT, stopping)
        .await
        .expect("stop() did not return")
        .unwrap();
    assert_eq!(proxy.state(), SessionState::Stopped);
    assert!(matches!(
        proxy.register_agent(0, Description::default()),
        Err(OefSdkError::NotConnected)
    ));
}

/// Answers every CFP to the service it was addressed to
struct ServiceStation {
    proxy: Proxy,
}

impl AgentHandler for ServiceStation {
    fn on_cfp(&self, msg_id: u32, dialogue_id: u32, origin: &str, target: u32, _query: CfpQuery) {
        let mut context = self.proxy.context(msg_id, dialogue_id, origin);
        assert_eq!(context.service_id, "wind");
        context.swap();

        let reply = Envelope::propose(
            msg_id + 1,
            dialogue_id,
            origin,
            target + 1,
            Proposals::bytes(b"price=50".to_vec()),
        );
        self.proxy.send(reply.with_context(&context)).unwrap();
    }
}

#[tokio::test]
async fn test_reply_addresses_sending_service() {
    init_tracing();
    let (listener, config) = mock_node().await;
    let proxy = Proxy::with_config("weather_station", config);
    let station = Arc::new(ServiceStation {
        proxy: proxy.clone(),
    });

    let (connected, (mut node, _)) = tokio::join!(
        proxy.connect_agent(station),
        accept_agent(&listener, Phrase::challenge("abc"), true)
    );
    connected.unwrap();

    send_to_agent(
        &mut node,
        &ServerMessage {
            answer_id: 1,
            payload: ServerPayload::Content(ContentMessage {
                dialogue_id: 4,
                origin: "client".to_string(),
                source_uri: "tcp://///client/buyer".to_string(),
                target_uri: "tcp://///weather_station/wind".to_string(),
                content: AgentContent::Fipa(FipaMessage::cfp(0, CfpQuery::nothing())),
            }),
        },
    )
    .await;

    let reply = recv_from_agent(&mut node).await;
    assert_eq!(reply.msg_id, 2);
    let EnvelopePayload::SendMessage(message) = reply.payload else {
        panic!("unexpected payload");
    };
    assert_eq!(message.destination, "client");
    assert_eq!(message.target_uri, "tcp://///client/buyer");
    assert_eq!(message.source_uri, "tcp://///weather_station/wind");

    // Context is only held while the callback runs
    assert!(proxy.context(1, 4, "client").target_uri.is_empty());

    proxy.stop().await;
}
