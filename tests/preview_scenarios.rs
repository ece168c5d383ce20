//! End-to-end preview scenarios.
//!
//! Each test drives a [`Preview`] the way the editing UI does: build, start,
//! edit the form, publish events. The preview server side is either a real
//! `tokio-tungstenite` listener, a bridged socket, or a `wiremock` server.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use preview_sync::form::{MappingDescriptor, MappingKey};
use preview_sync::transport::{BridgedConnector, MOZ_WEBSOCKET, SocketBackend, WEBSOCKET};
use preview_sync::{
    Document, DomEventKind, Host, Initialization, Node, NodeId, Preview, PreviewConfig,
    PreviewEvent, SessionInfo, SessionState, SharedDocument, TransportMethod,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// ============================================================================
// Fixtures
// ============================================================================

const WAIT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Form {
    document: SharedDocument,
    title: NodeId,
    block_texts: Vec<NodeId>,
}

/// form
/// ├── input.preview-update [title]
/// └── div [blocks]
///     ├── section (instance) └── textarea.preview-update [text] "first"
///     └── section (instance) └── textarea.preview-update [text] "second"
fn form() -> Form {
    let mut doc = Document::new();
    let root = doc.root();

    let title = doc
        .append(
            root,
            Node::new("input").mapping("title").bound(json!("")).preview_update(),
        )
        .unwrap();

    let blocks = doc
        .append(
            root,
            Node::new("div").mapping(MappingKey::Descriptors(vec![
                MappingDescriptor::new("blocks"),
                MappingDescriptor::new("gallery"),
            ])),
        )
        .unwrap();

    let block_texts = ["first", "second"]
        .into_iter()
        .map(|text| {
            let section = doc.append(blocks, Node::new("section").block_instance()).unwrap();
            doc.append(
                section,
                Node::new("textarea").mapping("text").bound(json!(text)).preview_update(),
            )
            .unwrap()
        })
        .collect();

    Form {
        document: doc.into_shared(),
        title,
        block_texts,
    }
}

fn session() -> SessionInfo {
    SessionInfo::new("123-abc", "sulu_io", "en", "7")
}

fn config(ws_port: u16, http_base: &str) -> PreviewConfig {
    PreviewConfig::builder()
        .ws_url("ws://127.0.0.1")
        .ws_port(ws_port)
        .http_base(http_base)
        .connect_timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}

fn preview(host: Host, ws_port: u16, http_base: &str, form: &Form) -> Preview {
    Preview::builder()
        .config(config(ws_port, http_base))
        .host(host)
        .session(session())
        .document(Arc::clone(&form.document))
        .build()
        .unwrap()
}

/// Accepts one socket connection and forwards its text frames as JSON.
async fn ws_server() -> (u16, mpsc::UnboundedReceiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                let _ = tx.send(serde_json::from_str::<Value>(text.as_str()).unwrap());
            }
        }
    });

    (port, rx)
}

/// Returns a local port nothing listens on.
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Mounts the start and update routes of the HTTP fallback.
async fn http_server(expected_starts: u64) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/content/preview/123-abc/start"))
        .and(query_param("webspace", "sulu_io"))
        .and(query_param("language", "en"))
        .respond_with(ResponseTemplate::new(200))
        .expect(expected_starts)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/admin/content/preview/123-abc/update"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    server
}

async fn wait_for_posts(server: &MockServer, count: usize) -> Vec<Request> {
    for _ in 0..200 {
        let posts = posts(server).await;
        if posts.len() >= count {
            return posts;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {count} update requests");
}

async fn posts(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .collect()
}

fn changes(request: &Request) -> Value {
    let body: Value = serde_json::from_slice(&request.body).unwrap();
    body["changes"].clone()
}

async fn next_frame(frames: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    timeout(WAIT, frames.recv()).await.unwrap().unwrap()
}

async fn next_backend_frame(backend: &mut SocketBackend) -> Value {
    let text = timeout(WAIT, backend.outbound.recv()).await.unwrap().unwrap();
    serde_json::from_str(&text).unwrap()
}

// ============================================================================
// WebSocket
// ============================================================================

#[tokio::test]
async fn websocket_blur_sends_update_after_start() {
    init_tracing();
    let (port, mut frames) = ws_server().await;
    let form = form();
    let preview = preview(Host::native(), port, "http://127.0.0.1:1", &form);
    let mut events = preview.events().subscribe();

    assert_eq!(
        preview.start().await,
        Initialization::Ready(TransportMethod::WebSocket)
    );
    assert_eq!(events.recv().await.unwrap(), PreviewEvent::Initiated);
    assert!(preview.controller().is_connection_opened());

    preview
        .document()
        .write()
        .set_value(form.title, json!("Breaking news"))
        .unwrap();
    preview.events().dom(DomEventKind::FocusOut, form.title);

    let start = next_frame(&mut frames).await;
    assert_eq!(
        start,
        json!({
            "command": "start",
            "content": "123-abc",
            "type": "form",
            "user": "7",
            "webspaceKey": "sulu_io",
            "languageCode": "en",
            "params": {}
        })
    );

    let update = next_frame(&mut frames).await;
    assert_eq!(update["command"], "update");
    assert_eq!(update["content"], "123-abc");
    assert_eq!(update["params"]["changes"], json!({"title": "Breaking news"}));
}

#[tokio::test]
async fn websocket_forwards_keystrokes() {
    init_tracing();
    let (port, mut frames) = ws_server().await;
    let form = form();
    let preview = preview(Host::native(), port, "http://127.0.0.1:1", &form);
    preview.start().await;

    preview.events().update(form.title, json!("B"), true);

    let _start = next_frame(&mut frames).await;
    let update = next_frame(&mut frames).await;
    assert_eq!(update["params"]["changes"], json!({"title": "B"}));
}

#[tokio::test]
async fn vendor_prefixed_socket_is_used() {
    init_tracing();
    let (connector, mut backends) = BridgedConnector::channel();
    let host = Host::empty().with_implementation(MOZ_WEBSOCKET, connector);
    let form = form();
    let preview = Arc::new(preview(host, 9876, "http://127.0.0.1:1", &form));

    let starter = {
        let preview = Arc::clone(&preview);
        tokio::spawn(async move { preview.start().await })
    };

    let (url, mut backend) = timeout(WAIT, backends.recv()).await.unwrap().unwrap();
    assert_eq!(url, Url::parse("ws://127.0.0.1:9876").unwrap());
    backend.events.open();

    assert_eq!(
        starter.await.unwrap(),
        Initialization::Ready(TransportMethod::WebSocket)
    );
    assert_eq!(next_backend_frame(&mut backend).await["command"], "start");
}

#[tokio::test]
async fn update_only_sends_full_form() {
    init_tracing();
    let (port, mut frames) = ws_server().await;
    let form = form();
    let preview = preview(Host::native(), port, "http://127.0.0.1:1", &form);
    preview.start().await;

    preview.events().update_only();

    let _start = next_frame(&mut frames).await;
    let update = next_frame(&mut frames).await;
    assert_eq!(
        update["params"]["changes"],
        json!({
            "title": "",
            "blocks": [{"text": "first"}, {"text": "second"}]
        })
    );
}

// ============================================================================
// HTTP
// ============================================================================

#[tokio::test]
async fn http_blur_posts_update_after_start() {
    init_tracing();
    let server = http_server(1).await;
    let form = form();
    let preview = preview(Host::empty(), 9876, &server.uri(), &form);
    let mut events = preview.events().subscribe();

    assert_eq!(
        preview.start().await,
        Initialization::Ready(TransportMethod::Http)
    );
    assert_eq!(events.recv().await.unwrap(), PreviewEvent::Initiated);

    preview
        .document()
        .write()
        .set_value(form.title, json!("Hello"))
        .unwrap();
    preview.events().dom(DomEventKind::FocusOut, form.title);

    let posts = wait_for_posts(&server, 1).await;
    assert_eq!(changes(&posts[0]), json!({"title": "Hello"}));
    assert_eq!(posts[0].url.query(), Some("webspace=sulu_io&language=en"));
}

#[tokio::test]
async fn http_suppresses_keystrokes_but_not_blur() {
    init_tracing();
    let server = http_server(1).await;
    let form = form();
    let preview = preview(Host::empty(), 9876, &server.uri(), &form);
    preview.start().await;
    preview
        .document()
        .write()
        .set_value(form.title, json!("Hello"))
        .unwrap();

    preview.events().dom(DomEventKind::KeyUp, form.title);
    preview.events().update(form.title, json!("typed"), true);
    preview.events().dom(DomEventKind::FocusOut, form.title);

    let posts = wait_for_posts(&server, 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(posts.len(), 1);
    assert_eq!(self::posts(&server).await.len(), 1);
    assert_eq!(changes(&posts[0]), json!({"title": "Hello"}));
}

#[tokio::test]
async fn nested_block_field_uses_instance_index() {
    init_tracing();
    let server = http_server(1).await;
    let form = form();
    let preview = preview(Host::empty(), 9876, &server.uri(), &form);
    preview.start().await;

    preview.events().dom(DomEventKind::Change, form.block_texts[1]);

    let posts = wait_for_posts(&server, 1).await;
    assert_eq!(changes(&posts[0]), json!({"blocks,1,text": "second"}));
}

#[tokio::test]
async fn unsaved_content_sends_nothing() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let form = form();
    let preview = Preview::builder()
        .config(config(9876, &server.uri()))
        .host(Host::empty())
        .session(SessionInfo::new("", "sulu_io", "en", "7"))
        .document(Arc::clone(&form.document))
        .build()
        .unwrap();
    preview.start().await;

    preview.events().dom(DomEventKind::FocusOut, form.title);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(posts(&server).await.is_empty());
}

// ============================================================================
// Fallback
// ============================================================================

#[tokio::test]
async fn refused_socket_falls_back_to_http_once() {
    init_tracing();
    let server = http_server(1).await;
    let form = form();
    let preview = preview(Host::native(), closed_port().await, &server.uri(), &form);

    assert_eq!(
        preview.start().await,
        Initialization::Ready(TransportMethod::Http)
    );
    assert!(!preview.controller().is_connection_opened());
    assert_eq!(
        preview.controller().state(),
        SessionState::Ready(TransportMethod::Http)
    );

    preview.events().dom(DomEventKind::FocusOut, form.title);
    wait_for_posts(&server, 1).await;
}

#[tokio::test]
async fn close_before_open_falls_back_to_http_once() {
    init_tracing();
    let server = http_server(1).await;
    let (connector, mut backends) = BridgedConnector::channel();
    let host = Host::empty().with_implementation(WEBSOCKET, connector);
    let form = form();
    let preview = preview(host, 9876, &server.uri(), &form);

    tokio::spawn(async move {
        if let Some((_, backend)) = backends.recv().await {
            backend.events.error("handshake failed");
            backend.events.close();
        }
    });

    assert_eq!(
        preview.start().await,
        Initialization::Ready(TransportMethod::Http)
    );
    assert_eq!(preview.controller().transport_method(), TransportMethod::Http);
    assert_eq!(preview.start().await, Initialization::AlreadyInitiated);
}

#[tokio::test]
async fn close_after_open_drops_updates_without_fallback() {
    init_tracing();
    let server = http_server(0).await;
    let (connector, mut backends) = BridgedConnector::channel();
    let host = Host::empty().with_implementation(WEBSOCKET, connector);
    let form = form();
    let preview = Arc::new(preview(host, 9876, &server.uri(), &form));

    let starter = {
        let preview = Arc::clone(&preview);
        tokio::spawn(async move { preview.start().await })
    };

    let (_, mut backend) = timeout(WAIT, backends.recv()).await.unwrap().unwrap();
    backend.events.open();
    assert_eq!(
        starter.await.unwrap(),
        Initialization::Ready(TransportMethod::WebSocket)
    );
    assert_eq!(next_backend_frame(&mut backend).await["command"], "start");

    backend.events.close();
    preview.events().dom(DomEventKind::FocusOut, form.title);
    preview.events().update_only();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(backend.outbound.try_recv().is_err());
    assert_eq!(
        preview.controller().state(),
        SessionState::Ready(TransportMethod::WebSocket)
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}
