//! Integration test: serve a fake assistant backend over HTTP on a free port and drive the
//! client and controller against it. Does not require the real assistant service.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zameen::assistant::{AssistantBackend, AssistantClient};
use zameen::reconcile::{fetch_reply, CONNECTION_ERROR_REPLY, EMPTY_REPLY};
use zameen::storage::FileStore;
use zameen::{ChatController, ControllerOptions, Dispatch, Message, Origin, ReplyOutcome};

#[derive(Clone, Copy)]
enum ChatMode {
    Echo,
    ServerError,
    Garbage,
}

#[derive(Clone)]
struct FakeBackend {
    ready_after: usize,
    probes: Arc<AtomicUsize>,
    mode: ChatMode,
    seen: Arc<Mutex<Vec<Value>>>,
}

impl FakeBackend {
    fn new(ready_after: usize, mode: ChatMode) -> Self {
        Self {
            ready_after,
            probes: Arc::new(AtomicUsize::new(0)),
            mode,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

async fn health(State(backend): State<FakeBackend>) -> Json<Value> {
    let n = backend.probes.fetch_add(1, Ordering::SeqCst) + 1;
    if n >= backend.ready_after {
        Json(json!({ "status": "ok" }))
    } else {
        Json(json!({ "status": "loading" }))
    }
}

async fn chat(State(backend): State<FakeBackend>, Json(body): Json<Value>) -> Response {
    let last = body["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or("")
        .to_string();
    backend.seen.lock().unwrap().push(body);
    match backend.mode {
        ChatMode::Echo => Json(json!({ "response": format!("  Echo: {}\n", last) })).into_response(),
        ChatMode::ServerError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "retrieval failed" })),
        )
            .into_response(),
        ChatMode::Garbage => (StatusCode::OK, "<html>proxy error</html>").into_response(),
    }
}

async fn serve(backend: FakeBackend) -> SocketAddr {
    let app = Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn temp_storage() -> PathBuf {
    std::env::temp_dir()
        .join(format!("zameen-http-test-{}", uuid::Uuid::new_v4()))
        .join("chat_storage.json")
}

fn options() -> ControllerOptions {
    ControllerOptions {
        health_interval: Duration::from_millis(50),
        ..ControllerOptions::default()
    }
}

#[tokio::test]
async fn controller_round_trip_over_http() {
    let backend = FakeBackend::new(3, ChatMode::Echo);
    let addr = serve(backend.clone()).await;
    let client = Arc::new(AssistantClient::new(Some(format!("http://{}/", addr))));
    let storage_path = temp_storage();

    let controller = ChatController::mount(
        client.clone(),
        Arc::new(FileStore::new(&storage_path)),
        options(),
    );
    let ready = tokio::time::timeout(Duration::from_secs(5), controller.wait_ready())
        .await
        .expect("assistant did not become ready within 5s");
    assert!(ready);
    assert_eq!(backend.probes.load(Ordering::SeqCst), 3);

    let pending = match controller.send("Show me 3-bed houses") {
        Dispatch::Accepted(p) => p,
        Dispatch::Rejected(r) => panic!("send rejected: {:?}", r),
    };
    assert_eq!(pending.wait().await, ReplyOutcome::Appended);

    let seen = backend.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![json!({ "messages": [{ "role": "user", "content": "Show me 3-bed houses" }] })]
    );

    let messages = controller.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].origin, Origin::Assistant);
    assert_eq!(messages[1].text, "Echo: Show me 3-bed houses");
    controller.set_visible(true);
    controller.dispose();

    // Health polling stopped at readiness; a fresh mount restores the log from disk.
    let probes_before = backend.probes.load(Ordering::SeqCst);
    let remounted = ChatController::mount(
        client,
        Arc::new(FileStore::new(&storage_path)),
        options(),
    );
    assert_eq!(remounted.messages(), messages);
    assert!(remounted.is_visible());
    assert!(remounted.wait_ready().await);
    assert_eq!(backend.probes.load(Ordering::SeqCst), probes_before + 1);
}

#[tokio::test]
async fn unreachable_backend_falls_back_to_connection_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
        listener.local_addr().expect("local_addr")
    };
    let client = AssistantClient::new(Some(format!("http://{}", addr)));

    assert!(client.health().await.is_err());
    let reply = fetch_reply(&client, &[Message::user("hello")]).await;
    assert_eq!(reply, CONNECTION_ERROR_REPLY);
}

#[tokio::test]
async fn server_error_and_garbage_bodies_fall_back() {
    let failing = serve(FakeBackend::new(1, ChatMode::ServerError)).await;
    let client = AssistantClient::new(Some(format!("http://{}", failing)));
    assert!(client.health().await.expect("health").is_ok());
    assert_eq!(fetch_reply(&client, &[Message::user("hi")]).await, EMPTY_REPLY);

    let garbage = serve(FakeBackend::new(1, ChatMode::Garbage)).await;
    let client = AssistantClient::new(Some(format!("http://{}", garbage)));
    assert_eq!(
        fetch_reply(&client, &[Message::user("hi")]).await,
        CONNECTION_ERROR_REPLY
    );
}
