use animus_api::{
    config::{Config, RealtimeConfig},
    relay::{OpenAiRelay, RealtimeRelay, RelayError},
    router::create_router,
    state::AppState,
    ws::Fanout,
};
use animus_core::CommandGenerator;
use async_trait::async_trait;
use axum::{Router, http::StatusCode, routing::post};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::Level;

type Viewer = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        log_level: Level::DEBUG,
        site_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/site"),
        avatar_target: "avatar-1".to_string(),
        viewer_buffer: 8,
        realtime: None,
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_app(relay: Option<Arc<dyn RealtimeRelay>>) -> SocketAddr {
    let config = test_config();
    let state = Arc::new(AppState {
        fanout: Fanout::spawn(config.viewer_buffer),
        generator: Arc::new(CommandGenerator::new(config.avatar_target.clone())),
        relay,
        config: Arc::new(config),
    });
    serve(create_router(state)).await
}

async fn connect_viewer(addr: SocketAddr) -> Viewer {
    let (ws, _) = connect_async(format!("ws://{addr}/anim")).await.unwrap();
    ws
}

/// Polls `/healthz` until the server has registered `expected` viewers.
async fn wait_for_viewers(client: &reqwest::Client, addr: SocketAddr, expected: u64) {
    for _ in 0..100 {
        let health: Value = client
            .get(format!("http://{addr}/healthz"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if health["viewers"] == expected {
            assert_eq!(health["status"], "ok");
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server never reported {expected} viewers");
}

async fn next_batch(viewer: &mut Viewer) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), viewer.next())
            .await
            .expect("timed out waiting for a batch")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn post_event(client: &reqwest::Client, addr: SocketAddr, body: &'static str) -> Value {
    let response = client
        .post(format!("http://{addr}/events"))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.unwrap()
}

fn command_types(batch: &Value) -> Vec<String> {
    batch["commands"]
        .as_array()
        .unwrap()
        .iter()
        .map(|cmd| cmd["type"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_greeting_reaches_connected_viewer() {
    let addr = spawn_app(None).await;
    let client = reqwest::Client::new();
    let mut viewer = connect_viewer(addr).await;
    wait_for_viewers(&client, addr, 1).await;

    let response = post_event(&client, addr, r#"{"text":"hello","source":"realtime"}"#).await;
    assert_eq!(response["delivered"], 1);
    assert_eq!(response["dropped"], 0);
    assert_eq!(command_types(&response["anim"]), vec!["speak", "gesture"]);
    assert_eq!(response["anim"]["provenance"]["sourceEventId"], "realtime");
    assert!(response["anim"]["provenance"]["generatedAt"].is_string());

    let pushed = next_batch(&mut viewer).await;
    assert_eq!(pushed, response["anim"]);
    assert_eq!(pushed["commands"][1]["name"], "wave");
    assert_eq!(pushed["commands"][1]["target"], "avatar-1");
    assert_eq!(pushed["original"]["text"], "hello");
}

#[tokio::test]
async fn test_boundary_intent_without_text() {
    let addr = spawn_app(None).await;
    let client = reqwest::Client::new();

    let response = post_event(&client, addr, r#"{"eventTags":["set-boundary"]}"#).await;
    assert_eq!(response["delivered"], 0);
    let anim = &response["anim"];
    assert_eq!(command_types(anim), vec!["speak", "gesture", "emotion"]);
    assert_eq!(anim["commands"][1]["name"], "hand-stop");
    assert_eq!(anim["commands"][2]["emotion"], "firm");
    assert_eq!(anim["provenance"]["sourceEventId"], "anonymous");
}

#[tokio::test]
async fn test_malformed_bodies_become_idle() {
    let addr = spawn_app(None).await;
    let client = reqwest::Client::new();

    for body in ["{}", "not json at all", "[1, 2, 3]", ""] {
        let response = post_event(&client, addr, body).await;
        assert_eq!(
            command_types(&response["anim"]),
            vec!["idle"],
            "body {body:?} should yield idle"
        );
    }
}

#[tokio::test]
async fn test_departed_viewer_does_not_block_others() {
    let addr = spawn_app(None).await;
    let client = reqwest::Client::new();
    let mut leaving = connect_viewer(addr).await;
    let mut staying = connect_viewer(addr).await;
    wait_for_viewers(&client, addr, 2).await;

    post_event(&client, addr, r#"{"text":"hi"}"#).await;
    next_batch(&mut leaving).await;
    next_batch(&mut staying).await;

    leaving.close(None).await.unwrap();
    drop(leaving);
    wait_for_viewers(&client, addr, 1).await;

    let response = post_event(&client, addr, r#"{"text":"I feel anxious"}"#).await;
    assert_eq!(response["delivered"], 1);
    let pushed = next_batch(&mut staying).await;
    assert_eq!(pushed["commands"][1]["name"], "open-hands");
    assert_eq!(pushed["commands"][2]["emotion"], "caring");
}

#[tokio::test]
async fn test_viewer_messages_are_ignored() {
    let addr = spawn_app(None).await;
    let client = reqwest::Client::new();
    let mut viewer = connect_viewer(addr).await;
    wait_for_viewers(&client, addr, 1).await;

    viewer
        .send(Message::Text(r#"{"type":"hello"}"#.into()))
        .await
        .unwrap();
    post_event(&client, addr, "{}").await;
    let pushed = next_batch(&mut viewer).await;
    assert_eq!(command_types(&pushed), vec!["idle"]);
}

#[tokio::test]
async fn test_static_files_are_served() {
    let addr = spawn_app(None).await;
    let body = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("animus control ui"));
}

#[tokio::test]
async fn test_unconfigured_relay_is_unavailable() {
    let addr = spawn_app(None).await;
    let client = reqwest::Client::new();

    let session = client
        .post(format!("http://{addr}/realtime/session"))
        .send()
        .await
        .unwrap();
    assert_eq!(session.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = session.json().await.unwrap();
    assert_eq!(body["message"], "Realtime relay is not configured");

    let offer = client
        .post(format!("http://{addr}/realtime/offer"))
        .header("content-type", "application/sdp")
        .body("v=0")
        .send()
        .await
        .unwrap();
    assert_eq!(offer.status(), StatusCode::SERVICE_UNAVAILABLE);
}

struct FailingRelay;

#[async_trait]
impl RealtimeRelay for FailingRelay {
    async fn create_session(&self) -> Result<Value, RelayError> {
        Err(RelayError::Rejected {
            status: 401,
            body: "bad key".to_string(),
        })
    }

    async fn exchange_offer(&self, _offer_sdp: &str) -> Result<String, RelayError> {
        Err(RelayError::Rejected {
            status: 500,
            body: "boom".to_string(),
        })
    }
}

#[tokio::test]
async fn test_provider_failure_is_bad_gateway() {
    let addr = spawn_app(Some(Arc::new(FailingRelay))).await;
    let client = reqwest::Client::new();

    let session = client
        .post(format!("http://{addr}/realtime/session"))
        .send()
        .await
        .unwrap();
    assert_eq!(session.status(), StatusCode::BAD_GATEWAY);

    let empty = client
        .post(format!("http://{addr}/realtime/offer"))
        .body("   ")
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
}

/// A stand-in for the provider's realtime endpoints.
async fn fake_provider() -> SocketAddr {
    let app = Router::new()
        .route(
            "/realtime/sessions",
            post(|axum::Json(body): axum::Json<Value>| async move {
                axum::Json(json!({
                    "id": "sess_123",
                    "model": body["model"],
                    "voice": body["voice"],
                    "client_secret": { "value": "ek_test" }
                }))
            }),
        )
        .route(
            "/realtime",
            post(|offer: String| async move { format!("answer-for:{offer}") }),
        );
    serve(app).await
}

#[tokio::test]
async fn test_relay_forwards_to_provider() {
    let provider = fake_provider().await;
    let relay = OpenAiRelay::with_base_url(
        RealtimeConfig {
            api_key: "sk-test".to_string(),
            model: "gpt-4o-realtime-preview-2024-12-17".to_string(),
            voice: "alloy".to_string(),
        },
        format!("http://{provider}/"),
    );
    let addr = spawn_app(Some(Arc::new(relay))).await;
    let client = reqwest::Client::new();

    let session: Value = client
        .post(format!("http://{addr}/realtime/session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["id"], "sess_123");
    assert_eq!(session["voice"], "alloy");

    let answer = client
        .post(format!("http://{addr}/realtime/offer"))
        .header("content-type", "application/sdp")
        .body("v=0 offer")
        .send()
        .await
        .unwrap();
    assert_eq!(answer.status(), StatusCode::OK);
    assert_eq!(answer.headers()["content-type"], "application/sdp");
    assert_eq!(answer.text().await.unwrap(), "answer-for:v=0 offer");
}
