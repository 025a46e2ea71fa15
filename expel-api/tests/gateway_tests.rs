//! GeminiGateway tests against a local mock of the generateContent endpoint

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use expel_api::services::inference_gateway::RUBRIC_PROMPT;
use expel_api::services::{GatewayError, GeminiGateway, InferenceGateway};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the mock saw for the last request
#[derive(Default)]
struct Captured {
    path: Option<String>,
    api_key: Option<String>,
    body: Option<Value>,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    reply: Value,
    captured: Arc<Mutex<Captured>>,
}

async fn generate_content(
    State(state): State<MockState>,
    Path(target): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut captured = state.captured.lock().unwrap();
    captured.path = Some(target);
    captured.api_key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    captured.body = Some(body);
    (state.status, Json(state.reply.clone()))
}

/// Serve the mock on an ephemeral port and return its base URL
async fn spawn_mock(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Captured>>) {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let state = MockState {
        status,
        reply,
        captured: captured.clone(),
    };
    let app = Router::new()
        .route("/v1beta/models/:target", post(generate_content))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1beta", addr), captured)
}

fn gateway(base_url: String) -> GeminiGateway {
    GeminiGateway::new(
        Some("test-key".to_string()),
        "gemini-test",
        Some(base_url),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn text_reply(parts: &[&str]) -> Value {
    let parts: Vec<Value> = parts.iter().map(|t| json!({ "text": t })).collect();
    json!({ "candidates": [{ "content": { "role": "model", "parts": parts } }] })
}

#[tokio::test]
async fn test_analyze_sends_rubric_and_inline_image() {
    let (base_url, captured) = spawn_mock(StatusCode::OK, text_reply(&[r#"{"pestType":"None"}"#])).await;

    let reply = gateway(base_url)
        .analyze(&[0xFF, 0xD8, 0xFF], "image/jpeg")
        .await
        .unwrap();
    assert_eq!(reply, r#"{"pestType":"None"}"#);

    let captured = captured.lock().unwrap();
    assert_eq!(captured.path.as_deref(), Some("gemini-test:generateContent"));
    assert_eq!(captured.api_key.as_deref(), Some("test-key"));

    let body = captured.body.as_ref().unwrap();
    let parts = &body["contents"][0]["parts"];
    assert_eq!(parts[0]["text"], RUBRIC_PROMPT);
    assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
    assert_eq!(parts[1]["inline_data"]["data"], "/9j/");
}

#[tokio::test]
async fn test_analyze_joins_text_parts() {
    let (base_url, _) = spawn_mock(StatusCode::OK, text_reply(&["```json\n{\"count\":", " 3}\n```"])).await;

    let reply = gateway(base_url).analyze(&[1, 2, 3], "image/png").await.unwrap();
    assert_eq!(reply, "```json\n{\"count\": 3}\n```");
}

#[tokio::test]
async fn test_rejected_key_maps_to_invalid_api_key() {
    let (base_url, _) = spawn_mock(
        StatusCode::FORBIDDEN,
        json!({ "error": { "code": 403, "message": "API key not valid" } }),
    )
    .await;

    let result = gateway(base_url).analyze(&[1, 2, 3], "image/png").await;
    assert!(matches!(result, Err(GatewayError::InvalidApiKey)));
}

#[tokio::test]
async fn test_server_error_keeps_status() {
    let (base_url, _) = spawn_mock(
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "error": { "code": 503, "message": "overloaded" } }),
    )
    .await;

    match gateway(base_url).analyze(&[1, 2, 3], "image/png").await {
        Err(GatewayError::Api(status, body)) => {
            assert_eq!(status, 503);
            assert!(body.contains("overloaded"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_blocked_prompt_is_empty_response() {
    let (base_url, _) = spawn_mock(
        StatusCode::OK,
        json!({ "promptFeedback": { "blockReason": "SAFETY" } }),
    )
    .await;

    let result = gateway(base_url).analyze(&[1, 2, 3], "image/png").await;
    assert!(matches!(result, Err(GatewayError::EmptyResponse(Some(reason))) if reason == "SAFETY"));
}

#[tokio::test]
async fn test_unsupported_media_type_skips_network() {
    let (base_url, captured) = spawn_mock(StatusCode::OK, text_reply(&["{}"])).await;

    let result = gateway(base_url).analyze(b"GIF89a", "image/gif").await;
    assert!(matches!(result, Err(GatewayError::UnsupportedMediaType(_))));
    assert!(captured.lock().unwrap().body.is_none());
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = gateway(format!("http://{}/v1beta", addr))
        .analyze(&[1, 2, 3], "image/png")
        .await;
    assert!(matches!(result, Err(GatewayError::Network(_))));
}
