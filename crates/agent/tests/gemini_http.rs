use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use copo_agent::llm::{GenerateRequest, LlmClient, LlmError, Message};
use copo_agent::providers::GeminiClient;
use copo_agent::{RetryPolicy, ToolRegistry};
use copo_core::config::{AppConfig, LlmConfig};
use serde_json::{json, Value};

#[derive(Default)]
struct FakeGemini {
    calls: AtomicUsize,
    failures_before_success: usize,
    failure_status: u16,
    seen: Mutex<Vec<(String, Option<String>, Value)>>,
}

async fn generate_content(
    State(fake): State<Arc<FakeGemini>>,
    Path(model_action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let call = fake.calls.fetch_add(1, Ordering::SeqCst);
    let api_key =
        headers.get("x-goog-api-key").and_then(|value| value.to_str().ok()).map(str::to_string);
    if let Ok(mut seen) = fake.seen.lock() {
        seen.push((model_action, api_key, body));
    }

    if call < fake.failures_before_success {
        let status = StatusCode::from_u16(fake.failure_status).unwrap_or(StatusCode::BAD_GATEWAY);
        return (status, Json(json!({ "error": { "message": "try later" } }))).into_response();
    }

    Json(json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "functionCall": { "name": "obtenerInformacionPorMarca", "args": { "brand": "ZWAN" } } }]
            },
            "finishReason": "STOP"
        }]
    }))
    .into_response()
}

async fn spawn_fake(fake: Arc<FakeGemini>) -> SocketAddr {
    let app = Router::new()
        .route("/v1beta/models/{*model_action}", post(generate_content))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn llm_config(addr: SocketAddr) -> LlmConfig {
    let mut config = AppConfig::default().llm;
    config.api_key = Some("test-gemini-key".to_string().into());
    config.base_url = Some(format!("http://{addr}"));
    config.model = "gemini-test".to_string();
    config.timeout_secs = 5;
    config
}

fn fast_retries(max_retries: u32) -> RetryPolicy {
    RetryPolicy { max_retries, base_delay_ms: 1, max_delay_ms: 2 }
}

#[tokio::test]
async fn gemini_client_retries_server_errors_and_parses_function_calls() {
    let fake = Arc::new(FakeGemini {
        failures_before_success: 1,
        failure_status: 503,
        ..FakeGemini::default()
    });
    let addr = spawn_fake(fake.clone()).await;
    let client = GeminiClient::from_config(&llm_config(addr)).expect("client").with_retry_policy(fast_retries(2));
    let registry = ToolRegistry::product_catalog().expect("registry");
    let history = vec![Message::User("¿Qué tienen de ZWAN?".to_string())];

    let turn = client
        .generate(&GenerateRequest {
            system_instruction: "Eres un asistente",
            declarations: registry.declarations(),
            history: &history,
        })
        .await
        .expect("turn");

    assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
    let calls = turn.tool_calls().collect::<Vec<_>>();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args.text("brand"), Ok("ZWAN"));

    let seen = fake.seen.lock().expect("seen").clone();
    let (model_action, api_key, body) = &seen[1];
    assert_eq!(model_action, "gemini-test:generateContent");
    assert_eq!(api_key.as_deref(), Some("test-gemini-key"));
    assert_eq!(body["contents"][0]["parts"][0]["text"], json!("¿Qué tienen de ZWAN?"));
    assert_eq!(body["tools"][0]["functionDeclarations"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn gemini_client_does_not_retry_client_errors() {
    let fake = Arc::new(FakeGemini {
        failures_before_success: usize::MAX,
        failure_status: 400,
        ..FakeGemini::default()
    });
    let addr = spawn_fake(fake.clone()).await;
    let client = GeminiClient::from_config(&llm_config(addr)).expect("client").with_retry_policy(fast_retries(3));
    let history = vec![Message::User("hola".to_string())];

    let result = client
        .generate(&GenerateRequest { system_instruction: "", declarations: &[], history: &history })
        .await;

    assert!(matches!(result, Err(LlmError::Status { status: 400, .. })));
    assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    let client = GeminiClient::from_config(&llm_config(addr)).expect("client").with_retry_policy(fast_retries(0));
    let history = vec![Message::User("hola".to_string())];

    let result = client
        .generate(&GenerateRequest { system_instruction: "", declarations: &[], history: &history })
        .await;

    assert!(matches!(result, Err(LlmError::Transport { retryable: true, .. })));
}
