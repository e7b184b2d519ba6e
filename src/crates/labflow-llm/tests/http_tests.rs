//! End-to-end tests against a local stand-in for the chat completions API.

use axum::{http::StatusCode, routing::post, Json, Router};
use labflow_core::{ChatModel, ChatRequest, GraphError, Message};
use labflow_llm::{OpenAiClient, RemoteLlmConfig};
use serde_json::{json, Value};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

fn client(base_url: String) -> OpenAiClient {
    OpenAiClient::new(RemoteLlmConfig::new("test-key", base_url, "stub-model")).unwrap()
}

#[tokio::test]
async fn test_successful_completion() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|Json(body): Json<Value>| async move {
            let last = body["messages"]
                .as_array()
                .and_then(|m| m.last())
                .and_then(|m| m["content"].as_str())
                .unwrap_or_default()
                .to_string();
            Json(json!({
                "choices": [{"message": {"role": "assistant", "content": format!("echo: {}", last)}}],
                "usage": {"prompt_tokens": 3, "completion_tokens": 2}
            }))
        }),
    );
    let model = client(serve(app).await);

    let response = model
        .chat(ChatRequest::new(vec![Message::human("caffeine")]))
        .await
        .unwrap();

    assert_eq!(response.text(), "echo: caffeine");
    assert_eq!(response.usage.unwrap().total_tokens, 5);
    assert_eq!(model.model_name(), "stub-model");
}

#[tokio::test]
async fn test_unauthorized_maps_to_backend_error() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
    );
    let model = client(serve(app).await);

    let err = model
        .chat(ChatRequest::new(vec![Message::human("hi")]))
        .await
        .unwrap_err();

    match err {
        GraphError::Backend { provider, message } => {
            assert_eq!(provider, "stub-model");
            assert!(message.contains("Authentication failed"));
        }
        other => panic!("expected backend error, got {other}"),
    }
}

#[tokio::test]
async fn test_rate_limit_is_reported() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let model = client(serve(app).await);

    let err = model
        .chat(ChatRequest::new(vec![Message::human("hi")]))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Rate limit exceeded"));
}
