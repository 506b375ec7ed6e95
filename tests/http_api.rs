//! Integration tests for the HTTP API
//!
//! Builds the real router with a canned completion client so the tests are
//! hermetic and never reach an external provider.

use agentroute::config::Config;
use agentroute::handlers::{self, AppState};
use agentroute::llm::{ChatMessage, CompletionClient, LlmError};
use agentroute::metrics::Metrics;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Notify;
use tower::ServiceExt;

/// Completion client that always returns the same result
struct CannedClient(Result<String, LlmError>);

#[async_trait]
impl CompletionClient for CannedClient {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.0.clone()
    }
}

/// Completion client that parks until the test releases it
struct GatedClient {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl CompletionClient for GatedClient {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok("faq".to_string())
    }
}

const TEST_CONFIG: &str = r#"
[llm]
base_url = "http://localhost:9999/v1"
"#;

fn create_state_from(
    config_toml: &str,
    classifier: Arc<dyn CompletionClient>,
    generator: Arc<dyn CompletionClient>,
) -> AppState {
    let config: Config = config_toml.parse().expect("should parse test config");

    AppState::new(
        config,
        classifier,
        generator,
        Arc::new(Metrics::new().expect("should create metrics")),
    )
    .expect("should build state")
}

fn create_test_state(classifier: CannedClient, generator: CannedClient) -> AppState {
    create_state_from(TEST_CONFIG, Arc::new(classifier), Arc::new(generator))
}

fn create_test_app(classifier_reply: &str) -> (Router, AppState) {
    let state = create_test_state(
        CannedClient(Ok(classifier_reply.to_string())),
        CannedClient(Ok("You are thoughtful and steady.".to_string())),
    );
    (handlers::app(state.clone()), state)
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).expect("response should be JSON")
}

#[tokio::test]
async fn test_health_reports_active_sessions() {
    let (app, state) = create_test_app("faq");
    state.sessions().insert(state.new_session()).await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["active_sessions"], 1);
}

#[tokio::test]
async fn test_chat_starts_session_and_routes() {
    let (app, state) = create_test_app("support");

    let response = app
        .oneshot(post_json(
            "/chat",
            r#"{"message": "My robot arm will not power on"}"#.to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["agent"], "support");
    assert_eq!(body["path"], "classifier");
    assert!(body.get("notice").is_none());
    assert!(body["session_id"].is_string());
    assert_eq!(state.sessions().len().await, 1);
}

#[tokio::test]
async fn test_chat_product_mention_returns_sales() {
    let (app, _) = create_test_app("faq");

    let response = app
        .oneshot(post_json(
            "/chat",
            r#"{"message": "Price of the Epson T3 SCARA Robot?"}"#.to_string(),
        ))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["agent"], "sales");
    assert_eq!(body["path"], "product_match");
}

#[tokio::test]
async fn test_chat_continues_existing_session() {
    let (app, _) = create_test_app("faq");

    let first = app
        .clone()
        .oneshot(post_json("/chat", r#"{"message": "hi"}"#.to_string()))
        .await
        .unwrap();
    let session_id = json_body(first).await["session_id"]
        .as_str()
        .unwrap()
        .to_string();

    let second = app
        .clone()
        .oneshot(post_json(
            "/chat",
            format!(
                r#"{{"message": "what are your hours?", "session_id": "{}"}}"#,
                session_id
            ),
        ))
        .await
        .unwrap();
    assert_eq!(json_body(second).await["session_id"], session_id.as_str());

    let transcript = app
        .oneshot(get(&format!("/sessions/{}/transcript", session_id)))
        .await
        .unwrap();
    assert_eq!(transcript.status(), StatusCode::OK);

    let body = json_body(transcript).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "hi");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[2]["content"], "what are your hours?");
}

#[tokio::test]
async fn test_chat_with_unknown_session_starts_new_one() {
    let (app, _) = create_test_app("faq");
    let unknown = uuid::Uuid::new_v4();

    let response = app
        .oneshot(post_json(
            "/chat",
            format!(r#"{{"message": "hello", "session_id": "{}"}}"#, unknown),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_ne!(json_body(response).await["session_id"], unknown.to_string());
}

#[tokio::test]
async fn test_chat_provider_failure_is_still_200() {
    let state = create_test_state(
        CannedClient(Err(LlmError::Network("connection refused".to_string()))),
        CannedClient(Ok(String::new())),
    );
    let app = handlers::app(state);

    let response = app
        .oneshot(post_json("/chat", r#"{"message": "hello"}"#.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["agent"], "default");
    assert_eq!(body["path"], "fallback");
    assert!(
        body["notice"]
            .as_str()
            .unwrap()
            .starts_with("Error determining agent:")
    );
}

#[tokio::test]
async fn test_chat_rejects_empty_message() {
    let (app, state) = create_test_app("faq");

    let response = app
        .oneshot(post_json("/chat", r#"{"message": "   "}"#.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(state.sessions().is_empty().await);
}

#[tokio::test]
async fn test_end_session_then_transcript_is_404() {
    let (app, state) = create_test_app("faq");
    let (id, _) = state.sessions().insert(state.new_session()).await;

    let deleted = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/sessions/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let transcript = app
        .clone()
        .oneshot(get(&format!("/sessions/{}/transcript", id)))
        .await
        .unwrap();
    assert_eq!(transcript.status(), StatusCode::NOT_FOUND);
    let body = json_body(transcript).await;
    assert!(body["error"].as_str().unwrap().contains(&id.to_string()));

    let deleted_again = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/sessions/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(deleted_again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_agents_lists_builtin_registry_in_order() {
    let (app, _) = create_test_app("faq");

    let response = app.oneshot(get("/agents")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let keys: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, ["default", "sales", "support", "faq", "escalation"]);
    assert!(body[0].get("content").is_none());
}

#[tokio::test]
async fn test_personality_returns_prediction() {
    let (app, _) = create_test_app("faq");

    let response = app
        .oneshot(post_json(
            "/personality",
            r#"{"birthdate": "1990-04-12"}"#.to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["prediction"], "You are thoughtful and steady.");
    assert!(body["age"].as_u64().unwrap() >= 34);
    assert!(body.get("generated").is_none());
}

#[tokio::test]
async fn test_personality_failure_is_error_text() {
    let state = create_test_state(
        CannedClient(Ok("faq".to_string())),
        CannedClient(Err(LlmError::RateLimited {
            message: "slow down".to_string(),
        })),
    );
    let app = handlers::app(state);

    let response = app
        .oneshot(post_json(
            "/personality",
            r#"{"birthdate": "1990-04-12"}"#.to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert!(
        body["prediction"]
            .as_str()
            .unwrap()
            .starts_with("Error generating prediction:")
    );
}

#[tokio::test]
async fn test_personality_future_birthdate_is_400() {
    let (app, _) = create_test_app("faq");

    let response = app
        .oneshot(post_json(
            "/personality",
            r#"{"birthdate": "2999-01-01"}"#.to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn test_metrics_exposes_routing_counters() {
    let (app, _) = create_test_app("escalation");

    app.clone()
        .oneshot(post_json(
            "/chat",
            r#"{"message": "I want a refund now"}"#.to_string(),
        ))
        .await
        .unwrap();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("agentroute_routing_decisions_total"));
    assert!(text.contains(r#"agent="escalation""#));
    assert!(text.contains("agentroute_classification_duration_ms"));
}

#[tokio::test]
async fn test_anonymous_chats_beyond_limit_evict_oldest_sessions() {
    let state = create_state_from(
        "[server]\nmax_sessions = 3\n\n[llm]\nbase_url = \"http://localhost:9999/v1\"\n",
        Arc::new(CannedClient(Ok("faq".to_string()))),
        Arc::new(CannedClient(Ok(String::new()))),
    );
    let app = handlers::app(state);

    let mut session_ids = Vec::new();
    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(post_json("/chat", r#"{"message": "hi"}"#.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        session_ids.push(json_body(response).await["session_id"].as_str().unwrap().to_string());
    }

    let health = json_body(app.clone().oneshot(get("/health")).await.unwrap()).await;
    assert_eq!(health["active_sessions"], 3);

    let oldest = app
        .clone()
        .oneshot(get(&format!("/sessions/{}/transcript", session_ids[0])))
        .await
        .unwrap();
    assert_eq!(oldest.status(), StatusCode::NOT_FOUND);

    let newest = app
        .oneshot(get(&format!("/sessions/{}/transcript", session_ids[4])))
        .await
        .unwrap();
    assert_eq!(newest.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_session_deleted_mid_turn_is_not_recreated() {
    let gate = Arc::new(GatedClient {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let state = create_state_from(
        TEST_CONFIG,
        gate.clone(),
        Arc::new(CannedClient(Ok(String::new()))),
    );
    let app = handlers::app(state.clone());
    let (id, _) = state.sessions().insert(state.new_session()).await;

    let turn = tokio::spawn(app.clone().oneshot(post_json(
        "/chat",
        format!(r#"{{"message": "hello", "session_id": "{}"}}"#, id),
    )));

    gate.entered.notified().await;
    let deleted = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/sessions/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    gate.release.notify_one();

    let response = turn.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["session_id"], id.to_string());

    assert!(state.sessions().is_empty().await);
    let transcript = app
        .oneshot(get(&format!("/sessions/{}/transcript", id)))
        .await
        .unwrap();
    assert_eq!(transcript.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_records_message_as_sent() {
    let (app, _) = create_test_app("faq");

    let response = app
        .clone()
        .oneshot(post_json(
            "/chat",
            r#"{"message": "  where is my order?  "}"#.to_string(),
        ))
        .await
        .unwrap();
    let session_id = json_body(response).await["session_id"]
        .as_str()
        .unwrap()
        .to_string();

    let transcript = app
        .oneshot(get(&format!("/sessions/{}/transcript", session_id)))
        .await
        .unwrap();
    let body = json_body(transcript).await;
    assert_eq!(body["messages"][0]["content"], "  where is my order?  ");
}
