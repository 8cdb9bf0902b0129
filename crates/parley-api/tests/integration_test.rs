use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::IntoResponse,
    Router,
};
use parley_api::{build_router, config::Config, error::ApiError, state::AppState};
use parley_llm::{ChatClient, ChatRequest, ChatResponse, EventStream, StreamEvent as LlmEvent};
use parley_persist::{
    Chat, DBMessage, Document, MemoryPersistenceClient, MessageRole, PersistenceClient, Visibility,
};
use parley_tools::ToolRegistry;
use parley_types::ArtifactKind;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

const DEFAULT_TOML: &str = include_str!("../config/default.toml");

/// Answers every streaming request with a fixed reply and every plain
/// request (title generation) with a fixed title
struct FakeClient {
    requests: Mutex<Vec<ChatRequest>>,
}

impl FakeClient {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
        })
    }

    fn stream_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for FakeClient {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        Ok(ChatResponse {
            content: Some("\"Weather in Paris\"".to_string()),
            tool_calls: None,
            usage: None,
            finish_reason: Some("stop".to_string()),
            raw: Value::Null,
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        self.requests.lock().unwrap().push(request);
        let events = vec![
            LlmEvent::Message { content: "It is".into() },
            LlmEvent::Message { content: " sunny.".into() },
            LlmEvent::Done {
                finish_reason: Some("stop".into()),
            },
        ];
        Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok::<_, anyhow::Error>))))
    }
}

struct TestApp {
    router: Router,
    persist: Arc<dyn PersistenceClient>,
    llm: Arc<FakeClient>,
}

fn test_config(max_messages_per_day: u64) -> Config {
    let toml = DEFAULT_TOML.replace(
        "max_messages_per_day = 100",
        &format!("max_messages_per_day = {}", max_messages_per_day),
    );
    Config::from_toml_str(&toml).unwrap()
}

fn test_app_with(config: Config) -> TestApp {
    let persist: Arc<dyn PersistenceClient> = Arc::new(MemoryPersistenceClient::new());
    let llm = FakeClient::new();
    let state = AppState::new(
        config,
        Arc::clone(&persist),
        llm.clone(),
        Arc::new(ToolRegistry::new()),
    )
    .unwrap();

    TestApp {
        router: build_router(Arc::new(state)),
        persist,
        llm,
    }
}

fn test_app() -> TestApp {
    test_app_with(test_config(100))
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, String) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send_json(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, text) = send(router, method, uri, body).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap()
    };
    (status, value)
}

/// Event names of an SSE body, in order
fn event_names(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("event:"))
        .map(|name| name.trim().to_string())
        .collect()
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = send_json(&app.router, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["database"], "connected");
}

#[tokio::test]
async fn test_create_and_get_chat() {
    let app = test_app();
    let (status, created) = send_json(
        &app.router,
        "POST",
        "/chats",
        Some(json!({"user_id": "alice", "title": "Trip planning"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["visibility"], "private");

    let id = created["id"].as_str().unwrap();
    let (status, chat) = send_json(&app.router, "GET", &format!("/chats/{}?user_id=alice", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chat["title"], "Trip planning");
}

#[tokio::test]
async fn test_private_chat_hidden_from_other_users() {
    let app = test_app();
    let chat = app.persist.save_chat(Chat::new("alice", "secret")).await.unwrap();

    let (status, body) = send_json(&app.router, "GET", &format!("/chats/{}?user_id=mallory", chat.id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("private"));

    let (status, _) = send_json(
        &app.router,
        "PATCH",
        &format!("/chats/{}/visibility", chat.id),
        Some(json!({"user_id": "alice", "visibility": "public"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(&app.router, "GET", &format!("/chats/{}?user_id=mallory", chat.id), None).await;
    assert_eq!(status, StatusCode::OK);

    // Public is still read-only for others
    let (status, _) = send_json(&app.router, "DELETE", &format!("/chats/{}?user_id=mallory", chat.id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_chats_rejects_both_cursors() {
    let app = test_app();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let (status, _) = send_json(
        &app.router,
        "GET",
        &format!("/chats?user_id=alice&starting_after={}&ending_before={}", a, b),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_chats_pages() {
    let app = test_app();
    for i in 0..3 {
        app.persist.save_chat(Chat::new("alice", format!("chat {}", i))).await.unwrap();
    }
    app.persist.save_chat(Chat::new("bob", "not mine")).await.unwrap();

    let (status, page) = send_json(&app.router, "GET", "/chats?user_id=alice&limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["chats"].as_array().unwrap().len(), 2);
    assert_eq!(page["has_more"], true);

    let last = page["chats"][1]["id"].as_str().unwrap();
    let (_, rest) = send_json(
        &app.router,
        "GET",
        &format!("/chats?user_id=alice&limit=2&starting_after={}", last),
        None,
    )
    .await;
    assert_eq!(rest["chats"].as_array().unwrap().len(), 1);
    assert_eq!(rest["has_more"], false);
}

#[tokio::test]
async fn test_stream_creates_chat_and_persists_transcript() {
    let app = test_app();
    let chat_id = Uuid::new_v4();

    let (status, body) = send(
        &app.router,
        "POST",
        &format!("/chats/{}/messages", chat_id),
        Some(json!({"user_id": "alice", "content": "What's the weather in Paris?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names = event_names(&body);
    assert_eq!(names.first().map(String::as_str), Some("init_stream"));
    assert_eq!(names.last().map(String::as_str), Some("end_stream"));
    assert!(names.iter().any(|n| n == "message"));
    assert!(body.contains("\"status\":\"success\""));

    let chat = app.persist.get_chat(chat_id).await.unwrap().unwrap();
    assert_eq!(chat.title, "Weather in Paris");
    assert!(chat.is_owned_by("alice"));

    let messages = app.persist.get_messages(chat_id, None, None).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[1].content, "It is sunny.");

    let requests = app.llm.stream_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "openai/gpt-4o-mini");
}

#[tokio::test]
async fn test_stream_reasoning_model_runs_without_tools() {
    let app = test_app();
    let chat_id = Uuid::new_v4();

    let (status, _) = send(
        &app.router,
        "POST",
        &format!("/chats/{}/messages", chat_id),
        Some(json!({"user_id": "alice", "content": "Prove it", "model": "deepseek/deepseek-r1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let requests = app.llm.stream_requests();
    assert_eq!(requests[0].model, "deepseek/deepseek-r1");
    assert!(requests[0].options.tools.is_none());
    assert!(requests[0].options.include_reasoning);
}

#[tokio::test]
async fn test_stream_rejects_unknown_model() {
    let app = test_app();
    let (status, body) = send_json(
        &app.router,
        "POST",
        &format!("/chats/{}/messages", Uuid::new_v4()),
        Some(json!({"user_id": "alice", "content": "hi", "model": "acme/giant"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("acme/giant"));
    assert!(app.llm.stream_requests().is_empty());
}

#[tokio::test]
async fn test_stream_into_someone_elses_chat_is_forbidden() {
    let app = test_app();
    let chat = app.persist.save_chat(Chat::new("alice", "mine").with_visibility(Visibility::Public)).await.unwrap();

    let (status, _) = send_json(
        &app.router,
        "POST",
        &format!("/chats/{}/messages", chat.id),
        Some(json!({"user_id": "mallory", "content": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.persist.get_messages(chat.id, None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stream_rejects_duplicate_message_id() {
    let app = test_app();
    let chat_id = Uuid::new_v4();
    let uri = format!("/chats/{}/messages", chat_id);
    let message_id = Uuid::new_v4();
    let body = json!({"user_id": "alice", "message_id": message_id, "content": "hello"});

    let (status, _) = send(&app.router, "POST", &uri, Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(&app.router, "POST", &uri, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    let users = app
        .persist
        .get_messages(chat_id, None, None)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.role == MessageRole::User)
        .count();
    assert_eq!(users, 1);
}

#[tokio::test]
async fn test_daily_entitlement() {
    let app = test_app_with(test_config(1));
    let chat_id = Uuid::new_v4();
    let uri = format!("/chats/{}/messages", chat_id);

    let (status, _) = send(&app.router, "POST", &uri, Some(json!({"user_id": "alice", "content": "one"}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(&app.router, "POST", &uri, Some(json!({"user_id": "alice", "content": "two"}))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].is_string());

    // Other users are unaffected
    let (status, _) = send(
        &app.router,
        "POST",
        &format!("/chats/{}/messages", Uuid::new_v4()),
        Some(json!({"user_id": "bob", "content": "one"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_trailing_messages_and_chat() {
    let app = test_app();
    let chat = app.persist.save_chat(Chat::new("alice", "edit me")).await.unwrap();
    let first = DBMessage::user(chat.id, "alice", "first");
    let cutoff = first.created_at + chrono::Duration::milliseconds(1);
    app.persist.save_message(first).await.unwrap();
    let mut second = DBMessage::user(chat.id, "alice", "second");
    second.created_at = cutoff + chrono::Duration::seconds(1);
    app.persist.save_message(second).await.unwrap();

    let (status, body) = send_json(
        &app.router,
        "DELETE",
        &format!(
            "/chats/{}/messages?user_id=alice&after={}",
            chat.id,
            cutoff.format("%Y-%m-%dT%H:%M:%S%.fZ")
        ),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);

    let (_, listed) = send_json(&app.router, "GET", &format!("/chats/{}/messages?user_id=alice", chat.id), None).await;
    assert_eq!(listed["messages"].as_array().unwrap().len(), 1);
    assert_eq!(listed["messages"][0]["content"], "first");

    let (status, _) = send_json(&app.router, "DELETE", &format!("/chats/{}?user_id=alice", chat.id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.persist.get_chat(chat.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_votes() {
    let app = test_app();
    let chat = app.persist.save_chat(Chat::new("alice", "votes")).await.unwrap();
    let message = DBMessage {
        chat_id: chat.id,
        user_id: "alice".into(),
        content: "answer".into(),
        ..Default::default()
    };
    let message_id = message.id;
    app.persist.save_message(message).await.unwrap();

    let uri = format!("/chats/{}/votes", chat.id);
    let (status, _) = send_json(
        &app.router,
        "PATCH",
        &uri,
        Some(json!({"user_id": "alice", "message_id": message_id, "type": "up"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &app.router,
        "PATCH",
        &uri,
        Some(json!({"user_id": "alice", "message_id": Uuid::new_v4(), "type": "down"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, votes) = send_json(&app.router, "GET", &format!("{}?user_id=alice", uri), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(votes.as_array().unwrap().len(), 1);
    assert_eq!(votes[0]["is_upvoted"], true);
}

#[tokio::test]
async fn test_document_versions() {
    let app = test_app();
    let doc_id = Uuid::new_v4();
    let uri = format!("/documents/{}", doc_id);

    let (status, _) = send_json(&app.router, "GET", &format!("{}?user_id=alice", uri), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let first = app
        .persist
        .save_document(Document::new(doc_id, "Essay", ArtifactKind::Text, "v1", "alice"))
        .await
        .unwrap();

    let (status, saved) = send_json(
        &app.router,
        "POST",
        &uri,
        Some(json!({"user_id": "alice", "title": "Essay", "content": "v2", "kind": "text"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["content"], "v2");

    let (status, _) = send_json(
        &app.router,
        "POST",
        &uri,
        Some(json!({"user_id": "mallory", "title": "Essay", "content": "mine now", "kind": "text"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, versions) = send_json(&app.router, "GET", &format!("{}?user_id=alice", uri), None).await;
    assert_eq!(versions.as_array().unwrap().len(), 2);

    let (status, removed) = send_json(
        &app.router,
        "DELETE",
        &format!(
            "{}?user_id=alice&timestamp={}",
            uri,
            first.created_at.format("%Y-%m-%dT%H:%M:%S%.fZ")
        ),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed.as_array().unwrap().len(), 1);
    assert_eq!(removed[0]["content"], "v2");

    let (status, suggestions) =
        send_json(&app.router, "GET", &format!("{}/suggestions?user_id=alice", uri), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(suggestions.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_document_rejects_unknown_kind() {
    let app = test_app();
    let (status, _) = send_json(
        &app.router,
        "POST",
        &format!("/documents/{}", Uuid::new_v4()),
        Some(json!({"user_id": "alice", "title": "Pic", "content": "", "kind": "image"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_openapi_document() {
    let app = test_app();
    let (status, doc) = send_json(&app.router, "GET", "/api-docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/chats/{chat_id}/messages"].is_object());
    assert!(doc["paths"]["/documents/{document_id}/suggestions"].is_object());
}

#[tokio::test]
async fn test_api_error_response() {
    let response = ApiError::BadRequest("Test error".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
