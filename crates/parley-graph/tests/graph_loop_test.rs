use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parley_graph::{EndStatus, Graph, GraphConfig, GraphInput, LLMConfig, StreamEvent};
use parley_llm::{ChatClient, ChatRequest, ChatResponse, EventStream, Message, StreamEvent as LlmEvent};
use parley_persist::{to_llm_messages, Chat, DBMessage, MemoryPersistenceClient, MessageType, PersistenceClient};
use parley_tools::{ToolContext, ToolHandler, ToolRegistry};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

enum Turn {
    Events(Vec<LlmEvent>),
    /// Stream fails after the given events
    FailAfter(Vec<LlmEvent>, &'static str),
    /// Request itself is rejected
    Reject(&'static str),
    Hang,
}

/// Plays back one scripted turn per streaming request
struct ScriptedClient {
    turns: Mutex<VecDeque<Turn>>,
    repeat_last: Option<Vec<LlmEvent>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    fn new(turns: Vec<Turn>) -> Arc<Self> {
        Arc::new(Self {
            turns: Mutex::new(turns.into()),
            repeat_last: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn always(events: Vec<LlmEvent>) -> Arc<Self> {
        Arc::new(Self {
            turns: Mutex::new(VecDeque::new()),
            repeat_last: Some(events),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        Err(anyhow!("not scripted"))
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        self.requests.lock().unwrap().push(request);
        let turn = self.turns.lock().unwrap().pop_front();
        let turn = match (turn, &self.repeat_last) {
            (Some(turn), _) => turn,
            (None, Some(events)) => Turn::Events(events.clone()),
            (None, None) => return Err(anyhow!("script exhausted")),
        };

        match turn {
            Turn::Events(events) => Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok::<_, anyhow::Error>)))),
            Turn::FailAfter(events, message) => Ok(Box::pin(async_stream::stream! {
                for event in events {
                    yield Ok(event);
                }
                yield Err(anyhow!(message));
            })),
            Turn::Reject(message) => Err(anyhow!(message)),
            Turn::Hang => Ok(Box::pin(futures::stream::pending::<Result<LlmEvent>>())),
        }
    }
}

/// Echoes its arguments back
struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the arguments"
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {"text": {"type": "string"}}})
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value> {
        Ok(json!({"echo": arguments["text"]}))
    }
}

/// Outlives short run timeouts
struct SlowTool;

#[async_trait]
impl ToolHandler for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }

    fn description(&self) -> &str {
        "Takes its time"
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn call(&self, _arguments: Value, _ctx: &ToolContext) -> Result<Value> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(json!({"done": true}))
    }
}

fn text(content: &str) -> LlmEvent {
    LlmEvent::Message { content: content.into() }
}

fn done(reason: &str) -> LlmEvent {
    LlmEvent::Done { finish_reason: Some(reason.into()) }
}

fn call_fragment(index: u32, id: Option<&str>, name: Option<&str>, args: &str) -> LlmEvent {
    LlmEvent::ToolCall {
        index,
        id: id.map(String::from),
        name: name.map(String::from),
        arguments: Some(args.into()),
    }
}

async fn registry() -> Arc<ToolRegistry> {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool)).await;
    Arc::new(registry)
}

async fn collect(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn end_status(events: &[StreamEvent]) -> EndStatus {
    match events.last() {
        Some(StreamEvent::EndStream { status, .. }) => *status,
        other => panic!("expected EndStream last, got {:?}", other),
    }
}

fn input(chat_id: Uuid) -> GraphInput {
    GraphInput::new(chat_id, vec![Message::human("hi")], LLMConfig::new("test/model")).with_user("alice")
}

#[tokio::test]
async fn test_plain_answer_uses_one_llm_call() {
    let client = ScriptedClient::new(vec![Turn::Events(vec![text("Hel"), text("lo"), done("stop")])]);
    let graph = Graph::builder()
        .llm_client(client.clone())
        .tools(registry().await)
        .build()
        .unwrap();

    let events = collect(graph.spawn_run(input(Uuid::new_v4()))).await;

    assert!(matches!(events[0], StreamEvent::InitStream { .. }));
    assert_eq!(events[1], StreamEvent::Message { content: "Hel".into() });
    assert_eq!(end_status(&events), EndStatus::Success);
    assert_eq!(client.requests().len(), 1);

    let tools = client.requests()[0].options.tools.clone().unwrap();
    assert_eq!(tools[0].name(), "echo");
}

#[tokio::test]
async fn test_tool_call_round_trip_and_persistence() {
    let client = ScriptedClient::new(vec![
        Turn::Events(vec![
            call_fragment(0, Some("call_a"), Some("echo"), "{\"te"),
            call_fragment(0, None, None, "xt\":\"ping\"}"),
            done("tool_calls"),
        ]),
        Turn::Events(vec![text("pong received"), done("stop")]),
    ]);
    let store = Arc::new(MemoryPersistenceClient::new());
    let chat = store.save_chat(Chat::new("alice", "t")).await.unwrap();

    let graph = Graph::builder()
        .llm_client(client.clone())
        .tools(registry().await)
        .with_persistence(store.clone())
        .build()
        .unwrap();

    let events = collect(graph.spawn_run(input(chat.id))).await;
    assert_eq!(end_status(&events), EndStatus::Success);

    let result = events
        .iter()
        .find_map(|e| match e {
            StreamEvent::ToolResult { tool_call_id, result, is_error, .. } => {
                Some((tool_call_id.clone(), result.clone(), *is_error))
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(result, ("call_a".to_string(), r#"{"echo":"ping"}"#.to_string(), false));

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    let second = &requests[1].messages;
    assert!(matches!(second.last(), Some(Message::Tool { tool_call_id, .. }) if tool_call_id == "call_a"));

    let rows: Vec<DBMessage> = store.get_messages(chat.id, None, None).await.unwrap();
    let types: Vec<MessageType> = rows.iter().map(|r| r.message_type).collect();
    assert_eq!(
        types,
        vec![MessageType::ToolCall, MessageType::ToolResult, MessageType::Message]
    );
    assert_eq!(rows[0].arguments, Some(json!({"text": "ping"})));
    assert_eq!(rows[2].content, "pong received");
}

#[tokio::test]
async fn test_every_parallel_tool_call_is_persisted() {
    let client = ScriptedClient::new(vec![
        Turn::Events(vec![
            call_fragment(0, Some("c0"), Some("echo"), r#"{"text":"a"}"#),
            call_fragment(1, Some("c1"), Some("echo"), r#"{"text":"b"}"#),
            done("tool_calls"),
        ]),
        Turn::Events(vec![text("both done"), done("stop")]),
    ]);
    let store = Arc::new(MemoryPersistenceClient::new());
    let chat = store.save_chat(Chat::new("alice", "t")).await.unwrap();

    let graph = Graph::builder()
        .llm_client(client)
        .tools(registry().await)
        .with_persistence(store.clone())
        .build()
        .unwrap();
    collect(graph.spawn_run(input(chat.id))).await;

    let rows = store.get_messages(chat.id, None, None).await.unwrap();
    let calls: Vec<_> = rows
        .iter()
        .filter(|r| r.message_type == MessageType::ToolCall)
        .map(|r| r.tool_call_id.clone().unwrap())
        .collect();
    let results = rows.iter().filter(|r| r.message_type == MessageType::ToolResult).count();
    assert_eq!(calls, vec!["c0", "c1"]);
    assert_eq!(results, 2);
}

#[tokio::test]
async fn test_step_limit_stops_without_another_llm_call() {
    let client = ScriptedClient::always(vec![
        call_fragment(0, Some("loop"), Some("echo"), r#"{"text":"again"}"#),
        done("tool_calls"),
    ]);
    let graph = Graph::builder()
        .llm_client(client.clone())
        .tools(registry().await)
        .config(GraphConfig::new().with_max_steps(2))
        .build()
        .unwrap();

    let events = collect(graph.spawn_run(input(Uuid::new_v4()))).await;

    assert_eq!(end_status(&events), EndStatus::StepLimit);
    assert_eq!(client.requests().len(), 2);
    let tool_results = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::ToolResult { .. }))
        .count();
    assert_eq!(tool_results, 2);
}

#[tokio::test]
async fn test_tool_errors_are_fed_back_to_the_model() {
    let client = ScriptedClient::new(vec![
        Turn::Events(vec![
            call_fragment(0, Some("bad"), Some("teleport"), "{}"),
            done("tool_calls"),
        ]),
        Turn::Events(vec![text("sorry"), done("stop")]),
    ]);
    let graph = Graph::builder()
        .llm_client(client.clone())
        .tools(registry().await)
        .build()
        .unwrap();

    let events = collect(graph.spawn_run(input(Uuid::new_v4()))).await;
    assert_eq!(end_status(&events), EndStatus::Success);

    let errored = events.iter().any(|e| {
        matches!(e, StreamEvent::ToolResult { is_error: true, result, .. } if result.contains("not found"))
    });
    assert!(errored);

    let second = &client.requests()[1].messages;
    assert!(second.last().unwrap().text().contains("Tool execution failed"));
}

#[tokio::test]
async fn test_rejected_request_ends_with_error() {
    let client = ScriptedClient::new(vec![Turn::Reject("OpenRouter API error (401): bad key")]);
    let graph = Graph::builder().llm_client(client).build().unwrap();

    let events = collect(graph.spawn_run(input(Uuid::new_v4()))).await;

    assert_eq!(events.len(), 3);
    assert!(matches!(&events[1], StreamEvent::Error { message, .. } if message.contains("model stream")));
    // the full error chain reaches the client
    assert!(matches!(&events[1], StreamEvent::Error { message, .. } if message.contains("401")));
    assert_eq!(end_status(&events), EndStatus::Error);
}

#[tokio::test]
async fn test_mid_stream_failure_ends_with_error() {
    let client = ScriptedClient::new(vec![Turn::FailAfter(vec![text("partial")], "Gateway stream error: overloaded")]);
    let graph = Graph::builder().llm_client(client).build().unwrap();

    let events = collect(graph.spawn_run(input(Uuid::new_v4()))).await;

    assert_eq!(events[1], StreamEvent::Message { content: "partial".into() });
    assert!(matches!(&events[2], StreamEvent::Error { message, .. } if message.contains("overloaded")));
    assert_eq!(end_status(&events), EndStatus::Error);
}

#[tokio::test]
async fn test_execution_timeout() {
    let client = ScriptedClient::new(vec![Turn::Hang]);
    let graph = Graph::builder()
        .llm_client(client)
        .config(GraphConfig::new().with_timeout(Duration::from_millis(50)))
        .build()
        .unwrap();

    let events = collect(graph.spawn_run(input(Uuid::new_v4()))).await;

    assert!(matches!(&events[events.len() - 2], StreamEvent::Error { message, .. } if message.contains("timed out")));
    assert_eq!(end_status(&events), EndStatus::Error);
}

#[tokio::test]
async fn test_dropped_receiver_stops_the_run() {
    let client = ScriptedClient::always(vec![text("never read"), done("stop")]);
    let graph = Graph::builder().llm_client(client.clone()).build().unwrap();

    drop(graph.spawn_run(input(Uuid::new_v4())));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn test_reasoning_models_run_without_tools() {
    let client = ScriptedClient::new(vec![Turn::Events(vec![
        LlmEvent::Reasoning { content: "thinking".into() },
        text("answer"),
        done("stop"),
    ])]);
    let store = Arc::new(MemoryPersistenceClient::new());
    let chat = store.save_chat(Chat::new("alice", "t")).await.unwrap();
    let graph = Graph::builder()
        .llm_client(client.clone())
        .tools(registry().await)
        .with_persistence(store.clone())
        .build()
        .unwrap();

    let config = LLMConfig::new("test/reasoner").with_tools_enabled(false).with_reasoning(true);
    let input = GraphInput::new(chat.id, vec![Message::human("why?")], config).with_user("alice");
    let events = collect(graph.spawn_run(input)).await;

    assert_eq!(events[1], StreamEvent::Reasoning { content: "thinking".into() });
    let request = &client.requests()[0];
    assert!(request.options.tools.is_none());
    assert!(request.options.include_reasoning);

    let rows = store.get_messages(chat.id, None, None).await.unwrap();
    assert_eq!(rows[0].message_type, MessageType::Reasoning);
    assert_eq!(rows[1].content, "answer");
}

#[tokio::test]
async fn test_interleaved_fragments_assemble_by_index() {
    let client = ScriptedClient::new(vec![
        Turn::Events(vec![
            call_fragment(1, Some("c1"), Some("echo"), r#"{"te"#),
            call_fragment(0, Some("c0"), Some("echo"), r#"{"text""#),
            call_fragment(1, None, None, r#"xt":"b"}"#),
            call_fragment(0, None, None, r#":"a"}"#),
            done("tool_calls"),
        ]),
        Turn::Events(vec![text("ok"), done("stop")]),
    ]);
    let graph = Graph::builder()
        .llm_client(client.clone())
        .tools(registry().await)
        .build()
        .unwrap();

    let events = collect(graph.spawn_run(input(Uuid::new_v4()))).await;
    assert_eq!(end_status(&events), EndStatus::Success);

    let results: Vec<(String, String)> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::ToolResult { tool_call_id, result, .. } => Some((tool_call_id.clone(), result.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        results,
        vec![
            ("c0".to_string(), r#"{"echo":"a"}"#.to_string()),
            ("c1".to_string(), r#"{"echo":"b"}"#.to_string()),
        ]
    );

    match &client.requests()[1].messages[1] {
        Message::AI { tool_calls: Some(calls), .. } => {
            let ids: Vec<&str> = calls.iter().map(|c| c.id.as_str()).collect();
            assert_eq!(ids, vec!["c0", "c1"]);
        }
        other => panic!("expected assistant tool call turn, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_mid_tool_leaves_no_unanswered_calls() {
    let client = ScriptedClient::new(vec![Turn::Events(vec![
        call_fragment(0, Some("c_slow"), Some("slow"), "{}"),
        done("tool_calls"),
    ])]);
    let tools = ToolRegistry::new();
    tools.register(Arc::new(SlowTool)).await;

    let store = Arc::new(MemoryPersistenceClient::new());
    let chat = store.save_chat(Chat::new("alice", "t")).await.unwrap();
    let graph = Graph::builder()
        .llm_client(client)
        .tools(Arc::new(tools))
        .with_persistence(store.clone())
        .config(GraphConfig::new().with_timeout(Duration::from_millis(100)))
        .build()
        .unwrap();

    let events = collect(graph.spawn_run(input(chat.id))).await;
    assert_eq!(end_status(&events), EndStatus::Error);

    let rows = store.get_messages(chat.id, None, None).await.unwrap();
    for call in rows.iter().filter(|r| r.message_type == MessageType::ToolCall) {
        assert!(
            rows.iter()
                .any(|r| r.message_type == MessageType::ToolResult && r.tool_call_id == call.tool_call_id),
            "tool call {:?} stored without a result",
            call.tool_call_id
        );
    }

    // the next turn rebuilds into a transcript the gateway accepts
    store
        .save_message(DBMessage::user(chat.id, "alice", "next turn"))
        .await
        .unwrap();
    let history = to_llm_messages(store.get_messages(chat.id, None, None).await.unwrap());
    for (i, message) in history.iter().enumerate() {
        if let Message::AI { tool_calls: Some(calls), .. } = message {
            for call in calls {
                assert!(history[i + 1..]
                    .iter()
                    .any(|m| matches!(m, Message::Tool { tool_call_id, .. } if *tool_call_id == call.id)));
            }
        }
    }
    assert_eq!(history.last(), Some(&Message::human("next turn")));
}

#[tokio::test]
async fn test_rows_take_the_chat_owner_when_input_has_no_user() {
    let client = ScriptedClient::new(vec![Turn::Events(vec![text("hello"), done("stop")])]);
    let store = Arc::new(MemoryPersistenceClient::new());
    let chat = store.save_chat(Chat::new("alice", "t")).await.unwrap();
    let graph = Graph::builder()
        .llm_client(client)
        .with_persistence(store.clone())
        .build()
        .unwrap();

    let input = GraphInput::new(chat.id, vec![Message::human("hi")], LLMConfig::new("test/model"));
    collect(graph.spawn_run(input)).await;

    let rows = store.get_messages(chat.id, None, None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, "alice");
}
