use futures::StreamExt;
use mockito::Matcher;
use parley_llm::{ChatClient, ChatOptions, ChatRequest, Message, OpenRouterClient, StreamEvent};

#[tokio::test]
async fn test_chat_stream_against_fake_gateway() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        ": OPENROUTER PROCESSING\n\n",
        "data: {\"id\":\"gen-1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hi\"},\"finish_reason\":null}]}\n\n",
        "data: {\"id\":\"gen-1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" there\"},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );

    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_header("x-title", "Parley")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "openai/gpt-4o-mini",
            "stream": true,
        })))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let client = OpenRouterClient::with_app_info("sk-test", None, Some("Parley".into()))
        .unwrap()
        .with_base_url(server.url());

    let stream = client
        .chat_stream(ChatRequest::new("openai/gpt-4o-mini", vec![Message::human("hello")]))
        .await
        .unwrap();
    let events: Vec<StreamEvent> = stream.map(|e| e.unwrap()).collect().await;

    mock.assert_async().await;
    assert_eq!(
        events,
        vec![
            StreamEvent::Message { content: "Hi".into() },
            StreamEvent::Message { content: " there".into() },
            StreamEvent::Done { finish_reason: Some("stop".into()) },
        ]
    );
}

#[tokio::test]
async fn test_non_success_status_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(402)
        .with_body(r#"{"error":{"message":"Insufficient credits"}}"#)
        .create_async()
        .await;

    let client = OpenRouterClient::new("sk-test").unwrap().with_base_url(server.url());
    let result = client
        .chat_stream(ChatRequest::new("m", vec![Message::human("hello")]))
        .await;

    let err = result.err().expect("expected error").to_string();
    assert!(err.contains("402"));
    assert!(err.contains("Insufficient credits"));
}

#[tokio::test]
async fn test_non_streaming_chat() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(serde_json::json!({ "stream": false })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"id":"gen-2","model":"m","choices":[{"index":0,"message":{"role":"assistant","content":"Weather chat"},"finish_reason":"stop"}],"usage":{"prompt_tokens":3,"completion_tokens":2,"total_tokens":5}}"#,
        )
        .create_async()
        .await;

    let client = OpenRouterClient::new("sk-test").unwrap().with_base_url(server.url());
    let response = client
        .chat(
            ChatRequest::new("m", vec![Message::human("what's the weather?")])
                .with_options(ChatOptions::new().max_tokens(20)),
        )
        .await
        .unwrap();

    assert_eq!(response.content.as_deref(), Some("Weather chat"));
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    assert_eq!(response.usage.unwrap().total_tokens, 5);
}
