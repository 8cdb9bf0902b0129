use parley_context::{ContextStrategy, DefaultContextStrategy};
use parley_llm::Message;
use parley_persist::{Chat, DBMessage, MemoryPersistenceClient, MessageRole, MessageType, PersistenceClient};
use parley_types::ContextPolicy;

async fn chat_with_history(store: &MemoryPersistenceClient, turns: usize) -> uuid::Uuid {
    let chat = store.save_chat(Chat::new("alice", "history")).await.unwrap();
    for i in 0..turns {
        store
            .save_message(DBMessage::user(chat.id, "alice", format!("question number {}", i)))
            .await
            .unwrap();
        store
            .save_message(DBMessage {
                chat_id: chat.id,
                user_id: "alice".into(),
                role: MessageRole::Assistant,
                content: format!("answer number {} with some extra words", i),
                ..Default::default()
            })
            .await
            .unwrap();
    }
    chat.id
}

#[tokio::test]
async fn test_small_history_fits_entirely() {
    let store = MemoryPersistenceClient::new();
    let chat_id = chat_with_history(&store, 3).await;

    let strategy = DefaultContextStrategy::new(10_000).unwrap();
    let window = strategy
        .get_context_window(chat_id, "be nice".into(), &store)
        .await
        .unwrap();

    assert_eq!(window.messages.len(), 6);
    let all = window.into_messages();
    assert_eq!(all[0], Message::system("be nice"));
    assert_eq!(all[1], Message::human("question number 0"));
}

#[tokio::test]
async fn test_budget_drops_oldest_and_starts_at_user_turn() {
    let store = MemoryPersistenceClient::new();
    let chat_id = chat_with_history(&store, 20).await;

    let strategy = DefaultContextStrategy::new(120).unwrap();
    let window = strategy
        .get_context_window(chat_id, String::new(), &store)
        .await
        .unwrap();

    assert!(window.messages.len() < 40);
    assert!(matches!(window.messages[0], Message::Human { .. }));
    assert_eq!(
        window.messages.last().unwrap().text(),
        "answer number 19 with some extra words"
    );
}

#[tokio::test]
async fn test_last_k_policy() {
    let store = MemoryPersistenceClient::new();
    let chat_id = chat_with_history(&store, 5).await;

    let strategy = DefaultContextStrategy::new(10_000)
        .unwrap()
        .with_policy(ContextPolicy::LastK { k: 4 });
    let window = strategy
        .get_context_window(chat_id, String::new(), &store)
        .await
        .unwrap();

    assert_eq!(window.messages.len(), 4);
    assert_eq!(window.messages[0].text(), "question number 3");
}

#[tokio::test]
async fn test_reasoning_rows_are_not_sent() {
    let store = MemoryPersistenceClient::new();
    let chat = store.save_chat(Chat::new("alice", "r")).await.unwrap();
    store.save_message(DBMessage::user(chat.id, "alice", "hi")).await.unwrap();
    store
        .save_message(DBMessage {
            chat_id: chat.id,
            message_type: MessageType::Reasoning,
            content: "pondering".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let window = DefaultContextStrategy::new(1000)
        .unwrap()
        .get_context_window(chat.id, String::new(), &store)
        .await
        .unwrap();
    assert_eq!(window.messages, vec![Message::human("hi")]);
}
