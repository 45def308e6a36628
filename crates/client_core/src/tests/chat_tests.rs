use std::{sync::Arc, time::Duration};

use serde_json::json;
use shared::domain::{ChatSessionId, MessageRole};

use crate::{
    error::ClientError,
    orchestration::{ChatDesk, ChatEntry},
    services::ChatSessionService,
    support::ScriptedExecutor,
    transport::RequestBody,
};

async fn desk_on_session(executor: &Arc<ScriptedExecutor>) -> ChatDesk {
    executor.reply(json!({ "id": "s1", "title": "Planning" }));
    executor.reply(json!([{ "id": "m1", "session_id": "s1", "role": "user", "content": "hello" }]));
    let desk = ChatDesk::new(ChatSessionService::new(executor.api()));
    desk.select_session(&ChatSessionId::from("s1"))
        .await
        .expect("select session");
    desk
}

#[tokio::test]
async fn sent_message_is_confirmed_with_its_reply() {
    let executor = ScriptedExecutor::new();
    let desk = desk_on_session(&executor).await;
    executor.reply(json!({
        "message": { "id": "m2", "session_id": "s1", "role": "user", "content": "status?" },
        "reply": { "id": "m3", "session_id": "s1", "role": "assistant", "content": "on track" }
    }));

    let response = desk.send_message("status?").await.expect("send");

    assert_eq!(response.reply.map(|m| m.role), Some(MessageRole::Assistant));
    let thread = desk.related().await;
    let contents: Vec<_> = thread.entries.iter().map(ChatEntry::content).collect();
    assert_eq!(contents, vec!["hello", "status?", "on track"]);
    assert!(thread.entries.iter().all(|entry| !entry.is_pending()));
    assert_eq!(
        executor.requests()[2].body,
        RequestBody::Json(json!({ "content": "status?" }))
    );
    assert_eq!(executor.calls()[2], "POST /chat/sessions/s1/messages");
}

#[tokio::test]
async fn pending_entry_is_visible_while_the_send_is_in_flight() {
    let executor = ScriptedExecutor::new();
    let desk = Arc::new(desk_on_session(&executor).await);
    executor.reply_after(
        Duration::from_millis(80),
        json!({ "message": { "id": "m2", "session_id": "s1", "content": "later" } }),
    );

    let sending = tokio::spawn({
        let desk = desk.clone();
        async move { desk.send_message("later").await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let thread = desk.related().await;
    assert!(thread.entries.last().is_some_and(ChatEntry::is_pending));
    assert!(desk.is_loading().await);

    sending.await.expect("join").expect("send");
    let thread = desk.related().await;
    assert_eq!(thread.entries.len(), 2);
    assert!(!thread.entries[1].is_pending());
}

#[tokio::test]
async fn failed_send_discards_the_pending_entry() {
    let executor = ScriptedExecutor::new();
    let desk = desk_on_session(&executor).await;
    executor.fail(503, "assistant unavailable");

    let err = desk.send_message("anyone?").await.expect_err("send fails");

    assert!(matches!(err, ClientError::Request(_)));
    let thread = desk.related().await;
    assert_eq!(thread.entries.len(), 1);
    assert_eq!(desk.error().await.as_deref(), Some("assistant unavailable"));
}

#[tokio::test]
async fn blank_message_is_rejected_without_a_request() {
    let executor = ScriptedExecutor::new();
    let desk = desk_on_session(&executor).await;

    let err = desk.send_message("  ").await.expect_err("blank");

    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(executor.requests().len(), 2);
    assert_eq!(desk.related().await.entries.len(), 1);
}

#[tokio::test]
async fn sending_without_a_session_is_a_precondition_failure() {
    let executor = ScriptedExecutor::new();
    let desk = ChatDesk::new(ChatSessionService::new(executor.api()));

    let err = desk.send_message("hi").await.expect_err("no session");

    assert!(matches!(err, ClientError::Precondition(_)));
    assert!(executor.requests().is_empty());
    assert_eq!(desk.error().await.as_deref(), Some("No chat session selected"));
}

#[tokio::test]
async fn clear_thread_forgets_the_session() {
    let executor = ScriptedExecutor::new();
    let desk = desk_on_session(&executor).await;

    desk.clear_thread().await;

    let thread = desk.related().await;
    assert_eq!(thread.session_id, None);
    assert!(thread.entries.is_empty());
}
