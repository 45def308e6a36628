use chrono::{DateTime, Utc};
use shared::{
    domain::{ChatMessage, ChatSession, ChatSessionId},
    protocol::{FieldError, MessageWindow, SendMessageResponse, ValidationError},
};
use uuid::Uuid;

use super::Orchestrator;
use crate::{
    error::{ClientError, ClientResult},
    services::{ChatSessionService, TemplateService},
};

/// One row of a chat thread.
///
/// A sent message shows up as `Pending` until the server answers, then is
/// either swapped for the `Confirmed` record or discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEntry {
    Pending {
        client_id: Uuid,
        content: String,
        sent_at: DateTime<Utc>,
    },
    Confirmed(ChatMessage),
}

impl ChatEntry {
    pub fn content(&self) -> &str {
        match self {
            Self::Pending { content, .. } => content,
            Self::Confirmed(message) => &message.content,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    fn is_pending_for(&self, id: Uuid) -> bool {
        matches!(self, Self::Pending { client_id, .. } if *client_id == id)
    }

    fn is_message(&self, message: &ChatMessage) -> bool {
        matches!(self, Self::Confirmed(held) if held.id == message.id)
    }
}

/// Messages of the selected session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatThread {
    pub session_id: Option<ChatSessionId>,
    pub entries: Vec<ChatEntry>,
}

impl ChatThread {
    /// Replaces the confirmed history. Pending entries survive when the
    /// session is unchanged.
    fn load(&mut self, session_id: &ChatSessionId, messages: &[ChatMessage]) {
        let pending: Vec<ChatEntry> = if self.session_id.as_ref() == Some(session_id) {
            self.entries
                .drain(..)
                .filter(ChatEntry::is_pending)
                .collect()
        } else {
            Vec::new()
        };
        self.session_id = Some(session_id.clone());
        self.entries = messages.iter().cloned().map(ChatEntry::Confirmed).collect();
        self.entries.extend(pending);
    }

    fn push_pending(&mut self, content: &str) -> Uuid {
        let client_id = Uuid::new_v4();
        self.entries.push(ChatEntry::Pending {
            client_id,
            content: content.to_string(),
            sent_at: Utc::now(),
        });
        client_id
    }

    /// Swaps the pending entry for the server's record and appends the reply.
    /// A thread that moved on to another session is left alone.
    fn confirm(&mut self, client_id: Uuid, message: &ChatMessage, reply: Option<&ChatMessage>) {
        let Some(index) = self
            .entries
            .iter()
            .position(|entry| entry.is_pending_for(client_id))
        else {
            return;
        };
        self.entries.remove(index);
        let confirmed = std::iter::once(message).chain(reply);
        let mut at = index;
        for record in confirmed {
            if self.entries.iter().any(|entry| entry.is_message(record)) {
                continue;
            }
            self.entries.insert(at, ChatEntry::Confirmed(record.clone()));
            at += 1;
        }
    }

    fn discard(&mut self, client_id: Uuid) {
        self.entries.retain(|entry| !entry.is_pending_for(client_id));
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter().filter_map(|entry| match entry {
            ChatEntry::Confirmed(message) => Some(message),
            ChatEntry::Pending { .. } => None,
        })
    }
}

pub type ChatDesk = Orchestrator<ChatSessionService, ChatThread>;

pub type TemplateDesk = Orchestrator<TemplateService>;

impl Orchestrator<ChatSessionService, ChatThread> {
    /// Focuses a session and loads its latest messages.
    pub async fn select_session(&self, id: &ChatSessionId) -> ClientResult<ChatSession> {
        let session = self.fetch_one(id).await?;
        self.load_messages(id, &MessageWindow::default()).await?;
        Ok(session)
    }

    pub async fn load_messages(
        &self,
        session_id: &ChatSessionId,
        window: &MessageWindow,
    ) -> ClientResult<Vec<ChatMessage>> {
        self.track(
            "messages",
            self.service().messages(session_id, window),
            |state, messages| state.related.load(session_id, messages),
        )
        .await
    }

    pub async fn clear_thread(&self) {
        self.update_state(|state| state.related = ChatThread::default())
            .await;
    }

    /// Sends `content` to the selected session.
    ///
    /// A `Pending` entry is shown immediately; it is replaced by the server's
    /// message (and the assistant reply, if any) on success and removed on
    /// failure.
    pub async fn send_message(&self, content: &str) -> ClientResult<SendMessageResponse> {
        if content.trim().is_empty() {
            return Err(ClientError::Validation(ValidationError {
                fields: vec![FieldError {
                    field: "content",
                    message: "is required",
                }],
            }));
        }
        let selected = self
            .update_state(|state| {
                let session_id = state
                    .related
                    .session_id
                    .clone()
                    .or_else(|| state.current.as_ref().map(|session| session.id.clone()))?;
                if state.related.session_id.as_ref() != Some(&session_id) {
                    state.related = ChatThread {
                        session_id: Some(session_id.clone()),
                        entries: Vec::new(),
                    };
                }
                let client_id = state.related.push_pending(content);
                Some((session_id, client_id))
            })
            .await;
        let Some((session_id, client_id)) = selected else {
            return self
                .reject(
                    "send_message",
                    ClientError::Precondition("No chat session selected".to_string()),
                )
                .await;
        };

        let result = self
            .track(
                "send_message",
                self.service().send_message(&session_id, content),
                |state, response| {
                    state
                        .related
                        .confirm(client_id, &response.message, response.reply.as_ref())
                },
            )
            .await;
        if result.is_err() {
            self.update_state(|state| state.related.discard(client_id))
                .await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn message(id: &str, content: &str) -> ChatMessage {
        serde_json::from_value(json!({ "id": id, "session_id": "s1", "content": content }))
            .expect("message")
    }

    #[test]
    fn confirm_replaces_pending_in_place() {
        let mut thread = ChatThread::default();
        thread.load(&ChatSessionId::from("s1"), &[message("m1", "hi")]);
        let client_id = thread.push_pending("question");
        thread.entries.push(ChatEntry::Confirmed(message("m9", "later")));

        let reply = message("m3", "answer");
        thread.confirm(client_id, &message("m2", "question"), Some(&reply));

        let contents: Vec<_> = thread.entries.iter().map(ChatEntry::content).collect();
        assert_eq!(contents, vec!["hi", "question", "answer", "later"]);
        assert!(thread.entries.iter().all(|entry| !entry.is_pending()));
    }

    #[test]
    fn confirm_skips_records_already_held() {
        let mut thread = ChatThread::default();
        thread.load(&ChatSessionId::from("s1"), &[message("m2", "question")]);
        let client_id = thread.push_pending("question");
        thread.confirm(client_id, &message("m2", "question"), None);
        assert_eq!(thread.messages().count(), 1);
        assert_eq!(thread.entries.len(), 1);
    }

    #[test]
    fn discard_drops_only_the_pending_entry() {
        let mut thread = ChatThread::default();
        thread.load(&ChatSessionId::from("s1"), &[message("m1", "hi")]);
        let first = thread.push_pending("one");
        thread.push_pending("two");
        thread.discard(first);
        let contents: Vec<_> = thread.entries.iter().map(ChatEntry::content).collect();
        assert_eq!(contents, vec!["hi", "two"]);
    }

    #[test]
    fn load_for_another_session_drops_pending_entries() {
        let mut thread = ChatThread::default();
        thread.load(&ChatSessionId::from("s1"), &[]);
        thread.push_pending("draft");
        thread.load(&ChatSessionId::from("s1"), &[message("m1", "hi")]);
        assert_eq!(thread.entries.len(), 2);

        thread.load(&ChatSessionId::from("s2"), &[]);
        assert!(thread.entries.is_empty());
        assert_eq!(thread.session_id, Some(ChatSessionId::from("s2")));
    }
}
