use async_trait::async_trait;
use shared::{
    domain::{ChatMessage, ChatSession, ChatSessionId, ChatTemplate},
    protocol::{
        ChatFilters, MessageWindow, NewChatSession, NewTemplate, SendMessageRequest,
        SendMessageResponse,
    },
};

use super::{CrudService, ListService};
use crate::{
    error::RequestError,
    transport::{ApiClient, Method},
};

#[derive(Clone)]
pub struct ChatSessionService {
    api: ApiClient,
}

impl ChatSessionService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn messages(
        &self,
        id: &ChatSessionId,
        window: &MessageWindow,
    ) -> Result<Vec<ChatMessage>, RequestError> {
        self.api
            .get_with(&format!("{}/messages", self.item_path(id)), window)
            .await
    }

    pub async fn send_message(
        &self,
        id: &ChatSessionId,
        content: &str,
    ) -> Result<SendMessageResponse, RequestError> {
        self.api
            .send_json(
                Method::Post,
                &format!("{}/messages", self.item_path(id)),
                &SendMessageRequest {
                    content: content.to_string(),
                },
            )
            .await
    }
}

#[async_trait]
impl ListService for ChatSessionService {
    type Entity = ChatSession;
    type Filters = ChatFilters;

    fn api(&self) -> &ApiClient {
        &self.api
    }
}

#[async_trait]
impl CrudService for ChatSessionService {
    type Create = NewChatSession;
}

#[derive(Clone)]
pub struct TemplateService {
    api: ApiClient,
}

impl TemplateService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ListService for TemplateService {
    type Entity = ChatTemplate;
    type Filters = ChatFilters;

    fn api(&self) -> &ApiClient {
        &self.api
    }
}

#[async_trait]
impl CrudService for TemplateService {
    type Create = NewTemplate;
}
