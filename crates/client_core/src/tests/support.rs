//! In-memory request executor for orchestration tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    error::RequestError,
    transport::{ApiClient, ApiRequest, ApiResponse, Method, RequestExecutor},
};

struct Scripted {
    delay: Duration,
    reply: Result<ApiResponse, RequestError>,
}

/// Answers requests in arrival order from a queue of scripted replies and
/// records every request it sees.
#[derive(Default)]
pub struct ScriptedExecutor {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn api(self: &Arc<Self>) -> ApiClient {
        ApiClient::new(self.clone())
    }

    fn push(&self, delay: Duration, reply: Result<ApiResponse, RequestError>) {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Scripted { delay, reply });
    }

    pub fn reply(&self, value: Value) {
        self.push(Duration::ZERO, Ok(ApiResponse::json(200, &value)));
    }

    pub fn reply_after(&self, delay: Duration, value: Value) {
        self.push(delay, Ok(ApiResponse::json(200, &value)));
    }

    pub fn reply_empty(&self) {
        self.push(
            Duration::ZERO,
            Ok(ApiResponse {
                status: 204,
                ..ApiResponse::default()
            }),
        );
    }

    pub fn reply_bytes(&self, body: &[u8]) {
        self.push(
            Duration::ZERO,
            Ok(ApiResponse {
                status: 200,
                content_type: Some("text/csv".into()),
                body: body.to_vec(),
            }),
        );
    }

    pub fn fail(&self, status: u16, message: &str) {
        self.push(
            Duration::ZERO,
            Err(RequestError::from_status(status, Some(message.to_string()))),
        );
    }

    pub fn fail_after(&self, delay: Duration, status: u16, message: &str) {
        self.push(
            delay,
            Err(RequestError::from_status(status, Some(message.to_string()))),
        );
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// `"METHOD /target"` for each recorded request.
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| format!("{} {}", request.method.as_str(), request.target()))
            .collect()
    }
}

#[async_trait]
impl RequestExecutor for ScriptedExecutor {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, RequestError> {
        self.requests.lock().expect("requests lock").push(request);
        let next = self.replies.lock().expect("replies lock").pop_front();
        let Some(Scripted { delay, reply }) = next else {
            return Err(RequestError::network("no scripted reply left"));
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}

pub fn task_json(id: &str, title: &str) -> Value {
    json!({ "id": id, "title": title, "status": "todo", "priority": "medium" })
}

pub fn user_json(id: &str, name: &str) -> Value {
    json!({ "id": id, "name": name, "email": format!("{id}@example.com") })
}

pub fn is_get(request: &ApiRequest, path: &str) -> bool {
    request.method == Method::Get && request.path == path
}
