use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::error::ApiError;
use tracing::{debug, warn};

use crate::{
    error::RequestError,
    query::{query_pairs, with_query, QueryPairs},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        mime_type: Option<String>,
        bytes: Vec<u8>,
    },
}

impl FormPart {
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        mime_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self::File {
            name: name.into(),
            filename: filename.into(),
            mime_type,
            bytes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<FormPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: QueryPairs,
    pub body: RequestBody,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            headers: Vec::new(),
        }
    }

    pub fn with_query(mut self, query: QueryPairs) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Path plus encoded query string.
    pub fn target(&self) -> String {
        with_query(&self.path, &self.query)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json(status: u16, value: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: value.to_string().into_bytes(),
        }
    }
}

/// Performs one HTTP exchange. Non-2xx responses surface as `RequestError`.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, RequestError>;
}

/// Source of the bearer credential attached to outgoing requests.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

pub struct StaticToken(pub String);

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Token slot filled by a successful login and emptied by logout.
#[derive(Default)]
pub struct SessionCredentials {
    token: RwLock<Option<String>>,
}

impl SessionCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer_token().is_some()
    }
}

impl CredentialProvider for SessionCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|token| !token.is_empty())
    }
}

pub struct HttpExecutor {
    http: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpExecutor {
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            credentials,
        }
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, RequestError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RequestError::network(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            credentials,
        })
    }

    fn url_for(&self, request: &ApiRequest) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), request.target())
    }
}

fn multipart_form(parts: Vec<FormPart>) -> Result<multipart::Form, RequestError> {
    let mut form = multipart::Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name, value),
            FormPart::File {
                name,
                filename,
                mime_type,
                bytes,
            } => {
                let mut file = multipart::Part::bytes(bytes).file_name(filename);
                if let Some(mime_type) = mime_type {
                    file = file.mime_str(&mime_type).map_err(|e| {
                        RequestError::encode(format!("invalid mime type '{mime_type}': {e}"))
                    })?;
                }
                form.part(name, file)
            }
        };
    }
    Ok(form)
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, RequestError> {
        let url = self.url_for(&request);
        let mut builder = self.http.request(request.method.to_reqwest(), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = self.credentials.bearer_token() {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| RequestError::network(e.to_string()))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| RequestError::network(e.to_string()))?
            .to_vec();

        if !(200..300).contains(&status) {
            let message = serde_json::from_slice::<ApiError>(&body)
                .ok()
                .and_then(|err| err.text().map(str::to_string));
            return Err(RequestError::from_status(status, message));
        }

        Ok(ApiResponse {
            status,
            content_type,
            body,
        })
    }
}

const JSON_MEDIA_TYPE: &str = "application/json";

/// Request for an endpoint that answers in JSON.
fn json_request(method: Method, path: &str) -> ApiRequest {
    ApiRequest::new(method, path).with_header("Accept", JSON_MEDIA_TYPE)
}

/// Typed helpers over a `RequestExecutor`, shared by every entity service.
/// Every helper except [`get_blob`](Self::get_blob) asks for JSON.
#[derive(Clone)]
pub struct ApiClient {
    executor: Arc<dyn RequestExecutor>,
}

impl ApiClient {
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Self {
        Self { executor }
    }

    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, RequestError> {
        let method = request.method.as_str();
        let target = request.target();
        match self.executor.execute(request).await {
            Ok(response) => {
                debug!(method, path = %target, status = response.status, "api: request completed");
                Ok(response)
            }
            Err(err) => {
                warn!(
                    method,
                    path = %target,
                    status = ?err.status,
                    detail = err.detail.as_deref().unwrap_or_default(),
                    "api: request failed: {err}"
                );
                Err(err)
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        let response = self.execute(json_request(Method::Get, path)).await?;
        decode(&response)
    }

    pub async fn get_with<T, F>(&self, path: &str, filters: &F) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        F: Serialize + Sync + ?Sized,
    {
        let request = json_request(Method::Get, path).with_query(query_pairs(filters)?);
        let response = self.execute(request).await?;
        decode(&response)
    }

    pub async fn send_json<T, B>(&self, method: Method, path: &str, body: &B) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let value = serde_json::to_value(body)
            .map_err(|e| RequestError::encode(format!("failed to encode request body: {e}")))?;
        let request = json_request(method, path).with_body(RequestBody::Json(value));
        let response = self.execute(request).await?;
        decode(&response)
    }

    /// Bodyless POST, used for verbs such as archive or logout.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        let response = self.execute(json_request(Method::Post, path)).await?;
        decode(&response)
    }

    pub async fn delete(&self, path: &str) -> Result<(), RequestError> {
        self.execute(json_request(Method::Delete, path)).await?;
        Ok(())
    }

    /// Raw bytes of an export. Saving them is left to the caller.
    pub async fn get_blob<F>(&self, path: &str, filters: &F) -> Result<Vec<u8>, RequestError>
    where
        F: Serialize + Sync + ?Sized,
    {
        let request = ApiRequest::new(Method::Get, path).with_query(query_pairs(filters)?);
        Ok(self.execute(request).await?.body)
    }

    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        parts: Vec<FormPart>,
    ) -> Result<T, RequestError> {
        let request = json_request(Method::Post, path).with_body(RequestBody::Multipart(parts));
        let response = self.execute(request).await?;
        decode(&response)
    }
}

/// Decodes a JSON body. An empty body decodes as JSON `null`.
pub fn decode<T: DeserializeOwned>(response: &ApiResponse) -> Result<T, RequestError> {
    let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &response.body
    };
    serde_json::from_slice(body).map_err(|e| RequestError::decode(e.to_string()))
}
