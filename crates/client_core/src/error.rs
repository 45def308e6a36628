use shared::{domain::EntityKind, error::ErrorCode, protocol::ValidationError};
use thiserror::Error;

/// Text recorded when a failure carries nothing more specific.
pub const GENERIC_FAILURE: &str = "An unexpected error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    /// The HTTP exchange never completed.
    Network,
    /// The request could not be encoded before sending.
    Encode,
    /// A 2xx response whose body did not decode.
    Decode,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Validation,
    RateLimited,
    Server,
}

impl RequestErrorKind {
    pub fn from_status(status: u16) -> Self {
        match ErrorCode::from_status(status) {
            ErrorCode::BadRequest => Self::BadRequest,
            ErrorCode::Unauthorized => Self::Unauthorized,
            ErrorCode::Forbidden => Self::Forbidden,
            ErrorCode::NotFound => Self::NotFound,
            ErrorCode::Conflict => Self::Conflict,
            ErrorCode::Validation => Self::Validation,
            ErrorCode::RateLimited => Self::RateLimited,
            ErrorCode::Internal => Self::Server,
        }
    }
}

/// Failure raised by the request executor and passed through services
/// unchanged.
#[derive(Debug, Clone, Error)]
#[error("{}", self.user_message())]
pub struct RequestError {
    pub kind: RequestErrorKind,
    pub status: Option<u16>,
    /// Server-supplied text, when the error body carried one.
    pub message: Option<String>,
    /// Transport or decoder detail, for logs only.
    pub detail: Option<String>,
}

impl RequestError {
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        Self {
            kind: RequestErrorKind::from_status(status),
            status: Some(status),
            message,
            detail: None,
        }
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            kind: RequestErrorKind::Network,
            status: None,
            message: None,
            detail: Some(detail.into()),
        }
    }

    pub fn encode(detail: impl Into<String>) -> Self {
        Self {
            kind: RequestErrorKind::Encode,
            status: None,
            message: None,
            detail: Some(detail.into()),
        }
    }

    pub fn decode(detail: impl Into<String>) -> Self {
        Self {
            kind: RequestErrorKind::Decode,
            status: None,
            message: None,
            detail: Some(detail.into()),
        }
    }

    /// Text suitable for display: the server's message when present, else a
    /// sentence derived from the failure kind.
    pub fn user_message(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }
        match (self.kind, self.status) {
            (RequestErrorKind::Network, _) => {
                "Network error: unable to reach the server".to_string()
            }
            (RequestErrorKind::Encode, _) => "The request could not be prepared".to_string(),
            (RequestErrorKind::Decode, _) => "Received an unreadable response".to_string(),
            (_, Some(status)) => format!("Request failed with status {status}"),
            (_, None) => GENERIC_FAILURE.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == RequestErrorKind::Unauthorized
    }
}

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// An action's precondition failed before any request was made.
    #[error("{0}")]
    Precondition(String),
}

impl ClientError {
    /// Human-readable text recorded in an orchestrator's error slot.
    pub fn message(&self) -> String {
        let text = match self {
            Self::Request(err) => err.user_message(),
            Self::Validation(err) => err.summary(),
            Self::Precondition(text) => text.clone(),
        };
        if text.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            text
        }
    }

    pub fn as_request(&self) -> Option<&RequestError> {
        match self {
            Self::Request(err) => Some(err),
            _ => None,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("no {kind} orchestrator was provided to the application context")]
    MissingProvider { kind: EntityKind },
}
