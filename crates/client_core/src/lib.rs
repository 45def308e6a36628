//! Client-side state and request layer for the project management API.
//!
//! Requests go through a [`RequestExecutor`](transport::RequestExecutor);
//! per-kind services shape them; orchestrators hold the in-memory
//! [`EntityState`](store::EntityState) with its loading and error flags; the
//! [`AppContext`](context::AppContext) hands one orchestrator per kind to the
//! rest of the application.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestration;
pub mod query;
pub mod services;
pub mod store;
pub mod transport;

pub use context::{AppContext, AppContextBuilder};
pub use error::{ClientError, ClientResult, ContextError, RequestError, RequestErrorKind};
pub use orchestration::{Orchestrator, StateEvent};
pub use store::EntityState;

#[cfg(test)]
#[path = "tests/support.rs"]
mod support;

#[cfg(test)]
#[path = "tests/orchestration_tests.rs"]
mod orchestration_tests;

#[cfg(test)]
#[path = "tests/chat_tests.rs"]
mod chat_tests;

#[cfg(test)]
#[path = "tests/context_tests.rs"]
mod context_tests;

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod transport_tests;
