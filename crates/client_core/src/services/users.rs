use std::sync::Arc;

use async_trait::async_trait;
use serde::de::IgnoredAny;
use shared::{
    domain::{User, UserId},
    protocol::{
        AuthSession, AvatarUpload, Credentials, NewUser, PasswordChange, Registration, UserFilters,
    },
};

use super::{CrudService, ListService};
use crate::{
    error::RequestError,
    transport::{ApiClient, FormPart, Method, SessionCredentials},
};

/// User directory plus the session endpoints.
///
/// The service only carries the session's credential slot; filling and
/// emptying it is left to the user orchestrator.
#[derive(Clone)]
pub struct UserService {
    api: ApiClient,
    session: Arc<SessionCredentials>,
}

impl UserService {
    pub fn new(api: ApiClient, session: Arc<SessionCredentials>) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &Arc<SessionCredentials> {
        &self.session
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthSession, RequestError> {
        self.api
            .send_json(Method::Post, "/auth/login", credentials)
            .await
    }

    pub async fn register(&self, registration: &Registration) -> Result<AuthSession, RequestError> {
        self.api
            .send_json(Method::Post, "/auth/register", registration)
            .await
    }

    pub async fn logout(&self) -> Result<(), RequestError> {
        self.api.post_empty::<IgnoredAny>("/auth/logout").await?;
        Ok(())
    }

    pub async fn me(&self) -> Result<User, RequestError> {
        self.api.get("/auth/me").await
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), RequestError> {
        self.api
            .send_json::<IgnoredAny, _>(Method::Post, "/auth/password", change)
            .await?;
        Ok(())
    }

    pub async fn upload_avatar(
        &self,
        id: &UserId,
        filename: &str,
        mime_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<AvatarUpload, RequestError> {
        self.api
            .upload(
                &format!("{}/avatar", self.item_path(id)),
                vec![FormPart::file("avatar", filename, mime_type, bytes)],
            )
            .await
    }
}

#[async_trait]
impl ListService for UserService {
    type Entity = User;
    type Filters = UserFilters;

    fn api(&self) -> &ApiClient {
        &self.api
    }
}

#[async_trait]
impl CrudService for UserService {
    type Create = NewUser;
}
