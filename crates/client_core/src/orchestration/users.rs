use shared::{
    domain::{User, UserId, UserPatch},
    protocol::{AuthSession, Credentials, PasswordChange, Registration, Validate},
};
use tracing::debug;

use super::Orchestrator;
use crate::{
    error::{ClientResult, RequestError},
    services::UserService,
    store::EntityState,
};

/// User directory; `current` holds the signed-in user and the service's
/// credential slot holds its token.
pub type UserDesk = Orchestrator<UserService>;

impl Orchestrator<UserService> {
    pub async fn login(&self, credentials: &Credentials) -> ClientResult<User> {
        credentials.validate()?;
        let session = self
            .track("login", self.service().login(credentials), |state, session| {
                self.begin_session(state, session)
            })
            .await?;
        Ok(session.user)
    }

    pub async fn register(&self, registration: &Registration) -> ClientResult<User> {
        registration.validate()?;
        let session = self
            .track("register", self.service().register(registration), |state, session| {
                self.begin_session(state, session)
            })
            .await?;
        Ok(session.user)
    }

    fn begin_session(&self, state: &mut EntityState<User>, session: &AuthSession) {
        self.service().session().set(session.token.clone());
        state.set_current(Some(session.user.clone()));
        debug!(user = %session.user.id, "users: session started");
    }

    /// Signs out. The token and the signed-in user are cleared even if the
    /// server call fails.
    pub async fn logout(&self) -> ClientResult<()> {
        let result = self.track("logout", self.service().logout(), |_, _| {}).await;
        self.end_session().await;
        result
    }

    async fn end_session(&self) {
        self.service().session().clear();
        self.clear_current().await;
        debug!("users: session ended");
    }

    /// Loads the signed-in user. A 401 means the held token is no longer
    /// accepted, so the session is dropped locally.
    pub async fn load_me(&self) -> ClientResult<User> {
        let result = self
            .track("me", self.service().me(), |state, user| {
                state.set_current(Some(user.clone()))
            })
            .await;
        if let Err(err) = &result {
            if err.as_request().is_some_and(RequestError::is_unauthorized) {
                self.end_session().await;
            }
        }
        result
    }

    pub async fn change_password(&self, change: &PasswordChange) -> ClientResult<()> {
        change.validate()?;
        self.track("change_password", self.service().change_password(change), |_, _| {})
            .await
    }

    /// Uploads an avatar and records its URL on the matching user.
    pub async fn upload_avatar(
        &self,
        id: &UserId,
        filename: &str,
        mime_type: Option<String>,
        bytes: Vec<u8>,
    ) -> ClientResult<String> {
        let call = self.service().upload_avatar(id, filename, mime_type, bytes);
        let upload = self
            .mutate("upload_avatar", call, |state, upload| {
                state.patch_by_id(
                    id,
                    UserPatch {
                        avatar_url: Some(Some(upload.avatar_url.clone())),
                        ..UserPatch::default()
                    },
                );
            })
            .await?;
        Ok(upload.avatar_url)
    }
}
