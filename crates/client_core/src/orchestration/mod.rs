//! Loading/error lifecycle around entity services.
//!
//! Every action sets `loading` and clears `error`, awaits the service, then
//! either applies a store transition or records the failure text, clears
//! `loading`, and hands the original result back. Concurrent actions on one
//! orchestrator share the flag pair; whichever finishes last decides the final
//! `loading`/`error` values.

use std::{future::Future, time::Duration};

use shared::{
    domain::{Entity, EntityKind},
    protocol::Validate,
};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::{
    cache::CacheMirror,
    error::{ClientError, ClientResult},
    services::{CrudService, EntityId, EntityPatch, ListService},
    store::EntityState,
};

mod activity;
mod calendar;
mod chat;
mod projects;
mod reports;
mod search;
mod tasks;
mod users;

pub use activity::ActivityFeed;
pub use calendar::{select_event, CalendarDesk};
pub use chat::{ChatDesk, ChatEntry, ChatThread, TemplateDesk};
pub use projects::{ProjectDesk, ProjectRelations};
pub use reports::ReportDesk;
pub use search::DebouncedSearch;
pub use tasks::TaskDesk;
pub use users::UserDesk;

const EVENT_CAPACITY: usize = 64;

/// Lifecycle notifications for observers of one orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    Started {
        kind: EntityKind,
        action: &'static str,
    },
    Succeeded {
        kind: EntityKind,
        action: &'static str,
    },
    Failed {
        kind: EntityKind,
        action: &'static str,
        message: String,
    },
}

struct ListCache<E> {
    mirror: CacheMirror<Vec<E>>,
    max_age: Duration,
}

pub struct Orchestrator<S: ListService, R = ()> {
    service: S,
    state: RwLock<EntityState<S::Entity, R>>,
    events: broadcast::Sender<StateEvent>,
    cache: Option<ListCache<S::Entity>>,
}

impl<S, R> Orchestrator<S, R>
where
    S: ListService,
    R: Default + Clone + Send + Sync + 'static,
{
    pub fn new(service: S) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            service,
            state: RwLock::new(EntityState::default()),
            events,
            cache: None,
        }
    }

    /// Mirrors unfiltered list results into `mirror`, served by
    /// [`fetch_all_cached`](Self::fetch_all_cached) while younger than `max_age`.
    pub fn with_cache(mut self, mirror: CacheMirror<Vec<S::Entity>>, max_age: Duration) -> Self {
        self.cache = Some(ListCache { mirror, max_age });
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn kind(&self) -> EntityKind {
        <S::Entity as Entity>::KIND
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> EntityState<S::Entity, R> {
        self.state.read().await.clone()
    }

    pub async fn items(&self) -> Vec<S::Entity> {
        self.state.read().await.items.clone()
    }

    pub async fn current(&self) -> Option<S::Entity> {
        self.state.read().await.current.clone()
    }

    pub async fn related(&self) -> R {
        self.state.read().await.related.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn clear_error(&self) {
        self.state.write().await.set_error(None);
    }

    pub async fn clear_current(&self) {
        self.state.write().await.set_current(None);
    }

    pub(crate) async fn update_state<T>(
        &self,
        apply: impl FnOnce(&mut EntityState<S::Entity, R>) -> T,
    ) -> T {
        apply(&mut *self.state.write().await)
    }

    /// Runs `call` inside the loading/error lifecycle, applying `apply` to the
    /// store on success.
    pub(crate) async fn track<T, E, Fut>(
        &self,
        action: &'static str,
        call: Fut,
        apply: impl FnOnce(&mut EntityState<S::Entity, R>, &T),
    ) -> ClientResult<T>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Into<ClientError>,
    {
        {
            let mut state = self.state.write().await;
            state.set_loading(true);
            state.set_error(None);
        }
        let kind = self.kind();
        debug!(%kind, action, "orchestration: action started");
        let _ = self.events.send(StateEvent::Started { kind, action });

        match call.await.map_err(Into::into) {
            Ok(value) => {
                {
                    let mut state = self.state.write().await;
                    apply(&mut state, &value);
                    state.set_loading(false);
                }
                debug!(%kind, action, "orchestration: action succeeded");
                let _ = self.events.send(StateEvent::Succeeded { kind, action });
                Ok(value)
            }
            Err(err) => {
                self.record_failure(action, &err).await;
                Err(err)
            }
        }
    }

    /// [`track`](Self::track) for actions that change server records: a
    /// success also drops the cache mirror.
    pub(crate) async fn mutate<T, E, Fut>(
        &self,
        action: &'static str,
        call: Fut,
        apply: impl FnOnce(&mut EntityState<S::Entity, R>, &T),
    ) -> ClientResult<T>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Into<ClientError>,
    {
        let value = self.track(action, call, apply).await?;
        self.invalidate_cache();
        Ok(value)
    }

    /// The held copy of a record, from the list or else from `current`.
    pub async fn held(&self, id: &EntityId<S>) -> Option<S::Entity> {
        let state = self.state.read().await;
        state
            .find(id)
            .or_else(|| state.current.as_ref().filter(|item| item.id() == id))
            .cloned()
    }

    /// Sends a patch-returning request and merges the reply into the matching
    /// record. Returns the merged record, or `None` when it is not held.
    pub(crate) async fn mutate_record<E, Fut>(
        &self,
        action: &'static str,
        id: &EntityId<S>,
        call: Fut,
    ) -> ClientResult<Option<S::Entity>>
    where
        Fut: Future<Output = Result<EntityPatch<S>, E>>,
        E: Into<ClientError>,
    {
        self.mutate(action, call, |state, patch| {
            state.patch_by_id(id, patch.clone());
        })
        .await?;
        Ok(self.held(id).await)
    }

    /// Fails an action before any request is made, recording the message the
    /// same way a failed request would.
    pub(crate) async fn reject<T>(&self, action: &'static str, err: ClientError) -> ClientResult<T> {
        self.record_failure(action, &err).await;
        Err(err)
    }

    async fn record_failure(&self, action: &'static str, err: &ClientError) {
        let message = err.message();
        {
            let mut state = self.state.write().await;
            state.set_error(Some(message.clone()));
            state.set_loading(false);
        }
        let kind = self.kind();
        warn!(%kind, action, "orchestration: action failed: {message}");
        let _ = self.events.send(StateEvent::Failed {
            kind,
            action,
            message,
        });
    }

    /// Lists records and replaces the held list with them.
    pub async fn fetch_all(&self, filters: &S::Filters) -> ClientResult<Vec<S::Entity>> {
        self.track("list", self.service.list(filters), |state, items| {
            state.replace_all(items.clone())
        })
        .await
    }

    /// Fetches one record into the `current` slot.
    pub async fn fetch_one(&self, id: &EntityId<S>) -> ClientResult<S::Entity> {
        self.track("get", self.service.get(id), |state, item| {
            state.set_current(Some(item.clone()))
        })
        .await
    }

    /// Unfiltered list served from the cache mirror while fresh; otherwise
    /// fetched and written back to the mirror.
    pub async fn fetch_all_cached(&self) -> ClientResult<Vec<S::Entity>> {
        let Some(cache) = &self.cache else {
            return self.fetch_all(&S::Filters::default()).await;
        };
        if let Some(items) = cache.mirror.read(cache.max_age) {
            debug!(kind = %self.kind(), count = items.len(), "orchestration: list served from cache");
            self.update_state(|state| {
                state.replace_all(items.clone());
                state.set_error(None);
            })
            .await;
            return Ok(items);
        }
        let items = self.fetch_all(&S::Filters::default()).await?;
        cache.mirror.write(&items);
        Ok(items)
    }

    pub fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.mirror.clear();
        }
    }
}

impl<S, R> Orchestrator<S, R>
where
    S: CrudService,
    R: Default + Clone + Send + Sync + 'static,
{
    /// Creates a record and appends the server's copy to the list.
    pub async fn create(&self, payload: &S::Create) -> ClientResult<S::Entity> {
        self.mutate("create", self.service.create(payload), |state, item| {
            state.append(item.clone())
        })
        .await
    }

    /// Runs form-level checks first; an invalid payload never reaches the
    /// service and leaves the store untouched.
    pub async fn create_checked(&self, payload: &S::Create) -> ClientResult<S::Entity>
    where
        S::Create: Validate,
    {
        payload.validate()?;
        self.create(payload).await
    }

    /// Sends `patch` and merges the fields the server echoed back into the
    /// matching record; fields missing from the reply keep their held values.
    /// Returns the merged record when it is held.
    pub async fn update(
        &self,
        id: &EntityId<S>,
        patch: &EntityPatch<S>,
    ) -> ClientResult<Option<S::Entity>> {
        self.mutate_record("update", id, self.service.update(id, patch))
            .await
    }

    /// Deletes a record and drops it from the list and `current`.
    pub async fn remove(&self, id: &EntityId<S>) -> ClientResult<()> {
        self.mutate("delete", self.service.delete(id), |state, _| {
            state.remove_by_id(id);
        })
        .await
    }
}
