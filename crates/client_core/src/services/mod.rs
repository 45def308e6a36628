//! Stateless façades translating entity operations into API calls.
//!
//! Services never swallow errors and never touch shared state; whatever the
//! executor raises reaches the caller unchanged.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use shared::domain::{Entity, Patchable};

use crate::{
    error::RequestError,
    transport::{ApiClient, Method},
};

mod activity;
mod chat;
mod events;
mod projects;
mod reports;
mod tasks;
mod users;

pub use activity::ActivityService;
pub use chat::{ChatSessionService, TemplateService};
pub use events::EventService;
pub use projects::ProjectService;
pub use reports::ReportService;
pub use tasks::TaskService;
pub use users::UserService;

pub type EntityId<S> = <<S as ListService>::Entity as Entity>::Id;
pub type EntityPatch<S> = <<S as ListService>::Entity as Patchable>::Patch;

/// Read side of a REST resource rooted at the entity kind's path.
#[async_trait]
pub trait ListService: Send + Sync + 'static {
    type Entity: Patchable + Serialize + DeserializeOwned;
    type Filters: Serialize + Default + Send + Sync;

    fn api(&self) -> &ApiClient;

    fn collection_path(&self) -> String {
        <Self::Entity as Entity>::KIND.path().to_string()
    }

    fn item_path(&self, id: &EntityId<Self>) -> String {
        format!("{}/{id}", self.collection_path())
    }

    async fn list(&self, filters: &Self::Filters) -> Result<Vec<Self::Entity>, RequestError> {
        self.api().get_with(&self.collection_path(), filters).await
    }

    async fn get(&self, id: &EntityId<Self>) -> Result<Self::Entity, RequestError> {
        self.api().get(&self.item_path(id)).await
    }
}

/// Write side of a REST resource.
#[async_trait]
pub trait CrudService: ListService {
    type Create: Serialize + Send + Sync;

    async fn create(&self, payload: &Self::Create) -> Result<Self::Entity, RequestError> {
        self.api()
            .send_json(Method::Post, &self.collection_path(), payload)
            .await
    }

    /// Returns the server's copy as a patch: fields it left out stay `None`.
    async fn update(
        &self,
        id: &EntityId<Self>,
        patch: &EntityPatch<Self>,
    ) -> Result<EntityPatch<Self>, RequestError> {
        self.api()
            .send_json(Method::Patch, &self.item_path(id), patch)
            .await
    }

    async fn delete(&self, id: &EntityId<Self>) -> Result<(), RequestError> {
        self.api().delete(&self.item_path(id)).await
    }
}
