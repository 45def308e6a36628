use async_trait::async_trait;
use shared::{
    domain::{ActivityLog, UserId},
    protocol::ActivityFilters,
};

use super::ListService;
use crate::{error::RequestError, transport::ApiClient};

/// Read-only activity feed.
#[derive(Clone)]
pub struct ActivityService {
    api: ApiClient,
}

impl ActivityService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn for_user(
        &self,
        user_id: &UserId,
        filters: &ActivityFilters,
    ) -> Result<Vec<ActivityLog>, RequestError> {
        self.api
            .get_with(&format!("/users/{user_id}/activity"), filters)
            .await
    }
}

#[async_trait]
impl ListService for ActivityService {
    type Entity = ActivityLog;
    type Filters = ActivityFilters;

    fn api(&self) -> &ApiClient {
        &self.api
    }
}
