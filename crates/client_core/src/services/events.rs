use async_trait::async_trait;
use shared::{
    domain::CalendarEvent,
    protocol::{EventFilters, NewEvent},
};

use super::{CrudService, ListService};
use crate::transport::ApiClient;

#[derive(Clone)]
pub struct EventService {
    api: ApiClient,
}

impl EventService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ListService for EventService {
    type Entity = CalendarEvent;
    type Filters = EventFilters;

    fn api(&self) -> &ApiClient {
        &self.api
    }
}

#[async_trait]
impl CrudService for EventService {
    type Create = NewEvent;
}
