use async_trait::async_trait;
use serde::Serialize;
use shared::{
    domain::{Attachment, Task, TaskId, TaskPatch, UserId},
    protocol::{AssignRequest, ExportFormat, ExportQuery, ImportSummary, NewTask, TaskFilters},
};

use super::{CrudService, ListService};
use crate::{
    error::RequestError,
    transport::{ApiClient, FormPart, Method},
};

#[derive(Serialize)]
struct SearchQuery<'a> {
    q: &'a str,
    #[serde(flatten)]
    filters: &'a TaskFilters,
}

#[derive(Clone)]
pub struct TaskService {
    api: ApiClient,
}

impl TaskService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Replaces the assignee set of a task.
    pub async fn assign(
        &self,
        id: &TaskId,
        user_ids: Vec<UserId>,
    ) -> Result<TaskPatch, RequestError> {
        self.api
            .send_json(
                Method::Post,
                &format!("{}/assign", self.item_path(id)),
                &AssignRequest { user_ids },
            )
            .await
    }

    pub async fn archive(&self, id: &TaskId) -> Result<TaskPatch, RequestError> {
        self.api
            .post_empty(&format!("{}/archive", self.item_path(id)))
            .await
    }

    pub async fn search(&self, q: &str, filters: &TaskFilters) -> Result<Vec<Task>, RequestError> {
        self.api
            .get_with("/tasks/search", &SearchQuery { q, filters })
            .await
    }

    pub async fn export(
        &self,
        format: ExportFormat,
        filters: &TaskFilters,
    ) -> Result<Vec<u8>, RequestError> {
        self.api
            .get_blob("/tasks/export", &ExportQuery { format, filters })
            .await
    }

    pub async fn import(&self, filename: &str, bytes: Vec<u8>) -> Result<ImportSummary, RequestError> {
        self.api
            .upload(
                "/tasks/import",
                vec![FormPart::file("file", filename, None, bytes)],
            )
            .await
    }

    pub async fn upload_attachment(
        &self,
        id: &TaskId,
        filename: &str,
        mime_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<Attachment, RequestError> {
        self.api
            .upload(
                &format!("{}/attachments", self.item_path(id)),
                vec![FormPart::file("file", filename, mime_type, bytes)],
            )
            .await
    }
}

#[async_trait]
impl ListService for TaskService {
    type Entity = Task;
    type Filters = TaskFilters;

    fn api(&self) -> &ApiClient {
        &self.api
    }
}

#[async_trait]
impl CrudService for TaskService {
    type Create = NewTask;
}
