use shared::{
    domain::{Attachment, Task, TaskId, TaskPatch, UserId},
    protocol::{ExportFormat, ImportSummary, TaskFilters},
};

use super::Orchestrator;
use crate::{error::ClientResult, services::TaskService};

pub type TaskDesk = Orchestrator<TaskService>;

impl Orchestrator<TaskService> {
    /// Returns the merged task when it is held.
    pub async fn assign(&self, id: &TaskId, user_ids: Vec<UserId>) -> ClientResult<Option<Task>> {
        self.mutate_record("assign", id, self.service().assign(id, user_ids))
            .await
    }

    /// Archived tasks stay in the list with `archived` set until the next fetch.
    pub async fn archive(&self, id: &TaskId) -> ClientResult<Option<Task>> {
        self.mutate_record("archive", id, self.service().archive(id))
            .await
    }

    pub async fn search(&self, query: &str, filters: &TaskFilters) -> ClientResult<Vec<Task>> {
        self.track("search", self.service().search(query, filters), |state, tasks| {
            state.replace_all(tasks.clone())
        })
        .await
    }

    pub async fn export(&self, format: ExportFormat, filters: &TaskFilters) -> ClientResult<Vec<u8>> {
        self.track("export", self.service().export(format, filters), |_, _| {})
            .await
    }

    /// Imported rows are not merged locally; refetch to see them.
    pub async fn import(&self, filename: &str, bytes: Vec<u8>) -> ClientResult<ImportSummary> {
        self.mutate("import", self.service().import(filename, bytes), |_, _| {})
            .await
    }

    pub async fn upload_attachment(
        &self,
        id: &TaskId,
        filename: &str,
        mime_type: Option<String>,
        bytes: Vec<u8>,
    ) -> ClientResult<Attachment> {
        let call = self
            .service()
            .upload_attachment(id, filename, mime_type, bytes);
        self.mutate("upload_attachment", call, |state, attachment| {
            let held = state
                .find(id)
                .or_else(|| state.current.as_ref().filter(|task| &task.id == id));
            let Some(task) = held else {
                return;
            };
            let mut attachments = task.attachments.clone();
            attachments.push(attachment.clone());
            state.patch_by_id(
                id,
                TaskPatch {
                    attachments: Some(attachments),
                    ..TaskPatch::default()
                },
            );
        })
        .await
    }
}
