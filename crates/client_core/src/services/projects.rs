use async_trait::async_trait;
use shared::{
    domain::{
        Attachment, Comment, MemberRole, Project, ProjectId, ProjectMember, ProjectPatch, UserId,
    },
    protocol::{AddMemberRequest, ExportFormat, NewComment, NewProject, ProjectFilters},
};

use super::{CrudService, ListService};
use crate::{
    error::RequestError,
    transport::{ApiClient, FormPart, Method},
};

#[derive(Clone)]
pub struct ProjectService {
    api: ApiClient,
}

#[derive(serde::Serialize)]
struct FormatQuery {
    format: ExportFormat,
}

impl ProjectService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn sub_path(&self, id: &ProjectId, tail: &str) -> String {
        format!("{}/{tail}", self.item_path(id))
    }

    pub async fn archive(&self, id: &ProjectId) -> Result<ProjectPatch, RequestError> {
        self.api.post_empty(&self.sub_path(id, "archive")).await
    }

    pub async fn members(&self, id: &ProjectId) -> Result<Vec<ProjectMember>, RequestError> {
        self.api.get(&self.sub_path(id, "members")).await
    }

    pub async fn add_member(
        &self,
        id: &ProjectId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<ProjectMember, RequestError> {
        self.api
            .send_json(
                Method::Post,
                &self.sub_path(id, "members"),
                &AddMemberRequest { user_id, role },
            )
            .await
    }

    pub async fn remove_member(&self, id: &ProjectId, user_id: &UserId) -> Result<(), RequestError> {
        self.api
            .delete(&self.sub_path(id, &format!("members/{user_id}")))
            .await
    }

    pub async fn comments(&self, id: &ProjectId) -> Result<Vec<Comment>, RequestError> {
        self.api.get(&self.sub_path(id, "comments")).await
    }

    pub async fn add_comment(&self, id: &ProjectId, body: &str) -> Result<Comment, RequestError> {
        self.api
            .send_json(
                Method::Post,
                &self.sub_path(id, "comments"),
                &NewComment {
                    body: body.to_string(),
                },
            )
            .await
    }

    pub async fn attachments(&self, id: &ProjectId) -> Result<Vec<Attachment>, RequestError> {
        self.api.get(&self.sub_path(id, "attachments")).await
    }

    pub async fn upload_attachment(
        &self,
        id: &ProjectId,
        filename: &str,
        mime_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<Attachment, RequestError> {
        self.api
            .upload(
                &self.sub_path(id, "attachments"),
                vec![FormPart::file("file", filename, mime_type, bytes)],
            )
            .await
    }

    pub async fn export(&self, id: &ProjectId, format: ExportFormat) -> Result<Vec<u8>, RequestError> {
        self.api
            .get_blob(&self.sub_path(id, "export"), &FormatQuery { format })
            .await
    }
}

#[async_trait]
impl ListService for ProjectService {
    type Entity = Project;
    type Filters = ProjectFilters;

    fn api(&self) -> &ApiClient {
        &self.api
    }
}

#[async_trait]
impl CrudService for ProjectService {
    type Create = NewProject;
}
