use shared::{
    domain::{Attachment, Comment, MemberRole, Project, ProjectId, ProjectMember, UserId},
    protocol::ExportFormat,
};

use super::Orchestrator;
use crate::{error::ClientResult, services::ProjectService, store::EntityState};

/// Collections that belong to one focused project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectRelations {
    pub project_id: Option<ProjectId>,
    pub members: Vec<ProjectMember>,
    pub comments: Vec<Comment>,
    pub attachments: Vec<Attachment>,
}

impl ProjectRelations {
    fn focus(&mut self, id: &ProjectId) -> &mut Self {
        if self.project_id.as_ref() != Some(id) {
            *self = Self {
                project_id: Some(id.clone()),
                ..Self::default()
            };
        }
        self
    }
}

pub type ProjectDesk = Orchestrator<ProjectService, ProjectRelations>;

type ProjectState = EntityState<Project, ProjectRelations>;

fn relations<'a>(state: &'a mut ProjectState, id: &ProjectId) -> &'a mut ProjectRelations {
    state.related.focus(id)
}

impl Orchestrator<ProjectService, ProjectRelations> {
    /// Focuses a project and loads its members and comments. Stops at the
    /// first failure.
    pub async fn open(&self, id: &ProjectId) -> ClientResult<Project> {
        let project = self.fetch_one(id).await?;
        self.load_members(id).await?;
        self.load_comments(id).await?;
        Ok(project)
    }

    /// Returns the merged project when it is held.
    pub async fn archive(&self, id: &ProjectId) -> ClientResult<Option<Project>> {
        self.mutate_record("archive", id, self.service().archive(id))
            .await
    }

    pub async fn load_members(&self, id: &ProjectId) -> ClientResult<Vec<ProjectMember>> {
        self.track("members", self.service().members(id), |state, members| {
            relations(state, id).members = members.clone();
        })
        .await
    }

    pub async fn add_member(
        &self,
        id: &ProjectId,
        user_id: UserId,
        role: MemberRole,
    ) -> ClientResult<ProjectMember> {
        self.mutate(
            "add_member",
            self.service().add_member(id, user_id, role),
            |state, member| {
                let members = &mut relations(state, id).members;
                members.retain(|held| held.user_id != member.user_id);
                members.push(member.clone());
            },
        )
        .await
    }

    pub async fn remove_member(&self, id: &ProjectId, user_id: &UserId) -> ClientResult<()> {
        self.mutate(
            "remove_member",
            self.service().remove_member(id, user_id),
            |state, _| {
                relations(state, id)
                    .members
                    .retain(|held| &held.user_id != user_id);
            },
        )
        .await
    }

    pub async fn load_comments(&self, id: &ProjectId) -> ClientResult<Vec<Comment>> {
        self.track("comments", self.service().comments(id), |state, comments| {
            relations(state, id).comments = comments.clone();
        })
        .await
    }

    pub async fn add_comment(&self, id: &ProjectId, body: &str) -> ClientResult<Comment> {
        self.mutate("add_comment", self.service().add_comment(id, body), |state, comment| {
            relations(state, id).comments.push(comment.clone());
        })
        .await
    }

    pub async fn load_attachments(&self, id: &ProjectId) -> ClientResult<Vec<Attachment>> {
        self.track("attachments", self.service().attachments(id), |state, files| {
            relations(state, id).attachments = files.clone();
        })
        .await
    }

    pub async fn upload_attachment(
        &self,
        id: &ProjectId,
        filename: &str,
        mime_type: Option<String>,
        bytes: Vec<u8>,
    ) -> ClientResult<Attachment> {
        let call = self
            .service()
            .upload_attachment(id, filename, mime_type, bytes);
        self.mutate("upload_attachment", call, |state, file| {
            relations(state, id).attachments.push(file.clone());
        })
        .await
    }

    pub async fn export(&self, id: &ProjectId, format: ExportFormat) -> ClientResult<Vec<u8>> {
        self.track("export", self.service().export(id, format), |_, _| {})
            .await
    }
}
