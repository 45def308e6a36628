use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    ActivityAction, ChatMessage, EntityKind, EventId, EventType, MemberRole, Priority, ProjectId,
    ProjectStatus, ReportParameters, ReportStatus, ReportType, TaskStatus, TemplateId, User,
    UserId, UserRole,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {}", summarize(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidationError {
    /// Sentence listing each failing field, for form-level display.
    pub fn summary(&self) -> String {
        summarize(&self.fields)
    }
}

fn summarize(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Form-level checks run before any request is issued.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

#[derive(Default)]
struct Checks(Vec<FieldError>);

impl Checks {
    fn required(&mut self, field: &'static str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.0.push(FieldError {
                field,
                message: "is required",
            });
        }
        self
    }

    fn check(&mut self, ok: bool, field: &'static str, message: &'static str) -> &mut Self {
        if !ok {
            self.0.push(FieldError { field, message });
        }
        self
    }

    fn finish(&mut self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                fields: std::mem::take(&mut self.0),
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Validate for Credentials {
    fn validate(&self) -> Result<(), ValidationError> {
        Checks::default()
            .required("email", &self.email)
            .required("password", &self.password)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing, default)]
    pub password_confirmation: String,
}

impl Validate for Registration {
    fn validate(&self) -> Result<(), ValidationError> {
        Checks::default()
            .required("name", &self.name)
            .required("email", &self.email)
            .check(self.email.contains('@'), "email", "must be an email address")
            .check(
                self.password.chars().count() >= 8,
                "password",
                "must be at least 8 characters",
            )
            .check(
                self.password == self.password_confirmation,
                "password_confirmation",
                "does not match password",
            )
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    #[serde(skip_serializing, default)]
    pub confirmation: String,
}

impl Validate for PasswordChange {
    fn validate(&self) -> Result<(), ValidationError> {
        Checks::default()
            .required("current_password", &self.current_password)
            .check(
                self.new_password.chars().count() >= 8,
                "new_password",
                "must be at least 8 characters",
            )
            .check(
                self.new_password == self.confirmation,
                "confirmation",
                "does not match password",
            )
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarUpload {
    pub avatar_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub password: String,
}

impl Validate for NewUser {
    fn validate(&self) -> Result<(), ValidationError> {
        Checks::default()
            .required("email", &self.email)
            .required("name", &self.name)
            .required("password", &self.password)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub member_ids: Vec<UserId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Validate for NewProject {
    fn validate(&self) -> Result<(), ValidationError> {
        let ordered = match (self.start_date, self.due_date) {
            (Some(start), Some(due)) => start <= due,
            _ => true,
        };
        Checks::default()
            .required("name", &self.name)
            .check(ordered, "due_date", "must not be before start_date")
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

impl Validate for NewTask {
    fn validate(&self) -> Result<(), ValidationError> {
        Checks::default().required("title", &self.title).finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub event_type: EventType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
}

impl Validate for NewEvent {
    fn validate(&self) -> Result<(), ValidationError> {
        Checks::default()
            .required("title", &self.title)
            .check(
                self.end_time >= self.start_time,
                "end_time",
                "must not be before start_time",
            )
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewChatSession {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<TemplateId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub is_public: bool,
}

impl Validate for NewTemplate {
    fn validate(&self) -> Result<(), ValidationError> {
        Checks::default()
            .required("name", &self.name)
            .required("prompt", &self.prompt)
            .finish()
    }
}

/// Body of a report generation request; also the create payload for reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportRequest {
    pub title: String,
    pub report_type: ReportType,
    #[serde(default)]
    pub parameters: ReportParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    pub user_ids: Vec<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: UserId,
    pub role: MemberRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// The server echoes the stored user message and, when one was produced, the
/// assistant reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub message: ChatMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ChatMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: u32,
    #[serde(default)]
    pub skipped: u32,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
    Pdf,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Sort instruction, sent JSON-encoded as the single `sort` parameter,
/// e.g. `sort={"field":"due_date","order":"asc"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

// Filter structs below are serialized straight into query strings: `None`
// fields and empty strings are dropped, vectors repeat their key, and nested
// structs become one JSON-encoded value. Field order is parameter order.

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserFilters {
    /// `search=`: substring match on name and email.
    pub search: Option<String>,
    /// `role=`: only users with this role.
    pub role: Option<UserRole>,
    /// `department=`: exact department name.
    pub department: Option<String>,
    /// `is_active=`: `true` or `false`; omitted returns both.
    pub is_active: Option<bool>,
    pub sort: Option<Sort>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectFilters {
    /// `status=` repeated once per accepted status.
    pub status: Vec<ProjectStatus>,
    /// `owner_id=`: projects owned by this user.
    pub owner_id: Option<UserId>,
    /// `member_id=`: projects this user belongs to.
    pub member_id: Option<UserId>,
    /// `search=`: substring match on name and description.
    pub search: Option<String>,
    /// `tags=` repeated; a project matches if it carries any of them.
    pub tags: Vec<String>,
    pub sort: Option<Sort>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskFilters {
    /// `status=` repeated once per accepted status.
    pub status: Vec<TaskStatus>,
    /// `priority=`: exact priority.
    pub priority: Option<Priority>,
    /// `project_id=`: tasks of one project.
    pub project_id: Option<ProjectId>,
    /// `assignee=`: tasks assigned to this user.
    pub assignee: Option<UserId>,
    /// `tags=` repeated; a task matches if it carries any of them.
    pub tags: Vec<String>,
    /// `search=`: substring match on title and description.
    pub search: Option<String>,
    /// `due_before=` / `due_after=`: RFC 3339 bounds on `due_date`.
    pub due_before: Option<DateTime<Utc>>,
    pub due_after: Option<DateTime<Utc>>,
    /// `include_archived=true` also returns archived tasks.
    pub include_archived: Option<bool>,
    pub sort: Option<Sort>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventFilters {
    /// `start=` / `end=`: events overlapping this window.
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// `event_type=` repeated once per accepted type.
    pub event_type: Vec<EventType>,
    /// `project_id=`: events linked to one project.
    pub project_id: Option<ProjectId>,
    /// `attendee=`: events this user attends.
    pub attendee: Option<UserId>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportFilters {
    /// `report_type=`: one report type.
    pub report_type: Option<ReportType>,
    /// `status=`: one generation status.
    pub status: Option<ReportStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivityFilters {
    /// `user_id=`: activity performed by this user.
    pub user_id: Option<UserId>,
    /// `entity_type=`: activity on one kind of record.
    pub entity_type: Option<EntityKind>,
    /// `action=` repeated once per accepted action.
    pub action: Vec<ActivityAction>,
    /// `since=`: only entries newer than this instant.
    pub since: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatFilters {
    /// `search=`: substring match on session title or template name.
    pub search: Option<String>,
    /// `event_id=`: sessions linked to one calendar event.
    pub event_id: Option<EventId>,
    /// `category=`: template category.
    pub category: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Query for the message history of one chat session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageWindow {
    /// `before=`: only messages older than this one.
    pub before: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportQuery<'a, F: Serialize> {
    pub format: ExportFormat,
    #[serde(flatten)]
    pub filters: &'a F,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_requires_matching_confirmation() {
        let form = Registration {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "correct horse".into(),
            password_confirmation: "correct hose".into(),
        };
        let err = form.validate().expect_err("mismatch");
        assert_eq!(err.fields.len(), 1);
        assert_eq!(err.fields[0].field, "password_confirmation");
    }

    #[test]
    fn registration_reports_every_missing_field() {
        let form = Registration {
            name: " ".into(),
            email: String::new(),
            password: "short".into(),
            password_confirmation: "short".into(),
        };
        let err = form.validate().expect_err("invalid");
        let fields: Vec<_> = err.fields.iter().map(|f| f.field).collect();
        assert_eq!(fields, vec!["name", "email", "email", "password"]);
        assert!(err.summary().starts_with("name: is required"));
    }

    #[test]
    fn confirmation_is_never_sent() {
        let form = Registration {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "correct horse".into(),
            password_confirmation: "correct horse".into(),
        };
        let body = serde_json::to_value(&form).expect("json");
        assert!(body.get("password_confirmation").is_none());
    }

    #[test]
    fn new_task_needs_title() {
        assert!(NewTask::titled("T1").validate().is_ok());
        assert!(NewTask::titled("   ").validate().is_err());
    }

    #[test]
    fn project_dates_must_be_ordered() {
        let project = NewProject {
            name: "Apollo".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 2),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..NewProject::default()
        };
        let err = project.validate().expect_err("unordered");
        assert_eq!(err.fields[0].field, "due_date");
    }
}
