use std::{fmt, hash::Hash};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(ProjectId);
id_newtype!(TaskId);
id_newtype!(EventId);
id_newtype!(ChatSessionId);
id_newtype!(MessageId);
id_newtype!(TemplateId);
id_newtype!(ReportId);
id_newtype!(ActivityId);
id_newtype!(AttachmentId);
id_newtype!(CommentId);

/// The server-owned record kinds this client keeps in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Project,
    Task,
    Event,
    ChatSession,
    ChatMessage,
    ChatTemplate,
    Report,
    Activity,
}

impl EntityKind {
    /// Collection path of the kind's REST resource.
    pub const fn path(self) -> &'static str {
        match self {
            Self::User => "/users",
            Self::Project => "/projects",
            Self::Task => "/tasks",
            Self::Event => "/events",
            Self::ChatSession => "/chat/sessions",
            Self::ChatMessage => "/chat/messages",
            Self::ChatTemplate => "/chat/templates",
            Self::Report => "/reports",
            Self::Activity => "/activity",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Task => "task",
            Self::Event => "event",
            Self::ChatSession => "chat_session",
            Self::ChatMessage => "chat_message",
            Self::ChatTemplate => "chat_template",
            Self::Report => "report",
            Self::Activity => "activity",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A server-owned record with one stable identifier.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static;

    const KIND: EntityKind;

    fn id(&self) -> &Self::Id;
}

/// A record that accepts shallow partial updates.
///
/// Fields present in the patch overwrite the record's fields; absent fields are
/// kept. `updated_at` only ever moves forward. A patch decodes from a partial
/// server record: missing keys stay `None`, and an explicit `null` on an
/// optional field decodes as `Some(None)` so it clears the field.
pub trait Patchable: Entity {
    type Patch: Clone + Default + Send + Sync + Serialize + DeserializeOwned + 'static;

    fn merge(&mut self, patch: Self::Patch);
}

/// Marks a key that was present, so `null` reaches the inner type.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

macro_rules! patchable {
    ($entity:ident, $id:ident, $kind:expr, $patch:ident { $($field:ident: $ty:ty),* $(,)? }) => {
        impl Entity for $entity {
            type Id = $id;

            const KIND: EntityKind = $kind;

            fn id(&self) -> &$id {
                &self.id
            }
        }

        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $patch {
            $(
                #[serde(
                    default,
                    deserialize_with = "present",
                    skip_serializing_if = "Option::is_none"
                )]
                pub $field: Option<$ty>,
            )*
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub updated_at: Option<DateTime<Utc>>,
        }

        impl Patchable for $entity {
            type Patch = $patch;

            fn merge(&mut self, patch: $patch) {
                $(
                    if let Some(value) = patch.$field {
                        self.$field = value;
                    }
                )*
                if let Some(updated_at) = patch.updated_at {
                    if updated_at > self.updated_at {
                        self.updated_at = updated_at;
                    }
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    #[default]
    Member,
    Viewer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    Active,
    OnHold,
    Completed,
    Archived,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Manager,
    #[default]
    Contributor,
    Viewer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    #[default]
    Meeting,
    Deadline,
    Reminder,
    Milestone,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    #[default]
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    #[default]
    TaskSummary,
    ProjectProgress,
    TeamPerformance,
    TimeTracking,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Pending,
    Generating,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
    Assigned,
    Commented,
    Archived,
    LoggedIn,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

patchable!(User, UserId, EntityKind::User, UserPatch {
    email: String,
    name: String,
    role: UserRole,
    department: Option<String>,
    avatar_url: Option<String>,
    is_active: bool,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<UserId>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub user_id: UserId,
    #[serde(default)]
    pub role: MemberRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub author_id: UserId,
    pub body: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub owner_id: UserId,
    #[serde(default)]
    pub member_ids: Vec<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

patchable!(Project, ProjectId, EntityKind::Project, ProjectPatch {
    name: String,
    description: Option<String>,
    status: ProjectStatus,
    priority: Priority,
    owner_id: UserId,
    member_ids: Vec<UserId>,
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    progress: u8,
    tags: Vec<String>,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub creator_id: UserId,
    #[serde(default)]
    pub assignees: Vec<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

patchable!(Task, TaskId, EntityKind::Task, TaskPatch {
    title: String,
    description: Option<String>,
    status: TaskStatus,
    priority: Priority,
    project_id: Option<ProjectId>,
    assignees: Vec<UserId>,
    due_date: Option<DateTime<Utc>>,
    tags: Vec<String>,
    attachments: Vec<Attachment>,
    archived: bool,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub event_type: EventType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_session_id: Option<ChatSessionId>,
    #[serde(default)]
    pub creator_id: UserId,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

patchable!(CalendarEvent, EventId, EntityKind::Event, EventPatch {
    title: String,
    description: Option<String>,
    event_type: EventType,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    all_day: bool,
    location: Option<String>,
    attendees: Vec<UserId>,
    project_id: Option<ProjectId>,
    task_id: Option<TaskId>,
    chat_session_id: Option<ChatSessionId>,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: ChatSessionId,
    pub title: String,
    #[serde(default)]
    pub owner_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<TemplateId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

patchable!(ChatSession, ChatSessionId, EntityKind::ChatSession, ChatSessionPatch {
    title: String,
    template_id: Option<TemplateId>,
    event_id: Option<EventId>,
    message_count: u32,
    last_message_at: Option<DateTime<Utc>>,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub session_id: ChatSessionId,
    #[serde(default)]
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<UserId>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

patchable!(ChatMessage, MessageId, EntityKind::ChatMessage, ChatMessagePatch {
    content: String,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTemplate {
    pub id: TemplateId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub creator_id: UserId,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

patchable!(ChatTemplate, TemplateId, EntityKind::ChatTemplate, ChatTemplatePatch {
    name: String,
    description: Option<String>,
    prompt: String,
    category: Option<String>,
    is_public: bool,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_ids: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub title: String,
    #[serde(default)]
    pub report_type: ReportType,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default)]
    pub parameters: ReportParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub creator_id: UserId,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

patchable!(Report, ReportId, EntityKind::Report, ReportPatch {
    title: String,
    report_type: ReportType,
    status: ReportStatus,
    parameters: ReportParameters,
    summary: Option<String>,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: ActivityId,
    pub user_id: UserId,
    #[serde(default)]
    pub action: ActivityAction,
    pub entity_type: EntityKind,
    pub entity_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

patchable!(ActivityLog, ActivityId, EntityKind::Activity, ActivityLogPatch {
    description: String,
});

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn task() -> Task {
        serde_json::from_value(serde_json::json!({
            "id": "t1",
            "title": "T1",
            "tags": ["a"],
            "updated_at": "2024-03-01T10:00:00Z"
        }))
        .expect("task")
    }

    #[test]
    fn minimal_task_record_decodes_with_defaults() {
        let task = task();
        assert_eq!(task.id, TaskId::from("t1"));
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, Priority::Medium);
        assert!(task.assignees.is_empty());
        assert!(!task.archived);
    }

    #[test]
    fn merge_overwrites_present_fields_only() {
        let mut task = task();
        task.merge(TaskPatch {
            status: Some(TaskStatus::Done),
            ..TaskPatch::default()
        });
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.title, "T1");
        assert_eq!(task.tags, vec!["a".to_string()]);
    }

    #[test]
    fn merge_never_moves_updated_at_backwards() {
        let mut task = task();
        let original = task.updated_at;
        task.merge(TaskPatch {
            title: Some("renamed".into()),
            updated_at: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            ..TaskPatch::default()
        });
        assert_eq!(task.title, "renamed");
        assert_eq!(task.updated_at, original);

        let later = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        task.merge(TaskPatch {
            updated_at: Some(later),
            ..TaskPatch::default()
        });
        assert_eq!(task.updated_at, later);
    }

    #[test]
    fn patch_can_clear_optional_fields() {
        let mut task = task();
        task.description = Some("old".into());
        task.merge(TaskPatch {
            description: Some(None),
            ..TaskPatch::default()
        });
        assert_eq!(task.description, None);
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = TaskPatch {
            status: Some(TaskStatus::InProgress),
            ..TaskPatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).expect("json"),
            serde_json::json!({ "status": "in_progress" })
        );
    }

    #[test]
    fn partial_record_decodes_as_sparse_patch() {
        let patch: TaskPatch = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "title": "T1",
            "status": "done",
            "description": null
        }))
        .expect("patch");
        assert_eq!(patch.title.as_deref(), Some("T1"));
        assert_eq!(patch.status, Some(TaskStatus::Done));
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.tags, None);
        assert_eq!(patch.assignees, None);

        let mut task = task();
        task.merge(patch);
        assert_eq!(task.tags, vec!["a".to_string()]);
        assert_eq!(task.status, TaskStatus::Done);
    }

    #[test]
    fn unknown_activity_action_falls_back() {
        let log: ActivityLog = serde_json::from_value(serde_json::json!({
            "id": "a1",
            "user_id": "u1",
            "action": "teleported",
            "entity_type": "task",
            "entity_id": "t1"
        }))
        .expect("activity");
        assert_eq!(log.action, ActivityAction::Unknown);
        assert_eq!(log.entity_type, EntityKind::Task);
    }
}
