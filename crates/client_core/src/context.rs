//! One orchestrator per entity kind, shared by everything that renders or
//! mutates client state.

use std::sync::Arc;

use shared::{
    domain::{EntityKind, User},
    protocol::{ProjectFilters, TaskFilters},
};
use tracing::info;

use crate::{
    cache::{CacheMirror, CacheStorage, FileCacheStorage},
    config::ClientSettings,
    error::{ClientResult, ContextError},
    orchestration::{
        ActivityFeed, CalendarDesk, ChatDesk, DebouncedSearch, ProjectDesk, ReportDesk, TaskDesk,
        TemplateDesk, UserDesk,
    },
    services::{
        ActivityService, ChatSessionService, EventService, ProjectService, ReportService,
        TaskService, TemplateService, UserService,
    },
    transport::{ApiClient, CredentialProvider, HttpExecutor, RequestExecutor, SessionCredentials},
};

const USERS_CACHE_KEY: &str = "users";

#[derive(Clone)]
pub struct AppContext {
    pub users: Arc<UserDesk>,
    pub tasks: Arc<TaskDesk>,
    pub projects: Arc<ProjectDesk>,
    pub calendar: Arc<CalendarDesk>,
    pub chat: Arc<ChatDesk>,
    pub templates: Arc<TemplateDesk>,
    pub reports: Arc<ReportDesk>,
    pub activity: Arc<ActivityFeed>,
}

impl AppContext {
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::default()
    }

    /// Wires every kind over one HTTP executor whose bearer token follows the
    /// user session. The user list is mirrored to the local cache.
    pub fn connect(settings: &ClientSettings) -> anyhow::Result<Self> {
        let session = Arc::new(SessionCredentials::new(settings.api_token.clone()));
        let credentials: Arc<dyn CredentialProvider> = session.clone();
        let executor: Arc<dyn RequestExecutor> = Arc::new(HttpExecutor::with_timeout(
            settings.api_url.clone(),
            credentials,
            settings.request_timeout(),
        )?);
        let api = ApiClient::new(executor);

        let cache_dir = settings
            .cache_dir
            .clone()
            .unwrap_or_else(FileCacheStorage::default_dir);
        let storage: Arc<dyn CacheStorage> = Arc::new(FileCacheStorage::new(cache_dir));
        let users = UserDesk::new(UserService::new(api.clone(), session)).with_cache(
            CacheMirror::<Vec<User>>::new(USERS_CACHE_KEY, storage),
            settings.cache_max_age(),
        );

        info!(api_url = %settings.api_url, "context: connected");
        let context = Self::builder()
            .users(users)
            .tasks(TaskDesk::new(TaskService::new(api.clone())))
            .projects(ProjectDesk::new(ProjectService::new(api.clone())))
            .calendar(CalendarDesk::new(EventService::new(api.clone())))
            .chat(ChatDesk::new(ChatSessionService::new(api.clone())))
            .templates(TemplateDesk::new(TemplateService::new(api.clone())))
            .reports(ReportDesk::new(ReportService::new(api.clone())))
            .activity(ActivityFeed::new(ActivityService::new(api)))
            .build()?;
        Ok(context)
    }

    /// Task search bound to this context's task list.
    pub fn task_search(&self, settings: &ClientSettings, filters: TaskFilters) -> DebouncedSearch {
        DebouncedSearch::for_tasks(self.tasks.clone(), settings.search_debounce(), filters)
    }

    /// Loads the lists a dashboard shows at once. The first failure is
    /// returned; the other loads still finish and keep their results.
    pub async fn refresh_dashboard(&self) -> ClientResult<()> {
        let task_filters = TaskFilters::default();
        let project_filters = ProjectFilters::default();
        let (tasks, projects, users) = futures::join!(
            self.tasks.fetch_all(&task_filters),
            self.projects.fetch_all(&project_filters),
            self.users.fetch_all_cached(),
        );
        tasks?;
        projects?;
        users?;
        Ok(())
    }
}

/// Collects orchestrators and refuses to build while any kind is missing.
#[derive(Default)]
pub struct AppContextBuilder {
    users: Option<Arc<UserDesk>>,
    tasks: Option<Arc<TaskDesk>>,
    projects: Option<Arc<ProjectDesk>>,
    calendar: Option<Arc<CalendarDesk>>,
    chat: Option<Arc<ChatDesk>>,
    templates: Option<Arc<TemplateDesk>>,
    reports: Option<Arc<ReportDesk>>,
    activity: Option<Arc<ActivityFeed>>,
}

macro_rules! provide {
    ($($field:ident: $desk:ty),* $(,)?) => {
        impl AppContextBuilder {
            $(
                /// Providing a kind again replaces the earlier one.
                pub fn $field(mut self, desk: impl Into<Arc<$desk>>) -> Self {
                    self.$field = Some(desk.into());
                    self
                }
            )*
        }
    };
}

provide! {
    users: UserDesk,
    tasks: TaskDesk,
    projects: ProjectDesk,
    calendar: CalendarDesk,
    chat: ChatDesk,
    templates: TemplateDesk,
    reports: ReportDesk,
    activity: ActivityFeed,
}

fn require<T>(slot: Option<T>, kind: EntityKind) -> Result<T, ContextError> {
    slot.ok_or(ContextError::MissingProvider { kind })
}

impl AppContextBuilder {
    pub fn build(self) -> Result<AppContext, ContextError> {
        Ok(AppContext {
            users: require(self.users, EntityKind::User)?,
            tasks: require(self.tasks, EntityKind::Task)?,
            projects: require(self.projects, EntityKind::Project)?,
            calendar: require(self.calendar, EntityKind::Event)?,
            chat: require(self.chat, EntityKind::ChatSession)?,
            templates: require(self.templates, EntityKind::ChatTemplate)?,
            reports: require(self.reports, EntityKind::Report)?,
            activity: require(self.activity, EntityKind::Activity)?,
        })
    }
}
