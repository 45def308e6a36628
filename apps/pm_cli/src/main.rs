use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use client_core::{
    config::{load_settings, load_settings_from, ClientSettings},
    transport::CredentialProvider,
    AppContext,
};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{ChatSessionId, Task, TaskId, TaskPatch, UserId},
    protocol::{
        ActivityFilters, Credentials, ExportFormat, NewTask, ProjectFilters, ReportRequest,
        TaskFilters,
    },
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Command-line client for the project management API")]
struct Cli {
    /// Settings file; defaults to ./client.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in. The issued token is only printed with `--show-token`.
    Login {
        email: String,
        password: String,
        #[arg(long)]
        show_token: bool,
    },
    #[command(subcommand)]
    Tasks(TaskCommand),
    #[command(subcommand)]
    Projects(ProjectCommand),
    #[command(subcommand)]
    Events(EventCommand),
    #[command(subcommand)]
    Reports(ReportCommand),
    #[command(subcommand)]
    Chat(ChatCommand),
    /// Recent activity of a user; the signed-in user by default.
    Activity {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Args, Debug)]
struct TaskListArgs {
    /// Wire name, e.g. `in_progress`. Repeatable.
    #[arg(long)]
    status: Vec<String>,
    #[arg(long)]
    project: Option<String>,
    #[arg(long)]
    assignee: Option<String>,
    #[arg(long)]
    limit: Option<u32>,
}

impl TaskListArgs {
    fn filters(&self) -> Result<TaskFilters> {
        Ok(TaskFilters {
            status: self
                .status
                .iter()
                .map(|raw| parse_wire(raw))
                .collect::<Result<_>>()?,
            project_id: self.project.as_deref().map(Into::into),
            assignee: self.assignee.as_deref().map(Into::into),
            limit: self.limit,
            ..TaskFilters::default()
        })
    }
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    List(TaskListArgs),
    Create {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        project: Option<String>,
        /// RFC 3339 timestamp.
        #[arg(long)]
        due: Option<DateTime<Utc>>,
    },
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
    },
    Delete { id: String },
    Assign {
        id: String,
        #[arg(required = true)]
        users: Vec<String>,
    },
    Search {
        query: String,
        #[command(flatten)]
        list: TaskListArgs,
    },
    Export {
        #[arg(long, default_value = "csv")]
        format: String,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        list: TaskListArgs,
    },
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum EventCommand {
    /// Events overlapping a window; the coming week by default.
    List {
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    Generate {
        title: String,
        #[arg(long = "type", default_value = "task_summary")]
        report_type: String,
    },
}

#[derive(Subcommand, Debug)]
enum ChatCommand {
    Send { session: String, message: String },
}

/// Parses a CLI value the way the API spells it on the wire.
fn parse_wire<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .with_context(|| format!("unrecognised value '{raw}'"))
}

fn wire<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(text)) => text,
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    }
}

fn print_task(task: &Task) {
    println!(
        "{}  [{}] ({}) {}",
        task.id,
        wire(&task.status),
        wire(&task.priority),
        task.title
    );
}

/// Prints the merged task, or just its id when the reply could not be merged.
fn print_updated(id: &TaskId, task: Option<Task>) {
    match task {
        Some(task) => print_task(&task),
        None => println!("updated {id}"),
    }
}

fn settings_for(cli: &Cli) -> Result<ClientSettings> {
    let mut settings = match &cli.config {
        Some(path) => {
            let mut settings = load_settings_from(path)?;
            settings.apply_env(|key| std::env::var(key).ok());
            settings
        }
        None => load_settings()?,
    };
    if let Some(api_url) = &cli.api_url {
        settings.api_url = api_url.clone();
    }
    if let Some(token) = &cli.token {
        settings.api_token = Some(token.clone());
    }
    Ok(settings)
}

async fn run_tasks(context: &AppContext, command: TaskCommand) -> Result<()> {
    let tasks = &context.tasks;
    match command {
        TaskCommand::List(list) => {
            for task in tasks.fetch_all(&list.filters()?).await? {
                print_task(&task);
            }
        }
        TaskCommand::Create {
            title,
            description,
            priority,
            project,
            due,
        } => {
            let payload = NewTask {
                description,
                priority: priority.as_deref().map(parse_wire).transpose()?,
                project_id: project.map(Into::into),
                due_date: due,
                ..NewTask::titled(title)
            };
            print_task(&tasks.create_checked(&payload).await?);
        }
        TaskCommand::Update {
            id,
            title,
            status,
            priority,
        } => {
            let patch = TaskPatch {
                title,
                status: status.as_deref().map(parse_wire).transpose()?,
                priority: priority.as_deref().map(parse_wire).transpose()?,
                ..TaskPatch::default()
            };
            let id = TaskId::from(id);
            tasks.fetch_one(&id).await?;
            print_updated(&id, tasks.update(&id, &patch).await?);
        }
        TaskCommand::Delete { id } => {
            tasks.remove(&TaskId::from(id.as_str())).await?;
            println!("deleted {id}");
        }
        TaskCommand::Assign { id, users } => {
            let user_ids = users.into_iter().map(UserId::from).collect();
            let id = TaskId::from(id);
            tasks.fetch_one(&id).await?;
            print_updated(&id, tasks.assign(&id, user_ids).await?);
        }
        TaskCommand::Search { query, list } => {
            for task in tasks.search(&query, &list.filters()?).await? {
                print_task(&task);
            }
        }
        TaskCommand::Export { format, out, list } => {
            let format: ExportFormat = parse_wire(&format)?;
            let bytes = tasks.export(format, &list.filters()?).await?;
            std::fs::write(&out, &bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(path = %out.display(), bytes = bytes.len(), "tasks exported");
        }
    }
    Ok(())
}

fn session_token(context: &AppContext, show_token: bool) -> Option<String> {
    show_token
        .then(|| context.users.service().session().bearer_token())
        .flatten()
}

async fn run(context: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Login {
            email,
            password,
            show_token,
        } => {
            let user = context.users.login(&Credentials { email, password }).await?;
            println!("signed in as {} <{}>", user.name, user.email);
            if let Some(token) = session_token(context, show_token) {
                println!("PM_API_TOKEN={token}");
            }
        }
        Command::Tasks(command) => run_tasks(context, command).await?,
        Command::Projects(ProjectCommand::List { search }) => {
            let filters = ProjectFilters {
                search,
                ..ProjectFilters::default()
            };
            for project in context.projects.fetch_all(&filters).await? {
                println!(
                    "{}  [{}] {}% {}",
                    project.id,
                    wire(&project.status),
                    project.progress,
                    project.name
                );
            }
        }
        Command::Events(EventCommand::List { from, to }) => {
            let from = from.unwrap_or_else(Utc::now);
            let to = to.unwrap_or(from + Duration::days(7));
            for event in context.calendar.load_range(from, to).await? {
                println!(
                    "{}  {} .. {}  {}",
                    event.id,
                    event.start_time.format("%Y-%m-%d %H:%M"),
                    event.end_time.format("%H:%M"),
                    event.title
                );
            }
        }
        Command::Reports(ReportCommand::Generate { title, report_type }) => {
            let request = ReportRequest {
                title,
                report_type: parse_wire(&report_type)?,
                parameters: Default::default(),
            };
            let report = context.reports.generate(&request).await?;
            println!("{}  [{}] {}", report.id, wire(&report.status), report.title);
        }
        Command::Chat(ChatCommand::Send { session, message }) => {
            context
                .chat
                .select_session(&ChatSessionId::from(session))
                .await?;
            let response = context.chat.send_message(&message).await?;
            match response.reply {
                Some(reply) => println!("{}", reply.content),
                None => println!("sent {}", response.message.id),
            }
        }
        Command::Activity { user, limit } => {
            let user_id = match user {
                Some(user) => Some(UserId::from(user)),
                None => context.users.load_me().await.ok().map(|me| me.id),
            };
            let filters = ActivityFilters {
                limit,
                ..ActivityFilters::default()
            };
            for entry in context
                .activity
                .load_for_user(user_id.as_ref(), &filters)
                .await?
            {
                println!(
                    "{}  {} {} {}",
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    wire(&entry.action),
                    entry.entity_type,
                    entry.entity_id
                );
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();
    let settings = settings_for(&cli)?;
    let context = AppContext::connect(&settings)?;
    run(&context, cli.command).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use client_core::transport::SessionCredentials;

    use super::*;

    #[test]
    fn login_keeps_the_token_hidden_by_default() {
        let cli = Cli::try_parse_from(["pm", "login", "ada@example.com", "secret"]).expect("parse");
        assert!(matches!(cli.command, Command::Login { show_token: false, .. }));

        let cli = Cli::try_parse_from(["pm", "login", "ada@example.com", "secret", "--show-token"])
            .expect("parse");
        assert!(matches!(cli.command, Command::Login { show_token: true, .. }));
    }

    #[test]
    fn session_token_needs_the_flag() {
        let settings = ClientSettings {
            cache_dir: Some(std::env::temp_dir().join("pm_cli_token_test")),
            ..ClientSettings::default()
        };
        let context = AppContext::connect(&settings).expect("connect");
        let session: &Arc<SessionCredentials> = context.users.service().session();
        session.set("tok-1");

        assert_eq!(session_token(&context, false), None);
        assert_eq!(session_token(&context, true).as_deref(), Some("tok-1"));
    }
}
