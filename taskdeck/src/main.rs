//! `taskdeck`: manage your task list from the terminal.
//!
//! Connects to a Taskdeck server over WebSocket, runs one command and exits.
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskdeck/config.toml`).
//!
//! ```bash
//! export TASKDECK_TOKEN=alice-token
//! taskdeck add "Water plants" --priority high --due 2030-06-01
//! taskdeck list --completed false --sort priority
//! taskdeck list --page 2 --limit 5 --json
//! taskdeck toggle 0190c3d2-...
//! taskdeck stats
//! ```

use std::path::Path;
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;

use taskdeck::api::{ApiError, RemoteApi, TaskApi};
use taskdeck::config::{CliArgs, ClientConfig, ConfigError};
use taskdeck::display;
use taskdeck::sync::{SyncError, Synchronizer};
use taskdeck_proto::error::ValidationError;
use taskdeck_proto::query::{FilterSpec, ListParams, Pagination};
use taskdeck_proto::task::{
    DueDateChange, NewTask, Priority, Task, TaskId, TaskPatch, parse_due_date,
};

#[derive(Parser, Debug)]
#[command(version, about = "Personal task tracker client")]
struct Cli {
    #[command(flatten)]
    args: CliArgs,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List one page of tasks.
    List {
        /// `true`, `false` or `all`.
        #[arg(long)]
        completed: Option<String>,
        /// `high`, `medium`, `low` or `all`.
        #[arg(long)]
        priority: Option<String>,
        /// `createdAt`, `dueDate` or `priority`.
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        page: Option<i64>,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Show one task.
    Show { id: TaskId },
    /// Create a task.
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value_t = Priority::Medium)]
        priority: Priority,
        /// `YYYY-MM-DD`.
        #[arg(long, value_parser = parse_due_date)]
        due: Option<NaiveDate>,
    },
    /// Change fields of a task.
    Edit {
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(long)]
        completed: Option<bool>,
        #[arg(long, value_parser = parse_due_date, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        /// Remove the due date.
        #[arg(long)]
        clear_due: bool,
    },
    /// Flip a task between pending and completed.
    Toggle { id: TaskId },
    /// Delete a task.
    Rm { id: TaskId },
    /// Show counters over all of your tasks.
    Stats,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct PageOutput<'a> {
    tasks: &'a [Task],
    pagination: Pagination,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ClientConfig::load(&cli.args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = init_logging(&config.log_level, config.log_file.as_deref());
    tracing::debug!(url = %config.server_url, command = ?cli.command, "taskdeck starting");

    match run(cli.command, cli.json, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::warn!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Logs go to a file so command output on stdout stays clean. Returns a
/// [`WorkerGuard`] that must be held until exit to flush buffered entries.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskdeck.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run(command: Command, json: bool, config: &ClientConfig) -> Result<(), CliError> {
    let token = config.require_token()?;
    let api = RemoteApi::connect(&config.server_url, token, config.connect_options()).await?;
    tracing::info!(owner = %api.owner(), "connected");

    let filter = FilterSpec {
        limit: config.page_size,
        ..FilterSpec::default()
    };
    let sync = Synchronizer::new(api, filter);
    let today = Local::now().date_naive();

    match command {
        Command::List {
            completed,
            priority,
            sort,
            page,
            limit,
        } => {
            let params = ListParams {
                completed,
                priority,
                sort,
                page,
                limit: limit.or(Some(i64::from(config.page_size))),
            };
            sync.set_filter(FilterSpec::try_from(params)?).await?;
            let snapshot = sync.snapshot();
            if json {
                print_json(&PageOutput {
                    tasks: &snapshot.tasks,
                    pagination: snapshot.pagination,
                })?;
            } else {
                if snapshot.tasks.is_empty() {
                    println!("No tasks found.");
                }
                for task in &snapshot.tasks {
                    println!("{}", display::task_line(task, today));
                }
                println!("{}", display::pagination_line(&snapshot.pagination));
            }
        }
        Command::Show { id } => {
            let task = sync.api().get(&id).await?;
            print_task(&task, json, today)?;
        }
        Command::Add {
            title,
            description,
            priority,
            due,
        } => {
            let draft = NewTask {
                title,
                description,
                priority,
                due_date: due,
            };
            let task = sync.create(draft).await?;
            print_task(&task, json, today)?;
        }
        Command::Edit {
            id,
            title,
            description,
            priority,
            completed,
            due,
            clear_due,
        } => {
            let due_date = match (due, clear_due) {
                (Some(date), _) => DueDateChange::Set(date),
                (None, true) => DueDateChange::Clear,
                (None, false) => DueDateChange::Keep,
            };
            let patch = TaskPatch {
                title,
                description,
                completed,
                priority,
                due_date,
            };
            let task = sync.update(&id, patch).await?;
            print_task(&task, json, today)?;
        }
        Command::Toggle { id } => {
            let task = sync.toggle(&id).await?;
            print_task(&task, json, today)?;
        }
        Command::Rm { id } => {
            sync.delete(&id).await?;
            if json {
                print_json(&serde_json::json!({ "deleted": id }))?;
            } else {
                println!("Deleted {id}");
            }
        }
        Command::Stats => {
            let stats = sync.refresh_stats().await?;
            if json {
                print_json(&stats)?;
            } else {
                println!("{}", display::stats_block(&stats));
            }
        }
    }

    sync.api().close().await;
    Ok(())
}

fn print_task(task: &Task, json: bool, today: NaiveDate) -> Result<(), CliError> {
    if json {
        print_json(task)
    } else {
        println!("{}", display::task_detail(task, today));
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
