use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::engine::{EngineError, TaskEngine};
use crate::models::{Task, TaskPriority, User};
use crate::preferences::Preferences;
use crate::store::EntityStore;
use crate::time;
use crate::utils::{deadline_for_date, format_timestamp, parse_date};

#[derive(Parser)]
#[command(name = "tasktrack")]
#[command(about = "Personal task tracking with filters, statistics and multiple users")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show tasks matching the active filters (default if no subcommand)
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a task for the current user
    Add {
        /// Task title
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD), due at 23:59 local time
        #[arg(long)]
        due: Option<String>,
        /// low, medium, high or urgent
        #[arg(long)]
        priority: Option<TaskPriority>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Change fields of an existing task
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "no_due")]
        due: Option<String>,
        /// Remove the deadline
        #[arg(long)]
        no_due: bool,
        #[arg(long)]
        priority: Option<TaskPriority>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Mark a task done, or open again if already done
    Toggle { id: i64 },
    /// Delete a task
    Delete { id: i64 },
    /// Show task statistics over all tasks
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List categories in use
    Categories,
    /// List incomplete tasks past their deadline
    Overdue,
    /// List incomplete tasks due today
    Today,
    /// Change the active filters
    Filter {
        /// Only show incomplete tasks
        #[arg(long, conflicts_with = "all")]
        pending: bool,
        /// Show completed tasks too
        #[arg(long)]
        all: bool,
        /// Only show this category (empty string for any)
        #[arg(long)]
        category: Option<String>,
        /// Only show tasks of this user
        #[arg(long, conflicts_with = "any_user")]
        user: Option<i64>,
        /// Show tasks of every user
        #[arg(long)]
        any_user: bool,
        /// Reset every filter before applying the others
        #[arg(long)]
        clear: bool,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// List users; the current one is marked
    List,
    /// Create a user and switch to it
    Add { name: String },
    /// Switch the current user
    Switch { id: i64 },
    /// Delete a user together with its tasks
    Delete { id: i64 },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    EngineError(#[from] EngineError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("No task with ID {0}")]
    TaskNotFound(i64),
    #[error("No user with ID {0}")]
    UserNotFound(i64),
    #[error("Failed to serialize output: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Run one command against the engine
pub fn run<S: EntityStore>(command: Commands, engine: &mut TaskEngine<S>) -> Result<(), CliError> {
    match command {
        Commands::List { json } => handle_list(engine, json),
        Commands::Add {
            title,
            description,
            due,
            priority,
            category,
        } => handle_add_task(engine, title, description, due, priority, category),
        Commands::Edit {
            id,
            title,
            description,
            due,
            no_due,
            priority,
            category,
        } => handle_edit_task(engine, id, title, description, due, no_due, priority, category),
        Commands::Toggle { id } => handle_toggle_task(engine, id),
        Commands::Delete { id } => handle_delete_task(engine, id),
        Commands::Stats { json } => handle_stats(engine, json),
        Commands::Categories => {
            for category in engine.view().categories {
                println!("{}", category);
            }
            Ok(())
        }
        Commands::Overdue => {
            let view = engine.view();
            print_tasks(&view.overdue_tasks, &view.all_users, view.computed_at);
            Ok(())
        }
        Commands::Today => {
            let view = engine.view();
            print_tasks(&view.today_tasks, &view.all_users, view.computed_at);
            Ok(())
        }
        Commands::Filter {
            pending,
            all,
            category,
            user,
            any_user,
            clear,
        } => handle_filter(engine, pending, all, category, user, any_user, clear),
        Commands::User { action } => handle_user(engine, action),
    }
}

fn parse_deadline(due: &str) -> Result<i64, CliError> {
    let date = parse_date(due)
        .map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", due, e)))?;
    deadline_for_date(date)
        .ok_or_else(|| CliError::DateParseError(format!("No local time 23:59 on '{}'", due)))
}

fn find_task<S: EntityStore>(engine: &TaskEngine<S>, id: i64) -> Result<Task, CliError> {
    engine.view().task(id).cloned().ok_or(CliError::TaskNotFound(id))
}

/// Handle the list command
pub fn handle_list<S: EntityStore>(engine: &TaskEngine<S>, json: bool) -> Result<(), CliError> {
    let view = engine.view();
    if json {
        println!("{}", serde_json::to_string_pretty(&view.displayed_tasks)?);
        return Ok(());
    }

    println!("Filters: {}", filter_summary(&view.preferences, &view.all_users));
    print_tasks(&view.displayed_tasks, &view.all_users, view.computed_at);
    Ok(())
}

/// Handle the add command
pub fn handle_add_task<S: EntityStore>(
    engine: &mut TaskEngine<S>,
    title: String,
    description: Option<String>,
    due: Option<String>,
    priority: Option<TaskPriority>,
    category: Option<String>,
) -> Result<(), CliError> {
    let mut task = engine.new_task(title);
    if let Some(due) = due {
        task.deadline = Some(parse_deadline(&due)?);
    }
    task.description = description.unwrap_or_default();
    task.priority = priority.unwrap_or_default();
    task.category = category.unwrap_or_default();

    match engine.insert_task(&task)? {
        Some(id) => println!("Task created successfully (ID: {})", id),
        None => println!("Task already exists, nothing added"),
    }
    Ok(())
}

/// Handle the edit command
#[allow(clippy::too_many_arguments)]
pub fn handle_edit_task<S: EntityStore>(
    engine: &mut TaskEngine<S>,
    id: i64,
    title: Option<String>,
    description: Option<String>,
    due: Option<String>,
    no_due: bool,
    priority: Option<TaskPriority>,
    category: Option<String>,
) -> Result<(), CliError> {
    let mut task = find_task(engine, id)?;
    if let Some(title) = title {
        task.title = title;
    }
    if let Some(description) = description {
        task.description = description;
    }
    if let Some(due) = due {
        task.deadline = Some(parse_deadline(&due)?);
    }
    if no_due {
        task.deadline = None;
    }
    if let Some(priority) = priority {
        task.priority = priority;
    }
    if let Some(category) = category {
        task.category = category;
    }

    engine.update_task(&task)?;
    println!("Task {} updated", id);
    Ok(())
}

/// Handle the toggle command
pub fn handle_toggle_task<S: EntityStore>(engine: &mut TaskEngine<S>, id: i64) -> Result<(), CliError> {
    let task = find_task(engine, id)?;
    let updated = engine.toggle_task_completion(&task)?;
    if updated.is_completed {
        println!("Task {} completed", id);
    } else {
        println!("Task {} reopened", id);
    }
    Ok(())
}

/// Handle the delete command
pub fn handle_delete_task<S: EntityStore>(engine: &mut TaskEngine<S>, id: i64) -> Result<(), CliError> {
    let task = find_task(engine, id)?;
    engine.delete_task(&task)?;
    println!("Task {} deleted", id);
    Ok(())
}

/// Handle the stats command
pub fn handle_stats<S: EntityStore>(engine: &TaskEngine<S>, json: bool) -> Result<(), CliError> {
    let stats = engine.view().statistics;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Total:         {}", stats.total);
    println!("Completed:     {}", stats.completed);
    println!("Pending:       {}", stats.pending);
    println!("Overdue:       {}", stats.overdue);
    println!("Due today:     {}", stats.due_today);
    println!("High priority: {}", stats.high_priority);
    println!("Completion:    {:.0}%", stats.completion_rate * 100.0);
    Ok(())
}

/// Handle the filter command
pub fn handle_filter<S: EntityStore>(
    engine: &mut TaskEngine<S>,
    pending: bool,
    all: bool,
    category: Option<String>,
    user: Option<i64>,
    any_user: bool,
    clear: bool,
) -> Result<(), CliError> {
    if clear {
        engine.clear_filters()?;
    }

    let show_only_pending = engine.view().preferences.show_only_pending;
    if (pending && !show_only_pending) || (all && show_only_pending) {
        engine.toggle_show_only_pending()?;
    }
    if let Some(category) = category {
        engine.set_filter_category(&category)?;
    }
    if let Some(user) = user {
        engine.set_filter_user_id(crate::preferences::user_filter_from_sentinel(user))?;
    }
    if any_user {
        engine.set_filter_user_id(None)?;
    }

    let view = engine.view();
    println!("Filters: {}", filter_summary(&view.preferences, &view.all_users));
    Ok(())
}

/// Handle the user subcommands
pub fn handle_user<S: EntityStore>(engine: &mut TaskEngine<S>, action: UserCommands) -> Result<(), CliError> {
    match action {
        UserCommands::List => {
            let view = engine.view();
            let current = view.preferences.current_user_id;
            for user in &view.all_users {
                let marker = if user.id == current { "*" } else { " " };
                let owned = view.all_tasks.iter().filter(|t| t.user_id == user.id).count();
                println!("{} {:>3}  {}  ({} tasks)", marker, user.id, user.username, owned);
            }
        }
        UserCommands::Add { name } => {
            let user = engine.create_user(&name)?;
            println!("User '{}' created (ID: {}) and selected", user.username, user.id);
        }
        UserCommands::Switch { id } => {
            let user = engine.view().user(id).cloned().ok_or(CliError::UserNotFound(id))?;
            engine.switch_to_user(user.id)?;
            println!("Switched to '{}'", user.username);
        }
        UserCommands::Delete { id } => {
            let user = engine.view().user(id).cloned().ok_or(CliError::UserNotFound(id))?;
            let removed = engine.delete_user(&user)?;
            println!("User '{}' deleted with {} tasks", user.username, removed);
            if let Some(current) = engine.view().current_user {
                println!("Current user: '{}'", current.username);
            }
        }
    }
    Ok(())
}

fn print_tasks(tasks: &[Task], users: &[User], now: i64) {
    if tasks.is_empty() {
        println!("No tasks");
        return;
    }
    for task in tasks {
        println!("{}", format_task_line(task, users, now));
    }
}

/// One-line rendering of a task, e.g. `[ ] #3 URGENT Pay rent (due 2024-03-10 23:59, in 2 days) [Home] @alice`
pub fn format_task_line(task: &Task, users: &[User], now: i64) -> String {
    let mut line = format!(
        "[{}] #{} {} {}",
        if task.is_completed { "x" } else { " " },
        task.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
        task.priority,
        task.title
    );

    if let Some(deadline) = task.deadline {
        let when = if task.is_completed {
            String::new()
        } else if time::is_overdue(deadline, now) {
            ", overdue".to_string()
        } else {
            match time::calendar_days_until(deadline, now) {
                Some(days) if days <= 0 => ", today".to_string(),
                Some(1) => ", tomorrow".to_string(),
                Some(days) => format!(", in {} days", days),
                None => format!(", in {} days", time::days_until(deadline, now)),
            }
        };
        line.push_str(&format!(" (due {}{})", format_timestamp(deadline), when));
    }

    if !task.category.is_empty() {
        line.push_str(&format!(" [{}]", task.category));
    }

    if let Some(user) = users.iter().find(|u| u.id == task.user_id) {
        line.push_str(&format!(" @{}", user.username));
    }

    line
}

/// Get a human-readable summary of the active filters
pub fn filter_summary(prefs: &Preferences, users: &[User]) -> String {
    let mut parts = Vec::new();

    if prefs.show_only_pending {
        parts.push("pending only".to_string());
    }

    if !prefs.filter_category.is_empty() {
        parts.push(format!("category: {}", prefs.filter_category));
    }

    if let Some(user_id) = prefs.filter_user_id {
        match users.iter().find(|u| u.id == user_id) {
            Some(user) => parts.push(format!("user: {}", user.username)),
            None => parts.push(format!("user: #{}", user_id)),
        }
    }

    if parts.is_empty() {
        "No filters".to_string()
    } else {
        parts.join(", ")
    }
}
