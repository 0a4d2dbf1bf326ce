use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Id of the user created on first start
pub const DEFAULT_USER_ID: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
            TaskPriority::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown priority '{0}' (expected low, medium, high or urgent)")]
pub struct ParsePriorityError(String);

impl FromStr for TaskPriority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(TaskPriority::Low),
            "MEDIUM" => Ok(TaskPriority::Medium),
            "HIGH" => Ok(TaskPriority::High),
            "URGENT" => Ok(TaskPriority::Urgent),
            _ => Err(ParsePriorityError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Option<i64>, // assigned by the store on insert
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    pub deadline: Option<i64>, // millis since epoch
    pub priority: TaskPriority,
    pub category: String, // empty = uncategorized
    pub user_id: i64,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

impl Task {
    pub fn new(title: String, user_id: i64, created_at: i64) -> Self {
        Self {
            id: None,
            title,
            description: String::new(),
            is_completed: false,
            deadline: None,
            priority: TaskPriority::default(),
            category: String::new(),
            user_id,
            created_at,
            completed_at: None,
        }
    }

    /// Copy of this task with completion flipped; `completed_at` tracks the new state
    pub fn toggled_completion(&self, now: i64) -> Task {
        let is_completed = !self.is_completed;
        Task {
            is_completed,
            completed_at: if is_completed { Some(now) } else { None },
            ..self.clone()
        }
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority >= TaskPriority::High
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

impl User {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

/// A user together with every task it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserWithTasks {
    pub user: User,
    pub tasks: Vec<Task>,
}
