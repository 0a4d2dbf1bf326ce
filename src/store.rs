use tokio::sync::watch;

use crate::database::DatabaseError;
use crate::models::{Task, User, UserWithTasks};

/// Everything the store holds at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    /// Bumped on every published change
    pub version: u64,
    /// Users ordered by id, each with its tasks
    pub users: Vec<UserWithTasks>,
}

impl StoreSnapshot {
    pub fn all_tasks(&self) -> Vec<Task> {
        self.users.iter().flat_map(|u| u.tasks.iter().cloned()).collect()
    }

    pub fn all_users(&self) -> Vec<User> {
        self.users.iter().map(|u| u.user.clone()).collect()
    }

    pub fn user(&self, id: i64) -> Option<&UserWithTasks> {
        self.users.iter().find(|u| u.user.id == id)
    }
}

/// Durable collection of tasks and users.
///
/// Updates and deletes of records that do not exist succeed without effect.
/// Every successful write publishes a fresh [`StoreSnapshot`] to subscribers.
pub trait EntityStore {
    /// Insert a task. A store-assigned id is returned; an explicit id that is
    /// already taken leaves the store unchanged and returns `None`.
    fn insert_task(&self, task: &Task) -> Result<Option<i64>, DatabaseError>;

    fn update_task(&self, task: &Task) -> Result<(), DatabaseError>;

    fn delete_task(&self, task: &Task) -> Result<(), DatabaseError>;

    /// Insert a user, replacing any user with the same id
    fn insert_user(&self, user: &User) -> Result<(), DatabaseError>;

    fn delete_user(&self, user: &User) -> Result<(), DatabaseError>;

    /// Delete a user and every task it owns as one unit, returning the number of tasks removed
    fn delete_user_cascade(&self, user: &User) -> Result<usize, DatabaseError>;

    fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError>;

    fn users_with_tasks(&self) -> Result<Vec<UserWithTasks>, DatabaseError>;

    fn subscribe(&self) -> watch::Receiver<StoreSnapshot>;
}
