use rusqlite::Connection;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::watch;

use crate::models::{Task, User, UserWithTasks};
use crate::store::{EntityStore, StoreSnapshot};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

const TASK_COLUMNS: &str = "id, title, description, is_completed, deadline, priority, category, user_id, created_at, completed_at";

pub struct Database {
    conn: Connection,
    changes: watch::Sender<StoreSnapshot>,
}

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        Self::from_connection(Connection::open(&db_path)?)
    }

    /// Open a private database that lives only as long as this value
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        Self::initialize_schema(&conn)?;
        let users = Self::load_users_with_tasks(&conn)?;
        let (changes, _) = watch::channel(StoreSnapshot { version: 0, users });
        Ok(Database { conn, changes })
    }

    /// Initialize the database schema (tables and indexes)
    fn initialize_schema(conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id              INTEGER PRIMARY KEY,
                username        TEXT NOT NULL
            )",
            [],
        )?;

        // AUTOINCREMENT keeps ids of deleted tasks from being handed out again
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL,
                description     TEXT NOT NULL DEFAULT '',
                is_completed    INTEGER NOT NULL DEFAULT 0,
                deadline        INTEGER,
                priority        TEXT NOT NULL DEFAULT 'MEDIUM',
                category        TEXT NOT NULL DEFAULT '',
                user_id         INTEGER NOT NULL DEFAULT 0,
                created_at      INTEGER NOT NULL,
                completed_at    INTEGER
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_user_id ON tasks(user_id)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_category ON tasks(category)",
            [],
        )?;

        Ok(())
    }

    /// Helper function to map a row to a Task
    fn row_to_task(row: &rusqlite::Row) -> Result<Task, rusqlite::Error> {
        let priority: String = row.get(5)?;
        let priority = priority.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Task {
            id: Some(row.get(0)?),
            title: row.get(1)?,
            description: row.get(2)?,
            is_completed: row.get::<_, i64>(3)? != 0,
            deadline: row.get(4)?,
            priority,
            category: row.get(6)?,
            user_id: row.get(7)?,
            created_at: row.get(8)?,
            completed_at: row.get(9)?,
        })
    }

    /// Get a single task by ID
    pub fn get_task(&self, id: i64) -> Result<Option<Task>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;

        match stmt.query_row(rusqlite::params![id], Self::row_to_task) {
            Ok(task) => Ok(Some(task)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    /// Get all tasks ordered by id
    pub fn get_all_tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        Self::load_tasks(&self.conn)
    }

    fn load_tasks(conn: &Connection) -> Result<Vec<Task>, DatabaseError> {
        let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id ASC"))?;
        let tasks = stmt
            .query_map([], Self::row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn load_users_with_tasks(conn: &Connection) -> Result<Vec<UserWithTasks>, DatabaseError> {
        let mut stmt = conn.prepare("SELECT id, username FROM users ORDER BY id ASC")?;
        let users = stmt
            .query_map([], |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut tasks_by_user: HashMap<i64, Vec<Task>> = HashMap::new();
        for task in Self::load_tasks(conn)? {
            tasks_by_user.entry(task.user_id).or_default().push(task);
        }

        Ok(users
            .into_iter()
            .map(|user| {
                let tasks = tasks_by_user.remove(&user.id).unwrap_or_default();
                UserWithTasks { user, tasks }
            })
            .collect())
    }

    /// Re-read the tables and hand the result to subscribers.
    /// On failure subscribers keep the previous snapshot.
    fn publish(&self) {
        match Self::load_users_with_tasks(&self.conn) {
            Ok(users) => {
                let version = self.changes.borrow().version + 1;
                self.changes.send_replace(StoreSnapshot { version, users });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to publish store snapshot");
            }
        }
    }
}

impl EntityStore for Database {
    fn insert_task(&self, task: &Task) -> Result<Option<i64>, DatabaseError> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO tasks (id, title, description, is_completed, deadline, priority, category, user_id, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                task.id,
                task.title,
                task.description,
                if task.is_completed { 1 } else { 0 },
                task.deadline,
                task.priority.as_str(),
                task.category,
                task.user_id,
                task.created_at,
                task.completed_at
            ],
        )?;

        if changed == 0 {
            tracing::debug!(id = ?task.id, "Task insert ignored, id already exists");
            return Ok(None);
        }

        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, user_id = task.user_id, "Inserted task");
        self.publish();
        Ok(Some(id))
    }

    fn update_task(&self, task: &Task) -> Result<(), DatabaseError> {
        let Some(id) = task.id else {
            return Ok(());
        };

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE tasks SET title = ?1, description = ?2, is_completed = ?3, deadline = ?4,
             priority = ?5, category = ?6, user_id = ?7, completed_at = ?8 WHERE id = ?9",
            rusqlite::params![
                task.title,
                task.description,
                if task.is_completed { 1 } else { 0 },
                task.deadline,
                task.priority.as_str(),
                task.category,
                task.user_id,
                task.completed_at,
                id
            ],
        )?;
        tx.commit()?;

        if changed > 0 {
            tracing::debug!(id, "Updated task");
            self.publish();
        }
        Ok(())
    }

    fn delete_task(&self, task: &Task) -> Result<(), DatabaseError> {
        let Some(id) = task.id else {
            return Ok(());
        };

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute("DELETE FROM tasks WHERE id = ?1", rusqlite::params![id])?;
        tx.commit()?;

        if changed > 0 {
            tracing::debug!(id, "Deleted task");
            self.publish();
        }
        Ok(())
    }

    fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO users (id, username) VALUES (?1, ?2)",
            rusqlite::params![user.id, user.username],
        )?;
        tracing::debug!(id = user.id, "Inserted user");
        self.publish();
        Ok(())
    }

    fn delete_user(&self, user: &User) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![user.id])?;
        tx.commit()?;

        if changed > 0 {
            tracing::debug!(id = user.id, "Deleted user");
            self.publish();
        }
        Ok(())
    }

    fn delete_user_cascade(&self, user: &User) -> Result<usize, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;

        // Tasks first, then the owner
        let removed = tx.execute("DELETE FROM tasks WHERE user_id = ?1", rusqlite::params![user.id])?;
        tx.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![user.id])?;

        tx.commit()?;
        tracing::debug!(id = user.id, removed, "Deleted user and owned tasks");
        self.publish();
        Ok(removed)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT id, username FROM users WHERE id = ?1")?;

        let result = stmt.query_row(rusqlite::params![id], |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
            })
        });

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    fn users_with_tasks(&self) -> Result<Vec<UserWithTasks>, DatabaseError> {
        Self::load_users_with_tasks(&self.conn)
    }

    fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskPriority;

    fn db() -> Database {
        Database::open_in_memory().expect("in-memory database")
    }

    #[test]
    fn insert_assigns_increasing_ids_that_are_never_reused() {
        let db = db();
        db.insert_user(&User::new(0, "Default")).expect("user");

        let first = db
            .insert_task(&Task::new("a".to_string(), 0, 1))
            .expect("insert")
            .expect("id");
        let second = db
            .insert_task(&Task::new("b".to_string(), 0, 2))
            .expect("insert")
            .expect("id");
        assert!(second > first);

        let stored = db.get_task(second).expect("query").expect("task");
        db.delete_task(&stored).expect("delete");

        let third = db
            .insert_task(&Task::new("c".to_string(), 0, 3))
            .expect("insert")
            .expect("id");
        assert!(third > second);
    }

    #[test]
    fn insert_with_existing_id_is_ignored() {
        let db = db();
        let id = db
            .insert_task(&Task::new("original".to_string(), 0, 1))
            .expect("insert")
            .expect("id");

        let mut duplicate = Task::new("duplicate".to_string(), 0, 2);
        duplicate.id = Some(id);
        assert_eq!(db.insert_task(&duplicate).expect("insert"), None);

        let stored = db.get_task(id).expect("query").expect("task");
        assert_eq!(stored.title, "original");
    }

    #[test]
    fn task_fields_survive_storage() {
        let db = db();
        let mut task = Task::new("Pay rent".to_string(), 4, 100);
        task.description = "before the 3rd".to_string();
        task.deadline = Some(5_000);
        task.priority = TaskPriority::Urgent;
        task.category = "Home".to_string();
        task.is_completed = true;
        task.completed_at = Some(200);

        let id = db.insert_task(&task).expect("insert").expect("id");
        let stored = db.get_task(id).expect("query").expect("task");
        assert_eq!(stored, Task { id: Some(id), ..task });
    }

    #[test]
    fn update_and_delete_of_missing_task_are_noops() {
        let db = db();
        let mut ghost = Task::new("ghost".to_string(), 0, 1);
        ghost.id = Some(999);

        db.update_task(&ghost).expect("update");
        db.delete_task(&ghost).expect("delete");
        assert!(db.get_all_tasks().expect("tasks").is_empty());
    }

    #[test]
    fn insert_user_replaces_on_conflict() {
        let db = db();
        db.insert_user(&User::new(1, "alice")).expect("insert");
        db.insert_user(&User::new(1, "alicia")).expect("replace");

        let user = db.get_user(1).expect("query").expect("user");
        assert_eq!(user.username, "alicia");
        assert_eq!(db.get_user(2).expect("query"), None);
    }

    #[test]
    fn cascade_only_removes_owned_tasks() {
        let db = db();
        let alice = User::new(1, "alice");
        let bob = User::new(2, "bob");
        db.insert_user(&alice).expect("alice");
        db.insert_user(&bob).expect("bob");
        for i in 0..3 {
            db.insert_task(&Task::new(format!("a{i}"), 1, i)).expect("insert");
        }
        db.insert_task(&Task::new("b".to_string(), 2, 0)).expect("insert");

        let removed = db.delete_user_cascade(&alice).expect("cascade");
        assert_eq!(removed, 3);

        let remaining = db.users_with_tasks().expect("users");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].user, bob);
        assert_eq!(remaining[0].tasks.len(), 1);
    }

    #[test]
    fn writes_publish_new_snapshots() {
        let db = db();
        let mut rx = db.subscribe();
        assert!(!rx.has_changed().expect("sender alive"));

        db.insert_user(&User::new(0, "Default")).expect("user");
        db.insert_task(&Task::new("a".to_string(), 0, 1)).expect("insert");

        assert!(rx.has_changed().expect("sender alive"));
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.version, 2);
        assert_eq!(snapshot.all_tasks().len(), 1);
    }
}
