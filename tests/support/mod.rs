#![allow(dead_code)]

use std::cell::Cell;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use tasktrack::clock::FixedClock;
use tasktrack::database::DatabaseError;
use tasktrack::{
    Database, EngineOptions, EntityStore, PreferenceStore, StoreSnapshot, Task, TaskEngine, User,
    UserWithTasks,
};
use tokio::sync::watch;

pub const HOUR: i64 = 60 * 60 * 1000;
pub const DAY: i64 = 24 * HOUR;

/// Noon local time, so +/- a few hours stays on the same calendar day
pub fn local_noon() -> i64 {
    Local
        .with_ymd_and_hms(2024, 6, 12, 12, 0, 0)
        .earliest()
        .expect("valid local time")
        .timestamp_millis()
}

/// An in-memory database whose writes can be made to fail on demand
pub struct FlakyStore {
    inner: Database,
    pub fail_task_writes: Cell<bool>,
    pub fail_user_inserts: Cell<bool>,
    pub fail_cascade: Cell<bool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: Database::open_in_memory().expect("in-memory database"),
            fail_task_writes: Cell::new(false),
            fail_user_inserts: Cell::new(false),
            fail_cascade: Cell::new(false),
        }
    }

    fn check(flag: &Cell<bool>) -> Result<(), DatabaseError> {
        if flag.get() {
            Err(DatabaseError::Unavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl EntityStore for FlakyStore {
    fn insert_task(&self, task: &Task) -> Result<Option<i64>, DatabaseError> {
        Self::check(&self.fail_task_writes)?;
        self.inner.insert_task(task)
    }

    fn update_task(&self, task: &Task) -> Result<(), DatabaseError> {
        Self::check(&self.fail_task_writes)?;
        self.inner.update_task(task)
    }

    fn delete_task(&self, task: &Task) -> Result<(), DatabaseError> {
        Self::check(&self.fail_task_writes)?;
        self.inner.delete_task(task)
    }

    fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        Self::check(&self.fail_user_inserts)?;
        self.inner.insert_user(user)
    }

    fn delete_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.inner.delete_user(user)
    }

    fn delete_user_cascade(&self, user: &User) -> Result<usize, DatabaseError> {
        Self::check(&self.fail_cascade)?;
        self.inner.delete_user_cascade(user)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        self.inner.get_user(id)
    }

    fn users_with_tasks(&self) -> Result<Vec<UserWithTasks>, DatabaseError> {
        self.inner.users_with_tasks()
    }

    fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.inner.subscribe()
    }
}

pub fn engine_at(now: i64) -> (TaskEngine<Database>, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(now));
    let engine = TaskEngine::new(
        Database::open_in_memory().expect("in-memory database"),
        PreferenceStore::in_memory(),
        clock.clone(),
        EngineOptions::default(),
    )
    .expect("engine");
    (engine, clock)
}

pub fn flaky_engine_at(now: i64) -> TaskEngine<FlakyStore> {
    TaskEngine::new(
        FlakyStore::new(),
        PreferenceStore::in_memory(),
        Arc::new(FixedClock::new(now)),
        EngineOptions::default(),
    )
    .expect("engine")
}

pub fn ids(tasks: &[Task]) -> Vec<i64> {
    tasks.iter().filter_map(|t| t.id).collect()
}
