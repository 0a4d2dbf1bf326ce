//! Reactive task engine.
//!
//! The engine listens to the entity store and the preference store and keeps a
//! [`TaskView`] up to date. Derived values are always recomputed from the
//! latest snapshot of both sources taken together; nothing is cached between
//! recomputations. Commands write through to the stores and recompute the view
//! before returning, so a failed command never changes what subscribers see.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::clock::Clock;
use crate::database::DatabaseError;
use crate::models::Task;
use crate::preferences::{PreferenceError, PreferenceStore, Preferences};
use crate::store::{EntityStore, StoreSnapshot};
use crate::view::TaskView;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] DatabaseError),
    #[error("Preference error: {0}")]
    Preferences(#[from] PreferenceError),
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Name of the user created on an empty store
    pub default_username: String,
    /// Name of the user created when the last user is deleted
    pub replacement_username: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_username: "Default User".to_string(),
            replacement_username: "New User".to_string(),
        }
    }
}

pub struct TaskEngine<S: EntityStore> {
    pub(crate) store: S,
    pub(crate) preferences: PreferenceStore,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) options: EngineOptions,
    store_rx: watch::Receiver<StoreSnapshot>,
    prefs_rx: watch::Receiver<Preferences>,
    view_tx: watch::Sender<TaskView>,
}

impl<S: EntityStore> TaskEngine<S> {
    /// Wire the engine to its sources, create the default user if the store is
    /// empty, and compute the first view
    pub fn new(
        store: S,
        preferences: PreferenceStore,
        clock: Arc<dyn Clock>,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let store_rx = store.subscribe();
        let prefs_rx = preferences.subscribe();
        let (view_tx, _) = watch::channel(TaskView::default());

        let mut engine = Self {
            store,
            preferences,
            clock,
            options,
            store_rx,
            prefs_rx,
            view_tx,
        };
        engine.bootstrap()?;
        engine.refresh();
        Ok(engine)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// The most recently computed view
    pub fn view(&self) -> TaskView {
        self.view_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskView> {
        self.view_tx.subscribe()
    }

    /// Recompute the view from the latest store and preference snapshots
    pub fn refresh(&mut self) {
        let snapshot = self.store_rx.borrow_and_update().clone();
        let preferences = self.prefs_rx.borrow_and_update().clone();
        let view = TaskView::derive(&snapshot, &preferences, self.clock.now_millis());
        tracing::trace!(
            store_version = view.store_version,
            displayed = view.displayed_tasks.len(),
            "Recomputed task view"
        );
        self.view_tx.send_replace(view);
    }

    /// Recompute only if a source changed since the last recomputation.
    /// Returns whether a new view was published.
    pub fn pump(&mut self) -> bool {
        let changed = self.store_rx.has_changed().unwrap_or(false)
            || self.prefs_rx.has_changed().unwrap_or(false);
        if changed {
            self.refresh();
        }
        changed
    }

    /// Wait until either source changes, then recompute.
    /// Changes that arrive while waiting are folded into a single recomputation.
    pub async fn wait_for_change(&mut self) -> bool {
        let open = tokio::select! {
            changed = self.store_rx.changed() => changed.is_ok(),
            changed = self.prefs_rx.changed() => changed.is_ok(),
        };
        if open {
            self.refresh();
        }
        open
    }

    /// A blank task owned by the current user, created now
    pub fn new_task(&self, title: impl Into<String>) -> Task {
        Task::new(
            title.into(),
            self.preferences.current().current_user_id,
            self.now(),
        )
    }

    pub fn toggle_show_only_pending(&mut self) -> Result<(), EngineError> {
        self.preferences
            .edit(|p| p.show_only_pending = !p.show_only_pending)?;
        self.refresh();
        Ok(())
    }

    pub fn set_filter_category(&mut self, category: &str) -> Result<(), EngineError> {
        self.preferences
            .edit(|p| p.filter_category = category.to_string())?;
        self.refresh();
        Ok(())
    }

    /// `None` removes the user filter
    pub fn set_filter_user_id(&mut self, user_id: Option<i64>) -> Result<(), EngineError> {
        self.preferences.edit(|p| p.filter_user_id = user_id)?;
        self.refresh();
        Ok(())
    }

    /// Reset category, user and pending filters in one write
    pub fn clear_filters(&mut self) -> Result<(), EngineError> {
        self.preferences.edit(Preferences::clear_filters)?;
        self.refresh();
        Ok(())
    }

    /// Store a new task. Returns the assigned id, or `None` if the task carried
    /// an id that already exists.
    pub fn insert_task(&mut self, task: &Task) -> Result<Option<i64>, EngineError> {
        let id = self.store.insert_task(task)?;
        self.refresh();
        Ok(id)
    }

    pub fn update_task(&mut self, task: &Task) -> Result<(), EngineError> {
        self.store.update_task(task)?;
        self.refresh();
        Ok(())
    }

    pub fn delete_task(&mut self, task: &Task) -> Result<(), EngineError> {
        self.store.delete_task(task)?;
        self.refresh();
        Ok(())
    }

    /// Flip completion of `task`, stamping or clearing `completed_at`
    pub fn toggle_task_completion(&mut self, task: &Task) -> Result<Task, EngineError> {
        let updated = task.toggled_completion(self.now());
        self.store.update_task(&updated)?;
        self.refresh();
        Ok(updated)
    }
}
