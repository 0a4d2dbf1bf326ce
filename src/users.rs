//! User lifecycle: bootstrap, create, switch and delete.
//!
//! The user set is never left empty and the current-user preference never
//! points at a user that is gone. When a step fails, earlier steps of the same
//! transition are rolled back before the error is returned.

use crate::engine::{EngineError, TaskEngine};
use crate::models::{DEFAULT_USER_ID, User, UserWithTasks};
use crate::store::EntityStore;

/// Next free user id: one past the largest, or 1 for an empty set
fn next_user_id(users: &[UserWithTasks]) -> Result<i64, EngineError> {
    match users.iter().map(|u| u.user.id).max() {
        None => Ok(1),
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| EngineError::InvalidState(format!("no user id left after {max}"))),
    }
}

impl<S: EntityStore> TaskEngine<S> {
    /// Create the default user when the store has none, and point the current
    /// user at an existing user. Does nothing on an already consistent store.
    pub(crate) fn bootstrap(&mut self) -> Result<(), EngineError> {
        let users = self.store.users_with_tasks()?;

        if users.is_empty() {
            let user = User::new(DEFAULT_USER_ID, self.options.default_username.clone());
            self.store.insert_user(&user)?;
            self.preferences.edit(|p| p.current_user_id = DEFAULT_USER_ID)?;
            tracing::info!(id = user.id, username = %user.username, "Created default user");
            return Ok(());
        }

        let current = self.preferences.current().current_user_id;
        if !users.iter().any(|u| u.user.id == current) {
            let fallback = users[0].user.id;
            tracing::info!(missing = current, fallback, "Current user no longer exists, switching");
            self.preferences.edit(|p| p.current_user_id = fallback)?;
        }
        Ok(())
    }

    /// Add a user with the next free id and make it current
    pub fn create_user(&mut self, username: &str) -> Result<User, EngineError> {
        let users = self.store.users_with_tasks()?;
        let user = User::new(next_user_id(&users)?, username);

        self.store.insert_user(&user)?;
        if let Err(e) = self.preferences.edit(|p| p.current_user_id = user.id) {
            self.rollback_user(&user);
            return Err(e.into());
        }

        tracing::info!(id = user.id, username = %user.username, "Created user");
        self.refresh();
        Ok(user)
    }

    /// Make `user_id` the current user
    pub fn switch_to_user(&mut self, user_id: i64) -> Result<(), EngineError> {
        self.preferences.edit(|p| p.current_user_id = user_id)?;
        tracing::info!(id = user_id, "Switched user");
        self.refresh();
        Ok(())
    }

    /// Delete `user` and all of its tasks, returning how many tasks went with it.
    ///
    /// If the user was current, the first remaining user becomes current. If no
    /// user would remain, a replacement user is created and made current. A
    /// user that does not exist is ignored.
    pub fn delete_user(&mut self, user: &User) -> Result<usize, EngineError> {
        let users = self.store.users_with_tasks()?;
        let Some(deleted) = users.iter().find(|u| u.user.id == user.id) else {
            return Ok(0);
        };

        let previous_current = self.preferences.current().current_user_id;
        let first_remaining = users.iter().map(|u| &u.user).find(|u| u.id != user.id);

        let removed = match first_remaining {
            Some(first) => {
                let current_survives = users
                    .iter()
                    .any(|u| u.user.id != user.id && u.user.id == previous_current);
                let removed = self.store.delete_user_cascade(user)?;
                if !current_survives {
                    if let Err(e) = self.preferences.edit(|p| p.current_user_id = first.id) {
                        self.restore_user(deleted);
                        return Err(e.into());
                    }
                }
                removed
            }
            None => self.replace_last_user(user, &users, previous_current)?,
        };

        if self.store.users_with_tasks()?.is_empty() {
            return Err(EngineError::InvalidState(format!(
                "no users left after deleting user {}",
                user.id
            )));
        }

        tracing::info!(
            id = user.id,
            removed,
            current = self.preferences.current().current_user_id,
            "Deleted user"
        );
        self.refresh();
        Ok(removed)
    }

    /// Delete the only user, creating and switching to a replacement first so
    /// the current user always exists
    fn replace_last_user(
        &mut self,
        user: &User,
        users: &[UserWithTasks],
        previous_current: i64,
    ) -> Result<usize, EngineError> {
        // Ids are taken over the full set so the replacement never reuses the deleted id
        let created = User::new(next_user_id(users)?, self.options.replacement_username.clone());
        self.store.insert_user(&created)?;

        if let Err(e) = self.preferences.edit(|p| p.current_user_id = created.id) {
            self.rollback_user(&created);
            return Err(e.into());
        }

        match self.store.delete_user_cascade(user) {
            Ok(removed) => Ok(removed),
            Err(e) => {
                match self.preferences.edit(|p| p.current_user_id = previous_current) {
                    Ok(_) => self.rollback_user(&created),
                    // The current user still points at the replacement, so it has to stay
                    Err(pe) => {
                        tracing::warn!(error = %pe, id = created.id, "Failed to restore current user, keeping replacement user");
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Put back a user and its tasks after a later step of its deletion failed
    fn restore_user(&self, deleted: &UserWithTasks) {
        if let Err(e) = self.store.insert_user(&deleted.user) {
            tracing::warn!(id = deleted.user.id, error = %e, "Failed to restore deleted user");
            return;
        }
        for task in &deleted.tasks {
            if let Err(e) = self.store.insert_task(task) {
                tracing::warn!(id = ?task.id, error = %e, "Failed to restore task of deleted user");
            }
        }
    }

    fn rollback_user(&self, user: &User) {
        if let Err(e) = self.store.delete_user(user) {
            tracing::warn!(id = user.id, error = %e, "Failed to roll back created user");
        }
    }
}
