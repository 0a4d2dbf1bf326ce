use serde::Serialize;

use crate::models::{Task, User};
use crate::preferences::Preferences;
use crate::query;
use crate::stats::{self, TaskStatistics};
use crate::store::StoreSnapshot;

/// Everything derived from one store snapshot, one preference snapshot and one instant
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskView {
    /// Every user's tasks in canonical order
    pub all_tasks: Vec<Task>,
    pub displayed_tasks: Vec<Task>,
    pub categories: Vec<String>,
    /// Computed over `all_tasks`, independent of filters
    pub statistics: TaskStatistics,
    pub overdue_tasks: Vec<Task>,
    pub today_tasks: Vec<Task>,
    pub current_user: Option<User>,
    pub all_users: Vec<User>,
    pub preferences: Preferences,
    /// Store version this view was computed from
    pub store_version: u64,
    pub computed_at: i64,
}

impl TaskView {
    pub fn derive(snapshot: &StoreSnapshot, preferences: &Preferences, now: i64) -> Self {
        let all_tasks = query::sort_tasks(&snapshot.all_tasks());
        // Already in canonical order, so the sort inside is a single pass
        let displayed_tasks = query::compute_displayed_tasks(&all_tasks, &preferences.task_filter());
        let current_user = snapshot
            .user(preferences.current_user_id)
            .map(|u| u.user.clone());

        TaskView {
            displayed_tasks,
            categories: query::list_categories(&all_tasks),
            statistics: stats::compute_statistics(&all_tasks, now),
            overdue_tasks: query::overdue_tasks(&all_tasks, now),
            today_tasks: query::today_tasks(&all_tasks, now),
            current_user,
            all_users: snapshot.all_users(),
            preferences: preferences.clone(),
            store_version: snapshot.version,
            computed_at: now,
            all_tasks,
        }
    }

    pub fn task(&self, id: i64) -> Option<&Task> {
        self.all_tasks.iter().find(|t| t.id == Some(id))
    }

    pub fn user(&self, id: i64) -> Option<&User> {
        self.all_users.iter().find(|u| u.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskPriority, UserWithTasks};

    const T: i64 = 1_700_000_000_000;

    fn snapshot() -> StoreSnapshot {
        let mut a = Task::new("a".to_string(), 1, T);
        a.id = Some(1);
        a.category = "Work".to_string();
        let mut b = Task::new("b".to_string(), 2, T);
        b.id = Some(2);
        b.priority = TaskPriority::Urgent;
        b.is_completed = true;
        b.completed_at = Some(T);

        StoreSnapshot {
            version: 7,
            users: vec![
                UserWithTasks {
                    user: User::new(1, "alice"),
                    tasks: vec![a],
                },
                UserWithTasks {
                    user: User::new(2, "bob"),
                    tasks: vec![b],
                },
            ],
        }
    }

    #[test]
    fn statistics_ignore_filters() {
        let prefs = Preferences {
            filter_user_id: Some(5),
            ..Preferences::default()
        };
        let view = TaskView::derive(&snapshot(), &prefs, T);

        assert!(view.displayed_tasks.is_empty());
        assert_eq!(view.statistics.total, 2);
        assert_eq!(view.statistics.completed, 1);
    }

    #[test]
    fn all_tasks_merge_users_in_canonical_order() {
        let view = TaskView::derive(&snapshot(), &Preferences::default(), T);
        let ids: Vec<_> = view.all_tasks.iter().filter_map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(view.displayed_tasks, view.all_tasks);
        assert_eq!(view.categories, vec!["Work"]);
        assert_eq!(view.store_version, 7);
    }

    #[test]
    fn current_user_follows_preferences() {
        let prefs = Preferences {
            current_user_id: 2,
            ..Preferences::default()
        };
        let view = TaskView::derive(&snapshot(), &prefs, T);
        assert_eq!(view.current_user, Some(User::new(2, "bob")));

        let dangling = Preferences {
            current_user_id: 42,
            ..Preferences::default()
        };
        assert_eq!(TaskView::derive(&snapshot(), &dangling, T).current_user, None);
    }

    #[test]
    fn displayed_tasks_match_the_filter_pipeline() {
        let prefs = Preferences {
            show_only_pending: true,
            ..Preferences::default()
        };
        let snapshot = snapshot();
        let view = TaskView::derive(&snapshot, &prefs, T);

        let expected = query::compute_displayed_tasks(&snapshot.all_tasks(), &prefs.task_filter());
        assert_eq!(view.displayed_tasks, expected);
        let ids: Vec<_> = view.displayed_tasks.iter().filter_map(|t| t.id).collect();
        assert_eq!(ids, vec![1]);
    }
}
