//! Sorting and filtering of task lists.
//!
//! Every function here is pure: it takes slices and returns new vectors.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::models::Task;
use crate::time;

/// The active filters, all conjunctive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub show_only_pending: bool,
    pub category: String,     // empty = any category
    pub user_id: Option<i64>, // None = any user
}

impl TaskFilter {
    pub fn is_empty(&self) -> bool {
        !self.show_only_pending && self.category.is_empty() && self.user_id.is_none()
    }

    pub fn matches(&self, task: &Task) -> bool {
        if self.show_only_pending && task.is_completed {
            return false;
        }
        if !self.category.is_empty() && task.category != self.category {
            return false;
        }
        match self.user_id {
            Some(user_id) => task.user_id == user_id,
            None => true,
        }
    }
}

/// Priority descending, then deadline ascending with no deadline last, then id ascending
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| {
            let a_deadline = a.deadline.unwrap_or(i64::MAX);
            let b_deadline = b.deadline.unwrap_or(i64::MAX);
            a_deadline.cmp(&b_deadline)
        })
        .then_with(|| a.deadline.is_none().cmp(&b.deadline.is_none()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Canonical ordering of a task list
pub fn sort_tasks(tasks: &[Task]) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by(compare_tasks);
    sorted
}

/// Keep the tasks matching `filter`, preserving order
pub fn apply_filter(tasks: &[Task], filter: &TaskFilter) -> Vec<Task> {
    tasks.iter().filter(|task| filter.matches(task)).cloned().collect()
}

/// Sort `all_tasks` canonically, then apply every active filter
pub fn compute_displayed_tasks(all_tasks: &[Task], filter: &TaskFilter) -> Vec<Task> {
    let sorted = sort_tasks(all_tasks);
    if filter.is_empty() {
        return sorted;
    }
    apply_filter(&sorted, filter)
}

/// Distinct non-empty categories in ascending order
pub fn list_categories(tasks: &[Task]) -> Vec<String> {
    tasks
        .iter()
        .filter(|task| !task.category.is_empty())
        .map(|task| task.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn is_task_overdue(task: &Task, now: i64) -> bool {
    !task.is_completed && task.deadline.is_some_and(|deadline| time::is_overdue(deadline, now))
}

pub fn is_task_due_today(task: &Task, now: i64) -> bool {
    !task.is_completed && task.deadline.is_some_and(|deadline| time::is_due_today(deadline, now))
}

/// Incomplete tasks past their deadline, in input order
pub fn overdue_tasks(tasks: &[Task], now: i64) -> Vec<Task> {
    tasks.iter().filter(|task| is_task_overdue(task, now)).cloned().collect()
}

/// Incomplete tasks due on the local calendar day of `now`, in input order
pub fn today_tasks(tasks: &[Task], now: i64) -> Vec<Task> {
    tasks.iter().filter(|task| is_task_due_today(task, now)).cloned().collect()
}
