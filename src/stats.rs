use serde::Serialize;

use crate::models::Task;
use crate::query::{is_task_due_today, is_task_overdue};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TaskStatistics {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    pub due_today: usize,
    pub high_priority: usize,
    pub completion_rate: f64, // 0.0 when there are no tasks
}

/// Aggregate counts over `tasks`.
///
/// Callers pass the unfiltered task set so the numbers do not move with the
/// active filters.
pub fn compute_statistics(tasks: &[Task], now: i64) -> TaskStatistics {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.is_completed).count();
    let completion_rate = if total > 0 {
        completed as f64 / total as f64
    } else {
        0.0
    };

    TaskStatistics {
        total,
        completed,
        pending: total - completed,
        overdue: tasks.iter().filter(|t| is_task_overdue(t, now)).count(),
        due_today: tasks.iter().filter(|t| is_task_due_today(t, now)).count(),
        high_priority: tasks.iter().filter(|t| t.is_high_priority()).count(),
        completion_rate,
    }
}
