//! Task scheduling rules: status transitions, reschedule window checks,
//! carry-over and overdue redistribution.

use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::plan::{StudyPlanRow, TaskRow, TaskStatus};
use crate::store;

/// Overdue tasks are spread across this many dates starting today.
const RESCHEDULE_SPREAD_DAYS: usize = 3;

/// Legal status transitions: pending and in_progress toggle freely, any
/// state may complete or skip. Everything else is rejected. A same-state
/// update is a no-op, not a transition.
pub fn allowed_transition(from: TaskStatus, to: TaskStatus) -> bool {
    use TaskStatus::*;
    if from == to {
        return true;
    }
    matches!(
        (from, to),
        (Pending, InProgress) | (InProgress, Pending) | (_, Completed) | (_, Skipped)
    )
}

/// Per-day minute budget for overdue redistribution: the weekly cap with
/// tolerance, spread over seven days.
pub fn per_day_minute_cap(hours_per_week: f64, tolerance: f64) -> i64 {
    (hours_per_week * 60.0 * (1.0 + tolerance) / 7.0).round() as i64
}

/// One candidate date for redistribution with its current load.
#[derive(Debug, Clone)]
pub struct DayLoad {
    pub date: NaiveDate,
    pub task_count: usize,
    pub minutes: i64,
}

/// Assigns overdue tasks round-robin across candidate days.
///
/// Days are cycled in ascending initial-load order (ties to the earlier
/// date). A task lands on the next day in the cycle whose minute budget
/// still fits it; tasks that fit nowhere stay overdue.
pub fn assign_overdue(
    overdue: &[(Uuid, i32)],
    days: &[DayLoad],
    cap_minutes: i64,
) -> (Vec<(Uuid, NaiveDate)>, Vec<Uuid>) {
    if days.is_empty() {
        return (vec![], overdue.iter().map(|(id, _)| *id).collect());
    }

    let mut order: Vec<usize> = (0..days.len()).collect();
    order.sort_by_key(|&i| (days[i].task_count, days[i].date));
    let mut minutes: Vec<i64> = days.iter().map(|d| d.minutes).collect();

    let mut placed = Vec::new();
    let mut remaining = Vec::new();
    let mut cursor = 0usize;

    for &(task_id, task_minutes) in overdue {
        let mut slot = None;
        for offset in 0..order.len() {
            let idx = order[(cursor + offset) % order.len()];
            if minutes[idx] + task_minutes as i64 <= cap_minutes {
                slot = Some((idx, offset));
                break;
            }
        }
        match slot {
            Some((idx, offset)) => {
                minutes[idx] += task_minutes as i64;
                placed.push((task_id, days[idx].date));
                cursor = (cursor + offset + 1) % order.len();
            }
            None => remaining.push(task_id),
        }
    }
    (placed, remaining)
}

async fn plan_for_task(pool: &PgPool, task: &TaskRow) -> Result<StudyPlanRow, AppError> {
    store::plans::get_plan(pool, task.plan_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Plan {} not found", task.plan_id)))
}

/// Moves a task to a new date after checking the plan window. Dates outside
/// the window or on/after the interview date are rejected.
pub async fn reschedule_task(
    pool: &PgPool,
    task_id: Uuid,
    new_date: NaiveDate,
    reason: Option<&str>,
) -> Result<TaskRow, AppError> {
    let task = store::tasks::get_task(pool, task_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {task_id} not found")))?;
    let plan = plan_for_task(pool, &task).await?;

    if new_date < plan.window_start() || new_date >= plan.window_end() {
        return Err(AppError::Validation(format!(
            "Date {new_date} is outside the plan window {}..{}",
            plan.window_start(),
            plan.window_end()
        )));
    }

    let updated = store::tasks::set_date(pool, task_id, new_date).await?;
    info!(
        "Rescheduled task {task_id} from {} to {new_date}{}",
        task.date,
        reason.map(|r| format!(" ({r})")).unwrap_or_default()
    );
    Ok(updated)
}

/// Applies a status change with transition validation.
pub async fn update_task_status(
    pool: &PgPool,
    task_id: Uuid,
    status: Option<TaskStatus>,
    actual_minutes: Option<i32>,
) -> Result<TaskRow, AppError> {
    let task = store::tasks::get_task(pool, task_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {task_id} not found")))?;

    let next = status.unwrap_or(task.status);
    if !allowed_transition(task.status, next) {
        return Err(AppError::InvalidTransition(format!(
            "Cannot move task {task_id} from {:?} to {next:?}",
            task.status
        )));
    }

    Ok(store::tasks::update_status(pool, task_id, next, actual_minutes).await?)
}

/// Moves every unfinished task on `from_date` to `to_date`.
/// Returns the moved task ids; an empty source date is a no-op.
pub async fn carry_over(
    pool: &PgPool,
    user_id: Uuid,
    from_date: NaiveDate,
    to_date: NaiveDate,
) -> Result<Vec<Uuid>, AppError> {
    let tasks = store::tasks::tasks_for_user_on(pool, user_id, from_date).await?;
    let mut moved = Vec::new();
    for task in tasks {
        if matches!(task.status, TaskStatus::Pending | TaskStatus::InProgress) {
            store::tasks::set_date(pool, task.id, to_date).await?;
            moved.push(task.id);
        }
    }
    info!(
        "Carried over {} task(s) for user {user_id} from {from_date} to {to_date}",
        moved.len()
    );
    Ok(moved)
}

#[derive(Debug, serde::Serialize)]
pub struct AutoRescheduleResult {
    pub moved: Vec<Uuid>,
    pub remaining: Vec<Uuid>,
}

/// Redistributes overdue tasks across the next three dates, least-loaded
/// first, under the per-day minute cap. Unplaceable tasks remain overdue.
pub async fn auto_reschedule_overdue(
    pool: &PgPool,
    config: &Config,
    user_id: Uuid,
) -> Result<AutoRescheduleResult, AppError> {
    let today = Utc::now().date_naive();
    let overdue = store::tasks::overdue_tasks(pool, user_id, today).await?;
    if overdue.is_empty() {
        return Ok(AutoRescheduleResult {
            moved: vec![],
            remaining: vec![],
        });
    }

    let Some(plan) = store::plans::active_plan_for_user(pool, user_id).await? else {
        return Ok(AutoRescheduleResult {
            moved: vec![],
            remaining: overdue.iter().map(|t| t.id).collect(),
        });
    };

    let horizon = today + Duration::days(RESCHEDULE_SPREAD_DAYS as i64);
    let loads = store::tasks::minutes_by_date(pool, user_id, today, horizon).await?;
    let days: Vec<DayLoad> = (0..RESCHEDULE_SPREAD_DAYS)
        .map(|i| {
            let date = today + Duration::days(i as i64);
            let (count, minutes) = loads
                .iter()
                .find(|(d, _, _)| *d == date)
                .map(|(_, c, m)| (*c as usize, *m))
                .unwrap_or((0, 0));
            DayLoad {
                date,
                task_count: count,
                minutes,
            }
        })
        .collect();

    let cap = per_day_minute_cap(plan.hours_per_week, config.week_minute_tolerance);
    let overdue_input: Vec<(Uuid, i32)> =
        overdue.iter().map(|t| (t.id, t.estimated_minutes)).collect();
    let (placed, remaining) = assign_overdue(&overdue_input, &days, cap);

    let mut moved = Vec::with_capacity(placed.len());
    for (task_id, date) in placed {
        store::tasks::set_date(pool, task_id, date).await?;
        moved.push(task_id);
    }

    info!(
        "Auto-rescheduled {} overdue task(s) for user {user_id}; {} remain overdue",
        moved.len(),
        remaining.len()
    );
    Ok(AutoRescheduleResult { moved, remaining })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_and_in_progress_toggle() {
        assert!(allowed_transition(TaskStatus::Pending, TaskStatus::InProgress));
        assert!(allowed_transition(TaskStatus::InProgress, TaskStatus::Pending));
    }

    #[test]
    fn test_any_state_completes_or_skips() {
        for from in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Skipped,
        ] {
            assert!(allowed_transition(from, TaskStatus::Completed));
            assert!(allowed_transition(from, TaskStatus::Skipped));
        }
    }

    #[test]
    fn test_completed_cannot_reopen() {
        assert!(!allowed_transition(TaskStatus::Completed, TaskStatus::Pending));
        assert!(!allowed_transition(TaskStatus::Completed, TaskStatus::InProgress));
        assert!(!allowed_transition(TaskStatus::Skipped, TaskStatus::Pending));
    }

    #[test]
    fn test_per_day_cap() {
        // 10 h/week * 60 * 1.1 / 7 ≈ 94 minutes
        assert_eq!(per_day_minute_cap(10.0, 0.10), 94);
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn day(d: u32, count: usize) -> DayLoad {
        DayLoad {
            date: date(d),
            task_count: count,
            minutes: count as i64 * 30,
        }
    }

    /// Five overdue tasks; the next three days hold {2, 0, 1} tasks.
    /// Cycle order by load is [day2, day3, day1]; placements follow
    /// [day2, day3, day1, day2, day3] for final loads {3, 2, 3}.
    #[test]
    fn test_round_robin_least_loaded_first() {
        let overdue: Vec<(Uuid, i32)> = (0..5).map(|_| (Uuid::new_v4(), 30)).collect();
        let days = vec![day(10, 2), day(11, 0), day(12, 1)];
        let (placed, remaining) = assign_overdue(&overdue, &days, 10_000);
        assert!(remaining.is_empty());

        let dates: Vec<NaiveDate> = placed.iter().map(|(_, d)| *d).collect();
        assert_eq!(
            dates,
            vec![date(11), date(12), date(10), date(11), date(12)]
        );

        let count_on = |d: NaiveDate| dates.iter().filter(|x| **x == d).count();
        // Final loads including pre-existing tasks: {3, 2, 3}.
        assert_eq!(count_on(date(10)) + 2, 3);
        assert_eq!(count_on(date(11)), 2);
        assert_eq!(count_on(date(12)) + 1, 3);
    }

    #[test]
    fn test_cap_leaves_tasks_overdue() {
        let overdue: Vec<(Uuid, i32)> = (0..4).map(|_| (Uuid::new_v4(), 60)).collect();
        let days = vec![day(10, 0), day(11, 0), day(12, 0)];
        // Cap of 60 fits exactly one task per day; the fourth stays overdue.
        let (placed, remaining) = assign_overdue(&overdue, &days, 60);
        assert_eq!(placed.len(), 3);
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn test_no_days_everything_remains() {
        let overdue = vec![(Uuid::new_v4(), 30)];
        let (placed, remaining) = assign_overdue(&overdue, &[], 100);
        assert!(placed.is_empty());
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn test_oversized_task_remains() {
        let big = vec![(Uuid::new_v4(), 500)];
        let days = vec![day(10, 0)];
        let (placed, remaining) = assign_overdue(&big, &days, 94);
        assert!(placed.is_empty());
        assert_eq!(remaining.len(), 1);
    }
}
