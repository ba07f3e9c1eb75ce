//! Daily briefing assembly: today's tasks plus overdue carry-ins, counts,
//! focus skills and a motivational message.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::coach::prompts::{fallback_message, motivation_prompt, MOTIVATION_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::plan::{TaskRow, TaskStatus};
use crate::state::AppState;
use crate::store;

/// At most this many focus skills are surfaced per briefing.
const FOCUS_SKILL_CAP: usize = 8;
/// Upcoming-task preview horizon and size.
const UPCOMING_DAYS: i64 = 7;
const UPCOMING_CAP: usize = 10;

#[derive(Debug, Serialize)]
pub struct BriefingTask {
    #[serde(flatten)]
    pub task: TaskRow,
    pub is_overdue: bool,
    pub days_overdue: i64,
}

#[derive(Debug, Serialize)]
pub struct Briefing {
    pub date: NaiveDate,
    pub plan_id: Uuid,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub overdue_tasks: usize,
    pub completion_percentage: f64,
    pub estimated_minutes: i64,
    pub actual_minutes: Option<i64>,
    pub focus_skills: Vec<String>,
    pub motivational_message: String,
    pub tasks: Vec<BriefingTask>,
    pub upcoming_tasks: Vec<TaskRow>,
    pub current_week: i32,
    pub total_weeks: i32,
    pub week_progress: f64,
}

/// Deterministic briefing counts, computed before any LLM involvement.
pub struct BriefingCounts {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    pub completion_percentage: f64,
    pub estimated_minutes: i64,
    pub actual_minutes: i64,
}

pub fn compute_counts(day_tasks: &[TaskRow], overdue: &[TaskRow]) -> BriefingCounts {
    let total = day_tasks.len() + overdue.len();
    let completed = day_tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    let pending = day_tasks
        .iter()
        .filter(|t| matches!(t.status, TaskStatus::Pending | TaskStatus::InProgress))
        .count();

    let estimated_minutes = day_tasks
        .iter()
        .chain(overdue.iter())
        .map(|t| t.estimated_minutes as i64)
        .sum();
    let actual_minutes = day_tasks
        .iter()
        .chain(overdue.iter())
        .filter(|t| t.status == TaskStatus::Completed)
        .filter_map(|t| t.actual_minutes.map(|m| m as i64))
        .sum();

    BriefingCounts {
        total,
        completed,
        pending,
        overdue: overdue.len(),
        completion_percentage: if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        },
        estimated_minutes,
        actual_minutes,
    }
}

async fn focus_skill_names(
    pool: &PgPool,
    day_tasks: &[TaskRow],
) -> Result<Vec<String>, sqlx::Error> {
    let ids: BTreeSet<Uuid> = day_tasks
        .iter()
        .flat_map(|t| t.skill_ids.iter().copied())
        .collect();
    let ids: Vec<Uuid> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let skills = store::skills::get_skills_by_ids(pool, &ids).await?;
    Ok(skills
        .into_iter()
        .take(FOCUS_SKILL_CAP)
        .map(|s| s.display_name)
        .collect())
}

async fn motivational_message(
    llm: &LlmClient,
    temperature: f32,
    counts: &BriefingCounts,
    focus_skills: &[String],
) -> String {
    let prompt = motivation_prompt(
        counts.completed,
        counts.pending,
        counts.overdue,
        counts.completion_percentage,
        focus_skills,
    );
    match llm.call(&prompt, MOTIVATION_SYSTEM, temperature).await {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!("Motivational message unavailable, using fallback: {e}");
            fallback_message(counts.completed, counts.pending)
        }
    }
}

/// Assembles the briefing for (user, date).
pub async fn briefing(
    state: &AppState,
    user_id: Uuid,
    date: NaiveDate,
) -> Result<Briefing, AppError> {
    let plan = store::plans::active_plan_for_user(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No study plan found for user {user_id}")))?;

    let day_tasks = store::tasks::tasks_for_user_on(&state.db, user_id, date).await?;
    let overdue = store::tasks::overdue_tasks(&state.db, user_id, date).await?;
    let counts = compute_counts(&day_tasks, &overdue);
    let focus_skills = focus_skill_names(&state.db, &day_tasks).await?;

    // Upcoming preview: the next week's unfinished tasks.
    let all_upcoming =
        store::tasks::upcoming_tasks(&state.db, plan.id, date + chrono::Duration::days(1)).await?;
    let upcoming_tasks: Vec<TaskRow> = all_upcoming
        .into_iter()
        .filter(|t| t.date <= date + chrono::Duration::days(UPCOMING_DAYS))
        .take(UPCOMING_CAP)
        .collect();

    // Week position and progress within the current week.
    let days_in = (date - plan.window_start()).num_days().max(0);
    let current_week = ((days_in / 7) as i32 + 1).min(plan.weeks_count);
    let week_start = plan.window_start() + chrono::Duration::days((current_week as i64 - 1) * 7);
    let week_end = week_start + chrono::Duration::days(7);
    let plan_tasks = store::tasks::tasks_for_plan(&state.db, plan.id).await?;
    let week_tasks: Vec<&TaskRow> = plan_tasks
        .iter()
        .filter(|t| t.date >= week_start && t.date < week_end)
        .collect();
    let week_completed = week_tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    let week_progress = if week_tasks.is_empty() {
        0.0
    } else {
        week_completed as f64 / week_tasks.len() as f64 * 100.0
    };

    let motivational_message = motivational_message(
        &state.llm,
        state.config.generation_temperature,
        &counts,
        &focus_skills,
    )
    .await;

    let tasks: Vec<BriefingTask> = day_tasks
        .into_iter()
        .map(|task| BriefingTask {
            is_overdue: false,
            days_overdue: 0,
            task,
        })
        .chain(overdue.into_iter().map(|task| BriefingTask {
            is_overdue: true,
            days_overdue: (date - task.date).num_days(),
            task,
        }))
        .collect();

    Ok(Briefing {
        date,
        plan_id: plan.id,
        total_tasks: counts.total,
        completed_tasks: counts.completed,
        pending_tasks: counts.pending,
        overdue_tasks: counts.overdue,
        completion_percentage: counts.completion_percentage,
        estimated_minutes: counts.estimated_minutes,
        actual_minutes: (counts.actual_minutes > 0).then_some(counts.actual_minutes),
        focus_skills,
        motivational_message,
        tasks,
        upcoming_tasks,
        current_week,
        total_weeks: plan.weeks_count,
        week_progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plan::{TaskContent, TaskType};
    use chrono::Utc;
    use sqlx::types::Json;

    fn task(status: TaskStatus, minutes: i32, actual: Option<i32>) -> TaskRow {
        TaskRow {
            id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            day_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            task_type: TaskType::Learn,
            title: "t".into(),
            description: String::new(),
            skill_ids: vec![],
            estimated_minutes: minutes,
            status,
            content: Json(TaskContent::default()),
            completed_at: None,
            actual_minutes: actual,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_counts_over_mixed_day() {
        let day = vec![
            task(TaskStatus::Completed, 30, Some(25)),
            task(TaskStatus::Pending, 45, None),
            task(TaskStatus::Skipped, 15, None),
        ];
        let overdue = vec![task(TaskStatus::Pending, 60, None)];
        let counts = compute_counts(&day, &overdue);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.overdue, 1);
        assert_eq!(counts.estimated_minutes, 150);
        assert_eq!(counts.actual_minutes, 25);
        assert!((counts.completion_percentage - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_counts_empty_day() {
        let counts = compute_counts(&[], &[]);
        assert_eq!(counts.total, 0);
        assert_eq!(counts.completion_percentage, 0.0);
    }
}
