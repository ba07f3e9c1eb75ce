use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::practice::Difficulty;

/// An active study plan. One active plan per user at a time; mutated only by
/// the adaptive planner (which appends to `diff_log`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudyPlanRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub weeks_count: i32,
    pub hours_per_week: f64,
    pub interview_date: Option<NaiveDate>,
    pub focus_areas: Vec<String>,
    pub diff_log: Json<Vec<PlanDiffEntry>>,
    pub created_at: DateTime<Utc>,
}

impl StudyPlanRow {
    /// First date a task may occupy.
    pub fn window_start(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Exclusive end of the plan window: start + weeks * 7, additionally
    /// clipped so that no task lands on or after the interview date.
    pub fn window_end(&self) -> NaiveDate {
        let end = self.window_start() + chrono::Duration::days(self.weeks_count as i64 * 7);
        match self.interview_date {
            Some(d) if d < end => d,
            _ => end,
        }
    }

    /// Plan generation epoch, bumped by every adaptive mutation.
    pub fn epoch(&self) -> usize {
        self.diff_log.0.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeekRow {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub week_number: i32,
    pub theme: String,
    pub focus_skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DayRow {
    pub id: Uuid,
    pub week_id: Uuid,
    pub day_number: i32,
    pub date: NaiveDate,
    pub theme: Option<String>,
    pub estimated_minutes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskType {
    Learn,
    Practice,
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

/// Structured task content. Replaces the free-shape JSON bag the task
/// scaffolding would otherwise accumulate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskContent {
    #[serde(default)]
    pub study_materials: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub exercises: Vec<String>,
    /// Marked by the adaptive planner when a strong skill has enough coverage.
    #[serde(default)]
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptive_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub day_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub task_type: TaskType,
    pub title: String,
    pub description: String,
    pub skill_ids: Vec<Uuid>,
    pub estimated_minutes: i32,
    pub status: TaskStatus,
    pub content: Json<TaskContent>,
    pub completed_at: Option<DateTime<Utc>>,
    pub actual_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

// ── Plan diff log ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffAction {
    Add,
    MarkOptional,
}

/// One change within an adaptive mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDiffChange {
    pub action: DiffAction,
    /// Always "task" today; kept explicit so the log stays self-describing.
    #[serde(rename = "type")]
    pub entity: String,
    pub skill: String,
    pub count: usize,
    pub reason: String,
}

/// One atomic adaptive mutation, appended per apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDiffEntry {
    pub timestamp: DateTime<Utc>,
    pub changes: Vec<PlanDiffChange>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn plan_with(weeks: i32, interview: Option<NaiveDate>) -> StudyPlanRow {
        StudyPlanRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            weeks_count: weeks,
            hours_per_week: 10.0,
            interview_date: interview,
            focus_areas: vec![],
            diff_log: Json(vec![]),
            created_at: Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_window_end_without_interview_date() {
        let plan = plan_with(4, None);
        assert_eq!(
            plan.window_end(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
        );
    }

    #[test]
    fn test_window_end_clipped_by_interview_date() {
        let interview = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let plan = plan_with(4, Some(interview));
        // No task on or after the interview date.
        assert_eq!(plan.window_end(), interview);
    }

    #[test]
    fn test_epoch_counts_diff_log_entries() {
        let mut plan = plan_with(2, None);
        assert_eq!(plan.epoch(), 0);
        plan.diff_log.0.push(PlanDiffEntry {
            timestamp: Utc::now(),
            changes: vec![],
        });
        assert_eq!(plan.epoch(), 1);
    }

    #[test]
    fn test_task_content_roundtrips_with_defaults() {
        let json = r#"{"study_materials": ["Read the docs"]}"#;
        let content: TaskContent = serde_json::from_str(json).unwrap();
        assert_eq!(content.study_materials.len(), 1);
        assert!(!content.optional);
        assert!(content.adaptive_note.is_none());
    }
}
