//! Task-to-event projection.
//!
//! Regeneration is lazy (on request) and idempotent: `sync_uid` is a pure
//! function of (task id, plan epoch), so projecting an unmutated plan twice
//! yields byte-identical uids. Adaptive mutations bump the epoch via the
//! diff log, which invalidates prior uids on the next projection.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::calendar::CalendarEventRow;
use crate::models::plan::TaskRow;
use crate::store;
use crate::store::events::NewEvent;

/// Stable event identity for one task within one plan generation epoch.
pub fn sync_uid(task_id: Uuid, epoch: usize) -> String {
    format!("{task_id}-e{epoch}@prepcoach")
}

/// Event description assembled from the task's structured content.
pub fn event_description(task: &TaskRow) -> String {
    let mut parts = vec![task.description.clone()];
    let content = &task.content.0;

    if !content.study_materials.is_empty() {
        parts.push("\nStudy materials:".to_string());
        for material in &content.study_materials {
            parts.push(format!("- {material}"));
        }
    }
    if !content.key_concepts.is_empty() {
        parts.push("\nKey concepts:".to_string());
        for concept in &content.key_concepts {
            parts.push(format!("- {concept}"));
        }
    }
    if !content.resources.is_empty() {
        parts.push("\nResources:".to_string());
        for resource in content.resources.iter().take(5) {
            parts.push(format!("- {resource}"));
        }
    }
    parts.join("\n")
}

fn event_start(date: NaiveDate, start_hour: u32) -> chrono::DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(start_hour.min(23), 0, 0)
        .unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(time))
}

/// Builds the event tuple for one task.
pub fn build_event(task: &TaskRow, epoch: usize, start_hour: u32) -> NewEvent {
    let start_at = event_start(task.date, start_hour);
    let end_at = start_at + chrono::Duration::minutes(task.estimated_minutes.max(0) as i64);
    NewEvent {
        task_id: task.id,
        start_at,
        end_at,
        title: task.title.clone(),
        description: event_description(task),
        sync_uid: sync_uid(task.id, epoch),
    }
}

/// Projects the plan's tasks into calendar events, replacing any previous
/// projection for the plan in one transaction.
pub async fn project(
    pool: &PgPool,
    start_hour: u32,
    plan_id: Uuid,
) -> Result<Vec<CalendarEventRow>, AppError> {
    let plan = store::plans::get_plan(pool, plan_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Plan {plan_id} not found")))?;
    let tasks = store::tasks::tasks_for_plan(pool, plan_id).await?;
    let epoch = plan.epoch();

    let events: Vec<NewEvent> = tasks
        .iter()
        .map(|t| build_event(t, epoch, start_hour))
        .collect();

    let rows = store::with_conflict_retry(|| {
        let events = &events;
        async move {
            let mut tx = pool.begin().await?;
            let rows = store::events::replace_events_for_plan(&mut tx, plan_id, events).await?;
            tx.commit().await?;
            Ok(rows)
        }
    })
    .await
    .map_err(store::conflict_to_app)?;

    info!(
        "Projected {} calendar events for plan {plan_id} (epoch {epoch})",
        rows.len()
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plan::{TaskContent, TaskStatus, TaskType};
    use sqlx::types::Json;

    fn task(minutes: i32) -> TaskRow {
        TaskRow {
            id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            day_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            task_type: TaskType::Learn,
            title: "Learn Kubernetes".into(),
            description: "Core concepts".into(),
            skill_ids: vec![],
            estimated_minutes: minutes,
            status: TaskStatus::Pending,
            content: Json(TaskContent {
                study_materials: vec!["Official docs".into()],
                key_concepts: vec!["pods".into()],
                ..TaskContent::default()
            }),
            completed_at: None,
            actual_minutes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sync_uid_is_stable() {
        let id = Uuid::new_v4();
        assert_eq!(sync_uid(id, 3), sync_uid(id, 3));
    }

    #[test]
    fn test_sync_uid_changes_with_epoch() {
        let id = Uuid::new_v4();
        assert_ne!(sync_uid(id, 0), sync_uid(id, 1));
    }

    #[test]
    fn test_event_spans_estimated_minutes_from_start_hour() {
        let task = task(90);
        let event = build_event(&task, 0, 9);
        assert_eq!(
            event.start_at,
            Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
        );
        assert_eq!(
            event.end_at,
            Utc.with_ymd_and_hms(2025, 3, 10, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_projection_of_same_task_is_identical() {
        let task = task(60);
        let a = build_event(&task, 2, 9);
        let b = build_event(&task, 2, 9);
        assert_eq!(a.sync_uid, b.sync_uid);
        assert_eq!(a.start_at, b.start_at);
        assert_eq!(a.description, b.description);
    }

    #[test]
    fn test_description_lists_content() {
        let task = task(60);
        let description = event_description(&task);
        assert!(description.contains("Core concepts"));
        assert!(description.contains("Official docs"));
        assert!(description.contains("pods"));
    }
}
