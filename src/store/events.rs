use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::models::calendar::CalendarEventRow;

pub struct NewEvent {
    pub task_id: Uuid,
    pub start_at: chrono::DateTime<chrono::Utc>,
    pub end_at: chrono::DateTime<chrono::Utc>,
    pub title: String,
    pub description: String,
    pub sync_uid: String,
}

/// Delete-and-reinsert projection for a plan. Atomic: prior events for the
/// plan are invalidated in the same transaction that writes the new set.
pub async fn replace_events_for_plan(
    tx: &mut Transaction<'_, Postgres>,
    plan_id: Uuid,
    events: &[NewEvent],
) -> Result<Vec<CalendarEventRow>, sqlx::Error> {
    sqlx::query("DELETE FROM calendar_events WHERE plan_id = $1")
        .bind(plan_id)
        .execute(&mut **tx)
        .await?;

    let mut rows = Vec::with_capacity(events.len());
    for event in events {
        let row = sqlx::query_as::<_, CalendarEventRow>(
            r#"
            INSERT INTO calendar_events
                (id, plan_id, task_id, start_at, end_at, title, description, sync_uid)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(plan_id)
        .bind(event.task_id)
        .bind(event.start_at)
        .bind(event.end_at)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.sync_uid)
        .fetch_one(&mut **tx)
        .await?;
        rows.push(row);
    }
    Ok(rows)
}
