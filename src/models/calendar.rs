use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A projected calendar event for one task. Regenerated wholesale per plan;
/// formatting into ICS or similar is delegated to an external serializer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalendarEventRow {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub task_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    /// Stable across regenerations of the same plan epoch.
    pub sync_uid: String,
    pub created_at: DateTime<Utc>,
}
