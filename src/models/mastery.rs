use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Short-term direction of a skill's mastery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

/// A user's current proficiency estimate for one skill.
/// Unique per (user, skill); upserted by the mastery tracker.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MasteryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub skill_id: Uuid,
    pub score: f64,
    pub last_practiced: Option<DateTime<Utc>>,
    pub practice_count: i32,
    pub trend: Trend,
    pub updated_at: DateTime<Utc>,
}
