//! Aggregate mastery statistics for a user.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::mastery::{MasteryRow, Trend};
use crate::models::practice::Difficulty;
use crate::store;

#[derive(Debug, Default, Serialize)]
pub struct LevelCounts {
    pub beginner: usize,
    pub intermediate: usize,
    pub advanced: usize,
    pub expert: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct TrendCounts {
    pub improving: usize,
    pub stable: usize,
    pub declining: usize,
}

#[derive(Debug, Serialize)]
pub struct MasteryStats {
    pub total_skills: usize,
    pub average: f64,
    pub by_level: LevelCounts,
    pub trends: TrendCounts,
    pub total_practice_count: i64,
    /// Attempts submitted in the trailing seven days.
    pub recent_count: i64,
}

/// Pure aggregation over mastery rows; the recent count is supplied.
pub fn aggregate(masteries: &[MasteryRow], recent_count: i64) -> MasteryStats {
    let total_skills = masteries.len();
    let average = if total_skills > 0 {
        masteries.iter().map(|m| m.score).sum::<f64>() / total_skills as f64
    } else {
        0.0
    };

    let mut by_level = LevelCounts::default();
    let mut trends = TrendCounts::default();
    let mut total_practice_count = 0i64;
    for mastery in masteries {
        match Difficulty::from_mastery(mastery.score) {
            Difficulty::Beginner => by_level.beginner += 1,
            Difficulty::Intermediate => by_level.intermediate += 1,
            Difficulty::Advanced => by_level.advanced += 1,
            Difficulty::Expert => by_level.expert += 1,
        }
        match mastery.trend {
            Trend::Improving => trends.improving += 1,
            Trend::Stable => trends.stable += 1,
            Trend::Declining => trends.declining += 1,
        }
        total_practice_count += mastery.practice_count as i64;
    }

    MasteryStats {
        total_skills,
        average: (average * 1000.0).round() / 1000.0,
        by_level,
        trends,
        total_practice_count,
        recent_count,
    }
}

pub async fn stats_for_user(pool: &PgPool, user_id: Uuid) -> Result<MasteryStats, AppError> {
    let masteries = store::mastery::masteries_for_user(pool, user_id).await?;
    let recent_count = store::practice::recent_attempt_count(pool, user_id).await?;
    Ok(aggregate(&masteries, recent_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mastery(score: f64, trend: Trend, count: i32) -> MasteryRow {
        MasteryRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            skill_id: Uuid::new_v4(),
            score,
            last_practiced: Some(Utc::now()),
            practice_count: count,
            trend,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_aggregate_empty() {
        let stats = aggregate(&[], 0);
        assert_eq!(stats.total_skills, 0);
        assert_eq!(stats.average, 0.0);
        assert_eq!(stats.by_level.beginner, 0);
    }

    #[test]
    fn test_aggregate_buckets_and_average() {
        let rows = vec![
            mastery(0.2, Trend::Declining, 2),
            mastery(0.5, Trend::Stable, 3),
            mastery(0.7, Trend::Improving, 4),
            mastery(0.9, Trend::Improving, 5),
        ];
        let stats = aggregate(&rows, 6);
        assert_eq!(stats.total_skills, 4);
        assert!((stats.average - 0.575).abs() < 1e-9);
        assert_eq!(stats.by_level.beginner, 1);
        assert_eq!(stats.by_level.intermediate, 1);
        assert_eq!(stats.by_level.advanced, 1);
        assert_eq!(stats.by_level.expert, 1);
        assert_eq!(stats.trends.improving, 2);
        assert_eq!(stats.trends.declining, 1);
        assert_eq!(stats.total_practice_count, 14);
        assert_eq!(stats.recent_count, 6);
    }
}
