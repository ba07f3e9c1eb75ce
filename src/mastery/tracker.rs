//! Weighted mastery update.
//!
//! After each evaluation the last ten scores for a skill (newest first,
//! including the fresh one) split into a recent window of up to five and an
//! older remainder. Mastery is 0.7 × mean(recent) + 0.3 × mean(older); the
//! trend compares the same two means with a ±0.05 band.

use sqlx::{Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::models::mastery::{MasteryRow, Trend};
use crate::store;

/// How many evaluation scores feed the computation.
const SCORE_WINDOW: i64 = 10;
/// The newest scores weighted at 0.7.
const RECENT_WINDOW: usize = 5;
const RECENT_WEIGHT: f64 = 0.7;
const OLDER_WEIGHT: f64 = 0.3;
/// Minimum evaluations before a trend is called.
const MIN_SCORES_FOR_TREND: usize = 3;
const TREND_BAND: f64 = 0.05;

fn mean(scores: &[f64]) -> f64 {
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Computes mastery from scores ordered most-recent-first (new score at the
/// front). Empty input is a caller bug; a single score is taken directly.
pub fn compute_mastery(scores: &[f64]) -> f64 {
    let scores = &scores[..scores.len().min(SCORE_WINDOW as usize)];
    if scores.is_empty() {
        return 0.0;
    }
    let recent = &scores[..scores.len().min(RECENT_WINDOW)];
    let older = &scores[scores.len().min(RECENT_WINDOW)..];
    let value = if older.is_empty() {
        mean(recent)
    } else {
        RECENT_WEIGHT * mean(recent) + OLDER_WEIGHT * mean(older)
    };
    value.clamp(0.0, 1.0)
}

/// Trend over scores ordered most-recent-first. Below three scores there is
/// not enough signal and the trend stays stable. With five or fewer scores
/// the window is split in half so both means are populated.
pub fn compute_trend(scores: &[f64]) -> Trend {
    let scores = &scores[..scores.len().min(SCORE_WINDOW as usize)];
    if scores.len() < MIN_SCORES_FOR_TREND {
        return Trend::Stable;
    }
    let split = if scores.len() > RECENT_WINDOW {
        RECENT_WINDOW
    } else {
        scores.len() / 2
    };
    let (recent, older) = scores.split_at(split);
    let diff = mean(recent) - mean(older);
    if diff > TREND_BAND {
        Trend::Improving
    } else if diff < -TREND_BAND {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Recomputes and upserts mastery for every skill an evaluated item touches.
///
/// Runs inside the evaluation transaction: the fresh evaluation is already
/// visible to the score query, and the mastery rows land atomically with it.
/// Callers hold the per-user lock, so updates for one user are serialized in
/// submission order.
pub async fn apply_evaluation(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    skill_ids: &[Uuid],
) -> Result<Vec<MasteryRow>, sqlx::Error> {
    let mut updated = Vec::with_capacity(skill_ids.len());
    for &skill_id in skill_ids {
        let scores =
            store::mastery::recent_scores_for_skill(&mut **tx, user_id, skill_id, SCORE_WINDOW)
                .await?;
        if scores.is_empty() {
            continue;
        }
        let score = compute_mastery(&scores);
        let trend = compute_trend(&scores);
        debug!(
            "Mastery update user {user_id} skill {skill_id}: {} scores -> {score:.3} ({trend:?})",
            scores.len()
        );
        let row = store::mastery::upsert_mastery(tx, user_id, skill_id, score, trend).await?;
        updated.push(row);
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_score_taken_directly() {
        assert_eq!(compute_mastery(&[0.8]), 0.8);
    }

    #[test]
    fn test_five_or_fewer_scores_use_plain_mean() {
        let scores = [1.0, 0.5, 0.6];
        let expected = (1.0 + 0.5 + 0.6) / 3.0;
        assert!((compute_mastery(&scores) - expected).abs() < 1e-9);
    }

    /// Prior scores (newest first) [0.8, 0.9, 0.7, 0.6, 0.5, 0.4]; a new 1.0
    /// arrives. recent = [1.0, 0.8, 0.9, 0.7, 0.6] mean 0.80; older =
    /// [0.5, 0.4] mean 0.45; mastery = 0.7*0.80 + 0.3*0.45 = 0.695.
    #[test]
    fn test_weighted_average_scenario() {
        let scores = [1.0, 0.8, 0.9, 0.7, 0.6, 0.5, 0.4];
        assert!((compute_mastery(&scores) - 0.695).abs() < 1e-9);
    }

    #[test]
    fn test_window_caps_at_ten_scores() {
        let mut scores = vec![1.0; 10];
        scores.extend([0.0; 20]); // ancient zeros must not count
        assert_eq!(compute_mastery(&scores), 1.0);
    }

    #[test]
    fn test_mastery_stays_in_unit_interval() {
        assert!(compute_mastery(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0]) <= 1.0);
        assert!(compute_mastery(&[0.0, 0.0, 0.0]) >= 0.0);
    }

    #[test]
    fn test_trend_needs_three_scores() {
        assert_eq!(compute_trend(&[0.9]), Trend::Stable);
        assert_eq!(compute_trend(&[0.9, 0.1]), Trend::Stable);
    }

    #[test]
    fn test_trend_improving() {
        // newest first: recent half clearly above older half
        assert_eq!(compute_trend(&[0.9, 0.8, 0.4, 0.3]), Trend::Improving);
    }

    #[test]
    fn test_trend_declining() {
        assert_eq!(compute_trend(&[0.2, 0.3, 0.8, 0.9]), Trend::Declining);
    }

    #[test]
    fn test_trend_stable_within_band() {
        assert_eq!(compute_trend(&[0.70, 0.71, 0.69, 0.70]), Trend::Stable);
    }

    #[test]
    fn test_trend_with_many_scores_compares_recent_five_to_rest() {
        // Five strong recents vs three weak olders -> improving.
        let scores = [0.9, 0.9, 0.9, 0.9, 0.9, 0.4, 0.4, 0.4];
        assert_eq!(compute_trend(&scores), Trend::Improving);
    }
}
