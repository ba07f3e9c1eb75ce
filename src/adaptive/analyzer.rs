//! Weak/strong skill analysis over mastery data.

use serde::Serialize;
use uuid::Uuid;

use crate::models::mastery::{MasteryRow, Trend};

/// Practice counts below this flag a skill as under-practiced.
const MIN_PRACTICE_COUNT: i32 = 3;
/// Strong skills additionally need at least this many practices.
const STRONG_PRACTICE_COUNT: i32 = 5;
/// Below this mastery a reinforcement recommendation is high priority.
const URGENT_MASTERY: f64 = 0.3;
/// A strong skill keeps at most this many upcoming tasks.
pub const KEEP_TASK_COUNT: usize = 2;

/// One skill flagged by the analysis.
#[derive(Debug, Clone, Serialize)]
pub struct SkillAssessment {
    pub skill_id: Uuid,
    pub skill_name: String,
    pub score: f64,
    pub trend: Trend,
    pub practice_count: i32,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Reinforcement,
    ReduceRepetition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub skill_id: Uuid,
    pub skill: String,
    pub action: String,
    pub priority: RecommendationPriority,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct AdaptationAnalysis {
    pub weak_skills: Vec<SkillAssessment>,
    pub strong_skills: Vec<SkillAssessment>,
    pub recommendations: Vec<Recommendation>,
}

fn weak_reason(score: f64, trend: Trend, practice_count: i32, weak_threshold: f64) -> String {
    let mut reasons = Vec::new();
    if score < URGENT_MASTERY {
        reasons.push("very low mastery".to_string());
    } else if score < weak_threshold {
        reasons.push("low mastery".to_string());
    }
    if trend == Trend::Declining {
        reasons.push("declining performance".to_string());
    }
    if practice_count < MIN_PRACTICE_COUNT {
        reasons.push("insufficient practice".to_string());
    }
    if reasons.is_empty() {
        "needs improvement".to_string()
    } else {
        reasons.join(", ")
    }
}

/// Splits mastery rows into weak and strong sets.
///
/// Weak: score below threshold, declining, or under-practiced.
/// Strong: at or above the strong threshold, improving, well-practiced.
pub fn classify(
    masteries: &[(MasteryRow, String)],
    weak_threshold: f64,
    strong_threshold: f64,
) -> (Vec<SkillAssessment>, Vec<SkillAssessment>) {
    let mut weak = Vec::new();
    let mut strong = Vec::new();

    for (mastery, skill_name) in masteries {
        let assessment = SkillAssessment {
            skill_id: mastery.skill_id,
            skill_name: skill_name.clone(),
            score: mastery.score,
            trend: mastery.trend,
            practice_count: mastery.practice_count,
            reason: weak_reason(
                mastery.score,
                mastery.trend,
                mastery.practice_count,
                weak_threshold,
            ),
        };

        if mastery.score < weak_threshold
            || mastery.trend == Trend::Declining
            || mastery.practice_count < MIN_PRACTICE_COUNT
        {
            weak.push(assessment);
        } else if mastery.score >= strong_threshold
            && mastery.trend == Trend::Improving
            && mastery.practice_count >= STRONG_PRACTICE_COUNT
        {
            strong.push(assessment);
        }
    }
    (weak, strong)
}

/// Builds the recommendation list from the classified skills.
/// `upcoming_task_counts(skill_id)` is how many not-yet-finished tasks
/// reference the skill.
pub fn recommendations(
    weak: &[SkillAssessment],
    strong: &[SkillAssessment],
    upcoming_count: impl Fn(Uuid) -> usize,
    reinforcement_count: usize,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    for skill in weak {
        let priority = if skill.score < URGENT_MASTERY || skill.trend == Trend::Declining {
            RecommendationPriority::High
        } else {
            RecommendationPriority::Medium
        };
        out.push(Recommendation {
            kind: RecommendationKind::Reinforcement,
            skill_id: skill.skill_id,
            skill: skill.skill_name.clone(),
            action: format!("Add {reinforcement_count} reinforcement practice tasks"),
            priority,
            reason: skill.reason.clone(),
        });
    }

    for skill in strong {
        let task_count = upcoming_count(skill.skill_id);
        if task_count > KEEP_TASK_COUNT {
            out.push(Recommendation {
                kind: RecommendationKind::ReduceRepetition,
                skill_id: skill.skill_id,
                skill: skill.skill_name.clone(),
                action: format!(
                    "Mark {} redundant tasks optional",
                    task_count - KEEP_TASK_COUNT
                ),
                priority: RecommendationPriority::Low,
                reason: format!(
                    "High mastery ({:.0}%) with improving trend",
                    skill.score * 100.0
                ),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mastery(score: f64, trend: Trend, count: i32) -> (MasteryRow, String) {
        (
            MasteryRow {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                skill_id: Uuid::new_v4(),
                score,
                last_practiced: Some(Utc::now()),
                practice_count: count,
                trend,
                updated_at: Utc::now(),
            },
            "tensorflow".to_string(),
        )
    }

    #[test]
    fn test_low_score_is_weak() {
        let (weak, strong) = classify(&[mastery(0.4, Trend::Stable, 10)], 0.5, 0.8);
        assert_eq!(weak.len(), 1);
        assert!(strong.is_empty());
    }

    #[test]
    fn test_declining_is_weak_regardless_of_score() {
        let (weak, _) = classify(&[mastery(0.9, Trend::Declining, 10)], 0.5, 0.8);
        assert_eq!(weak.len(), 1);
        assert!(weak[0].reason.contains("declining"));
    }

    #[test]
    fn test_under_practiced_is_weak() {
        let (weak, _) = classify(&[mastery(0.7, Trend::Stable, 2)], 0.5, 0.8);
        assert_eq!(weak.len(), 1);
        assert!(weak[0].reason.contains("insufficient practice"));
    }

    #[test]
    fn test_strong_needs_score_trend_and_practice() {
        let (_, strong) = classify(&[mastery(0.85, Trend::Improving, 6)], 0.5, 0.8);
        assert_eq!(strong.len(), 1);

        let (_, not_strong) = classify(&[mastery(0.85, Trend::Stable, 6)], 0.5, 0.8);
        assert!(not_strong.is_empty());

        let (_, not_strong) = classify(&[mastery(0.85, Trend::Improving, 4)], 0.5, 0.8);
        assert!(not_strong.is_empty());
    }

    #[test]
    fn test_middling_skill_is_neither() {
        let (weak, strong) = classify(&[mastery(0.65, Trend::Stable, 5)], 0.5, 0.8);
        assert!(weak.is_empty());
        assert!(strong.is_empty());
    }

    #[test]
    fn test_weak_reason_aggregates_conditions() {
        let reason = weak_reason(0.2, Trend::Declining, 1, 0.5);
        assert!(reason.contains("very low mastery"));
        assert!(reason.contains("declining performance"));
        assert!(reason.contains("insufficient practice"));
    }

    #[test]
    fn test_reinforcement_priority_tracks_severity() {
        let (weak, _) = classify(&[mastery(0.3, Trend::Declining, 2)], 0.5, 0.8);
        let recs = recommendations(&weak, &[], |_| 0, 2);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, RecommendationPriority::High);
        assert!(recs[0].action.contains('2'));

        let (weak, _) = classify(&[mastery(0.45, Trend::Stable, 5)], 0.5, 0.8);
        let recs = recommendations(&weak, &[], |_| 0, 2);
        assert_eq!(recs[0].priority, RecommendationPriority::Medium);
    }

    #[test]
    fn test_reduction_only_with_more_than_two_upcoming() {
        let (_, strong) = classify(&[mastery(0.9, Trend::Improving, 8)], 0.5, 0.8);
        assert!(recommendations(&[], &strong, |_| 2, 2).is_empty());
        let recs = recommendations(&[], &strong, |_| 4, 2);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationKind::ReduceRepetition);
    }
}
