use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PracticeType {
    QuizMcq,
    QuizShort,
    Flashcard,
    Behavioral,
    SystemDesign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Difficulty {
    /// Bucket a mastery score into a difficulty tier.
    pub fn from_mastery(score: f64) -> Self {
        if score < 0.3 {
            Self::Beginner
        } else if score < 0.6 {
            Self::Intermediate
        } else if score < 0.8 {
            Self::Advanced
        } else {
            Self::Expert
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }
}

/// STAR framework guidance attached to behavioral items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StarGuidance {
    pub situation: String,
    pub task: String,
    pub action: String,
    pub result: String,
}

/// Dimensions a system-design answer is judged along.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationFramework {
    #[serde(default)]
    pub functional: Vec<String>,
    #[serde(default)]
    pub non_functional: Vec<String>,
    #[serde(default)]
    pub architecture: Vec<String>,
    #[serde(default)]
    pub trade_offs: Vec<String>,
    #[serde(default)]
    pub completeness: Vec<String>,
}

/// Type-specific practice content, tagged by the item type it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PracticeContent {
    QuizMcq {
        /// Exactly four options; `correct_index` points into them.
        options: Vec<String>,
        correct_index: usize,
        explanation: String,
    },
    QuizShort {
        /// 3-6 bullets forming the scoring rubric for the answer.
        key_points: Vec<String>,
    },
    Flashcard {
        /// At most three short sentences.
        back: String,
        #[serde(default)]
        tags: Vec<String>,
    },
    Behavioral {
        competency: String,
        star_guidance: StarGuidance,
        evaluation_criteria: Vec<String>,
    },
    SystemDesign {
        requirements: Vec<String>,
        constraints: Vec<String>,
        evaluation_framework: EvaluationFramework,
    },
}

impl PracticeContent {
    pub fn practice_type(&self) -> PracticeType {
        match self {
            Self::QuizMcq { .. } => PracticeType::QuizMcq,
            Self::QuizShort { .. } => PracticeType::QuizShort,
            Self::Flashcard { .. } => PracticeType::Flashcard,
            Self::Behavioral { .. } => PracticeType::Behavioral,
            Self::SystemDesign { .. } => PracticeType::SystemDesign,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PracticeItemRow {
    pub id: Uuid,
    pub task_id: Option<Uuid>,
    pub item_type: PracticeType,
    pub title: String,
    pub question: String,
    pub expected_answer: Option<String>,
    pub skill_ids: Vec<Uuid>,
    pub difficulty: Difficulty,
    pub content: Json<PracticeContent>,
    pub rubric_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One weighted scoring criterion. Weights across a rubric sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricCriterion {
    pub name: String,
    pub weight: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RubricRow {
    pub id: Uuid,
    pub practice_type: PracticeType,
    pub criteria: Json<Vec<RubricCriterion>>,
    pub created_at: DateTime<Utc>,
}

/// A submitted answer. Immutable after submission; re-submitting creates a
/// new attempt rather than overwriting.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttemptRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub practice_item_id: Uuid,
    pub task_id: Option<Uuid>,
    pub answer: String,
    pub time_spent_seconds: Option<i32>,
    pub submitted_at: DateTime<Utc>,
}

/// Rubric-scored evaluation of an attempt. At most one per attempt;
/// re-evaluating replaces it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationRow {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub rubric_id: Uuid,
    pub overall_score: f64,
    pub criterion_scores: Json<BTreeMap<String, f64>>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_buckets_match_mastery_cuts() {
        assert_eq!(Difficulty::from_mastery(0.0), Difficulty::Beginner);
        assert_eq!(Difficulty::from_mastery(0.29), Difficulty::Beginner);
        assert_eq!(Difficulty::from_mastery(0.3), Difficulty::Intermediate);
        assert_eq!(Difficulty::from_mastery(0.59), Difficulty::Intermediate);
        assert_eq!(Difficulty::from_mastery(0.6), Difficulty::Advanced);
        assert_eq!(Difficulty::from_mastery(0.79), Difficulty::Advanced);
        assert_eq!(Difficulty::from_mastery(0.8), Difficulty::Expert);
        assert_eq!(Difficulty::from_mastery(1.0), Difficulty::Expert);
    }

    #[test]
    fn test_practice_content_tagged_serialization() {
        let content = PracticeContent::QuizMcq {
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: 2,
            explanation: "c is right".into(),
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["kind"], "quiz_mcq");
        assert_eq!(json["correct_index"], 2);

        let back: PracticeContent = serde_json::from_value(json).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn test_practice_content_type_mapping() {
        let content = PracticeContent::Flashcard {
            back: "An index speeds up lookups.".into(),
            tags: vec![],
        };
        assert_eq!(content.practice_type(), PracticeType::Flashcard);
    }

    #[test]
    fn test_system_design_content_roundtrip() {
        let json = r#"{
            "kind": "system_design",
            "requirements": ["Store 1M events/day"],
            "constraints": ["p99 < 100ms"],
            "evaluation_framework": {
                "functional": ["ingest", "query"],
                "non_functional": ["scalability"],
                "architecture": ["components"],
                "trade_offs": ["consistency vs latency"],
                "completeness": ["data flow"]
            }
        }"#;
        let content: PracticeContent = serde_json::from_str(json).unwrap();
        assert_eq!(content.practice_type(), PracticeType::SystemDesign);
    }
}
