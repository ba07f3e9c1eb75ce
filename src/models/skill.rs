use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Categories a skill can belong to. Drives learning-hour estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SkillCategory {
    Programming,
    Framework,
    Database,
    Cloud,
    Tool,
    SoftSkill,
    Domain,
    Other,
}

impl SkillCategory {
    /// Lenient mapping for LLM-provided category strings.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "programming" | "programming_language" | "language" => Self::Programming,
            "framework" | "library" => Self::Framework,
            "database" => Self::Database,
            "cloud" | "platform" => Self::Cloud,
            "tool" | "tooling" => Self::Tool,
            "soft_skill" | "soft skill" | "softskill" => Self::SoftSkill,
            "domain" | "domain_knowledge" => Self::Domain,
            _ => Self::Other,
        }
    }
}

/// A globally shared skill, unique by canonical name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SkillRow {
    pub id: Uuid,
    /// Lowercased, trimmed, whitespace-collapsed. Unique.
    pub canonical_name: String,
    /// The name as first seen, for display.
    pub display_name: String,
    pub category: SkillCategory,
    pub parent_skill_id: Option<Uuid>,
}

/// A verbatim snippet from a document supporting a skill claim. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SkillEvidenceRow {
    pub id: Uuid,
    pub document_id: Uuid,
    pub skill_id: Uuid,
    pub snippet_text: String,
    pub section_name: Option<String>,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// Whether a required skill is demonstrated by the resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Coverage {
    Covered,
    Partial,
    Missing,
}

/// Scheduling urgency of a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum GapPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl GapPriority {
    /// Sort rank, critical first.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

/// One analyzed gap between the JD's requirements and the resume.
/// The active gap set for a user is replaced wholesale on re-analysis.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GapRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub skill_id: Uuid,
    pub required_confidence: f64,
    pub coverage: Coverage,
    pub priority: GapPriority,
    pub reason: String,
    pub estimated_hours: f64,
    pub evidence_refs: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Canonical skill name: lowercased, trimmed, inner whitespace collapsed.
/// This is the uniqueness key for skills.
pub fn canonical_skill_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name_lowercases_and_trims() {
        assert_eq!(canonical_skill_name("  Python "), "python");
    }

    #[test]
    fn test_canonical_name_collapses_inner_whitespace() {
        assert_eq!(
            canonical_skill_name("Machine\t\tLearning  Ops"),
            "machine learning ops"
        );
    }

    #[test]
    fn test_canonical_name_is_idempotent() {
        let once = canonical_skill_name("  Apache   Kafka ");
        assert_eq!(canonical_skill_name(&once), once);
    }

    #[test]
    fn test_category_parse_lenient_maps_aliases() {
        assert_eq!(
            SkillCategory::parse_lenient("soft skill"),
            SkillCategory::SoftSkill
        );
        assert_eq!(
            SkillCategory::parse_lenient("LIBRARY"),
            SkillCategory::Framework
        );
        assert_eq!(
            SkillCategory::parse_lenient("quantum"),
            SkillCategory::Other
        );
    }

    #[test]
    fn test_priority_rank_ordering() {
        assert!(GapPriority::Critical.rank() < GapPriority::High.rank());
        assert!(GapPriority::High.rank() < GapPriority::Medium.rank());
        assert!(GapPriority::Medium.rank() < GapPriority::Low.rank());
    }
}
