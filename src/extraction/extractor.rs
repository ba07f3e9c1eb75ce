//! Skill extraction flow: LLM call → evidence validation → skill upsert →
//! evidence insert. Snippets that do not appear in the source document are
//! dropped, so the stored evidence can never be hallucinated.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::extraction::prompts::{
    extract_prompt, JD_EXTRACT_SYSTEM, RESUME_EXTRACT_SYSTEM,
};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::document::{DocumentKind, DocumentRow};
use crate::models::skill::{SkillCategory, SkillEvidenceRow};
use crate::store;

/// One raw record as returned by the extraction LLM call.
#[derive(Debug, Clone, Deserialize)]
pub struct RawExtractedSkill {
    pub skill_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    pub evidence_text: String,
    #[serde(default)]
    pub section_name: Option<String>,
}

fn default_confidence() -> f64 {
    0.5
}

/// Case-folded, whitespace-collapsed substring check. The snippet must occur
/// in the document under this normalization or the record is dropped.
pub fn evidence_found(document_text: &str, snippet: &str) -> bool {
    let haystack = fold(document_text);
    let needle = fold(snippet);
    !needle.is_empty() && haystack.contains(&needle)
}

fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Drops records with empty names or unfounded evidence and clamps
/// confidence into [0, 1]. Returns the survivors.
pub fn sanitize_records(
    records: Vec<RawExtractedSkill>,
    document_text: &str,
) -> Vec<RawExtractedSkill> {
    records
        .into_iter()
        .filter(|r| !r.skill_name.trim().is_empty())
        .filter(|r| {
            let found = evidence_found(document_text, &r.evidence_text);
            if !found {
                warn!(
                    "Dropping extracted skill '{}': evidence not found in document",
                    r.skill_name
                );
            }
            found
        })
        .map(|mut r| {
            r.confidence = r.confidence.clamp(0.0, 1.0);
            r
        })
        .collect()
}

/// Extracts skills from a document and persists the evidence, replacing any
/// prior evidence for the same document.
///
/// Parse failures (after the client's strict retry) degrade to an empty
/// result; provider unavailability surfaces to the caller.
pub async fn extract(
    pool: &PgPool,
    llm: &LlmClient,
    document: &DocumentRow,
    temperature: f32,
) -> Result<Vec<SkillEvidenceRow>, AppError> {
    let system = match document.kind {
        DocumentKind::Resume => RESUME_EXTRACT_SYSTEM,
        DocumentKind::Jd => JD_EXTRACT_SYSTEM,
    };
    let prompt = extract_prompt(&document.content);

    let records: Vec<RawExtractedSkill> =
        match llm.call_json(&prompt, system, temperature).await {
            Ok(records) => records,
            Err(LlmError::Parse(e)) => {
                warn!(
                    "Skill extraction output unparseable for document {}: {e}",
                    document.id
                );
                return Ok(vec![]);
            }
            Err(e) => return Err(e.into()),
        };

    let records = sanitize_records(records, &document.content);
    info!(
        "Extracted {} grounded skills from {:?} document {}",
        records.len(),
        document.kind,
        document.id
    );

    let mut tx = pool.begin().await?;
    store::skills::delete_evidence_for_document(&mut *tx, document.id).await?;

    let mut evidence = Vec::with_capacity(records.len());
    for record in &records {
        let category = record
            .category
            .as_deref()
            .map(SkillCategory::parse_lenient)
            .unwrap_or(SkillCategory::Other);
        let skill = store::skills::upsert_skill(&mut *tx, &record.skill_name, category).await?;
        let row = store::skills::insert_evidence(
            &mut *tx,
            document.id,
            skill.id,
            &record.evidence_text,
            record.section_name.as_deref(),
            record.confidence,
        )
        .await?;
        evidence.push(row);
    }
    tx.commit().await?;

    Ok(evidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, evidence: &str, confidence: f64) -> RawExtractedSkill {
        RawExtractedSkill {
            skill_name: name.to_string(),
            category: Some("programming".to_string()),
            confidence,
            evidence_text: evidence.to_string(),
            section_name: None,
        }
    }

    const DOC: &str = "Experience\nBuilt ETL pipelines in Python at Acme.\nDeployed services to   Kubernetes clusters.";

    #[test]
    fn test_evidence_found_exact_substring() {
        assert!(evidence_found(DOC, "ETL pipelines in Python"));
    }

    #[test]
    fn test_evidence_found_case_folded() {
        assert!(evidence_found(DOC, "etl PIPELINES in python"));
    }

    #[test]
    fn test_evidence_found_whitespace_collapsed() {
        // The document has a double space before "Kubernetes".
        assert!(evidence_found(DOC, "services to Kubernetes clusters"));
    }

    #[test]
    fn test_evidence_not_found_is_rejected() {
        assert!(!evidence_found(DOC, "10 years of Haskell"));
        assert!(!evidence_found(DOC, ""));
    }

    #[test]
    fn test_sanitize_drops_unfounded_records() {
        let records = vec![
            record("Python", "Built ETL pipelines in Python", 0.9),
            record("Haskell", "expert Haskell developer", 0.9),
        ];
        let kept = sanitize_records(records, DOC);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].skill_name, "Python");
    }

    #[test]
    fn test_sanitize_clamps_confidence() {
        let records = vec![record("Python", "Built ETL pipelines in Python", 1.7)];
        let kept = sanitize_records(records, DOC);
        assert_eq!(kept[0].confidence, 1.0);
    }

    #[test]
    fn test_sanitize_drops_empty_names() {
        let records = vec![record("  ", "Built ETL pipelines in Python", 0.8)];
        assert!(sanitize_records(records, DOC).is_empty());
    }
}
