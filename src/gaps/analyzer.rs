//! Deterministic gap classification.
//!
//! The whole pipeline here is heuristic on purpose: coverage, priority and
//! hour estimates must be reproducible run to run, so no LLM call is made.

use std::collections::HashMap;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::{DocumentKind, DocumentRow};
use crate::models::skill::{Coverage, GapPriority, GapRow, SkillCategory, SkillEvidenceRow};
use crate::store;
use crate::store::gaps::NewGap;

/// Resume confidence at or above this counts as demonstrated.
const COVERED_CONFIDENCE: f64 = 0.7;

/// Sections whose evidence alone is too weak to count as demonstration.
const WEAK_SECTIONS: &[&str] = &["interests", "hobbies", "summary", "objective"];

pub fn is_weak_section(name: Option<&str>) -> bool {
    match name {
        Some(n) => WEAK_SECTIONS.contains(&n.trim().to_lowercase().as_str()),
        // Unattributed evidence is not penalized.
        None => false,
    }
}

/// Classifies how well the resume evidence demonstrates a required skill.
pub fn classify_coverage(resume_evidence: &[SkillEvidenceRow]) -> Coverage {
    if resume_evidence.is_empty() {
        return Coverage::Missing;
    }
    let max_confidence = resume_evidence
        .iter()
        .map(|e| e.confidence)
        .fold(0.0_f64, f64::max);
    let all_weak = resume_evidence
        .iter()
        .all(|e| is_weak_section(e.section_name.as_deref()));

    if max_confidence >= COVERED_CONFIDENCE && !all_weak {
        Coverage::Covered
    } else {
        Coverage::Partial
    }
}

/// Priority ladder over (coverage, required confidence), first match wins.
pub fn priority_for(coverage: Coverage, required_confidence: f64) -> GapPriority {
    match coverage {
        Coverage::Missing if required_confidence >= 0.8 => GapPriority::Critical,
        Coverage::Missing if required_confidence >= 0.5 => GapPriority::High,
        Coverage::Partial if required_confidence >= 0.8 => GapPriority::High,
        Coverage::Partial if required_confidence >= 0.5 => GapPriority::Medium,
        Coverage::Missing => GapPriority::Medium,
        _ => GapPriority::Low,
    }
}

/// Deterministic learning-hour estimate by (category, coverage).
/// Partial coverage halves the base; covered skills need no study time.
pub fn estimated_hours(category: SkillCategory, coverage: Coverage) -> f64 {
    let base = match category {
        SkillCategory::Programming => 40.0,
        SkillCategory::Framework => 40.0,
        SkillCategory::Database => 20.0,
        SkillCategory::Cloud => 40.0,
        SkillCategory::Tool => 20.0,
        SkillCategory::SoftSkill => 20.0,
        SkillCategory::Domain => 40.0,
        SkillCategory::Other => 20.0,
    };
    match coverage {
        Coverage::Missing => base,
        Coverage::Partial => base * 0.5,
        Coverage::Covered => 0.0,
    }
}

/// One-sentence human-readable explanation referencing evidence counts.
pub fn build_reason(
    skill_name: &str,
    coverage: Coverage,
    jd_count: usize,
    resume_evidence: &[SkillEvidenceRow],
) -> String {
    let max_confidence = resume_evidence
        .iter()
        .map(|e| e.confidence)
        .fold(0.0_f64, f64::max);
    match coverage {
        Coverage::Missing => format!(
            "Required skill '{skill_name}' appears in {jd_count} JD mention(s) but has no supporting evidence in the resume."
        ),
        Coverage::Partial => format!(
            "Skill '{skill_name}' is mentioned in the resume ({} snippet(s), max confidence {max_confidence:.2}) but the evidence is too weak for the {jd_count} JD mention(s).",
            resume_evidence.len()
        ),
        Coverage::Covered => format!(
            "Skill '{skill_name}' is demonstrated in the resume with {} snippet(s) (max confidence {max_confidence:.2}).",
            resume_evidence.len()
        ),
    }
}

/// Stable output ordering: priority rank, then higher required confidence,
/// then canonical name.
pub fn sort_gaps(gaps: &mut [(NewGap, String)]) {
    gaps.sort_by(|(a, a_name), (b, b_name)| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then(
                b.required_confidence
                    .partial_cmp(&a.required_confidence)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a_name.cmp(b_name))
    });
}

fn expect_kind(document: &DocumentRow, kind: DocumentKind) -> Result<(), AppError> {
    if document.kind != kind {
        return Err(AppError::Validation(format!(
            "Document {} is not a {:?} document",
            document.id, kind
        )));
    }
    Ok(())
}

/// Runs gap analysis for a user and replaces their active gap set.
///
/// Both documents must already have extracted evidence; the analysis itself
/// is pure bookkeeping over those rows.
pub async fn analyze(
    pool: &PgPool,
    user_id: Uuid,
    resume_doc_id: Uuid,
    jd_doc_id: Uuid,
) -> Result<Vec<GapRow>, AppError> {
    let resume_doc = store::documents::get_document(pool, resume_doc_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {resume_doc_id} not found")))?;
    let jd_doc = store::documents::get_document(pool, jd_doc_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {jd_doc_id} not found")))?;
    expect_kind(&resume_doc, DocumentKind::Resume)?;
    expect_kind(&jd_doc, DocumentKind::Jd)?;

    let resume_evidence = store::skills::evidence_for_document(pool, resume_doc_id).await?;
    let jd_evidence = store::skills::evidence_for_document(pool, jd_doc_id).await?;

    if jd_evidence.is_empty() {
        return Err(AppError::Validation(
            "No skills extracted from the job description yet; run extraction first".to_string(),
        ));
    }

    let mut resume_by_skill: HashMap<Uuid, Vec<SkillEvidenceRow>> = HashMap::new();
    for ev in resume_evidence {
        resume_by_skill.entry(ev.skill_id).or_default().push(ev);
    }
    let mut jd_by_skill: HashMap<Uuid, Vec<SkillEvidenceRow>> = HashMap::new();
    for ev in jd_evidence {
        jd_by_skill.entry(ev.skill_id).or_default().push(ev);
    }

    let skill_ids: Vec<Uuid> = jd_by_skill.keys().copied().collect();
    let skills = store::skills::get_skills_by_ids(pool, &skill_ids).await?;
    let skills_by_id: HashMap<Uuid, _> = skills.into_iter().map(|s| (s.id, s)).collect();

    let mut gaps: Vec<(NewGap, String)> = Vec::new();
    for (skill_id, jd_evs) in &jd_by_skill {
        let Some(skill) = skills_by_id.get(skill_id) else {
            continue;
        };
        let resume_evs = resume_by_skill.get(skill_id).cloned().unwrap_or_default();

        let required_confidence = jd_evs.iter().map(|e| e.confidence).fold(0.0_f64, f64::max);
        let coverage = classify_coverage(&resume_evs);
        let priority = priority_for(coverage, required_confidence);
        let hours = estimated_hours(skill.category, coverage);
        let reason = build_reason(&skill.display_name, coverage, jd_evs.len(), &resume_evs);

        // JD evidence always backs the requirement; resume evidence is
        // appended so partial/covered gaps point at both sides.
        let mut evidence_refs: Vec<Uuid> = jd_evs.iter().map(|e| e.id).collect();
        evidence_refs.extend(resume_evs.iter().map(|e| e.id));

        gaps.push((
            NewGap {
                skill_id: *skill_id,
                required_confidence,
                coverage,
                priority,
                reason,
                estimated_hours: hours,
                evidence_refs,
            },
            skill.canonical_name.clone(),
        ));
    }

    sort_gaps(&mut gaps);
    let new_gaps: Vec<NewGap> = gaps.into_iter().map(|(g, _)| g).collect();

    let rows = store::with_conflict_retry(|| {
        let new_gaps = &new_gaps;
        async move {
            let mut tx = pool.begin().await?;
            let rows = store::gaps::replace_gaps(&mut tx, user_id, new_gaps).await?;
            tx.commit().await?;
            Ok(rows)
        }
    })
    .await
    .map_err(store::conflict_to_app)?;

    info!("Gap analysis produced {} gaps for user {user_id}", rows.len());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn evidence(confidence: f64, section: Option<&str>) -> SkillEvidenceRow {
        SkillEvidenceRow {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            skill_id: Uuid::new_v4(),
            snippet_text: "built things".to_string(),
            section_name: section.map(|s| s.to_string()),
            confidence,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_resume_evidence_is_missing() {
        assert_eq!(classify_coverage(&[]), Coverage::Missing);
    }

    #[test]
    fn test_strong_evidence_is_covered() {
        let evs = vec![evidence(0.9, Some("experience"))];
        assert_eq!(classify_coverage(&evs), Coverage::Covered);
    }

    #[test]
    fn test_low_confidence_is_partial() {
        let evs = vec![evidence(0.5, Some("experience"))];
        assert_eq!(classify_coverage(&evs), Coverage::Partial);
    }

    #[test]
    fn test_weak_section_only_is_partial_even_when_confident() {
        let evs = vec![evidence(0.95, Some("interests"))];
        assert_eq!(classify_coverage(&evs), Coverage::Partial);
    }

    #[test]
    fn test_strong_section_beats_weak_section() {
        let evs = vec![
            evidence(0.9, Some("interests")),
            evidence(0.8, Some("projects")),
        ];
        assert_eq!(classify_coverage(&evs), Coverage::Covered);
    }

    #[test]
    fn test_priority_ladder() {
        assert_eq!(
            priority_for(Coverage::Missing, 0.85),
            GapPriority::Critical
        );
        assert_eq!(priority_for(Coverage::Missing, 0.6), GapPriority::High);
        assert_eq!(priority_for(Coverage::Missing, 0.4), GapPriority::Medium);
        assert_eq!(priority_for(Coverage::Partial, 0.9), GapPriority::High);
        assert_eq!(priority_for(Coverage::Partial, 0.6), GapPriority::Medium);
        assert_eq!(priority_for(Coverage::Partial, 0.3), GapPriority::Low);
        assert_eq!(priority_for(Coverage::Covered, 1.0), GapPriority::Low);
    }

    #[test]
    fn test_hours_table_spot_checks() {
        assert_eq!(
            estimated_hours(SkillCategory::Framework, Coverage::Missing),
            40.0
        );
        assert_eq!(estimated_hours(SkillCategory::Tool, Coverage::Partial), 10.0);
        assert_eq!(
            estimated_hours(SkillCategory::SoftSkill, Coverage::Missing),
            20.0
        );
        assert_eq!(
            estimated_hours(SkillCategory::Cloud, Coverage::Covered),
            0.0
        );
    }

    /// Resume mentions python (0.9); JD requires kubernetes at 0.85.
    /// The kubernetes gap must come out missing/critical with 40 hours.
    #[test]
    fn test_missing_jd_skill_scenario() {
        let coverage = classify_coverage(&[]);
        let priority = priority_for(coverage, 0.85);
        let hours = estimated_hours(SkillCategory::Cloud, coverage);
        assert_eq!(coverage, Coverage::Missing);
        assert_eq!(priority, GapPriority::Critical);
        assert_eq!(hours, 40.0);
    }

    #[test]
    fn test_reason_mentions_counts() {
        let reason = build_reason("Kubernetes", Coverage::Missing, 3, &[]);
        assert!(reason.contains("Kubernetes"));
        assert!(reason.contains('3'));
    }

    #[test]
    fn test_sort_orders_priority_then_confidence_then_name() {
        let mk = |priority, confidence: f64, name: &str| {
            (
                NewGap {
                    skill_id: Uuid::new_v4(),
                    required_confidence: confidence,
                    coverage: Coverage::Missing,
                    priority,
                    reason: String::new(),
                    estimated_hours: 10.0,
                    evidence_refs: vec![],
                },
                name.to_string(),
            )
        };
        let mut gaps = vec![
            mk(GapPriority::Medium, 0.6, "zig"),
            mk(GapPriority::Critical, 0.8, "rust"),
            mk(GapPriority::Critical, 0.9, "go"),
            mk(GapPriority::Critical, 0.8, "python"),
        ];
        sort_gaps(&mut gaps);
        let names: Vec<&str> = gaps.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(names, vec!["go", "python", "rust", "zig"]);
    }

    #[test]
    fn test_weak_section_detection() {
        assert!(is_weak_section(Some("Interests")));
        assert!(is_weak_section(Some("objective")));
        assert!(!is_weak_section(Some("experience")));
        assert!(!is_weak_section(None));
    }
}
