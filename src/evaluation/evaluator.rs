//! Attempt evaluation.
//!
//! The model proposes per-criterion scores; the overall score is ALWAYS the
//! weighted recomputation over the rubric, and a model-supplied overall is
//! ignored. When the provider fails or returns garbage, a neutral default
//! evaluation is persisted so attempt submission never fails.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

use crate::evaluation::prompts::{evaluation_prompt, EVALUATION_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::practice::{AttemptRow, PracticeItemRow, RubricCriterion, RubricRow};
use crate::store::practice::NewEvaluation;

/// Score used for criteria the model failed to score, and for the whole
/// evaluation when the model is unavailable.
const NEUTRAL_SCORE: f64 = 0.5;
const UNAVAILABLE_FEEDBACK: &str = "evaluation unavailable";

#[derive(Debug, Deserialize)]
struct LlmEvaluation {
    #[serde(default)]
    criterion_scores: BTreeMap<String, f64>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    feedback: String,
    // The model's own overall is parsed but deliberately unused; the
    // weighted recomputation below is authoritative.
    #[serde(default)]
    #[allow(dead_code)]
    overall_score: Option<f64>,
}

/// Weighted overall score: Σ(score_c × weight_c), clamped to [0, 1].
/// Criteria the model did not score contribute the neutral score.
pub fn weighted_overall(criteria: &[RubricCriterion], scores: &BTreeMap<String, f64>) -> f64 {
    let total: f64 = criteria
        .iter()
        .map(|c| scores.get(&c.name).copied().unwrap_or(NEUTRAL_SCORE) * c.weight)
        .sum();
    total.clamp(0.0, 1.0)
}

/// Normalizes a model response into persistable evaluation fields:
/// every rubric criterion gets a clamped score, and the overall is the
/// weighted recomputation.
fn normalize(
    raw: LlmEvaluation,
    criteria: &[RubricCriterion],
) -> (BTreeMap<String, f64>, f64, Vec<String>, Vec<String>, String) {
    let mut scores = BTreeMap::new();
    for criterion in criteria {
        let score = raw
            .criterion_scores
            .get(&criterion.name)
            .copied()
            .unwrap_or(NEUTRAL_SCORE)
            .clamp(0.0, 1.0);
        scores.insert(criterion.name.clone(), score);
    }
    let overall = weighted_overall(criteria, &scores);
    let feedback = if raw.feedback.trim().is_empty() {
        "Evaluation completed.".to_string()
    } else {
        raw.feedback
    };
    (scores, overall, raw.strengths, raw.weaknesses, feedback)
}

/// The neutral evaluation persisted when the model cannot be consulted.
pub fn default_evaluation(attempt_id: uuid::Uuid, rubric: &RubricRow) -> NewEvaluation {
    let scores: BTreeMap<String, f64> = rubric
        .criteria
        .0
        .iter()
        .map(|c| (c.name.clone(), NEUTRAL_SCORE))
        .collect();
    let overall = weighted_overall(&rubric.criteria.0, &scores);
    NewEvaluation {
        attempt_id,
        rubric_id: rubric.id,
        overall_score: overall,
        criterion_scores: scores,
        strengths: vec![],
        weaknesses: vec![],
        feedback: UNAVAILABLE_FEEDBACK.to_string(),
    }
}

fn criteria_block(criteria: &[RubricCriterion]) -> String {
    criteria
        .iter()
        .map(|c| format!("- {} (weight {}): {}", c.name, c.weight, c.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs the LLM evaluation for one attempt and returns the row to persist.
/// Every failure path degrades to the neutral default; this never errors.
pub async fn evaluate(
    llm: &LlmClient,
    temperature: f32,
    attempt: &AttemptRow,
    item: &PracticeItemRow,
    rubric: &RubricRow,
) -> NewEvaluation {
    let item_type = serde_json::to_value(item.item_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());

    let prompt = evaluation_prompt(
        &item_type,
        &item.question,
        item.expected_answer.as_deref().unwrap_or("N/A"),
        &criteria_block(&rubric.criteria.0),
        &attempt.answer,
    );

    match llm
        .call_json::<LlmEvaluation>(&prompt, EVALUATION_SYSTEM, temperature)
        .await
    {
        Ok(raw) => {
            let (scores, overall, strengths, weaknesses, feedback) =
                normalize(raw, &rubric.criteria.0);
            NewEvaluation {
                attempt_id: attempt.id,
                rubric_id: rubric.id,
                overall_score: overall,
                criterion_scores: scores,
                strengths,
                weaknesses,
                feedback,
            }
        }
        Err(e) => {
            warn!(
                "Evaluation failed for attempt {}, persisting neutral default: {e}",
                attempt.id
            );
            default_evaluation(attempt.id, rubric)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::rubrics::default_criteria;
    use crate::models::practice::PracticeType;

    fn mcq_criteria() -> Vec<RubricCriterion> {
        default_criteria(PracticeType::QuizMcq)
    }

    #[test]
    fn test_weighted_overall_mcq_scenario() {
        // Correctness 1.0 * 0.7 + Understanding 0.5 * 0.3 = 0.85
        let mut scores = BTreeMap::new();
        scores.insert("Correctness".to_string(), 1.0);
        scores.insert("Understanding".to_string(), 0.5);
        let overall = weighted_overall(&mcq_criteria(), &scores);
        assert!((overall - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_overall_clamps() {
        let mut scores = BTreeMap::new();
        scores.insert("Correctness".to_string(), 5.0);
        scores.insert("Understanding".to_string(), 5.0);
        // Inputs are clamped by normalize(); weighted_overall still guards.
        assert_eq!(weighted_overall(&mcq_criteria(), &scores), 1.0);
    }

    #[test]
    fn test_normalize_ignores_llm_overall() {
        let raw = LlmEvaluation {
            criterion_scores: BTreeMap::from([
                ("Correctness".to_string(), 1.0),
                ("Understanding".to_string(), 0.5),
            ]),
            strengths: vec!["clear".into()],
            weaknesses: vec![],
            feedback: "good".into(),
            overall_score: Some(0.1), // wrong on purpose
        };
        let (_, overall, ..) = normalize(raw, &mcq_criteria());
        assert!((overall - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_fills_missing_criterion_with_neutral() {
        let raw = LlmEvaluation {
            criterion_scores: BTreeMap::from([("Correctness".to_string(), 1.0)]),
            strengths: vec![],
            weaknesses: vec![],
            feedback: String::new(),
            overall_score: None,
        };
        let (scores, overall, _, _, feedback) = normalize(raw, &mcq_criteria());
        assert_eq!(scores["Understanding"], 0.5);
        assert!((overall - 0.85).abs() < 1e-9);
        assert_eq!(feedback, "Evaluation completed.");
    }

    #[test]
    fn test_normalize_clamps_out_of_range_scores() {
        let raw = LlmEvaluation {
            criterion_scores: BTreeMap::from([
                ("Correctness".to_string(), 1.8),
                ("Understanding".to_string(), -0.4),
            ]),
            strengths: vec![],
            weaknesses: vec![],
            feedback: "f".into(),
            overall_score: None,
        };
        let (scores, overall, ..) = normalize(raw, &mcq_criteria());
        assert_eq!(scores["Correctness"], 1.0);
        assert_eq!(scores["Understanding"], 0.0);
        assert!((overall - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_default_evaluation_is_neutral() {
        use sqlx::types::Json;
        let rubric = RubricRow {
            id: uuid::Uuid::new_v4(),
            practice_type: PracticeType::QuizMcq,
            criteria: Json(mcq_criteria()),
            created_at: chrono::Utc::now(),
        };
        let eval = default_evaluation(uuid::Uuid::new_v4(), &rubric);
        assert!((eval.overall_score - 0.5).abs() < 1e-9);
        assert_eq!(eval.feedback, "evaluation unavailable");
    }
}
