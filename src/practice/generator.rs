//! Practice item generation.
//!
//! Difficulty tracks the user's weakest relevant skill: the minimum mastery
//! across the task's skills picks the tier. Multi-item generation fans out
//! LLM calls bounded by a semaphore; an item whose output cannot be parsed
//! or validated after the client's strict retry is dropped, never defaulted.

use std::sync::Arc;

use serde::Deserialize;
use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::evaluation::rubrics::default_criteria;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::practice::{
    Difficulty, EvaluationFramework, PracticeContent, PracticeItemRow, PracticeType,
    StarGuidance,
};
use crate::practice::prompts::{
    fill, BEHAVIORAL_PROMPT_TEMPLATE, FLASHCARD_PROMPT_TEMPLATE, MCQ_PROMPT_TEMPLATE,
    PRACTICE_SYSTEM, SHORT_PROMPT_TEMPLATE, SYSTEM_DESIGN_PROMPT_TEMPLATE,
};
use crate::store;
use crate::store::practice::NewPracticeItem;

const MCQ_OPTION_COUNT: usize = 4;
const MAX_KEY_POINTS: usize = 6;
const MIN_KEY_POINTS: usize = 3;
const FLASHCARD_MAX_SENTENCES: usize = 3;

/// Minimum mastery across the task's skills decides the difficulty tier.
/// Skills without a mastery row count as zero.
pub fn difficulty_for_scores(scores: &[f64], skill_count: usize) -> Difficulty {
    let min = if scores.len() < skill_count || scores.is_empty() {
        0.0
    } else {
        scores.iter().copied().fold(f64::INFINITY, f64::min)
    };
    Difficulty::from_mastery(min)
}

/// Truncates text to at most `max` sentences (., ! or ? terminated).
pub fn clamp_sentences(text: &str, max: usize) -> String {
    let mut out = String::new();
    let mut count = 0;
    for ch in text.trim().chars() {
        out.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            count += 1;
            if count >= max {
                break;
            }
        }
    }
    out.trim().to_string()
}

// ── LLM payloads per item type ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct McqPayload {
    #[serde(default)]
    title: Option<String>,
    question: String,
    options: Vec<String>,
    correct_index: usize,
    #[serde(default)]
    explanation: String,
}

#[derive(Debug, Deserialize)]
struct ShortPayload {
    #[serde(default)]
    title: Option<String>,
    question: String,
    key_points: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FlashcardPayload {
    #[serde(default)]
    title: Option<String>,
    front: String,
    back: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BehavioralPayload {
    #[serde(default)]
    title: Option<String>,
    question: String,
    #[serde(default)]
    competency: String,
    #[serde(default)]
    star_guidance: LlmStarGuidance,
    #[serde(default)]
    evaluation_criteria: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmStarGuidance {
    #[serde(default)]
    situation: String,
    #[serde(default)]
    task: String,
    #[serde(default)]
    action: String,
    #[serde(default)]
    result: String,
}

#[derive(Debug, Deserialize)]
struct SystemDesignPayload {
    #[serde(default)]
    title: Option<String>,
    question: String,
    #[serde(default)]
    requirements: Vec<String>,
    #[serde(default)]
    constraints: Vec<String>,
    #[serde(default)]
    evaluation_framework: LlmEvaluationFramework,
}

#[derive(Debug, Default, Deserialize)]
struct LlmEvaluationFramework {
    #[serde(default)]
    functional: Vec<String>,
    #[serde(default)]
    non_functional: Vec<String>,
    #[serde(default)]
    architecture: Vec<String>,
    #[serde(default)]
    trade_offs: Vec<String>,
    #[serde(default)]
    completeness: Vec<String>,
}

/// A validated generation result, ready to persist.
#[derive(Debug)]
pub struct GeneratedItem {
    pub title: String,
    pub question: String,
    pub expected_answer: Option<String>,
    pub content: PracticeContent,
}

/// Maps an MCQ payload into typed content, rejecting malformed option sets.
fn validate_mcq(payload: McqPayload, difficulty: Difficulty) -> Option<GeneratedItem> {
    if payload.options.len() != MCQ_OPTION_COUNT || payload.correct_index >= MCQ_OPTION_COUNT {
        warn!(
            "Dropping MCQ item: {} options, correct_index {}",
            payload.options.len(),
            payload.correct_index
        );
        return None;
    }
    let expected = payload.options[payload.correct_index].clone();
    Some(GeneratedItem {
        title: payload
            .title
            .unwrap_or_else(|| format!("{} multiple-choice quiz", title_case(difficulty))),
        question: payload.question,
        expected_answer: Some(expected),
        content: PracticeContent::QuizMcq {
            options: payload.options,
            correct_index: payload.correct_index,
            explanation: payload.explanation,
        },
    })
}

fn validate_short(payload: ShortPayload, difficulty: Difficulty) -> Option<GeneratedItem> {
    let mut key_points = payload.key_points;
    key_points.retain(|p| !p.trim().is_empty());
    if key_points.len() < MIN_KEY_POINTS {
        warn!("Dropping short-answer item: only {} key points", key_points.len());
        return None;
    }
    key_points.truncate(MAX_KEY_POINTS);
    Some(GeneratedItem {
        title: payload
            .title
            .unwrap_or_else(|| format!("{} short-answer quiz", title_case(difficulty))),
        question: payload.question,
        expected_answer: Some(key_points.join("; ")),
        content: PracticeContent::QuizShort { key_points },
    })
}

fn validate_flashcard(payload: FlashcardPayload, difficulty: Difficulty) -> Option<GeneratedItem> {
    if payload.front.trim().is_empty() || payload.back.trim().is_empty() {
        return None;
    }
    let back = clamp_sentences(&payload.back, FLASHCARD_MAX_SENTENCES);
    Some(GeneratedItem {
        title: payload
            .title
            .unwrap_or_else(|| format!("{} flashcard", title_case(difficulty))),
        question: payload.front,
        expected_answer: Some(back.clone()),
        content: PracticeContent::Flashcard {
            back,
            tags: payload.tags,
        },
    })
}

fn validate_behavioral(payload: BehavioralPayload) -> Option<GeneratedItem> {
    if payload.question.trim().is_empty() {
        return None;
    }
    let competency = if payload.competency.trim().is_empty() {
        "general".to_string()
    } else {
        payload.competency
    };
    Some(GeneratedItem {
        title: payload
            .title
            .unwrap_or_else(|| format!("Behavioral question: {competency}")),
        question: payload.question,
        // Behavioral questions have no single correct answer.
        expected_answer: None,
        content: PracticeContent::Behavioral {
            competency,
            star_guidance: StarGuidance {
                situation: payload.star_guidance.situation,
                task: payload.star_guidance.task,
                action: payload.star_guidance.action,
                result: payload.star_guidance.result,
            },
            evaluation_criteria: payload.evaluation_criteria,
        },
    })
}

fn validate_system_design(
    payload: SystemDesignPayload,
    difficulty: Difficulty,
) -> Option<GeneratedItem> {
    if payload.question.trim().is_empty() {
        return None;
    }
    Some(GeneratedItem {
        title: payload
            .title
            .unwrap_or_else(|| format!("{} system design challenge", title_case(difficulty))),
        question: payload.question,
        expected_answer: None,
        content: PracticeContent::SystemDesign {
            requirements: payload.requirements,
            constraints: payload.constraints,
            evaluation_framework: EvaluationFramework {
                functional: payload.evaluation_framework.functional,
                non_functional: payload.evaluation_framework.non_functional,
                architecture: payload.evaluation_framework.architecture,
                trade_offs: payload.evaluation_framework.trade_offs,
                completeness: payload.evaluation_framework.completeness,
            },
        },
    })
}

fn title_case(difficulty: Difficulty) -> String {
    let s = difficulty.as_str();
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// One LLM round-trip for one item. Parse failures and validation rejects
/// return None; the caller drops the item.
async fn generate_one(
    llm: &LlmClient,
    practice_type: PracticeType,
    difficulty: Difficulty,
    skills: &str,
    context: &str,
    temperature: f32,
) -> Option<GeneratedItem> {
    let template = match practice_type {
        PracticeType::QuizMcq => MCQ_PROMPT_TEMPLATE,
        PracticeType::QuizShort => SHORT_PROMPT_TEMPLATE,
        PracticeType::Flashcard => FLASHCARD_PROMPT_TEMPLATE,
        PracticeType::Behavioral => BEHAVIORAL_PROMPT_TEMPLATE,
        PracticeType::SystemDesign => SYSTEM_DESIGN_PROMPT_TEMPLATE,
    };
    let prompt = fill(template, difficulty.as_str(), skills, context);

    let drop_item = |e: LlmError| {
        warn!("Dropping {practice_type:?} item: {e}");
    };

    match practice_type {
        PracticeType::QuizMcq => llm
            .call_json::<McqPayload>(&prompt, PRACTICE_SYSTEM, temperature)
            .await
            .map_err(drop_item)
            .ok()
            .and_then(|p| validate_mcq(p, difficulty)),
        PracticeType::QuizShort => llm
            .call_json::<ShortPayload>(&prompt, PRACTICE_SYSTEM, temperature)
            .await
            .map_err(drop_item)
            .ok()
            .and_then(|p| validate_short(p, difficulty)),
        PracticeType::Flashcard => llm
            .call_json::<FlashcardPayload>(&prompt, PRACTICE_SYSTEM, temperature)
            .await
            .map_err(drop_item)
            .ok()
            .and_then(|p| validate_flashcard(p, difficulty)),
        PracticeType::Behavioral => llm
            .call_json::<BehavioralPayload>(&prompt, PRACTICE_SYSTEM, temperature)
            .await
            .map_err(drop_item)
            .ok()
            .and_then(validate_behavioral),
        PracticeType::SystemDesign => llm
            .call_json::<SystemDesignPayload>(&prompt, PRACTICE_SYSTEM, temperature)
            .await
            .map_err(drop_item)
            .ok()
            .and_then(|p| validate_system_design(p, difficulty)),
    }
}

/// Generates `count` practice items for a task, persisting the survivors.
pub async fn generate_for_task(
    pool: &PgPool,
    llm: &LlmClient,
    config: &Config,
    task_id: Uuid,
    practice_type: PracticeType,
    count: usize,
) -> Result<Vec<PracticeItemRow>, AppError> {
    let task = store::tasks::get_task(pool, task_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {task_id} not found")))?;

    let masteries =
        store::mastery::masteries_for_skills(pool, task.user_id, &task.skill_ids).await?;
    let scores: Vec<f64> = masteries.iter().map(|m| m.score).collect();
    let difficulty = difficulty_for_scores(&scores, task.skill_ids.len());

    let skills = store::skills::get_skills_by_ids(pool, &task.skill_ids).await?;
    let skills_str = if skills.is_empty() {
        "general technical skills".to_string()
    } else {
        skills
            .iter()
            .map(|s| s.display_name.clone())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let context = format!("Task: {}. {}", task.title, task.description);

    let rubric =
        store::practice::get_or_create_rubric(pool, practice_type, &default_criteria(practice_type))
            .await?;

    // Fan out generation, bounded to the configured in-flight limit.
    let semaphore = Arc::new(Semaphore::new(config.max_parallel_generations.max(1)));
    let mut set = JoinSet::new();
    for _ in 0..count {
        let llm = llm.clone();
        let skills_str = skills_str.clone();
        let context = context.clone();
        let semaphore = semaphore.clone();
        let temperature = config.generation_temperature;
        set.spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return None;
            };
            generate_one(&llm, practice_type, difficulty, &skills_str, &context, temperature)
                .await
        });
    }

    let mut generated = Vec::new();
    while let Some(Ok(result)) = set.join_next().await {
        if let Some(item) = result {
            generated.push(item);
        }
    }

    let mut rows = Vec::with_capacity(generated.len());
    for item in generated {
        let row = store::practice::insert_practice_item(
            pool,
            &NewPracticeItem {
                task_id: Some(task.id),
                title: item.title,
                question: item.question,
                expected_answer: item.expected_answer,
                skill_ids: task.skill_ids.clone(),
                difficulty,
                content: item.content,
                rubric_id: rubric.id,
            },
        )
        .await?;
        rows.push(row);
    }

    info!(
        "Generated {}/{} {practice_type:?} items for task {task_id} at {difficulty:?}",
        rows.len(),
        count
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_uses_minimum_mastery() {
        // Two skills at 0.9 and 0.4 -> intermediate (the weaker one rules).
        assert_eq!(
            difficulty_for_scores(&[0.9, 0.4], 2),
            Difficulty::Intermediate
        );
    }

    #[test]
    fn test_difficulty_missing_mastery_defaults_to_zero() {
        // Three skills but only one mastery row: the absent ones count as 0.
        assert_eq!(difficulty_for_scores(&[0.9], 3), Difficulty::Beginner);
        assert_eq!(difficulty_for_scores(&[], 1), Difficulty::Beginner);
    }

    #[test]
    fn test_difficulty_all_strong_is_expert() {
        assert_eq!(difficulty_for_scores(&[0.85, 0.9], 2), Difficulty::Expert);
    }

    #[test]
    fn test_clamp_sentences_truncates() {
        let text = "One. Two! Three? Four. Five.";
        assert_eq!(clamp_sentences(text, 3), "One. Two! Three?");
    }

    #[test]
    fn test_clamp_sentences_short_text_untouched() {
        assert_eq!(clamp_sentences("Just one sentence.", 3), "Just one sentence.");
    }

    #[test]
    fn test_validate_mcq_requires_four_options() {
        let payload = McqPayload {
            title: None,
            question: "q".into(),
            options: vec!["a".into(), "b".into()],
            correct_index: 0,
            explanation: String::new(),
        };
        assert!(validate_mcq(payload, Difficulty::Beginner).is_none());
    }

    #[test]
    fn test_validate_mcq_rejects_out_of_range_index() {
        let payload = McqPayload {
            title: None,
            question: "q".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: 4,
            explanation: String::new(),
        };
        assert!(validate_mcq(payload, Difficulty::Beginner).is_none());
    }

    #[test]
    fn test_validate_mcq_sets_expected_answer() {
        let payload = McqPayload {
            title: None,
            question: "q".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: 2,
            explanation: "because".into(),
        };
        let item = validate_mcq(payload, Difficulty::Advanced).unwrap();
        assert_eq!(item.expected_answer.as_deref(), Some("c"));
        assert!(item.title.contains("Advanced"));
    }

    #[test]
    fn test_validate_short_needs_three_points() {
        let payload = ShortPayload {
            title: None,
            question: "q".into(),
            key_points: vec!["one".into(), "two".into()],
        };
        assert!(validate_short(payload, Difficulty::Beginner).is_none());
    }

    #[test]
    fn test_validate_short_caps_at_six_points() {
        let payload = ShortPayload {
            title: None,
            question: "q".into(),
            key_points: (0..9).map(|i| format!("p{i}")).collect(),
        };
        let item = validate_short(payload, Difficulty::Beginner).unwrap();
        match item.content {
            PracticeContent::QuizShort { key_points } => assert_eq!(key_points.len(), 6),
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn test_validate_flashcard_clamps_back() {
        let payload = FlashcardPayload {
            title: None,
            front: "What is an index?".into(),
            back: "A. B. C. D. E.".into(),
            tags: vec![],
        };
        let item = validate_flashcard(payload, Difficulty::Beginner).unwrap();
        match item.content {
            PracticeContent::Flashcard { back, .. } => assert_eq!(back, "A. B. C."),
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn test_validate_behavioral_has_no_expected_answer() {
        let payload = BehavioralPayload {
            title: None,
            question: "Tell me about a time...".into(),
            competency: "leadership".into(),
            star_guidance: LlmStarGuidance::default(),
            evaluation_criteria: vec!["clarity".into()],
        };
        let item = validate_behavioral(payload).unwrap();
        assert!(item.expected_answer.is_none());
    }
}
