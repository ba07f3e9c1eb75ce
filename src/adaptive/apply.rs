//! Applying adaptive changes: reinforcement insertion and repetition
//! reduction, committed with the diff-log append in one transaction while
//! the per-plan lock is held.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::adaptive::analyzer::{
    classify, recommendations, AdaptationAnalysis, KEEP_TASK_COUNT,
};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::plan::{
    DiffAction, PlanDiffChange, PlanDiffEntry, StudyPlanRow, TaskContent, TaskRow, TaskType,
};
use crate::models::practice::Difficulty;
use crate::store;
use crate::store::tasks::NewTask;

/// Reinforcement tasks are short, focused practice blocks.
const REINFORCEMENT_MINUTES: i32 = 30;

/// Picks dates for reinforcement tasks: iterate the plan's upcoming dates,
/// always taking the least-loaded candidate (earliest on ties) that honors
/// the minimum spacing from dates already chosen for this skill. Chosen
/// dates count toward load so stacking two insertions on one day loses.
pub fn pick_reinforcement_dates(
    load_by_date: &BTreeMap<NaiveDate, usize>,
    window_start: NaiveDate,
    window_end: NaiveDate,
    count: usize,
    min_spacing_days: i64,
) -> Vec<NaiveDate> {
    let mut load: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut date = window_start;
    while date < window_end {
        load.insert(date, load_by_date.get(&date).copied().unwrap_or(0));
        date += Duration::days(1);
    }

    let mut chosen: Vec<NaiveDate> = Vec::with_capacity(count);
    for _ in 0..count {
        let candidate = load
            .iter()
            .filter(|(date, _)| {
                chosen
                    .iter()
                    .all(|c| (**date - *c).num_days().abs() >= min_spacing_days)
            })
            .min_by_key(|(date, load)| (**load, **date))
            .map(|(date, _)| *date);
        match candidate {
            Some(date) => {
                *load.entry(date).or_insert(0) += 1;
                chosen.push(date);
            }
            None => break,
        }
    }
    chosen.sort();
    chosen
}

#[derive(Debug, Default, Serialize)]
pub struct AdaptationSummary {
    pub reinforcement_tasks_added: usize,
    pub tasks_marked_optional: usize,
}

#[derive(Debug, Serialize)]
pub struct AdaptationResult {
    pub analysis: AdaptationAnalysis,
    pub changes: Vec<PlanDiffChange>,
    pub summary: AdaptationSummary,
}

async fn load_analysis_inputs(
    pool: &PgPool,
    user_id: Uuid,
    plan: &StudyPlanRow,
    today: NaiveDate,
) -> Result<(Vec<(crate::models::mastery::MasteryRow, String)>, Vec<TaskRow>), AppError> {
    let masteries = store::mastery::masteries_for_user(pool, user_id).await?;
    let skill_ids: Vec<Uuid> = masteries.iter().map(|m| m.skill_id).collect();
    let skills = store::skills::get_skills_by_ids(pool, &skill_ids).await?;
    let names: HashMap<Uuid, String> = skills
        .into_iter()
        .map(|s| (s.id, s.display_name))
        .collect();
    let named = masteries
        .into_iter()
        .filter_map(|m| {
            let name = names.get(&m.skill_id).cloned()?;
            Some((m, name))
        })
        .collect();
    let upcoming = store::tasks::upcoming_tasks(pool, plan.id, today).await?;
    Ok((named, upcoming))
}

fn upcoming_counts(upcoming: &[TaskRow]) -> HashMap<Uuid, usize> {
    let mut counts: HashMap<Uuid, usize> = HashMap::new();
    for task in upcoming {
        for skill_id in &task.skill_ids {
            *counts.entry(*skill_id).or_insert(0) += 1;
        }
    }
    counts
}

/// Analysis without mutation, for the analyze endpoint and the post-
/// evaluation hook.
pub async fn analyze(
    pool: &PgPool,
    config: &Config,
    user_id: Uuid,
    plan_id: Uuid,
) -> Result<AdaptationAnalysis, AppError> {
    let plan = store::plans::get_plan_for_user(pool, plan_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Plan {plan_id} not found")))?;
    let today = Utc::now().date_naive();
    let (masteries, upcoming) = load_analysis_inputs(pool, user_id, &plan, today).await?;

    let (weak_skills, strong_skills) = classify(
        &masteries,
        config.weak_mastery_threshold,
        config.strong_mastery_threshold,
    );
    let counts = upcoming_counts(&upcoming);
    let recs = recommendations(
        &weak_skills,
        &strong_skills,
        |skill_id| counts.get(&skill_id).copied().unwrap_or(0),
        config.reinforcement_task_count,
    );

    Ok(AdaptationAnalysis {
        weak_skills,
        strong_skills,
        recommendations: recs,
    })
}

/// Full adaptive apply: analysis, reinforcement insertion, repetition
/// reduction and the diff-log append, all in one transaction. The caller
/// must hold the plan lock.
pub async fn apply(
    pool: &PgPool,
    config: &Config,
    user_id: Uuid,
    plan_id: Uuid,
) -> Result<AdaptationResult, AppError> {
    let plan = store::plans::get_plan_for_user(pool, plan_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Plan {plan_id} not found")))?;
    let today = Utc::now().date_naive();
    let window_start = today.max(plan.window_start());
    let window_end = plan.window_end();

    let (masteries, upcoming) = load_analysis_inputs(pool, user_id, &plan, today).await?;
    let (weak_skills, strong_skills) = classify(
        &masteries,
        config.weak_mastery_threshold,
        config.strong_mastery_threshold,
    );
    let counts = upcoming_counts(&upcoming);
    let recs = recommendations(
        &weak_skills,
        &strong_skills,
        |skill_id| counts.get(&skill_id).copied().unwrap_or(0),
        config.reinforcement_task_count,
    );

    let scores: HashMap<Uuid, f64> = masteries.iter().map(|(m, _)| (m.skill_id, m.score)).collect();
    let mut load_by_date: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for task in &upcoming {
        *load_by_date.entry(task.date).or_insert(0) += 1;
    }

    let mut changes: Vec<PlanDiffChange> = Vec::new();
    let mut summary = AdaptationSummary::default();

    let mut tx = pool.begin().await?;

    // Reinforcement insertion for weak skills.
    for skill in &weak_skills {
        let dates = pick_reinforcement_dates(
            &load_by_date,
            window_start,
            window_end,
            config.reinforcement_task_count,
            config.min_spacing_days,
        );
        if dates.is_empty() {
            continue;
        }
        let difficulty =
            Difficulty::from_mastery(scores.get(&skill.skill_id).copied().unwrap_or(0.0));

        for date in &dates {
            let day = store::plans::find_or_create_day(&mut tx, &plan, *date).await?;
            store::tasks::insert_task(
                &mut tx,
                &NewTask {
                    plan_id: plan.id,
                    day_id: day.id,
                    user_id,
                    date: *date,
                    task_type: TaskType::Practice,
                    title: format!("Reinforcement practice: {}", skill.skill_name),
                    description: format!(
                        "Additional practice to strengthen {}.",
                        skill.skill_name
                    ),
                    skill_ids: vec![skill.skill_id],
                    estimated_minutes: REINFORCEMENT_MINUTES,
                    content: TaskContent {
                        study_materials: vec![format!(
                            "Review {} fundamentals",
                            skill.skill_name
                        )],
                        key_concepts: vec![skill.skill_name.clone()],
                        exercises: vec![format!(
                            "Complete {} level exercises for {}",
                            difficulty.as_str(),
                            skill.skill_name
                        )],
                        adaptive_note: Some(format!(
                            "Added by adaptive planner: {}",
                            skill.reason
                        )),
                        difficulty: Some(difficulty),
                        ..TaskContent::default()
                    },
                },
            )
            .await?;
            *load_by_date.entry(*date).or_insert(0) += 1;
        }

        summary.reinforcement_tasks_added += dates.len();
        changes.push(PlanDiffChange {
            action: DiffAction::Add,
            entity: "task".to_string(),
            skill: skill.skill_name.clone(),
            count: dates.len(),
            reason: skill.reason.clone(),
        });
    }

    // Repetition reduction for strong skills: keep the first two upcoming
    // tasks by date, mark the rest optional. Status is untouched.
    for skill in &strong_skills {
        let mut skill_tasks: Vec<&TaskRow> = upcoming
            .iter()
            .filter(|t| t.skill_ids.contains(&skill.skill_id))
            .collect();
        if skill_tasks.len() <= KEEP_TASK_COUNT {
            continue;
        }
        skill_tasks.sort_by_key(|t| (t.date, t.created_at));

        let excess = &skill_tasks[KEEP_TASK_COUNT..];
        for task in excess {
            let mut content = task.content.0.clone();
            content.optional = true;
            content.adaptive_note =
                Some("Marked optional due to strong mastery".to_string());
            store::tasks::set_content(&mut tx, task.id, &content).await?;
        }

        summary.tasks_marked_optional += excess.len();
        changes.push(PlanDiffChange {
            action: DiffAction::MarkOptional,
            entity: "task".to_string(),
            skill: skill.skill_name.clone(),
            count: excess.len(),
            reason: format!(
                "High mastery ({:.0}%) with improving trend",
                skill.score * 100.0
            ),
        });
    }

    // Exactly one diff-log entry per apply, committed with the changes.
    store::plans::append_diff_entry(
        &mut tx,
        plan.id,
        &PlanDiffEntry {
            timestamp: Utc::now(),
            changes: changes.clone(),
        },
    )
    .await?;
    tx.commit().await?;

    info!(
        "Adaptive apply on plan {plan_id}: +{} reinforcement, {} marked optional",
        summary.reinforcement_tasks_added, summary.tasks_marked_optional
    );

    Ok(AdaptationResult {
        analysis: AdaptationAnalysis {
            weak_skills,
            strong_skills,
            recommendations: recs,
        },
        changes,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    #[test]
    fn test_picks_least_loaded_dates_with_spacing() {
        // Loads: 10th -> 3, 11th -> 0, 12th -> 1, 13th -> 0
        let loads = BTreeMap::from([(date(10), 3), (date(12), 1)]);
        let chosen = pick_reinforcement_dates(&loads, date(10), date(14), 2, 2);
        // Least loaded is the 11th; the 13th is the least-loaded date >= 2
        // days away from it.
        assert_eq!(chosen, vec![date(11), date(13)]);
    }

    #[test]
    fn test_spacing_blocks_adjacent_dates() {
        let loads = BTreeMap::new();
        let chosen = pick_reinforcement_dates(&loads, date(10), date(20), 2, 2);
        assert_eq!(chosen.len(), 2);
        assert!((chosen[1] - chosen[0]).num_days() >= 2);
    }

    #[test]
    fn test_narrow_window_places_fewer_tasks() {
        // Only one schedulable date: the second insertion cannot honor
        // spacing and is skipped.
        let chosen = pick_reinforcement_dates(&BTreeMap::new(), date(10), date(11), 2, 2);
        assert_eq!(chosen, vec![date(10)]);
    }

    #[test]
    fn test_empty_window_places_nothing() {
        let chosen = pick_reinforcement_dates(&BTreeMap::new(), date(10), date(10), 2, 2);
        assert!(chosen.is_empty());
    }

    #[test]
    fn test_second_pick_accounts_for_first() {
        // Two dates, both empty, far apart: both get one task each rather
        // than stacking.
        let chosen = pick_reinforcement_dates(&BTreeMap::new(), date(10), date(16), 2, 2);
        assert_eq!(chosen.len(), 2);
        assert_ne!(chosen[0], chosen[1]);
    }

    #[test]
    fn test_ties_break_to_earliest() {
        let chosen = pick_reinforcement_dates(&BTreeMap::new(), date(10), date(20), 1, 2);
        assert_eq!(chosen, vec![date(10)]);
    }
}
