//! Plan synthesis: LLM-garnished drafting with deterministic enforcement.
//!
//! The model proposes themes, titles and content scaffolds; every numeric
//! constraint is recomputed here before anything is persisted. If the model
//! output cannot be parsed, a fully deterministic fallback plan is built
//! instead. Provider unavailability surfaces to the caller and nothing is
//! persisted.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::plan::{DayRow, StudyPlanRow, TaskContent, TaskRow, TaskType, WeekRow};
use crate::models::skill::GapPriority;
use crate::planner::constraints::{
    allocate_hours, build_fallback_plan, group_into_weeks, sanitize_plan, Allocation, DayDraft,
    GapSummary, PlanConstraints, PlanDraft, TaskDraft, WeekDraft,
};
use crate::planner::prompts::{plan_prompt, PLAN_SYSTEM};
use crate::store;
use crate::store::tasks::NewTask;

// ── LLM plan envelope ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LlmPlan {
    weeks: Vec<LlmWeek>,
}

#[derive(Debug, Deserialize)]
struct LlmWeek {
    week_number: i32,
    theme: String,
    #[serde(default)]
    focus_skills: Vec<String>,
    #[serde(default)]
    days: Vec<LlmDay>,
}

#[derive(Debug, Deserialize)]
struct LlmDay {
    day_number: i32,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    theme: Option<String>,
    #[serde(default)]
    tasks: Vec<LlmTask>,
}

#[derive(Debug, Deserialize)]
struct LlmTask {
    task_type: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    skill_names: Vec<String>,
    #[serde(default = "default_task_minutes")]
    estimated_minutes: i32,
    #[serde(default)]
    content: Option<LlmTaskContent>,
}

fn default_task_minutes() -> i32 {
    30
}

#[derive(Debug, Default, Deserialize)]
struct LlmTaskContent {
    #[serde(default)]
    study_materials: Vec<String>,
    #[serde(default)]
    resources: Vec<String>,
    #[serde(default)]
    key_concepts: Vec<String>,
    #[serde(default)]
    exercises: Vec<String>,
}

fn parse_task_type(raw: &str) -> TaskType {
    match raw.trim().to_lowercase().as_str() {
        "practice" => TaskType::Practice,
        "review" => TaskType::Review,
        _ => TaskType::Learn,
    }
}

/// Converts the model's plan into a draft, resolving dates and discarding
/// skill names that do not belong to the user's gap set (tasks never carry
/// orphan skills).
fn draft_from_llm(
    plan: LlmPlan,
    constraints: &PlanConstraints,
    known_skills: &HashMap<String, String>,
) -> PlanDraft {
    let weeks = plan
        .weeks
        .into_iter()
        .map(|week| {
            let week_number = week.week_number.max(1);
            let days = week
                .days
                .into_iter()
                .map(|day| {
                    let fallback_date = constraints.start_date
                        + chrono::Duration::days(
                            (week_number as i64 - 1) * 7 + (day.day_number.max(1) as i64 - 1),
                        );
                    let date = day
                        .date
                        .as_deref()
                        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                        .unwrap_or(fallback_date);
                    let tasks = day
                        .tasks
                        .into_iter()
                        .map(|task| {
                            let skill_names: Vec<String> = task
                                .skill_names
                                .iter()
                                .filter_map(|name| {
                                    known_skills
                                        .get(&crate::models::skill::canonical_skill_name(name))
                                        .cloned()
                                })
                                .collect();
                            let content = task.content.unwrap_or_default();
                            TaskDraft {
                                task_type: parse_task_type(&task.task_type),
                                title: task.title,
                                description: task.description,
                                skill_names,
                                estimated_minutes: task.estimated_minutes,
                                content: TaskContent {
                                    study_materials: content.study_materials,
                                    resources: content.resources,
                                    key_concepts: content.key_concepts,
                                    exercises: content.exercises,
                                    ..TaskContent::default()
                                },
                            }
                        })
                        .collect();
                    DayDraft {
                        day_number: day.day_number,
                        date,
                        theme: day.theme,
                        tasks,
                    }
                })
                .collect();
            WeekDraft {
                week_number,
                theme: week.theme,
                focus_skills: week
                    .focus_skills
                    .iter()
                    .filter_map(|name| {
                        known_skills
                            .get(&crate::models::skill::canonical_skill_name(name))
                            .cloned()
                    })
                    .collect(),
                days,
            }
        })
        .collect();
    PlanDraft { weeks }
}

fn gaps_summary(allocations: &[Allocation]) -> String {
    allocations
        .iter()
        .map(|a| {
            format!(
                "- {} ({:?} priority, {:?}, allocated {:.1}h): {}",
                a.gap.skill_name, a.gap.priority, a.gap.coverage, a.hours, a.gap.reason
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Persistence ────────────────────────────────────────────────────────────

/// The assembled plan returned to callers.
#[derive(Debug, serde::Serialize)]
pub struct PlanView {
    pub plan: StudyPlanRow,
    pub weeks: Vec<WeekView>,
}

#[derive(Debug, serde::Serialize)]
pub struct WeekView {
    pub week: WeekRow,
    pub days: Vec<DayView>,
}

#[derive(Debug, serde::Serialize)]
pub struct DayView {
    pub day: DayRow,
    pub tasks: Vec<TaskRow>,
}

pub struct SynthesisRequest {
    pub user_id: Uuid,
    pub weeks: i32,
    pub hours_per_week: f64,
    pub interview_date: Option<NaiveDate>,
}

fn validate_request(req: &SynthesisRequest, today: NaiveDate) -> Result<(), AppError> {
    if req.weeks < 1 || req.weeks > 52 {
        return Err(AppError::Validation(
            "weeks must be between 1 and 52".to_string(),
        ));
    }
    if req.hours_per_week <= 0.0 || req.hours_per_week > 80.0 {
        return Err(AppError::Validation(
            "hours_per_week must be between 0 and 80".to_string(),
        ));
    }
    if let Some(interview) = req.interview_date {
        if interview <= today {
            return Err(AppError::Validation(
                "interview_date must be in the future".to_string(),
            ));
        }
    }
    Ok(())
}

/// Synthesizes and persists a study plan for the user's current gap set.
/// The whole plan (plan, weeks, days, tasks) lands in one transaction.
pub async fn synthesize(
    pool: &PgPool,
    llm: &LlmClient,
    config: &Config,
    request: SynthesisRequest,
) -> Result<PlanView, AppError> {
    let today = chrono::Utc::now().date_naive();
    validate_request(&request, today)?;

    let gap_rows = store::gaps::gaps_for_user(pool, request.user_id).await?;
    if gap_rows.is_empty() {
        return Err(AppError::Validation(
            "No skill gaps found; run gap analysis before generating a plan".to_string(),
        ));
    }

    let skill_ids: Vec<Uuid> = gap_rows.iter().map(|g| g.skill_id).collect();
    let skills = store::skills::get_skills_by_ids(pool, &skill_ids).await?;
    let skills_by_id: HashMap<Uuid, _> =
        skills.into_iter().map(|s| (s.id, s)).collect();

    let summaries: Vec<GapSummary> = gap_rows
        .iter()
        .filter_map(|gap| {
            let skill = skills_by_id.get(&gap.skill_id)?;
            Some(GapSummary {
                skill_id: gap.skill_id,
                skill_name: skill.display_name.clone(),
                canonical_name: skill.canonical_name.clone(),
                priority: gap.priority,
                coverage: gap.coverage,
                required_confidence: gap.required_confidence,
                estimated_hours: gap.estimated_hours,
                reason: gap.reason.clone(),
            })
        })
        .collect();

    let constraints = PlanConstraints {
        weeks: request.weeks,
        hours_per_week: request.hours_per_week,
        interview_date: request.interview_date,
        start_date: today,
        tolerance: config.week_minute_tolerance,
    };

    let allocations = allocate_hours(&summaries, constraints.target_total_hours());
    if allocations.is_empty() {
        return Err(AppError::Validation(
            "All gaps are already covered; nothing to plan".to_string(),
        ));
    }
    let themes = group_into_weeks(&allocations, constraints.weeks);

    // canonical name -> display name, for resolving model-provided skills
    let known_skills: HashMap<String, String> = summaries
        .iter()
        .map(|s| (s.canonical_name.clone(), s.skill_name.clone()))
        .collect();

    let focus_dates = (1..=constraints.weeks)
        .map(|w| {
            let dates: Vec<String> = constraints
                .dates_for_week(w)
                .iter()
                .map(|d| d.to_string())
                .collect();
            format!("week {w}: [{}]", dates.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ");

    let prompt = plan_prompt(
        constraints.weeks,
        constraints.hours_per_week,
        &constraints.start_date.to_string(),
        &request
            .interview_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "not specified".to_string()),
        &gaps_summary(&allocations),
        &focus_dates,
    );

    let mut draft = match llm
        .call_json::<LlmPlan>(&prompt, PLAN_SYSTEM, config.generation_temperature)
        .await
    {
        Ok(plan) => draft_from_llm(plan, &constraints, &known_skills),
        Err(LlmError::Parse(e)) => {
            warn!("Plan output unparseable, using deterministic fallback: {e}");
            build_fallback_plan(&themes, &constraints)
        }
        Err(e) => return Err(e.into()),
    };

    sanitize_plan(&mut draft, &constraints);
    if draft.weeks.is_empty() {
        warn!("Model plan sanitized to nothing, using deterministic fallback");
        draft = build_fallback_plan(&themes, &constraints);
        sanitize_plan(&mut draft, &constraints);
    }

    // display name -> skill id, for task skill_refs
    let ids_by_name: HashMap<String, Uuid> = summaries
        .iter()
        .map(|s| (s.skill_name.clone(), s.skill_id))
        .collect();

    // Allocations are already priority-sorted, so this picks the most
    // urgent skills first.
    let mut focus_areas: Vec<String> = allocations
        .iter()
        .filter(|a| {
            matches!(a.gap.priority, GapPriority::Critical | GapPriority::High)
        })
        .map(|a| a.gap.skill_name.clone())
        .collect();
    focus_areas.truncate(5);

    let view = store::with_conflict_retry(|| {
        let draft = &draft;
        let focus_areas = &focus_areas;
        let ids_by_name = &ids_by_name;
        let request = &request;
        async move {
            let mut tx = pool.begin().await?;
            let plan = store::plans::insert_plan(
                &mut tx,
                request.user_id,
                request.weeks,
                request.hours_per_week,
                request.interview_date,
                focus_areas,
            )
            .await?;

            let mut week_views = Vec::with_capacity(draft.weeks.len());
            for week_draft in &draft.weeks {
                let week = store::plans::insert_week(
                    &mut tx,
                    plan.id,
                    week_draft.week_number,
                    &week_draft.theme,
                    &week_draft.focus_skills,
                )
                .await?;

                let mut day_views = Vec::with_capacity(week_draft.days.len());
                for day_draft in &week_draft.days {
                    let day_minutes: i32 =
                        day_draft.tasks.iter().map(|t| t.estimated_minutes).sum();
                    let day = store::plans::insert_day(
                        &mut tx,
                        week.id,
                        day_draft.day_number,
                        day_draft.date,
                        day_draft.theme.as_deref(),
                        day_minutes,
                    )
                    .await?;

                    let mut tasks = Vec::with_capacity(day_draft.tasks.len());
                    for task_draft in &day_draft.tasks {
                        let skill_ids: Vec<Uuid> = task_draft
                            .skill_names
                            .iter()
                            .filter_map(|n| ids_by_name.get(n).copied())
                            .collect();
                        let task = store::tasks::insert_task(
                            &mut tx,
                            &NewTask {
                                plan_id: plan.id,
                                day_id: day.id,
                                user_id: request.user_id,
                                date: day_draft.date,
                                task_type: task_draft.task_type,
                                title: task_draft.title.clone(),
                                description: task_draft.description.clone(),
                                skill_ids,
                                estimated_minutes: task_draft.estimated_minutes,
                                content: task_draft.content.clone(),
                            },
                        )
                        .await?;
                        tasks.push(task);
                    }
                    day_views.push(DayView { day, tasks });
                }
                week_views.push(WeekView {
                    week,
                    days: day_views,
                });
            }

            tx.commit().await?;
            Ok(PlanView {
                plan,
                weeks: week_views,
            })
        }
    })
    .await
    .map_err(store::conflict_to_app)?;

    info!(
        "Synthesized plan {} for user {} ({} weeks, {} tasks)",
        view.plan.id,
        request.user_id,
        view.weeks.len(),
        view.weeks
            .iter()
            .flat_map(|w| w.days.iter())
            .map(|d| d.tasks.len())
            .sum::<usize>()
    );
    Ok(view)
}

/// Loads a persisted plan back into the assembled view.
pub async fn load_plan_view(pool: &PgPool, plan_id: Uuid) -> Result<PlanView, AppError> {
    let plan = store::plans::get_plan(pool, plan_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Plan {plan_id} not found")))?;

    let weeks = store::plans::weeks_for_plan(pool, plan_id).await?;
    let tasks = store::tasks::tasks_for_plan(pool, plan_id).await?;
    let mut tasks_by_day: HashMap<Uuid, Vec<TaskRow>> = HashMap::new();
    for task in tasks {
        tasks_by_day.entry(task.day_id).or_default().push(task);
    }

    let mut week_views = Vec::with_capacity(weeks.len());
    for week in weeks {
        let days = store::plans::days_for_week(pool, week.id).await?;
        let day_views = days
            .into_iter()
            .map(|day| {
                let tasks = tasks_by_day.remove(&day.id).unwrap_or_default();
                DayView { day, tasks }
            })
            .collect();
        week_views.push(WeekView {
            week,
            days: day_views,
        });
    }

    Ok(PlanView {
        plan,
        weeks: week_views,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::skill::Coverage;

    #[test]
    fn test_parse_task_type_lenient() {
        assert_eq!(parse_task_type("learn"), TaskType::Learn);
        assert_eq!(parse_task_type(" Practice "), TaskType::Practice);
        assert_eq!(parse_task_type("REVIEW"), TaskType::Review);
        assert_eq!(parse_task_type("quiz"), TaskType::Learn);
    }

    #[test]
    fn test_validate_rejects_bad_constraints() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let req = |weeks, hours, interview| SynthesisRequest {
            user_id: Uuid::new_v4(),
            weeks,
            hours_per_week: hours,
            interview_date: interview,
        };
        assert!(validate_request(&req(0, 10.0, None), today).is_err());
        assert!(validate_request(&req(4, 0.0, None), today).is_err());
        assert!(validate_request(&req(4, 10.0, Some(today)), today).is_err());
        assert!(validate_request(
            &req(4, 10.0, Some(today + chrono::Duration::days(30))),
            today
        )
        .is_ok());
    }

    #[test]
    fn test_draft_from_llm_drops_orphan_skills() {
        let constraints = PlanConstraints {
            weeks: 1,
            hours_per_week: 10.0,
            interview_date: None,
            start_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            tolerance: 0.10,
        };
        let mut known = HashMap::new();
        known.insert("kubernetes".to_string(), "Kubernetes".to_string());

        let plan = LlmPlan {
            weeks: vec![LlmWeek {
                week_number: 1,
                theme: "w1".into(),
                focus_skills: vec!["Kubernetes".into(), "Basket Weaving".into()],
                days: vec![LlmDay {
                    day_number: 1,
                    date: Some("2025-03-03".into()),
                    theme: None,
                    tasks: vec![LlmTask {
                        task_type: "learn".into(),
                        title: "t".into(),
                        description: String::new(),
                        skill_names: vec!["kubernetes".into(), "Unknown Skill".into()],
                        estimated_minutes: 60,
                        content: None,
                    }],
                }],
            }],
        };
        let draft = draft_from_llm(plan, &constraints, &known);
        assert_eq!(draft.weeks[0].focus_skills, vec!["Kubernetes"]);
        assert_eq!(draft.weeks[0].days[0].tasks[0].skill_names, vec!["Kubernetes"]);
    }

    #[test]
    fn test_draft_from_llm_falls_back_on_bad_date() {
        let constraints = PlanConstraints {
            weeks: 2,
            hours_per_week: 10.0,
            interview_date: None,
            start_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            tolerance: 0.10,
        };
        let plan = LlmPlan {
            weeks: vec![LlmWeek {
                week_number: 2,
                theme: "w2".into(),
                focus_skills: vec![],
                days: vec![LlmDay {
                    day_number: 3,
                    date: Some("not-a-date".into()),
                    theme: None,
                    tasks: vec![],
                }],
            }],
        };
        let draft = draft_from_llm(plan, &constraints, &HashMap::new());
        // week 2, day 3 -> start + 7 + 2 days
        assert_eq!(
            draft.weeks[0].days[0].date,
            NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
        );
    }

    #[test]
    fn test_gaps_summary_lists_each_allocation() {
        let allocations = vec![Allocation {
            gap: GapSummary {
                skill_id: Uuid::new_v4(),
                skill_name: "Kubernetes".into(),
                canonical_name: "kubernetes".into(),
                priority: GapPriority::Critical,
                coverage: Coverage::Missing,
                required_confidence: 0.85,
                estimated_hours: 40.0,
                reason: "required by the JD".into(),
            },
            hours: 12.0,
        }];
        let summary = gaps_summary(&allocations);
        assert!(summary.contains("Kubernetes"));
        assert!(summary.contains("12.0h"));
    }
}
