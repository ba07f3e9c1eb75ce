use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::plan::{DayRow, PlanDiffEntry, StudyPlanRow, WeekRow};

pub async fn insert_plan(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    weeks_count: i32,
    hours_per_week: f64,
    interview_date: Option<NaiveDate>,
    focus_areas: &[String],
) -> Result<StudyPlanRow, sqlx::Error> {
    sqlx::query_as::<_, StudyPlanRow>(
        r#"
        INSERT INTO study_plans
            (id, user_id, weeks_count, hours_per_week, interview_date, focus_areas)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(weeks_count)
    .bind(hours_per_week)
    .bind(interview_date)
    .bind(focus_areas)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_week(
    tx: &mut Transaction<'_, Postgres>,
    plan_id: Uuid,
    week_number: i32,
    theme: &str,
    focus_skills: &[String],
) -> Result<WeekRow, sqlx::Error> {
    sqlx::query_as::<_, WeekRow>(
        r#"
        INSERT INTO weeks (id, plan_id, week_number, theme, focus_skills)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(plan_id)
    .bind(week_number)
    .bind(theme)
    .bind(focus_skills)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_day(
    tx: &mut Transaction<'_, Postgres>,
    week_id: Uuid,
    day_number: i32,
    date: NaiveDate,
    theme: Option<&str>,
    estimated_minutes: i32,
) -> Result<DayRow, sqlx::Error> {
    sqlx::query_as::<_, DayRow>(
        r#"
        INSERT INTO days (id, week_id, day_number, date, theme, estimated_minutes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(week_id)
    .bind(day_number)
    .bind(date)
    .bind(theme)
    .bind(estimated_minutes)
    .fetch_one(&mut **tx)
    .await
}

pub async fn get_plan(pool: &PgPool, plan_id: Uuid) -> Result<Option<StudyPlanRow>, sqlx::Error> {
    sqlx::query_as::<_, StudyPlanRow>("SELECT * FROM study_plans WHERE id = $1")
        .bind(plan_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_plan_for_user(
    pool: &PgPool,
    plan_id: Uuid,
    user_id: Uuid,
) -> Result<Option<StudyPlanRow>, sqlx::Error> {
    sqlx::query_as::<_, StudyPlanRow>(
        "SELECT * FROM study_plans WHERE id = $1 AND user_id = $2",
    )
    .bind(plan_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// The user's active plan: the most recently created one.
pub async fn active_plan_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<StudyPlanRow>, sqlx::Error> {
    sqlx::query_as::<_, StudyPlanRow>(
        "SELECT * FROM study_plans WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn weeks_for_plan(pool: &PgPool, plan_id: Uuid) -> Result<Vec<WeekRow>, sqlx::Error> {
    sqlx::query_as::<_, WeekRow>(
        "SELECT * FROM weeks WHERE plan_id = $1 ORDER BY week_number",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
}

pub async fn days_for_week(pool: &PgPool, week_id: Uuid) -> Result<Vec<DayRow>, sqlx::Error> {
    sqlx::query_as::<_, DayRow>("SELECT * FROM days WHERE week_id = $1 ORDER BY day_number")
        .bind(week_id)
        .fetch_all(pool)
        .await
}

/// Appends one diff entry to the plan's log. Part of the adaptive-apply
/// transaction so the log and the task changes land together.
pub async fn append_diff_entry(
    tx: &mut Transaction<'_, Postgres>,
    plan_id: Uuid,
    entry: &PlanDiffEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE study_plans SET diff_log = diff_log || $2 WHERE id = $1")
        .bind(plan_id)
        .bind(Json(vec![entry.clone()]))
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Finds the day row holding `date`, creating the enclosing week and the day
/// if the planner never scheduled anything there. Used by adaptive insertion.
pub async fn find_or_create_day(
    tx: &mut Transaction<'_, Postgres>,
    plan: &StudyPlanRow,
    date: NaiveDate,
) -> Result<DayRow, sqlx::Error> {
    let start = plan.window_start();
    let week_number = ((date - start).num_days() / 7 + 1).max(1) as i32;

    let week = sqlx::query_as::<_, WeekRow>(
        "SELECT * FROM weeks WHERE plan_id = $1 AND week_number = $2",
    )
    .bind(plan.id)
    .bind(week_number)
    .fetch_optional(&mut **tx)
    .await?;

    let week = match week {
        Some(w) => w,
        None => {
            sqlx::query_as::<_, WeekRow>(
                r#"
                INSERT INTO weeks (id, plan_id, week_number, theme, focus_skills)
                VALUES ($1, $2, $3, 'Adaptive reinforcement', '{}')
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(plan.id)
            .bind(week_number)
            .fetch_one(&mut **tx)
            .await?
        }
    };

    let day = sqlx::query_as::<_, DayRow>(
        "SELECT * FROM days WHERE week_id = $1 AND date = $2",
    )
    .bind(week.id)
    .bind(date)
    .fetch_optional(&mut **tx)
    .await?;

    match day {
        Some(d) => Ok(d),
        None => {
            let week_start = start + chrono::Duration::days((week_number as i64 - 1) * 7);
            let day_number = ((date - week_start).num_days() + 1).clamp(1, 7) as i32;
            sqlx::query_as::<_, DayRow>(
                r#"
                INSERT INTO days (id, week_id, day_number, date, theme, estimated_minutes)
                VALUES ($1, $2, $3, $4, 'Reinforcement', 0)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(week.id)
            .bind(day_number)
            .bind(date)
            .fetch_one(&mut **tx)
            .await
        }
    }
}
