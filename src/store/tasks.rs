use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::plan::{TaskContent, TaskRow, TaskStatus, TaskType};

pub struct NewTask {
    pub plan_id: Uuid,
    pub day_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub task_type: TaskType,
    pub title: String,
    pub description: String,
    pub skill_ids: Vec<Uuid>,
    pub estimated_minutes: i32,
    pub content: TaskContent,
}

pub async fn insert_task(
    tx: &mut Transaction<'_, Postgres>,
    task: &NewTask,
) -> Result<TaskRow, sqlx::Error> {
    sqlx::query_as::<_, TaskRow>(
        r#"
        INSERT INTO tasks
            (id, plan_id, day_id, user_id, date, task_type, title, description,
             skill_ids, estimated_minutes, status, content)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(task.plan_id)
    .bind(task.day_id)
    .bind(task.user_id)
    .bind(task.date)
    .bind(task.task_type)
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.skill_ids)
    .bind(task.estimated_minutes)
    .bind(Json(task.content.clone()))
    .fetch_one(&mut **tx)
    .await
}

pub async fn get_task(pool: &PgPool, task_id: Uuid) -> Result<Option<TaskRow>, sqlx::Error> {
    sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(pool)
        .await
}

/// All tasks a user has scheduled on one date.
pub async fn tasks_for_user_on(
    pool: &PgPool,
    user_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<TaskRow>, sqlx::Error> {
    sqlx::query_as::<_, TaskRow>(
        "SELECT * FROM tasks WHERE user_id = $1 AND date = $2 ORDER BY created_at, id",
    )
    .bind(user_id)
    .bind(date)
    .fetch_all(pool)
    .await
}

/// Pending or in-progress tasks dated before `before`.
pub async fn overdue_tasks(
    pool: &PgPool,
    user_id: Uuid,
    before: NaiveDate,
) -> Result<Vec<TaskRow>, sqlx::Error> {
    sqlx::query_as::<_, TaskRow>(
        r#"
        SELECT * FROM tasks
        WHERE user_id = $1 AND date < $2 AND status IN ('pending', 'in_progress')
        ORDER BY date, created_at
        "#,
    )
    .bind(user_id)
    .bind(before)
    .fetch_all(pool)
    .await
}

pub async fn tasks_for_plan(pool: &PgPool, plan_id: Uuid) -> Result<Vec<TaskRow>, sqlx::Error> {
    sqlx::query_as::<_, TaskRow>(
        "SELECT * FROM tasks WHERE plan_id = $1 ORDER BY date, created_at, id",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
}

/// Not-yet-finished tasks on or after `from`, date ascending. Run inside the
/// adaptive transaction so the analysis and the mutation see one snapshot.
pub async fn upcoming_tasks<'e>(
    executor: impl PgExecutor<'e>,
    plan_id: Uuid,
    from: NaiveDate,
) -> Result<Vec<TaskRow>, sqlx::Error> {
    sqlx::query_as::<_, TaskRow>(
        r#"
        SELECT * FROM tasks
        WHERE plan_id = $1 AND date >= $2 AND status NOT IN ('completed', 'skipped')
        ORDER BY date, created_at, id
        "#,
    )
    .bind(plan_id)
    .bind(from)
    .fetch_all(executor)
    .await
}

pub async fn update_status(
    pool: &PgPool,
    task_id: Uuid,
    status: TaskStatus,
    actual_minutes: Option<i32>,
) -> Result<TaskRow, sqlx::Error> {
    sqlx::query_as::<_, TaskRow>(
        r#"
        UPDATE tasks
        SET status = $2,
            completed_at = CASE WHEN $2 = 'completed' THEN COALESCE(completed_at, now()) ELSE NULL END,
            actual_minutes = COALESCE($3, actual_minutes)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(task_id)
    .bind(status)
    .bind(actual_minutes)
    .fetch_one(pool)
    .await
}

pub async fn set_date<'e>(
    executor: impl PgExecutor<'e>,
    task_id: Uuid,
    date: NaiveDate,
) -> Result<TaskRow, sqlx::Error> {
    sqlx::query_as::<_, TaskRow>("UPDATE tasks SET date = $2 WHERE id = $1 RETURNING *")
        .bind(task_id)
        .bind(date)
        .fetch_one(executor)
        .await
}

pub async fn set_content(
    tx: &mut Transaction<'_, Postgres>,
    task_id: Uuid,
    content: &TaskContent,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE tasks SET content = $2 WHERE id = $1")
        .bind(task_id)
        .bind(Json(content.clone()))
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Scheduled minutes per date over a date range, for load-aware placement.
pub async fn minutes_by_date(
    pool: &PgPool,
    user_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<(NaiveDate, i64, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (NaiveDate, i64, i64)>(
        r#"
        SELECT date, COUNT(*) AS task_count, COALESCE(SUM(estimated_minutes), 0) AS minutes
        FROM tasks
        WHERE user_id = $1 AND date >= $2 AND date < $3
          AND status NOT IN ('completed', 'skipped')
        GROUP BY date
        ORDER BY date
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}
