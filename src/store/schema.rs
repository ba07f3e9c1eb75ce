use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

/// Idempotent startup DDL. Every statement is `IF NOT EXISTS` so repeated
/// boots are safe against an existing database.
const DDL: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS documents (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id),
        kind TEXT NOT NULL,
        content TEXT NOT NULL,
        sections JSONB NOT NULL DEFAULT '[]',
        chunks JSONB NOT NULL DEFAULT '[]',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS skills (
        id UUID PRIMARY KEY,
        canonical_name TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        category TEXT NOT NULL,
        parent_skill_id UUID REFERENCES skills(id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS skill_evidence (
        id UUID PRIMARY KEY,
        document_id UUID NOT NULL REFERENCES documents(id),
        skill_id UUID NOT NULL REFERENCES skills(id),
        snippet_text TEXT NOT NULL,
        section_name TEXT,
        confidence DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_evidence_document_skill
        ON skill_evidence(document_id, skill_id)"#,
    r#"CREATE TABLE IF NOT EXISTS gaps (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id),
        skill_id UUID NOT NULL REFERENCES skills(id),
        required_confidence DOUBLE PRECISION NOT NULL,
        coverage TEXT NOT NULL,
        priority TEXT NOT NULL,
        reason TEXT NOT NULL,
        estimated_hours DOUBLE PRECISION NOT NULL,
        evidence_refs UUID[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_gaps_user ON gaps(user_id)"#,
    r#"CREATE TABLE IF NOT EXISTS study_plans (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id),
        weeks_count INTEGER NOT NULL,
        hours_per_week DOUBLE PRECISION NOT NULL,
        interview_date DATE,
        focus_areas TEXT[] NOT NULL DEFAULT '{}',
        diff_log JSONB NOT NULL DEFAULT '[]',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS weeks (
        id UUID PRIMARY KEY,
        plan_id UUID NOT NULL REFERENCES study_plans(id),
        week_number INTEGER NOT NULL,
        theme TEXT NOT NULL,
        focus_skills TEXT[] NOT NULL DEFAULT '{}',
        UNIQUE (plan_id, week_number)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS days (
        id UUID PRIMARY KEY,
        week_id UUID NOT NULL REFERENCES weeks(id),
        day_number INTEGER NOT NULL,
        date DATE NOT NULL,
        theme TEXT,
        estimated_minutes INTEGER NOT NULL DEFAULT 0,
        UNIQUE (week_id, date)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS tasks (
        id UUID PRIMARY KEY,
        plan_id UUID NOT NULL REFERENCES study_plans(id),
        day_id UUID NOT NULL REFERENCES days(id),
        user_id UUID NOT NULL REFERENCES users(id),
        date DATE NOT NULL,
        task_type TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        skill_ids UUID[] NOT NULL DEFAULT '{}',
        estimated_minutes INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        content JSONB NOT NULL DEFAULT '{}',
        completed_at TIMESTAMPTZ,
        actual_minutes INTEGER,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_tasks_user_date ON tasks(user_id, date)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_tasks_plan_status ON tasks(plan_id, status)"#,
    r#"CREATE TABLE IF NOT EXISTS rubrics (
        id UUID PRIMARY KEY,
        practice_type TEXT NOT NULL UNIQUE,
        criteria JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS practice_items (
        id UUID PRIMARY KEY,
        task_id UUID REFERENCES tasks(id),
        item_type TEXT NOT NULL,
        title TEXT NOT NULL,
        question TEXT NOT NULL,
        expected_answer TEXT,
        skill_ids UUID[] NOT NULL DEFAULT '{}',
        difficulty TEXT NOT NULL,
        content JSONB NOT NULL,
        rubric_id UUID NOT NULL REFERENCES rubrics(id),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS attempts (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id),
        practice_item_id UUID NOT NULL REFERENCES practice_items(id),
        task_id UUID REFERENCES tasks(id),
        answer TEXT NOT NULL,
        time_spent_seconds INTEGER,
        submitted_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS evaluations (
        id UUID PRIMARY KEY,
        attempt_id UUID NOT NULL UNIQUE REFERENCES attempts(id),
        rubric_id UUID NOT NULL REFERENCES rubrics(id),
        overall_score DOUBLE PRECISION NOT NULL,
        criterion_scores JSONB NOT NULL DEFAULT '{}',
        strengths TEXT[] NOT NULL DEFAULT '{}',
        weaknesses TEXT[] NOT NULL DEFAULT '{}',
        feedback TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS mastery (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id),
        skill_id UUID NOT NULL REFERENCES skills(id),
        score DOUBLE PRECISION NOT NULL,
        last_practiced TIMESTAMPTZ,
        practice_count INTEGER NOT NULL DEFAULT 0,
        trend TEXT NOT NULL DEFAULT 'stable',
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (user_id, skill_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS calendar_events (
        id UUID PRIMARY KEY,
        plan_id UUID NOT NULL REFERENCES study_plans(id),
        task_id UUID NOT NULL UNIQUE REFERENCES tasks(id),
        start_at TIMESTAMPTZ NOT NULL,
        end_at TIMESTAMPTZ NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        sync_uid TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
];

pub async fn init(pool: &PgPool) -> Result<()> {
    for statement in DDL {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database schema initialized ({} statements)", DDL.len());
    Ok(())
}
