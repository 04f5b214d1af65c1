use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::memory::{
    CandidateEvent, CandidateProfile, FinalDecision, MemoryError, MemoryStore, RoleProfile,
};

const SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS candidate_profiles (
        candidate_id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        role TEXT NOT NULL,
        last_outcome TEXT,
        strengths TEXT[] NOT NULL DEFAULT '{}',
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS candidate_events (
        id BIGSERIAL PRIMARY KEY,
        candidate_id UUID NOT NULL,
        run_id UUID NOT NULL,
        stage TEXT NOT NULL,
        agent TEXT NOT NULL,
        inputs_hash TEXT NOT NULL,
        score DOUBLE PRECISION NOT NULL,
        decision TEXT NOT NULL,
        confidence DOUBLE PRECISION NOT NULL,
        artifacts JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS candidate_events_candidate_idx ON candidate_events (candidate_id, created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS role_profiles (
        role TEXT PRIMARY KEY,
        rubric_version INTEGER NOT NULL DEFAULT 1,
        competency_weights JSONB NOT NULL DEFAULT '{}'::jsonb,
        common_rejection_reasons TEXT[] NOT NULL DEFAULT '{}',
        top_performer_patterns TEXT[] NOT NULL DEFAULT '{}',
        notes TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS final_decisions (
        candidate_id UUID NOT NULL,
        role TEXT NOT NULL,
        candidate_name TEXT NOT NULL,
        final_status TEXT NOT NULL,
        next_action TEXT NOT NULL,
        decided_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (candidate_id, role)
    )
    "#,
];

/// `MemoryStore` backed by PostgreSQL.
pub struct PgMemoryStore {
    pool: PgPool,
}

impl PgMemoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the memory tables if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), MemoryError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Memory schema ready");
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for PgMemoryStore {
    async fn candidate_profile(
        &self,
        candidate_id: Uuid,
    ) -> Result<Option<CandidateProfile>, MemoryError> {
        Ok(sqlx::query_as::<_, CandidateProfile>(
            "SELECT candidate_id, name, role, last_outcome, strengths, updated_at FROM candidate_profiles WHERE candidate_id = $1",
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn recent_events(
        &self,
        candidate_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CandidateEvent>, MemoryError> {
        Ok(sqlx::query_as::<_, CandidateEvent>(
            r#"
            SELECT candidate_id, run_id, stage, agent, inputs_hash, score, decision,
                   confidence, artifacts, created_at
            FROM candidate_events
            WHERE candidate_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(candidate_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn role_profile(&self, role: &str) -> Result<Option<RoleProfile>, MemoryError> {
        Ok(sqlx::query_as::<_, RoleProfile>(
            r#"
            SELECT role, rubric_version, competency_weights, common_rejection_reasons,
                   top_performer_patterns, notes
            FROM role_profiles
            WHERE role = $1
            "#,
        )
        .bind(role)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert_candidate_profile(&self, profile: &CandidateProfile) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            INSERT INTO candidate_profiles (candidate_id, name, role, last_outcome, strengths, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (candidate_id) DO UPDATE SET
                name = EXCLUDED.name,
                role = EXCLUDED.role,
                last_outcome = EXCLUDED.last_outcome,
                strengths = EXCLUDED.strengths,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(profile.candidate_id)
        .bind(&profile.name)
        .bind(&profile.role)
        .bind(&profile.last_outcome)
        .bind(&profile.strengths)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_event(&self, event: &CandidateEvent) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            INSERT INTO candidate_events
                (candidate_id, run_id, stage, agent, inputs_hash, score, decision,
                 confidence, artifacts, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(event.candidate_id)
        .bind(event.run_id)
        .bind(&event.stage)
        .bind(&event.agent)
        .bind(&event.inputs_hash)
        .bind(event.score)
        .bind(&event.decision)
        .bind(event.confidence)
        .bind(&event.artifacts)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_role_profile(&self, profile: &RoleProfile) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            INSERT INTO role_profiles
                (role, rubric_version, competency_weights, common_rejection_reasons,
                 top_performer_patterns, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (role) DO UPDATE SET
                rubric_version = EXCLUDED.rubric_version,
                competency_weights = EXCLUDED.competency_weights,
                common_rejection_reasons = EXCLUDED.common_rejection_reasons,
                top_performer_patterns = EXCLUDED.top_performer_patterns,
                notes = EXCLUDED.notes
            "#,
        )
        .bind(&profile.role)
        .bind(profile.rubric_version)
        .bind(&profile.competency_weights)
        .bind(&profile.common_rejection_reasons)
        .bind(&profile.top_performer_patterns)
        .bind(&profile.notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_final_decision(&self, decision: &FinalDecision) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            INSERT INTO final_decisions
                (candidate_id, role, candidate_name, final_status, next_action, decided_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (candidate_id, role) DO UPDATE SET
                candidate_name = EXCLUDED.candidate_name,
                final_status = EXCLUDED.final_status,
                next_action = EXCLUDED.next_action,
                decided_at = EXCLUDED.decided_at
            "#,
        )
        .bind(decision.candidate_id)
        .bind(&decision.role)
        .bind(&decision.candidate_name)
        .bind(&decision.final_status)
        .bind(&decision.next_action)
        .bind(decision.decided_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
