use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

pub use sqlx; // Re-export for convenience, matches the teacher's convention
pub mod models;
pub mod repositories;

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    /// Connects to PostgreSQL with production-ready pool settings. `max_connections`
    /// is the caller's `DB_MAX_CONNECTIONS` config knob (spec §5 backpressure).
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Arc<Self>> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(5.min(max_connections))
            .acquire_timeout(Duration::from_secs(3)) // fail fast -> caller maps to 503
            .idle_timeout(Duration::from_secs(60 * 5))
            .test_before_acquire(true)
            .connect(database_url)
            .await
            .context("failed to connect to the database")?;

        Ok(Arc::new(Self { pool }))
    }

    /// Runs pending migrations. Safe to run on startup due to Postgres advisory locks.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("src/migrations")
            .run(&self.pool)
            .await
            .context("failed to run database migrations")?;

        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("database health check failed")?;
        Ok(())
    }

    /// Starts a transaction. Used by services that must lock a submission row
    /// (`SubmissionRepository::lock_for_update`) and write its children
    /// atomically (spec §5).
    pub async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Postgres>> {
        self.pool.begin().await.context("failed to begin transaction")
    }
}

#[cfg(test)]
mod tests {
    use super::repositories::{NewSubmission, SubmissionRepository};

    #[sqlx::test(migrations = "src/migrations")]
    async fn create_and_fetch_submission(pool: sqlx::PgPool) -> sqlx::Result<()> {
        let repo = SubmissionRepository::new(pool);
        let created = repo
            .create(NewSubmission {
                submission_id: "11111111-1111-4111-8111-111111111111".into(),
                project_id: "PRJ1".into(),
                workflow: "FEGA".into(),
                name: "my-submission".into(),
                title: None,
                description: None,
            })
            .await?;
        assert_eq!(created.name, "my-submission");
        assert!(!created.is_frozen());

        let fetched = repo.get(&created.submission_id).await?.unwrap();
        assert_eq!(fetched.submission_id, created.submission_id);
        Ok(())
    }

    #[sqlx::test(migrations = "src/migrations")]
    async fn duplicate_name_in_project_is_rejected(pool: sqlx::PgPool) -> sqlx::Result<()> {
        let repo = SubmissionRepository::new(pool);
        let new = || NewSubmission {
            submission_id: uuid::Uuid::new_v4().to_string(),
            project_id: "PRJ1".into(),
            workflow: "FEGA".into(),
            name: "dup".into(),
            title: None,
            description: None,
        };
        repo.create(new()).await?;
        let second = repo.create(new()).await;
        assert!(second.is_err());
        Ok(())
    }
}
