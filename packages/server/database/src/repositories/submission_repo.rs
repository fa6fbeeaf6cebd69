use crate::models::Submission;
use chrono::Utc;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Result, Transaction};

pub struct NewSubmission {
    pub submission_id: String,
    pub project_id: String,
    pub workflow: String,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Fields a `PATCH /submissions/{id}` may touch directly (metadata/rems go
/// through `update_metadata` since they deep-merge rather than overwrite).
#[derive(Default)]
pub struct SubmissionPatch {
    pub name: Option<String>,
    pub title: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub bucket: Option<Option<String>>,
}

pub struct SubmissionRepository {
    pool: PgPool,
}

impl SubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewSubmission) -> Result<Submission> {
        sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions (submission_id, project_id, workflow, name, title, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&new.submission_id)
        .bind(&new.project_id)
        .bind(&new.workflow)
        .bind(&new.name)
        .bind(&new.title)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Submission>> {
        sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE submission_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_name(&self, project_id: &str, name: &str) -> Result<Option<Submission>> {
        sqlx::query_as::<_, Submission>(
            "SELECT * FROM submissions WHERE project_id = $1 AND name = $2",
        )
        .bind(project_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_by_project(&self, project_id: &str) -> Result<Vec<Submission>> {
        sqlx::query_as::<_, Submission>(
            "SELECT * FROM submissions WHERE project_id = $1 ORDER BY created DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Submissions currently in the derived `ingesting` state (spec §4.J):
    /// ingest started, not yet published. The poller's per-tick work list.
    pub async fn list_ingesting(&self) -> Result<Vec<Submission>> {
        sqlx::query_as::<_, Submission>(
            "SELECT * FROM submissions WHERE ingest_started_at IS NOT NULL AND published_at IS NULL ORDER BY ingest_started_at",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update_fields(&self, id: &str, patch: SubmissionPatch) -> Result<Submission> {
        sqlx::query_as::<_, Submission>(
            r#"
            UPDATE submissions SET
                name        = COALESCE($2, name),
                title       = CASE WHEN $3 THEN $4 ELSE title END,
                description = CASE WHEN $5 THEN $6 ELSE description END,
                bucket      = CASE WHEN $7 THEN $8 ELSE bucket END,
                modified    = now()
            WHERE submission_id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(patch.title.is_some())
        .bind(patch.title.flatten())
        .bind(patch.description.is_some())
        .bind(patch.description.flatten())
        .bind(patch.bucket.is_some())
        .bind(patch.bucket.flatten())
        .fetch_one(&self.pool)
        .await
    }

    pub async fn update_metadata(&self, id: &str, metadata: Value, rems: Value) -> Result<Submission> {
        sqlx::query_as::<_, Submission>(
            "UPDATE submissions SET metadata = $2, rems = $3, modified = now() WHERE submission_id = $1 RETURNING *",
        )
        .bind(id)
        .bind(metadata)
        .bind(rems)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM submissions WHERE submission_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Row-lock used at the start of any mutation touching a submission or
    /// its children (spec §5). Must run inside `tx`.
    pub async fn lock_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: &str,
    ) -> Result<Option<Submission>> {
        sqlx::query_as::<_, Submission>(
            "SELECT * FROM submissions WHERE submission_id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Non-blocking variant of `lock_for_update` (spec §5: "the poller
    /// skips a submission on lock contention and retries next tick").
    /// Returns `Ok(None)` both when the row is missing and when it is
    /// already locked by a concurrent mutation (Postgres `55P03`).
    pub async fn try_lock_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: &str,
    ) -> Result<Option<Submission>> {
        match sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE submission_id = $1 FOR UPDATE NOWAIT")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
        {
            Ok(row) => Ok(row),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("55P03") => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn set_published_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: &str,
    ) -> Result<Submission> {
        sqlx::query_as::<_, Submission>(
            "UPDATE submissions SET published_at = $2, modified = now() WHERE submission_id = $1 RETURNING *",
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await
    }

    /// Marks ingest as started (`draft`/`files-pending` -> `ingesting`, spec
    /// §4.E). Must run inside the submission's row lock.
    pub async fn start_ingest_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: &str,
    ) -> Result<Submission> {
        sqlx::query_as::<_, Submission>(
            "UPDATE submissions SET ingest_started_at = now(), modified = now() WHERE submission_id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn set_announced_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: &str,
    ) -> Result<Submission> {
        sqlx::query_as::<_, Submission>(
            "UPDATE submissions SET announced_at = $2, modified = now() WHERE submission_id = $1 RETURNING *",
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await
    }
}
