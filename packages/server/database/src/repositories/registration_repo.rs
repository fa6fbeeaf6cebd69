use crate::models::Registration;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Result, Transaction};

pub struct NewRegistration {
    pub submission_id: String,
    pub object_id: Option<String>,
    pub service: String,
    pub external_id: String,
    pub meta: Value,
}

pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A publish step is idempotent: calling this twice for the same
    /// `(submission_id, object_id, service)` must be a no-op on the second
    /// call, not a duplicate row (spec §4.D). Callers check `find` first and
    /// only call `create` when nothing was returned, inside the submission's
    /// transaction lock.
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        new: NewRegistration,
    ) -> Result<Registration> {
        sqlx::query_as::<_, Registration>(
            r#"
            INSERT INTO registrations (submission_id, object_id, service, external_id, meta)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&new.submission_id)
        .bind(&new.object_id)
        .bind(&new.service)
        .bind(&new.external_id)
        .bind(&new.meta)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find(
        &self,
        submission_id: &str,
        object_id: Option<&str>,
        service: &str,
    ) -> Result<Option<Registration>> {
        sqlx::query_as::<_, Registration>(
            r#"
            SELECT * FROM registrations
            WHERE submission_id = $1
              AND object_id IS NOT DISTINCT FROM $2
              AND service = $3
            "#,
        )
        .bind(submission_id)
        .bind(object_id)
        .bind(service)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_tx(
        tx: &mut Transaction<'_, Postgres>,
        submission_id: &str,
        object_id: Option<&str>,
        service: &str,
    ) -> Result<Option<Registration>> {
        sqlx::query_as::<_, Registration>(
            r#"
            SELECT * FROM registrations
            WHERE submission_id = $1
              AND object_id IS NOT DISTINCT FROM $2
              AND service = $3
            "#,
        )
        .bind(submission_id)
        .bind(object_id)
        .bind(service)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn list_by_submission(&self, submission_id: &str) -> Result<Vec<Registration>> {
        sqlx::query_as::<_, Registration>(
            "SELECT * FROM registrations WHERE submission_id = $1 ORDER BY created",
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::submission_repo::{NewSubmission, SubmissionRepository};
    use serde_json::json;

    #[sqlx::test(migrations = "src/migrations")]
    async fn second_registration_for_same_service_is_rejected(pool: PgPool) -> Result<()> {
        let subs = SubmissionRepository::new(pool.clone());
        let submission = subs
            .create(NewSubmission {
                submission_id: uuid::Uuid::new_v4().to_string(),
                project_id: "PRJ1".into(),
                workflow: "FEGA".into(),
                name: "pub-test".into(),
                title: None,
                description: None,
            })
            .await?;

        let mut tx = pool.begin().await?;
        RegistrationRepository::create_tx(
            &mut tx,
            NewRegistration {
                submission_id: submission.submission_id.clone(),
                object_id: None,
                service: "doi".into(),
                external_id: "10.1234/abcd".into(),
                meta: json!({}),
            },
        )
        .await?;
        tx.commit().await?;

        // The orchestrator checks `find`/`find_tx` before calling create_tx, but the
        // unique partial index is the real backstop if two workers race.
        let existing = RegistrationRepository::new(pool.clone())
            .find(&submission.submission_id, None, "doi")
            .await?;
        assert!(existing.is_some());

        let mut tx2 = pool.begin().await?;
        let duplicate = RegistrationRepository::create_tx(
            &mut tx2,
            NewRegistration {
                submission_id: submission.submission_id,
                object_id: None,
                service: "doi".into(),
                external_id: "10.1234/efgh".into(),
                meta: json!({}),
            },
        )
        .await;
        assert!(duplicate.is_err());
        Ok(())
    }
}
