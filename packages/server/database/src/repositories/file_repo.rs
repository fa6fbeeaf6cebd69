use crate::models::File;
use sqlx::{PgPool, Postgres, Result, Transaction};

pub struct NewFile {
    pub accession_id: String,
    pub submission_id: String,
    pub project_id: String,
    pub path: String,
    pub bytes: i64,
    pub version: i32,
}

pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewFile) -> Result<File> {
        sqlx::query_as::<_, File>(
            r#"
            INSERT INTO files (accession_id, submission_id, project_id, path, bytes, version)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&new.accession_id)
        .bind(&new.submission_id)
        .bind(&new.project_id)
        .bind(&new.path)
        .bind(new.bytes)
        .bind(new.version)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get(&self, accession_id: &str) -> Result<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE accession_id = $1")
            .bind(accession_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// The one non-tombstoned row for `(submission_id, path)`, if any (spec §3).
    pub async fn find_active(&self, submission_id: &str, path: &str) -> Result<Option<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE submission_id = $1 AND path = $2 AND NOT tombstoned",
        )
        .bind(submission_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_by_submission(&self, submission_id: &str) -> Result<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE submission_id = $1 AND NOT tombstoned ORDER BY created",
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Latest (non-tombstoned) version of every path registered under a project.
    pub async fn list_by_project(&self, project_id: &str) -> Result<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE project_id = $1 AND NOT tombstoned ORDER BY created",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_pending_ingest(&self, limit: i64) -> Result<Vec<File>> {
        sqlx::query_as::<_, File>(
            r#"
            SELECT * FROM files
            WHERE ingest_status IN ('added', 'ready') AND NOT tombstoned
            ORDER BY modified
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Supersedes the current active file at `path` (marks it tombstoned) so a
    /// re-upload can be inserted as the next `version` without violating the
    /// active-path uniqueness index. Must run inside the submission's lock.
    pub async fn tombstone_tx(
        tx: &mut Transaction<'_, Postgres>,
        accession_id: &str,
    ) -> Result<()> {
        sqlx::query("UPDATE files SET tombstoned = true, modified = now() WHERE accession_id = $1")
            .bind(accession_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn set_unencrypted_checksum(
        &self,
        accession_id: &str,
        checksum_type: &str,
        value: &str,
    ) -> Result<File> {
        sqlx::query_as::<_, File>(
            r#"
            UPDATE files SET
                checksum_unencrypted_type = $2,
                checksum_unencrypted_value = $3,
                ingest_status = 'ready',
                modified = now()
            WHERE accession_id = $1
            RETURNING *
            "#,
        )
        .bind(accession_id)
        .bind(checksum_type)
        .bind(value)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn set_encrypted_checksum(
        &self,
        accession_id: &str,
        checksum_type: &str,
        encrypted_value: &str,
    ) -> Result<File> {
        sqlx::query_as::<_, File>(
            r#"
            UPDATE files SET
                checksum_encrypted_type = $2,
                checksum_encrypted_value = $3,
                ingest_status = 'verified',
                modified = now()
            WHERE accession_id = $1
            RETURNING *
            "#,
        )
        .bind(accession_id)
        .bind(checksum_type)
        .bind(encrypted_value)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn attach_object(&self, accession_id: &str, object_id: &str) -> Result<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET object_id = $2, ingest_status = 'completed', modified = now() WHERE accession_id = $1 RETURNING *",
        )
        .bind(accession_id)
        .bind(object_id)
        .fetch_one(&self.pool)
        .await
    }

    /// Pre-ingest association of a file with its owning metadata object
    /// (e.g. a BP image file attached to a `bpimage` object), distinct from
    /// `attach_object` which the poller uses once ingest has completed.
    pub async fn link_object(&self, accession_id: &str, object_id: &str) -> Result<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET object_id = $2, modified = now() WHERE accession_id = $1 RETURNING *",
        )
        .bind(accession_id)
        .bind(object_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn unlink_object(&self, accession_id: &str) -> Result<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET object_id = NULL, modified = now() WHERE accession_id = $1 RETURNING *",
        )
        .bind(accession_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn mark_error(
        &self,
        accession_id: &str,
        error_type: &str,
    ) -> Result<File> {
        sqlx::query_as::<_, File>(
            r#"
            UPDATE files SET
                ingest_status = 'error',
                ingest_error_type = $2,
                ingest_error_count = ingest_error_count + 1,
                modified = now()
            WHERE accession_id = $1
            RETURNING *
            "#,
        )
        .bind(accession_id)
        .bind(error_type)
        .fetch_one(&self.pool)
        .await
    }

    /// Clears a transient error so the poller retries the file on its next pass.
    pub async fn retry(&self, accession_id: &str) -> Result<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET ingest_status = 'added', ingest_error_type = NULL, modified = now() WHERE accession_id = $1 RETURNING *",
        )
        .bind(accession_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete(&self, accession_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM files WHERE accession_id = $1")
            .bind(accession_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::submission_repo::{NewSubmission, SubmissionRepository};

    async fn seed_submission(pool: &PgPool) -> String {
        let subs = SubmissionRepository::new(pool.clone());
        let created = subs
            .create(NewSubmission {
                submission_id: uuid::Uuid::new_v4().to_string(),
                project_id: "PRJ1".into(),
                workflow: "FEGA".into(),
                name: "with-files".into(),
                title: None,
                description: None,
            })
            .await
            .unwrap();
        created.submission_id
    }

    #[sqlx::test(migrations = "src/migrations")]
    async fn reupload_must_tombstone_previous_active_file(pool: PgPool) -> Result<()> {
        let submission_id = seed_submission(&pool).await;
        let files = FileRepository::new(pool.clone());

        let first = files
            .create(NewFile {
                accession_id: uuid::Uuid::new_v4().to_string(),
                submission_id: submission_id.clone(),
                project_id: "PRJ1".into(),
                path: "run1/sample.bam".into(),
                bytes: 1024,
                version: 1,
            })
            .await?;

        // A second active row at the same path violates the partial unique index.
        let conflict = files
            .create(NewFile {
                accession_id: uuid::Uuid::new_v4().to_string(),
                submission_id: submission_id.clone(),
                project_id: "PRJ1".into(),
                path: "run1/sample.bam".into(),
                bytes: 2048,
                version: 2,
            })
            .await;
        assert!(conflict.is_err());

        let mut tx = pool.begin().await?;
        FileRepository::tombstone_tx(&mut tx, &first.accession_id).await?;
        tx.commit().await?;

        let second = files
            .create(NewFile {
                accession_id: uuid::Uuid::new_v4().to_string(),
                submission_id,
                project_id: "PRJ1".into(),
                path: "run1/sample.bam".into(),
                bytes: 2048,
                version: 2,
            })
            .await?;
        assert_eq!(second.version, 2);
        Ok(())
    }
}
