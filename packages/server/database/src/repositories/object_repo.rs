use crate::models::MetadataObject;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Result, Transaction};

pub struct NewObject {
    pub accession_id: String,
    pub submission_id: String,
    pub project_id: String,
    pub object_type: String,
    pub name: String,
    pub title: Option<String>,
    pub content: Value,
    pub xml: Option<Vec<u8>>,
}

pub struct ObjectRepository {
    pool: PgPool,
}

impl ObjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewObject) -> Result<MetadataObject> {
        Self::create_tx_inner(&self.pool, new).await
    }

    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        new: NewObject,
    ) -> Result<MetadataObject> {
        Self::create_tx_inner(&mut **tx, new).await
    }

    async fn create_tx_inner<'e, E>(exec: E, new: NewObject) -> Result<MetadataObject>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, MetadataObject>(
            r#"
            INSERT INTO objects (accession_id, submission_id, project_id, object_type, name, title, content, xml)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&new.accession_id)
        .bind(&new.submission_id)
        .bind(&new.project_id)
        .bind(&new.object_type)
        .bind(&new.name)
        .bind(&new.title)
        .bind(&new.content)
        .bind(&new.xml)
        .fetch_one(exec)
        .await
    }

    pub async fn get(&self, accession_id: &str) -> Result<Option<MetadataObject>> {
        sqlx::query_as::<_, MetadataObject>("SELECT * FROM objects WHERE accession_id = $1")
            .bind(accession_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_name(
        &self,
        project_id: &str,
        object_type: &str,
        name: &str,
    ) -> Result<Option<MetadataObject>> {
        sqlx::query_as::<_, MetadataObject>(
            "SELECT * FROM objects WHERE project_id = $1 AND object_type = $2 AND name = $3",
        )
        .bind(project_id)
        .bind(object_type)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_by_submission(&self, submission_id: &str) -> Result<Vec<MetadataObject>> {
        sqlx::query_as::<_, MetadataObject>(
            "SELECT * FROM objects WHERE submission_id = $1 ORDER BY created",
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_by_submission_and_type(
        &self,
        submission_id: &str,
        object_type: &str,
    ) -> Result<Vec<MetadataObject>> {
        sqlx::query_as::<_, MetadataObject>(
            "SELECT * FROM objects WHERE submission_id = $1 AND object_type = $2 ORDER BY created",
        )
        .bind(submission_id)
        .bind(object_type)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update_content(
        &self,
        accession_id: &str,
        content: Value,
        xml: Option<Vec<u8>>,
    ) -> Result<MetadataObject> {
        sqlx::query_as::<_, MetadataObject>(
            "UPDATE objects SET content = $2, xml = $3, modified = now() WHERE accession_id = $1 RETURNING *",
        )
        .bind(accession_id)
        .bind(content)
        .bind(xml)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete(&self, accession_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM objects WHERE accession_id = $1")
            .bind(accession_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Any object referencing `accession_id` from a different submission, used
    /// by the reference-resolution pass to reject cross-submission links
    /// (spec §4.B reference errors).
    pub async fn exists_in_other_submission(
        &self,
        accession_id: &str,
        submission_id: &str,
    ) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1::bigint FROM objects WHERE accession_id = $1 AND submission_id != $2",
        )
        .bind(accession_id)
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }
}
