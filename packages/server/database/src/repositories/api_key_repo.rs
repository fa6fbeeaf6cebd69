use crate::models::ApiKey;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Result};
use uuid::Uuid;

pub struct NewApiKey {
    pub user_id: Uuid,
    pub name: String,
    pub prefix: String,
    pub salted_hash: String,
    pub lookup_hash: String,
    pub expires: Option<DateTime<Utc>>,
}

pub struct ApiKeyRepository {
    pool: PgPool,
}

impl ApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewApiKey) -> Result<ApiKey> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (user_id, name, prefix, salted_hash, lookup_hash, expires)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(&new.name)
        .bind(&new.prefix)
        .bind(&new.salted_hash)
        .bind(&new.lookup_hash)
        .bind(new.expires)
        .fetch_one(&self.pool)
        .await
    }

    /// O(1) candidate lookup by the SHA-256 `lookup_hash` before the slow
    /// Argon2 compare against `salted_hash` (see shared::keys).
    pub async fn find_by_lookup_hash(&self, lookup_hash: &str) -> Result<Option<ApiKey>> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE lookup_hash = $1")
            .bind(lookup_hash)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ApiKey>> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE user_id = $1 ORDER BY created")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn touch_last_used(&self, key_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = now() WHERE key_id = $1")
            .bind(key_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn revoke(&self, key_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM api_keys WHERE key_id = $1 AND user_id = $2")
            .bind(key_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
