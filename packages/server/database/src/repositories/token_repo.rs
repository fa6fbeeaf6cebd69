use crate::models::RefreshToken;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Result};
use uuid::Uuid;

/// Refresh tokens are stored pre-hashed (see shared::crypto::hash_token), the
/// same pattern the teacher used for its GitHub OAuth device-flow tokens.
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        token_hash: &str,
        user_id: Uuid,
        expires: DateTime<Utc>,
    ) -> Result<RefreshToken> {
        sqlx::query_as::<_, RefreshToken>(
            "INSERT INTO refresh_tokens (token_hash, user_id, expires) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(expires)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_valid(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE token_hash = $1 AND expires > now()",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
    }

    /// Single-use rotation: consumes the presented token so it cannot be replayed.
    pub async fn consume(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires <= now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
