//! Session JWT minting/verification and API-key issue/verify (spec §4.F),
//! generalized from the teacher's `AuthService::generate_jwt`/
//! `verify_token`/`verify_api_key` shape.

use chrono::{Duration, Utc};
use database::repositories::{ApiKeyRepository, NewApiKey};
use database::Database;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::crypto::hash_token;
use shared::error::ServiceError;
use shared::keys;
use std::sync::Arc;
use uuid::Uuid;

const SESSION_TTL_SECS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

pub struct AuthService {
    db: Arc<Database>,
    jwt_secret: String,
    issuer: String,
}

impl AuthService {
    pub fn new(db: Arc<Database>, jwt_secret: String, issuer: String) -> Self {
        Self { db, jwt_secret, issuer }
    }

    /// Claims `{sub=user_id, iat, exp, iss}`, ≤1h expiry (spec §4.F).
    pub fn generate_jwt(&self, user_id: Uuid) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(SESSION_TTL_SECS)).timestamp(),
            iss: self.issuer.clone(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(ServiceError::internal)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[self.issuer.clone()]);
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|_| ServiceError::Unauthenticated)
    }

    /// `POST /users/current/keys`: returns the plaintext once, persists only
    /// the Argon2 hash plus a SHA-256 `lookup_hash` for O(1) candidate
    /// lookup (teacher's two-hash pattern, see `shared::keys`).
    pub async fn issue_api_key(
        &self,
        user_id: Uuid,
        name: String,
    ) -> Result<(database::models::ApiKey, String), ServiceError> {
        let (plaintext, salted_hash) = keys::generate_api_key(true);
        let lookup_hash = hash_token(&plaintext);
        let prefix = keys::KEY_PREFIX_LIVE.to_string();

        let repo = ApiKeyRepository::new(self.db.pool.clone());
        let row = repo
            .create(NewApiKey {
                user_id,
                name,
                prefix,
                salted_hash,
                lookup_hash,
                expires: None,
            })
            .await
            .map_err(ServiceError::internal)?;
        Ok((row, plaintext))
    }

    pub async fn list_api_keys(&self, user_id: Uuid) -> Result<Vec<database::models::ApiKey>, ServiceError> {
        ApiKeyRepository::new(self.db.pool.clone())
            .list_by_user(user_id)
            .await
            .map_err(ServiceError::internal)
    }

    pub async fn revoke_api_key(&self, key_id: Uuid, user_id: Uuid) -> Result<bool, ServiceError> {
        ApiKeyRepository::new(self.db.pool.clone())
            .revoke(key_id, user_id)
            .await
            .map_err(ServiceError::internal)
    }

    /// Bearer `sub_live_...`/`sub_test_...` verification: cheap structural
    /// check, then O(1) lookup-hash candidate fetch, then constant-time
    /// Argon2 compare (spec §4.F).
    pub async fn verify_api_key(&self, presented: &str) -> Result<Uuid, ServiceError> {
        if !keys::validate_key_format(presented) {
            return Err(ServiceError::Unauthenticated);
        }
        let lookup_hash = hash_token(presented);
        let repo = ApiKeyRepository::new(self.db.pool.clone());
        let candidate = repo
            .find_by_lookup_hash(&lookup_hash)
            .await
            .map_err(ServiceError::internal)?
            .ok_or(ServiceError::Unauthenticated)?;

        if !keys::verify_key_hash(presented, &candidate.salted_hash) {
            return Err(ServiceError::Unauthenticated);
        }
        if let Some(expires) = candidate.expires {
            if expires <= Utc::now() {
                return Err(ServiceError::Unauthenticated);
            }
        }

        let _ = repo.touch_last_used(candidate.key_id).await;
        Ok(candidate.user_id)
    }
}
