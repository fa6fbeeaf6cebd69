//! `POST/GET /users/current/keys`, `DELETE /users/current/keys/{id}` (spec §4.F, §6).

use crate::auth_user::RequireAuth;
use crate::error::ApiError;
use crate::services::auth_service::AuthService;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use shared::error::ServiceError;
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/current/keys", post(issue_key).get(list_keys))
        .route("/users/current/keys/:id", delete(revoke_key))
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.db.clone(), state.config.jwt_secret.clone(), state.config.base_url.clone())
}

#[derive(Deserialize)]
struct IssueKeyRequest {
    name: String,
}

#[derive(Serialize)]
struct IssueKeyResponse {
    key_id: Uuid,
    plaintext: String,
}

async fn issue_key(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<IssueKeyRequest>,
) -> Result<(StatusCode, Json<IssueKeyResponse>), ApiError> {
    let (key, plaintext) = auth_service(&state).issue_api_key(user.user_id, body.name).await?;
    Ok((StatusCode::CREATED, Json(IssueKeyResponse { key_id: key.key_id, plaintext })))
}

#[derive(Serialize)]
struct KeySummary {
    key_id: Uuid,
    name: String,
    created: chrono::DateTime<chrono::Utc>,
    last_used_at: Option<chrono::DateTime<chrono::Utc>>,
}

async fn list_keys(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<Vec<KeySummary>>, ApiError> {
    let keys = auth_service(&state).list_api_keys(user.user_id).await?;
    Ok(Json(
        keys.into_iter()
            .map(|k| KeySummary { key_id: k.key_id, name: k.name, created: k.created, last_used_at: k.last_used_at })
            .collect(),
    ))
}

async fn revoke_key(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(key_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let revoked = auth_service(&state).revoke_api_key(key_id, user.user_id).await?;
    if revoked {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError(ServiceError::NotFound { entity: "api key" }))
    }
}
