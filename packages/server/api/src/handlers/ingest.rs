//! `POST /submissions/{id}/ingest` (spec §4.E, §4.J, §6). Guarded by a
//! separate `X-Authorization: Bearer <admin>` header rather than the usual
//! session/API-key principal — only the archive's own admin credential may
//! kick off ingest.

use crate::error::ApiError;
use crate::services::submission_service;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use database::repositories::SubmissionRepository;
use shared::error::ServiceError;

pub fn router() -> Router<AppState> {
    Router::new().route("/submissions/:id/ingest", post(start_ingest))
}

async fn start_ingest(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    check_admin_header(&state, &headers)?;

    let mut tx = state.db.pool.begin().await.map_err(ServiceError::internal)?;
    let sub = SubmissionRepository::lock_for_update(&mut tx, &id)
        .await
        .map_err(ServiceError::internal)?
        .ok_or(ServiceError::NotFound { entity: "submission" })?;

    submission_service::try_ingest(&sub).map_err(crate::handlers::submissions::map_submission_error)?;

    SubmissionRepository::start_ingest_tx(&mut tx, &id).await.map_err(ServiceError::internal)?;
    tx.commit().await.map_err(ServiceError::internal)?;

    state.archive.ingest(&id).await.map_err(|e| match e {
        clients::ArchiveError::Transient(m) => ServiceError::ExternalTransient(m),
        clients::ArchiveError::Permanent(m) => ServiceError::ExternalPermanent(m),
    })?;

    Ok(StatusCode::ACCEPTED)
}

fn check_admin_header(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let expected = state.config.admin_token.as_deref().ok_or(ServiceError::Forbidden)?;
    let provided = headers
        .get("X-Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ServiceError::Forbidden)?;

    if constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
        Ok(())
    } else {
        Err(ApiError(ServiceError::Forbidden))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
