//! `POST /publish/{id}`, `PATCH /announce/{id}` (spec §4.I, §6).

use crate::auth_user::RequireAuth;
use crate::error::ApiError;
use crate::handlers::common::load_authorized_submission;
use crate::handlers::submissions::map_submission_error;
use crate::services::{publish::PublishOrchestrator, submission_service};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{patch, post};
use axum::{Json, Router};
use database::repositories::{FileRepository, ObjectRepository, SubmissionRepository};
use shared::error::ServiceError;
use shared::workflow::Workflow;
use std::collections::HashMap;
use std::str::FromStr;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/publish/:id", post(run_publish))
        .route("/announce/:id", patch(announce))
}

async fn run_publish(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<crate::services::publish::PublishReport>), ApiError> {
    let sub = load_authorized_submission(&state, user, &id).await?;

    let files = FileRepository::new(state.db.pool.clone())
        .list_by_submission(&id)
        .await
        .map_err(ServiceError::internal)?;
    let derived = submission_service::derived_state(&sub, &files);

    let objects = ObjectRepository::new(state.db.pool.clone())
        .list_by_submission(&id)
        .await
        .map_err(ServiceError::internal)?;
    let mut object_counts: HashMap<String, usize> = HashMap::new();
    for object in &objects {
        *object_counts.entry(object.object_type.clone()).or_default() += 1;
    }

    let workflow_config = state
        .workflows
        .get(&sub.workflow)
        .ok_or_else(|| ServiceError::internal(anyhow::anyhow!("no workflow config for '{}'", sub.workflow)))?;

    submission_service::publish_gate(derived, &object_counts, &files, workflow_config).map_err(map_submission_error)?;

    let workflow = Workflow::from_str(&sub.workflow).map_err(anyhow::Error::msg).map_err(ServiceError::internal)?;
    let orchestrator = PublishOrchestrator::new(
        state.db.clone(),
        state.doi.clone(),
        state.catalog_client.clone(),
        state.access.clone(),
        state.archive.clone(),
    );
    let report = orchestrator.run(&sub, workflow).await?;

    // A partially-failed publish (spec §8 scenario S2) is reported with
    // its partial `steps` list rather than a generic error body, and the
    // submission is NOT marked published — the failed step's absent
    // `Registration` row is what a retried `POST /publish/{id}` picks up
    // on.
    if !report.all_ok() {
        return Ok((StatusCode::BAD_GATEWAY, Json(report)));
    }

    let mut tx = state.db.pool.begin().await.map_err(ServiceError::internal)?;
    SubmissionRepository::lock_for_update(&mut tx, &id).await.map_err(ServiceError::internal)?;
    SubmissionRepository::set_published_tx(&mut tx, &id).await.map_err(ServiceError::internal)?;
    tx.commit().await.map_err(ServiceError::internal)?;

    Ok((StatusCode::OK, Json(report)))
}

async fn announce(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let sub = load_authorized_submission(&state, user, &id).await?;
    submission_service::try_announce(&sub).map_err(map_submission_error)?;

    let orchestrator = PublishOrchestrator::new(
        state.db.clone(),
        state.doi.clone(),
        state.catalog_client.clone(),
        state.access.clone(),
        state.archive.clone(),
    );
    orchestrator.announce(&id).await?;

    let mut tx = state.db.pool.begin().await.map_err(ServiceError::internal)?;
    SubmissionRepository::lock_for_update(&mut tx, &id).await.map_err(ServiceError::internal)?;
    SubmissionRepository::set_announced_tx(&mut tx, &id).await.map_err(ServiceError::internal)?;
    tx.commit().await.map_err(ServiceError::internal)?;

    Ok(StatusCode::NO_CONTENT)
}
