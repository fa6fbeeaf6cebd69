//! `POST/GET /files?projectId=…`, `PATCH /submissions/{id}/files` (spec §4.E, §6).

use crate::auth_user::RequireAuth;
use crate::error::ApiError;
use crate::handlers::common::load_authorized_submission;
use crate::services::project_service;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use database::models::File;
use database::repositories::{FileRepository, NewFile};
use serde::Deserialize;
use shared::error::ServiceError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/files", post(register_files).get(list_files))
        .route("/submissions/:id/files", patch(patch_files))
}

#[derive(Deserialize)]
struct ProjectQuery {
    #[serde(rename = "projectId")]
    project_id: String,
}

#[derive(Deserialize)]
struct RegisterFileRequest {
    #[serde(rename = "submissionId")]
    submission_id: String,
    path: String,
    bytes: i64,
}

async fn register_files(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(q): Query<ProjectQuery>,
    Json(requests): Json<Vec<RegisterFileRequest>>,
) -> Result<(StatusCode, Json<Vec<File>>), ApiError> {
    let known = project_service::projects_for(state.projects.as_ref(), user.user_id).await?;
    project_service::authorize(&q.project_id, &known)?;

    let repo = FileRepository::new(state.db.pool.clone());
    let mut created = Vec::with_capacity(requests.len());

    for req in requests {
        let sub = load_authorized_submission(&state, user.clone(), &req.submission_id).await?;
        if sub.is_frozen() {
            return Err(ApiError(ServiceError::Frozen));
        }
        if sub.project_id != q.project_id {
            return Err(ApiError(ServiceError::BadRequest(format!(
                "submission '{}' does not belong to project '{}'",
                req.submission_id, q.project_id
            ))));
        }

        let next_version = match repo.find_active(&req.submission_id, &req.path).await.map_err(ServiceError::internal)? {
            Some(previous) => {
                let mut tx = state.db.pool.begin().await.map_err(ServiceError::internal)?;
                FileRepository::tombstone_tx(&mut tx, &previous.accession_id).await.map_err(ServiceError::internal)?;
                tx.commit().await.map_err(ServiceError::internal)?;
                previous.version + 1
            }
            None => 1,
        };

        let row = repo
            .create(NewFile {
                accession_id: uuid::Uuid::new_v4().to_string(),
                submission_id: req.submission_id,
                project_id: q.project_id.clone(),
                path: req.path,
                bytes: req.bytes,
                version: next_version,
            })
            .await
            .map_err(ServiceError::internal)?;
        created.push(row);
    }

    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_files(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(q): Query<ProjectQuery>,
) -> Result<Json<Vec<File>>, ApiError> {
    let known = project_service::projects_for(state.projects.as_ref(), user.user_id).await?;
    project_service::authorize(&q.project_id, &known)?;

    let files = FileRepository::new(state.db.pool.clone())
        .list_by_project(&q.project_id)
        .await
        .map_err(ServiceError::internal)?;
    Ok(Json(files))
}

#[derive(Deserialize, Default)]
struct PatchFilesRequest {
    #[serde(default)]
    attach: Vec<AttachFile>,
    #[serde(default)]
    detach: Vec<String>,
}

#[derive(Deserialize)]
struct AttachFile {
    #[serde(rename = "accessionId")]
    accession_id: String,
    #[serde(rename = "objectId")]
    object_id: String,
}

async fn patch_files(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Json(body): Json<PatchFilesRequest>,
) -> Result<StatusCode, ApiError> {
    let sub = load_authorized_submission(&state, user, &id).await?;
    if sub.is_frozen() {
        return Err(ApiError(ServiceError::Frozen));
    }

    let repo = FileRepository::new(state.db.pool.clone());

    for attach in body.attach {
        let file = repo.get(&attach.accession_id).await.map_err(ServiceError::internal)?
            .ok_or(ServiceError::NotFound { entity: "file" })?;
        if file.submission_id != sub.submission_id {
            return Err(ApiError(ServiceError::BadRequest("file does not belong to this submission".into())));
        }
        repo.link_object(&attach.accession_id, &attach.object_id).await.map_err(ServiceError::internal)?;
    }

    for accession_id in body.detach {
        let file = repo.get(&accession_id).await.map_err(ServiceError::internal)?
            .ok_or(ServiceError::NotFound { entity: "file" })?;
        if file.submission_id != sub.submission_id {
            return Err(ApiError(ServiceError::BadRequest("file does not belong to this submission".into())));
        }
        repo.unlink_object(&accession_id).await.map_err(ServiceError::internal)?;
    }

    Ok(StatusCode::NO_CONTENT)
}
