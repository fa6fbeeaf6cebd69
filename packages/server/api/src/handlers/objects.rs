//! `POST/GET/PUT/DELETE /objects/{schema}/{id}`, `GET /submissions/{id}/objects[/docs]`
//! (spec §4.D, §6). `POST`/`PUT` carry already-structured JSON documents
//! (the multipart XML path is only for bundle upload at submission
//! creation, `handlers::submissions::create_submission`).

use crate::auth_user::RequireAuth;
use crate::error::ApiError;
use crate::handlers::common::load_authorized_submission;
use crate::services::object_service::ObjectService;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use database::models::MetadataObject;
use serde::Deserialize;
use shared::error::ServiceError;
use shared::workflow::Workflow;
use std::str::FromStr;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/objects/:schema", post(add_objects))
        .route("/objects/:schema/:id", get(get_object).put(replace_object).delete(delete_object))
        .route("/submissions/:id/objects", get(list_objects))
        .route("/submissions/:id/objects/docs", get(list_objects_docs))
}

#[derive(Deserialize)]
struct SubmissionQuery {
    submission: String,
}

async fn add_objects(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(schema): Path<String>,
    Query(q): Query<SubmissionQuery>,
    Json(docs): Json<Vec<serde_json::Value>>,
) -> Result<(StatusCode, Json<Vec<serde_json::Value>>), ApiError> {
    let sub = load_authorized_submission(&state, user, &q.submission).await?;
    submission_frozen_guard(&sub)?;

    let workflow_config = state
        .workflows
        .get(&sub.workflow)
        .ok_or_else(|| ServiceError::internal(anyhow::anyhow!("no workflow config for '{}'", sub.workflow)))?;

    for doc in &docs {
        state.schemas.validate_json(&schema, doc).map_err(to_validation_error)?;
    }

    let workflow_enum = Workflow::from_str(&sub.workflow).map_err(anyhow::Error::msg).map_err(ServiceError::internal)?;
    let processed: Vec<xml_processor::ProcessedObject> = docs
        .into_iter()
        .map(|doc| {
            let name = doc["name"].as_str().unwrap_or_default().to_string();
            let accession_id = xml_processor::mint_accession(workflow_enum, &state.config.bp_center_id, &sub.name, &schema, &name);
            xml_processor::ProcessedObject { object_type: schema.clone(), name, accession_id, content: doc, xml: Vec::new() }
        })
        .collect();

    let created = ObjectService::new(state.db.clone())
        .put_objects(&sub.submission_id, &sub.project_id, false, workflow_config, processed)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(created.into_iter().map(|o| serde_json::json!({"accessionId": o.accession_id})).collect()),
    ))
}

#[derive(Deserialize)]
struct GetObjectQuery {
    #[serde(default)]
    format: Option<String>,
}

async fn get_object(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((_schema, id)): Path<(String, String)>,
    Query(q): Query<GetObjectQuery>,
) -> Result<axum::response::Response, ApiError> {
    let object = ObjectService::new(state.db.clone()).get_object(&id).await?;
    load_authorized_submission(&state, user, &object.submission_id).await?;

    if q.format.as_deref() == Some("xml") {
        let xml = object.xml.clone().ok_or_else(|| ServiceError::NotFound { entity: "xml" })?;
        return Ok(([("content-type", "application/xml")], xml).into_response());
    }
    use axum::response::IntoResponse;
    Ok(Json(object).into_response())
}

async fn replace_object(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((schema, id)): Path<(String, String)>,
    Json(doc): Json<serde_json::Value>,
) -> Result<StatusCode, ApiError> {
    let object = ObjectService::new(state.db.clone()).get_object(&id).await?;
    let sub = load_authorized_submission(&state, user, &object.submission_id).await?;
    submission_frozen_guard(&sub)?;

    state.schemas.validate_json(&schema, &doc).map_err(to_validation_error)?;

    database::repositories::ObjectRepository::new(state.db.pool.clone())
        .update_content(&id, doc, None)
        .await
        .map_err(ServiceError::internal)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_object(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((_schema, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let object_service = ObjectService::new(state.db.clone());
    let object = object_service.get_object(&id).await?;
    let sub = load_authorized_submission(&state, user, &object.submission_id).await?;

    object_service.delete_object(&object, sub.is_frozen()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct ListObjectsQuery {
    #[serde(rename = "objectType", default)]
    object_type: Option<String>,
}

async fn list_objects(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Query(q): Query<ListObjectsQuery>,
) -> Result<Json<Vec<MetadataObject>>, ApiError> {
    load_authorized_submission(&state, user, &id).await?;
    let objects = ObjectService::new(state.db.clone()).list_objects(&id, q.object_type.as_deref()).await?;
    Ok(Json(objects))
}

/// `/docs` variant used by the BP workflow's document browser: same data,
/// kept as a distinct route since the frontend treats BP "documents" (the
/// XML originals) and plain metadata objects as separate views.
async fn list_objects_docs(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Vec<MetadataObject>>, ApiError> {
    load_authorized_submission(&state, user, &id).await?;
    let objects = ObjectService::new(state.db.clone()).list_objects(&id, None).await?;
    Ok(Json(objects))
}

fn to_validation_error(errors: Vec<shared::error::ValidationError>) -> ServiceError {
    ServiceError::Validation(errors.into_iter().map(shared::error::ProcessingError::JsonSchema).collect())
}

fn submission_frozen_guard(sub: &database::models::Submission) -> Result<(), ApiError> {
    if sub.is_frozen() {
        Err(ApiError(ServiceError::Frozen))
    } else {
        Ok(())
    }
}
