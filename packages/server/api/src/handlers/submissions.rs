//! `POST /workflows/{wf}/projects/{pid}/submissions`, list/get/patch/delete
//! (spec §4.D, §4.E, §6).

use crate::auth_user::RequireAuth;
use crate::error::ApiError;
use crate::handlers::common::load_authorized_submission;
use crate::services::{object_service::ObjectService, project_service, submission_service};
use crate::state::AppState;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use database::models::Submission;
use database::repositories::{NewSubmission, RegistrationRepository, SubmissionPatch, SubmissionRepository};
use serde::{Deserialize, Serialize};
use shared::error::ServiceError;
use shared::models::SubmissionState;
use shared::workflow::Workflow;
use std::collections::HashMap;
use std::str::FromStr;
use xml_processor::BundlePart;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/workflows/:workflow/projects/:project_id/submissions", post(create_submission))
        .route("/submissions", get(list_submissions))
        .route("/submissions/:id", get(get_submission).patch(patch_submission).delete(delete_submission))
}

#[derive(Serialize)]
struct SubmissionView {
    #[serde(flatten)]
    submission: Submission,
    state: SubmissionState,
}

async fn view_of(state: &AppState, sub: Submission) -> Result<SubmissionView, ServiceError> {
    let files = database::repositories::FileRepository::new(state.db.pool.clone())
        .list_by_submission(&sub.submission_id)
        .await
        .map_err(ServiceError::internal)?;
    let derived = submission_service::derived_state(&sub, &files);
    Ok(SubmissionView { submission: sub, state: derived })
}

async fn create_submission(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((workflow, project_id)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let known = project_service::projects_for(state.projects.as_ref(), user.user_id).await?;
    project_service::authorize(&project_id, &known)?;

    let workflow_enum = Workflow::from_str(&workflow).map_err(ServiceError::BadRequest)?;
    let workflow_config = state
        .workflows
        .get(&workflow)
        .ok_or_else(|| ServiceError::BadRequest(format!("unknown workflow '{workflow}'")))?;

    let mut name = None;
    let mut title = None;
    let mut description = None;
    let mut parts = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| ServiceError::BadRequest(e.to_string()))? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => name = Some(field.text().await.map_err(|e| ServiceError::BadRequest(e.to_string()))?),
            "title" => title = Some(field.text().await.map_err(|e| ServiceError::BadRequest(e.to_string()))?),
            "description" => description = Some(field.text().await.map_err(|e| ServiceError::BadRequest(e.to_string()))?),
            object_type => {
                let bytes = field.bytes().await.map_err(|e| ServiceError::BadRequest(e.to_string()))?;
                parts.push(BundlePart { object_type: object_type.to_string(), xml: bytes.to_vec() });
            }
        }
    }

    let name = name.ok_or_else(|| ServiceError::BadRequest("missing 'name' field".into()))?;
    if name.trim().is_empty() {
        return Err(ApiError(ServiceError::BadRequest("'name' must not be empty".into())));
    }

    let submissions = SubmissionRepository::new(state.db.pool.clone());
    if submissions.find_by_name(&project_id, &name).await.map_err(ServiceError::internal)?.is_some() {
        return Err(ApiError(ServiceError::Conflict { entity: "submission" }));
    }

    let center_id = state.config.bp_center_id.clone();
    let submission_id = if workflow_enum == Workflow::Bp {
        xml_processor::mint_accession(workflow_enum, &center_id, &name, "bpdataset", &name)
    } else {
        uuid::Uuid::new_v4().to_string()
    };

    let created = submissions
        .create(NewSubmission {
            submission_id: submission_id.clone(),
            project_id: project_id.clone(),
            workflow: workflow.clone(),
            name: name.clone(),
            title,
            description,
        })
        .await
        .map_err(ServiceError::internal)?;

    if parts.is_empty() {
        let view = view_of(&state, created).await?;
        return Ok((StatusCode::CREATED, Json(serde_json::to_value(view).map_err(ServiceError::internal)?)));
    }

    let (processed, report) = xml_processor::process_bundle(
        &parts,
        workflow_enum,
        &name,
        &center_id,
        &HashMap::new(),
        &state.schemas,
    );
    let mut errors = report.errors;
    errors.extend(xml_processor::check_cardinality(&report, workflow_config));

    if !errors.is_empty() {
        SubmissionRepository::new(state.db.pool.clone())
            .delete(&submission_id)
            .await
            .map_err(ServiceError::internal)?;
        return Err(ApiError(ServiceError::Validation(errors)));
    }

    let objects = ObjectService::new(state.db.clone())
        .put_objects(&submission_id, &project_id, false, workflow_config, processed)
        .await?;

    let view = view_of(&state, created).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "submission": view,
            "objects": objects.into_iter().map(|o| serde_json::json!({"accessionId": o.accession_id, "objectType": o.object_type})).collect::<Vec<_>>(),
        })),
    ))
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(rename = "projectId")]
    project_id: String,
}

async fn list_submissions(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SubmissionView>>, ApiError> {
    let known = project_service::projects_for(state.projects.as_ref(), user.user_id).await?;
    project_service::authorize(&query.project_id, &known)?;

    let rows = SubmissionRepository::new(state.db.pool.clone())
        .list_by_project(&query.project_id)
        .await
        .map_err(ServiceError::internal)?;

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(view_of(&state, row).await?);
    }
    Ok(Json(views))
}

async fn get_submission(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<SubmissionView>, ApiError> {
    let sub = load_authorized_submission(&state, user, &id).await?;
    Ok(Json(view_of(&state, sub).await?))
}

#[derive(Deserialize, Default)]
struct PatchSubmissionRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    title: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    description: Option<Option<String>>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
    #[serde(default)]
    rems: Option<serde_json::Value>,
}

fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

async fn patch_submission(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Json(body): Json<PatchSubmissionRequest>,
) -> Result<StatusCode, ApiError> {
    let sub = load_authorized_submission(&state, user, &id).await?;
    submission_service::reject_if_frozen(&sub).map_err(map_submission_error)?;

    if let Some(new_name) = &body.name {
        let submissions = SubmissionRepository::new(state.db.pool.clone());
        if let Some(existing) = submissions.find_by_name(&sub.project_id, new_name).await.map_err(ServiceError::internal)? {
            if existing.submission_id != sub.submission_id {
                return Err(ApiError(ServiceError::Conflict { entity: "submission" }));
            }
        }
    }

    let submissions = SubmissionRepository::new(state.db.pool.clone());
    submissions
        .update_fields(
            &id,
            SubmissionPatch { name: body.name, title: body.title, description: body.description, bucket: None },
        )
        .await
        .map_err(ServiceError::internal)?;

    if body.metadata.is_some() || body.rems.is_some() {
        let metadata = match body.metadata {
            Some(patch) => submission_service::apply_metadata_patch(sub.metadata.clone(), patch),
            None => sub.metadata.clone(),
        };
        let rems = match body.rems {
            Some(patch) => submission_service::apply_metadata_patch(sub.rems.clone(), patch),
            None => sub.rems.clone(),
        };
        submissions.update_metadata(&id, metadata, rems).await.map_err(ServiceError::internal)?;
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn delete_submission(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let sub = load_authorized_submission(&state, user, &id).await?;
    submission_service::reject_if_frozen(&sub).map_err(map_submission_error)?;

    // A minted DOI is meant to be permanent (spec Open Questions: deny by
    // default). A submission can carry one even while `published_at` is
    // still null, via a partially-failed publish (spec §8 scenario S2) —
    // `reject_if_frozen` alone does not catch that case.
    let doi_registered = RegistrationRepository::new(state.db.pool.clone())
        .find(&id, None, "doi")
        .await
        .map_err(ServiceError::internal)?
        .is_some();
    if doi_registered && !state.config.allow_unsafe {
        return Err(ApiError(ServiceError::Conflict { entity: "doi_registration" }));
    }

    SubmissionRepository::new(state.db.pool.clone())
        .delete(&id)
        .await
        .map_err(ServiceError::internal)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn map_submission_error(e: crate::services::submission_service::SubmissionError) -> ApiError {
    use crate::services::submission_service::SubmissionError;
    match e {
        SubmissionError::Frozen => ApiError(ServiceError::Frozen),
        SubmissionError::WrongState => ApiError(ServiceError::NotReady),
        SubmissionError::GateFailed(problems) => ApiError(ServiceError::Validation(
            problems
                .into_iter()
                .map(|m| shared::error::ProcessingError::XmlSchema(shared::error::ValidationError {
                    pointer: String::new(),
                    message: m,
                    line: None,
                }))
                .collect(),
        )),
    }
}
