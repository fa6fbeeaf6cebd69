//! Shared helper every handler touching a single submission needs: fetch
//! it and check the caller's project membership (spec §4.G).

use crate::auth_user::AuthUser;
use crate::services::project_service;
use crate::state::AppState;
use database::models::Submission;
use database::repositories::SubmissionRepository;
use shared::error::ServiceError;

pub async fn load_authorized_submission(
    state: &AppState,
    user: AuthUser,
    submission_id: &str,
) -> Result<Submission, ServiceError> {
    let sub = SubmissionRepository::new(state.db.pool.clone())
        .get(submission_id)
        .await
        .map_err(ServiceError::internal)?
        .ok_or(ServiceError::NotFound { entity: "submission" })?;

    let known = project_service::projects_for(state.projects.as_ref(), user.user_id).await?;
    project_service::authorize(&sub.project_id, &known)?;
    Ok(sub)
}
