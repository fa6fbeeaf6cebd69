//! `GET /submissions/{id}/registrations` (spec §6).

use crate::auth_user::RequireAuth;
use crate::error::ApiError;
use crate::handlers::common::load_authorized_submission;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use database::models::Registration;
use database::repositories::RegistrationRepository;
use shared::error::ServiceError;

pub fn router() -> Router<AppState> {
    Router::new().route("/submissions/:id/registrations", get(list_registrations))
}

async fn list_registrations(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Vec<Registration>>, ApiError> {
    load_authorized_submission(&state, user, &id).await?;

    let rows = RegistrationRepository::new(state.db.pool.clone())
        .list_by_submission(&id)
        .await
        .map_err(ServiceError::internal)?;
    Ok(Json(rows))
}
