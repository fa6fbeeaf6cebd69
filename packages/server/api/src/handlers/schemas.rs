//! `GET /schemas`, `GET /schemas/{name}` (spec §6, §4.B).

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use shared::error::ServiceError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/schemas", get(list_schemas))
        .route("/schemas/:name", get(get_schema))
}

async fn list_schemas(State(state): State<AppState>) -> Json<Vec<schema::SchemaInfo>> {
    Json(state.schemas.schemas())
}

async fn get_schema(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .schemas
        .schema_for(&name)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError(ServiceError::NotFound { entity: "schema" }))
}
