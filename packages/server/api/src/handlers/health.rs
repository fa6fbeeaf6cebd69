//! `GET /health` (spec §6): aggregates DB + every external collaborator.

use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let report = state.health_report().await;
    let all_up = report.iter().all(|(_, ok)| *ok);
    Json(json!({
        "status": if all_up { "Up" } else { "Down" },
        "components": report.into_iter().map(|(name, ok)| json!({"name": name, "status": if ok {"Up"} else {"Down"}})).collect::<Vec<_>>(),
    }))
}
