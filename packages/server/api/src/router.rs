//! Merges every handler module's routes under the `/v1` prefix (spec §6)
//! and layers the auth-attaching middleware over the whole surface.

use crate::handlers;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;
use axum::Router;

pub fn routes(state: AppState) -> Router {
    let v1 = Router::new()
        .merge(handlers::health::router())
        .merge(handlers::schemas::router())
        .merge(handlers::auth::router())
        .merge(handlers::keys::router())
        .merge(handlers::submissions::router())
        .merge(handlers::objects::router())
        .merge(handlers::files::router())
        .merge(handlers::registrations::router())
        .merge(handlers::ingest::router())
        .merge(handlers::publish::router())
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().nest("/v1", v1).with_state(state)
}
