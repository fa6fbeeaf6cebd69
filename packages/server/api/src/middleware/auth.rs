//! Attaches `Extension<AuthUser>` on success; never rejects here (spec
//! §4.F: auth is attached, not gated, in the middleware — gating happens
//! per-handler via the `RequireAuth` extractor). Accepts either a
//! cookie-carried session JWT or a bearer API key.

use crate::auth_user::AuthUser;
use crate::services::auth_service::AuthService;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";

pub async fn auth_middleware(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_service = AuthService::new(
        state.db.clone(),
        state.config.jwt_secret.clone(),
        state.config.base_url.clone(),
    );

    let mut user: Option<AuthUser> = None;

    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        if let Ok(claims) = auth_service.verify_token(cookie.value()) {
            if let Ok(user_id) = Uuid::parse_str(&claims.sub) {
                user = Some(AuthUser { user_id });
            }
        }
    }

    if user.is_none() {
        if let Some(header_value) = req.headers().get(header::AUTHORIZATION) {
            if let Ok(header_str) = header_value.to_str() {
                if let Some(token) = header_str.strip_prefix("Bearer ") {
                    if let Ok(user_id) = auth_service.verify_api_key(token).await {
                        user = Some(AuthUser { user_id });
                    }
                }
            }
        }
    }

    if let Some(u) = user {
        req.extensions_mut().insert(u);
    }

    next.run(req).await
}
