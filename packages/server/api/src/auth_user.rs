//! The authenticated principal attached to a request by `auth_middleware`
//! (spec §4.F) and required by the `RequireAuth` extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use shared::error::ServiceError;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// A custom extractor that 401s on missing `Extension<AuthUser>` instead of
/// relying on every handler to check manually (spec §4.F: "auth is
/// attached, not gated, in the middleware; gating happens per-handler via
/// extractor failure").
pub struct RequireAuth(pub AuthUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Extension::<AuthUser>::from_request_parts(parts, state).await {
            Ok(axum::extract::Extension(user)) => Ok(RequireAuth(user)),
            Err(_) => Err(ApiError(ServiceError::Unauthenticated)),
        }
    }
}
