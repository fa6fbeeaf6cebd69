//! Maps `shared::error::ServiceError` to RFC 7807 `application/problem+json`
//! (spec §7/§4.K). This is the only place in the workspace that knows about
//! axum's `IntoResponse`; `shared::error` itself stays framework-free.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use shared::error::{FieldError, ProcessingError, ServiceError};

#[derive(Debug, Serialize)]
struct Problem {
    #[serde(rename = "type")]
    type_: &'static str,
    title: &'static str,
    status: u16,
    detail: String,
    errors: Vec<FieldError>,
}

pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_of(&err);

        if let ServiceError::Internal { correlation_id, source } = &err {
            tracing::error!(correlation_id = %correlation_id, error = %source, "internal error");
        }

        let (title, detail, errors) = match &err {
            ServiceError::Validation(processing_errors) => (
                "validation failed",
                "one or more submitted documents failed validation".to_string(),
                processing_errors.iter().map(processing_to_field).collect(),
            ),
            ServiceError::BadRequest(msg) => ("bad request", msg.clone(), vec![]),
            ServiceError::Unauthenticated => (
                "authentication required",
                "missing or invalid credentials".to_string(),
                vec![],
            ),
            ServiceError::Forbidden => (
                "forbidden",
                "principal is not authorized for this project".to_string(),
                vec![],
            ),
            ServiceError::Frozen => (
                "submission is frozen",
                "the submission is published and cannot be mutated".to_string(),
                vec![],
            ),
            ServiceError::NotReady => (
                "not ready",
                "the submission is not ready to publish".to_string(),
                vec![],
            ),
            ServiceError::NotFound { entity } => (
                "not found",
                format!("{entity} not found"),
                vec![],
            ),
            ServiceError::Conflict { entity } => (
                "conflict",
                format!("{entity} already exists"),
                vec![],
            ),
            ServiceError::ExternalTransient(msg) => (
                "downstream service unavailable",
                msg.clone(),
                vec![],
            ),
            ServiceError::ExternalPermanent(msg) => (
                "downstream service rejected the request",
                msg.clone(),
                vec![],
            ),
            ServiceError::Internal { correlation_id, .. } => (
                "internal error",
                format!("an internal error occurred (correlation id {correlation_id})"),
                vec![],
            ),
        };

        let body = Problem {
            type_: "about:blank",
            title,
            status: status.as_u16(),
            detail,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

fn status_of(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_) | ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
        ServiceError::Forbidden => StatusCode::FORBIDDEN,
        ServiceError::Frozen => StatusCode::METHOD_NOT_ALLOWED,
        ServiceError::NotReady => StatusCode::CONFLICT,
        ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::Conflict { .. } => StatusCode::CONFLICT,
        ServiceError::ExternalTransient(_) => StatusCode::BAD_GATEWAY,
        ServiceError::ExternalPermanent(_) => StatusCode::CONFLICT,
        ServiceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn processing_to_field(err: &ProcessingError) -> FieldError {
    match err {
        ProcessingError::XmlSchema(v) | ProcessingError::JsonSchema(v) => {
            FieldError::new(v.pointer.clone(), v.message.clone())
        }
        ProcessingError::Reference(r) => FieldError::new(
            String::new(),
            format!("{} references unknown name '{}' from '{}'", r.kind, r.to_name, r.from),
        ),
        ProcessingError::DuplicateName(d) => FieldError::new(
            String::new(),
            format!("duplicate name '{}' for object type '{}'", d.name, d.object_type),
        ),
    }
}
