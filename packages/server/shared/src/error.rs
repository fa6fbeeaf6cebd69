//! Error taxonomy shared by every layer (spec §7). `ServiceError` is the
//! one enum every repository/service function ultimately returns or maps
//! into; the HTTP mapping to RFC 7807 lives in `submitter-api` (this crate
//! has no axum dependency), but the `status_label`/`kind` here is what
//! that mapping switches on.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    /// JSON Pointer (spec §7) to the offending field, empty for whole-document errors.
    pub pointer: String,
    pub message: String,
}

impl FieldError {
    pub fn new(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationError {
    pub pointer: String,
    pub message: String,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReferenceError {
    pub kind: &'static str,
    pub from: String,
    pub to_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DuplicateNameError {
    pub object_type: String,
    pub name: String,
}

/// One accumulated error from the XML/JSON processing pipeline (spec §4.C).
/// Processing never short-circuits: every error found is collected into a
/// `Vec<ProcessingError>` and returned together.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "PascalCase")]
pub enum ProcessingError {
    XmlSchema(ValidationError),
    JsonSchema(ValidationError),
    Reference(ReferenceError),
    DuplicateName(DuplicateNameError),
}

/// The taxonomy from spec §7. Each variant maps to exactly one HTTP status
/// in `submitter-api`'s `IntoResponse` impl; nothing here depends on axum.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation failed")]
    Validation(Vec<ProcessingError>),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("principal not authorized for this project")]
    Forbidden,

    #[error("submission is frozen (published) and cannot be mutated")]
    Frozen,

    #[error("submission is not ready to publish")]
    NotReady,

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("{entity} name already exists in this project")]
    Conflict { entity: &'static str },

    #[error("downstream service error: {0}")]
    ExternalTransient(String),

    #[error("downstream service rejected the request: {0}")]
    ExternalPermanent(String),

    #[error("internal error (correlation id {correlation_id})")]
    Internal {
        correlation_id: uuid::Uuid,
        #[source]
        source: anyhow::Error,
    },
}

impl ServiceError {
    pub fn internal(source: impl Into<anyhow::Error>) -> Self {
        ServiceError::Internal {
            correlation_id: uuid::Uuid::new_v4(),
            source: source.into(),
        }
    }

    /// Coarse classification used for logging and metrics; the precise
    /// status code mapping lives alongside axum in `submitter-api`.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) | ServiceError::BadRequest(_) => "validation",
            ServiceError::Unauthenticated => "authentication",
            ServiceError::Forbidden => "authorization",
            ServiceError::Frozen | ServiceError::NotReady => "state",
            ServiceError::NotFound { .. } => "not_found",
            ServiceError::Conflict { .. } => "conflict",
            ServiceError::ExternalTransient(_) => "external_transient",
            ServiceError::ExternalPermanent(_) => "external_permanent",
            ServiceError::Internal { .. } => "internal",
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pointer, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_groups_validation_variants_together() {
        assert_eq!(
            ServiceError::BadRequest("x".into()).kind(),
            ServiceError::Validation(vec![]).kind()
        );
    }
}
