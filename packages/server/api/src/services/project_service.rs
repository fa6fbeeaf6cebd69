//! Thin wrapper around `clients::ProjectSource` that maps directory
//! failures and authorization misses onto `ServiceError` (spec §4.G).

use clients::ProjectSource;
use shared::error::ServiceError;
use uuid::Uuid;

pub async fn projects_for(source: &dyn ProjectSource, user_id: Uuid) -> Result<Vec<String>, ServiceError> {
    source.projects_for(user_id).await.map_err(ServiceError::internal)
}

pub fn authorize(project_id: &str, known: &[String]) -> Result<(), ServiceError> {
    if known.iter().any(|p| p == project_id) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}
