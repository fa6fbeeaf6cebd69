//! CRUD over metadata objects tied to a submission (spec §4.D): enforces
//! uniqueness and workflow multiplicity in Rust before touching the
//! database, with the DB unique index as the final backstop for
//! concurrent creators (spec §8 invariant 1).

use database::models::MetadataObject;
use database::repositories::{NewObject, ObjectRepository};
use database::Database;
use schema::WorkflowConfig;
use shared::error::ServiceError;
use std::sync::Arc;
use xml_processor::ProcessedObject;

pub struct ObjectService {
    db: Arc<Database>,
}

impl ObjectService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// `put_objects`: requires the submission not be frozen, enforces
    /// `(project_id, object_type, name)` uniqueness and single-valued-schema
    /// multiplicity, and returns the minted accession IDs.
    pub async fn put_objects(
        &self,
        submission_id: &str,
        project_id: &str,
        is_frozen: bool,
        workflow_config: &WorkflowConfig,
        processed: Vec<ProcessedObject>,
    ) -> Result<Vec<MetadataObject>, ServiceError> {
        if is_frozen {
            return Err(ServiceError::Frozen);
        }

        let repo = ObjectRepository::new(self.db.pool.clone());
        let mut created = Vec::with_capacity(processed.len());

        for object in processed {
            if let Some(rule) = workflow_config.rule_for(&object.object_type) {
                if !rule.allow_multiple_objects {
                    let existing = repo
                        .list_by_submission_and_type(submission_id, &object.object_type)
                        .await
                        .map_err(ServiceError::internal)?;
                    if !existing.is_empty() {
                        return Err(ServiceError::Conflict { entity: "object" });
                    }
                }
            }

            if repo
                .find_by_name(project_id, &object.object_type, &object.name)
                .await
                .map_err(ServiceError::internal)?
                .is_some()
            {
                return Err(ServiceError::Conflict { entity: "object" });
            }

            let row = repo
                .create(NewObject {
                    accession_id: object.accession_id,
                    submission_id: submission_id.to_string(),
                    project_id: project_id.to_string(),
                    object_type: object.object_type,
                    name: object.name,
                    title: None,
                    content: object.content,
                    xml: Some(object.xml),
                })
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                        ServiceError::Conflict { entity: "object" }
                    }
                    other => ServiceError::internal(other),
                })?;
            created.push(row);
        }

        Ok(created)
    }

    pub async fn get_object(&self, accession_id: &str) -> Result<MetadataObject, ServiceError> {
        ObjectRepository::new(self.db.pool.clone())
            .get(accession_id)
            .await
            .map_err(ServiceError::internal)?
            .ok_or(ServiceError::NotFound { entity: "object" })
    }

    /// `bprems` is submission-level only and cannot be individually deleted
    /// (spec §4.D); deletion is also forbidden once the parent is frozen.
    pub async fn delete_object(&self, object: &MetadataObject, is_frozen: bool) -> Result<(), ServiceError> {
        if is_frozen {
            return Err(ServiceError::Frozen);
        }
        if object.object_type.eq_ignore_ascii_case("bprems") {
            return Err(ServiceError::BadRequest(
                "bprems is a submission-level object and cannot be deleted individually".into(),
            ));
        }
        ObjectRepository::new(self.db.pool.clone())
            .delete(&object.accession_id)
            .await
            .map_err(ServiceError::internal)
    }

    pub async fn list_objects(
        &self,
        submission_id: &str,
        object_type: Option<&str>,
    ) -> Result<Vec<MetadataObject>, ServiceError> {
        let repo = ObjectRepository::new(self.db.pool.clone());
        match object_type {
            Some(t) => repo.list_by_submission_and_type(submission_id, t).await,
            None => repo.list_by_submission(submission_id).await,
        }
        .map_err(ServiceError::internal)
    }
}
