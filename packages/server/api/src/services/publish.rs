//! Publish orchestrator (spec §4.I): runs a workflow's registration steps
//! in order, one DB transaction per step, each step idempotent via a
//! `Registration` row check before calling out. A failed step aborts the
//! remaining steps but never rolls back ones that already succeeded —
//! the submission is left exactly as far along as it got, and a retried
//! `POST /publish/{id}` picks up from there.

use clients::{to_metax_dataset, AccessClient, ArchiveAdminClient, CatalogClient, DoiPayload, DoiProvider};
use database::models::Submission;
use database::repositories::{NewRegistration, RegistrationRepository};
use database::Database;
use serde_json::json;
use shared::error::ServiceError;
use shared::metadata::DataciteMetadata;
use shared::workflow::{RegistrationService, Workflow};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Registered,
    AlreadyRegistered,
    Failed,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StepResult {
    pub service: RegistrationService,
    pub status: StepStatus,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PublishReport {
    pub steps: Vec<StepResult>,
    pub doi: Option<String>,
}

impl PublishReport {
    /// `false` once any step in the report is `Failed` (spec §8 scenario
    /// S2): the handler uses this to decide whether to mark the
    /// submission published and what HTTP status to answer with.
    pub fn all_ok(&self) -> bool {
        !self.steps.iter().any(|s| s.status == StepStatus::Failed)
    }
}

pub struct PublishOrchestrator {
    db: Arc<Database>,
    doi: Arc<dyn DoiProvider>,
    catalog: Arc<CatalogClient>,
    access: Arc<AccessClient>,
    archive: Arc<ArchiveAdminClient>,
}

impl PublishOrchestrator {
    pub fn new(
        db: Arc<Database>,
        doi: Arc<dyn DoiProvider>,
        catalog: Arc<CatalogClient>,
        access: Arc<AccessClient>,
        archive: Arc<ArchiveAdminClient>,
    ) -> Self {
        Self { db, doi, catalog, access, archive }
    }

    /// Runs every step named by `workflow.publish_services()` in order.
    /// Steps already backed by a `Registration` row are skipped (retry
    /// safety, spec §8 invariant 4). The first step that fails stops the
    /// run and is recorded as a `Failed` entry; earlier successes are left
    /// in place and the full partial report (spec §6/§8 scenario S2) is
    /// still returned as `Ok` so the caller can report exactly how far
    /// publishing got. Only a failure unrelated to a specific step (bad
    /// stored metadata, a dead DB connection) returns `Err`.
    pub async fn run(&self, submission: &Submission, workflow: Workflow) -> Result<PublishReport, ServiceError> {
        let metadata: DataciteMetadata =
            serde_json::from_value(submission.metadata.clone()).map_err(ServiceError::internal)?;

        let mut steps = Vec::new();
        let mut doi_handle = None;

        for service in workflow.publish_services() {
            let regs = RegistrationRepository::new(self.db.pool.clone());
            if let Some(existing) = regs
                .find(&submission.submission_id, None, service.as_str())
                .await
                .map_err(ServiceError::internal)?
            {
                if *service == RegistrationService::Doi {
                    doi_handle = Some(existing.external_id.clone());
                }
                steps.push(StepResult {
                    service: *service,
                    status: StepStatus::AlreadyRegistered,
                    detail: Some(existing.external_id),
                });
                continue;
            }

            let outcome = match service {
                RegistrationService::Doi => self.register_doi(submission, &metadata).await,
                RegistrationService::Catalog => self.register_catalog(submission, &metadata).await,
                RegistrationService::Access => self.register_access(submission).await,
                RegistrationService::Archive => Ok("archive".to_string()),
            };

            match outcome {
                Ok(external_id) => {
                    let mut tx = self.db.pool.begin().await.map_err(ServiceError::internal)?;
                    database::repositories::RegistrationRepository::create_tx(
                        &mut tx,
                        NewRegistration {
                            submission_id: submission.submission_id.clone(),
                            object_id: None,
                            service: service.as_str().to_string(),
                            external_id: external_id.clone(),
                            meta: json!({}),
                        },
                    )
                    .await
                    .map_err(ServiceError::internal)?;
                    tx.commit().await.map_err(ServiceError::internal)?;

                    if *service == RegistrationService::Doi {
                        doi_handle = Some(external_id.clone());
                    }
                    steps.push(StepResult {
                        service: *service,
                        status: StepStatus::Registered,
                        detail: Some(external_id),
                    });
                }
                Err(e) => {
                    steps.push(StepResult {
                        service: *service,
                        status: StepStatus::Failed,
                        detail: Some(e.to_string()),
                    });
                    break;
                }
            }
        }

        Ok(PublishReport { steps, doi: doi_handle })
    }

    async fn register_doi(&self, submission: &Submission, metadata: &DataciteMetadata) -> Result<String, ServiceError> {
        let payload = DoiPayload {
            titles: submission.title.clone().into_iter().collect(),
            creators: metadata.creators.iter().map(|c| c.name.clone()).collect(),
            publisher: "submitter".to_string(),
            publication_year: chrono::Utc::now().format("%Y").to_string().parse().unwrap_or(0),
        };
        let handle = self.doi.draft(&payload).await.map_err(classify_doi)?;
        self.doi.publish(&handle.doi).await.map_err(classify_doi)?;
        Ok(handle.doi)
    }

    async fn register_catalog(&self, _submission: &Submission, metadata: &DataciteMetadata) -> Result<String, ServiceError> {
        let payload = to_metax_dataset(metadata);
        let handle = self.catalog.upsert_dataset(&payload).await.map_err(|e| match e {
            clients::CatalogError::Transient(m) => ServiceError::ExternalTransient(m),
            clients::CatalogError::Permanent(m) => ServiceError::ExternalPermanent(m),
        })?;
        Ok(handle.persistent_identifier)
    }

    async fn register_access(&self, submission: &Submission) -> Result<String, ServiceError> {
        let rems: shared::metadata::RemsInfo =
            serde_json::from_value(submission.rems.clone()).unwrap_or_default();
        let resource_id = self
            .access
            .create_resource(&submission.submission_id)
            .await
            .map_err(classify_access)?;
        let workflow_id: i64 = rems
            .workflow_id
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let cat_id = self
            .access
            .create_catalogue_item(
                workflow_id,
                resource_id,
                rems.organization_id.as_deref().unwrap_or_default(),
                &json!({ "en": { "title": submission.title.clone().unwrap_or_default() } }),
            )
            .await
            .map_err(classify_access)?;
        Ok(cat_id.to_string())
    }

    /// `PATCH /announce/{id}` (spec §4.I): releases the archive dataset.
    /// BP additionally needs no further REMS action since access was
    /// already granted at publish time; the step is still idempotent —
    /// the archive admin API treats a second release as a no-op.
    pub async fn announce(&self, submission_id: &str) -> Result<(), ServiceError> {
        self.archive.release_dataset(submission_id).await.map_err(|e| match e {
            clients::ArchiveError::Transient(m) => ServiceError::ExternalTransient(m),
            clients::ArchiveError::Permanent(m) => ServiceError::ExternalPermanent(m),
        })
    }
}

fn classify_doi(e: clients::DoiError) -> ServiceError {
    match e {
        clients::DoiError::Transient(m) => ServiceError::ExternalTransient(m),
        clients::DoiError::Permanent(m) => ServiceError::ExternalPermanent(m),
    }
}

fn classify_access(e: clients::AccessError) -> ServiceError {
    match e {
        clients::AccessError::Transient(m) => ServiceError::ExternalTransient(m),
        clients::AccessError::Permanent(m) => ServiceError::ExternalPermanent(m),
    }
}
