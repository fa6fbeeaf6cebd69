//! The per-process, constructed-once dependency bag (spec §9 "per-request
//! dependency injection" redesign note): everything is built once in
//! `main`, then cloned cheaply (`Arc` fields) into every handler via
//! `State<AppState>`, mirroring the teacher's `state.rs`.

use crate::config::Config;
use clients::{
    AccessClient, ArchiveAdminClient, CatalogClient, CscPidClient, DataciteClient, DoiProvider,
    HealthProbe, KeystoneClient, LdapProjectSource, ObjectStoreClient, ProjectSource,
    SelfProjectSource,
};
use database::Database;
use lru::LruCache;
use openidconnect::core::{CoreClient, CoreProviderMetadata};
use openidconnect::reqwest::async_http_client;
use openidconnect::{ClientId, ClientSecret, IssuerUrl, RedirectUrl};
use schema::{SchemaCatalog, WorkflowCatalog};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Tracks `(jti, exp)` for DPoP proof replay protection (spec §4.F).
pub type DpopCache = Arc<Mutex<LruCache<String, i64>>>;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub schemas: Arc<SchemaCatalog>,
    pub workflows: Arc<WorkflowCatalog>,
    pub doi: Arc<dyn DoiProvider>,
    pub catalog_client: Arc<CatalogClient>,
    pub access: Arc<AccessClient>,
    pub archive: Arc<ArchiveAdminClient>,
    pub object_store: Option<Arc<ObjectStoreClient>>,
    pub keystone: Option<Arc<KeystoneClient>>,
    pub projects: Arc<dyn ProjectSource>,
    pub dpop_cache: DpopCache,
    pub oidc: Option<Arc<CoreClient>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let db = Database::connect(&config.pg_database_url, config.db_max_connections).await?;
        db.migrate().await?;

        let schemas = Arc::new(SchemaCatalog::load_dir(schemas_dir())?);
        let workflows = Arc::new(WorkflowCatalog::load_file(workflows_file())?);

        let timeout = config.external_timeout();

        let doi: Arc<dyn DoiProvider> = if config.deployment.eq_ignore_ascii_case("csc") {
            Arc::new(CscPidClient::new(
                config.pid_url.clone().unwrap_or_default(),
                timeout,
            )?)
        } else {
            Arc::new(DataciteClient::new(
                config.datacite_url.clone().unwrap_or_default(),
                config.datacite_repository_id.clone().unwrap_or_default(),
                config.datacite_password.clone().unwrap_or_default(),
                config.datacite_prefix.clone().unwrap_or_default(),
                timeout,
            )?)
        };

        let catalog_client = Arc::new(CatalogClient::new(
            config.metax_url.clone().unwrap_or_default(),
            config.metax_token.clone().unwrap_or_default(),
            timeout,
        )?);

        let access = Arc::new(AccessClient::new(
            config.rems_url.clone().unwrap_or_default(),
            config.rems_api_key.clone().unwrap_or_default(),
            config.rems_user_id.clone().unwrap_or_default(),
            timeout,
        )?);

        let archive = Arc::new(ArchiveAdminClient::new(
            config.admin_url.clone(),
            config.admin_token.clone().unwrap_or_default(),
            timeout,
        )?);

        let object_store = match &config.s3_bucket {
            Some(bucket) => Some(Arc::new(ObjectStoreClient::from_env(bucket.clone()).await)),
            None => None,
        };

        let keystone = match &config.keystone_endpoint {
            Some(endpoint) => Some(Arc::new(KeystoneClient::new(
                endpoint.clone(),
                config.admin_token.clone().unwrap_or_default(),
                timeout,
            )?)),
            None => None,
        };

        let projects: Arc<dyn ProjectSource> = if config.deployment.eq_ignore_ascii_case("csc") {
            Arc::new(LdapProjectSource::new(
                config.csc_ldap_url.clone().unwrap_or_default(),
                config.csc_ldap_bind_dn.clone().unwrap_or_default(),
                config.csc_ldap_bind_password.clone().unwrap_or_default(),
                config.csc_ldap_base_dn.clone().unwrap_or_default(),
            ))
        } else {
            Arc::new(SelfProjectSource)
        };

        let dpop_cache: DpopCache = Arc::new(Mutex::new(LruCache::new(
            NonZeroUsize::new(config.dpop_nonce_cache_size.max(1)).unwrap(),
        )));

        let oidc = match (&config.oidc_issuer_url, &config.oidc_client_id, &config.oidc_redirect_url) {
            (Some(issuer), Some(client_id), Some(redirect)) => {
                let metadata =
                    CoreProviderMetadata::discover_async(IssuerUrl::new(issuer.clone())?, async_http_client).await?;
                let client = CoreClient::from_provider_metadata(
                    metadata,
                    ClientId::new(client_id.clone()),
                    config.oidc_client_secret.clone().map(ClientSecret::new),
                )
                .set_redirect_uri(RedirectUrl::new(redirect.clone())?);
                Some(Arc::new(client))
            }
            _ => None,
        };

        Ok(Self {
            db,
            schemas,
            workflows,
            doi,
            catalog_client,
            access,
            archive,
            object_store,
            keystone,
            projects,
            dpop_cache,
            oidc,
            config: Arc::new(config),
        })
    }

    /// `GET /health` aggregates every registered external collaborator
    /// (spec §9 "health check iterates a registered collaborator list").
    pub async fn health_report(&self) -> Vec<(&'static str, bool)> {
        let db_ok = self.db.health_check().await.is_ok();
        let mut report = vec![("database", db_ok)];
        report.push((self.doi.name(), self.doi.health().await));
        report.push((self.catalog_client.name(), self.catalog_client.health().await));
        report.push((self.access.name(), self.access.health().await));
        report.push((self.archive.name(), self.archive.health().await));
        if let Some(store) = &self.object_store {
            report.push((store.name(), store.health().await));
        }
        if let Some(keystone) = &self.keystone {
            report.push((keystone.name(), keystone.health().await));
        }
        report
    }
}

fn schemas_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../schema/assets/schemas")
}

fn workflows_file() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../schema/assets/workflows/workflows.json")
}
