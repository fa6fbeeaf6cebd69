//! Typed environment configuration (spec §6), loaded once at start-up via
//! `envy` on top of `dotenv`, matching the teacher's "typed config struct
//! built from env vars" convention but removing the repeated
//! `std::env::var().unwrap_or_else()` boilerplate.

use serde::Deserialize;

fn default_polling_interval() -> u64 {
    60
}

fn default_db_max_connections() -> u32 {
    50
}

fn default_dpop_cache_size() -> usize {
    10_000
}

fn default_external_timeout() -> u64 {
    30
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pg_database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_port")]
    pub port: u16,
    pub base_url: String,

    #[serde(default)]
    pub log_level: Option<String>,

    pub jwt_secret: String,
    #[serde(default)]
    pub oidc_issuer_url: Option<String>,
    #[serde(default)]
    pub oidc_client_id: Option<String>,
    #[serde(default)]
    pub oidc_client_secret: Option<String>,
    #[serde(default)]
    pub oidc_redirect_url: Option<String>,
    #[serde(default)]
    pub oidc_dpop_enabled: bool,
    #[serde(default = "default_true")]
    pub oidc_secure_cookie: bool,
    #[serde(default = "default_dpop_cache_size")]
    pub dpop_nonce_cache_size: usize,

    /// `CSC` or `NBIS` — selects the project-source and DOI-provider flavor.
    pub deployment: String,

    #[serde(default)]
    pub datacite_url: Option<String>,
    #[serde(default)]
    pub datacite_repository_id: Option<String>,
    #[serde(default)]
    pub datacite_password: Option<String>,
    #[serde(default)]
    pub datacite_prefix: Option<String>,
    #[serde(default)]
    pub pid_url: Option<String>,

    #[serde(default)]
    pub metax_url: Option<String>,
    #[serde(default)]
    pub metax_token: Option<String>,

    #[serde(default)]
    pub rems_url: Option<String>,
    #[serde(default)]
    pub rems_api_key: Option<String>,
    #[serde(default)]
    pub rems_user_id: Option<String>,

    pub admin_url: String,
    #[serde(default)]
    pub admin_token: Option<String>,

    #[serde(default)]
    pub csc_ldap_url: Option<String>,
    #[serde(default)]
    pub csc_ldap_bind_dn: Option<String>,
    #[serde(default)]
    pub csc_ldap_bind_password: Option<String>,
    #[serde(default)]
    pub csc_ldap_base_dn: Option<String>,

    #[serde(default)]
    pub s3_endpoint: Option<String>,
    #[serde(default)]
    pub s3_bucket: Option<String>,
    #[serde(default)]
    pub keystone_endpoint: Option<String>,

    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,
    pub bp_center_id: String,

    #[serde(default = "default_external_timeout")]
    pub external_call_timeout_secs: u64,

    /// Test-only override of the "deny DELETE of a submission with a
    /// minted DOI" rule (spec §9 open question — decided "deny by
    /// default" in DESIGN.md).
    #[serde(default)]
    pub allow_unsafe: bool,
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Ok(envy::from_env::<Config>()?)
    }

    pub fn external_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.external_call_timeout_secs)
    }
}
