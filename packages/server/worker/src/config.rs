//! Typed environment configuration for the poller process, mirroring the
//! `submitter-api` crate's `envy`-on-`dotenv` convention.

use serde::Deserialize;

fn default_polling_interval() -> u64 {
    60
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_external_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pg_database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    pub admin_url: String,
    #[serde(default)]
    pub admin_token: Option<String>,

    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,
    #[serde(default = "default_external_timeout")]
    pub external_call_timeout_secs: u64,

    #[serde(default)]
    pub log_level: Option<String>,
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
