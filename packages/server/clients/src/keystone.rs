//! CSC Keystone client (spec §4.H): mints scoped EC2-style credentials for
//! the object store, used by the `SelfProjectSource` deployment.

use crate::http::{build_client, HealthProbe};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeystoneError {
    #[error("transient error calling Keystone: {0}")]
    Transient(String),
    #[error("Keystone rejected the request: {0}")]
    Permanent(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ec2Credentials {
    pub access: String,
    pub secret: String,
}

pub struct KeystoneClient {
    client: ClientWithMiddleware,
    base_url: String,
    admin_token: String,
}

impl KeystoneClient {
    pub fn new(base_url: impl Into<String>, admin_token: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
            admin_token: admin_token.into(),
        })
    }

    pub async fn issue_ec2_credentials(&self, user_id: &str, project_id: &str) -> Result<Ec2Credentials, KeystoneError> {
        let response = self
            .client
            .post(format!(
                "{}/v3/users/{user_id}/credentials/OS-EC2",
                self.base_url.trim_end_matches('/')
            ))
            .header("X-Auth-Token", &self.admin_token)
            .json(&serde_json::json!({ "tenant_id": project_id }))
            .send()
            .await
            .map_err(|e| KeystoneError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: serde_json::Value =
                response.json().await.map_err(|e| KeystoneError::Transient(e.to_string()))?;
            let cred = &body["credential"];
            let access = cred["access"]
                .as_str()
                .ok_or_else(|| KeystoneError::Permanent("response missing access key".into()))?;
            let secret = cred["secret"]
                .as_str()
                .ok_or_else(|| KeystoneError::Permanent("response missing secret key".into()))?;
            Ok(Ec2Credentials { access: access.to_string(), secret: secret.to_string() })
        } else if status.is_server_error() {
            Err(KeystoneError::Transient(format!("{status}")))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(KeystoneError::Permanent(format!("{status}: {text}")))
        }
    }
}

#[async_trait]
impl HealthProbe for KeystoneClient {
    fn name(&self) -> &'static str {
        "keystone"
    }

    async fn health(&self) -> bool {
        self.client
            .get(format!("{}/v3", self.base_url.trim_end_matches('/')))
            .header("X-Auth-Token", &self.admin_token)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
