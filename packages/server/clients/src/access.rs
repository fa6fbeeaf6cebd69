//! REMS access-management client (spec §4.H).

use crate::http::{build_client, HealthProbe};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("transient error calling REMS: {0}")]
    Transient(String),
    #[error("REMS rejected the request: {0}")]
    Permanent(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogueItemHandle {
    #[serde(rename = "id")]
    pub cat_id: i64,
}

pub struct AccessClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    user_id: String,
}

impl AccessClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        user_id: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
            api_key: api_key.into(),
            user_id: user_id.into(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest_middleware::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url.trim_end_matches('/')))
            .header("x-rems-api-key", &self.api_key)
            .header("x-rems-user-id", &self.user_id)
    }

    pub async fn create_resource(&self, resource_id: &str) -> Result<i64, AccessError> {
        let response = self
            .request(reqwest::Method::POST, "/api/resources/create")
            .json(&serde_json::json!({ "resid": resource_id }))
            .send()
            .await
            .map_err(|e| AccessError::Transient(e.to_string()))?;
        let handle: CatalogueItemHandle = parse_response(response).await?;
        Ok(handle.cat_id)
    }

    pub async fn create_catalogue_item(
        &self,
        workflow_id: i64,
        resource_id: i64,
        organization_id: &str,
        localisations: &serde_json::Value,
    ) -> Result<i64, AccessError> {
        let response = self
            .request(reqwest::Method::POST, "/api/catalogue-items/create")
            .json(&serde_json::json!({
                "wfid": workflow_id,
                "resid": resource_id,
                "organization": { "organization/id": organization_id },
                "localizations": localisations,
                "enabled": true,
                "archived": false,
            }))
            .send()
            .await
            .map_err(|e| AccessError::Transient(e.to_string()))?;
        let handle: CatalogueItemHandle = parse_response(response).await?;
        Ok(handle.cat_id)
    }
}

#[async_trait]
impl HealthProbe for AccessClient {
    fn name(&self) -> &'static str {
        "rems"
    }

    async fn health(&self) -> bool {
        self.request(reqwest::Method::GET, "/api/health")
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

async fn parse_response<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, AccessError> {
    let status = response.status();
    if status.is_success() {
        response.json().await.map_err(|e| AccessError::Transient(e.to_string()))
    } else if status.is_server_error() {
        Err(AccessError::Transient(format!("{status}")))
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(AccessError::Permanent(format!("{status}: {text}")))
    }
}
