//! DOI minting (spec §4.H): either DataCite or a CSC PID service, selected
//! per workflow/deployment. Both implement `DoiProvider` so the publish
//! orchestrator (`submitter-api::services::publish`) is agnostic to which
//! one is configured.

use crate::http::{build_client, HealthProbe};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DoiError {
    #[error("transient error calling DOI service: {0}")]
    Transient(String),
    #[error("DOI service rejected the request: {0}")]
    Permanent(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct DoiPayload {
    pub titles: Vec<String>,
    pub creators: Vec<String>,
    pub publisher: String,
    pub publication_year: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoiHandle {
    pub doi: String,
}

#[async_trait]
pub trait DoiProvider: HealthProbe {
    async fn draft(&self, payload: &DoiPayload) -> Result<DoiHandle, DoiError>;
    async fn publish(&self, doi: &str) -> Result<(), DoiError>;
    async fn delete(&self, doi: &str) -> Result<(), DoiError>;
}

pub struct DataciteClient {
    client: ClientWithMiddleware,
    base_url: String,
    repository_id: String,
    password: String,
    prefix: String,
}

impl DataciteClient {
    pub fn new(
        base_url: impl Into<String>,
        repository_id: impl Into<String>,
        password: impl Into<String>,
        prefix: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
            repository_id: repository_id.into(),
            password: password.into(),
            prefix: prefix.into(),
        })
    }

    fn dois_url(&self) -> String {
        format!("{}/dois", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl HealthProbe for DataciteClient {
    fn name(&self) -> &'static str {
        "datacite"
    }

    async fn health(&self) -> bool {
        self.client
            .get(format!("{}/heartbeat", self.base_url.trim_end_matches('/')))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl DoiProvider for DataciteClient {
    async fn draft(&self, payload: &DoiPayload) -> Result<DoiHandle, DoiError> {
        let body = serde_json::json!({
            "data": {
                "type": "dois",
                "attributes": {
                    "prefix": self.prefix,
                    "titles": payload.titles.iter().map(|t| serde_json::json!({"title": t})).collect::<Vec<_>>(),
                    "creators": payload.creators.iter().map(|c| serde_json::json!({"name": c})).collect::<Vec<_>>(),
                    "publisher": payload.publisher,
                    "publicationYear": payload.publication_year,
                    "event": "draft",
                }
            }
        });

        let response = self
            .client
            .post(self.dois_url())
            .basic_auth(&self.repository_id, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| DoiError::Transient(e.to_string()))?;

        map_doi_response(response).await
    }

    async fn publish(&self, doi: &str) -> Result<(), DoiError> {
        let response = self
            .client
            .put(format!("{}/{doi}", self.dois_url()))
            .basic_auth(&self.repository_id, Some(&self.password))
            .json(&serde_json::json!({"data": {"attributes": {"event": "publish"}}}))
            .send()
            .await
            .map_err(|e| DoiError::Transient(e.to_string()))?;
        check_ok(response).await
    }

    async fn delete(&self, doi: &str) -> Result<(), DoiError> {
        let response = self
            .client
            .delete(format!("{}/{doi}", self.dois_url()))
            .basic_auth(&self.repository_id, Some(&self.password))
            .send()
            .await
            .map_err(|e| DoiError::Transient(e.to_string()))?;
        check_ok(response).await
    }
}

/// CSC's own PID minting service, used instead of DataCite when
/// `DEPLOYMENT=CSC` and the workflow calls for a CSC-issued PID rather than
/// a DataCite DOI.
pub struct CscPidClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl CscPidClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl HealthProbe for CscPidClient {
    fn name(&self) -> &'static str {
        "csc-pid"
    }

    async fn health(&self) -> bool {
        self.client
            .get(format!("{}/health", self.base_url.trim_end_matches('/')))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl DoiProvider for CscPidClient {
    async fn draft(&self, payload: &DoiPayload) -> Result<DoiHandle, DoiError> {
        let response = self
            .client
            .post(format!("{}/pids", self.base_url.trim_end_matches('/')))
            .json(payload)
            .send()
            .await
            .map_err(|e| DoiError::Transient(e.to_string()))?;
        map_doi_response(response).await
    }

    async fn publish(&self, doi: &str) -> Result<(), DoiError> {
        let response = self
            .client
            .post(format!("{}/pids/{doi}/publish", self.base_url.trim_end_matches('/')))
            .send()
            .await
            .map_err(|e| DoiError::Transient(e.to_string()))?;
        check_ok(response).await
    }

    async fn delete(&self, doi: &str) -> Result<(), DoiError> {
        let response = self
            .client
            .delete(format!("{}/pids/{doi}", self.base_url.trim_end_matches('/')))
            .send()
            .await
            .map_err(|e| DoiError::Transient(e.to_string()))?;
        check_ok(response).await
    }
}

async fn map_doi_response(response: reqwest::Response) -> Result<DoiHandle, DoiError> {
    let status = response.status();
    if status.is_success() {
        let body: Value = response
            .json()
            .await
            .map_err(|e| DoiError::Transient(e.to_string()))?;
        let doi = body["data"]["attributes"]["doi"]
            .as_str()
            .or_else(|| body["doi"].as_str())
            .ok_or_else(|| DoiError::Permanent("response missing doi".into()))?;
        Ok(DoiHandle { doi: doi.to_string() })
    } else if status.is_server_error() {
        Err(DoiError::Transient(format!("{status}")))
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(DoiError::Permanent(format!("{status}: {text}")))
    }
}

async fn check_ok(response: reqwest::Response) -> Result<(), DoiError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() {
        Err(DoiError::Transient(format!("{status}")))
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(DoiError::Permanent(format!("{status}: {text}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> DoiPayload {
        DoiPayload {
            titles: vec!["A dataset".into()],
            creators: vec!["Jane Doe".into()],
            publisher: "submitter".into(),
            publication_year: 2026,
        }
    }

    #[tokio::test]
    async fn datacite_draft_parses_doi_from_jsonapi_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dois"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"attributes": {"doi": "10.1234/xyz"}}
            })))
            .mount(&server)
            .await;

        let client = DataciteClient::new(server.uri(), "repo", "pw", "10.1234", Duration::from_secs(5)).unwrap();
        let handle = client.draft(&payload()).await.unwrap();
        assert_eq!(handle.doi, "10.1234/xyz");
    }

    #[tokio::test]
    async fn datacite_5xx_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dois"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = DataciteClient::new(server.uri(), "repo", "pw", "10.1234", Duration::from_secs(5)).unwrap();
        match client.draft(&payload()).await {
            Err(DoiError::Transient(_)) => {}
            other => panic!("expected Transient, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn datacite_4xx_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dois"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let client = DataciteClient::new(server.uri(), "repo", "pw", "10.1234", Duration::from_secs(5)).unwrap();
        match client.draft(&payload()).await {
            Err(DoiError::Permanent(_)) => {}
            other => panic!("expected Permanent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn csc_pid_health_reflects_endpoint_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = CscPidClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        assert!(client.health().await);
    }
}
