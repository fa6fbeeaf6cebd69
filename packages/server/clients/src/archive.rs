//! Archive admin API client (spec §4.H, §4.J): the downstream ingest
//! pipeline the worker poller reconciles against.

use crate::http::{build_client, HealthProbe};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("transient error calling the archive admin API: {0}")]
    Transient(String),
    #[error("archive admin API rejected the request: {0}")]
    Permanent(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileStatusReport {
    pub path: String,
    pub status: String,
    /// Present only when `status == "error"`; a `user:`/`transient:`/
    /// `permanent:`-prefixed reason the poller uses to classify the error
    /// (spec §4.J "classify error_type"). Absent or unrecognized defaults
    /// to transient so the poller retries on the next tick.
    #[serde(default)]
    pub reason: Option<String>,
}

pub struct ArchiveAdminClient {
    client: ClientWithMiddleware,
    base_url: String,
    admin_token: String,
}

impl ArchiveAdminClient {
    pub fn new(base_url: impl Into<String>, admin_token: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
            admin_token: admin_token.into(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest_middleware::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.admin_token)
    }

    pub async fn ingest(&self, submission_id: &str) -> Result<(), ArchiveError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/submissions/{submission_id}/ingest"))
            .send()
            .await
            .map_err(|e| ArchiveError::Transient(e.to_string()))?;
        check_ok(response).await
    }

    pub async fn poll(&self, submission_id: &str) -> Result<Vec<FileStatusReport>, ArchiveError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/submissions/{submission_id}/status"))
            .send()
            .await
            .map_err(|e| ArchiveError::Transient(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(|e| ArchiveError::Transient(e.to_string()))
        } else if status.is_server_error() {
            Err(ArchiveError::Transient(format!("{status}")))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(ArchiveError::Permanent(format!("{status}: {text}")))
        }
    }

    pub async fn verify_complete(&self, submission_id: &str) -> Result<bool, ArchiveError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/submissions/{submission_id}/complete"))
            .send()
            .await
            .map_err(|e| ArchiveError::Transient(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            let body: serde_json::Value =
                response.json().await.map_err(|e| ArchiveError::Transient(e.to_string()))?;
            Ok(body["complete"].as_bool().unwrap_or(false))
        } else if status.is_server_error() {
            Err(ArchiveError::Transient(format!("{status}")))
        } else {
            Ok(false)
        }
    }

    pub async fn create_dataset(&self, submission_id: &str, accession_ids: &[String]) -> Result<(), ArchiveError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/submissions/{submission_id}/dataset"))
            .json(&serde_json::json!({ "accessionIds": accession_ids }))
            .send()
            .await
            .map_err(|e| ArchiveError::Transient(e.to_string()))?;
        check_ok(response).await
    }

    pub async fn release_dataset(&self, submission_id: &str) -> Result<(), ArchiveError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/submissions/{submission_id}/release"))
            .send()
            .await
            .map_err(|e| ArchiveError::Transient(e.to_string()))?;
        check_ok(response).await
    }
}

#[async_trait]
impl HealthProbe for ArchiveAdminClient {
    fn name(&self) -> &'static str {
        "archive-admin"
    }

    async fn health(&self) -> bool {
        self.request(reqwest::Method::GET, "/health")
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

async fn check_ok(response: reqwest::Response) -> Result<(), ArchiveError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() {
        Err(ArchiveError::Transient(format!("{status}")))
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(ArchiveError::Permanent(format!("{status}: {text}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn poll_parses_file_status_reports() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/submissions/sub1/status"))
            .and(header("authorization", "Bearer admintok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"path": "a.bam", "status": "ready"},
                {"path": "b.bam", "status": "error"},
            ])))
            .mount(&server)
            .await;

        let client = ArchiveAdminClient::new(server.uri(), "admintok", Duration::from_secs(5)).unwrap();
        let reports = client.poll("sub1").await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].status, "error");
    }

    #[tokio::test]
    async fn verify_complete_false_on_client_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/submissions/sub1/complete"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ArchiveAdminClient::new(server.uri(), "admintok", Duration::from_secs(5)).unwrap();
        assert!(!client.verify_complete("sub1").await.unwrap());
    }

    #[tokio::test]
    async fn ingest_5xx_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submissions/sub1/ingest"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ArchiveAdminClient::new(server.uri(), "admintok", Duration::from_secs(5)).unwrap();
        match client.ingest("sub1").await {
            Err(ArchiveError::Transient(_)) => {}
            other => panic!("expected Transient, got {other:?}"),
        }
    }
}
