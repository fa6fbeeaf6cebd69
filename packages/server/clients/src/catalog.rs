//! Metax V3 catalog client (spec §4.H). `to_metax_dataset` is the pure
//! mapping from the DataCite-shaped submission metadata to Metax's payload
//! shape, kept free of I/O so it is unit-testable without a live service.

use crate::http::{build_client, HealthProbe};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use shared::metadata::DataciteMetadata;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("transient error calling Metax: {0}")]
    Transient(String),
    #[error("Metax rejected the dataset: {0}")]
    Permanent(String),
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct MetaxActor {
    pub role: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct MetaxDatasetPayload {
    pub actors: Vec<MetaxActor>,
    pub field_of_science: Vec<String>,
    pub keyword: Vec<String>,
    pub spatial: Vec<String>,
    pub projects: Vec<String>,
    pub language: Vec<String>,
    pub access_rights: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaxDatasetHandle {
    pub persistent_identifier: String,
}

/// Mapping table from spec §4.H: creators/contributors become `actors`
/// tagged by role, subjects split across `field_of_science` and
/// `keyword`, geolocations become `spatial`, funders become `projects`,
/// language and rights carry through directly.
pub fn to_metax_dataset(metadata: &DataciteMetadata) -> MetaxDatasetPayload {
    let mut actors: Vec<MetaxActor> = metadata
        .creators
        .iter()
        .map(|c| MetaxActor { role: "creator".into(), name: c.name.clone() })
        .collect();
    actors.extend(
        metadata
            .contributors
            .iter()
            .map(|c| MetaxActor { role: c.contributor_type.clone(), name: c.name.clone() }),
    );

    let field_of_science = metadata
        .subjects
        .iter()
        .filter_map(|s| s.scheme_uri.clone())
        .collect();
    let keyword = metadata.subjects.iter().map(|s| s.subject.clone()).collect();
    let spatial = metadata
        .geo_locations
        .iter()
        .filter_map(|g| g.geo_location_place.clone())
        .collect();
    let projects = metadata.funders.iter().map(|f| f.funder_name.clone()).collect();
    let language = metadata.language.clone().into_iter().collect();
    let access_rights = metadata.rights.first().map(|r| r.rights.clone());

    MetaxDatasetPayload {
        actors,
        field_of_science,
        keyword,
        spatial,
        projects,
        language,
        access_rights,
    }
}

pub struct CatalogClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_token: String,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
            api_token: api_token.into(),
        })
    }

    pub async fn upsert_dataset(&self, payload: &MetaxDatasetPayload) -> Result<MetaxDatasetHandle, CatalogError> {
        let response = self
            .client
            .post(format!("{}/v3/datasets", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| CatalogError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| CatalogError::Transient(e.to_string()))
        } else if status.is_server_error() {
            Err(CatalogError::Transient(format!("{status}")))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(CatalogError::Permanent(format!("{status}: {text}")))
        }
    }
}

#[async_trait]
impl HealthProbe for CatalogClient {
    fn name(&self) -> &'static str {
        "metax"
    }

    async fn health(&self) -> bool {
        self.client
            .get(format!("{}/v3/healthcheck", self.base_url.trim_end_matches('/')))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::metadata::{Creator, GeoLocation, Subject};

    #[test]
    fn maps_creators_and_subjects_to_metax_shape() {
        let mut metadata = DataciteMetadata::default();
        metadata.creators.push(Creator { name: "Jane Doe".into(), ..Default::default() });
        metadata.subjects.push(Subject {
            subject: "genomics".into(),
            scheme_uri: Some("OKM".into()),
        });
        metadata.geo_locations.push(GeoLocation {
            geo_location_place: Some("Finland".into()),
            ..Default::default()
        });

        let payload = to_metax_dataset(&metadata);
        assert_eq!(payload.actors.len(), 1);
        assert_eq!(payload.actors[0].role, "creator");
        assert_eq!(payload.field_of_science, vec!["OKM".to_string()]);
        assert_eq!(payload.keyword, vec!["genomics".to_string()]);
        assert_eq!(payload.spatial, vec!["Finland".to_string()]);
    }
}
