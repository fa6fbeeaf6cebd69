//! Object store client (spec §4.H): the per-submission S3 bucket used for
//! frozen/archived datasets. Built on `aws-sdk-s3` directly rather than a
//! `reqwest`-based REST wrapper, since the object store speaks the AWS
//! signature protocol, not a bespoke JSON API.

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use thiserror::Error;

use crate::http::HealthProbe;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("transient error calling the object store: {0}")]
    Transient(String),
    #[error("object store rejected the request: {0}")]
    Permanent(String),
}

pub struct ObjectStoreClient {
    client: S3Client,
    bucket: String,
}

impl ObjectStoreClient {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self { client, bucket: bucket.into() }
    }

    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_from_env().await;
        Self { client: S3Client::new(&config), bucket: bucket.into() }
    }

    pub async fn head_bucket(&self) -> Result<(), ObjectStoreError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(classify)
    }

    pub async fn get_bucket_policy(&self) -> Result<String, ObjectStoreError> {
        let output = self
            .client
            .get_bucket_policy()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(classify)?;
        output
            .policy
            .ok_or_else(|| ObjectStoreError::Permanent("bucket has no policy attached".into()))
    }

    pub async fn put_bucket_policy(&self, policy: &str) -> Result<(), ObjectStoreError> {
        self.client
            .put_bucket_policy()
            .bucket(&self.bucket)
            .policy(policy)
            .send()
            .await
            .map(|_| ())
            .map_err(classify)
    }

    pub async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(classify)?;
        Ok(output
            .contents()
            .iter()
            .filter_map(|o| o.key().map(String::from))
            .collect())
    }
}

#[async_trait]
impl HealthProbe for ObjectStoreClient {
    fn name(&self) -> &'static str {
        "object-store"
    }

    async fn health(&self) -> bool {
        self.head_bucket().await.is_ok()
    }
}

fn classify<E: std::fmt::Debug>(err: aws_sdk_s3::error::SdkError<E>) -> ObjectStoreError {
    use aws_sdk_s3::error::SdkError;
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            ObjectStoreError::Transient(format!("{err:?}"))
        }
        SdkError::ServiceError(service_err) if service_err.raw().status().is_server_error() => {
            ObjectStoreError::Transient(format!("{err:?}"))
        }
        _ => ObjectStoreError::Permanent(format!("{err:?}")),
    }
}
