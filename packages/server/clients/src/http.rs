//! Shared retrying HTTP client builder (spec §4.H): exponential backoff
//! with jitter, capped at 5 retries, retrying only transport errors and
//! 5xx responses. One client per downstream collaborator, built once and
//! owned by `AppState`, mirrors the teacher's `services/fetcher.rs`/
//! `services/tuf.rs` client-per-service shape; the retry middleware itself
//! (`reqwest-middleware`/`reqwest-retry`) is supplemented from the other
//! example repos that reach for bounded retry around a bare
//! `reqwest::Client`, since the teacher's own clients don't retry.

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::time::Duration;

pub const MAX_RETRIES: u32 = 5;

pub fn build_client(timeout: Duration) -> anyhow::Result<ClientWithMiddleware> {
    let inner = reqwest::Client::builder().timeout(timeout).build()?;
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES);
    Ok(ClientBuilder::new(inner)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Cheap liveness probe shared by every client so `GET /health` (spec §6)
/// can iterate a registered collaborator list, matching the teacher's
/// "components are constructed once and the health check iterates a
/// registered collaborator list" pattern (spec §9).
#[async_trait::async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &'static str;
    async fn health(&self) -> bool;
}
