//! Persisted row types. Doubles as the in-process domain value, following
//! this corpus' convention (teacher's `database::models::User`) of not
//! introducing a parallel DTO layer for every entity.
//!
//! ID columns are `TEXT`, not Postgres' native `uuid` type: FEGA/SD mint
//! RFC 4122 UUIDv4 strings, but BP mints a deterministic
//! `{center}_{hash}` accession that is not UUID-shaped (spec §4.C), and a
//! BP submission's `submission_id` *is* its dataset's BP accession (spec
//! §9 open question, resolved in DESIGN.md). A `TEXT` column accepts both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub submission_id: String,
    pub project_id: String,
    pub workflow: String,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub bucket: Option<String>,
    pub metadata: Value,
    pub rems: Value,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub ingest_started_at: Option<DateTime<Utc>>,
    pub announced_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn is_frozen(&self) -> bool {
        self.published_at.is_some()
    }

    pub fn workflow(&self) -> Result<shared::workflow::Workflow, String> {
        self.workflow.parse()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MetadataObject {
    pub accession_id: String,
    pub submission_id: String,
    pub project_id: String,
    pub object_type: String,
    pub name: String,
    pub title: Option<String>,
    pub content: Value,
    pub xml: Option<Vec<u8>>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Checksum {
    #[sqlx(rename = "type")]
    pub checksum_type: String,
    pub value: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct File {
    pub accession_id: String,
    pub submission_id: String,
    pub project_id: String,
    pub object_id: Option<String>,
    pub path: String,
    pub bytes: i64,
    pub version: i32,
    pub checksum_unencrypted_type: Option<String>,
    pub checksum_unencrypted_value: Option<String>,
    pub checksum_encrypted_type: Option<String>,
    pub checksum_encrypted_value: Option<String>,
    pub ingest_status: String,
    pub ingest_error_type: Option<String>,
    pub ingest_error_count: i32,
    pub tombstoned: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl File {
    pub fn status(&self) -> Result<shared::models::IngestStatus, String> {
        self.ingest_status.parse()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub submission_id: String,
    pub object_id: Option<String>,
    pub service: String,
    pub external_id: String,
    pub meta: Value,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ApiKey {
    pub key_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub prefix: String,
    pub salted_hash: String,
    pub lookup_hash: String,
    pub created: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RefreshToken {
    pub token_hash: String,
    pub user_id: Uuid,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}
