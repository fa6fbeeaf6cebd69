//! Small cross-cutting domain enums shared by the database, API and worker
//! crates. The entity structs themselves (`Submission`, `MetadataObject`,
//! `File`, `Registration`, `ApiKey`) live in `database::models` as
//! `sqlx::FromRow` row types, following this corpus' convention of using
//! one struct for both the persisted row and the in-process domain value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Computed submission lifecycle state (spec §3: "derived state, not
/// stored as a column").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionState {
    Draft,
    FilesPending,
    Ingesting,
    Ready,
    Published,
    Announced,
}

/// Per-file ingest lifecycle, mirrored from the archive pipeline (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Added,
    Ready,
    Verified,
    Completed,
    Error,
}

impl IngestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStatus::Added => "added",
            IngestStatus::Ready => "ready",
            IngestStatus::Verified => "verified",
            IngestStatus::Completed => "completed",
            IngestStatus::Error => "error",
        }
    }
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IngestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "added" => Ok(IngestStatus::Added),
            "ready" => Ok(IngestStatus::Ready),
            "verified" => Ok(IngestStatus::Verified),
            "completed" => Ok(IngestStatus::Completed),
            "error" => Ok(IngestStatus::Error),
            other => Err(format!("unknown ingest status: {other}")),
        }
    }
}

/// Classification attached to a file when `ingest_status == error` (spec §3, §4.J).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestErrorType {
    User,
    Transient,
    Permanent,
}

impl IngestErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestErrorType::User => "user",
            IngestErrorType::Transient => "transient",
            IngestErrorType::Permanent => "permanent",
        }
    }
}

impl fmt::Display for IngestErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
