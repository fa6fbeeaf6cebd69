//! Owns the submission state machine (spec §4.E). `derived_state` and the
//! transition guards are pure functions, unit-testable without a database
//! by taking `&Submission` + `&[File]` + `&WorkflowConfig`.

use database::models::{File, Submission};
use database::repositories::SubmissionPatch;
use schema::WorkflowConfig;
use serde_json::Value;
use shared::models::SubmissionState;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("submission is frozen")]
    Frozen,
    #[error("submission is not in the expected state for this transition")]
    WrongState,
    #[error("publish gate failed: {0:?}")]
    GateFailed(Vec<String>),
}

/// Derived state (spec §3): never stored as a column, computed from the
/// submission's timestamps and its non-tombstoned files.
pub fn derived_state(sub: &Submission, files: &[File]) -> SubmissionState {
    if sub.announced_at.is_some() {
        return SubmissionState::Announced;
    }
    if sub.published_at.is_some() {
        return SubmissionState::Published;
    }
    if sub.ingest_started_at.is_some() {
        let all_settled = !files.is_empty()
            && files.iter().all(|f| {
                matches!(
                    f.status(),
                    Ok(shared::models::IngestStatus::Ready)
                        | Ok(shared::models::IngestStatus::Verified)
                        | Ok(shared::models::IngestStatus::Completed)
                )
            });
        return if all_settled {
            SubmissionState::Ready
        } else {
            SubmissionState::Ingesting
        };
    }
    if files.is_empty() {
        SubmissionState::Draft
    } else {
        SubmissionState::FilesPending
    }
}

/// Mutating handlers return 405 on a frozen submission (spec §3), except
/// the `announce` transition which is the sole post-publish mutation.
pub fn reject_if_frozen(sub: &Submission) -> Result<(), SubmissionError> {
    if sub.is_frozen() {
        Err(SubmissionError::Frozen)
    } else {
        Ok(())
    }
}

pub fn try_ingest(sub: &Submission) -> Result<(), SubmissionError> {
    reject_if_frozen(sub)?;
    if sub.ingest_started_at.is_some() {
        return Err(SubmissionError::WrongState);
    }
    Ok(())
}

/// Publish gate (spec §4.E): required schemas present with cardinality,
/// dependency edges satisfied, at least one file attached (if the
/// workflow tracks files), every file `ready`, no file `error`.
pub fn publish_gate(
    state: SubmissionState,
    object_counts: &HashMap<String, usize>,
    files: &[File],
    config: &WorkflowConfig,
) -> Result<(), SubmissionError> {
    if state != SubmissionState::Ready {
        return Err(SubmissionError::WrongState);
    }

    let mut problems = Vec::new();

    for rule in config.required_schemas() {
        let count = object_counts.get(&rule.schema_name).copied().unwrap_or(0);
        if count == 0 {
            problems.push(format!("required schema '{}' has no objects", rule.schema_name));
        }
        for required in &rule.requires {
            if object_counts.get(required).copied().unwrap_or(0) == 0 {
                problems.push(format!(
                    "schema '{}' requires at least one '{}' object",
                    rule.schema_name, required
                ));
            }
        }
        if !rule.requires_or.is_empty() {
            let satisfied = rule
                .requires_or
                .iter()
                .any(|group| group.iter().all(|t| object_counts.get(t).copied().unwrap_or(0) > 0));
            if !satisfied {
                problems.push(format!(
                    "schema '{}' requires one of {:?}",
                    rule.schema_name, rule.requires_or
                ));
            }
        }
    }

    if config.tracks_files {
        if files.is_empty() {
            problems.push("workflow requires at least one attached file".into());
        }
        for file in files {
            match file.status() {
                Ok(shared::models::IngestStatus::Ready) => {}
                Ok(shared::models::IngestStatus::Error) => {
                    problems.push(format!("file '{}' is in error state", file.path));
                }
                Ok(other) => {
                    problems.push(format!("file '{}' is not ready (status={other})", file.path));
                }
                Err(e) => problems.push(e),
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(SubmissionError::GateFailed(problems))
    }
}

pub fn try_announce(sub: &Submission) -> Result<(), SubmissionError> {
    if sub.published_at.is_none() || sub.announced_at.is_some() {
        return Err(SubmissionError::WrongState);
    }
    Ok(())
}

/// PATCH deep-merge for the free-form `metadata`/`rems` documents (spec
/// §4.E): a JSON `null` deletes the key, an empty array/object clears it,
/// arrays replace wholesale, scalars/objects recurse. Delegates to
/// `shared::metadata::DataciteMetadata::merge_json` for `metadata`; `rems`
/// uses the same generic JSON merge since it has no typed model.
pub fn apply_metadata_patch(current: Value, patch: Value) -> Value {
    let mut merged = current;
    shared::metadata::merge_json(&mut merged, patch);
    merged
}

pub fn patch_from_fields(name: Option<String>, title: Option<Option<String>>, description: Option<Option<String>>) -> SubmissionPatch {
    SubmissionPatch {
        name,
        title,
        description,
        bucket: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn base_submission() -> Submission {
        Submission {
            submission_id: "s1".into(),
            project_id: "P1".into(),
            workflow: "FEGA".into(),
            name: "s1".into(),
            title: None,
            description: None,
            bucket: None,
            metadata: serde_json::json!({}),
            rems: serde_json::json!({}),
            created: Utc::now(),
            modified: Utc::now(),
            published_at: None,
            ingest_started_at: None,
            announced_at: None,
        }
    }

    #[test]
    fn empty_submission_is_draft() {
        assert_eq!(derived_state(&base_submission(), &[]), SubmissionState::Draft);
    }

    #[test]
    fn frozen_submission_rejects_mutation() {
        let mut sub = base_submission();
        sub.published_at = Some(Utc::now());
        assert_eq!(reject_if_frozen(&sub), Err(SubmissionError::Frozen));
    }

    #[test]
    fn announce_requires_published_and_not_already_announced() {
        let mut sub = base_submission();
        assert_eq!(try_announce(&sub), Err(SubmissionError::WrongState));
        sub.published_at = Some(Utc::now());
        assert!(try_announce(&sub).is_ok());
        sub.announced_at = Some(Utc::now());
        assert_eq!(try_announce(&sub), Err(SubmissionError::WrongState));
    }
}
