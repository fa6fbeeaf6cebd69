//! The ingest poller (spec §4.J): a single dedicated long-running task that
//! reconciles every submission in the derived `ingesting` state against the
//! archive admin API, tick by tick.

use clients::{ArchiveAdminClient, ArchiveError};
use database::models::{File, Submission};
use database::repositories::{FileRepository, NewRegistration, ObjectRepository, RegistrationRepository, SubmissionRepository};
use database::Database;
use shared::models::{IngestErrorType, IngestStatus};
use std::sync::Arc;
use std::time::Duration;

const ARCHIVE_SERVICE: &str = "archive";

pub struct Poller {
    db: Arc<Database>,
    archive: Arc<ArchiveAdminClient>,
    interval: Duration,
}

impl Poller {
    pub fn new(db: Arc<Database>, archive: Arc<ArchiveAdminClient>, interval: Duration) -> Self {
        Self { db, archive, interval }
    }

    /// Runs until `shutdown` fires, ticking every `interval`.
    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "poller tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("poller shutting down");
                        return;
                    }
                }
            }
        }
    }

    async fn tick(&self) -> anyhow::Result<()> {
        let submissions = SubmissionRepository::new(self.db.pool.clone()).list_ingesting().await?;
        tracing::debug!(count = submissions.len(), "polling ingesting submissions");

        for submission in submissions {
            if let Err(e) = self.reconcile(&submission).await {
                tracing::warn!(submission_id = %submission.submission_id, error = %e, "reconcile failed, retrying next tick");
            }
        }
        Ok(())
    }

    /// One submission's worth of the spec §4.J algorithm. Takes the
    /// submission's row lock for the duration of the DB writes only — the
    /// `admin.poll` call itself happens before the lock is acquired so a
    /// slow archive never blocks other submissions' mutations.
    async fn reconcile(&self, submission: &Submission) -> anyhow::Result<()> {
        let reports = match self.archive.poll(&submission.submission_id).await {
            Ok(reports) => reports,
            Err(ArchiveError::Transient(msg)) => {
                tracing::debug!(submission_id = %submission.submission_id, %msg, "transient poll failure, retrying next tick");
                return Ok(());
            }
            Err(ArchiveError::Permanent(msg)) => {
                anyhow::bail!("archive rejected poll for '{}': {msg}", submission.submission_id);
            }
        };

        let mut tx = self.db.pool.begin().await?;
        let locked = SubmissionRepository::try_lock_for_update(&mut tx, &submission.submission_id).await?;
        let Some(_locked) = locked else {
            tracing::debug!(submission_id = %submission.submission_id, "submission locked elsewhere, skipping this tick");
            return Ok(());
        };

        let files = FileRepository::new(self.db.pool.clone()).list_by_submission(&submission.submission_id).await?;
        for report in &reports {
            let Some(file) = files.iter().find(|f| f.path == report.path) else { continue };
            apply_status(&FileRepository::new(self.db.pool.clone()), file, &report.status, report.reason.as_deref()).await?;
        }
        tx.commit().await?;

        let files = FileRepository::new(self.db.pool.clone()).list_by_submission(&submission.submission_id).await?;
        if all_ready(&files) && self.archive.verify_complete(&submission.submission_id).await.unwrap_or(false) {
            self.finalize(submission).await?;
        }

        Ok(())
    }

    /// `admin.create_dataset` + the derived transition to `ready` (spec
    /// §4.J). The derived state already reads `ready` once every file is
    /// settled; a `Registration` row for the `archive` service is the
    /// idempotency marker so `create_dataset` is called exactly once.
    async fn finalize(&self, submission: &Submission) -> anyhow::Result<()> {
        let regs = RegistrationRepository::new(self.db.pool.clone());
        if regs.find(&submission.submission_id, None, ARCHIVE_SERVICE).await?.is_some() {
            return Ok(());
        }

        let objects = ObjectRepository::new(self.db.pool.clone()).list_by_submission(&submission.submission_id).await?;
        let accession_ids: Vec<String> = objects.into_iter().map(|o| o.accession_id).collect();

        self.archive.create_dataset(&submission.submission_id, &accession_ids).await?;

        let mut tx = self.db.pool.begin().await?;
        RegistrationRepository::create_tx(
            &mut tx,
            NewRegistration {
                submission_id: submission.submission_id.clone(),
                object_id: None,
                service: ARCHIVE_SERVICE.to_string(),
                external_id: submission.submission_id.clone(),
                meta: serde_json::json!({}),
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(submission_id = %submission.submission_id, "submission ready, dataset created");
        Ok(())
    }
}

fn all_ready(files: &[File]) -> bool {
    !files.is_empty() && files.iter().all(|f| matches!(f.status(), Ok(IngestStatus::Ready | IngestStatus::Verified | IngestStatus::Completed)))
}

async fn apply_status(repo: &FileRepository, file: &File, status: &str, reason: Option<&str>) -> anyhow::Result<()> {
    match status {
        // The admin API's status report carries no checksum payload, only a
        // pass/fail verdict per path; the checksum value columns get filled
        // in by whatever step actually computed them upstream of the report.
        "ready" if file.ingest_status != "ready" => {
            repo.set_unencrypted_checksum(&file.accession_id, "sha256", &file.checksum_unencrypted_value.clone().unwrap_or_default()).await?;
        }
        "verified" if file.ingest_status != "verified" => {
            repo.set_encrypted_checksum(&file.accession_id, "sha256", &file.checksum_encrypted_value.clone().unwrap_or_default()).await?;
        }
        // "completed" (spec §3 monotonic progression added->ready->verified
        // ->completed) is the poller's own marker that a file has been
        // matched to its metadata object, distinct from the checksum
        // milestones above. Requires the file to already carry the
        // `object_id` set by `PATCH /submissions/{id}/files`; without one
        // there is nothing to attach and the file is left for a later tick.
        "completed" if file.ingest_status != "completed" => {
            let Some(object_id) = file.object_id.as_deref() else {
                tracing::debug!(file = %file.path, "archive reports completed but no object is linked yet, retrying next tick");
                return Ok(());
            };
            repo.attach_object(&file.accession_id, object_id).await?;
        }
        "error" => {
            let error_type = classify_error(reason);
            tracing::warn!(file = %file.path, %error_type, "file ingest error reported");
            repo.mark_error(&file.accession_id, error_type.as_str()).await?;
        }
        _ => {}
    }
    Ok(())
}

/// `user:`/`permanent:`-prefixed reasons classify directly; anything else
/// (including no reason at all) defaults to transient so the poller keeps
/// retrying (spec §4.J: "transient errors are retried on next tick").
fn classify_error(reason: Option<&str>) -> IngestErrorType {
    match reason.and_then(|r| r.split_once(':')).map(|(kind, _)| kind) {
        Some("user") => IngestErrorType::User,
        Some("permanent") => IngestErrorType::Permanent,
        _ => IngestErrorType::Transient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_error_defaults_to_transient() {
        assert_eq!(classify_error(None), IngestErrorType::Transient);
        assert_eq!(classify_error(Some("network blip")), IngestErrorType::Transient);
    }

    #[test]
    fn classify_error_recognizes_user_and_permanent_prefixes() {
        assert_eq!(classify_error(Some("user:checksum_mismatch")), IngestErrorType::User);
        assert_eq!(classify_error(Some("permanent:corrupt_archive")), IngestErrorType::Permanent);
    }

    fn sample_file(status: &str) -> File {
        File {
            accession_id: "f1".into(),
            submission_id: "s1".into(),
            project_id: "p1".into(),
            object_id: None,
            path: "a.bam".into(),
            bytes: 10,
            version: 1,
            checksum_unencrypted_type: None,
            checksum_unencrypted_value: None,
            checksum_encrypted_type: None,
            checksum_encrypted_value: None,
            ingest_status: status.to_string(),
            ingest_error_type: None,
            ingest_error_count: 0,
            tombstoned: false,
            created: chrono::Utc::now(),
            modified: chrono::Utc::now(),
        }
    }

    #[test]
    fn all_ready_requires_at_least_one_file_and_settled_status() {
        assert!(!all_ready(&[]));
        assert!(all_ready(&[sample_file("ready")]));
        assert!(!all_ready(&[sample_file("ready"), sample_file("added")]));
        assert!(all_ready(&[sample_file("verified"), sample_file("completed")]));
    }
}
