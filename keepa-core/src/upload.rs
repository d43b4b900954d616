//! Upload pipeline: validate → collect → transfer → local cleanup, per entry.
//!
//! Failures are contained at the smallest scope that makes sense:
//!   - an entry that fails validation or collection is logged and skipped
//!   - a candidate whose transfer fails is logged and recorded in [`UploadOutcome::failed`]
//!
//! Neither stops the rest of the run. Temporary archives are removed only after every
//! entry has been processed, whatever the outcome.
//!
//! # Navigation
//! - Main entrypoint: [`upload`]
//! - Result type: [`UploadOutcome`]

use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::collect::{collect, validate, TrackedTemporaries, UploadCandidate};
use crate::config::Entry;
use crate::contract::ObjectStore;
use crate::error::CollectError;

/// Aggregate result of one upload run across all entries.
#[derive(Debug, Default, Clone, Serialize)]
pub struct UploadOutcome {
    pub uploaded: Vec<UploadCandidate>,
    pub failed: Vec<UploadCandidate>,
    /// Source paths of entries that were skipped before any transfer.
    pub skipped_entries: Vec<PathBuf>,
}

impl UploadOutcome {
    fn extend(&mut self, other: EntryOutcome) {
        self.uploaded.extend(other.uploaded);
        self.failed.extend(other.failed);
    }
}

#[derive(Debug, Default)]
struct EntryOutcome {
    uploaded: Vec<UploadCandidate>,
    failed: Vec<UploadCandidate>,
}

/// Upload every entry in order and report what made it.
pub async fn upload<S>(store: &S, entries: &[Entry]) -> UploadOutcome
where
    S: ObjectStore + ?Sized,
{
    upload_on(store, entries, Local::now().date_naive()).await
}

/// [`upload`] with an explicit current date for date stamping.
pub async fn upload_on<S>(store: &S, entries: &[Entry], today: NaiveDate) -> UploadOutcome
where
    S: ObjectStore + ?Sized,
{
    info!(entries = entries.len(), "[UPLOAD] Starting upload of configured entries");
    let mut outcome = UploadOutcome::default();
    let mut temporaries = TrackedTemporaries::new();

    for entry in entries {
        match upload_entry(store, entry, today, &mut temporaries).await {
            Ok(entry_outcome) => outcome.extend(entry_outcome),
            Err(e) => {
                match &e {
                    CollectError::NotADirectory(_) => {
                        error!(path = %entry.path.display(), error = %e, "[UPLOAD] Skipping entry: not a directory")
                    }
                    _ => {
                        error!(path = %entry.path.display(), error = %e, "[UPLOAD] Skipping entry: failed to collect files")
                    }
                }
                outcome.skipped_entries.push(entry.path.clone());
            }
        }
    }

    info!(
        uploaded = outcome.uploaded.len(),
        failed = outcome.failed.len(),
        skipped_entries = outcome.skipped_entries.len(),
        "[UPLOAD] Upload finished: {} uploaded, {} failed",
        outcome.uploaded.len(),
        outcome.failed.len()
    );
    match serde_json::to_string(&outcome) {
        Ok(json) => debug!(json = %json, "[UPLOAD][DEBUG] Upload outcome as JSON"),
        Err(e) => debug!(error = ?e, "[UPLOAD][DEBUG] Failed to serialize upload outcome"),
    }

    temporaries.cleanup();
    outcome
}

async fn upload_entry<S>(
    store: &S,
    entry: &Entry,
    today: NaiveDate,
    temporaries: &mut TrackedTemporaries,
) -> Result<EntryOutcome, CollectError>
where
    S: ObjectStore + ?Sized,
{
    validate(entry)?;
    let candidates = collect(entry, today, temporaries)?;
    info!(
        path = %entry.path.display(),
        bucket = %entry.bucket_name,
        candidates = candidates.len(),
        "[UPLOAD] Transferring entry"
    );

    let outcome = transfer(store, candidates, &entry.bucket_name).await;

    if entry.delete_after {
        remove_uploaded(&outcome.uploaded, temporaries);
    }
    Ok(outcome)
}

/// Upload candidates one at a time; a failure never stops the remaining ones.
async fn transfer<S>(store: &S, candidates: Vec<UploadCandidate>, bucket: &str) -> EntryOutcome
where
    S: ObjectStore + ?Sized,
{
    let mut outcome = EntryOutcome::default();
    for candidate in candidates {
        match store
            .upload_file(&candidate.local_path, bucket, &candidate.object_key)
            .await
        {
            Ok(()) => {
                debug!(path = %candidate.local_path.display(), key = %candidate.object_key, bucket, "[UPLOAD] Uploaded file");
                outcome.uploaded.push(candidate);
            }
            Err(e) => {
                error!(path = %candidate.local_path.display(), key = %candidate.object_key, bucket, error = %e, "[UPLOAD][ERROR] Failed to upload file");
                outcome.failed.push(candidate);
            }
        }
    }
    outcome
}

/// Delete uploaded local files. Tracked temporaries are left to the final cleanup.
fn remove_uploaded(uploaded: &[UploadCandidate], temporaries: &TrackedTemporaries) {
    for candidate in uploaded {
        if temporaries.contains(&candidate.local_path) {
            continue;
        }
        match fs::remove_file(&candidate.local_path) {
            Ok(()) => debug!(path = %candidate.local_path.display(), "[UPLOAD] Removed uploaded local file"),
            Err(e) => warn!(path = %candidate.local_path.display(), error = ?e, "[UPLOAD] Failed to remove uploaded local file"),
        }
    }
}
