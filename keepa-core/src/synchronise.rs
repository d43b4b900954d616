//! Top-level run: upload every entry, then prune every bucket flagged for date handling.
//!
//! The two phases share nothing but the store. Upload failures end up in the report;
//! a retention failure ends the run with an error.

use chrono::{Local, NaiveDate};
use tracing::{error, info};

use crate::config::Entry;
use crate::contract::ObjectStore;
use crate::error::RetentionError;
use crate::retention::{self, RetentionReport};
use crate::upload::{self, UploadOutcome};

#[derive(Debug)]
pub struct SynchroniseReport {
    pub upload: UploadOutcome,
    pub retention: Vec<RetentionReport>,
}

pub async fn synchronise<S>(store: &S, entries: &[Entry]) -> Result<SynchroniseReport, RetentionError>
where
    S: ObjectStore + ?Sized,
{
    synchronise_on(store, entries, Local::now().date_naive()).await
}

pub async fn synchronise_on<S>(
    store: &S,
    entries: &[Entry],
    today: NaiveDate,
) -> Result<SynchroniseReport, RetentionError>
where
    S: ObjectStore + ?Sized,
{
    info!("[SYNC] Starting run");
    let upload = upload::upload_on(store, entries, today).await;
    let retention = retain_on(store, entries, today).await?;
    info!(
        uploaded = upload.uploaded.len(),
        failed = upload.failed.len(),
        buckets_pruned = retention.len(),
        "[SYNC] Run complete"
    );
    Ok(SynchroniseReport { upload, retention })
}

/// Run retention for every `date_handling` entry, in configuration order.
pub async fn retain_on<S>(
    store: &S,
    entries: &[Entry],
    today: NaiveDate,
) -> Result<Vec<RetentionReport>, RetentionError>
where
    S: ObjectStore + ?Sized,
{
    let mut reports = Vec::new();
    for entry in entries.iter().filter(|e| e.date_handling) {
        match retention::handle_on(store, &entry.bucket_name, today).await {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!(bucket = %entry.bucket_name, error = %e, "[SYNC][ERROR] Retention failed");
                return Err(e);
            }
        }
    }
    Ok(reports)
}

pub async fn retain<S>(store: &S, entries: &[Entry]) -> Result<Vec<RetentionReport>, RetentionError>
where
    S: ObjectStore + ?Sized,
{
    retain_on(store, entries, Local::now().date_naive()).await
}
