//! Month-based retention for dated objects.
//!
//! For every past calendar month, only the most recent object is kept. Keys without an
//! embedded date, and keys dated in the current month of the current year, are never
//! touched.
//!
//! Unlike the upload pipeline, retention does not contain its failures: a listing or
//! delete error aborts [`handle`] for that bucket and is returned to the caller.

use chrono::{Datelike, Local, NaiveDate};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::contract::ObjectStore;
use crate::error::RetentionError;
use crate::naming::extract_date;

/// An object key together with the date parsed out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedObjectKey {
    pub key: String,
    pub date: NaiveDate,
}

/// What one retention pass did to a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub bucket: String,
    /// Keys that took part in grouping.
    pub examined: usize,
    /// Survivors, one per (year, month) group.
    pub retained: Vec<String>,
    pub deleted: Vec<String>,
}

/// Parse a date out of every key, dropping undated keys and keys in today's month.
///
/// A key is excluded only when its month *and* year both equal today's.
pub fn dated_keys<I, K>(keys: I, today: NaiveDate) -> Vec<DatedObjectKey>
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    keys.into_iter()
        .filter_map(|key| {
            let key = key.into();
            let Some(date) = extract_date(&key) else {
                debug!(key = %key, "[RETENTION] No date in key, leaving untouched");
                return None;
            };
            if date.month() == today.month() && date.year() == today.year() {
                debug!(key = %key, %date, "[RETENTION] Key is in the current month, leaving untouched");
                return None;
            }
            Some(DatedObjectKey { key, date })
        })
        .collect()
}

/// Group by (year, month) and split each group into its latest key and the rest.
///
/// Returns `(retained, to_delete)`. Within a group, equal dates keep input order, so the
/// first-listed of several same-day keys survives.
pub fn select_for_deletion(keys: Vec<DatedObjectKey>) -> (Vec<String>, Vec<String>) {
    let mut groups: BTreeMap<(i32, u32), Vec<DatedObjectKey>> = BTreeMap::new();
    for key in keys {
        groups
            .entry((key.date.year(), key.date.month()))
            .or_default()
            .push(key);
    }

    let mut retained = Vec::with_capacity(groups.len());
    let mut to_delete = Vec::new();
    for ((year, month), mut group) in groups {
        group.sort_by(|a, b| b.date.cmp(&a.date));
        let mut members = group.into_iter();
        if let Some(latest) = members.next() {
            debug!(year, month, key = %latest.key, "[RETENTION] Retaining latest key of month");
            retained.push(latest.key);
        }
        to_delete.extend(members.map(|k| k.key));
    }
    (retained, to_delete)
}

/// Apply retention to `bucket` using today's local date.
pub async fn handle<S>(store: &S, bucket: &str) -> Result<RetentionReport, RetentionError>
where
    S: ObjectStore + ?Sized,
{
    handle_on(store, bucket, Local::now().date_naive()).await
}

/// [`handle`] with an explicit current date.
pub async fn handle_on<S>(
    store: &S,
    bucket: &str,
    today: NaiveDate,
) -> Result<RetentionReport, RetentionError>
where
    S: ObjectStore + ?Sized,
{
    info!(bucket, "[RETENTION] Starting date-based retention");
    let objects = store
        .list_objects(bucket)
        .await
        .map_err(|source| RetentionError::List {
            bucket: bucket.to_string(),
            source,
        })?;
    let listed = objects.len();

    let dated = dated_keys(objects.into_iter().map(|o| o.key), today);
    let examined = dated.len();
    let (retained, to_delete) = select_for_deletion(dated);

    if !to_delete.is_empty() {
        store
            .delete_objects(bucket, &to_delete)
            .await
            .map_err(|source| RetentionError::Delete {
                bucket: bucket.to_string(),
                count: to_delete.len(),
                source,
            })?;
    }

    info!(
        bucket,
        listed,
        examined,
        retained = retained.len(),
        deleted = to_delete.len(),
        "[RETENTION] Retention complete"
    );
    Ok(RetentionReport {
        bucket: bucket.to_string(),
        examined,
        retained,
        deleted: to_delete,
    })
}
