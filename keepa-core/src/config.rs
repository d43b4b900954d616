use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// One configured upload task: a source directory bound to a destination bucket.
///
/// All behaviour flags default to `false` when omitted from the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub path: PathBuf,
    pub bucket_name: String,
    /// Upload one zip of the whole directory instead of individual files.
    #[serde(default)]
    pub archive_mode: bool,
    /// Stamp `-DD-MM-YYYY` onto names that carry no date yet.
    #[serde(default)]
    pub append_date: bool,
    /// Remove successfully uploaded local files afterwards.
    #[serde(default)]
    pub delete_after: bool,
    /// Prune the bucket to one object per past month after uploading.
    #[serde(default)]
    pub date_handling: bool,
}

impl Entry {
    pub fn new(path: impl Into<PathBuf>, bucket_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            bucket_name: bucket_name.into(),
            archive_mode: false,
            append_date: false,
            delete_after: false,
            date_handling: false,
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            path = %self.path.display(),
            bucket = %self.bucket_name,
            archive_mode = self.archive_mode,
            append_date = self.append_date,
            delete_after = self.delete_after,
            date_handling = self.date_handling,
            "Loaded entry"
        );
        debug!(?self, "Entry loaded (full debug)");
    }
}
