use std::path::PathBuf;
use thiserror::Error;

use crate::contract::StoreError;

/// Why an entry could not be turned into upload candidates.
///
/// Every variant is recovered by skipping the entry.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to write archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl CollectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CollectError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Listing or deleting failed during retention. Never recovered inside the core.
#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("failed to list objects in bucket {bucket}: {source}")]
    List {
        bucket: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to delete {count} objects from bucket {bucket}: {source}")]
    Delete {
        bucket: String,
        count: usize,
        #[source]
        source: StoreError,
    },
}
