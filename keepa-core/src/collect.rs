//! Turns a configured [`Entry`] into the concrete files to transfer.
//!
//! - Directory mode walks the source tree; the object key of each file is its path
//!   relative to the source root, `/`-separated, never starting with `/`.
//! - Archive mode packs the whole tree into one zip and yields a single candidate keyed
//!   by the archive file name. The archive lives in a temporary directory registered in
//!   [`TrackedTemporaries`] and removed at the end of the run.

use chrono::NaiveDate;
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::Entry;
use crate::error::CollectError;
use crate::naming::ensure_dated_on;

/// One file or archive slated for transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadCandidate {
    /// Where the bytes are on local disk.
    pub local_path: PathBuf,
    /// Key to store them under in the bucket.
    pub object_key: String,
}

/// Temporary artifacts created during a run.
///
/// Each archive gets its own temporary directory. The directories are removed by
/// [`TrackedTemporaries::cleanup`] at the end of the run, or when the tracker is dropped
/// on any other exit path.
#[derive(Debug, Default)]
pub struct TrackedTemporaries {
    dirs: Vec<TempDir>,
}

impl TrackedTemporaries {
    pub fn new() -> Self {
        Self::default()
    }

    fn track(&mut self, dir: TempDir) {
        self.dirs.push(dir);
    }

    /// Whether `path` lies inside one of the tracked temporaries.
    pub fn contains(&self, path: &Path) -> bool {
        self.dirs.iter().any(|d| path.starts_with(d.path()))
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Remove every tracked temporary, logging (not returning) failures.
    pub fn cleanup(self) {
        let count = self.dirs.len();
        for dir in self.dirs {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!(path = %path.display(), "Removed temporary directory"),
                Err(e) => warn!(error = ?e, path = %path.display(), "Failed to remove temporary directory"),
            }
        }
        info!(count, "Temporary archives cleaned up");
    }
}

/// Check the entry's source path before collecting.
///
/// A nested directory outside archive mode is only a warning: every file becomes its
/// own request, which costs more but is still correct.
pub fn validate(entry: &Entry) -> Result<(), CollectError> {
    if !entry.path.is_dir() {
        return Err(CollectError::NotADirectory(entry.path.clone()));
    }
    if !entry.archive_mode && has_subdirectories(&entry.path)? {
        warn!(
            path = %entry.path.display(),
            "Directory depth is greater than 1 but archive mode is off; every nested file is uploaded as a separate request"
        );
    }
    Ok(())
}

fn has_subdirectories(dir: &Path) -> Result<bool, CollectError> {
    let entries = fs::read_dir(dir).map_err(|e| CollectError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CollectError::io(dir, e))?;
        if entry.path().is_dir() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Produce the upload candidates for `entry` according to its mode.
pub fn collect(
    entry: &Entry,
    today: NaiveDate,
    temporaries: &mut TrackedTemporaries,
) -> Result<Vec<UploadCandidate>, CollectError> {
    if entry.archive_mode {
        let candidate = create_archive(&entry.path, entry.append_date, today, temporaries)?;
        Ok(vec![candidate])
    } else {
        dir_files(&entry.path, entry.append_date, today)
    }
}

/// Walk `root` and key every regular file by its relative path.
pub fn dir_files(
    root: &Path,
    append_date: bool,
    today: NaiveDate,
) -> Result<Vec<UploadCandidate>, CollectError> {
    let mut candidates = Vec::new();
    for item in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                warn!(error = %e, root = %root.display(), "Skipping unreadable entry during walk");
                continue;
            }
        };
        if !is_regular_file(&item) {
            continue;
        }
        let Some(key) = relative_key(root, item.path()) else {
            continue;
        };
        let object_key = if append_date {
            ensure_dated_on(&key, today)
        } else {
            key
        };
        debug!(path = %item.path().display(), key = %object_key, "Collected file");
        candidates.push(UploadCandidate {
            local_path: item.path().to_path_buf(),
            object_key,
        });
    }
    info!(root = %root.display(), count = candidates.len(), "Collected files from directory");
    Ok(candidates)
}

/// Symlinks are reported by their own type and so never count as regular files.
fn is_regular_file(item: &walkdir::DirEntry) -> bool {
    item.file_type().is_file()
}

/// `/`-joined path of `path` relative to `root`, with no leading separator.
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/").trim_start_matches('/').to_string())
}

/// Pack `dir` into `<dir name>.zip` inside a fresh tracked temporary directory.
pub fn create_archive(
    dir: &Path,
    append_date: bool,
    today: NaiveDate,
    temporaries: &mut TrackedTemporaries,
) -> Result<UploadCandidate, CollectError> {
    // `.` and `..` carry no file name of their own.
    let resolved = dir.canonicalize().map_err(|e| CollectError::io(dir, e))?;
    let dir_name = resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    let archive_name = format!("{dir_name}.zip");
    let archive_name = if append_date {
        ensure_dated_on(&archive_name, today)
    } else {
        archive_name
    };

    let workdir = tempfile::Builder::new()
        .prefix("keepa-")
        .tempdir()
        .map_err(|e| CollectError::io(std::env::temp_dir(), e))?;
    let archive_path = workdir.path().join(&archive_name);
    // Registered before writing, so a failed write is still cleaned up.
    temporaries.track(workdir);

    write_zip(dir, &archive_path)?;

    info!(
        source = %dir.display(),
        archive = %archive_path.display(),
        "Created archive for upload"
    );
    Ok(UploadCandidate {
        local_path: archive_path,
        object_key: archive_name,
    })
}

fn write_zip(dir: &Path, archive_path: &Path) -> Result<(), CollectError> {
    let file = File::create(archive_path).map_err(|e| CollectError::io(archive_path, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let archive_err = |source: zip::result::ZipError| CollectError::Archive {
        path: archive_path.to_path_buf(),
        source,
    };

    for item in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let item = item.map_err(|source| CollectError::Walk {
            root: dir.to_path_buf(),
            source,
        })?;
        let Some(name) = relative_key(dir, item.path()) else {
            continue;
        };
        if item.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), options)
                .map_err(archive_err)?;
        } else if is_regular_file(&item) {
            zip.start_file(name, options).map_err(archive_err)?;
            let mut source = File::open(item.path()).map_err(|e| CollectError::io(item.path(), e))?;
            io::copy(&mut source, &mut zip).map_err(|e| CollectError::io(item.path(), e))?;
        }
    }
    zip.finish().map_err(archive_err)?;
    Ok(())
}
