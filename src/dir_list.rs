//! Non-recursive directory listing.
//!
//! Lists the immediate children of one directory together with their
//! metadata. Recursion, filtering and counting are the scanner's business;
//! this module only reads a directory and orders the result deterministically.

use crate::node::FileInfo;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum DirListError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
}

impl DirListError {
    fn from_io(e: std::io::Error, path: &Path) -> Self {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            DirListError::PermissionDenied(path.to_path_buf())
        } else {
            DirListError::Io(e)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    /// Symlinks are never directories here; they are not followed.
    pub is_dir: bool,
    pub info: FileInfo,
}

/// Lists `dir`, directories first, then files, each group sorted by name.
///
/// Entries whose metadata cannot be read are skipped rather than failing the
/// whole listing. Non UTF-8 names are converted lossily.
pub fn list_directory(dir: &Path) -> Result<Vec<DirEntry>, DirListError> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| DirListError::from_io(e, dir))?;

    let mut entries = Vec::new();

    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();

        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        entries.push(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir: metadata.file_type().is_dir(),
            info: FileInfo::from_metadata(&metadata),
            path,
        });
    }

    entries.sort_by(entry_order);

    Ok(entries)
}

fn entry_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name))
}
