use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
}

impl ChecksumError {
    fn from_io(e: std::io::Error, path: &Path) -> Self {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            ChecksumError::PermissionDenied(path.to_path_buf())
        } else {
            ChecksumError::Io(e)
        }
    }
}

/// Computes the hex encoded SHA-256 of a file's content.
///
/// `max_size` caps what gets hashed: a file larger than the cap yields
/// `Ok(None)` without being opened. A cap of 0 means no limit. Symlinks are
/// followed.
///
/// # Errors
/// - `ChecksumError::Io`: file doesn't exist or other I/O errors
/// - `ChecksumError::PermissionDenied`: insufficient permissions to read the file
pub fn checksum_file(path: &Path, max_size: u64) -> Result<Option<String>, ChecksumError> {
    if max_size > 0 {
        let metadata = std::fs::metadata(path).map_err(|e| ChecksumError::from_io(e, path))?;
        if metadata.len() > max_size {
            debug!(
                "Not hashing {} ({} bytes exceeds {})",
                path.display(),
                metadata.len(),
                max_size
            );
            return Ok(None);
        }
    }

    let mut file = File::open(path).map_err(|e| ChecksumError::from_io(e, path))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(ChecksumError::Io)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let sha256 = format!("{:x}", hasher.finalize());

    debug!("Checksum of {} is {}", path.display(), sha256);

    Ok(Some(sha256))
}
