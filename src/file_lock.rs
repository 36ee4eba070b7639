//! Advisory locking of the lock document
//!
//! Rewriting `poetry.lock` in place holds an exclusive lock on the file from
//! the read to the write, so a concurrent poetry process cannot interleave its
//! own write.

use crate::lockfile::{LockDocument, LockfileError};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Lock acquisition timeout
const LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Polling interval when waiting for lock
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum FileLockError {
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Timeout acquiring lock on {path} after {timeout_secs} seconds")]
    Timeout { path: PathBuf, timeout_secs: u64 },

    #[error("Failed to acquire lock on {path}: {source}")]
    LockFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Lockfile(#[from] LockfileError),
}

/// An exclusive lock on an existing file
///
/// The lock is released when this struct is dropped.
pub struct LockedFile {
    file: File,
    path: PathBuf,
}

impl LockedFile {
    /// Acquire an exclusive lock, blocking until available or timeout
    pub fn acquire(path: &Path) -> Result<Self, FileLockError> {
        let start = Instant::now();

        loop {
            match Self::try_acquire(path)? {
                Some(lock) => return Ok(lock),
                None => {
                    if start.elapsed() >= LOCK_TIMEOUT {
                        return Err(FileLockError::Timeout {
                            path: path.to_path_buf(),
                            timeout_secs: LOCK_TIMEOUT.as_secs(),
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }

    /// Try to acquire an exclusive lock without blocking
    ///
    /// Returns `Ok(Some(lock))` if acquired, `Ok(None)` if would block,
    /// or `Err` on failure.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, FileLockError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| FileLockError::OpenFailed {
                path: path.to_path_buf(),
                source,
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(LockedFile {
                file,
                path: path.to_path_buf(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            // On some Unix platforms, EAGAIN (11) is returned instead of WouldBlock
            Err(e) if e.raw_os_error() == Some(11) => Ok(None),
            // On some Unix platforms, EACCES (13) can also indicate lock contention
            Err(e) if e.raw_os_error() == Some(13) => Ok(None),
            Err(source) => Err(FileLockError::LockFailed {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_to_string(&mut self) -> Result<String, FileLockError> {
        let mut content = String::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_string(&mut content))
            .map_err(|source| FileLockError::OpenFailed {
                path: self.path.clone(),
                source,
            })?;
        Ok(content)
    }

    /// Parse the locked file as a lock document
    pub fn read_document(&mut self) -> Result<LockDocument, FileLockError> {
        let content = self.read_to_string()?;
        LockDocument::parse(&content).map_err(|e| {
            FileLockError::Lockfile(LockfileError::Parse {
                path: self.path.clone(),
                details: e.to_string(),
            })
        })
    }

    pub fn write_document(&mut self, doc: &LockDocument) -> Result<(), FileLockError> {
        let content = doc.to_toml_string()?;
        self.replace_contents(&content)
    }

    /// Replace the whole file content while holding the lock
    pub fn replace_contents(&mut self, content: &str) -> Result<(), FileLockError> {
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.set_len(0))
            .and_then(|_| self.file.write_all(content.as_bytes()))
            .and_then(|_| self.file.sync_all())
            .map_err(|source| FileLockError::WriteFailed {
                path: self.path.clone(),
                source,
            })
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        // Closing the file releases the lock as well
        let _ = FileExt::unlock(&self.file);
    }
}
