//! Cleanup guard for a file that is still being captured
//!
//! The guard owns the responsibility of deleting the destination file. Unless
//! the capture explicitly commits the file, dropping the guard removes it, so
//! every early return and every `?` on the failure path cleans up the same way.

use std::fs;
use std::path::{Path, PathBuf};

/// Deletes the wrapped file on drop unless `commit` was called
#[derive(Debug)]
pub(crate) struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    /// Takes over cleanup duty for `path`
    ///
    /// The file does not need to exist yet; a missing file is simply
    /// not removed.
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            committed: false,
        }
    }

    /// Get the path of the guarded file
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Keeps the file on disk and releases the guard
    pub(crate) fn commit(mut self) -> PathBuf {
        self.committed = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "removed partial capture");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "could not remove partial capture"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uncommitted_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.mp3");
        fs::write(&path, b"abc").unwrap();

        {
            let guard = PartialFile::new(&path);
            assert_eq!(guard.path(), path);
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_committed_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("done.mp3");
        fs::write(&path, b"abc").unwrap();

        let kept = PartialFile::new(&path).commit();

        assert_eq!(kept, path);
        assert!(path.exists());
    }

    #[test]
    fn test_missing_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never-created.mp3");

        drop(PartialFile::new(&path));

        assert!(!path.exists());
    }
}
