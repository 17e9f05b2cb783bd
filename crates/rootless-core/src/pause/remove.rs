//! Removal of stale reference files.

use std::path::Path;

/// Deletes a file. Callers use it best-effort and may ignore the result.
pub trait FileRemover {
    /// Removes the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file could not be removed.
    fn remove(&self, path: &Path) -> std::io::Result<()>;
}

/// Removes files with [`std::fs::remove_file`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FsRemover;

impl FileRemover for FsRemover {
    fn remove(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_file(path)
    }
}
