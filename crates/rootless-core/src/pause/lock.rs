//! Advisory file locks guarding the pause-reference file.
//!
//! The lock target is the reference file itself, so it can be deleted by a
//! lock holder while other callers still wait on it. [`FileLock`] checks the
//! path after the lock is granted: a removed file is reported as
//! [`RootlessError::Vanished`], and a file recreated under the same path is
//! reopened and locked in turn.

use std::fs::File;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use rootless_common::error::{Result, RootlessError};

/// A cooperative lock bound to one path.
pub trait AdvisoryLock {
    /// Blocks until the lock is held.
    ///
    /// # Errors
    ///
    /// Returns [`RootlessError::Vanished`] if the path disappeared while
    /// waiting, or another error if locking failed.
    fn lock(&mut self) -> Result<()>;

    /// Releases the lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the release syscall fails.
    fn unlock(&mut self) -> Result<()>;

    /// Returns `true` while the lock is held.
    fn locked(&self) -> bool;
}

/// Hands out [`AdvisoryLock`]s for paths.
pub trait LockProvider {
    /// Lock type produced by this provider.
    type Lock: AdvisoryLock;

    /// Prepares a lock on `path` without taking it.
    ///
    /// # Errors
    ///
    /// Returns [`RootlessError::Vanished`] if `path` does not exist, or
    /// [`RootlessError::Lock`] for any other failure.
    fn acquire(&self, path: &Path) -> Result<Self::Lock>;
}

/// Provides `flock(2)` locks on existing files.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLockProvider;

impl LockProvider for FileLockProvider {
    type Lock = FileLock;

    fn acquire(&self, path: &Path) -> Result<FileLock> {
        FileLock::open(path)
    }
}

#[derive(Debug)]
enum Handle {
    Open(File),
    Locked(Flock<File>),
}

/// An exclusive `flock(2)` lock on an existing file.
///
/// The file is never created: a missing target is reported as
/// [`RootlessError::Vanished`].
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    // Only `None` while a state transition is in flight.
    handle: Option<Handle>,
}

impl FileLock {
    /// Opens `path` for locking.
    ///
    /// # Errors
    ///
    /// Returns [`RootlessError::Vanished`] if the file does not exist, or
    /// [`RootlessError::Lock`] if it cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| lock_error(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            handle: Some(Handle::Open(file)),
        })
    }

    /// Returns the locked path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn take_handle(&mut self) -> Result<Handle> {
        self.handle.take().ok_or_else(|| RootlessError::Lock {
            path: self.path.clone(),
            source: std::io::Error::other("lock handle lost after a failed transition"),
        })
    }

    /// Blocks on `flock(2)`, retrying when interrupted.
    fn flock(&mut self, mut file: File) -> Result<Flock<File>> {
        loop {
            match Flock::lock(file, FlockArg::LockExclusive) {
                Ok(held) => return Ok(held),
                Err((f, Errno::EINTR)) => file = f,
                Err((f, errno)) => {
                    self.handle = Some(Handle::Open(f));
                    return Err(lock_error(&self.path, errno.into()));
                }
            }
        }
    }

    /// Compares the inode behind `file` with the one the path names now.
    fn linkage(&self, file: &File) -> Result<Linkage> {
        let held = file.metadata().map_err(|e| lock_error(&self.path, e))?;
        match std::fs::metadata(&self.path) {
            Ok(current) if current.dev() == held.dev() && current.ino() == held.ino() => {
                Ok(Linkage::Current)
            }
            Ok(_) => Ok(Linkage::Replaced),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Linkage::Missing),
            Err(e) => Err(lock_error(&self.path, e)),
        }
    }
}

enum Linkage {
    Current,
    Replaced,
    Missing,
}

impl AdvisoryLock for FileLock {
    fn lock(&mut self) -> Result<()> {
        loop {
            let file = match self.take_handle()? {
                Handle::Open(file) => file,
                held @ Handle::Locked(_) => {
                    self.handle = Some(held);
                    return Ok(());
                }
            };

            let held = self.flock(file)?;
            let linkage = self.linkage(&held);
            self.handle = Some(Handle::Locked(held));
            match linkage? {
                Linkage::Current => {
                    tracing::debug!(path = %self.path.display(), "advisory lock held");
                    return Ok(());
                }
                Linkage::Missing => {
                    self.unlock()?;
                    return Err(RootlessError::Vanished {
                        path: self.path.clone(),
                    });
                }
                // A peer recreated the file while we waited; lock the new one.
                Linkage::Replaced => {
                    self.unlock()?;
                    tracing::debug!(path = %self.path.display(), "lock target replaced, reopening");
                    let file = File::open(&self.path).map_err(|e| lock_error(&self.path, e))?;
                    self.handle = Some(Handle::Open(file));
                }
            }
        }
    }

    fn unlock(&mut self) -> Result<()> {
        match self.take_handle()? {
            Handle::Locked(held) => match held.unlock() {
                Ok(file) => {
                    self.handle = Some(Handle::Open(file));
                    tracing::debug!(path = %self.path.display(), "advisory lock released");
                    Ok(())
                }
                Err((held, errno)) => {
                    self.handle = Some(Handle::Locked(held));
                    Err(lock_error(&self.path, errno.into()))
                }
            },
            open @ Handle::Open(_) => {
                self.handle = Some(open);
                Ok(())
            }
        }
    }

    fn locked(&self) -> bool {
        matches!(self.handle, Some(Handle::Locked(_)))
    }
}

/// Holds an [`AdvisoryLock`] for a scope and releases it on drop.
#[derive(Debug)]
pub struct LockGuard<L: AdvisoryLock> {
    lock: L,
}

impl<L: AdvisoryLock> LockGuard<L> {
    /// Takes `lock` and returns a guard releasing it on every exit path.
    ///
    /// # Errors
    ///
    /// Returns the error from [`AdvisoryLock::lock`]. A lock left held by a
    /// failed attempt is released before returning.
    pub fn lock(mut lock: L) -> Result<Self> {
        if let Err(e) = lock.lock() {
            if lock.locked() {
                if let Err(unlock_err) = lock.unlock() {
                    tracing::warn!(error = %unlock_err, "failed to release advisory lock");
                }
            }
            return Err(e);
        }
        Ok(Self { lock })
    }

    /// Returns the guarded lock.
    #[must_use]
    pub const fn get(&self) -> &L {
        &self.lock
    }
}

impl<L: AdvisoryLock> Drop for LockGuard<L> {
    fn drop(&mut self) {
        if self.lock.locked() {
            if let Err(e) = self.lock.unlock() {
                tracing::warn!(error = %e, "failed to release advisory lock");
            }
        }
    }
}

fn lock_error(path: &Path, source: std::io::Error) -> RootlessError {
    if source.kind() == std::io::ErrorKind::NotFound {
        RootlessError::Vanished {
            path: path.to_path_buf(),
        }
    } else {
        RootlessError::Lock {
            path: path.to_path_buf(),
            source,
        }
    }
}
