//! Join-or-reclaim protocol for the pause-reference file.
//!
//! A first join attempt runs without any lock. Only when it fails is the
//! reference file locked and the join retried once; if the retry fails too,
//! the file is considered stale and removed while the lock is still held.
//! "No file", "dead pause process" and "a peer already reclaimed it" all
//! surface as [`JoinOutcome::NotFound`], so callers have a single fallback:
//! start a new pause process.

use std::path::{Path, PathBuf};

use rootless_common::config::RootlessConfig;
use rootless_common::error::{Result, RootlessError};
use rootless_common::types::JoinedNamespaces;

use super::join::NamespaceJoiner;
use super::lock::{FileLockProvider, LockGuard, LockProvider};
use super::remove::{FileRemover, FsRemover};

/// Result of [`PauseProcessJoiner::join_or_reclaim`].
#[derive(Debug)]
pub enum JoinOutcome {
    /// The namespaces of the pause process were joined.
    Joined(JoinedNamespaces),
    /// There is no usable pause process; the caller may start a new one.
    NotFound,
    /// An unexpected failure occurred while locking the reference file.
    Failed(RootlessError),
}

impl JoinOutcome {
    /// Returns `true` if the namespaces were joined.
    #[must_use]
    pub const fn is_joined(&self) -> bool {
        matches!(self, Self::Joined(_))
    }

    /// Returns the PID of the joined pause process, if any.
    #[must_use]
    pub const fn pid(&self) -> Option<i32> {
        match self {
            Self::Joined(joined) => Some(joined.pid),
            Self::NotFound | Self::Failed(_) => None,
        }
    }

    /// Converts the outcome into a `Result`, mapping `NotFound` to `None`.
    ///
    /// # Errors
    ///
    /// Returns the cause carried by [`JoinOutcome::Failed`].
    pub fn into_result(self) -> Result<Option<JoinedNamespaces>> {
        match self {
            Self::Joined(joined) => Ok(Some(joined)),
            Self::NotFound => Ok(None),
            Self::Failed(e) => Err(e),
        }
    }
}

/// Joins the shared pause process, reclaiming its reference file when stale.
///
/// Safe to call concurrently from many threads and processes against the
/// same path: the reference file is only ever removed by a caller holding
/// its advisory lock, after a join under that lock has failed.
#[derive(Debug)]
pub struct PauseProcessJoiner<J, L = FileLockProvider, R = FsRemover> {
    joiner: J,
    locks: L,
    remover: R,
}

impl<J: NamespaceJoiner> PauseProcessJoiner<J> {
    /// Creates a joiner using `flock(2)` locks and plain file removal.
    pub const fn new(joiner: J) -> Self {
        Self {
            joiner,
            locks: FileLockProvider,
            remover: FsRemover,
        }
    }
}

impl<J, L, R> PauseProcessJoiner<J, L, R>
where
    J: NamespaceJoiner,
    L: LockProvider,
    R: FileRemover,
{
    /// Creates a joiner from explicit collaborators.
    pub const fn with_collaborators(joiner: J, locks: L, remover: R) -> Self {
        Self {
            joiner,
            locks,
            remover,
        }
    }

    /// Joins the pause process referenced by `path`, or reclaims the file.
    ///
    /// Returns [`JoinOutcome::NotFound`] when `path` does not exist, when the
    /// referenced process cannot be joined (the file is then removed), or
    /// when another caller removed the file first. Only unexpected locking
    /// failures yield [`JoinOutcome::Failed`].
    pub fn join_or_reclaim(&self, path: &Path) -> JoinOutcome {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no pause process reference");
            return JoinOutcome::NotFound;
        }

        let paths = [path.to_path_buf()];
        match self.try_join(&paths) {
            Ok(joined) => {
                tracing::debug!(path = %path.display(), pid = joined.pid, "joined pause process");
                return JoinOutcome::Joined(joined);
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "join failed, locking reference");
            }
        }

        let guard = match self.locks.acquire(path).and_then(LockGuard::lock) {
            Ok(guard) => guard,
            Err(e) if e.is_not_found() => {
                tracing::debug!(path = %path.display(), "pause reference removed by another caller");
                return JoinOutcome::NotFound;
            }
            Err(e) => return JoinOutcome::Failed(e),
        };

        // The reference may have been repaired while we waited for the lock.
        let outcome = match self.try_join(&paths) {
            Ok(joined) => {
                tracing::debug!(path = %path.display(), pid = joined.pid, "joined pause process under lock");
                JoinOutcome::Joined(joined)
            }
            Err(e) => {
                tracing::info!(path = %path.display(), error = %e, "removing stale pause process reference");
                if let Err(e) = self.remover.remove(path) {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove stale pause reference");
                }
                JoinOutcome::NotFound
            }
        };
        drop(guard);
        outcome
    }

    /// Runs [`Self::join_or_reclaim`] on the pause file named in `config`.
    pub fn join_configured(&self, config: &RootlessConfig) -> JoinOutcome {
        self.join_or_reclaim(&config.pause_pid_file)
    }

    fn try_join(&self, paths: &[PathBuf]) -> Result<JoinedNamespaces> {
        self.joiner.try_join(&[], false, paths)
    }
}
