//! Joining the shared pause process of a rootless engine.
//!
//! The pause process keeps a user namespace (and its siblings) alive so that
//! every rootless container can share it. Callers locate it through a
//! reference file and either join it or, when it is dead, reclaim the file so
//! a fresh pause process can be started.

pub mod join;
pub mod joiner;
pub mod lock;
pub mod remove;

pub use join::NamespaceJoiner;
pub use joiner::{JoinOutcome, PauseProcessJoiner};
pub use lock::{AdvisoryLock, FileLock, FileLockProvider, LockGuard, LockProvider};
pub use remove::{FileRemover, FsRemover};
