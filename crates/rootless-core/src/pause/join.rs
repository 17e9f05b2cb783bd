//! Contract of the namespace-join primitive.

use std::path::PathBuf;

use rootless_common::error::Result;
use rootless_common::types::{JoinedNamespaces, NamespaceType};

/// Joins the namespaces of a process named by one of several reference files.
///
/// Implementations perform the actual `setns(2)` work. An `Err` is treated by
/// callers as a failed attempt, never as fatal on its own.
pub trait NamespaceJoiner {
    /// Tries to join the namespaces of the process referenced by `paths`.
    ///
    /// `kinds` restricts which namespaces are joined; an empty slice means
    /// every namespace of the target. `exclusive` requests that the caller be
    /// the only one joining.
    ///
    /// # Errors
    ///
    /// Returns an error if no referenced process could be joined.
    fn try_join(
        &self,
        kinds: &[NamespaceType],
        exclusive: bool,
        paths: &[PathBuf],
    ) -> Result<JoinedNamespaces>;
}

impl<T: NamespaceJoiner + ?Sized> NamespaceJoiner for &T {
    fn try_join(
        &self,
        kinds: &[NamespaceType],
        exclusive: bool,
        paths: &[PathBuf],
    ) -> Result<JoinedNamespaces> {
        (**self).try_join(kinds, exclusive, paths)
    }
}
