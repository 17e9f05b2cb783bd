//! Domain primitive types used across the rootless workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which identifier map of a user namespace is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdKind {
    /// User identifiers (`uid_map`).
    Uid,
    /// Group identifiers (`gid_map`).
    Gid,
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uid => write!(f, "uid"),
            Self::Gid => write!(f, "gid"),
        }
    }
}

/// One contiguous range of an ID map.
///
/// `count` is at least 1 for every entry produced by the map parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdMapEntry {
    /// First identifier inside the namespace.
    pub container_start: u32,
    /// First identifier on the host that `container_start` maps to.
    pub host_start: u32,
    /// Number of identifiers in the range.
    pub count: u32,
}

impl IdMapEntry {
    /// Creates a new range entry.
    #[must_use]
    pub const fn new(container_start: u32, host_start: u32, count: u32) -> Self {
        Self {
            container_start,
            host_start,
            count,
        }
    }
}

impl fmt::Display for IdMapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.container_start, self.host_start, self.count)
    }
}

/// Kernel namespace kinds a join can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamespaceType {
    /// User namespace.
    User,
    /// Mount namespace.
    Mount,
    /// PID namespace.
    Pid,
    /// Network namespace.
    Network,
    /// IPC namespace.
    Ipc,
    /// UTS (hostname) namespace.
    Uts,
    /// Cgroup namespace.
    Cgroup,
}

impl NamespaceType {
    /// Name of the namespace link under `/proc/<pid>/ns/`.
    #[must_use]
    pub const fn proc_name(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Mount => "mnt",
            Self::Pid => "pid",
            Self::Network => "net",
            Self::Ipc => "ipc",
            Self::Uts => "uts",
            Self::Cgroup => "cgroup",
        }
    }
}

impl fmt::Display for NamespaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.proc_name())
    }
}

/// Successful result of the namespace-join primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinedNamespaces {
    /// Whether the caller became root inside the joined user namespace.
    pub became_root: bool,
    /// PID of the pause process whose namespaces were joined.
    pub pid: i32,
}
