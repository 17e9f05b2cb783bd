//! Configuration model for the rootless namespace services.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::IdKind;

/// Paths used by the pause joiner and the ID-range inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootlessConfig {
    /// Pause-process reference file.
    pub pause_pid_file: PathBuf,
    /// UID map of the current user namespace.
    pub uid_map: PathBuf,
    /// GID map of the current user namespace.
    pub gid_map: PathBuf,
}

impl RootlessConfig {
    /// Returns the map file for the given kind.
    #[must_use]
    pub fn id_map(&self, kind: IdKind) -> &Path {
        match kind {
            IdKind::Uid => &self.uid_map,
            IdKind::Gid => &self.gid_map,
        }
    }
}

impl Default for RootlessConfig {
    fn default() -> Self {
        Self {
            pause_pid_file: crate::constants::default_pause_pid_file(),
            uid_map: PathBuf::from(crate::constants::SELF_UID_MAP),
            gid_map: PathBuf::from(crate::constants::SELF_GID_MAP),
        }
    }
}
