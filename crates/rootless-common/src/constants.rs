//! System-wide constants and default paths.

use std::path::PathBuf;

/// Kernel UID map of the calling process.
pub const SELF_UID_MAP: &str = "/proc/self/uid_map";

/// Kernel GID map of the calling process.
pub const SELF_GID_MAP: &str = "/proc/self/gid_map";

/// File name of the pause-process reference file.
pub const PAUSE_PID_FILE: &str = "pause.pid";

/// Directory, relative to the runtime dir, holding the pause reference.
pub const PAUSE_PID_SUBDIR: &str = "libpod/tmp";

/// Returns the per-user runtime directory.
///
/// Prefers `$XDG_RUNTIME_DIR` and falls back to the system temp directory.
pub fn runtime_dir() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .filter(|dir| !dir.is_empty())
        .map_or_else(std::env::temp_dir, PathBuf::from)
}

/// Returns the default pause-process reference file path.
pub fn default_pause_pid_file() -> PathBuf {
    runtime_dir().join(PAUSE_PID_SUBDIR).join(PAUSE_PID_FILE)
}
