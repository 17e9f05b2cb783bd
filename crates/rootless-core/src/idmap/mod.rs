//! UID/GID ranges of the current user namespace.
//!
//! Namespace ID maps are fixed once the namespace exists, so the ranges are
//! parsed once and kept for the lifetime of the process.

pub mod inventory;
pub mod parser;

pub use inventory::{
    IdRangeInventory, available_gid_map, available_gids, available_uid_map, available_uids,
    system,
};
pub use parser::{IdMapParser, ProcIdMapParser, parse_id_map};
