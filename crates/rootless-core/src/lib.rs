//! # rootless-core
//!
//! Namespace bookkeeping for rootless containers.
//!
//! This crate provides:
//! - **Pause joining**: re-entering the namespaces of a shared pause process
//!   through its reference file, and reclaiming the file under an advisory
//!   lock once the process is gone.
//! - **ID ranges**: the UID/GID ranges of the current user namespace, parsed
//!   once per process and reused.
//!
//! The namespace-join system calls themselves are supplied by the caller
//! through [`pause::NamespaceJoiner`].

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod idmap;
pub mod pause;
