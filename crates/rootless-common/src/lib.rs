//! # rootless-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used by the rootless namespace workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the primitives that `rootless-core`
//! builds upon.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
