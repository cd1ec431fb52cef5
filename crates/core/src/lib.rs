//! Pure domain logic for workspace provisioning.
//!
//! This crate has no internal dependencies and performs no I/O: data
//! model, sprint/iteration calendar generation, the step policy table, and
//! the fixed board, backlog, and repository configuration documents.

pub mod board;
pub mod error;
pub mod policy;
pub mod repo_policy;
pub mod schedule;
pub mod types;
