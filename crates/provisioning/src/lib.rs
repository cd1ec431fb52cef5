//! `devhub-provisioning` library crate.
//!
//! Stands up a complete team workspace in the remote project-management
//! system from one [`ProvisioningRequest`](devhub_core::types::ProvisioningRequest).
//! The binary entrypoint lives in `main.rs`.

pub mod config;
pub mod error;
pub mod orchestrator;
mod steps;

pub use orchestrator::Orchestrator;
