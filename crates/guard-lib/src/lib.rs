//! Threshold guard for Proxmox VE virtual machines
//!
//! This crate provides:
//! - Connection configuration from the environment and env files
//! - Threshold record input
//! - A Proxmox API client for VM status and memory changes
//! - Threshold evaluation, reporting and the run loop

pub mod client;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod observability;
pub mod records;
pub mod report;
pub mod runner;

pub use crate::client::{ProxmoxClient, ResourceApi};
pub use crate::config::{ConfigLoader, ProxmoxConfig};
pub use crate::error::{ClientError, ConfigError, GuardError};
pub use crate::evaluator::{evaluate, Evaluation, MemoryAction};
pub use crate::models::*;
pub use crate::observability::RunLogger;
pub use crate::records::{Entry, RecordSource};
pub use crate::report::Reporter;
pub use crate::runner::{RunOptions, Runner};
