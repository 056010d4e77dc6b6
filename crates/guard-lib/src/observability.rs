//! Logging for guard runs
//!
//! Diagnostics go to stderr through `tracing` so stdout carries only the
//! report. [`RunLogger`] emits the structured events of a run.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::evaluator::MemoryAction;
use crate::models::RunCounters;

/// Install the global subscriber.
///
/// `verbose` forces `debug`; otherwise `RUST_LOG` applies, defaulting to `warn`.
pub fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Structured logger for run events
#[derive(Debug, Clone)]
pub struct RunLogger {
    node: String,
    started_at: DateTime<Utc>,
}

impl RunLogger {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            started_at: Utc::now(),
        }
    }

    pub fn log_run_started(&self, input: &str, optimize: bool, dry_run: bool) {
        info!(
            event = "run_started",
            node = %self.node,
            input = %input,
            optimize,
            dry_run,
            started_at = %self.started_at.to_rfc3339(),
            "Threshold run started"
        );
    }

    pub fn log_memory_adjusted(
        &self,
        vm_id: u32,
        action: MemoryAction,
        current_mb: u64,
        success: bool,
    ) {
        if success {
            info!(
                event = "memory_adjusted",
                node = %self.node,
                vm_id,
                action = %action,
                current_mb,
                target_mb = action.target_mb(),
                "VM memory updated"
            );
        } else {
            warn!(
                event = "memory_adjust_failed",
                node = %self.node,
                vm_id,
                action = %action,
                current_mb,
                target_mb = action.target_mb(),
                "VM memory update failed"
            );
        }
    }

    pub fn log_run_finished(&self, counters: &RunCounters) {
        let elapsed_ms = (Utc::now() - self.started_at).num_milliseconds();
        info!(
            event = "run_finished",
            node = %self.node,
            total_items = counters.total_items,
            healthy_items = counters.healthy_items,
            memory_exceeded = counters.memory_exceeded,
            storage_exceeded = counters.storage_exceeded,
            api_errors = counters.api_errors,
            elapsed_ms,
            "Threshold run finished"
        );
    }
}
