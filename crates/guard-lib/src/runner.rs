//! Sequential poll-compare-act loop

use std::io::Write;

use tracing::{debug, info, warn};

use crate::client::ResourceApi;
use crate::error::GuardError;
use crate::evaluator::{evaluate, Evaluation};
use crate::models::{RunCounters, ThresholdRecord};
use crate::observability::RunLogger;
use crate::records::Entry;
use crate::report::Reporter;

/// Behaviour switches for a run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Shrink allocations that sit below threshold
    pub optimize: bool,
    /// Decide and report without issuing writes
    pub dry_run: bool,
}

/// Drives entries one at a time: fetch, evaluate, act, report
pub struct Runner<A: ResourceApi, W: Write> {
    api: A,
    reporter: Reporter<W>,
    options: RunOptions,
    logger: RunLogger,
}

impl<A: ResourceApi, W: Write> Runner<A, W> {
    pub fn new(api: A, reporter: Reporter<W>, options: RunOptions, logger: RunLogger) -> Self {
        Self {
            api,
            reporter,
            options,
            logger,
        }
    }

    pub fn into_reporter(self) -> Reporter<W> {
        self.reporter
    }

    /// Process every entry in order, print the summary and return the totals
    pub async fn run<I>(&mut self, entries: I) -> Result<RunCounters, GuardError>
    where
        I: IntoIterator<Item = Entry>,
    {
        let mut counters = RunCounters::default();

        for entry in entries {
            let delta = match entry {
                Entry::Malformed { line, raw } => {
                    warn!(line, raw = %raw, "Malformed threshold entry");
                    self.reporter.malformed(line, &raw)?;
                    RunCounters::malformed()
                }
                Entry::Valid(record) => self.process(record).await?,
            };
            counters = counters.merge(delta);
        }

        self.reporter.summary(&counters)?;
        self.logger.log_run_finished(&counters);
        Ok(counters)
    }

    /// Evaluate one record; API failures are reported, not returned
    pub async fn process(&mut self, record: ThresholdRecord) -> Result<RunCounters, GuardError> {
        let status = match self.api.status(record.vm_id).await {
            Ok(status) => status,
            Err(err) => {
                warn!(vm_id = record.vm_id, error = %err, "Failed to fetch VM status");
                self.reporter.query_failed(record.vm_id, &err)?;
                return Ok(RunCounters::api_error());
            }
        };

        let eval = evaluate(record, status.usage(), self.options.optimize);
        debug!(
            vm_id = record.vm_id,
            memory_percent = eval.memory_percent,
            storage_percent = eval.storage_percent,
            "Evaluated thresholds"
        );

        self.apply(&eval).await?;

        if eval.storage_exceeded {
            self.reporter.storage_alert(&eval)?;
        }

        self.reporter
            .record_line(status.display_name(), &eval, self.options.dry_run)?;

        Ok(eval.counters())
    }

    /// Issue the memory write for the chosen action, if any.
    ///
    /// Counters follow the decision, so a failed write is only reported.
    async fn apply(&mut self, eval: &Evaluation) -> Result<(), GuardError> {
        let Some(action) = eval.action else {
            return Ok(());
        };
        let vm_id = eval.record.vm_id;
        let current_mb = eval.usage.current_memory_mb;

        if self.options.dry_run {
            info!(vm_id, action = %action, target_mb = action.target_mb(), "Dry run, skipping memory update");
            return Ok(());
        }

        match self.api.set_memory(vm_id, action.target_mb()).await {
            Ok(()) => self.logger.log_memory_adjusted(vm_id, action, current_mb, true),
            Err(err) => {
                self.logger.log_memory_adjusted(vm_id, action, current_mb, false);
                self.reporter.write_failed(vm_id, action.target_mb(), &err)?;
            }
        }
        Ok(())
    }
}
