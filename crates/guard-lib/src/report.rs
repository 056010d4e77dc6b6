//! Plain-text run report

use std::io::{self, Write};

use colored::Colorize;

use crate::error::ClientError;
use crate::evaluator::Evaluation;
use crate::models::RunCounters;

/// Writes per-record lines, diagnostics and the final summary
pub struct Reporter<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn warning_marker(&self) -> String {
        if self.color {
            "⚠".yellow().bold().to_string()
        } else {
            "⚠".to_string()
        }
    }

    fn error_marker(&self) -> String {
        if self.color {
            "✗".red().bold().to_string()
        } else {
            "✗".to_string()
        }
    }

    pub fn malformed(&mut self, line: u64, raw: &str) -> io::Result<()> {
        let marker = self.warning_marker();
        writeln!(
            self.out,
            "{} Skipping malformed entry on line {}: {}",
            marker, line, raw
        )
    }

    pub fn storage_alert(&mut self, eval: &Evaluation) -> io::Result<()> {
        let marker = self.warning_marker();
        writeln!(
            self.out,
            "{} ALERT: Storage usage {}% exceeds threshold {}% for VM {}",
            marker, eval.storage_percent, eval.record.storage_threshold_percent, eval.record.vm_id
        )
    }

    pub fn query_failed(&mut self, vm_id: u32, err: &ClientError) -> io::Result<()> {
        let marker = self.error_marker();
        writeln!(self.out, "{} Failed to query VM {}: {}", marker, vm_id, err)
    }

    pub fn write_failed(&mut self, vm_id: u32, target_mb: u64, err: &ClientError) -> io::Result<()> {
        let marker = self.error_marker();
        writeln!(
            self.out,
            "{} Failed to set memory for VM {} to {} MB: {}",
            marker, vm_id, target_mb, err
        )
    }

    /// `- VM {name}#{id}; Memory usage: {m}% ; Storage usage: {s}% ; {label}`
    pub fn record_line(&mut self, name: &str, eval: &Evaluation, dry_run: bool) -> io::Result<()> {
        let label = match eval.action {
            Some(action) if dry_run => format!("{} (dry run)", action.label()),
            Some(action) => action.label().to_string(),
            None => String::new(),
        };
        writeln!(
            self.out,
            "- VM {}#{}; Memory usage: {}% ; Storage usage: {}% ; {}",
            name, eval.record.vm_id, eval.memory_percent, eval.storage_percent, label
        )
    }

    pub fn summary(&mut self, counters: &RunCounters) -> io::Result<()> {
        writeln!(self.out)?;
        if self.color {
            writeln!(self.out, "{}", "Summary".bold())?;
        } else {
            writeln!(self.out, "Summary")?;
        }
        writeln!(self.out, "Total items: {}", counters.total_items)?;
        writeln!(self.out, "Healthy items: {}", counters.healthy_items)?;
        writeln!(self.out, "Memory exceeded: {}", counters.memory_exceeded)?;
        writeln!(self.out, "Storage exceeded: {}", counters.storage_exceeded)?;
        if counters.api_errors > 0 {
            writeln!(self.out, "API errors: {}", counters.api_errors)?;
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::evaluate;
    use crate::models::{ThresholdRecord, UsageSnapshot};

    fn output(reporter: Reporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    fn web1() -> Evaluation {
        evaluate(
            ThresholdRecord {
                vm_id: 101,
                memory_threshold_percent: 80,
                storage_threshold_percent: 90,
            },
            UsageSnapshot {
                current_memory_mb: 781,
                total_memory_mb: 976,
                current_storage_mb: 878,
            },
            false,
        )
    }

    #[test]
    fn test_record_line_without_action() {
        let mut reporter = Reporter::new(Vec::new(), false);
        reporter.record_line("web1", &web1(), false).unwrap();
        assert_eq!(
            output(reporter),
            "- VM web1#101; Memory usage: 80% ; Storage usage: 100% ; \n"
        );
    }

    #[test]
    fn test_record_line_with_action_and_dry_run() {
        let mut eval = web1();
        eval.record.memory_threshold_percent = 10;
        let eval = evaluate(eval.record, eval.usage, false);

        let mut reporter = Reporter::new(Vec::new(), false);
        reporter.record_line("web1", &eval, false).unwrap();
        reporter.record_line("web1", &eval, true).unwrap();
        let text = output(reporter);
        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].ends_with("; Memory increased"));
        assert!(lines[1].ends_with("; Memory increased (dry run)"));
    }

    #[test]
    fn test_alert_and_warning_lines() {
        let mut reporter = Reporter::new(Vec::new(), false);
        reporter.storage_alert(&web1()).unwrap();
        reporter.malformed(3, "abc,80,90").unwrap();
        reporter
            .write_failed(
                101,
                896,
                &ClientError::Rejected {
                    body: r#"{"errors":{"memory":"bad"}}"#.to_string(),
                },
            )
            .unwrap();
        let text = output(reporter);

        assert!(text.contains("ALERT: Storage usage 100% exceeds threshold 90% for VM 101"));
        assert!(text.contains("Skipping malformed entry on line 3: abc,80,90"));
        assert!(text.contains(r#"Failed to set memory for VM 101 to 896 MB: API rejected the change: {"errors":{"memory":"bad"}}"#));
    }

    #[test]
    fn test_summary_hides_zero_api_errors() {
        let counters = RunCounters {
            total_items: 3,
            healthy_items: 1,
            memory_exceeded: 1,
            storage_exceeded: 2,
            api_errors: 0,
        };
        let mut reporter = Reporter::new(Vec::new(), false);
        reporter.summary(&counters).unwrap();
        let text = output(reporter);

        assert!(text.contains("Total items: 3\n"));
        assert!(text.contains("Healthy items: 1\n"));
        assert!(text.contains("Memory exceeded: 1\n"));
        assert!(text.contains("Storage exceeded: 2\n"));
        assert!(!text.contains("API errors"));

        let mut reporter = Reporter::new(Vec::new(), false);
        reporter
            .summary(&RunCounters {
                api_errors: 2,
                ..counters
            })
            .unwrap();
        assert!(output(reporter).contains("API errors: 2\n"));
    }
}
