//! Live progress spinner during benchmark execution.

use indicatif::{ProgressBar, ProgressStyle};
use oxbonnie_core::{StageKind, StageReport};
use std::time::Duration;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Spinner naming the stage currently running.
///
/// Example output:
/// ```text
///   ⠋ Run 1: Sequential Read  [00:00:12]
/// ```
///
/// Result lines are printed through [`println`](Self::println) so they land
/// above the spinner instead of tearing it.
pub struct RunProgress {
    bar: ProgressBar,
}

impl RunProgress {
    /// Create the spinner. A disabled spinner draws nothing but still
    /// forwards [`println`](Self::println).
    pub fn new(enabled: bool, color: bool) -> Self {
        if !enabled {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let template = if color {
            "  {spinner:.cyan} {msg}  {elapsed_precise:.dim}"
        } else {
            "  {spinner} {msg}  [{elapsed_precise}]"
        };
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template(template) {
            bar.set_style(style.tick_strings(TICKS));
        }
        bar.set_message(stage_message(0, StageKind::Write));
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Advance the message to the stage that follows `report`.
    pub fn stage_finished(&self, report: &StageReport) {
        let (run, next) = match report.outcome.kind {
            StageKind::Write => (report.run, StageKind::Read),
            StageKind::Read => (report.run, StageKind::Iops),
            StageKind::Iops => (report.run + 1, StageKind::Write),
        };
        self.bar.set_message(stage_message(run, next));
    }

    /// Print a line to stdout without clobbering the spinner.
    pub fn println(&self, line: &str) {
        self.bar.suspend(|| println!("{line}"));
    }

    /// Remove the spinner.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn stage_message(run: usize, stage: StageKind) -> String {
    format!("Run {}: {}", run + 1, stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxbonnie_core::StageOutcome;

    #[test]
    fn test_stage_message() {
        assert_eq!(stage_message(0, StageKind::Write), "Run 1: Sequential Write");
        assert_eq!(stage_message(2, StageKind::Iops), "Run 3: IOPS");
    }

    #[test]
    fn test_advances_to_next_run_after_iops() {
        let progress = RunProgress::new(false, false);
        let report = StageReport {
            run: 0,
            outcome: StageOutcome {
                kind: StageKind::Iops,
                total: 1,
                elapsed: Duration::from_secs(1),
                workers: Vec::new(),
            },
        };
        progress.stage_finished(&report);
        assert_eq!(progress.bar.message(), "Run 2: Sequential Write");
        progress.finish();
    }
}
