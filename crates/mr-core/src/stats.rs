//! Per-run counters

use serde::Serialize;
use std::fmt;

/// Outcome of one manifest entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Executed,
    SkippedRange,
    SkippedOptional,
    SkippedConditional,
    DryRun,
    Failed,
}

impl EntryStatus {
    /// Tag written at the start of the entry's log line
    pub fn label(self) -> &'static str {
        match self {
            EntryStatus::Executed => "OK",
            EntryStatus::SkippedRange => "SKIP:RANGE",
            EntryStatus::SkippedOptional => "SKIP:OPTIONAL",
            EntryStatus::SkippedConditional => "SKIP:CONDITIONAL",
            EntryStatus::DryRun => "DRY-RUN",
            EntryStatus::Failed => "FAIL",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Executed => write!(f, "executed"),
            EntryStatus::SkippedRange => write!(f, "skipped_range"),
            EntryStatus::SkippedOptional => write!(f, "skipped_optional"),
            EntryStatus::SkippedConditional => write!(f, "skipped_conditional"),
            EntryStatus::DryRun => write!(f, "dry_run"),
            EntryStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Counters accumulated over one run.
///
/// Every entry the run reaches increments exactly one counter, so for a run
/// that was not aborted `accounted() == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ManifestStats {
    pub total: usize,
    pub executed: usize,
    pub skipped_optional: usize,
    pub skipped_conditional: usize,
    pub skipped_range: usize,
    pub failed: usize,
    pub dry_run: usize,
}

impl ManifestStats {
    /// Fresh counters for a manifest of `total` entries
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Count one entry outcome
    pub fn record(&mut self, status: EntryStatus) {
        let counter = match status {
            EntryStatus::Executed => &mut self.executed,
            EntryStatus::SkippedRange => &mut self.skipped_range,
            EntryStatus::SkippedOptional => &mut self.skipped_optional,
            EntryStatus::SkippedConditional => &mut self.skipped_conditional,
            EntryStatus::DryRun => &mut self.dry_run,
            EntryStatus::Failed => &mut self.failed,
        };
        *counter += 1;
    }

    /// Entries that reached a decision
    pub fn accounted(&self) -> usize {
        self.executed
            + self.skipped_optional
            + self.skipped_conditional
            + self.skipped_range
            + self.failed
            + self.dry_run
    }

    /// Entries left untouched after a fail-fast abort
    pub fn not_attempted(&self) -> usize {
        self.total.saturating_sub(self.accounted())
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_increments_one_counter() {
        let mut stats = ManifestStats::new(6);
        stats.record(EntryStatus::Executed);
        stats.record(EntryStatus::SkippedRange);
        stats.record(EntryStatus::SkippedOptional);
        stats.record(EntryStatus::SkippedConditional);
        stats.record(EntryStatus::DryRun);
        stats.record(EntryStatus::Failed);

        assert_eq!(stats.executed, 1);
        assert_eq!(stats.skipped_range, 1);
        assert_eq!(stats.skipped_optional, 1);
        assert_eq!(stats.skipped_conditional, 1);
        assert_eq!(stats.dry_run, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.accounted(), 6);
        assert_eq!(stats.not_attempted(), 0);
        assert!(stats.has_failures());
    }

    #[test]
    fn test_not_attempted_after_abort() {
        let mut stats = ManifestStats::new(5);
        stats.record(EntryStatus::Executed);
        stats.record(EntryStatus::Failed);
        assert_eq!(stats.not_attempted(), 3);
    }

    #[test]
    fn test_skips_only_has_no_failures() {
        let mut stats = ManifestStats::new(2);
        stats.record(EntryStatus::SkippedOptional);
        stats.record(EntryStatus::SkippedRange);
        assert!(!stats.has_failures());
        assert_eq!(stats.executed, 0);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(EntryStatus::Executed.label(), "OK");
        assert_eq!(EntryStatus::Failed.label(), "FAIL");
        assert_eq!(EntryStatus::DryRun.label(), "DRY-RUN");
        assert_eq!(EntryStatus::SkippedConditional.to_string(), "skipped_conditional");
    }
}
