//! `--from` / `--to` resolution against the effective manifest

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::manifest::MigrationEntry;

/// Inclusive span of manifest positions a run may attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunRange {
    /// First position in range (0-based)
    pub start: usize,
    /// Last position in range (0-based, inclusive)
    pub end: usize,
}

impl RunRange {
    /// Range covering a whole manifest of `len` entries
    pub fn full(len: usize) -> Self {
        Self {
            start: 0,
            end: len.saturating_sub(1),
        }
    }

    /// Whether `position` lies inside the range
    pub fn contains(&self, position: usize) -> bool {
        position >= self.start && position <= self.end
    }
}

/// Position of the first entry whose path or basename equals `needle`
pub fn find_index_by_name(entries: &[MigrationEntry], needle: &str) -> Option<usize> {
    entries
        .iter()
        .position(|entry| entry.file == needle || entry.basename() == needle)
}

/// Translate optional `--from` / `--to` names into a `RunRange`.
///
/// Unresolvable names and a `from` that lands after `to` are configuration
/// errors; callers surface them before any connection is opened.
pub fn resolve_range(
    entries: &[MigrationEntry],
    from: Option<&str>,
    to: Option<&str>,
) -> CoreResult<RunRange> {
    let mut range = RunRange::full(entries.len());

    if let Some(name) = from {
        range.start = find_index_by_name(entries, name).ok_or_else(|| CoreError::EntryNotFound {
            flag: "from",
            name: name.to_string(),
        })?;
    }

    if let Some(name) = to {
        range.end = find_index_by_name(entries, name).ok_or_else(|| CoreError::EntryNotFound {
            flag: "to",
            name: name.to_string(),
        })?;
    }

    if range.start > range.end {
        return Err(CoreError::RangeOutOfOrder {
            from: from.unwrap_or_default().to_string(),
            from_position: range.start + 1,
            to: to.unwrap_or_default().to_string(),
            to_position: range.end + 1,
        });
    }

    Ok(range)
}

#[cfg(test)]
#[path = "range_test.rs"]
mod tests;
