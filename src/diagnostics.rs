// src/diagnostics.rs

use serde::Serialize;
use std::{
    collections::BTreeMap,
    fmt,
    sync::{Mutex, MutexGuard},
};
use tracing::{debug, info, warn};

use crate::validate::ValidationError;

/// Why a whole file never reached the master table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Name matched the known-bad list.
    KnownBad,
    /// No handler for the file's format.
    Format,
    /// Text could not be decoded under any configured encoding.
    Encoding,
    /// Decoded, but the file itself was unreadable (truncated workbook, bad CSV framing).
    Unreadable,
    /// Nested archive that could not be unpacked.
    Extraction,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::KnownBad => "known_bad",
            SkipReason::Format => "format",
            SkipReason::Encoding => "encoding",
            SkipReason::Unreadable => "unreadable",
            SkipReason::Extraction => "extraction",
        };
        f.write_str(s)
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files_ingested: usize,
    pub files_skipped: BTreeMap<SkipReason, usize>,
    pub rows_read: usize,
    pub rows_dropped: BTreeMap<ValidationError, usize>,
    pub rows_kept: usize,
}

impl Summary {
    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.files_skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn dropped(&self, reason: ValidationError) -> usize {
        self.rows_dropped.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_skipped(&self) -> usize {
        self.files_skipped.values().sum()
    }

    pub fn total_dropped(&self) -> usize {
        self.rows_dropped.values().sum()
    }
}

/// Reporting handle passed into every component of a run.
///
/// Components never bubble recoverable failures to the caller; they record
/// them here instead. Safe to share across the worker pool.
#[derive(Debug, Default)]
pub struct Diagnostics {
    summary: Mutex<Summary>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Summary> {
        // counters stay meaningful even if a worker panicked mid-update
        self.summary.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn file_skipped(&self, name: &str, reason: SkipReason, detail: impl fmt::Display) {
        match reason {
            SkipReason::KnownBad => debug!(file = %name, %reason, "skipping: {}", detail),
            _ => warn!(file = %name, %reason, "skipping: {}", detail),
        }
        *self.lock().files_skipped.entry(reason).or_default() += 1;
    }

    pub fn file_ingested(&self, name: &str, rows: usize) {
        debug!(file = %name, rows, "ingested");
        let mut s = self.lock();
        s.files_ingested += 1;
        s.rows_read += rows;
    }

    pub fn rows_dropped(&self, name: &str, reason: ValidationError, count: usize) {
        if count == 0 {
            return;
        }
        debug!(file = %name, %reason, count, "rows dropped");
        *self.lock().rows_dropped.entry(reason).or_default() += count;
    }

    pub fn rows_kept(&self, count: usize) {
        self.lock().rows_kept += count;
    }

    /// Zero every counter, ready for the next run.
    pub fn reset(&self) {
        *self.lock() = Summary::default();
    }

    pub fn snapshot(&self) -> Summary {
        self.lock().clone()
    }

    /// One structured line with every counter, for the end of a run.
    pub fn log_summary(&self) {
        let s = self.snapshot();
        let json = serde_json::to_string(&s).unwrap_or_default();
        info!(
            files_ingested = s.files_ingested,
            files_skipped = s.total_skipped(),
            rows_read = s.rows_read,
            rows_dropped = s.total_dropped(),
            rows_kept = s.rows_kept,
            summary = %json,
            "run summary"
        );
    }
}
