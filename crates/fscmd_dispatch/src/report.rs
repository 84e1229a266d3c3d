//! Dispatch/copy report models and mutable report builders.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::spec::{EnumFolderOutcome, EnumOperation, SpecCopyError};

////////////////////////////////////////////////////////////////////////////////
// #region ReportDispatch

/// What one dispatched command did. Internal result; the boundary discards it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDispatch {
    /// Operation that was executed.
    pub operation: EnumOperation,
    /// Source handed to the copy primitive (copy/xcopy only).
    pub path_source: Option<PathBuf>,
    /// Destination handed to the copy primitive (copy/xcopy only).
    pub path_destination: Option<PathBuf>,
    /// Per-operand outcome (mkdir only), in command order.
    pub folders: Vec<EnumFolderOutcome>,
    /// Number of primitive invocations.
    pub cnt_primitive_calls: u64,
    /// Number of requests treated as already satisfied.
    pub cnt_skipped: u64,
}

impl ReportDispatch {
    /// Number of mkdir operands that were skipped as unresolvable.
    pub fn folder_skipped_count(&self) -> usize {
        self.folders
            .iter()
            .filter(|f| matches!(f, EnumFolderOutcome::Skipped { .. }))
            .count()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_folders".to_string(), self.folders.len() as u64);
        dict_counts.insert(
            "cnt_folders_skipped".to_string(),
            self.folder_skipped_count() as u64,
        );
        dict_counts.insert("cnt_primitive_calls".to_string(), self.cnt_primitive_calls);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} op={} folders={} folders_skipped={} primitive_calls={} skipped={}",
            self.operation.keyword(),
            dict_counts["cnt_folders"],
            dict_counts["cnt_folders_skipped"],
            dict_counts["cnt_primitive_calls"],
            dict_counts["cnt_skipped"]
        )
    }
}

impl fmt::Display for ReportDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[DISPATCH]"))
    }
}

/// Mutable accumulator for one dispatch.
#[derive(Debug, Clone)]
pub struct ReportDispatchBuilder {
    operation: EnumOperation,
    path_source: Option<PathBuf>,
    path_destination: Option<PathBuf>,
    folders: Vec<EnumFolderOutcome>,
    cnt_primitive_calls: u64,
    cnt_skipped: u64,
}

impl ReportDispatchBuilder {
    /// Start an empty report for `operation`.
    pub fn new(operation: EnumOperation) -> Self {
        Self {
            operation,
            path_source: None,
            path_destination: None,
            folders: Vec::new(),
            cnt_primitive_calls: 0,
            cnt_skipped: 0,
        }
    }

    /// Record the resolved source/destination pair.
    pub fn set_paths(&mut self, path_source: PathBuf, path_destination: PathBuf) {
        self.path_source = Some(path_source);
        self.path_destination = Some(path_destination);
    }

    /// Record one mkdir operand outcome.
    pub fn add_folder(&mut self, outcome: EnumFolderOutcome) {
        if let EnumFolderOutcome::Attempted { n_attempts, .. } = &outcome {
            self.cnt_primitive_calls += *n_attempts as u64;
        }
        self.folders.push(outcome);
    }

    /// Increment primitive-call count by one.
    pub fn add_primitive_call(&mut self) {
        self.cnt_primitive_calls += 1;
    }

    /// Increment skipped count by one.
    pub fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportDispatch {
        ReportDispatch {
            operation: self.operation,
            path_source: self.path_source,
            path_destination: self.path_destination,
            folders: self.folders,
            cnt_primitive_calls: self.cnt_primitive_calls,
            cnt_skipped: self.cnt_skipped,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportCopy

/// Aggregate counters and diagnostics for one `copy_tree` run.
#[derive(Debug, Default, Clone)]
pub struct ReportCopy {
    /// Total scanned directory/file entries.
    pub cnt_scanned: u64,
    /// Number of copied entries successfully committed.
    pub cnt_copied: u64,
    /// Number of entries skipped by strategy.
    pub cnt_skipped: u64,
    /// Non-fatal warnings collected during traversal/copy.
    pub warnings: Vec<String>,
    /// Per-entry failures.
    pub errors: Vec<SpecCopyError>,
}

impl ReportCopy {
    /// Number of collected hard errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} scanned={} copied={} skipped={} errors={} warnings={}",
            self.cnt_scanned,
            self.cnt_copied,
            self.cnt_skipped,
            self.error_count(),
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[COPY]"))
    }
}

/// Mutable accumulator for copy statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportCopyBuilder {
    cnt_scanned: u64,
    cnt_copied: u64,
    cnt_skipped: u64,
    errors: Vec<SpecCopyError>,
    warnings: Vec<String>,
}

impl ReportCopyBuilder {
    pub fn add_scanned(&mut self) {
        self.cnt_scanned += 1;
    }

    pub fn add_copied(&mut self) {
        self.cnt_copied += 1;
    }

    pub fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Add one path-scoped error.
    pub fn add_error(&mut self, path: PathBuf, exception: String) {
        self.errors.push(SpecCopyError { path, exception });
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportCopy {
        ReportCopy {
            cnt_scanned: self.cnt_scanned,
            cnt_copied: self.cnt_copied,
            cnt_skipped: self.cnt_skipped,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
