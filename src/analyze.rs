//! Incremental coverage analysis: git changes intersected with coverage
//!
//! Correlates the lines changed since a base ref with the latest
//! coverage report to answer "how much of the new code is covered?".
//! The analysis is advisory, never blocking: every git or report failure
//! degrades to an empty or zero-valued input rather than propagating.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::coverage::{CoverageInfo, CoverageReport, CoverageReportParser};
use crate::git::ChangeTracker;

/// One changed file correlated with its coverage record
#[derive(Debug, Clone, Serialize)]
pub struct ChangedFileDiff {
    pub file: PathBuf,
    /// Simple class name derived from the file stem
    pub class_name: String,
    /// Class-level counter sums, absent when the report predates the file
    pub coverage: Option<CoverageInfo>,
    /// New-side line numbers changed relative to the base ref
    pub changed_lines: Vec<u32>,
}

impl ChangedFileDiff {
    /// Whether a changed line counts as covered.
    ///
    /// The report carries no per-line hit data, so the policy is: every
    /// changed line in a file whose class has nonzero covered lines is
    /// covered. This deliberately overstates new-code coverage for
    /// partially covered files and is the documented approximation, not
    /// an oversight.
    pub fn is_line_covered(&self, _line: u32) -> bool {
        self.coverage
            .as_ref()
            .is_some_and(|c| c.line_total > c.line_missed)
    }

    fn covered_line_count(&self) -> usize {
        self.changed_lines
            .iter()
            .filter(|&&l| self.is_line_covered(l))
            .count()
    }
}

/// Aggregate result of one incremental analysis
#[derive(Debug, Clone, Serialize)]
pub struct IncrementalCoverageResult {
    pub base_ref: String,
    /// Branch under analysis, when the tracker can name one
    pub branch: Option<String>,
    pub files: Vec<ChangedFileDiff>,
    pub total_changed_lines: usize,
    pub covered_changed_lines: usize,
    /// Covered changed lines / changed lines; 1.0 when nothing changed
    /// (vacuously covered so callers never block on "no changes")
    pub new_code_coverage: f64,
}

impl IncrementalCoverageResult {
    fn empty(base_ref: &str, branch: Option<String>) -> Self {
        Self {
            base_ref: base_ref.to_string(),
            branch,
            files: Vec::new(),
            total_changed_lines: 0,
            covered_changed_lines: 0,
            new_code_coverage: 1.0,
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.files.is_empty()
    }
}

/// Combines a [`ChangeTracker`] with a coverage report to score new code
pub struct CoverageDiffAnalyzer<T, P> {
    tracker: T,
    parser: P,
    project_root: PathBuf,
}

impl<T: ChangeTracker, P: CoverageReportParser> CoverageDiffAnalyzer<T, P> {
    pub fn new(tracker: T, parser: P, project_root: impl Into<PathBuf>) -> Self {
        Self {
            tracker,
            parser,
            project_root: project_root.into(),
        }
    }

    /// Analyze coverage of code changed since `base_ref`.
    ///
    /// Union of committed-vs-base and uncommitted changes, filtered to
    /// Java sources; each file gets its changed lines and the counter
    /// sums of its class from the most recent report.
    pub fn analyze_incremental(&self, base_ref: &str) -> IncrementalCoverageResult {
        let branch = self.tracker.current_branch().ok();
        let changed = self.collect_changed_files(base_ref);
        if changed.is_empty() {
            tracing::debug!(base_ref, "No changed files; nothing to analyze");
            return IncrementalCoverageResult::empty(base_ref, branch);
        }

        let report = self.load_report();

        let mut files = Vec::new();
        for file in changed {
            let Some(class_name) = file.file_stem().map(|s| s.to_string_lossy().into_owned())
            else {
                continue;
            };
            let changed_lines = match self.tracker.changed_lines(&file, base_ref) {
                Ok(lines) => lines,
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %e, "Could not get changed lines");
                    Vec::new()
                }
            };
            files.push(ChangedFileDiff {
                coverage: aggregate_class_coverage(&report, &class_name),
                class_name,
                file,
                changed_lines,
            });
        }

        let total: usize = files.iter().map(|f| f.changed_lines.len()).sum();
        let covered: usize = files.iter().map(ChangedFileDiff::covered_line_count).sum();
        let ratio = if total == 0 {
            1.0
        } else {
            covered as f64 / total as f64
        };

        tracing::info!(
            base_ref,
            files = files.len(),
            changed_lines = total,
            covered_lines = covered,
            new_code_coverage = ratio,
            "Incremental coverage analysis complete"
        );

        IncrementalCoverageResult {
            base_ref: base_ref.to_string(),
            branch,
            files,
            total_changed_lines: total,
            covered_changed_lines: covered,
            new_code_coverage: ratio,
        }
    }

    /// Union of committed and uncommitted changes, Java sources only.
    /// Either collaborator failing degrades that side to empty.
    fn collect_changed_files(&self, base_ref: &str) -> BTreeSet<PathBuf> {
        let mut changed = match self.tracker.changed_files(base_ref) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(base_ref, error = %e, "Could not list committed changes");
                BTreeSet::new()
            }
        };
        match self.tracker.uncommitted_changes() {
            Ok(files) => changed.extend(files),
            Err(e) => {
                tracing::warn!(error = %e, "Could not list uncommitted changes");
            }
        }
        changed
            .into_iter()
            .filter(|f| f.extension().is_some_and(|e| e == "java"))
            .collect()
    }

    fn load_report(&self) -> CoverageReport {
        let Some(path) = crate::coverage::find_report(&self.project_root) else {
            tracing::debug!(root = %self.project_root.display(), "No coverage report found");
            return CoverageReport::empty();
        };
        match self.parser.parse(&path) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not parse coverage report");
                CoverageReport::empty()
            }
        }
    }
}

/// Sum a class's per-method counters into one file-level record
fn aggregate_class_coverage(report: &CoverageReport, class_name: &str) -> Option<CoverageInfo> {
    let records = report.for_class(class_name);
    if records.is_empty() {
        return None;
    }
    let mut sum = CoverageInfo {
        class_name: records[0].class_name.clone(),
        method_name: "*".to_string(),
        ..CoverageInfo::default()
    };
    for r in records {
        sum.branch_total += r.branch_total;
        sum.branch_missed += r.branch_missed;
        sum.instruction_total += r.instruction_total;
        sum.instruction_missed += r.instruction_missed;
        sum.line_total += r.line_total;
        sum.line_missed += r.line_missed;
    }
    Some(sum)
}
