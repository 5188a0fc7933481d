//! Coverage report model and JaCoCo XML ingestion
//!
//! [`CoverageInfo`] is one method's counter snapshot. Rates are defined
//! as 1.0 when the total is zero: empty code is vacuously fully covered.
//! That is explicit policy, not an accident — callers building ratios on
//! top of these rates must not special-case empty methods themselves.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Per-method coverage counters from a JaCoCo report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageInfo {
    /// Fully qualified class name (dots, not slashes)
    pub class_name: String,
    pub method_name: String,
    /// First line of the method, 0 when the report omits it
    pub line_number: u32,
    pub branch_total: u32,
    pub branch_missed: u32,
    pub instruction_total: u32,
    pub instruction_missed: u32,
    pub line_total: u32,
    pub line_missed: u32,
}

impl CoverageInfo {
    fn rate(total: u32, missed: u32) -> f64 {
        if total == 0 {
            return 1.0;
        }
        f64::from(total - missed.min(total)) / f64::from(total)
    }

    pub fn line_rate(&self) -> f64 {
        Self::rate(self.line_total, self.line_missed)
    }

    pub fn branch_rate(&self) -> f64 {
        Self::rate(self.branch_total, self.branch_missed)
    }

    pub fn instruction_rate(&self) -> f64 {
        Self::rate(self.instruction_total, self.instruction_missed)
    }

    /// A gap is any method with missed lines or instructions
    pub fn is_gap(&self) -> bool {
        self.line_missed > 0 || self.instruction_missed > 0
    }
}

/// All method records from one coverage run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageReport {
    pub entries: Vec<CoverageInfo>,
}

impl CoverageReport {
    /// Zero-valued report for when no coverage run exists yet
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records for a class, by exact or suffix match on the class name
    /// (a bare `Calculator` matches `com.example.Calculator`)
    pub fn for_class<'a>(&'a self, class_name: &str) -> Vec<&'a CoverageInfo> {
        self.entries
            .iter()
            .filter(|e| {
                e.class_name == class_name
                    || e.class_name.ends_with(&format!(".{class_name}"))
            })
            .collect()
    }

    /// Uncovered methods of a class — the augmenter's gap input
    pub fn gaps_for_class(&self, class_name: &str) -> Vec<CoverageInfo> {
        self.for_class(class_name)
            .into_iter()
            .filter(|e| e.is_gap())
            .cloned()
            .collect()
    }

    /// Whether any record for the class reports covered lines
    pub fn class_has_covered_lines(&self, class_name: &str) -> bool {
        self.for_class(class_name)
            .iter()
            .any(|e| e.line_total > e.line_missed)
    }
}

/// Boundary for coverage-tool report parsers
pub trait CoverageReportParser {
    fn parse(&self, report: &Path) -> anyhow::Result<CoverageReport>;
}

/// Build-tool report locations, in preference order
const MAVEN_REPORT: &str = "target/site/jacoco/jacoco.xml";
const GRADLE_REPORT: &str = "build/reports/jacoco/test/jacocoTestReport.xml";

/// Locate the most recent coverage report under `project_root`: the
/// Maven path wins, the Gradle path is the fallback
pub fn find_report(project_root: &Path) -> Option<PathBuf> {
    for candidate in [MAVEN_REPORT, GRADLE_REPORT] {
        let path = project_root.join(candidate);
        if path.is_file() {
            return Some(path);
        }
    }
    None
}

// JaCoCo writes `name` as the first attribute; anchoring on it avoids
// false matches inside `sourcefilename="..."`
static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<class name="([^"]+)""#).expect("hardcoded class regex"));
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<method name="([^"]+)""#).expect("hardcoded method regex")
});
static METHOD_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sline="(\d+)""#).expect("hardcoded line-attr regex"));
static COUNTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<counter\s+type="([A-Z_]+)"\s+missed="(\d+)"\s+covered="(\d+)""#)
        .expect("hardcoded counter regex")
});

/// Line-oriented scan of JaCoCo XML into [`CoverageInfo`] records.
///
/// This is deliberately not an XML parser: the report is machine-written
/// with one element per line, and the only structure needed is the
/// class > method > counter nesting. Java syntax never enters here.
#[derive(Debug, Default)]
pub struct JacocoXmlParser;

impl CoverageReportParser for JacocoXmlParser {
    fn parse(&self, report: &Path) -> anyhow::Result<CoverageReport> {
        let content = std::fs::read_to_string(report)?;
        Ok(parse_jacoco_xml(&content))
    }
}

fn parse_jacoco_xml(content: &str) -> CoverageReport {
    let mut entries = Vec::new();
    let mut current_class: Option<String> = None;
    let mut current_method: Option<CoverageInfo> = None;

    for line in content.lines() {
        if let Some(caps) = CLASS_RE.captures(line) {
            // JaCoCo writes slash-separated binary names
            current_class = Some(caps[1].replace('/', "."));
        }
        if let Some(caps) = METHOD_RE.captures(line) {
            let Some(class_name) = current_class.clone() else {
                continue;
            };
            let line_number = METHOD_LINE_RE
                .captures(line)
                .and_then(|c| c[1].parse().ok())
                .unwrap_or(0);
            current_method = Some(CoverageInfo {
                class_name,
                method_name: caps[1].to_string(),
                line_number,
                ..CoverageInfo::default()
            });
        }
        if let Some(method) = current_method.as_mut() {
            if let Some(caps) = COUNTER_RE.captures(line) {
                let missed: u32 = caps[2].parse().unwrap_or(0);
                let covered: u32 = caps[3].parse().unwrap_or(0);
                let total = missed.saturating_add(covered);
                match &caps[1] {
                    "BRANCH" => {
                        method.branch_total = total;
                        method.branch_missed = missed;
                    }
                    "INSTRUCTION" => {
                        method.instruction_total = total;
                        method.instruction_missed = missed;
                    }
                    "LINE" => {
                        method.line_total = total;
                        method.line_missed = missed;
                    }
                    _ => {}
                }
            }
        }
        if line.contains("</method>") {
            if let Some(method) = current_method.take() {
                entries.push(method);
            }
        }
        if line.contains("</class>") {
            current_class = None;
            current_method = None;
        }
    }

    tracing::debug!(methods = entries.len(), "Parsed coverage report");
    CoverageReport { entries }
}
