//! Changed-file and changed-line collection from git
//!
//! utagent never implements git internals; [`GitCli`] shells out to the
//! `git` binary and parses its porcelain/diff output. [`ChangeTracker`]
//! is the seam the analyzer depends on, so tests substitute in-memory
//! doubles and never need a repository.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;

/// Compiled once, reused across all hunk-header scans
static HUNK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@@ [^@]* \+(\d+)(?:,(\d+))? @@").expect("hardcoded hunk regex"));

/// Source-change observation capability
pub trait ChangeTracker {
    /// Files changed between `base_ref` and HEAD
    fn changed_files(&self, base_ref: &str) -> Result<BTreeSet<PathBuf>>;
    /// Files with staged, unstaged, or untracked modifications
    fn uncommitted_changes(&self) -> Result<BTreeSet<PathBuf>>;
    /// New-side line numbers changed in `file` relative to `base_ref`
    fn changed_lines(&self, file: &Path, base_ref: &str) -> Result<Vec<u32>>;
    fn current_branch(&self) -> Result<String>;
}

/// [`ChangeTracker`] over the `git` binary
pub struct GitCli {
    repo_root: PathBuf,
}

impl GitCli {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .output()
            .with_context(|| format!("Failed to run git {}", args.join(" ")))?;
        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ChangeTracker for GitCli {
    fn changed_files(&self, base_ref: &str) -> Result<BTreeSet<PathBuf>> {
        let stdout = self.run(&["diff", "--name-only", base_ref])?;
        Ok(parse_name_only(&stdout))
    }

    fn uncommitted_changes(&self) -> Result<BTreeSet<PathBuf>> {
        let stdout = self.run(&["status", "--porcelain"])?;
        Ok(parse_status_porcelain(&stdout))
    }

    fn changed_lines(&self, file: &Path, base_ref: &str) -> Result<Vec<u32>> {
        let file_arg = file.to_string_lossy();
        // -U0: hunk headers only cover changed lines, no context
        let stdout = self.run(&["diff", "-U0", base_ref, "--", file_arg.as_ref()])?;
        Ok(parse_changed_lines(&stdout))
    }

    fn current_branch(&self) -> Result<String> {
        Ok(self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?.trim().to_string())
    }
}

/// One path per line, as `git diff --name-only` prints
fn parse_name_only(stdout: &str) -> BTreeSet<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Paths from `git status --porcelain`: two status columns, a space,
/// then the path; renames print `old -> new` and only the new side is a
/// current change
fn parse_status_porcelain(stdout: &str) -> BTreeSet<PathBuf> {
    stdout
        .lines()
        .filter(|l| l.len() > 3)
        .map(|l| {
            let path = &l[3..];
            match path.split_once(" -> ") {
                Some((_, new)) => new,
                None => path,
            }
        })
        .map(|p| PathBuf::from(p.trim()))
        .collect()
}

/// New-side line numbers from unified-diff hunk headers.
///
/// A `-U0` diff makes every hunk exactly the changed region. A count of
/// 0 (pure deletion) contributes no new-side lines; an omitted count
/// means 1. CRLF from Windows git output is normalized first.
fn parse_changed_lines(diff: &str) -> Vec<u32> {
    if diff.is_empty() {
        return Vec::new();
    }
    let diff = if diff.contains('\r') {
        std::borrow::Cow::Owned(diff.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        std::borrow::Cow::Borrowed(diff)
    };

    let mut lines = Vec::new();
    for line in diff.lines() {
        if let Some(caps) = HUNK_RE.captures(line) {
            let start: u32 = match caps[1].parse() {
                Ok(v) => v,
                Err(_) => {
                    tracing::warn!(line, "Could not parse hunk start, skipping hunk");
                    continue;
                }
            };
            let count: u32 = caps
                .get(2)
                .map(|m| m.as_str().parse().unwrap_or(1))
                .unwrap_or(1);
            lines.extend(start..start.saturating_add(count));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_changed_lines_basic() {
        let diff = "\
diff --git a/src/Main.java b/src/Main.java
--- a/src/Main.java
+++ b/src/Main.java
@@ -10,0 +11,3 @@ class Main {
+    int a;
+    int b;
+    int c;
";
        assert_eq!(parse_changed_lines(diff), vec![11, 12, 13]);
    }

    #[test]
    fn test_parse_changed_lines_deletion_only() {
        let diff = "\
--- a/src/Main.java
+++ b/src/Main.java
@@ -5,3 +4,0 @@ class Main {
-    int gone;
";
        assert!(parse_changed_lines(diff).is_empty(), "Deletions add no new-side lines");
    }

    #[test]
    fn test_parse_changed_lines_count_omitted() {
        let diff = "\
--- a/A.java
+++ b/A.java
@@ -1 +1 @@
-old
+new
";
        assert_eq!(parse_changed_lines(diff), vec![1]);
    }

    #[test]
    fn test_parse_changed_lines_multiple_hunks() {
        let diff = "\
--- a/A.java
+++ b/A.java
@@ -3,0 +4,2 @@
+x
+y
@@ -20,1 +22,1 @@
+z
";
        assert_eq!(parse_changed_lines(diff), vec![4, 5, 22]);
    }

    #[test]
    fn test_parse_changed_lines_crlf() {
        let diff = "--- a/A.java\r\n+++ b/A.java\r\n@@ -1,0 +2,2 @@\r\n+x\r\n+y\r\n";
        assert_eq!(parse_changed_lines(diff), vec![2, 3]);
    }

    #[test]
    fn test_parse_changed_lines_empty() {
        assert!(parse_changed_lines("").is_empty());
    }

    #[test]
    fn test_parse_name_only() {
        let out = "src/main/java/A.java\nsrc/main/java/B.java\n\n";
        let files = parse_name_only(out);
        assert_eq!(files.len(), 2);
        assert!(files.contains(&PathBuf::from("src/main/java/A.java")));
    }

    #[test]
    fn test_parse_status_porcelain() {
        let out = " M src/A.java\n?? src/B.java\nR  src/Old.java -> src/New.java\n";
        let files = parse_status_porcelain(out);
        assert_eq!(files.len(), 3);
        assert!(files.contains(&PathBuf::from("src/A.java")));
        assert!(files.contains(&PathBuf::from("src/B.java")));
        assert!(files.contains(&PathBuf::from("src/New.java")), "Rename keeps the new side");
    }
}
