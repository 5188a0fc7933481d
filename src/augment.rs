//! Incremental test augmentation
//!
//! Per class under analysis: decide whether to generate a brand-new test
//! class, splice additional methods into the existing one, or do nothing,
//! then perform the merge. The augmenter owns the decision but never
//! mutates the source class structure — it only appends to test-class
//! text. It holds no cross-call state, so a worker pool may drive it
//! concurrently, one class per call.

use std::path::Path;

use crate::coverage::CoverageInfo;
use crate::merge;
use crate::model::{ClassInfo, MethodInfo, ParsedTestFile, TestFileParser};

/// Terminal state of one augmentation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationType {
    /// Full new test class generated
    New,
    /// Existing test class extended with new methods
    Incremental,
    /// Nothing to do, or generation produced nothing usable
    None,
}

/// Immutable snapshot returned to the caller, one per attempt
#[derive(Debug, Clone)]
pub struct IncrementalGenerationResult {
    pub class_info: ClassInfo,
    pub existing_test_file: Option<ParsedTestFile>,
    /// For `New`: the full generated class. For `Incremental`: the
    /// merged file content. For `None`: absent.
    pub generated_code: Option<String>,
    pub generation_type: GenerationType,
    /// `@Test`/`@ParameterizedTest` method names this attempt added
    pub added_test_methods: Vec<String>,
}

impl IncrementalGenerationResult {
    fn none(class_info: ClassInfo, existing: Option<ParsedTestFile>) -> Self {
        Self {
            class_info,
            existing_test_file: existing,
            generated_code: Option::None,
            generation_type: GenerationType::None,
            added_test_methods: Vec::new(),
        }
    }
}

/// Test-generation capability, typically an LLM-backed generator wrapped
/// in a [`crate::cached_provider::CachedProvider`]
pub trait TestGenerator {
    /// Generate a complete test class for `class_info`
    fn generate_test_class(&self, class_info: &ClassInfo) -> anyhow::Result<String>;

    /// Generate only test methods for the given coverage gaps
    fn generate_additional_tests(
        &self,
        class_info: &ClassInfo,
        gaps: &[CoverageInfo],
    ) -> anyhow::Result<String>;
}

/// Drives the New / Incremental / None decision and the safe merge
pub struct IncrementalAugmenter<G> {
    generator: G,
}

impl<G: TestGenerator> IncrementalAugmenter<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Run one augmentation attempt for `class_info`.
    ///
    /// `existing` is `None` both when no test file exists and when the
    /// existing file failed to parse — either way the only safe move is
    /// a full regeneration.
    pub fn generate_incremental(
        &self,
        class_info: &ClassInfo,
        existing: Option<&ParsedTestFile>,
        coverage_gaps: &[CoverageInfo],
    ) -> IncrementalGenerationResult {
        match existing {
            Option::None => self.generate_new(class_info),
            Some(test_file) => self.augment_existing(class_info, test_file, coverage_gaps),
        }
    }

    /// Like [`generate_incremental`](Self::generate_incremental), but
    /// parses the existing test file first. A file that exists yet fails
    /// to parse is treated as absent: the only safe move is a full
    /// regeneration.
    pub fn generate_for_test_file(
        &self,
        class_info: &ClassInfo,
        test_file: &Path,
        parser: &dyn TestFileParser,
        coverage_gaps: &[CoverageInfo],
    ) -> IncrementalGenerationResult {
        let existing = if test_file.is_file() {
            let parsed = parser.parse_test_file(test_file);
            if parsed.is_none() {
                tracing::warn!(
                    file = %test_file.display(),
                    "Existing test file failed to parse; regenerating from scratch"
                );
            }
            parsed
        } else {
            Option::None
        };
        self.generate_incremental(class_info, existing.as_ref(), coverage_gaps)
    }

    fn generate_new(&self, class_info: &ClassInfo) -> IncrementalGenerationResult {
        tracing::debug!(class = %class_info.qualified_name(), "No usable existing test file; generating full class");
        let generated = match self.generator.generate_test_class(class_info) {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(class = %class_info.name, error = %e, "Test generation failed");
                return IncrementalGenerationResult::none(class_info.clone(), Option::None);
            }
        };
        if generated.trim().is_empty() {
            return IncrementalGenerationResult::none(class_info.clone(), Option::None);
        }
        let added = merge::extract_test_method_names(&generated);
        IncrementalGenerationResult {
            class_info: class_info.clone(),
            existing_test_file: Option::None,
            generated_code: Some(generated),
            generation_type: GenerationType::New,
            added_test_methods: added,
        }
    }

    fn augment_existing(
        &self,
        class_info: &ClassInfo,
        existing: &ParsedTestFile,
        coverage_gaps: &[CoverageInfo],
    ) -> IncrementalGenerationResult {
        let untested = untested_methods(class_info, existing);
        let additional_uncovered = additional_uncovered(coverage_gaps, existing);

        if untested.is_empty() && additional_uncovered.is_empty() {
            tracing::debug!(class = %class_info.name, "Existing tests already cover everything; skipping");
            return IncrementalGenerationResult::none(class_info.clone(), Some(existing.clone()));
        }
        tracing::debug!(
            class = %class_info.name,
            untested = ?untested.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            uncovered = additional_uncovered.len(),
            "Augmenting existing test class"
        );

        let generated = match self
            .generator
            .generate_additional_tests(class_info, &additional_uncovered)
        {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(class = %class_info.name, error = %e, "Additional test generation failed");
                return IncrementalGenerationResult::none(class_info.clone(), Some(existing.clone()));
            }
        };
        if generated.trim().is_empty() {
            return IncrementalGenerationResult::none(class_info.clone(), Some(existing.clone()));
        }

        let Some(methods) = merge::extract_method_bodies(&generated) else {
            tracing::warn!(class = %class_info.name, "Could not isolate methods from generated code; skipping merge");
            return IncrementalGenerationResult::none(class_info.clone(), Some(existing.clone()));
        };
        let Some(merged) = merge::splice_before_final_brace(&existing.class_body, &methods) else {
            // No closing brace in the existing file: keep it untouched
            // rather than risk corrupting it
            tracing::warn!(
                class = %existing.class_name,
                "Existing test file has no closing brace; leaving it unchanged"
            );
            return IncrementalGenerationResult::none(class_info.clone(), Some(existing.clone()));
        };

        let added = merge::extract_test_method_names(&methods);
        IncrementalGenerationResult {
            class_info: class_info.clone(),
            existing_test_file: Some(existing.clone()),
            generated_code: Some(merged),
            generation_type: GenerationType::Incremental,
            added_test_methods: added,
        }
    }
}

/// Testable methods whose name neither equals nor appears inside any
/// already-tested method name, case-insensitively. The substring match
/// is intentionally tolerant of naming variants — a tested
/// `shouldGetDataSuccessfully` counts as covering `getData`.
fn untested_methods<'a>(class_info: &'a ClassInfo, existing: &ParsedTestFile) -> Vec<&'a MethodInfo> {
    let tested_lower: Vec<String> = existing
        .tested_methods
        .iter()
        .map(|t| t.to_lowercase())
        .collect();
    class_info
        .methods
        .iter()
        .filter(|m| m.is_testable())
        .filter(|m| {
            let name = m.name.to_lowercase();
            !tested_lower.iter().any(|t| t.contains(&name))
        })
        .collect()
}

/// Coverage gaps minus gaps whose method is already tested by exact
/// (case-insensitive) name match
fn additional_uncovered(gaps: &[CoverageInfo], existing: &ParsedTestFile) -> Vec<CoverageInfo> {
    gaps.iter()
        .filter(|g| {
            !existing
                .tested_methods
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&g.method_name))
        })
        .cloned()
        .collect()
}
