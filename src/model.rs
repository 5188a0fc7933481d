//! Structural types for the classes and test files under augmentation
//!
//! These are the shapes the external parsers hand us. utagent never
//! parses Java syntax itself; it consumes the parser's structural view
//! and treats test-file bodies as opaque balanced-brace text.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Method visibility as reported by the source parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    PackagePrivate,
    Private,
}

/// A single method of a class under test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodInfo {
    /// Simple method name (no signature)
    pub name: String,
    pub visibility: Visibility,
    pub is_abstract: bool,
}

impl MethodInfo {
    /// Methods worth generating tests for: public and concrete
    pub fn is_testable(&self) -> bool {
        self.visibility == Visibility::Public && !self.is_abstract
    }
}

/// Structural info for a class under test, as produced by the source parser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Package name, empty for the default package
    pub package: String,
    /// Simple class name
    pub name: String,
    pub methods: Vec<MethodInfo>,
}

impl ClassInfo {
    /// Fully qualified name, or the simple name in the default package
    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }
}

/// An existing test file as seen by the test-file parser.
///
/// Read-only input to the merge: the only structural promise is one
/// top-level class with balanced braces in `class_body`.
#[derive(Debug, Clone)]
pub struct ParsedTestFile {
    pub package_name: String,
    pub class_name: String,
    /// Full source text of the test class, wrapper included
    pub class_body: String,
    /// Names of methods the existing tests already exercise
    pub tested_methods: HashSet<String>,
}

/// Boundary for the external Java source parser
pub trait SourceParser {
    /// Structural info for the primary class in `file`, or `None` when
    /// the file cannot be parsed
    fn parse_class(&self, file: &std::path::Path) -> Option<ClassInfo>;
}

/// Boundary for the external JUnit test-file parser
pub trait TestFileParser {
    /// Existing test structure, or `None` when the file cannot be parsed
    fn parse_test_file(&self, file: &std::path::Path) -> Option<ParsedTestFile>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testable_method() {
        let m = MethodInfo {
            name: "getData".into(),
            visibility: Visibility::Public,
            is_abstract: false,
        };
        assert!(m.is_testable());
    }

    #[test]
    fn test_abstract_and_private_not_testable() {
        let abstract_m = MethodInfo {
            name: "compute".into(),
            visibility: Visibility::Public,
            is_abstract: true,
        };
        let private_m = MethodInfo {
            name: "helper".into(),
            visibility: Visibility::Private,
            is_abstract: false,
        };
        assert!(!abstract_m.is_testable());
        assert!(!private_m.is_testable());
    }

    #[test]
    fn test_qualified_name() {
        let c = ClassInfo {
            package: "com.example".into(),
            name: "Calculator".into(),
            methods: vec![],
        };
        assert_eq!(c.qualified_name(), "com.example.Calculator");

        let default_pkg = ClassInfo {
            package: String::new(),
            name: "Calculator".into(),
            methods: vec![],
        };
        assert_eq!(default_pkg.qualified_name(), "Calculator");
    }
}
