//! # utagent — incremental test augmentation for Java projects
//!
//! The expensive operations in test generation — parsing sources and
//! calling an LLM — are made cheap and repeatable by content-addressable
//! caches, and generated tests are folded into existing test files
//! without duplication or corruption.
//!
//! - **Caching**: [`cache::ContentCache`] is a sharded, TTL- and
//!   size-bounded file store; [`parse_cache::ParseCache`] keys on file
//!   path and validates on content, [`llm_cache::LlmResponseCache`] keys
//!   on a canonical request fingerprint and never stores failures.
//! - **Cache-aside LLM calls**: [`cached_provider::CachedProvider`]
//!   wraps any [`llm::ChatProvider`] transparently; streaming bypasses.
//! - **New-code coverage**: [`analyze::CoverageDiffAnalyzer`] intersects
//!   git-changed lines with the latest JaCoCo report.
//! - **Safe merge**: [`augment::IncrementalAugmenter`] decides
//!   New / Incremental / None per class and splices generated methods
//!   before the final class brace by brace-depth scanning.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::path::Path;
//! use utagent::analyze::CoverageDiffAnalyzer;
//! use utagent::coverage::JacocoXmlParser;
//! use utagent::git::GitCli;
//!
//! let analyzer = CoverageDiffAnalyzer::new(GitCli::new("."), JacocoXmlParser, Path::new("."));
//! let result = analyzer.analyze_incremental("origin/main");
//! println!("new-code coverage: {:.1}%", result.new_code_coverage * 100.0);
//! ```

pub mod analyze;
pub mod augment;
pub mod cache;
pub mod cached_provider;
pub mod config;
pub mod coverage;
pub mod git;
pub mod hash;
pub mod llm;
pub mod llm_cache;
pub mod merge;
pub mod model;
pub mod parse_cache;

pub use analyze::{CoverageDiffAnalyzer, IncrementalCoverageResult};
pub use augment::{GenerationType, IncrementalAugmenter, IncrementalGenerationResult, TestGenerator};
pub use cache::{CacheLookup, ContentCache};
pub use cached_provider::CachedProvider;
pub use config::{CacheConfig, Config};
pub use coverage::{CoverageInfo, CoverageReport, CoverageReportParser, JacocoXmlParser};
pub use git::{ChangeTracker, GitCli};
pub use llm::{ChatProvider, ChatRequest, ChatResponse};
pub use llm_cache::LlmResponseCache;
pub use model::{ClassInfo, MethodInfo, ParsedTestFile, SourceParser, TestFileParser};
pub use parse_cache::ParseCache;
