//! Configuration file support for utagent
//!
//! Config files are loaded in order (later overrides earlier):
//! 1. `~/.config/utagent/config.toml` (user defaults)
//! 2. `.utagent.toml` in project root (project overrides)
//!
//! CLI flags override all config file values. Cache settings are frozen
//! into a [`CacheConfig`] at construction time; there is no ambient
//! global cache state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings governing one cache instance.
///
/// Constructed once, immutable thereafter. Every cache consumer receives
/// its instance explicitly; nothing reads these from process globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Master switch; a disabled cache never reads or writes disk
    pub enabled: bool,
    /// Root directory owned exclusively by this cache
    pub directory: PathBuf,
    /// Entries older than this are treated as expired and deleted on read
    pub max_age_minutes: i64,
    /// Soft storage ceiling; exceeded totals trigger oldest-first eviction
    pub max_size_mb: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from(Self::DEFAULT_DIRECTORY),
            max_age_minutes: Self::DEFAULT_MAX_AGE_MINUTES,
            max_size_mb: Self::DEFAULT_MAX_SIZE_MB,
        }
    }
}

impl CacheConfig {
    /// Default cache root, relative to the project directory
    pub const DEFAULT_DIRECTORY: &'static str = ".utagent-cache";
    /// Default TTL (24 hours)
    pub const DEFAULT_MAX_AGE_MINUTES: i64 = 24 * 60;
    /// Default storage ceiling
    pub const DEFAULT_MAX_SIZE_MB: i64 = 100;

    /// TTL in milliseconds, the unit entry timestamps are stored in
    pub fn max_age_millis(&self) -> i64 {
        self.max_age_minutes.saturating_mul(60_000)
    }

    /// Storage ceiling in bytes
    pub fn max_size_bytes(&self) -> u64 {
        u64::try_from(self.max_size_mb).unwrap_or(0).saturating_mul(1024 * 1024)
    }

    /// A disabled cache config pointing nowhere, for hosts that opt out
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Options loaded from config files
///
/// # Example
///
/// ```toml
/// # ~/.config/utagent/config.toml or .utagent.toml
/// base_ref = "origin/main"   # Default base for incremental analysis
///
/// [cache]
/// enabled = true
/// directory = ".utagent-cache"
/// max_age_minutes = 1440
/// max_size_mb = 100
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default base ref for incremental coverage analysis
    pub base_ref: Option<String>,
    /// Enable verbose logging by default
    pub verbose: Option<bool>,
    /// Cache settings (partial; unset fields take defaults)
    pub cache: Option<PartialCacheConfig>,
}

/// Cache section as written in config files; every field optional
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PartialCacheConfig {
    pub enabled: Option<bool>,
    pub directory: Option<PathBuf>,
    pub max_age_minutes: Option<i64>,
    pub max_size_mb: Option<i64>,
}

impl Config {
    /// Load configuration from user and project config files
    pub fn load(project_root: &Path) -> Self {
        let user_config = dirs::config_dir()
            .map(|d| d.join("utagent/config.toml"))
            .and_then(|p| Self::load_file(&p))
            .unwrap_or_default();

        let project_config =
            Self::load_file(&project_root.join(".utagent.toml")).unwrap_or_default();

        // Project overrides user
        let merged = user_config.override_with(project_config);
        tracing::debug!(
            base_ref = ?merged.base_ref,
            verbose = ?merged.verbose,
            cache = ?merged.cache,
            "Effective config after merge"
        );
        merged
    }

    /// Load configuration from a specific file
    fn load_file(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read config {}: {}", path.display(), e);
                return None;
            }
        };

        match toml::from_str::<Self>(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Layer another config on top (other overrides self where present)
    fn override_with(self, other: Self) -> Self {
        let cache = match (self.cache, other.cache) {
            (Some(base), Some(over)) => Some(merge_cache(base, over)),
            (base, over) => over.or(base),
        };
        Config {
            base_ref: other.base_ref.or(self.base_ref),
            verbose: other.verbose.or(self.verbose),
            cache,
        }
    }

    /// Resolve the cache section against defaults, anchored at the project root
    pub fn cache_config(&self, project_root: &Path) -> CacheConfig {
        let partial = self.cache.clone().unwrap_or_default();
        let defaults = CacheConfig::default();
        let directory = partial
            .directory
            .unwrap_or_else(|| PathBuf::from(CacheConfig::DEFAULT_DIRECTORY));
        let directory = if directory.is_absolute() {
            directory
        } else {
            project_root.join(directory)
        };
        CacheConfig {
            enabled: partial.enabled.unwrap_or(defaults.enabled),
            directory,
            max_age_minutes: partial.max_age_minutes.unwrap_or(defaults.max_age_minutes),
            max_size_mb: partial.max_size_mb.unwrap_or(defaults.max_size_mb),
        }
    }

    /// Default base ref when neither config nor CLI supplies one
    pub const DEFAULT_BASE_REF: &'static str = "HEAD";
}

/// Left-biased field merge: `over` wins where present (documented
/// precedence, mirroring the project-overrides-user layering)
fn merge_cache(base: PartialCacheConfig, over: PartialCacheConfig) -> PartialCacheConfig {
    PartialCacheConfig {
        enabled: over.enabled.or(base.enabled),
        directory: over.directory.or(base.directory),
        max_age_minutes: over.max_age_minutes.or(base.max_age_minutes),
        max_size_mb: over.max_size_mb.or(base.max_size_mb),
    }
}
