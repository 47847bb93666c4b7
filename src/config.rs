//! Refresh configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists.

use intelcache_core::{Error, Result, Topic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TOPICS: [&str; 6] = [
    "Dell U4025QW firmware update issues",
    "Dell U4025QW macOS color calibration Display P3 settings",
    "Dell U4025QW KVM switching multiple Mac computers",
    "Dell U4025QW sleep wake disconnect Thunderbolt macOS",
    "Dell U4025QW BetterDisplay Lunar MonitorControl m1ddc macOS",
    "Dell U4025QW HiDPI scaling resolution macOS",
];

/// Upper bound on any schedule interval (ten years).
pub const MAX_INTERVAL_DAYS: u32 = 3650;

/// Placeholder substituted with the topic in provider arguments.
pub const TOPIC_PLACEHOLDER: &str = "{topic}";

/// Top-level refresh configuration.
///
/// Plain values come before the tables so `to_toml` stays serializable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Exit non-zero when the run ends `failed` or `no_cache`.
    pub strict_exit: bool,
    /// Ordered topic set, one provider query each.
    pub topics: Vec<String>,
    /// Refresh intervals, backoff and per-query timeout.
    pub schedule: ScheduleConfig,
    /// External provider invocation.
    pub provider: ProviderConfig,
    /// Cache file layout.
    pub cache: CacheConfig,
    /// Artifact rendering.
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Hard timeout for a single provider query, in milliseconds.
    pub query_timeout_ms: u64,
    /// Interval after a healthy refresh.
    pub refresh_interval_days: u32,
    /// Interval after a refresh where fewer than half the topics had data.
    pub thin_interval_days: u32,
    /// Metadata older than this is stale no matter what `next_update_after` says.
    pub max_cache_age_days: u32,
    /// Interval after a cycle where every topic failed.
    pub failure_backoff_hours: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Program name, looked up on PATH first.
    pub program: String,
    /// Arguments; `{topic}` is replaced by the topic (appended if absent).
    pub args: Vec<String>,
    /// Absolute paths tried in order when PATH lookup fails.
    pub fallback_paths: Vec<PathBuf>,
    /// Extra environment for the provider process.
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Skill name used when the cache dir is derived from `CLAUDE_PLUGIN_ROOT`.
    pub skill: String,
    pub artifact_file: String,
    pub metadata_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub title: String,
    /// Items rendered per source, highest score first.
    pub top_n: usize,
    /// Render a placeholder section for topics that returned no hits.
    pub include_quiet_topics: bool,
}

// ============================================================
// Defaults
// ============================================================

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            strict_exit: false,
            topics: DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
            schedule: ScheduleConfig::default(),
            provider: ProviderConfig::default(),
            cache: CacheConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: 60_000,
            refresh_interval_days: 30,
            thin_interval_days: 7,
            max_cache_age_days: 60,
            failure_backoff_hours: 4,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            program: "bunx".into(),
            args: vec![
                "--bun".into(),
                "@side-quest/last-30-days".into(),
                TOPIC_PLACEHOLDER.into(),
                "--emit=json".into(),
                "--quick".into(),
            ],
            fallback_paths: vec![
                PathBuf::from("/opt/homebrew/bin/bunx"),
                PathBuf::from("/usr/local/bin/bunx"),
            ],
            env: BTreeMap::new(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            skill: "dell-u4025qw".into(),
            artifact_file: "community-intel.md".into(),
            metadata_file: "last-updated.json".into(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: "Community Intelligence".into(),
            top_n: 5,
            include_quiet_topics: false,
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl RefreshConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::debug!("No config at {} - using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Default config location: `<config dir>/intelcache/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("intelcache").join("config.toml"))
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn topic_list(&self) -> Vec<Topic> {
        self.topics.iter().map(|t| Topic::new(t.as_str())).collect()
    }

    /// Reject settings the scheduler cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.topics.is_empty() {
            return Err(Error::ConfigError("at least one topic is required".into()));
        }
        if self.schedule.query_timeout_ms == 0 {
            return Err(Error::ConfigError("query_timeout_ms must be positive".into()));
        }
        if self.provider.program.trim().is_empty() {
            return Err(Error::ConfigError("provider.program is empty".into()));
        }
        let s = &self.schedule;
        for (name, days) in [
            ("refresh_interval_days", s.refresh_interval_days),
            ("thin_interval_days", s.thin_interval_days),
            ("max_cache_age_days", s.max_cache_age_days),
        ] {
            if days == 0 || days > MAX_INTERVAL_DAYS {
                return Err(Error::ConfigError(format!(
                    "{name} must be between 1 and {MAX_INTERVAL_DAYS}"
                )));
            }
        }
        if s.failure_backoff_hours == 0 || s.failure_backoff_hours > MAX_INTERVAL_DAYS * 24 {
            return Err(Error::ConfigError(format!(
                "failure_backoff_hours must be between 1 and {}",
                MAX_INTERVAL_DAYS * 24
            )));
        }
        Ok(())
    }
}

impl ScheduleConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn refresh_interval(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.refresh_interval_days))
    }

    pub fn thin_interval(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.thin_interval_days))
    }

    pub fn max_cache_age(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.max_cache_age_days))
    }

    pub fn failure_backoff(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.failure_backoff_hours))
    }
}

// ============================================================
// Cache directory resolution
// ============================================================

/// Resolve the cache directory: explicit path, then `INTELCACHE_DIR`, then
/// `CLAUDE_PLUGIN_ROOT/skills/<skill>/cache`.
pub fn resolve_cache_dir(explicit: Option<&Path>, skill: &str) -> Result<PathBuf> {
    resolve_cache_dir_with(explicit, skill, |key| std::env::var(key).ok())
}

pub fn resolve_cache_dir_with(
    explicit: Option<&Path>,
    skill: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(expand_tilde(dir));
    }
    if let Some(dir) = env("INTELCACHE_DIR").filter(|d| !d.is_empty()) {
        return Ok(expand_tilde(Path::new(&dir)));
    }
    match env("CLAUDE_PLUGIN_ROOT").filter(|d| !d.is_empty()) {
        Some(root) => Ok(PathBuf::from(root).join("skills").join(skill).join("cache")),
        None => Err(Error::cache_dir(
            "CLAUDE_PLUGIN_ROOT environment variable is not set",
        )),
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
