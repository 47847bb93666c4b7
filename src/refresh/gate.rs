use chrono::{DateTime, Duration, Utc};
use intelcache_core::{format_timestamp, CacheMetadata};

use super::publish::{read_metadata, CachePaths};

/// Why the cache is (or isn't) servable right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    Fresh { until: DateTime<Utc> },
    NoMetadata,
    ArtifactMissing,
    Unreadable(String),
    /// `last_updated` is older than the ceiling; `next_update_after` is not trusted.
    TooOld { age_days: i64 },
    Due,
}

impl Freshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh { .. })
    }
}

impl std::fmt::Display for Freshness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fresh { until } => write!(f, "fresh until {}", format_timestamp(until)),
            Self::NoMetadata => write!(f, "no metadata"),
            Self::ArtifactMissing => write!(f, "artifact missing"),
            Self::Unreadable(e) => write!(f, "metadata unreadable: {e}"),
            Self::TooOld { age_days } => write!(f, "last update {age_days} days ago"),
            Self::Due => write!(f, "refresh due"),
        }
    }
}

/// Inspect the cache directory. Any read or parse problem fails open toward
/// refreshing.
pub fn check(paths: &CachePaths, now: DateTime<Utc>, max_age: Duration) -> Freshness {
    let metadata = match read_metadata(&paths.metadata) {
        Ok(Some(m)) => m,
        Ok(None) => return Freshness::NoMetadata,
        Err(e) => return Freshness::Unreadable(e.to_string()),
    };
    // Metadata without the artifact it describes is never fresh.
    if !paths.artifact_exists() {
        return Freshness::ArtifactMissing;
    }
    assess(&metadata, now, max_age)
}

/// Pure staleness decision over parsed metadata.
pub fn assess(metadata: &CacheMetadata, now: DateTime<Utc>, max_age: Duration) -> Freshness {
    let age = now - metadata.last_updated;
    if age > max_age {
        return Freshness::TooOld {
            age_days: age.num_days(),
        };
    }
    if metadata.next_update_after > now {
        Freshness::Fresh {
            until: metadata.next_update_after,
        }
    } else {
        Freshness::Due
    }
}

pub fn is_fresh(
    metadata: Option<&CacheMetadata>,
    artifact_exists: bool,
    now: DateTime<Utc>,
    max_age: Duration,
) -> bool {
    match metadata {
        Some(m) if artifact_exists => assess(m, now, max_age).is_fresh(),
        _ => false,
    }
}
