use std::fs;

use intelcache_core::Result;

use super::publish::CachePaths;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetEntry {
    Removed(String),
    Skipped(String),
}

impl std::fmt::Display for ResetEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Removed(name) => write!(f, "removed: {name}"),
            Self::Skipped(name) => write!(f, "skipped: {name} (not found)"),
        }
    }
}

/// Delete the artifact and metadata. The directory and anything else in it
/// (e.g. `.gitkeep`) stay.
pub fn reset_cache(paths: &CachePaths) -> Result<Vec<ResetEntry>> {
    let mut entries = Vec::new();
    for path in [&paths.artifact, &paths.metadata] {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match fs::remove_file(path) {
            Ok(()) => entries.push(ResetEntry::Removed(name)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                entries.push(ResetEntry::Skipped(name))
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(entries)
}
