//! Atomic publication of the artifact and its metadata.
//!
//! Each file goes to a `<name>.tmp` sibling, is synced, then renamed over the
//! final path. Readers see the old file or the new one, never a partial write.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use intelcache_core::{CacheMetadata, Error, Result};
use serde::{Deserialize, Serialize};

use crate::config::CacheConfig;

/// Locations of the two persisted files.
#[derive(Debug, Clone)]
pub struct CachePaths {
    pub dir: PathBuf,
    pub artifact: PathBuf,
    pub metadata: PathBuf,
}

impl CachePaths {
    pub fn new(dir: impl Into<PathBuf>, config: &CacheConfig) -> Self {
        let dir = dir.into();
        Self {
            artifact: dir.join(&config.artifact_file),
            metadata: dir.join(&config.metadata_file),
            dir,
        }
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn artifact_exists(&self) -> bool {
        self.artifact.is_file()
    }
}

/// A file written to its temporary sibling but not yet visible under the
/// final name. Dropping it uncommitted removes the temporary file.
#[derive(Debug)]
pub struct StagedWrite {
    tmp: PathBuf,
    dest: PathBuf,
    committed: bool,
}

impl StagedWrite {
    pub fn stage(dest: &Path, contents: &[u8]) -> Result<Self> {
        let tmp = tmp_path(dest);
        let staged = Self {
            tmp,
            dest: dest.to_path_buf(),
            committed: false,
        };
        let mut file = File::create(&staged.tmp).map_err(|e| Error::publish(&staged.tmp, e))?;
        file.write_all(contents)
            .and_then(|_| file.sync_all())
            .map_err(|e| Error::publish(&staged.tmp, e))?;
        Ok(staged)
    }

    pub fn tmp_path(&self) -> &Path {
        &self.tmp
    }

    pub fn commit(mut self) -> Result<()> {
        fs::rename(&self.tmp, &self.dest).map_err(|e| Error::publish(&self.dest, e))?;
        self.committed = true;
        sync_parent(&self.dest);
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}

fn tmp_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    dest.with_file_name(name)
}

#[cfg(unix)]
fn sync_parent(path: &Path) {
    if let Some(dir) = path.parent() {
        if let Ok(handle) = File::open(dir) {
            let _ = handle.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) {}

pub fn write_atomic(dest: &Path, contents: &[u8]) -> Result<()> {
    StagedWrite::stage(dest, contents)?.commit()
}

/// Tab-indented pretty JSON with a trailing newline, stable field order.
pub fn encode_metadata(metadata: &CacheMetadata) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    metadata.serialize(&mut ser)?;
    buf.push(b'\n');
    String::from_utf8(buf).map_err(|e| Error::Internal(e.to_string()))
}

/// Publish a cycle's result. The artifact (when present) lands before the
/// metadata that vouches for it.
pub fn publish(paths: &CachePaths, artifact: Option<&str>, metadata: &CacheMetadata) -> Result<()> {
    if let Some(doc) = artifact {
        write_atomic(&paths.artifact, doc.as_bytes())?;
    }
    let encoded = encode_metadata(metadata)?;
    write_atomic(&paths.metadata, encoded.as_bytes())
}

/// Full metadata, or `None` when absent. Parse failures are errors so the
/// caller can tell corruption from absence.
pub fn read_metadata(path: &Path) -> Result<Option<CacheMetadata>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[derive(Deserialize)]
struct LastUpdatedOnly {
    last_updated: DateTime<Utc>,
}

/// Recover just `last_updated` from a possibly damaged metadata file.
pub fn read_last_updated(path: &Path) -> Option<DateTime<Utc>> {
    let text = fs::read_to_string(path).ok()?;
    serde_json::from_str::<LastUpdatedOnly>(&text)
        .ok()
        .map(|m| m.last_updated)
}
