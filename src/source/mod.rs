use chrono::{DateTime, Utc};
use glob::glob;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

/// Where the dump files live: a primary directory, an optional fallback used
/// when the primary does not exist, and a glob pattern for the file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    pub dir: PathBuf,
    pub fallback_dir: Option<PathBuf>,
    pub pattern: String,
}

impl SourceSet {
    pub fn new(dir: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            fallback_dir: None,
            pattern: pattern.into(),
        }
    }

    pub fn with_fallback(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dir = Some(dir.into());
        self
    }

    fn active_dir(&self) -> Option<&Path> {
        if self.dir.is_dir() {
            return Some(&self.dir);
        }
        self.fallback_dir.as_deref().filter(|d| d.is_dir())
    }

    /// The existing dump files, lexicographically sorted so row order is
    /// stable across repeated loads. A missing directory yields an empty
    /// list, never an error.
    pub fn resolve(&self) -> Vec<PathBuf> {
        let Some(dir) = self.active_dir() else {
            return Vec::new();
        };
        let pattern = dir.join(&self.pattern);
        let entries = match glob(&pattern.to_string_lossy()) {
            Ok(e) => e,
            Err(e) => {
                warn!(pattern = %pattern.display(), error = %e, "bad source pattern");
                return Vec::new();
            }
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        files
    }

    /// Freshness signature: max modification time in millis across the
    /// resolved files, 0 when none resolve.
    pub fn signature(&self) -> i64 {
        self.resolve()
            .iter()
            .filter_map(|p| mtime_millis(p))
            .max()
            .unwrap_or(0)
    }

    pub fn info(&self) -> DataSourceInfo {
        let files = self.resolve();
        let directory = self
            .active_dir()
            .unwrap_or(&self.dir)
            .to_string_lossy()
            .into_owned();
        DataSourceInfo {
            kind: if files.is_empty() {
                SourceKind::None
            } else {
                SourceKind::Files
            },
            file_count: files.len(),
            directory,
        }
    }
}

fn mtime_millis(path: &Path) -> Option<i64> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Utc>::from(modified).timestamp_millis())
}

/// Observability summary for health endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceInfo {
    pub kind: SourceKind,
    pub file_count: usize,
    pub directory: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Files,
    None,
}
