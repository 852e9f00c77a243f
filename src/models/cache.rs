//! Conversion cache data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Current on-disk cache schema version.
pub const CACHE_VERSION: u32 = 1;

/// How source files are fingerprinted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintStrategy {
    /// SHA-256 of the file contents.
    #[default]
    Content,
    /// Modification time and size.
    Metadata,
}

impl std::fmt::Display for FingerprintStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FingerprintStrategy::Content => write!(f, "content"),
            FingerprintStrategy::Metadata => write!(f, "metadata"),
        }
    }
}

impl std::str::FromStr for FingerprintStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "content" | "hash" => Ok(FingerprintStrategy::Content),
            "metadata" | "mtime" => Ok(FingerprintStrategy::Metadata),
            other => Err(format!("unknown fingerprint strategy: {}", other)),
        }
    }
}

/// Value used to detect that a source file changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Fingerprint {
    /// Content hash (hex SHA-256).
    Content { sha256: String },
    /// Modification time and size.
    Metadata { modified: DateTime<Utc>, size: u64 },
}

/// Last successful conversion of one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Absolute source (NFO) path.
    pub source_path: PathBuf,
    /// Source fingerprint at conversion time.
    pub fingerprint: Fingerprint,
    /// Output (VSMETA) path.
    pub output_path: PathBuf,
    /// Conversion timestamp.
    pub converted_at: DateTime<Utc>,
    /// Set when a later conversion of this source failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalidated_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Whether the entry has been invalidated.
    pub fn is_invalidated(&self) -> bool {
        self.invalidated_at.is_some()
    }
}

/// Persisted cache document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheFile {
    /// Schema version.
    pub version: u32,
    /// Entries keyed by absolute source path.
    pub entries: BTreeMap<PathBuf, CacheEntry>,
}

impl Default for CacheFile {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

/// Why a source does or does not need conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// Cached output matches the source.
    Fresh,
    /// Never converted.
    NoEntry,
    /// Entry was invalidated by a failed conversion.
    Invalidated,
    /// Source changed since the last conversion.
    FingerprintChanged,
    /// Recorded output no longer exists.
    OutputMissing,
}

impl Staleness {
    pub fn is_stale(self) -> bool {
        self != Staleness::Fresh
    }
}

/// Change to apply to the cache, sent from a worker to the cache owner.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheUpdate {
    /// Record a successful conversion, replacing the entry at `previous_key`
    /// when the source was renamed.
    Record {
        entry: CacheEntry,
        previous_key: Option<PathBuf>,
    },
    /// Mark an entry invalid.
    Invalidate(PathBuf),
}
