//! Conversion cache store.
//!
//! Records, per absolute source path, the fingerprint of the source at its
//! last successful conversion. The store has a single owner; workers read an
//! immutable [`CacheSnapshot`] and send [`CacheUpdate`]s back to the owner.

use crate::models::cache::{
    CacheEntry, CacheFile, CacheUpdate, Fingerprint, FingerprintStrategy, Staleness, CACHE_VERSION,
};
use crate::utils::{fs as fs_utils, hash};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Compute a fingerprint from file bytes already read.
pub fn fingerprint_bytes(strategy: FingerprintStrategy, path: &Path, data: &[u8]) -> Result<Fingerprint> {
    match strategy {
        FingerprintStrategy::Content => Ok(Fingerprint::Content {
            sha256: hash::sha256_bytes(data),
        }),
        FingerprintStrategy::Metadata => fingerprint_metadata(path),
    }
}

/// Key the cache uses for `source`: its canonical path, or the path as
/// given when it cannot be resolved.
pub fn cache_key(source: &Path) -> PathBuf {
    std::fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf())
}

/// Compute a fingerprint for a file on disk.
pub fn fingerprint_file(strategy: FingerprintStrategy, path: &Path) -> Result<Fingerprint> {
    match strategy {
        FingerprintStrategy::Content => Ok(Fingerprint::Content {
            sha256: hash::sha256_file(path)?,
        }),
        FingerprintStrategy::Metadata => fingerprint_metadata(path),
    }
}

fn fingerprint_metadata(path: &Path) -> Result<Fingerprint> {
    let metadata = std::fs::metadata(path)?;
    let modified: DateTime<Utc> = metadata.modified()?.into();
    Ok(Fingerprint::Metadata {
        modified,
        size: metadata.len(),
    })
}

fn staleness_of(entry: Option<&CacheEntry>, fingerprint: &Fingerprint) -> Staleness {
    match entry {
        None => Staleness::NoEntry,
        Some(entry) if entry.is_invalidated() => Staleness::Invalidated,
        Some(entry) if entry.fingerprint != *fingerprint => Staleness::FingerprintChanged,
        Some(entry) if !entry.output_path.exists() => Staleness::OutputMissing,
        Some(_) => Staleness::Fresh,
    }
}

/// Read-only view of the cache shared with workers.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    entries: Arc<BTreeMap<PathBuf, CacheEntry>>,
    strategy: FingerprintStrategy,
}

impl CacheSnapshot {
    pub fn strategy(&self) -> FingerprintStrategy {
        self.strategy
    }

    pub fn get(&self, source: &Path) -> Option<&CacheEntry> {
        self.entries.get(source)
    }

    pub fn staleness(&self, source: &Path, fingerprint: &Fingerprint) -> Staleness {
        staleness_of(self.get(source), fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Persistent conversion cache.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    strategy: FingerprintStrategy,
    entries: Arc<BTreeMap<PathBuf, CacheEntry>>,
    dirty: bool,
}

impl CacheStore {
    /// Empty store that persists to `path`.
    pub fn new<P: AsRef<Path>>(path: P, strategy: FingerprintStrategy) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            strategy,
            entries: Arc::new(BTreeMap::new()),
            dirty: false,
        }
    }

    /// Load the store at `path`.
    ///
    /// A missing file yields an empty store. A corrupt or unreadable file is
    /// logged and also yields an empty store; it is replaced on the next
    /// persist.
    pub fn load<P: AsRef<Path>>(path: P, strategy: FingerprintStrategy) -> Self {
        let path = path.as_ref();
        let mut store = Self::new(path, strategy);

        if !path.exists() {
            tracing::debug!("No cache at {}, starting empty", path.display());
            return store;
        }

        match Self::read_file(path) {
            Ok(file) => {
                tracing::debug!("Loaded {} cache entries from {}", file.entries.len(), path.display());
                store.entries = Arc::new(file.entries);
            }
            Err(e) => {
                tracing::warn!("Ignoring unusable cache at {}: {}", path.display(), e);
                store.dirty = true;
            }
        }
        store
    }

    fn read_file(path: &Path) -> Result<CacheFile> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::CacheCorruption(format!("cannot read: {}", e)))?;
        let file: CacheFile = serde_json::from_str(&content)
            .map_err(|e| Error::CacheCorruption(format!("cannot parse: {}", e)))?;
        if file.version != CACHE_VERSION {
            return Err(Error::CacheCorruption(format!(
                "unsupported version {} (expected {})",
                file.version, CACHE_VERSION
            )));
        }
        Ok(file)
    }

    /// Write the whole store atomically.
    pub fn persist(&mut self) -> Result<()> {
        let file = CacheFile {
            version: CACHE_VERSION,
            entries: (*self.entries).clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs_utils::write_atomic(&self.path, json.as_bytes())?;
        self.dirty = false;
        tracing::debug!("Persisted {} cache entries to {}", file.entries.len(), self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn strategy(&self) -> FingerprintStrategy {
        self.strategy
    }

    /// Whether there are changes not yet persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Cheap read-only snapshot for workers.
    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            entries: Arc::clone(&self.entries),
            strategy: self.strategy,
        }
    }

    pub fn get(&self, source: &Path) -> Option<&CacheEntry> {
        self.entries.get(source)
    }

    /// All entries, ordered by source path.
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Why `source` does or does not need converting, given its current fingerprint.
    pub fn staleness(&self, source: &Path, fingerprint: &Fingerprint) -> Staleness {
        staleness_of(self.get(source), fingerprint)
    }

    /// Whether `source` needs converting. Unreadable sources count as stale.
    ///
    /// Relative and non-canonical paths are resolved first.
    pub fn is_stale(&self, source: &Path) -> bool {
        let key = cache_key(source);
        match fingerprint_file(self.strategy, &key) {
            Ok(fingerprint) => self.staleness(&key, &fingerprint).is_stale(),
            Err(e) => {
                tracing::debug!("Cannot fingerprint {}: {}", source.display(), e);
                true
            }
        }
    }

    /// Record a successful conversion of `source` into `output`.
    pub fn record_success(&mut self, source: &Path, output: &Path) -> Result<()> {
        let key = cache_key(source);
        let fingerprint = fingerprint_file(self.strategy, &key)?;
        self.insert(CacheEntry {
            source_path: key,
            fingerprint,
            output_path: output.to_path_buf(),
            converted_at: Utc::now(),
            invalidated_at: None,
        });
        Ok(())
    }

    fn insert(&mut self, entry: CacheEntry) {
        Arc::make_mut(&mut self.entries).insert(entry.source_path.clone(), entry);
        self.dirty = true;
    }

    /// Mark the entry for `source` invalid. Returns false when there is none.
    pub fn invalidate(&mut self, source: &Path) -> bool {
        let key = cache_key(source);
        match Arc::make_mut(&mut self.entries).get_mut(&key) {
            Some(entry) => {
                entry.invalidated_at = Some(Utc::now());
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Apply an update produced by a worker.
    pub fn apply(&mut self, update: CacheUpdate) {
        match update {
            CacheUpdate::Record {
                entry,
                previous_key,
            } => {
                if let Some(old) = previous_key.filter(|k| *k != entry.source_path) {
                    Arc::make_mut(&mut self.entries).remove(&old);
                }
                self.insert(entry);
            }
            CacheUpdate::Invalidate(source) => {
                self.invalidate(&source);
            }
        }
    }

    /// Drop entries whose source no longer exists. Returns the number removed.
    pub fn prune_missing(&mut self) -> usize {
        let before = self.entries.len();
        Arc::make_mut(&mut self.entries).retain(|source, _| source.exists());
        let removed = before - self.entries.len();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries = Arc::new(BTreeMap::new());
            self.dirty = true;
        }
    }
}
