//! Configuration model.

use crate::codec::FormatEdition;
use crate::core::nfo_reader::RatingScale;
use crate::models::cache::FingerprintStrategy;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration.
///
/// Every key is optional in the TOML file; missing keys take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Library root to scan for NFO files.
    pub scan_root: PathBuf,
    /// Directory for VSMETA output (next to the media file when unset).
    pub output_dir: Option<PathBuf>,
    /// Worker count (0 = one per logical core).
    pub concurrency: usize,
    /// Submission queue high-water mark.
    pub queue_depth: usize,
    /// Leave existing outputs that this tool has no record of.
    pub skip_existing: bool,
    /// Report what would happen without touching the filesystem.
    pub dry_run: bool,
    /// Ignore the cache and existing outputs.
    pub force: bool,
    /// Rename media files after conversion.
    pub rename_enabled: bool,
    /// Rename template, e.g. "{title} ({year})".
    pub rename_template: String,
    /// Skip renaming files whose name already looks well-formed.
    pub rename_skip_well_named: bool,
    /// Regex a media stem must match to count as well-formed.
    pub well_formed_pattern: Option<String>,
    /// Cache store location.
    pub cache_location: PathBuf,
    /// Fingerprint strategy.
    pub fingerprint_strategy: FingerprintStrategy,
    /// Persist the cache every N updates during a run.
    pub checkpoint_interval: usize,
    /// Directory names never descended into.
    pub exclude_dirs: Vec<String>,
    /// Media file extensions paired with NFO files.
    pub video_extensions: Vec<String>,
    /// Codec configuration.
    pub codec: CodecConfig,
    /// NFO reader configuration.
    pub reader: ReaderConfig,
    /// Artwork discovery configuration.
    pub artwork: ArtworkConfig,
}

/// VSMETA codec configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// On-disk format edition.
    pub edition: FormatEdition,
    /// Append a terminator tag (streaming consumers only).
    pub terminator: bool,
    /// Maximum varint length accepted when decoding.
    pub max_varint_bytes: usize,
}

/// NFO reader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Title used when the NFO has none.
    pub title_placeholder: String,
    /// How source ratings are scaled to 0-10.
    pub rating_scale: RatingScale,
}

/// Artwork discovery configuration.
///
/// Names are tried in order; `{stem}` expands to the media file stem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtworkConfig {
    /// Poster file names.
    pub poster_names: Vec<String>,
    /// Backdrop file names.
    pub backdrop_names: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_root: PathBuf::from("."),
            output_dir: None,
            concurrency: 0,
            queue_depth: 256,
            skip_existing: true,
            dry_run: false,
            force: false,
            rename_enabled: false,
            rename_template: "{title} ({year})".to_string(),
            rename_skip_well_named: true,
            well_formed_pattern: None,
            cache_location: dirs_config_path().join("cache.json"),
            fingerprint_strategy: FingerprintStrategy::default(),
            checkpoint_interval: 100,
            exclude_dirs: ["@eaDir", "#recycle", "@Recycle", ".tmp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            video_extensions: [
                "mkv", "mp4", "avi", "mov", "wmv", "m4v", "ts", "m2ts", "webm", "mpg", "mpeg",
                "iso", "rmvb",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            codec: CodecConfig::default(),
            reader: ReaderConfig::default(),
            artwork: ArtworkConfig::default(),
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            edition: FormatEdition::default(),
            terminator: false,
            max_varint_bytes: crate::codec::varint::MAX_VARINT_BYTES,
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            title_placeholder: "Untitled".to_string(),
            rating_scale: RatingScale::default(),
        }
    }
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            poster_names: ["{stem}-poster.jpg", "{stem}-poster.png", "poster.jpg", "folder.jpg", "cover.jpg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            backdrop_names: ["{stem}-fanart.jpg", "{stem}-fanart.png", "fanart.jpg", "backdrop.jpg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Effective worker count.
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency == 0 {
            num_cpus::get().max(1)
        } else {
            self.concurrency
        }
    }

    /// Check option combinations that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.queue_depth == 0 {
            return Err(crate::Error::InvalidConfig(
                "queue_depth must be at least 1".to_string(),
            ));
        }
        if self.codec.max_varint_bytes == 0
            || self.codec.max_varint_bytes > crate::codec::varint::MAX_VARINT_BYTES
        {
            return Err(crate::Error::InvalidConfig(format!(
                "codec.max_varint_bytes must be between 1 and {}",
                crate::codec::varint::MAX_VARINT_BYTES
            )));
        }
        if self.rename_enabled && self.rename_template.trim().is_empty() {
            return Err(crate::Error::InvalidConfig(
                "rename_template must not be empty when renaming is enabled".to_string(),
            ));
        }
        if let Some(ref pattern) = self.well_formed_pattern {
            regex::Regex::new(pattern).map_err(|e| {
                crate::Error::InvalidConfig(format!("well_formed_pattern: {}", e))
            })?;
        }
        if self.reader.title_placeholder.trim().is_empty() {
            return Err(crate::Error::InvalidConfig(
                "reader.title_placeholder must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Get the configuration directory path.
pub fn dirs_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nfo2vsmeta")
}

/// Default configuration file path.
pub fn default_config_file() -> PathBuf {
    dirs_config_path().join("config.toml")
}

/// Load configuration from `path`, or from the default location.
///
/// A missing file yields the defaults; an unreadable or invalid file is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_file);

    if !config_path.exists() {
        if path.is_some() {
            return Err(crate::Error::PathNotFound(config_path.display().to_string()));
        }
        tracing::debug!("No config file at {}, using defaults", config_path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&config_path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    tracing::debug!("Loaded config from {}", config_path.display());
    Ok(config)
}
