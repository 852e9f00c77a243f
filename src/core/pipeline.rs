//! Conversion pipeline.
//!
//! Converts one NFO file into a VSMETA sidecar:
//! - resolve the source and its paired media file
//! - consult the cache and skip fresh sources
//! - parse, attach artwork, encode
//! - write the output atomically
//! - optionally rename the media set after the rendered title

use crate::codec::{self, CodecOptions};
use crate::core::artwork;
use crate::core::cache::{fingerprint_bytes, CacheSnapshot, CacheStore};
use crate::core::nfo_reader::NfoReader;
use crate::generators::filename;
use crate::models::cache::{CacheEntry, CacheUpdate, Staleness};
use crate::models::config::Config;
use crate::models::metadata::MetadataModel;
use crate::models::outcome::{ConversionOutcome, RenameOutcome};
use crate::utils::fs as fs_utils;
use crate::{Error, Result};
use chrono::Utc;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Extension of the generated sidecar.
pub const OUTPUT_EXTENSION: &str = "vsmeta";

/// Result of one unit of work: the outcome plus the cache change it implies.
#[derive(Debug)]
pub struct WorkResult {
    pub outcome: ConversionOutcome,
    pub cache_update: Option<CacheUpdate>,
}

/// Paths touched by a successful rename.
struct RenamedSet {
    outcome: RenameOutcome,
    source: Option<PathBuf>,
    output: Option<PathBuf>,
}

/// Per-file conversion pipeline. Shared read-only between workers.
pub struct Pipeline {
    config: Config,
    reader: NfoReader,
    codec: CodecOptions,
    well_formed: Option<Regex>,
    scan_root: PathBuf,
}

impl Pipeline {
    /// Build a pipeline, validating the configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        if config.rename_enabled {
            filename::validate_template(&config.rename_template)?;
        }
        let well_formed = config
            .well_formed_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| Error::InvalidConfig(format!("well_formed_pattern: {}", e)))?;
        let scan_root =
            std::fs::canonicalize(&config.scan_root).unwrap_or_else(|_| config.scan_root.clone());

        Ok(Self {
            reader: NfoReader::new(config.reader.clone()),
            codec: CodecOptions::from(&config.codec),
            well_formed,
            scan_root,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Convert `source` against `cache`, applying the resulting update.
    pub fn convert_one(&self, source: &Path, cache: &mut CacheStore) -> ConversionOutcome {
        let result = self.process(source, &cache.snapshot());
        if let Some(update) = result.cache_update {
            cache.apply(update);
        }
        result.outcome
    }

    /// Convert `source`, reading the cache only through `snapshot`.
    pub fn process(&self, source: &Path, snapshot: &CacheSnapshot) -> WorkResult {
        let abs = match std::fs::canonicalize(source) {
            Ok(p) => p,
            Err(e) => return self.failure(source, source, None, snapshot, e.into()),
        };

        let bytes = match std::fs::read(&abs) {
            Ok(b) => b,
            Err(e) => return self.failure(source, &abs, None, snapshot, e.into()),
        };
        let fingerprint = match fingerprint_bytes(snapshot.strategy(), &abs, &bytes) {
            Ok(fp) => fp,
            Err(e) => return self.failure(source, &abs, None, snapshot, e),
        };

        let media = find_media(&abs, &self.config.video_extensions);
        let output = self.output_path(&abs, media.as_deref());

        if !self.config.force {
            match snapshot.staleness(&abs, &fingerprint) {
                Staleness::Fresh => {
                    tracing::debug!("Up to date: {:?}", abs);
                    let recorded = snapshot.get(&abs).map(|e| e.output_path.clone());
                    return WorkResult {
                        outcome: ConversionOutcome::skipped(
                            source.to_path_buf(),
                            recorded.or(Some(output)),
                            "up-to-date",
                        )
                        .with_dry_run(self.config.dry_run),
                        cache_update: None,
                    };
                }
                Staleness::NoEntry if self.config.skip_existing && output.exists() => {
                    tracing::debug!("Output exists, skipping: {:?}", output);
                    return WorkResult {
                        outcome: ConversionOutcome::skipped(
                            source.to_path_buf(),
                            Some(output),
                            "output already exists",
                        )
                        .with_dry_run(self.config.dry_run),
                        cache_update: None,
                    };
                }
                reason => tracing::debug!("Converting {:?} ({:?})", abs, reason),
            }
        }

        let model = match self.convert(&abs, &bytes, media.as_deref(), &output) {
            Ok(model) => model,
            Err(e) => return self.failure(source, &abs, Some(output), snapshot, e),
        };

        let dry_run = self.config.dry_run;
        let mut outcome = ConversionOutcome::converted(source.to_path_buf(), output.clone(), dry_run);
        let mut final_source = abs.clone();
        let mut final_output = output;

        if self.config.rename_enabled {
            let renamed = self.rename_media_set(&abs, media.as_deref(), &model, &final_output);
            if let Some(p) = renamed.source {
                final_source = p;
            }
            if let Some(p) = renamed.output {
                final_output = p;
                outcome.output_path = Some(final_output.clone());
            }
            outcome.rename = Some(renamed.outcome);
        }

        if dry_run {
            tracing::info!("[dry-run] Would write {:?}", final_output);
            return WorkResult {
                outcome,
                cache_update: None,
            };
        }

        tracing::info!("Converted {:?} -> {:?}", source, final_output);
        let previous_key = (final_source != abs).then_some(abs);
        WorkResult {
            outcome,
            cache_update: Some(CacheUpdate::Record {
                entry: CacheEntry {
                    source_path: final_source,
                    fingerprint,
                    output_path: final_output,
                    converted_at: Utc::now(),
                    invalidated_at: None,
                },
                previous_key,
            }),
        }
    }

    fn failure(
        &self,
        source: &Path,
        key: &Path,
        output: Option<PathBuf>,
        snapshot: &CacheSnapshot,
        error: Error,
    ) -> WorkResult {
        tracing::warn!("Failed to convert {}: {}", source.display(), error);
        let cache_update = (!self.config.dry_run && snapshot.get(key).is_some())
            .then(|| CacheUpdate::Invalidate(key.to_path_buf()));
        WorkResult {
            outcome: ConversionOutcome::failed(source.to_path_buf(), output, error.to_string())
                .with_dry_run(self.config.dry_run),
            cache_update,
        }
    }

    /// Parse, attach artwork, encode and (unless dry-run) write.
    fn convert(
        &self,
        nfo: &Path,
        bytes: &[u8],
        media: Option<&Path>,
        output: &Path,
    ) -> Result<MetadataModel> {
        let mut model = self.reader.parse_bytes(bytes)?;

        let dir = nfo.parent().unwrap_or_else(|| Path::new("."));
        let stem = media.unwrap_or(nfo).file_stem().unwrap_or_default().to_string_lossy();
        let found = artwork::discover(dir, &stem, &self.config.artwork);
        model.poster = found.poster;
        model.backdrop = found.backdrop;
        model.load_artwork();

        let encoded = codec::encode(&model, &self.codec)?;
        if !self.config.dry_run {
            fs_utils::write_atomic(output, &encoded)?;
        }
        Ok(model)
    }

    /// Where the sidecar for `nfo` goes.
    ///
    /// `<media file name>.vsmeta` next to the media file, or `<nfo stem>.vsmeta`
    /// without one. With `output_dir` set, the directory layout below
    /// `scan_root` is mirrored there.
    pub fn output_path(&self, nfo: &Path, media: Option<&Path>) -> PathBuf {
        let file_name = match media.and_then(Path::file_name) {
            Some(name) => format!("{}.{}", name.to_string_lossy(), OUTPUT_EXTENSION),
            None => format!(
                "{}.{}",
                nfo.file_stem().unwrap_or_default().to_string_lossy(),
                OUTPUT_EXTENSION
            ),
        };
        let source_dir = nfo.parent().unwrap_or_else(|| Path::new("."));

        match &self.config.output_dir {
            Some(out_dir) => match source_dir.strip_prefix(&self.scan_root) {
                Ok(relative) => out_dir.join(relative).join(file_name),
                Err(_) => out_dir.join(file_name),
            },
            None => source_dir.join(file_name),
        }
    }

    fn rename_media_set(
        &self,
        nfo: &Path,
        media: Option<&Path>,
        model: &MetadataModel,
        output: &Path,
    ) -> RenamedSet {
        let unchanged = |outcome| RenamedSet {
            outcome,
            source: None,
            output: None,
        };

        let Some(media) = media else {
            return unchanged(RenameOutcome::NoMediaFile);
        };
        let stem = media.file_stem().unwrap_or_default().to_string_lossy().to_string();

        let rendered = match filename::render_template(&self.config.rename_template, model) {
            Ok(r) => r,
            Err(e) => return unchanged(RenameOutcome::Failed { error: e.to_string() }),
        };
        let pattern = if self.config.rename_skip_well_named {
            self.well_formed.as_ref()
        } else {
            None
        };
        if filename::is_well_formed(&stem, &rendered, pattern) {
            tracing::debug!("Already well-formed: {}", stem);
            return unchanged(RenameOutcome::WellFormed);
        }

        let dir = media.parent().unwrap_or_else(|| Path::new("."));
        let mut moves = match plan_renames(dir, &stem, &rendered, &self.config) {
            Ok(m) => m,
            Err(e) => return unchanged(RenameOutcome::Failed { error: e.to_string() }),
        };

        let media_name = media.file_name().unwrap_or_default().to_string_lossy();
        let new_media = dir.join(rename_name(&media_name, &stem, &rendered));
        let new_output = output.parent().map(|p| {
            p.join(format!(
                "{}.{}",
                new_media.file_name().unwrap_or_default().to_string_lossy(),
                OUTPUT_EXTENSION
            ))
        });
        // Outputs under output_dir are not siblings of the media file.
        if let Some(ref new_output) = new_output {
            if output.parent() != Some(dir) {
                moves.push((output.to_path_buf(), new_output.clone()));
            }
        }
        let new_source = moves
            .iter()
            .find(|(from, _)| from == nfo)
            .map(|(_, to)| to.clone());

        if let Some((_, to)) = moves.iter().find(|(_, to)| to.exists()) {
            let error = Error::FileAlreadyExists(to.display().to_string());
            return unchanged(RenameOutcome::Failed { error: error.to_string() });
        }

        if self.config.dry_run {
            return RenamedSet {
                outcome: RenameOutcome::Planned {
                    from: media.to_path_buf(),
                    to: new_media,
                },
                source: new_source,
                output: new_output,
            };
        }

        let mut done: Vec<&(PathBuf, PathBuf)> = Vec::new();
        for pair in &moves {
            if let Err(e) = fs_utils::rename_no_clobber(&pair.0, &pair.1) {
                tracing::warn!("Rename failed, reverting: {:?} -> {:?}: {}", pair.0, pair.1, e);
                for (from, to) in done.into_iter().rev() {
                    if let Err(e) = std::fs::rename(to, from) {
                        tracing::error!("Could not revert {:?} -> {:?}: {}", to, from, e);
                    }
                }
                return unchanged(RenameOutcome::Failed { error: e.to_string() });
            }
            done.push(pair);
        }

        tracing::info!("Renamed {} files: {} -> {}", moves.len(), stem, rendered);
        RenamedSet {
            outcome: RenameOutcome::Renamed {
                from: media.to_path_buf(),
                to: new_media,
            },
            source: new_source,
            output: new_output,
        }
    }
}

/// Replace the leading `stem` of `name` with `new_stem`.
fn rename_name(name: &str, stem: &str, new_stem: &str) -> String {
    format!("{}{}", new_stem, &name[stem.len().min(name.len())..])
}

/// Subtitle extensions carried along with the media file.
const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "sub", "idx", "vtt", "sup"];

/// `en`, `pt-BR`, `zh-Hans`.
fn is_language_tag(tag: &str) -> bool {
    let mut parts = tag.split('-');
    let primary = parts.next().unwrap_or_default();
    (2..=3).contains(&primary.len())
        && primary.chars().all(|c| c.is_ascii_alphabetic())
        && parts.all(|p| (2..=4).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Whether `name` is one of the files of the item with media stem `stem`:
/// `<stem>.<ext>`, `<stem>.<lang>.<subtitle ext>`, `<stem>.<video ext>.vsmeta`
/// or a configured `{stem}` artwork name. Videos and NFOs of another stem never match.
fn belongs_to_item(name: &str, stem: &str, config: &Config) -> bool {
    let path = Path::new(name);
    let is_item_file =
        fs_utils::is_video_file(path, &config.video_extensions) || fs_utils::is_nfo_file(path);
    if is_item_file && path.file_stem() != Some(std::ffi::OsStr::new(stem)) {
        return false;
    }

    let art = &config.artwork;
    if art
        .poster_names
        .iter()
        .chain(&art.backdrop_names)
        .filter(|pattern| pattern.contains("{stem}"))
        .any(|pattern| artwork::expand_name(pattern, stem) == name)
    {
        return true;
    }

    let Some(rest) = name.strip_prefix(stem).and_then(|r| r.strip_prefix('.')) else {
        return false;
    };
    let parts: Vec<&str> = rest.split('.').collect();
    match parts.as_slice() {
        [ext] => !ext.is_empty(),
        [lang, ext] if SUBTITLE_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)) => {
            is_language_tag(lang)
        }
        [video, ext] => {
            ext.eq_ignore_ascii_case(OUTPUT_EXTENSION)
                && config.video_extensions.iter().any(|v| v.eq_ignore_ascii_case(video))
        }
        _ => false,
    }
}

/// Every file in `dir` belonging to the item with media stem `stem`, paired
/// with its new path.
fn plan_renames(
    dir: &Path,
    stem: &str,
    new_stem: &str,
    config: &Config,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut moves = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if belongs_to_item(&name, stem, config) {
            moves.push((entry.path(), dir.join(rename_name(&name, stem, new_stem))));
        }
    }
    moves.sort();
    Ok(moves)
}

/// Media file paired with an NFO: a sibling video with the same stem, or
/// the only video in the directory.
pub fn find_media(nfo: &Path, video_extensions: &[String]) -> Option<PathBuf> {
    let dir = nfo.parent()?;
    let stem = nfo.file_stem()?;

    let mut videos: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && fs_utils::is_video_file(p, video_extensions))
        .collect();
    videos.sort();

    if let Some(same) = videos.iter().find(|p| p.file_stem() == Some(stem)) {
        return Some(same.clone());
    }
    match videos.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    }
}
