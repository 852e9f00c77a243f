//! Artwork discovery next to media files.

use crate::models::config::ArtworkConfig;
use crate::models::metadata::Artwork;
use std::path::{Path, PathBuf};

/// Poster and backdrop found for one media item.
#[derive(Debug, Default)]
pub struct DiscoveredArtwork {
    pub poster: Option<Artwork>,
    pub backdrop: Option<Artwork>,
}

/// Expand `{stem}` in a configured artwork name.
pub fn expand_name(pattern: &str, stem: &str) -> String {
    pattern.replace("{stem}", stem)
}

/// First existing file in `dir` among `names`.
pub fn find_first(dir: &Path, names: &[String], stem: &str) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| dir.join(expand_name(name, stem)))
        .find(|candidate| candidate.is_file())
}

/// Look up poster and backdrop images in `dir` for the media `stem`.
///
/// Only paths are recorded; bytes are read later by `MetadataModel::load_artwork`.
pub fn discover(dir: &Path, stem: &str, config: &ArtworkConfig) -> DiscoveredArtwork {
    let poster = find_first(dir, &config.poster_names, stem);
    let backdrop = find_first(dir, &config.backdrop_names, stem);

    tracing::debug!(
        "Artwork for {}: poster={:?}, backdrop={:?}",
        stem,
        poster.as_deref().and_then(Path::file_name),
        backdrop.as_deref().and_then(Path::file_name)
    );

    DiscoveredArtwork {
        poster: poster.map(Artwork::from_path),
        backdrop: backdrop.map(Artwork::from_path),
    }
}
