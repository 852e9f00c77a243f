//! Media metadata model, independent of the NFO and VSMETA formats.

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Descriptive metadata for one media item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataModel {
    /// Display title (never empty after parsing).
    pub title: String,
    /// Original title.
    pub original_title: Option<String>,
    /// Sort title.
    pub sort_title: Option<String>,
    /// Tagline.
    pub tagline: Option<String>,
    /// Plot/description.
    pub plot: Option<String>,
    /// Release year (0 = unknown).
    pub year: u32,
    /// Rating on a 0-10 scale.
    pub rating: Option<f32>,
    /// Content rating (e.g., "PG-13").
    pub mpaa: Option<String>,
    /// Premiere date as written in the source (usually YYYY-MM-DD).
    pub premiered: Option<String>,
    /// Runtime in minutes.
    pub runtime: Option<u32>,
    /// Catalog identifier.
    pub id: Option<String>,
    /// Genres in document order.
    pub genres: Vec<String>,
    /// Actors in document order.
    pub actors: Vec<Actor>,
    /// Directors in document order.
    pub directors: Vec<String>,
    /// Writers in document order.
    pub writers: Vec<String>,
    /// Studios in document order.
    pub studios: Vec<String>,
    /// Poster artwork.
    pub poster: Option<Artwork>,
    /// Backdrop (fanart) artwork.
    pub backdrop: Option<Artwork>,
}

impl MetadataModel {
    /// Create a model with only a title set.
    pub fn with_title<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Load artwork bytes from disk, dropping any artwork that cannot be read.
    pub fn load_artwork(&mut self) {
        for (kind, slot) in [("poster", &mut self.poster), ("backdrop", &mut self.backdrop)] {
            if let Some(artwork) = slot.as_mut() {
                if let Err(e) = artwork.load().map(|_| ()) {
                    tracing::warn!(
                        "Failed to load {} {}: {}",
                        kind,
                        artwork
                            .path
                            .as_deref()
                            .map(|p| p.display().to_string())
                            .unwrap_or_default(),
                        e
                    );
                    *slot = None;
                }
            }
        }
    }
}

/// Actor credit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor name.
    pub name: String,
}

impl Actor {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }
}

/// Image bundled into the VSMETA record.
///
/// Artwork found next to an NFO only carries its path; the bytes are read
/// on demand by [`Artwork::load`]. Artwork produced by decoding a record
/// carries the embedded bytes and no path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artwork {
    /// Source image file.
    pub path: Option<PathBuf>,
    /// Raw image bytes, once loaded.
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
    /// Generation timestamp recorded in the record (backdrop only).
    pub generated_at: Option<DateTime<Utc>>,
}

impl Artwork {
    /// Reference an image file without reading it.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Wrap already-loaded image bytes.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    /// Read the image bytes if not already loaded.
    pub fn load(&mut self) -> Result<&[u8]> {
        if self.data.is_none() {
            let path = self
                .path
                .as_deref()
                .ok_or_else(|| crate::Error::other("artwork has neither bytes nor a path"))?;
            self.data = Some(std::fs::read(path)?);
        }
        Ok(self.data.as_deref().unwrap_or_default())
    }

    /// Loaded bytes, if any.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}
