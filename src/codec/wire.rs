//! In-memory form of an encoded VSMETA record.
//!
//! A `WireRecord` mirrors the byte stream entry for entry, so that decoding
//! and re-encoding a record reproduces the input exactly. Projection to and
//! from `MetadataModel` lives here as well.

use super::edition::FormatEdition;
use super::tags::{self, group, FieldKind};
use crate::models::metadata::{Actor, Artwork, MetadataModel};
use crate::utils::hash::md5_hex;
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};

/// Typed field payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    UInt32(u32),
    Float32(f32),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Text(_) => FieldKind::Text,
            Value::UInt32(_) => FieldKind::UInt32,
            Value::Float32(_) => FieldKind::Float32,
            Value::Bytes(_) => FieldKind::Bytes,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{:?}", s),
            Value::UInt32(n) => write!(f, "{}", n),
            Value::Float32(x) => write!(f, "{}", x),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// One entry of a record or group.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Known field from the tag table.
    Field { tag: u64, value: Value },
    /// Nested sub-record.
    Group { tag: u64, entries: Vec<Entry> },
    /// Unknown tag, kept verbatim.
    Opaque { tag: u64, payload: Vec<u8> },
}

impl Entry {
    pub fn field(tag: u64, value: Value) -> Self {
        Entry::Field { tag, value }
    }

    pub fn tag(&self) -> u64 {
        match self {
            Entry::Field { tag, .. } | Entry::Group { tag, .. } | Entry::Opaque { tag, .. } => *tag,
        }
    }
}

/// Decoded or to-be-encoded VSMETA record.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRecord {
    pub edition: FormatEdition,
    pub entries: Vec<Entry>,
    /// Whether the record ends with a terminator tag.
    pub terminated: bool,
}

impl WireRecord {
    pub fn new(edition: FormatEdition) -> Self {
        Self {
            edition,
            entries: Vec::new(),
            terminated: false,
        }
    }

    /// Build the canonical entry sequence for `model`.
    ///
    /// Scalars come first in ascending tag order, then repeated fields, then
    /// the artwork groups. Artwork without loaded bytes is left out.
    /// `generated_at` stamps the backdrop group unless the artwork carries
    /// its own timestamp.
    pub fn from_model(
        model: &MetadataModel,
        edition: FormatEdition,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::new(edition);
        let entries = &mut record.entries;

        entries.push(Entry::field(tags::TITLE, Value::Text(model.title.clone())));
        push_text(entries, tags::ORIGINAL_TITLE, &model.original_title);
        push_text(entries, tags::PLOT, &model.plot);
        if model.year != 0 {
            entries.push(Entry::field(tags::YEAR, Value::UInt32(model.year)));
        }
        if let Some(rating) = model.rating {
            entries.push(Entry::field(tags::RATING, Value::Float32(rating)));
        }
        push_text(entries, tags::MPAA, &model.mpaa);
        push_text(entries, tags::PREMIERED, &model.premiered);
        if let Some(runtime) = model.runtime {
            entries.push(Entry::field(tags::RUNTIME, Value::UInt32(runtime)));
        }
        push_text(entries, tags::TAGLINE, &model.tagline);
        push_text(entries, tags::SORT_TITLE, &model.sort_title);
        push_text(entries, tags::ID, &model.id);

        let repeated: [(u64, Vec<&str>); 5] = [
            (tags::ACTOR, model.actors.iter().map(|a| a.name.as_str()).collect()),
            (tags::DIRECTOR, model.directors.iter().map(String::as_str).collect()),
            (tags::GENRE, model.genres.iter().map(String::as_str).collect()),
            (tags::WRITER, model.writers.iter().map(String::as_str).collect()),
            (tags::STUDIO, model.studios.iter().map(String::as_str).collect()),
        ];
        for (tag, values) in repeated {
            for value in values.into_iter().filter(|v| !v.is_empty()) {
                entries.push(Entry::field(tag, Value::Text(value.to_string())));
            }
        }

        if let Some(poster) = model.poster.as_ref().and_then(|a| artwork_group(tags::POSTER, a, None)) {
            entries.push(poster);
        }
        if let Some(backdrop) = model.backdrop.as_ref().and_then(|a| {
            let stamp = a.generated_at.unwrap_or(generated_at);
            artwork_group(tags::BACKDROP, a, Some(unix_seconds(stamp)))
        }) {
            entries.push(backdrop);
        }

        record
    }

    /// Project the record back into a metadata model.
    ///
    /// When a scalar tag occurs more than once the last occurrence wins.
    /// Opaque entries are ignored.
    pub fn to_model(&self) -> Result<MetadataModel> {
        let mut model = MetadataModel::default();

        for entry in &self.entries {
            match entry {
                Entry::Field { tag, value } => apply_field(&mut model, *tag, value)?,
                Entry::Group { tag, entries } => {
                    let artwork = group_artwork(*tag, entries)?;
                    match *tag {
                        tags::POSTER => model.poster = artwork,
                        tags::BACKDROP => model.backdrop = artwork,
                        other => return Err(Error::invalid_field(other, "not a group tag")),
                    }
                }
                Entry::Opaque { .. } => {}
            }
        }

        Ok(model)
    }

    /// Recompute every group checksum against its embedded image.
    pub fn verify_checksums(&self) -> Result<()> {
        for entry in &self.entries {
            let Entry::Group { tag, entries } = entry else {
                continue;
            };
            let image = find_field(entries, group::IMAGE);
            let checksum = find_field(entries, group::CHECKSUM);

            if let (Some(Value::Bytes(image)), Some(Value::Text(expected))) = (image, checksum) {
                let actual = md5_hex(image);
                if !actual.eq_ignore_ascii_case(expected) {
                    return Err(Error::ChecksumMismatch {
                        tag: *tag,
                        expected: expected.clone(),
                        actual,
                    });
                }
            }
        }
        Ok(())
    }

    /// Last value of a record-scope field.
    pub fn value(&self, tag: u64) -> Option<&Value> {
        find_field(&self.entries, tag)
    }

    /// All values of a (repeated) record-scope field, in order.
    pub fn values(&self, tag: u64) -> Vec<&Value> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                Entry::Field { tag: t, value } if *t == tag => Some(value),
                _ => None,
            })
            .collect()
    }

    pub fn text(&self, tag: u64) -> Option<&str> {
        self.value(tag).and_then(Value::as_text)
    }

    pub fn group(&self, tag: u64) -> Option<&[Entry]> {
        self.entries.iter().rev().find_map(|e| match e {
            Entry::Group { tag: t, entries } if *t == tag => Some(entries.as_slice()),
            _ => None,
        })
    }

    /// Entries with unknown tags, at any depth.
    pub fn opaque_count(&self) -> usize {
        fn count(entries: &[Entry]) -> usize {
            entries
                .iter()
                .map(|e| match e {
                    Entry::Opaque { .. } => 1,
                    Entry::Group { entries, .. } => count(entries),
                    Entry::Field { .. } => 0,
                })
                .sum()
        }
        count(&self.entries)
    }
}

fn push_text(entries: &mut Vec<Entry>, tag: u64, value: &Option<String>) {
    if let Some(s) = value.as_deref().filter(|s| !s.is_empty()) {
        entries.push(Entry::field(tag, Value::Text(s.to_string())));
    }
}

fn find_field(entries: &[Entry], tag: u64) -> Option<&Value> {
    entries.iter().rev().find_map(|e| match e {
        Entry::Field { tag: t, value } if *t == tag => Some(value),
        _ => None,
    })
}

fn unix_seconds(stamp: DateTime<Utc>) -> u32 {
    stamp.timestamp().clamp(0, u32::MAX as i64) as u32
}

fn artwork_group(tag: u64, artwork: &Artwork, timestamp: Option<u32>) -> Option<Entry> {
    let bytes = artwork.bytes()?;
    let encoded = STANDARD.encode(bytes);
    let checksum = md5_hex(encoded.as_bytes());

    let mut entries = vec![
        Entry::field(group::IMAGE, Value::Bytes(encoded.into_bytes())),
        Entry::field(group::CHECKSUM, Value::Text(checksum)),
    ];
    if let Some(ts) = timestamp {
        entries.push(Entry::field(group::TIMESTAMP, Value::UInt32(ts)));
    }
    Some(Entry::Group { tag, entries })
}

fn group_artwork(tag: u64, entries: &[Entry]) -> Result<Option<Artwork>> {
    let Some(image) = find_field(entries, group::IMAGE) else {
        return Ok(None);
    };
    let Value::Bytes(encoded) = image else {
        return Err(Error::invalid_field(group::IMAGE, "image payload is not bytes"));
    };
    let data = STANDARD
        .decode(encoded)
        .map_err(|e| Error::invalid_field(tag, format!("image is not valid base64: {}", e)))?;

    let mut artwork = Artwork::from_bytes(data);
    if let Some(Value::UInt32(ts)) = find_field(entries, group::TIMESTAMP) {
        artwork.generated_at = DateTime::<Utc>::from_timestamp(*ts as i64, 0);
    }
    Ok(Some(artwork))
}

fn apply_field(model: &mut MetadataModel, tag: u64, value: &Value) -> Result<()> {
    let mismatch = || Error::invalid_field(tag, format!("unexpected {:?} payload", value.kind()));

    match (tag, value) {
        (tags::YEAR, Value::UInt32(n)) => model.year = *n,
        (tags::RUNTIME, Value::UInt32(n)) => model.runtime = Some(*n),
        (tags::RATING, Value::Float32(x)) => model.rating = Some(*x),
        (_, Value::Text(s)) => {
            let s = s.clone();
            match tag {
                tags::TITLE => model.title = s,
                tags::ORIGINAL_TITLE => model.original_title = Some(s),
                tags::PLOT => model.plot = Some(s),
                tags::MPAA => model.mpaa = Some(s),
                tags::PREMIERED => model.premiered = Some(s),
                tags::TAGLINE => model.tagline = Some(s),
                tags::SORT_TITLE => model.sort_title = Some(s),
                tags::ID => model.id = Some(s),
                tags::ACTOR => model.actors.push(Actor::new(s)),
                tags::DIRECTOR => model.directors.push(s),
                tags::GENRE => model.genres.push(s),
                tags::WRITER => model.writers.push(s),
                tags::STUDIO => model.studios.push(s),
                _ => return Err(mismatch()),
            }
        }
        _ => return Err(mismatch()),
    }
    Ok(())
}
