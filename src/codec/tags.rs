//! Tag table, version 1.
//!
//! Record-scope tags identify top-level fields; group-scope tags are only
//! meaningful inside the poster and backdrop groups.

/// Version of the tag table below.
pub const TAG_TABLE_VERSION: u32 = 1;

pub const TERMINATOR: u64 = 0x00;
pub const TITLE: u64 = 0x01;
pub const ORIGINAL_TITLE: u64 = 0x02;
pub const PLOT: u64 = 0x03;
pub const YEAR: u64 = 0x04;
pub const RATING: u64 = 0x05;
pub const ACTOR: u64 = 0x06;
pub const DIRECTOR: u64 = 0x07;
pub const GENRE: u64 = 0x08;
pub const MPAA: u64 = 0x09;
pub const WRITER: u64 = 0x0A;
pub const PREMIERED: u64 = 0x0B;
pub const STUDIO: u64 = 0x0C;
pub const RUNTIME: u64 = 0x0D;
pub const TAGLINE: u64 = 0x0E;
pub const SORT_TITLE: u64 = 0x0F;
pub const ID: u64 = 0x10;
pub const POSTER: u64 = 0x8A;
pub const BACKDROP: u64 = 0xAA;

/// Tags valid inside an artwork group.
pub mod group {
    pub const IMAGE: u64 = 0x01;
    pub const CHECKSUM: u64 = 0x02;
    pub const TIMESTAMP: u64 = 0x03;
}

/// Payload kind implied by a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    UInt32,
    Float32,
    Bytes,
    Group,
}

/// Kind of a record-scope tag, `None` for tags outside the table.
pub fn field_kind(tag: u64) -> Option<FieldKind> {
    match tag {
        TITLE | ORIGINAL_TITLE | PLOT | ACTOR | DIRECTOR | GENRE | MPAA | WRITER | PREMIERED
        | STUDIO | TAGLINE | SORT_TITLE | ID => Some(FieldKind::Text),
        YEAR | RUNTIME => Some(FieldKind::UInt32),
        RATING => Some(FieldKind::Float32),
        POSTER | BACKDROP => Some(FieldKind::Group),
        _ => None,
    }
}

/// Kind of a group-scope tag.
pub fn group_field_kind(tag: u64) -> Option<FieldKind> {
    match tag {
        group::IMAGE => Some(FieldKind::Bytes),
        group::CHECKSUM => Some(FieldKind::Text),
        group::TIMESTAMP => Some(FieldKind::UInt32),
        _ => None,
    }
}

/// Whether a record-scope tag may appear more than once.
pub fn is_repeated(tag: u64) -> bool {
    matches!(tag, ACTOR | DIRECTOR | GENRE | WRITER | STUDIO)
}

/// Human-readable name of a record-scope tag.
pub fn tag_name(tag: u64) -> Option<&'static str> {
    let name = match tag {
        TERMINATOR => "terminator",
        TITLE => "title",
        ORIGINAL_TITLE => "original_title",
        PLOT => "plot",
        YEAR => "year",
        RATING => "rating",
        ACTOR => "actor",
        DIRECTOR => "director",
        GENRE => "genre",
        MPAA => "mpaa",
        WRITER => "writer",
        PREMIERED => "premiered",
        STUDIO => "studio",
        RUNTIME => "runtime",
        TAGLINE => "tagline",
        SORT_TITLE => "sort_title",
        ID => "id",
        POSTER => "poster",
        BACKDROP => "backdrop",
        _ => return None,
    };
    Some(name)
}

/// Human-readable name of a group-scope tag.
pub fn group_tag_name(tag: u64) -> Option<&'static str> {
    match tag {
        group::IMAGE => Some("image"),
        group::CHECKSUM => Some("checksum"),
        group::TIMESTAMP => Some("timestamp"),
        _ => None,
    }
}
