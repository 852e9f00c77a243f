//! VSMETA encoder.

use super::edition::FormatEdition;
use super::tags::{self, FieldKind};
use super::varint::{encode_varint, encoded_len};
use super::wire::{Entry, Value, WireRecord};
use super::CodecOptions;
use crate::models::metadata::MetadataModel;
use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// Where an entry sits; decides which tag table applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    Record,
    Group,
}

impl Scope {
    pub(crate) fn kind_of(self, tag: u64) -> Option<FieldKind> {
        match self {
            Scope::Record => tags::field_kind(tag),
            Scope::Group => tags::group_field_kind(tag),
        }
    }
}

/// Encode `model` with the current time as the backdrop timestamp.
pub fn encode(model: &MetadataModel, options: &CodecOptions) -> Result<Vec<u8>> {
    encode_at(model, options, Utc::now())
}

/// Encode `model`, stamping generated artwork with `generated_at`.
pub fn encode_at(
    model: &MetadataModel,
    options: &CodecOptions,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let mut record = WireRecord::from_model(model, options.edition, generated_at);
    record.terminated = options.terminator;
    encode_record(&record)
}

/// Serialize a wire record exactly as given.
///
/// Fields must use tags from the table for their scope with a matching
/// value kind; opaque entries must use tags outside it.
pub fn encode_record(record: &WireRecord) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(&record.edition.header());

    for entry in &record.entries {
        write_entry(&mut out, record.edition, entry, Scope::Record)?;
    }
    if record.terminated {
        write_tag(&mut out, record.edition, tags::TERMINATOR)?;
    }

    Ok(out)
}

fn write_entry(out: &mut Vec<u8>, edition: FormatEdition, entry: &Entry, scope: Scope) -> Result<()> {
    match entry {
        Entry::Field { tag, value } => {
            let tag = *tag;
            if tag == tags::TERMINATOR {
                return Err(Error::invalid_field(tag, "terminator tag used as a field"));
            }
            match scope.kind_of(tag) {
                None => return Err(Error::invalid_field(tag, "tag is not in the tag table")),
                Some(kind) if kind != value.kind() => {
                    return Err(Error::invalid_field(
                        tag,
                        format!("expected {:?} payload, got {:?}", kind, value.kind()),
                    ))
                }
                Some(_) => {}
            }

            write_tag(out, edition, tag)?;
            match value {
                Value::Text(s) => write_payload(out, edition, tag, &edition.encode_text(s))?,
                Value::Bytes(b) => write_payload(out, edition, tag, b)?,
                Value::UInt32(n) => write_number(out, edition, tag, n.to_le_bytes())?,
                Value::Float32(x) => write_number(out, edition, tag, x.to_le_bytes())?,
            }
        }
        Entry::Group { tag, entries } => {
            let tag = *tag;
            if scope != Scope::Record || tags::field_kind(tag) != Some(FieldKind::Group) {
                return Err(Error::invalid_field(tag, "not a group tag in this scope"));
            }

            let mut body = Vec::new();
            for child in entries {
                write_entry(&mut body, edition, child, Scope::Group)?;
            }
            write_tag(out, edition, tag)?;
            write_payload(out, edition, tag, &body)?;
        }
        Entry::Opaque { tag, payload } => {
            let tag = *tag;
            if tag == tags::TERMINATOR || scope.kind_of(tag).is_some() {
                return Err(Error::invalid_field(tag, "known tag stored as opaque"));
            }
            write_tag(out, edition, tag)?;
            write_payload(out, edition, tag, payload)?;
        }
    }
    Ok(())
}

fn write_tag(out: &mut Vec<u8>, edition: FormatEdition, tag: u64) -> Result<()> {
    if edition.uses_varints() {
        encode_varint(out, tag);
    } else {
        let fixed = u32::try_from(tag)
            .map_err(|_| Error::invalid_field(tag, "tag does not fit a fixed 4-byte tag"))?;
        out.extend_from_slice(&fixed.to_le_bytes());
    }
    Ok(())
}

fn write_length(out: &mut Vec<u8>, edition: FormatEdition, tag: u64, len: usize) -> Result<()> {
    if edition.uses_varints() {
        encode_varint(out, len as u64);
    } else {
        let fixed = u32::try_from(len)
            .map_err(|_| Error::invalid_field(tag, "payload too long for a 4-byte length"))?;
        out.extend_from_slice(&fixed.to_le_bytes());
    }
    Ok(())
}

fn write_payload(out: &mut Vec<u8>, edition: FormatEdition, tag: u64, payload: &[u8]) -> Result<()> {
    out.reserve(encoded_len(payload.len() as u64) + payload.len());
    write_length(out, edition, tag, payload.len())?;
    out.extend_from_slice(payload);
    Ok(())
}

// Numbers are bare 4-byte values, except in the legacy edition where every
// entry carries a length.
fn write_number(out: &mut Vec<u8>, edition: FormatEdition, tag: u64, bytes: [u8; 4]) -> Result<()> {
    if edition.uses_varints() {
        out.extend_from_slice(&bytes);
        Ok(())
    } else {
        write_payload(out, edition, tag, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tags::group;

    fn options(edition: FormatEdition) -> CodecOptions {
        CodecOptions {
            edition,
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_standard_record() {
        let model = MetadataModel {
            title: "Foo".to_string(),
            year: 2020,
            rating: Some(9.0),
            ..Default::default()
        };
        let bytes = encode(&model, &options(FormatEdition::Standard)).unwrap();

        let mut expected = b"VSM\x02\x00\x00\x00".to_vec();
        expected.extend_from_slice(&[0x01, 0x03, b'F', b'o', b'o']);
        expected.push(0x04);
        expected.extend_from_slice(&2020u32.to_le_bytes());
        expected.push(0x05);
        expected.extend_from_slice(&9.0f32.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_legacy_uses_fixed_tags_and_lengths() {
        let model = MetadataModel {
            title: "A".to_string(),
            year: 1999,
            ..Default::default()
        };
        let bytes = encode(&model, &options(FormatEdition::Legacy)).unwrap();

        let mut expected = b"VSM\x01\x00\x00\x00".to_vec();
        expected.extend_from_slice(&1u32.to_le_bytes());
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(&[b'A', 0x00]);
        expected.extend_from_slice(&4u32.to_le_bytes());
        expected.extend_from_slice(&4u32.to_le_bytes());
        expected.extend_from_slice(&1999u32.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_terminator_is_appended() {
        let opts = CodecOptions {
            terminator: true,
            ..Default::default()
        };
        let bytes = encode(&MetadataModel::with_title("T"), &opts).unwrap();
        assert_eq!(bytes.last(), Some(&0x00));
        assert_eq!(bytes.len(), 7 + 3 + 1);
    }

    #[test]
    fn test_group_tag_is_two_byte_varint() {
        let record = WireRecord {
            edition: FormatEdition::Standard,
            entries: vec![Entry::Group {
                tag: tags::POSTER,
                entries: vec![Entry::field(group::CHECKSUM, Value::Text("ab".to_string()))],
            }],
            terminated: false,
        };
        let bytes = encode_record(&record).unwrap();
        assert_eq!(&bytes[7..], &[0x8A, 0x01, 0x04, 0x02, 0x02, b'a', b'b']);
    }

    #[test]
    fn test_rejects_invalid_entries() {
        let cases = vec![
            Entry::field(0x11, Value::Text("x".to_string())),
            Entry::field(tags::YEAR, Value::Text("2020".to_string())),
            Entry::field(tags::TERMINATOR, Value::UInt32(0)),
            Entry::Opaque {
                tag: tags::TITLE,
                payload: vec![],
            },
            Entry::Group {
                tag: tags::TITLE,
                entries: vec![],
            },
        ];

        for entry in cases {
            let record = WireRecord {
                edition: FormatEdition::Standard,
                entries: vec![entry],
                terminated: false,
            };
            assert!(matches!(
                encode_record(&record),
                Err(Error::InvalidField { .. })
            ));
        }
    }

    #[test]
    fn test_legacy_rejects_wide_tags() {
        let record = WireRecord {
            edition: FormatEdition::Legacy,
            entries: vec![Entry::Opaque {
                tag: u64::from(u32::MAX) + 1,
                payload: vec![1],
            }],
            terminated: false,
        };
        assert!(encode_record(&record).is_err());
    }
}
