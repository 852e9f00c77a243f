//! VSMETA decoder.

use super::edition::{FormatEdition, HEADER_LEN};
use super::encoder::Scope;
use super::tags::{self, FieldKind};
use super::varint::{decode_varint, MAX_VARINT_BYTES};
use super::wire::{Entry, Value, WireRecord};
use crate::{Error, Result};

/// Decode a record, accepting varints up to the full 10 bytes.
pub fn decode(bytes: &[u8]) -> Result<WireRecord> {
    decode_with_limit(bytes, MAX_VARINT_BYTES)
}

/// Decode a record, rejecting varints longer than `max_varint_bytes`.
pub fn decode_with_limit(bytes: &[u8], max_varint_bytes: usize) -> Result<WireRecord> {
    let edition = FormatEdition::from_header(bytes)?;
    let mut cursor = Cursor {
        data: bytes,
        pos: HEADER_LEN,
        end: bytes.len(),
        edition,
        max_varint_bytes,
    };

    let mut record = WireRecord::new(edition);
    while !cursor.at_end() {
        let tag = cursor.read_tag()?;
        if tag == tags::TERMINATOR {
            record.terminated = true;
            if !cursor.at_end() {
                return Err(Error::TrailingData(cursor.remaining()));
            }
            break;
        }
        record.entries.push(cursor.read_entry(tag, Scope::Record)?);
    }

    tracing::trace!(
        "Decoded {} entries ({} edition, {} bytes)",
        record.entries.len(),
        edition,
        bytes.len()
    );
    Ok(record)
}

/// Bounded reader over a slice of the input. Offsets in errors are absolute.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
    edition: FormatEdition,
    max_varint_bytes: usize,
}

impl<'a> Cursor<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    fn read_varint(&mut self) -> Result<u64> {
        let window = &self.data[self.pos..self.end];
        let (value, len) = decode_varint(window, self.max_varint_bytes).map_err(|e| match e {
            Error::InvalidVarint { reason, .. } => Error::InvalidVarint {
                offset: self.pos,
                reason,
            },
            Error::TruncatedRecord {
                declared, remaining, ..
            } => Error::TruncatedRecord {
                offset: self.pos,
                declared,
                remaining,
            },
            other => other,
        })?;
        self.pos += len;
        Ok(value)
    }

    fn read_fixed(&mut self) -> Result<[u8; 4]> {
        let bytes = self.take(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn take(&mut self, len: u64) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining as u64 {
            return Err(Error::TruncatedRecord {
                offset: self.pos,
                declared: len,
                remaining,
            });
        }
        let start = self.pos;
        self.pos += len as usize;
        Ok(&self.data[start..self.pos])
    }

    fn read_tag(&mut self) -> Result<u64> {
        if self.edition.uses_varints() {
            self.read_varint()
        } else {
            Ok(u32::from_le_bytes(self.read_fixed()?) as u64)
        }
    }

    fn read_length(&mut self) -> Result<u64> {
        if self.edition.uses_varints() {
            self.read_varint()
        } else {
            Ok(u32::from_le_bytes(self.read_fixed()?) as u64)
        }
    }

    fn read_payload(&mut self) -> Result<&'a [u8]> {
        let len = self.read_length()?;
        self.take(len)
    }

    fn read_number(&mut self, tag: u64) -> Result<[u8; 4]> {
        if !self.edition.uses_varints() {
            let len = self.read_length()?;
            if len != 4 {
                return Err(Error::invalid_field(
                    tag,
                    format!("numeric field declares {} bytes", len),
                ));
            }
        }
        self.read_fixed()
    }

    fn read_entry(&mut self, tag: u64, scope: Scope) -> Result<Entry> {
        let entry = match scope.kind_of(tag) {
            None => Entry::Opaque {
                tag,
                payload: self.read_payload()?.to_vec(),
            },
            Some(FieldKind::Text) => {
                let payload = self.read_payload()?;
                Entry::field(tag, Value::Text(self.edition.decode_text(tag, payload)?))
            }
            Some(FieldKind::Bytes) => Entry::field(tag, Value::Bytes(self.read_payload()?.to_vec())),
            Some(FieldKind::UInt32) => {
                Entry::field(tag, Value::UInt32(u32::from_le_bytes(self.read_number(tag)?)))
            }
            Some(FieldKind::Float32) => {
                Entry::field(tag, Value::Float32(f32::from_le_bytes(self.read_number(tag)?)))
            }
            Some(FieldKind::Group) => {
                let len = self.read_length()?;
                let body_start = self.pos;
                self.take(len)?;
                let mut group = Cursor {
                    data: self.data,
                    pos: body_start,
                    end: self.pos,
                    edition: self.edition,
                    max_varint_bytes: self.max_varint_bytes,
                };
                Entry::Group {
                    tag,
                    entries: group.read_group()?,
                }
            }
        };
        Ok(entry)
    }

    fn read_group(&mut self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        while !self.at_end() {
            let tag = self.read_tag()?;
            if tag == tags::TERMINATOR {
                return Err(Error::invalid_field(tag, "terminator inside a group"));
            }
            entries.push(self.read_entry(tag, Scope::Group)?);
        }
        Ok(entries)
    }
}
