//! VSMETA binary codec.
//!
//! A record is a 7-byte magic header followed by tag-length-value entries.
//! See [`tags`] for the field table and [`FormatEdition`] for the grammar
//! variants.

pub mod decoder;
pub mod edition;
pub mod encoder;
pub mod tags;
pub mod varint;
pub mod wire;

pub use decoder::{decode, decode_with_limit};
pub use edition::FormatEdition;
pub use encoder::{encode, encode_at, encode_record};
pub use wire::{Entry, Value, WireRecord};

use crate::models::config::CodecConfig;

/// Encoder and decoder options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecOptions {
    pub edition: FormatEdition,
    /// Append a terminator tag.
    pub terminator: bool,
    pub max_varint_bytes: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            edition: FormatEdition::default(),
            terminator: false,
            max_varint_bytes: varint::MAX_VARINT_BYTES,
        }
    }
}

impl From<&CodecConfig> for CodecOptions {
    fn from(config: &CodecConfig) -> Self {
        Self {
            edition: config.edition,
            terminator: config.terminator,
            max_varint_bytes: config.max_varint_bytes,
        }
    }
}
