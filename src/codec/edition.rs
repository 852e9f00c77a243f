//! Format editions observed for the VSMETA sidecar.
//!
//! Editions differ in tag width, length framing and text encoding. All of
//! them share the `VSM` family prefix; the fourth header byte identifies the
//! edition and the last three are reserved zeros.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Length of the magic header.
pub const HEADER_LEN: usize = 7;

/// Format family prefix.
pub const MAGIC_PREFIX: &[u8; 3] = b"VSM";

/// On-disk grammar variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatEdition {
    /// Fixed 4-byte tags and lengths, UTF-16LE text.
    Legacy,
    /// Varint tags and lengths, UTF-8 text.
    #[default]
    Standard,
    /// Varint tags and lengths, UTF-16LE text.
    Utf16,
}

impl FormatEdition {
    /// Edition identifier byte in the header.
    pub fn version_byte(self) -> u8 {
        match self {
            FormatEdition::Legacy => 0x01,
            FormatEdition::Standard => 0x02,
            FormatEdition::Utf16 => 0x03,
        }
    }

    /// Full 7-byte magic header.
    pub fn header(self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[..3].copy_from_slice(MAGIC_PREFIX);
        header[3] = self.version_byte();
        header
    }

    /// Identify the edition from a record header.
    pub fn from_header(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::TruncatedRecord {
                offset: 0,
                declared: HEADER_LEN as u64,
                remaining: bytes.len(),
            });
        }
        if &bytes[..3] != MAGIC_PREFIX {
            return Err(Error::BadMagic(format!(
                "expected VSM prefix, found {:02X?}",
                &bytes[..3]
            )));
        }
        if bytes[4..HEADER_LEN].iter().any(|&b| b != 0) {
            return Err(Error::BadMagic("reserved header bytes are not zero".to_string()));
        }
        match bytes[3] {
            0x01 => Ok(FormatEdition::Legacy),
            0x02 => Ok(FormatEdition::Standard),
            0x03 => Ok(FormatEdition::Utf16),
            other => Err(Error::BadMagic(format!("unknown edition byte 0x{:02X}", other))),
        }
    }

    /// Whether tags and lengths are varints (otherwise fixed u32).
    pub fn uses_varints(self) -> bool {
        !matches!(self, FormatEdition::Legacy)
    }

    /// Whether text is UTF-16LE (otherwise UTF-8).
    pub fn uses_utf16(self) -> bool {
        matches!(self, FormatEdition::Legacy | FormatEdition::Utf16)
    }

    /// Encode text for this edition.
    pub fn encode_text(self, text: &str) -> Vec<u8> {
        if self.uses_utf16() {
            text.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()
        } else {
            text.as_bytes().to_vec()
        }
    }

    /// Decode text for this edition; `tag` is only used for error reporting.
    pub fn decode_text(self, tag: u64, bytes: &[u8]) -> Result<String> {
        if self.uses_utf16() {
            if bytes.len() % 2 != 0 {
                return Err(Error::invalid_field(tag, "odd UTF-16 byte length"));
            }
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).map_err(|_| Error::invalid_field(tag, "invalid UTF-16 text"))
        } else {
            String::from_utf8(bytes.to_vec())
                .map_err(|_| Error::invalid_field(tag, "invalid UTF-8 text"))
        }
    }
}

impl std::fmt::Display for FormatEdition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatEdition::Legacy => write!(f, "legacy"),
            FormatEdition::Standard => write!(f, "standard"),
            FormatEdition::Utf16 => write!(f, "utf16"),
        }
    }
}

impl std::str::FromStr for FormatEdition {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" => Ok(FormatEdition::Legacy),
            "standard" | "utf8" => Ok(FormatEdition::Standard),
            "utf16" | "utf16le" => Ok(FormatEdition::Utf16),
            other => Err(format!("unknown format edition: {}", other)),
        }
    }
}
