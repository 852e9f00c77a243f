//! Error types for the NFO to VSMETA converter.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the converter.
#[derive(Error, Debug)]
pub enum Error {
    // Source (NFO) errors
    #[error("Malformed NFO source: {0}")]
    MalformedSource(String),

    #[error("Unsupported NFO schema: {0}")]
    UnsupportedSchema(String),

    // VSMETA decode errors
    #[error("Truncated record at offset {offset}: {declared} bytes declared, {remaining} remaining")]
    TruncatedRecord {
        offset: usize,
        declared: u64,
        remaining: usize,
    },

    #[error("Invalid varint at offset {offset}: {reason}")]
    InvalidVarint { offset: usize, reason: &'static str },

    #[error("Bad VSMETA header: {0}")]
    BadMagic(String),

    #[error("Invalid field 0x{tag:02X}: {reason}")]
    InvalidField { tag: u64, reason: String },

    #[error("{0} trailing bytes after record terminator")]
    TrailingData(usize),

    #[error("Checksum mismatch in group 0x{tag:02X}: expected {expected}, found {actual}")]
    ChecksumMismatch {
        tag: u64,
        expected: String,
        actual: String,
    },

    // Cache errors
    #[error("Cache store corrupted: {0}")]
    CacheCorruption(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid rename template: {0}")]
    Template(String),

    // File system errors
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("File already exists: {0}")]
    FileAlreadyExists(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // TOML errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Create an invalid-field error.
    pub fn invalid_field<S: Into<String>>(tag: u64, reason: S) -> Self {
        Error::InvalidField {
            tag,
            reason: reason.into(),
        }
    }

    /// Whether this error came from the VSMETA decode path.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Error::TruncatedRecord { .. }
                | Error::InvalidVarint { .. }
                | Error::BadMagic(_)
                | Error::InvalidField { .. }
                | Error::TrailingData(_)
                | Error::ChecksumMismatch { .. }
        )
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::MalformedSource(err.to_string())
    }
}
