//! nfo2vsmeta Library
//!
//! Converts NFO sidecar metadata into VSMETA files for NAS media indexers,
//! with an incremental cache and optional media renaming.

pub mod cli;
pub mod codec;
pub mod core;
pub mod error;
pub mod generators;
pub mod models;
pub mod utils;

pub use error::{Error, Result};
