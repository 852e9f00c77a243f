//! CLI command implementations.

pub mod cache;
pub mod convert;
pub mod inspect;

use crate::models::config::{load_config, Config};
use crate::Result;
use std::path::Path;

/// Load the configuration, applying a `--cache` override.
pub(crate) fn load_settings(config_path: Option<&Path>, cache: Option<&Path>) -> Result<Config> {
    let mut config = load_config(config_path)?;
    if let Some(cache) = cache {
        config.cache_location = cache.to_path_buf();
    }
    Ok(config)
}
