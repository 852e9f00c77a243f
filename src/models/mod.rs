//! Data models.

pub mod cache;
pub mod config;
pub mod metadata;
pub mod outcome;
