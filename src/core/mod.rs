//! Core business logic modules.

pub mod artwork;
pub mod cache;
pub mod nfo_reader;
pub mod pipeline;
pub mod report;
pub mod scanner;
pub mod scheduler;
