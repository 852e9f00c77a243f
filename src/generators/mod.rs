//! Name generators.

pub mod filename;
