//! Deterministic JSON serialization for the storage file.
//!
//! Keeps the on-disk document readable and diffable:
//! - 2-space indentation
//! - Trailing newline
//! - UTF-8 encoding without BOM

mod json;

pub use json::*;
