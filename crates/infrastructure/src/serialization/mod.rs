//! Deterministic JSON serialization for environment files.
//!
//! Keeps persisted files diff-friendly:
//! - Fields in declaration order (`serde_json` with `preserve_order`)
//! - 2-space indentation
//! - Trailing newline
//! - UTF-8 without BOM

mod json;

pub use json::*;
