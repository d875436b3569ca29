//! Shared types and error model for Confex.
//!
//! This crate is the foundation depended on by all other Confex crates.
//! It provides:
//! - [`ConfexError`] — the unified error type
//! - Domain types ([`ExtractionResult`], [`TableRecord`], [`ChildPage`])

pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use error::{ConfexError, Result};
pub use types::{ChildPage, ExtractionResult, TableRecord};
