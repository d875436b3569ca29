//! Error types for Confex.
//!
//! Library crates use [`ConfexError`] via `thiserror`.
//! App crates (cli) wrap this with `color-eyre` for rich diagnostics.
//!
//! The extraction engine itself is infallible: html5ever recovers from any
//! input and missing attributes degrade to defaults, so this type only covers
//! the workspace's actual fallible edges — file I/O and JSON coding.

use std::path::PathBuf;

/// Top-level error type for all Confex operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfexError {
    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON encoding or decoding error (child maps, CLI output).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ConfexError>;

impl ConfexError {
    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
