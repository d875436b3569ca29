//! Static child-document maps.
//!
//! The engine expands the children macro through a caller-supplied lookup;
//! in production that lookup is backed by a wiki client, which is outside
//! this workspace. [`StaticChildMap`] is the in-process stand-in: a JSON
//! table of `parent id -> [ChildPage]` that the CLI and tests hand to
//! [`normalize_with_children`](crate::normalize_with_children) as the
//! lookup capability.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use confex_shared::{ChildPage, ConfexError, Result};

/// A fixed `parent id -> children` table loaded from JSON.
///
/// Expected shape:
///
/// ```json
/// { "1001": [{ "title": "Setup", "id": "42" }] }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticChildMap {
    entries: HashMap<String, Vec<ChildPage>>,
}

impl StaticChildMap {
    /// Parse a child map from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: HashMap<String, Vec<ChildPage>> = serde_json::from_str(json)?;
        Ok(Self { entries })
    }

    /// Load a child map from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| ConfexError::io(path, e))?;
        Self::from_json(&json)
    }

    /// Children of `document_id`, in the map's declared order. Unknown ids
    /// have no children.
    pub fn lookup(&self, document_id: &str) -> Vec<ChildPage> {
        self.entries.get(document_id).cloned().unwrap_or_default()
    }

    /// Borrow this map as the lookup closure
    /// [`normalize_with_children`](crate::normalize_with_children) expects.
    pub fn as_lookup(&self) -> impl Fn(&str) -> Vec<ChildPage> + '_ {
        |id| self.lookup(id)
    }
}
