//! Core domain types for the Confex extraction engine.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// TableRecord
// ---------------------------------------------------------------------------

/// One data row of a flattened table, keyed by deduplicated header name.
///
/// Key order is insertion order — the markdown renderer prints columns in the
/// order the header row declared them, so the usual hash-map types don't fit.
/// Keys are unique by construction (the header dedup pass suffixes
/// collisions), so a small ordered vec is all we need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRecord {
    fields: Vec<(String, String)>,
}

impl TableRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header/value pair, replacing the value if the header exists.
    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        let header = header.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(h, _)| *h == header) {
            Some((_, v)) => *v = value,
            None => self.fields.push((header, value)),
        }
    }

    /// Look up a value by header name.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    /// Header names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(h, _)| h.as_str())
    }

    /// Header/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record has no values at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, String)> for TableRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (header, value) in iter {
            record.insert(header, value);
        }
        record
    }
}

impl Serialize for TableRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (header, value) in &self.fields {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TableRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = TableRecord;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to cell values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut record = TableRecord::new();
                while let Some((header, value)) = access.next_entry::<String, String>()? {
                    record.insert(header, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

// ---------------------------------------------------------------------------
// ChildPage
// ---------------------------------------------------------------------------

/// One entry from a child-document listing lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildPage {
    /// Display title of the child document.
    pub title: String,
    /// Opaque child document identifier.
    pub id: String,
}

// ---------------------------------------------------------------------------
// ExtractionResult
// ---------------------------------------------------------------------------

/// Normalized output of one document extraction.
///
/// Constructed once per [`normalize`](../confex_extract/fn.normalize.html)
/// call and immutable afterwards. Downstream chunking consumes
/// `combined_text`; citation rendering consumes `tables`, `links`, and
/// `attachments` as structured metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Prose content, one trimmed non-blank line per source line.
    pub plain_text: String,
    /// One record list per table, in document order.
    pub tables: Vec<Vec<TableRecord>>,
    /// Referenced document titles, duplicates kept, in encounter order.
    pub links: Vec<String>,
    /// Attachment base filenames (extension stripped), in encounter order.
    pub attachments: Vec<String>,
    /// Markdown renderings of all tables, blank-line separated.
    pub tables_markdown: String,
    /// `plain_text` plus labeled table and child-listing blocks.
    pub combined_text: String,
}
