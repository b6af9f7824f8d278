//! Common types for quire-vector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for a record in an index.
pub type RecordId = String;

/// Metadata associated with a record.
///
/// Keys are kept sorted so the encoded snapshot is byte-for-byte stable for
/// identical input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    /// Key-value pairs of metadata.
    pub data: BTreeMap<String, MetadataValue>,
}

impl VectorMetadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create metadata from a list of key-value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<MetadataValue>,
    {
        Self {
            data: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Insert a key-value pair.
    pub fn insert<K: Into<String>, V: Into<MetadataValue>>(&mut self, key: K, value: V) {
        self.data.insert(key.into(), value.into());
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.data.get(key)
    }

    /// Get a string value by key.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.data.get(key)? {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get an integer value by key.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.data.get(key)? {
            MetadataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Check if metadata is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the number of metadata entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// A metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    /// String value.
    String(String),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Int(i)
    }
}

impl From<usize> for MetadataValue {
    fn from(i: usize) -> Self {
        MetadataValue::Int(i as i64)
    }
}

impl From<u32> for MetadataValue {
    fn from(i: u32) -> Self {
        MetadataValue::Int(i64::from(i))
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        MetadataValue::Float(f)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// One stored entry: the embedding plus the text it was produced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// External string ID, unique within an index.
    pub id: RecordId,
    /// The embedding vector.
    pub vector: Vec<f32>,
    /// The original text the vector was computed from.
    pub text: String,
    /// Caller-defined metadata (source page, offset, ...).
    pub metadata: VectorMetadata,
}

impl Record {
    /// Create a new record.
    pub fn new(
        id: impl Into<RecordId>,
        vector: Vec<f32>,
        text: impl Into<String>,
        metadata: VectorMetadata,
    ) -> Self {
        Self {
            id: id.into(),
            vector,
            text: text.into(),
            metadata,
        }
    }
}

/// Result of a vector search, borrowing the matched record from the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    /// The matched record.
    pub record: &'a Record,
    /// Similarity score (higher = more similar).
    pub score: f32,
}
