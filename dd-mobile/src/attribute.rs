// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Transport-ready representation of host attribute values.
//!
//! Host applications attach arbitrary values to telemetry. Before an
//! event record is handed to a sink, every value is normalized into
//! [`AttributeValue`], a finite tagged union with depth and size caps.
//! Normalization is total: anything that cannot be represented becomes
//! [`AttributeValue::Unsupported`] instead of failing the call.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Maximum nesting depth for maps and lists. Levels below this bound
/// are replaced by `Unsupported("max-depth-exceeded")`.
pub const MAX_DEPTH: usize = 10;

/// Maximum length, in bytes, of a string value. Longer strings are cut
/// on a char boundary and suffixed with [`TRUNCATED_SUFFIX`].
pub const MAX_STRING_LEN: usize = 4096;

/// Maximum number of entries kept in a map or list value.
pub const MAX_COLLECTION_ENTRIES: usize = 256;

/// Suffix appended to truncated string values.
pub const TRUNCATED_SUFFIX: &str = "...";

/// Marker key inserted into maps that lost entries to truncation.
pub const TRUNCATED_MARKER_KEY: &str = "_dd.truncated";

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
    /// A value the normalizer could not represent. Carries a short
    /// debug description of why, never the value itself.
    Unsupported(String),
}

impl AttributeValue {
    /// Normalizes a dynamic host value into a transport-ready
    /// attribute, applying the depth bound and size caps.
    pub fn normalize(value: serde_json::Value) -> AttributeValue {
        normalize_at_depth(value, 0)
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, AttributeValue::Unsupported(_))
    }
}

fn normalize_at_depth(value: serde_json::Value, depth: usize) -> AttributeValue {
    if depth > MAX_DEPTH {
        return AttributeValue::Unsupported("max-depth-exceeded".to_string());
    }

    match value {
        serde_json::Value::Null => AttributeValue::Null,
        serde_json::Value::Bool(b) => AttributeValue::Bool(b),
        serde_json::Value::Number(n) => normalize_number(&n),
        serde_json::Value::String(s) => truncate_string(s),
        serde_json::Value::Array(items) => {
            let truncated = items.len() > MAX_COLLECTION_ENTRIES;
            let mut list: Vec<AttributeValue> = items
                .into_iter()
                .take(MAX_COLLECTION_ENTRIES)
                .map(|item| normalize_at_depth(item, depth + 1))
                .collect();
            if truncated {
                list.push(AttributeValue::Unsupported("list-truncated".to_string()));
            }
            AttributeValue::List(list)
        }
        serde_json::Value::Object(entries) => {
            let truncated = entries.len() > MAX_COLLECTION_ENTRIES;
            let mut map: BTreeMap<String, AttributeValue> = entries
                .into_iter()
                .take(MAX_COLLECTION_ENTRIES)
                .map(|(key, item)| (key, normalize_at_depth(item, depth + 1)))
                .collect();
            if truncated {
                map.insert(TRUNCATED_MARKER_KEY.to_string(), AttributeValue::Bool(true));
            }
            AttributeValue::Map(map)
        }
    }
}

fn normalize_number(n: &serde_json::Number) -> AttributeValue {
    if let Some(i) = n.as_i64() {
        return AttributeValue::Int(i);
    }
    if n.is_u64() {
        // u64 above i64::MAX; keeping it as a float would lose
        // precision silently
        return AttributeValue::Unsupported("integer-out-of-range".to_string());
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => AttributeValue::Float(f),
        _ => AttributeValue::Unsupported("non-finite-float".to_string()),
    }
}

fn truncate_string(s: String) -> AttributeValue {
    if s.len() <= MAX_STRING_LEN {
        return AttributeValue::Str(s);
    }
    let mut cut = MAX_STRING_LEN;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut truncated = s[..cut].to_string();
    truncated.push_str(TRUNCATED_SUFFIX);
    AttributeValue::Str(truncated)
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(value.into())
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        AttributeValue::Int(value.into())
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => AttributeValue::Int(v),
            Err(_) => AttributeValue::Unsupported("integer-out-of-range".to_string()),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            AttributeValue::Float(value)
        } else {
            AttributeValue::Unsupported("non-finite-float".to_string())
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        truncate_string(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        truncate_string(value)
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        AttributeValue::normalize(value)
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttributeValue::Null => serializer.serialize_unit(),
            AttributeValue::Bool(b) => serializer.serialize_bool(*b),
            AttributeValue::Int(i) => serializer.serialize_i64(*i),
            AttributeValue::Float(f) => serializer.serialize_f64(*f),
            AttributeValue::Str(s) => serializer.serialize_str(s),
            AttributeValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            AttributeValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, item) in entries {
                    map.serialize_entry(key, item)?;
                }
                map.end()
            }
            AttributeValue::Unsupported(desc) => {
                serializer.serialize_str(&format!("<unsupported: {desc}>"))
            }
        }
    }
}
