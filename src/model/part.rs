//! Structural node data: field map and byte offsets for one MIME part.
//!
//! This is what the structural parser hands over. It carries no bytes of
//! its own; every offset points into the message's backing store.

use serde::{Deserialize, Serialize};

/// A field value: one string, or every occurrence of a repeated header in
/// the order they appeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    One(String),
    Many(Vec<String>),
}

impl FieldValue {
    /// The first occurrence.
    pub fn first(&self) -> &str {
        match self {
            Self::One(v) => v,
            Self::Many(vs) => vs.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// Every occurrence, in order.
    pub fn all(&self) -> Vec<&str> {
        match self {
            Self::One(v) => vec![v.as_str()],
            Self::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// Append another occurrence, turning a single value into a sequence.
    fn push(&mut self, value: String) {
        match self {
            Self::One(first) => *self = Self::Many(vec![std::mem::take(first), value]),
            Self::Many(vs) => vs.push(value),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

/// Ordered mapping from lower-cased field name to value.
///
/// Reads hand out borrowed views or copies; writes replace a whole field.
/// There is no way to reach in and edit part of a stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fields {
    entries: Vec<(String, FieldValue)>,
}

impl Fields {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, value)` header pairs in message order.
    ///
    /// Repeated names collapse into one [`FieldValue::Many`] at the position
    /// of their first occurrence.
    pub fn from_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut fields = Self::new();
        for (name, value) in headers {
            fields.append(name.as_ref(), value.into());
        }
        fields
    }

    /// Add one more occurrence of `name`.
    pub fn append(&mut self, name: &str, value: String) {
        let name = name.to_ascii_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => existing.push(value),
            None => self.entries.push((name, FieldValue::One(value))),
        }
    }

    /// Replace the whole value of `name`, keeping its position if present.
    pub fn replace(&mut self, name: &str, value: FieldValue) {
        let name = name.to_ascii_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        let pos = self
            .entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(pos).1)
    }

    /// Look up a field (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// First occurrence of a field (case-insensitive).
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).map(FieldValue::first)
    }

    /// Iterate fields in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of distinct field names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Absolute byte positions of one part inside the backing store, plus the
/// line counts the structural parser reports alongside them.
///
/// Nothing guarantees `start <= end`; reads over an inverted range are empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offsets {
    pub part_start: u64,
    pub part_end: u64,
    pub header_start: u64,
    pub header_end: u64,
    pub body_start: u64,
    pub body_end: u64,
    pub line_count: u64,
    pub body_line_count: u64,
}

/// One node of the structural tree, as delivered by the structural parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartNode {
    /// Path-like identifier: `"1"`, `"1.2"`, `"1.2.1"`.
    pub id: String,
    /// Raw header fields.
    pub fields: Fields,
    /// Byte positions in the backing store.
    pub offsets: Offsets,
    /// Lower-cased `type/subtype`.
    pub content_type: Option<String>,
    /// Lower-cased disposition type (`inline`, `attachment`).
    pub content_disposition: Option<String>,
    /// `filename` parameter of `Content-Disposition`.
    pub disposition_filename: Option<String>,
    /// `name` parameter of `Content-Type`.
    pub content_name: Option<String>,
    /// `Content-ID` without angle brackets.
    pub content_id: Option<String>,
    /// `charset` parameter of `Content-Type`.
    pub charset: Option<String>,
    /// Lower-cased `Content-Transfer-Encoding`.
    pub transfer_encoding: Option<String>,
}

impl PartNode {
    /// A node with only an id, fields and offsets; convenience fields empty.
    pub fn new(id: impl Into<String>, fields: Fields, offsets: Offsets) -> Self {
        Self {
            id: id.into(),
            fields,
            offsets,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_headers_keep_order() {
        let fields = Fields::from_headers([
            ("received", "by a"),
            ("subject", "hi"),
            ("Received", "by b"),
        ]);
        assert_eq!(fields.len(), 2);
        assert_eq!(
            fields.get("received"),
            Some(&FieldValue::Many(vec!["by a".into(), "by b".into()]))
        );
        assert_eq!(fields.first("RECEIVED"), Some("by a"));
        let names: Vec<&str> = fields.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["received", "subject"]);
    }

    #[test]
    fn test_replace_is_whole_value() {
        let mut fields = Fields::from_headers([("to", "a@x"), ("to", "b@x"), ("cc", "c@x")]);
        let mut copy = fields.get("to").cloned().unwrap();
        if let FieldValue::Many(values) = &mut copy {
            values.retain(|v| v != "a@x");
        }
        // The stored value is untouched until written back.
        assert_eq!(fields.first("to"), Some("a@x"));
        fields.replace("To", copy);
        assert_eq!(fields.get("to").unwrap().all(), ["b@x"]);
        let names: Vec<&str> = fields.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["to", "cc"]);
    }

    #[test]
    fn test_remove_and_missing() {
        let mut fields = Fields::from_headers([("subject", "hi")]);
        assert_eq!(fields.remove("Subject"), Some(FieldValue::One("hi".into())));
        assert!(fields.is_empty());
        assert_eq!(fields.first("subject"), None);
    }

    #[test]
    fn test_field_value_serializes_untagged() {
        let json = serde_json::to_string(&FieldValue::from(vec!["a".to_string(), "b".to_string()]))
            .unwrap();
        assert_eq!(json, r#"["a","b"]"#);
        assert_eq!(serde_json::to_string(&FieldValue::from("x")).unwrap(), r#""x""#);
    }
}
