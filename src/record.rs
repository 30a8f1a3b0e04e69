//! Record types produced by the extraction pipeline.
//!
//! The model reply is free-form JSON whose shape depends on the document
//! kind, so [`RawRecord`] does not assume a schema: every field holds a
//! [`RawValue`], which is either a scalar or a nested group. Field order is
//! preserved exactly as the model emitted it because the report lists fields
//! in that order.

use crate::prompts::{INVALID_DOCUMENT_KEY, MISSING_FIELD_VALUE};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One value of a decoded model reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
    Null,
    List(Vec<RawValue>),
    /// Nested mapping, e.g. a subject → score table.
    Group(IndexMap<String, RawValue>),
}

impl RawValue {
    /// Text or number — the values a subject/score table is made of.
    pub fn is_primitive(&self) -> bool {
        matches!(self, RawValue::Text(_) | RawValue::Number(_))
    }

    pub fn as_group(&self) -> Option<&IndexMap<String, RawValue>> {
        match self {
            RawValue::Group(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) => f.write_str(s),
            RawValue::Number(n) => write!(f, "{n}"),
            RawValue::Flag(b) => write!(f, "{b}"),
            RawValue::Null => f.write_str(MISSING_FIELD_VALUE),
            RawValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            RawValue::Group(map) => {
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Number(n.into())
    }
}

impl<K: Into<String>> FromIterator<(K, RawValue)> for RawValue {
    fn from_iter<I: IntoIterator<Item = (K, RawValue)>>(iter: I) -> Self {
        RawValue::Group(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// The decoded reply of one extraction call: field name → value, in reply order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(IndexMap<String, RawValue>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: RawValue) {
        self.0.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RawValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The reason given by the model when the image was not a document of
    /// the requested kind.
    ///
    /// Only a record whose single field is the sentinel key counts; a real
    /// marksheet that happens to contain an `error` column is left alone.
    pub fn invalid_document_reason(&self) -> Option<String> {
        if self.0.len() != 1 {
            return None;
        }
        self.0.get(INVALID_DOCUMENT_KEY).map(|v| v.to_string())
    }
}

impl<K: Into<String>> FromIterator<(K, RawValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, RawValue)>>(iter: I) -> Self {
        RawRecord(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A [`RawRecord`] split into report-ready tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// `(field, value)` rows in reply order.
    pub main: Vec<(String, RawValue)>,
    /// `(subject, score)` rows, when the reply carried a subject table.
    pub subjects: Option<Vec<(String, RawValue)>>,
}

impl NormalizedRecord {
    /// Number of rows across both tables.
    pub fn field_count(&self) -> usize {
        self.main.len() + self.subjects.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoding_preserves_reply_order() {
        let record: RawRecord =
            serde_json::from_str(r#"{"Zeta": "z", "Alpha": 1, "Mid": {"b": 2, "a": 1}}"#)
                .expect("valid record");
        let keys: Vec<&str> = record.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["Zeta", "Alpha", "Mid"]);

        let inner: Vec<&str> = record
            .get("Mid")
            .and_then(RawValue::as_group)
            .expect("group")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(inner, vec!["b", "a"]);
    }

    #[test]
    fn decodes_every_value_shape() {
        let record: RawRecord = serde_json::from_str(
            r#"{"t": "x", "n": 91.5, "f": true, "z": null, "l": ["a", 2], "g": {"k": "v"}}"#,
        )
        .expect("valid record");
        assert!(matches!(record.get("t"), Some(RawValue::Text(_))));
        assert!(matches!(record.get("n"), Some(RawValue::Number(_))));
        assert!(matches!(record.get("f"), Some(RawValue::Flag(true))));
        assert!(matches!(record.get("z"), Some(RawValue::Null)));
        assert!(matches!(record.get("l"), Some(RawValue::List(_))));
        assert!(matches!(record.get("g"), Some(RawValue::Group(_))));
    }

    #[test]
    fn display_formats_scalars_and_groups() {
        assert_eq!(RawValue::from(90i64).to_string(), "90");
        assert_eq!(RawValue::Null.to_string(), "N/A");
        let list = RawValue::List(vec!["a".into(), 2i64.into()]);
        assert_eq!(list.to_string(), "a, 2");
        let group: RawValue = [("City", RawValue::from("Pune")), ("Pin", 411001i64.into())]
            .into_iter()
            .collect();
        assert_eq!(group.to_string(), "City: Pune; Pin: 411001");
    }

    #[test]
    fn sentinel_is_recognised_only_on_its_own() {
        let sentinel: RawRecord = [("error", RawValue::from("not a marksheet"))]
            .into_iter()
            .collect();
        assert_eq!(
            sentinel.invalid_document_reason().as_deref(),
            Some("not a marksheet")
        );

        let mixed: RawRecord = [
            ("error", RawValue::from("x")),
            ("Seat Number", RawValue::from("B123")),
        ]
        .into_iter()
        .collect();
        assert_eq!(mixed.invalid_document_reason(), None);
    }
}
