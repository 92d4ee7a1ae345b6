use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cleaned value captured from one submitted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// True for values a user would consider "left empty".
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Bool(checked) => !checked,
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(true) => write!(f, "True"),
            FieldValue::Bool(false) => write!(f, "False"),
            FieldValue::Text(text) => write!(f, "{}", text),
            FieldValue::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

/// Field values keyed by machine name, in insertion order.
///
/// Stored on a submission as a JSON array of `[name, value]` pairs, so
/// decoding gives back the same keys, order and value types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(String, FieldValue)>", into = "Vec<(String, FieldValue)>")]
pub struct CapturedData(IndexMap<String, FieldValue>);

impl CapturedData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(raw)
    }
}

impl FromIterator<(String, FieldValue)> for CapturedData {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<(String, FieldValue)>> for CapturedData {
    fn from(pairs: Vec<(String, FieldValue)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<CapturedData> for Vec<(String, FieldValue)> {
    fn from(data: CapturedData) -> Self {
        data.0.into_iter().collect()
    }
}
