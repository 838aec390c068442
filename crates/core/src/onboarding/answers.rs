//! Collected consultation answers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field name to JSON value. Grouped steps nest one object under the group name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answers(Map<String, Value>);

impl Answers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a stored blob. Anything that is not a JSON object reads as empty.
    #[must_use]
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Self(map),
            _ => Self::default(),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Indented rendering for the review step.
    #[must_use]
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.to_json())
    }

    /// Look up `field` or a dotted `group.field` path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        match path.split_once('.') {
            Some((group, field)) => self.0.get(group)?.as_object()?.get(field),
            None => self.0.get(path),
        }
    }

    /// String answer at `path`; non-string values read as absent.
    #[must_use]
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Store `value` under `field` or a dotted `group.field` path.
    ///
    /// Writing into a group that currently holds a non-object replaces it
    /// with a fresh object.
    pub fn set(&mut self, path: &str, value: Value) {
        match path.split_once('.') {
            Some((group, field)) => {
                let entry = self
                    .0
                    .entry(group.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                if let Value::Object(map) = entry {
                    map.insert(field.to_string(), value);
                }
            }
            None => {
                self.0.insert(path.to_string(), value);
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}
