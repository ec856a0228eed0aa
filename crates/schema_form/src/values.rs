//! Form runtime values and validation messages.
//!
//! The canonical value store belongs to the caller; the engine only reads
//! through [`ValueStore`] and asks it to write. [`FormState`] is the in-memory
//! store used by tests and simple callers:
//!   * `values`: a JSON object tree addressed by [`FieldPath`]s
//!   * `errors`: per-field messages plus form-level messages
//!
//! Typical usage:
//! ```ignore
//! let mut state = FormState::default();
//! state.set_value(&FieldPath::parse("steps[0].gap")?, json!(0));
//! assert_eq!(state.get(&FieldPath::parse("steps")?).map(|v| v.is_array()), Some(true));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::key_path::{FieldPath, Segment};

/// Read/write access to the caller's value tree.
pub trait ValueStore {
    fn get(&self, path: &FieldPath) -> Option<&JsonValue>;

    /// Write `value` at `path`, creating intermediate objects / arrays.
    fn set_value(&mut self, path: &FieldPath, value: JsonValue);

    /// Remove the value at `path`. Array elements shift down.
    fn remove(&mut self, path: &FieldPath) -> Option<JsonValue>;
}

/// JSON object tree of field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(JsonValue);

impl Default for FormValues {
    fn default() -> Self {
        FormValues(JsonValue::Object(JsonMap::new()))
    }
}

impl FormValues {
    /// Wrap a JSON value; anything but an object starts an empty tree.
    pub fn new(root: JsonValue) -> Self {
        match root {
            JsonValue::Object(_) => FormValues(root),
            _ => FormValues::default(),
        }
    }

    pub fn as_json(&self) -> &JsonValue {
        &self.0
    }

    pub fn into_json(self) -> JsonValue {
        self.0
    }

    fn slot_mut(&mut self, path: &FieldPath) -> &mut JsonValue {
        let mut cur = &mut self.0;
        for seg in path.segments() {
            cur = match seg {
                Segment::Key(key) => {
                    if !cur.is_object() {
                        *cur = JsonValue::Object(JsonMap::new());
                    }
                    &mut cur[key.as_str()]
                }
                Segment::Index(index) => {
                    if !cur.is_array() {
                        *cur = JsonValue::Array(Vec::new());
                    }
                    if let JsonValue::Array(items) = &mut *cur {
                        if items.len() <= *index {
                            items.resize(index + 1, JsonValue::Null);
                        }
                    }
                    &mut cur[*index]
                }
            };
        }
        cur
    }
}

impl ValueStore for FormValues {
    fn get(&self, path: &FieldPath) -> Option<&JsonValue> {
        path.segments()
            .iter()
            .try_fold(&self.0, |cur, seg| match seg {
                Segment::Key(key) => cur.get(key.as_str()),
                Segment::Index(index) => cur.get(*index),
            })
    }

    fn set_value(&mut self, path: &FieldPath, value: JsonValue) {
        *self.slot_mut(path) = value;
    }

    fn remove(&mut self, path: &FieldPath) -> Option<JsonValue> {
        let (last, parent) = path.segments().split_last()?;
        let mut cur = &mut self.0;
        for seg in parent {
            cur = match seg {
                Segment::Key(key) => cur.get_mut(key.as_str())?,
                Segment::Index(index) => cur.get_mut(*index)?,
            };
        }
        match (last, cur) {
            (Segment::Key(key), JsonValue::Object(map)) => map.remove(key),
            (Segment::Index(index), JsonValue::Array(items)) if *index < items.len() => {
                Some(items.remove(*index))
            }
            _ => None,
        }
    }
}

/// Validation messages keyed by field path, plus form-level messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormErrors {
    fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    global: Vec<String>,
}

impl FormErrors {
    pub fn insert(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.fields.insert(path.into(), message.into());
    }

    pub fn push_global(&mut self, message: impl Into<String>) {
        self.global.push(message.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.fields.get(path).map(String::as_str)
    }

    pub fn global(&self) -> &[String] {
        &self.global
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len() + self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.global.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.global.clear();
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormErrors {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut errors = FormErrors::default();
        for (path, message) in iter {
            errors.insert(path, message);
        }
        errors
    }
}

/// Values and validation messages of one form being edited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub values: FormValues,
    pub errors: FormErrors,
}

impl FormState {
    pub fn new(values: FormValues) -> Self {
        Self {
            values,
            errors: FormErrors::default(),
        }
    }

    /// Clear all validation artifacts (field + global).
    pub fn clear_validation(&mut self) {
        self.errors.clear();
    }
}

impl ValueStore for FormState {
    fn get(&self, path: &FieldPath) -> Option<&JsonValue> {
        self.values.get(path)
    }

    fn set_value(&mut self, path: &FieldPath, value: JsonValue) {
        self.values.set_value(path, value);
    }

    fn remove(&mut self, path: &FieldPath) -> Option<JsonValue> {
        self.values.remove(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    #[test]
    fn set_creates_intermediate_containers() {
        let mut values = FormValues::default();
        values.set_value(&path("exitStrategy.steps[1].gap"), json!(15));
        assert_eq!(
            values.as_json(),
            &json!({ "exitStrategy": { "steps": [null, { "gap": 15 }] } })
        );
        assert_eq!(values.get(&path("exitStrategy.steps[1].gap")), Some(&json!(15)));
        assert_eq!(values.get(&path("exitStrategy.steps[3]")), None);
    }

    #[test]
    fn remove_shifts_array_elements() {
        let mut values = FormValues::new(json!({
            "steps": [{ "gap": 0 }, { "gap": 5 }, { "gap": 10 }]
        }));
        assert_eq!(values.remove(&path("steps[1]")), Some(json!({ "gap": 5 })));
        assert_eq!(values.get(&path("steps[1].gap")), Some(&json!(10)));
        assert_eq!(values.remove(&path("steps[7]")), None);
        assert_eq!(values.remove(&path("missing.key")), None);
    }

    #[test]
    fn non_object_root_starts_empty() {
        assert_eq!(FormValues::new(json!([1, 2])), FormValues::default());
    }

    #[test]
    fn errors_collect_and_clear() {
        let mut state = FormState::default();
        state.errors = FormErrors::from_iter([("a.b", "Required")]);
        state.errors.push_global("Form is incomplete");
        assert_eq!(state.errors.get("a.b"), Some("Required"));
        assert_eq!(state.errors.len(), 2);
        state.clear_validation();
        assert!(state.errors.is_empty());
    }
}
