//! Ordered-insertion JavaScript objects and their property keys.

use std::fmt;

use crate::constants::MAX_ARRAY_LENGTH;
use crate::jstypes::string::JsString;
use crate::jstypes::value::JsValue;

/// A JavaScript property key: either a 32-bit array index or a string
/// name.
///
/// Integer-looking strings are normalised to indexes exactly per the
/// integer-index rule: the canonical base-10 spelling (no leading zeros, no
/// sign) of a value below 2**32 - 1. Everything else stays a string, so
/// `"-0"`, `"01"` and `"4294967295"` are string keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Index(u32),
    String(JsString),
}

impl PropertyKey {
    /// Normalises a string key, turning canonical numeric spellings into
    /// indexes.
    pub fn from_name(name: &str) -> PropertyKey {
        match canonical_numeric_index(name) {
            Some(index) => PropertyKey::Index(index),
            None => PropertyKey::String(JsString::new(name)),
        }
    }

    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyKey::Index(i) => Some(*i),
            PropertyKey::String(_) => None,
        }
    }
}

/// The index denoted by `value` if it is a canonical numeric index string.
///
/// Leading zeros disqualify (`"01"`), as do signs, and the value must be
/// below 2**32 - 1 (the maximum array index).
pub fn canonical_numeric_index(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if value.len() > 1 && value.starts_with('0') {
        return None;
    }
    let parsed: u64 = value.parse().ok()?;
    if parsed < MAX_ARRAY_LENGTH {
        Some(parsed as u32)
    } else {
        None
    }
}

impl From<u32> for PropertyKey {
    fn from(index: u32) -> PropertyKey {
        if u64::from(index) < MAX_ARRAY_LENGTH {
            PropertyKey::Index(index)
        } else {
            PropertyKey::String(JsString::new(index.to_string()))
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> PropertyKey {
        PropertyKey::from_name(name)
    }
}

impl From<JsString> for PropertyKey {
    fn from(name: JsString) -> PropertyKey {
        match canonical_numeric_index(name.as_str()) {
            Some(index) => PropertyKey::Index(index),
            None => PropertyKey::String(name),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Index(i) => write!(f, "{i}"),
            PropertyKey::String(s) => f.write_str(s.as_str()),
        }
    }
}

/// A plain JavaScript object: an insertion-ordered mapping from property
/// keys to values.
///
/// Insertion order is observable and preserved on round-trip. Writing to an
/// existing key replaces its value without moving the key.
#[derive(Debug, Clone, Default)]
pub struct JsObject {
    properties: Vec<(PropertyKey, JsValue)>,
}

impl JsObject {
    pub fn new() -> JsObject {
        JsObject::default()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Inserts or replaces a property, keeping the key's original position
    /// when it already exists.
    pub fn insert(&mut self, key: impl Into<PropertyKey>, value: impl Into<JsValue>) {
        let key = key.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((key, value)),
        }
    }

    pub fn get(&self, key: &PropertyKey) -> Option<&JsValue> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Looks a property up by name, applying key normalisation.
    pub fn get_named(&self, name: &str) -> Option<&JsValue> {
        self.get(&PropertyKey::from_name(name))
    }

    /// Properties in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&PropertyKey, &JsValue)> {
        self.properties.iter().map(|(k, v)| (k, v))
    }
}

impl FromIterator<(PropertyKey, JsValue)> for JsObject {
    fn from_iter<T: IntoIterator<Item = (PropertyKey, JsValue)>>(iter: T) -> JsObject {
        let mut obj = JsObject::new();
        for (k, v) in iter {
            obj.insert(k, v);
        }
        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_numeric_keys_become_indexes() {
        assert_eq!(PropertyKey::from_name("3"), PropertyKey::Index(3));
        assert_eq!(PropertyKey::from_name("0"), PropertyKey::Index(0));
        assert_eq!(
            PropertyKey::from_name("4294967294"),
            PropertyKey::Index(4294967294)
        );
    }

    #[test]
    fn non_canonical_spellings_stay_strings() {
        for name in ["A", "-3", "-0", "01", "1.5", "4294967295", ""] {
            assert!(
                matches!(PropertyKey::from_name(name), PropertyKey::String(_)),
                "{name:?} must stay a string key"
            );
        }
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut obj = JsObject::new();
        obj.insert("z", 1i32);
        obj.insert("a", 2i32);
        obj.insert(0u32, 3i32);
        let keys: Vec<String> = obj.entries().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, ["z", "a", "0"]);
    }

    #[test]
    fn upsert_keeps_position() {
        let mut obj = JsObject::new();
        obj.insert("a", 1i32);
        obj.insert("b", 2i32);
        obj.insert("a", 3i32);
        let keys: Vec<String> = obj.entries().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, ["a", "b"]);
        assert!(matches!(obj.get_named("a"), Some(JsValue::Int32(3))));
    }

    #[test]
    fn string_and_index_forms_are_the_same_key() {
        let mut obj = JsObject::new();
        obj.insert("7", 1i32);
        obj.insert(7u32, 2i32);
        assert_eq!(obj.len(), 1);
        assert!(matches!(obj.get(&PropertyKey::Index(7)), Some(JsValue::Int32(2))));
    }
}
