//! Insertion-ordered JavaScript Map with SameValueZero keys.

use crate::jstypes::equality::same_value_zero;
use crate::jstypes::value::JsValue;

/// A JavaScript Map.
///
/// Entries keep insertion order. Key equality is SameValueZero: `NaN`
/// equals `NaN`, `+0` equals `-0`, and composite keys compare by
/// reference identity. Writing to an existing key replaces the value but
/// keeps the key's original position.
#[derive(Debug, Clone, Default)]
pub struct JsMap {
    entries: Vec<(JsValue, JsValue)>,
}

impl JsMap {
    pub fn new() -> JsMap {
        JsMap::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<JsValue>, value: impl Into<JsValue>) {
        let key = key.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| same_value_zero(k, &key))
        {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &JsValue) -> Option<&JsValue> {
        self.entries
            .iter()
            .find(|(k, _)| same_value_zero(k, key))
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &JsValue) -> bool {
        self.get(key).is_some()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&JsValue, &JsValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl FromIterator<(JsValue, JsValue)> for JsMap {
    fn from_iter<T: IntoIterator<Item = (JsValue, JsValue)>>(iter: T) -> JsMap {
        let mut map = JsMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_keeps_first_position_and_last_value() {
        let mut map = JsMap::new();
        map.insert("a", 1i32);
        map.insert("b", 2i32);
        map.insert("a", 3i32);
        let keys: Vec<String> = map
            .entries()
            .map(|(k, _)| match k {
                JsValue::String(s) => s.to_string(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(keys, ["a", "b"]);
        assert!(matches!(
            map.get(&JsValue::from("a")),
            Some(JsValue::Int32(3))
        ));
    }

    #[test]
    fn nan_is_a_single_key() {
        let mut map = JsMap::new();
        map.insert(f64::NAN, 1i32);
        map.insert(f64::NAN, 2i32);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&JsValue::Double(f64::NAN)));
    }

    #[test]
    fn positive_and_negative_zero_collide() {
        let mut map = JsMap::new();
        map.insert(0.0f64, 1i32);
        map.insert(-0.0f64, 2i32);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn composite_keys_use_identity() {
        let a = JsValue::object(crate::jstypes::JsObject::new());
        let b = JsValue::object(crate::jstypes::JsObject::new());
        let mut map = JsMap::new();
        map.insert(a.clone(), 1i32);
        map.insert(b.clone(), 2i32);
        assert_eq!(map.len(), 2);
        assert!(matches!(map.get(&a), Some(JsValue::Int32(1))));
        assert!(matches!(map.get(&b), Some(JsValue::Int32(2))));
    }
}
