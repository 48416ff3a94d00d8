//! Reference bookkeeping for back-references and cycles.
//!
//! Both directions use the arena-and-index model: values are addressed by
//! a zero-based serialized id assigned in encounter order, and the two
//! sides reproduce the same numbering independently.

use std::collections::{HashMap, HashSet};

use crate::jstypes::JsValue;

/// A zero-based id assigned to each reference-eligible value in encounter
/// order.
pub type SerializedId = u32;

/// The decoder's append-only id → value table.
///
/// Composite placeholders are recorded before their children decode, which
/// is what lets a child resolve a back-reference into its own ancestor.
/// [`ReferenceTable::reserve`] + [`ReferenceTable::bind`] split the two
/// steps for values that cannot be placeheld (host objects).
#[derive(Debug, Default)]
pub struct ReferenceTable {
    slots: Vec<Option<JsValue>>,
}

impl ReferenceTable {
    pub fn new() -> ReferenceTable {
        ReferenceTable::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Records a value, assigning it the next id.
    pub fn record(&mut self, value: JsValue) -> SerializedId {
        let id = self.slots.len() as SerializedId;
        self.slots.push(Some(value));
        id
    }

    /// Allocates the next id with no value bound yet.
    pub fn reserve(&mut self) -> SerializedId {
        let id = self.slots.len() as SerializedId;
        self.slots.push(None);
        id
    }

    /// Binds a reserved id to its value.
    pub fn bind(&mut self, id: SerializedId, value: JsValue) {
        let slot = &mut self.slots[id as usize];
        debug_assert!(slot.is_none(), "id {id} bound twice");
        *slot = Some(value);
    }

    /// The value bound to `id`, or `None` when the id is out of range or
    /// still unbound (both mean corrupt input to the caller).
    pub fn get(&self, id: SerializedId) -> Option<&JsValue> {
        self.slots.get(id as usize).and_then(|slot| slot.as_ref())
    }
}

/// The encoder's identity → id map.
///
/// Keys are heap addresses of the `Rc`-backed values; a clone of every
/// recorded value is kept alive here so an address can never be reused by
/// a different object while the map lives.
#[derive(Debug, Default)]
pub struct IdentityMap {
    ids: HashMap<usize, SerializedId>,
    keepalive: Vec<JsValue>,
    blocked: HashSet<SerializedId>,
}

impl IdentityMap {
    pub fn new() -> IdentityMap {
        IdentityMap::default()
    }

    /// The id previously assigned to this value, by identity.
    pub fn get(&self, value: &JsValue) -> Option<SerializedId> {
        value.identity().and_then(|ptr| self.ids.get(&ptr).copied())
    }

    /// Assigns the next id to a not-yet-seen identity-eligible value.
    pub fn insert(&mut self, value: &JsValue) -> SerializedId {
        let ptr = value
            .identity()
            .expect("only identity-eligible values get ids");
        let id = self.keepalive.len() as SerializedId;
        debug_assert!(!self.ids.contains_key(&ptr), "value inserted twice");
        self.ids.insert(ptr, id);
        self.keepalive.push(value.clone());
        id
    }

    pub fn len(&self) -> usize {
        self.keepalive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keepalive.is_empty()
    }

    /// Marks an id as unreferenceable; a back-reference to it is an
    /// illegal cycle until unblocked. Used while writing an error cause
    /// without the circular-cause feature.
    pub fn block(&mut self, id: SerializedId) {
        self.blocked.insert(id);
    }

    pub fn unblock(&mut self, id: SerializedId) {
        self.blocked.remove(&id);
    }

    pub fn is_blocked(&self, id: SerializedId) -> bool {
        self.blocked.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jstypes::JsObject;

    #[test]
    fn record_assigns_sequential_ids() {
        let mut table = ReferenceTable::new();
        let a = table.record(JsValue::object(JsObject::new()));
        let b = table.record(JsValue::Null);
        assert_eq!((a, b), (0, 1));
        assert!(table.get(0).is_some());
        assert!(table.get(2).is_none());
    }

    #[test]
    fn reserve_then_bind() {
        let mut table = ReferenceTable::new();
        let id = table.reserve();
        assert!(table.get(id).is_none());
        table.bind(id, JsValue::from("x"));
        assert!(table.get(id).is_some());
    }

    #[test]
    fn identity_map_finds_clones_only() {
        let mut map = IdentityMap::new();
        let a = JsValue::object(JsObject::new());
        let id = map.insert(&a);
        assert_eq!(map.get(&a.clone()), Some(id));
        assert_eq!(map.get(&JsValue::object(JsObject::new())), None);
        assert_eq!(map.get(&JsValue::from("s")), None);
    }

    #[test]
    fn keepalive_prevents_address_reuse() {
        let mut map = IdentityMap::new();
        for _ in 0..64 {
            // Each temporary would be freed without the keepalive clone,
            // letting the allocator hand the address to the next one.
            let value = JsValue::object(JsObject::new());
            map.insert(&value);
        }
        assert_eq!(map.len(), 64);
    }

    #[test]
    fn blocking() {
        let mut map = IdentityMap::new();
        let a = JsValue::object(JsObject::new());
        let id = map.insert(&a);
        map.block(id);
        assert!(map.is_blocked(id));
        map.unblock(id);
        assert!(!map.is_blocked(id));
    }
}
