//! Equality predicates over [`JsValue`].
//!
//! `same_value_zero` is the Map/Set key predicate. `value_eq` is a deep
//! structural comparison (used heavily by tests) that tolerates cyclic
//! graphs and treats shared structure by identity.

use std::collections::HashSet;

use crate::jstypes::value::JsValue;

/// JavaScript's SameValueZero: `NaN` equals `NaN`, `+0` equals `-0`,
/// primitives by value, everything else by object identity.
pub fn same_value_zero(a: &JsValue, b: &JsValue) -> bool {
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        // Bool and number never compare equal across types; both operands
        // are numbers here.
        return (x.is_nan() && y.is_nan()) || x == y;
    }
    match (a, b) {
        (JsValue::Undefined, JsValue::Undefined)
        | (JsValue::Null, JsValue::Null)
        | (JsValue::Hole, JsValue::Hole) => true,
        (JsValue::Bool(x), JsValue::Bool(y)) => x == y,
        (JsValue::BigInt(x), JsValue::BigInt(y)) => x == y,
        (JsValue::String(x), JsValue::String(y)) => x == y,
        _ => a.same_object(b),
    }
}

/// Deep structural equality over value graphs.
///
/// Numbers compare across their three representations (`1i32` equals
/// `1.0`), `NaN` equals `NaN`, holes stay distinct from `undefined`, and a
/// pair of composites already under comparison is assumed equal, which
/// terminates cycles.
pub fn value_eq(a: &JsValue, b: &JsValue) -> bool {
    let mut in_progress = HashSet::new();
    eq_inner(a, b, &mut in_progress)
}

fn eq_inner(a: &JsValue, b: &JsValue, in_progress: &mut HashSet<(usize, usize)>) -> bool {
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return (x.is_nan() && y.is_nan()) || x == y;
    }
    if let (Some(x), Some(y)) = (a.identity(), b.identity()) {
        if x == y {
            return true;
        }
        if !in_progress.insert((x, y)) {
            // Already comparing this pair further up the stack.
            return true;
        }
        let result = eq_composite(a, b, in_progress);
        in_progress.remove(&(x, y));
        return result;
    }
    match (a, b) {
        (JsValue::Undefined, JsValue::Undefined)
        | (JsValue::Null, JsValue::Null)
        | (JsValue::Hole, JsValue::Hole) => true,
        (JsValue::Bool(x), JsValue::Bool(y)) => x == y,
        (JsValue::BigInt(x), JsValue::BigInt(y)) => x == y,
        (JsValue::String(x), JsValue::String(y)) => x == y,
        _ => false,
    }
}

fn eq_composite(a: &JsValue, b: &JsValue, in_progress: &mut HashSet<(usize, usize)>) -> bool {
    match (a, b) {
        (JsValue::Date(x), JsValue::Date(y)) => {
            let (x, y) = (x.epoch_ms(), y.epoch_ms());
            (x.is_nan() && y.is_nan()) || x == y
        }
        (JsValue::RegExp(x), JsValue::RegExp(y)) => {
            x.source() == y.source() && x.flags().canonical() == y.flags().canonical()
        }
        (JsValue::Object(x), JsValue::Object(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.entries()
                    .zip(y.entries())
                    .all(|((ka, va), (kb, vb))| ka == kb && eq_inner(va, vb, in_progress))
        }
        (JsValue::Array(x), JsValue::Array(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.length() == y.length()
                && x.element_count() == y.element_count()
                && x.elements()
                    .zip(y.elements())
                    .all(|((ia, va), (ib, vb))| ia == ib && eq_inner(va, vb, in_progress))
                && x.property_count() == y.property_count()
                && x.properties()
                    .zip(y.properties())
                    .all(|((ka, va), (kb, vb))| ka == kb && eq_inner(va, vb, in_progress))
        }
        (JsValue::Map(x), JsValue::Map(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.entries().zip(y.entries()).all(|((ka, va), (kb, vb))| {
                    eq_inner(ka, kb, in_progress) && eq_inner(va, vb, in_progress)
                })
        }
        (JsValue::Set(x), JsValue::Set(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.values()
                    .zip(y.values())
                    .all(|(va, vb)| eq_inner(va, vb, in_progress))
        }
        (JsValue::ArrayBuffer(x), JsValue::ArrayBuffer(y)) => *x.borrow() == *y.borrow(),
        (JsValue::SharedArrayBuffer(x), JsValue::SharedArrayBuffer(y)) => x == y,
        (JsValue::ArrayBufferTransfer(x), JsValue::ArrayBufferTransfer(y)) => x == y,
        (JsValue::ArrayBufferView(x), JsValue::ArrayBufferView(y)) => {
            x.kind() == y.kind()
                && x.byte_offset() == y.byte_offset()
                && x.byte_length() == y.byte_length()
                && eq_inner(x.backing(), y.backing(), in_progress)
        }
        (JsValue::Error(x), JsValue::Error(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.name == y.name
                && x.message == y.message
                && x.stack == y.stack
                && match (&x.cause, &y.cause) {
                    (None, None) => true,
                    (Some(ca), Some(cb)) => eq_inner(ca, cb, in_progress),
                    _ => false,
                }
        }
        (JsValue::PrimitiveObject(x), JsValue::PrimitiveObject(y)) => x == y,
        (JsValue::HostObject(x), JsValue::HostObject(y)) => x == y,
        (JsValue::SharedObject(x), JsValue::SharedObject(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jstypes::{JsArray, JsObject};

    #[test]
    fn numbers_compare_across_representations() {
        assert!(value_eq(&JsValue::Int32(1), &JsValue::Double(1.0)));
        assert!(value_eq(&JsValue::Uint32(7), &JsValue::Int32(7)));
        assert!(value_eq(
            &JsValue::Double(f64::NAN),
            &JsValue::Double(f64::NAN)
        ));
        assert!(!value_eq(&JsValue::Int32(1), &JsValue::Bool(true)));
    }

    #[test]
    fn hole_is_not_undefined() {
        assert!(!value_eq(&JsValue::Hole, &JsValue::Undefined));
        assert!(!same_value_zero(&JsValue::Hole, &JsValue::Undefined));
    }

    #[test]
    fn cyclic_graphs_compare_without_looping() {
        let make = || {
            let obj = JsValue::object(JsObject::new());
            if let JsValue::Object(rc) = &obj {
                rc.borrow_mut().insert("me", obj.clone());
            }
            obj
        };
        assert!(value_eq(&make(), &make()));
    }

    #[test]
    fn arrays_compare_holes_positionally() {
        let mut a = JsArray::with_length(3);
        a.set(1, 5i32);
        let mut b = JsArray::with_length(3);
        b.set(1, 5i32);
        let mut c = JsArray::with_length(3);
        c.set(2, 5i32);
        assert!(value_eq(&JsValue::array(a.clone()), &JsValue::array(b)));
        assert!(!value_eq(&JsValue::array(a), &JsValue::array(c)));
    }
}
