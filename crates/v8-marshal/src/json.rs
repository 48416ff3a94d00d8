//! Lossy conversions between [`JsValue`] and `serde_json::Value`, for
//! diagnostics and interop with JSON-speaking code.
//!
//! JavaScript-only shapes degrade predictably: holes, `undefined` and
//! engine handles become `null`, binary data becomes a base64 data URI,
//! maps become objects when their keys stringify, and a cyclic back edge
//! becomes `null` rather than recursing forever.

use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value as JsonValue;

use crate::jstypes::{JsArray, JsObject, JsPrimitiveObject, JsValue};

/// Converts a value graph to JSON.
pub fn to_json(value: &JsValue) -> JsonValue {
    let mut on_stack = HashSet::new();
    json_inner(value, &mut on_stack)
}

fn json_inner(value: &JsValue, on_stack: &mut HashSet<usize>) -> JsonValue {
    if let Some(ptr) = value.identity() {
        if !on_stack.insert(ptr) {
            // Back edge of a cycle.
            return JsonValue::Null;
        }
        let result = json_composite(value, on_stack);
        on_stack.remove(&ptr);
        return result;
    }
    match value {
        JsValue::Undefined | JsValue::Null | JsValue::Hole => JsonValue::Null,
        JsValue::Bool(b) => JsonValue::Bool(*b),
        JsValue::Int32(v) => JsonValue::from(*v),
        JsValue::Uint32(v) => JsonValue::from(*v),
        JsValue::Double(v) => serde_json::Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        JsValue::BigInt(v) => match v.to_i128() {
            Some(n) if i64::try_from(n).is_ok() => JsonValue::from(n as i64),
            Some(n) => JsonValue::String(n.to_string()),
            None => JsonValue::String(v.to_string()),
        },
        JsValue::String(s) => JsonValue::String(s.to_string()),
        _ => unreachable!("identity values handled above"),
    }
}

fn json_composite(value: &JsValue, on_stack: &mut HashSet<usize>) -> JsonValue {
    match value {
        JsValue::Date(d) => serde_json::Number::from_f64(d.epoch_ms())
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        JsValue::RegExp(r) => JsonValue::String(r.to_string()),
        JsValue::Object(o) => {
            let mut out = serde_json::Map::new();
            for (key, value) in o.borrow().entries() {
                out.insert(key.to_string(), json_inner(value, on_stack));
            }
            JsonValue::Object(out)
        }
        JsValue::Array(a) => {
            let a = a.borrow();
            let mut out = Vec::with_capacity(a.length() as usize);
            for index in 0..a.length() {
                out.push(match a.get(index) {
                    Some(value) => json_inner(value, on_stack),
                    None => JsonValue::Null,
                });
            }
            JsonValue::Array(out)
        }
        JsValue::Map(m) => {
            let mut out = serde_json::Map::new();
            for (key, value) in m.borrow().entries() {
                let name = match key {
                    JsValue::String(s) => s.to_string(),
                    JsValue::Int32(v) => v.to_string(),
                    JsValue::Uint32(v) => v.to_string(),
                    JsValue::Double(v) => v.to_string(),
                    JsValue::Bool(v) => v.to_string(),
                    other => other.kind().to_string(),
                };
                out.insert(name, json_inner(value, on_stack));
            }
            JsonValue::Object(out)
        }
        JsValue::Set(s) => JsonValue::Array(
            s.borrow()
                .values()
                .map(|v| json_inner(v, on_stack))
                .collect(),
        ),
        JsValue::ArrayBuffer(b) => JsonValue::String(data_uri(b.borrow().data())),
        JsValue::ArrayBufferView(v) => match v.view_data() {
            Some(data) => JsonValue::String(data_uri(&data)),
            None => JsonValue::Null,
        },
        JsValue::Error(e) => {
            let e = e.borrow();
            let mut out = serde_json::Map::new();
            out.insert("name".into(), JsonValue::String(e.name.to_string()));
            if let Some(message) = &e.message {
                out.insert("message".into(), JsonValue::String(message.clone()));
            }
            if let Some(stack) = &e.stack {
                out.insert("stack".into(), JsonValue::String(stack.clone()));
            }
            if let Some(cause) = &e.cause {
                out.insert("cause".into(), json_inner(cause, on_stack));
            }
            JsonValue::Object(out)
        }
        JsValue::PrimitiveObject(p) => match &**p {
            JsPrimitiveObject::True => JsonValue::Bool(true),
            JsPrimitiveObject::False => JsonValue::Bool(false),
            JsPrimitiveObject::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            JsPrimitiveObject::BigInt(b) => json_inner(&JsValue::BigInt(b.clone()), on_stack),
            JsPrimitiveObject::String(s) => JsonValue::String(s.to_string()),
        },
        JsValue::SharedArrayBuffer(_)
        | JsValue::ArrayBufferTransfer(_)
        | JsValue::HostObject(_)
        | JsValue::SharedObject(_) => JsonValue::Null,
        _ => unreachable!("non-identity values handled by the caller"),
    }
}

fn data_uri(data: &[u8]) -> String {
    format!(
        "data:application/octet-stream;base64,{}",
        BASE64.encode(data)
    )
}

/// Converts JSON to a value graph: objects become [`JsObject`]s, arrays
/// dense [`JsArray`]s, and numbers the narrowest wire representation.
pub fn from_json(value: &JsonValue) -> JsValue {
    match value {
        JsonValue::Null => JsValue::Null,
        JsonValue::Bool(b) => JsValue::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsValue::from(i)
            } else if let Some(u) = n.as_u64() {
                JsValue::Double(u as f64)
            } else {
                JsValue::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => JsValue::from(s.as_str()),
        JsonValue::Array(items) => {
            JsValue::array(items.iter().map(from_json).collect::<JsArray>())
        }
        JsonValue::Object(entries) => {
            let mut obj = JsObject::new();
            for (key, value) in entries {
                obj.insert(key.as_str(), from_json(value));
            }
            JsValue::object(obj)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_round_trip() {
        for case in [json!(null), json!(true), json!(42), json!(-7), json!(1.5), json!("x")] {
            assert_eq!(to_json(&from_json(&case)), case);
        }
    }

    #[test]
    fn containers_round_trip() {
        let case = json!({"a": [1, 2, {"b": null}], "c": "s"});
        assert_eq!(to_json(&from_json(&case)), case);
    }

    #[test]
    fn undefined_and_holes_become_null() {
        let mut array = JsArray::with_length(3);
        array.set(1, JsValue::Undefined);
        assert_eq!(
            to_json(&JsValue::array(array)),
            json!([null, null, null])
        );
    }

    #[test]
    fn buffers_become_data_uris() {
        let value = JsValue::array_buffer(crate::jstypes::JsArrayBuffer::new(vec![1, 2, 3]));
        assert_eq!(
            to_json(&value),
            json!("data:application/octet-stream;base64,AQID")
        );
    }

    #[test]
    fn cycles_terminate() {
        let obj = JsValue::object(JsObject::new());
        if let JsValue::Object(rc) = &obj {
            rc.borrow_mut().insert("me", obj.clone());
        }
        assert_eq!(to_json(&obj), json!({"me": null}));
    }

    #[test]
    fn map_with_string_keys_becomes_object() {
        let mut map = crate::jstypes::JsMap::new();
        map.insert("k", 1i32);
        map.insert(2i32, 3i32);
        assert_eq!(to_json(&JsValue::map(map)), json!({"k": 1, "2": 3}));
    }
}
