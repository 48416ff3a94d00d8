//! Round-trip coverage over the full value domain: every entity, shared
//! references, and cyclic graphs.

use v8_marshal::jstypes::{
    value_eq, JsArray, JsArrayBuffer, JsArrayBufferView, JsBigInt, JsError, JsMap, JsObject,
    JsPrimitiveObject, JsRegExp, JsSet, JsString, StringEncoding,
};
use v8_marshal::{
    decode, encode, ArrayBufferViewTag, Decoder, Encoder, JsErrorName, JsValue,
    RawHostObjectHandler, RegExpFlags, SerializationFeature, SharedBufferRegistry,
};

fn roundtrip(value: &JsValue) -> JsValue {
    decode(&encode(value).unwrap()).unwrap()
}

fn assert_roundtrip(value: &JsValue) {
    let back = roundtrip(value);
    assert!(
        value_eq(value, &back),
        "round-trip changed the value: {value:?} -> {back:?}"
    );
}

fn get_named(value: &JsValue, name: &str) -> JsValue {
    let JsValue::Object(obj) = value else {
        panic!("expected object, got {}", value.kind());
    };
    let obj = obj.borrow();
    obj.get_named(name)
        .unwrap_or_else(|| panic!("missing property {name}"))
        .clone()
}

#[test]
fn scalars_round_trip() {
    for value in [
        JsValue::Undefined,
        JsValue::Null,
        JsValue::Bool(true),
        JsValue::Bool(false),
        JsValue::Int32(i32::MIN),
        JsValue::Int32(-1),
        JsValue::Uint32(0),
        JsValue::Uint32(u32::MAX),
        JsValue::Double(6.02e23),
        JsValue::Double(f64::INFINITY),
        JsValue::Double(f64::NAN),
        JsValue::from("plain"),
        JsValue::from("пример"),
        JsValue::BigInt(JsBigInt::from_i64(-123_456_789_012_345)),
        JsValue::BigInt(JsBigInt::zero()),
        JsValue::date(1_700_000_000_000.0),
        JsValue::date(f64::NAN),
    ] {
        assert_roundtrip(&value);
    }
}

#[test]
fn negative_zero_keeps_its_sign_bit() {
    let back = roundtrip(&JsValue::Double(-0.0));
    let JsValue::Double(d) = back else {
        panic!("expected double");
    };
    assert_eq!(d.to_bits(), (-0.0f64).to_bits());
}

#[test]
fn string_wire_forms_round_trip() {
    for value in [
        JsValue::String(JsString::with_wire_form("latin", StringEncoding::OneByte)),
        JsValue::String(JsString::with_wire_form("wide 語", StringEncoding::TwoByte)),
        JsValue::String(JsString::with_wire_form("utf8 ✓", StringEncoding::Utf8)),
        JsValue::String(JsString::new("")),
    ] {
        assert_roundtrip(&value);
    }
}

#[test]
fn objects_preserve_insertion_order_and_key_normalisation() {
    let mut obj = JsObject::new();
    obj.insert("zeta", 1i32);
    obj.insert("10", 2i32);
    obj.insert("alpha", 3i32);
    obj.insert("-0", 4i32);
    let value = JsValue::object(obj);
    assert_roundtrip(&value);

    let back = roundtrip(&value);
    let JsValue::Object(back) = back else {
        panic!("expected object");
    };
    let keys: Vec<String> = back.borrow().entries().map(|(k, _)| k.to_string()).collect();
    assert_eq!(keys, ["zeta", "10", "alpha", "-0"]);
    assert!(back
        .borrow()
        .get(&v8_marshal::jstypes::PropertyKey::Index(10))
        .is_some());
}

#[test]
fn arrays_distinguish_holes_from_undefined() {
    let mut array = JsArray::with_length(4);
    array.set(1, JsValue::Undefined);
    array.set(2, "present");
    let value = JsValue::array(array);
    assert_roundtrip(&value);

    let JsValue::Array(back) = roundtrip(&value) else {
        panic!("expected array");
    };
    let back = back.borrow();
    assert_eq!(back.length(), 4);
    assert!(back.get(0).is_none());
    assert!(matches!(back.get(1), Some(JsValue::Undefined)));
    assert!(back.get(3).is_none());
}

#[test]
fn dense_array_with_string_properties() {
    let mut array: JsArray = [JsValue::Int32(1), JsValue::Int32(2)].into_iter().collect();
    array.insert_property("tag", "extra");
    let value = JsValue::array(array);
    assert_roundtrip(&value);

    let JsValue::Array(back) = roundtrip(&value) else {
        panic!("expected array");
    };
    assert_eq!(back.borrow().property_count(), 1);
}

#[test]
fn maps_and_sets_round_trip_with_same_value_zero() {
    let mut map = JsMap::new();
    map.insert(f64::NAN, "nan slot");
    map.insert("k", JsValue::Null);
    map.insert(7i32, JsValue::Bool(true));
    assert_roundtrip(&JsValue::map(map));

    let mut set = JsSet::new();
    set.insert(f64::NAN);
    set.insert(0.0f64);
    set.insert("x");
    assert_roundtrip(&JsValue::set(set));
}

#[test]
fn regexps_round_trip() {
    let value = JsValue::regexp(
        JsRegExp::new("a|b", RegExpFlags::GLOBAL | RegExpFlags::IGNORE_CASE).unwrap(),
    );
    assert_roundtrip(&value);
}

#[test]
fn errors_round_trip_with_fields() {
    let mut error = JsError::with_message(JsErrorName::RangeError, "out of range");
    error.stack = Some("at main".into());
    error.cause = Some(JsValue::from("root cause"));
    assert_roundtrip(&JsValue::error(error));

    // Unknown names have collapsed to Error before they ever reach here.
    assert_roundtrip(&JsValue::error(JsError::new(JsErrorName::Error)));
}

#[test]
fn primitive_objects_round_trip() {
    for wrapped in [
        JsPrimitiveObject::True,
        JsPrimitiveObject::False,
        JsPrimitiveObject::Number(2.5),
        JsPrimitiveObject::BigInt(JsBigInt::from_u64(u64::MAX)),
        JsPrimitiveObject::String(JsString::new("boxed")),
    ] {
        assert_roundtrip(&JsValue::primitive_object(wrapped));
    }
}

#[test]
fn buffers_and_views_round_trip() {
    let buffer = JsValue::array_buffer(JsArrayBuffer::new((0..16).collect()));
    assert_roundtrip(&buffer);

    let view = JsValue::view(
        JsArrayBufferView::new(buffer.clone(), ArrayBufferViewTag::Int32Array, 4, 8).unwrap(),
    );
    assert_roundtrip(&view);

    let JsValue::ArrayBufferView(back) = roundtrip(&view) else {
        panic!("expected view");
    };
    assert_eq!(back.kind(), ArrayBufferViewTag::Int32Array);
    assert_eq!(back.byte_offset(), 4);
    assert_eq!(back.byte_length(), Some(8));
    assert_eq!(back.view_data(), Some((4u8..12).collect::<Vec<u8>>()));
}

#[test]
fn resizable_buffer_and_length_tracking_view_round_trip() {
    let buffer = JsValue::array_buffer(JsArrayBuffer::resizable(vec![7u8; 8], 32).unwrap());
    let view = JsValue::view(
        JsArrayBufferView::length_tracking(buffer, ArrayBufferViewTag::Uint8Array, 0).unwrap(),
    );
    let bytes = Encoder::new()
        .with_feature(SerializationFeature::ResizableArrayBuffers)
        .encode(&view)
        .unwrap();
    let JsValue::ArrayBufferView(back) = decode(&bytes).unwrap() else {
        panic!("expected view");
    };
    assert!(back.is_length_tracking());
    assert!(back.is_backing_resizable());
    let JsValue::ArrayBuffer(backing) = back.backing() else {
        panic!("expected local backing buffer");
    };
    assert_eq!(backing.borrow().max_byte_length(), Some(32));
}

#[test]
fn shared_array_buffer_resolves_through_the_registry() {
    let mut registry = SharedBufferRegistry::new();
    let id = registry.register(vec![9u8; 4]);

    let value = JsValue::shared_array_buffer(id);
    let bytes = Encoder::new()
        .with_shared_buffers(&registry)
        .encode(&value)
        .unwrap();
    let back = Decoder::new()
        .with_shared_buffers(&registry)
        .decode(&bytes)
        .unwrap();
    let JsValue::SharedArrayBuffer(back) = back else {
        panic!("expected shared array buffer");
    };
    assert_eq!(back.buffer_id, id);
}

#[test]
fn array_buffer_transfer_round_trips_its_id() {
    let back = roundtrip(&JsValue::array_buffer_transfer(7));
    assert!(matches!(back, JsValue::ArrayBufferTransfer(t) if t.transfer_id == 7));
}

#[test]
fn shared_subobjects_keep_identity() {
    let shared = JsValue::object(JsObject::new());
    let mut array = JsArray::new();
    array.set(0, shared.clone());
    array.set(1, shared.clone());
    array.set(2, JsValue::object(JsObject::new()));

    let JsValue::Array(back) = roundtrip(&JsValue::array(array)) else {
        panic!("expected array");
    };
    let back = back.borrow();
    assert!(back.get(0).unwrap().same_object(back.get(1).unwrap()));
    assert!(!back.get(0).unwrap().same_object(back.get(2).unwrap()));
}

#[test]
fn equal_strings_are_not_deduplicated() {
    // Bare strings have no identity: two equal strings serialize twice.
    let mut array = JsArray::new();
    array.set(0, "dup-dup");
    array.set(1, "dup-dup");
    let bytes = encode(&JsValue::array(array)).unwrap();
    let occurrences = bytes
        .windows(7)
        .filter(|window| *window == b"dup-dup")
        .count();
    assert_eq!(occurrences, 2);
}

#[test]
fn cyclic_object_graph_round_trips() {
    // bob.pets[0].owner === bob
    let bob = JsValue::object(JsObject::new());
    let pet = JsValue::object(JsObject::new());
    if let (JsValue::Object(bob_rc), JsValue::Object(pet_rc)) = (&bob, &pet) {
        pet_rc.borrow_mut().insert("owner", bob.clone());
        let mut pets = JsArray::new();
        pets.set(0, pet.clone());
        bob_rc.borrow_mut().insert("name", "bob");
        bob_rc.borrow_mut().insert("pets", JsValue::array(pets));
    }

    let back = roundtrip(&bob);
    let pets = get_named(&back, "pets");
    let JsValue::Array(pets) = pets else {
        panic!("expected pets array");
    };
    let first_pet = pets.borrow().get(0).unwrap().clone();
    let owner = get_named(&first_pet, "owner");
    assert!(owner.same_object(&back));
}

#[test]
fn self_referential_map_round_trips() {
    let map = JsValue::map(JsMap::new());
    if let JsValue::Map(rc) = &map {
        rc.borrow_mut().insert(map.clone(), "me");
    }
    let back = roundtrip(&map);
    let JsValue::Map(rc) = &back else {
        panic!("expected map");
    };
    let rc = rc.borrow();
    let (key, value) = rc.entries().next().unwrap();
    assert!(key.same_object(&back));
    assert!(matches!(value, JsValue::String(s) if s.as_str() == "me"));
}

#[test]
fn cyclic_error_cause_requires_the_feature_and_round_trips_with_it() {
    let error = JsValue::error(JsError::with_message(JsErrorName::TypeError, "boom"));
    if let JsValue::Error(rc) = &error {
        rc.borrow_mut().cause = Some(error.clone());
    }

    let bytes = Encoder::new()
        .with_feature(SerializationFeature::CircularErrorCause)
        .encode(&error)
        .unwrap();
    let back = decode(&bytes).unwrap();
    let JsValue::Error(rc) = &back else {
        panic!("expected error");
    };
    let cause = rc.borrow().cause.clone().unwrap();
    assert!(cause.same_object(&back));
}

#[test]
fn host_object_envelope_round_trips_through_the_raw_handler() {
    let handler = RawHostObjectHandler;
    let value = JsValue::host_object(vec![0xde, 0xad, 0xbe, 0xef]);

    let bytes = Encoder::new()
        .with_host_object_handler(&handler)
        .encode(&value)
        .unwrap();
    let back = Decoder::new()
        .with_host_object_handler(&handler)
        .decode(&bytes)
        .unwrap();
    assert!(matches!(
        back,
        JsValue::HostObject(h) if h.payload == [0xde, 0xad, 0xbe, 0xef]
    ));
}

#[test]
fn views_sharing_a_buffer_share_it_after_decode() {
    let buffer = JsValue::array_buffer(JsArrayBuffer::new(vec![0u8; 8]));
    let first = JsValue::view(
        JsArrayBufferView::new(buffer.clone(), ArrayBufferViewTag::Uint8Array, 0, 8).unwrap(),
    );
    let second = JsValue::view(
        JsArrayBufferView::new(buffer, ArrayBufferViewTag::Uint16Array, 0, 4).unwrap(),
    );
    let mut array = JsArray::new();
    array.set(0, first);
    array.set(1, second);

    let JsValue::Array(back) = roundtrip(&JsValue::array(array)) else {
        panic!("expected array");
    };
    let back = back.borrow();
    let (JsValue::ArrayBufferView(a), JsValue::ArrayBufferView(b)) =
        (back.get(0).unwrap(), back.get(1).unwrap())
    else {
        panic!("expected views");
    };
    assert!(a.backing().same_object(b.backing()));
}

#[test]
fn encoding_is_deterministic_and_stable_across_a_round_trip() {
    let mut obj = JsObject::new();
    obj.insert("text", "stable");
    obj.insert("n", 42i32);
    let mut inner = JsMap::new();
    inner.insert("k", JsValue::Null);
    obj.insert("map", JsValue::map(inner));
    let value = JsValue::object(obj);

    let first = encode(&value).unwrap();
    let second = encode(&value).unwrap();
    assert_eq!(first, second);

    // Weak byte-level round-trip: re-encoding the decoded graph
    // reproduces the stream exactly.
    let reencoded = encode(&decode(&first).unwrap()).unwrap();
    assert_eq!(first, reencoded);
}

#[test]
fn every_supported_version_round_trips_the_same_graph() {
    let mut obj = JsObject::new();
    obj.insert("s", "text");
    obj.insert("n", 3.25f64);
    let buffer = JsValue::array_buffer(JsArrayBuffer::new(vec![1, 2, 3, 4]));
    obj.insert(
        "view",
        JsValue::view(
            JsArrayBufferView::new(buffer, ArrayBufferViewTag::Uint16Array, 0, 4).unwrap(),
        ),
    );
    let value = JsValue::object(obj);

    for version in v8_marshal::MINIMUM_VERSION..=v8_marshal::LATEST_VERSION {
        let bytes = Encoder::new()
            .with_declared_version(version)
            .encode(&value)
            .unwrap();
        assert_eq!(bytes[1], version as u8, "header version");
        let back = decode(&bytes).unwrap();
        assert!(value_eq(&value, &back), "version {version}");
    }
}
