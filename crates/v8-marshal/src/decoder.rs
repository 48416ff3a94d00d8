//! The value-level decoder: composes the tag stream reader, a reference
//! table, and a per-tag registry of decode steps.
//!
//! Cycles work by installing each composite's placeholder in the
//! reference table *before* its children decode, so a back-reference into
//! an ancestor resolves to the very container being filled.

use std::cell::RefCell;
use std::rc::Rc;

use crate::constants::{
    view_flags, ArrayBufferViewTag, FeatureSet, JsErrorName, RegExpFlags, SerializationFeature,
    SerializationTag, JS_STRING_TAGS, MAX_ARRAY_LENGTH,
};
use crate::error::{DecodeError, ViewBounds};
use crate::host::{HostObjectHandler, NodeJsBufferHandler, SharedBufferRegistry};
use crate::jstypes::{
    check_view_range, JsArray, JsArrayBuffer, JsArrayBufferView, JsError, JsMap, JsObject,
    JsPrimitiveObject, JsRegExp, JsSet, JsSharedObject, JsValue, PropertyKey,
};
use crate::references::ReferenceTable;
use crate::stream::TagStreamReader;

/// One decode step: consumes the payload of `tag` (already read) and
/// returns the value it denotes.
pub type DecodeStep =
    fn(&mut ValueDecoder<'_, '_>, SerializationTag) -> Result<JsValue, DecodeError>;

/// Immutable tag → decode-step table, built once at startup. Extend by
/// starting from [`DecodeStepRegistry::standard`] and overriding entries.
#[derive(Clone)]
pub struct DecodeStepRegistry {
    steps: [Option<DecodeStep>; 256],
}

impl DecodeStepRegistry {
    /// A registry with no steps at all.
    pub fn empty() -> DecodeStepRegistry {
        DecodeStepRegistry {
            steps: [None; 256],
        }
    }

    /// The standard table covering every tag of the format.
    pub fn standard() -> DecodeStepRegistry {
        use SerializationTag as T;
        let mut registry = DecodeStepRegistry::empty();
        let r = &mut registry;

        r.set(T::TheHole, decode_oddball);
        r.set(T::Undefined, decode_oddball);
        r.set(T::Null, decode_oddball);
        r.set(T::True, decode_oddball);
        r.set(T::False, decode_oddball);

        r.set(T::Int32, decode_int32);
        r.set(T::Uint32, decode_uint32);
        r.set(T::Double, decode_double);
        r.set(T::BigInt, decode_bigint);

        r.set(T::OneByteString, decode_string);
        r.set(T::TwoByteString, decode_string);
        r.set(T::Utf8String, decode_string);

        r.set(T::ObjectReference, decode_object_reference);
        r.set(T::BeginJsObject, decode_js_object);
        r.set(T::BeginDenseJsArray, decode_dense_array);
        r.set(T::BeginSparseJsArray, decode_sparse_array);
        r.set(T::BeginJsMap, decode_map);
        r.set(T::BeginJsSet, decode_set);

        r.set(T::Date, decode_date);
        r.set(T::RegExp, decode_regexp);
        r.set(T::Error, decode_error);

        r.set(T::TrueObject, decode_primitive_object);
        r.set(T::FalseObject, decode_primitive_object);
        r.set(T::NumberObject, decode_primitive_object);
        r.set(T::BigIntObject, decode_primitive_object);
        r.set(T::StringObject, decode_primitive_object);

        r.set(T::ArrayBuffer, decode_array_buffer);
        r.set(T::ResizableArrayBuffer, decode_array_buffer);
        r.set(T::SharedArrayBuffer, decode_array_buffer);
        r.set(T::ArrayBufferTransfer, decode_array_buffer);
        r.set(T::ArrayBufferView, decode_orphan_view);

        r.set(T::HostObject, decode_host_object);
        r.set(T::SharedObject, decode_shared_object);
        r.set(T::WasmModuleTransfer, decode_wasm);
        r.set(T::WasmMemoryTransfer, decode_wasm);

        registry
    }

    /// Installs (or replaces) the step for a tag.
    pub fn set(&mut self, tag: SerializationTag, step: DecodeStep) {
        self.steps[tag.byte() as usize] = Some(step);
    }

    pub fn get(&self, tag: SerializationTag) -> Option<DecodeStep> {
        self.steps[tag.byte() as usize]
    }
}

impl Default for DecodeStepRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

static NODE_JS_BUFFERS: NodeJsBufferHandler = NodeJsBufferHandler;

/// A reusable decoding configuration.
///
/// By default every optional feature is accepted and Node.js's HostObject
/// framing for buffer views is understood, so `v8.serialize` output
/// decodes out of the box.
pub struct Decoder<'h> {
    registry: DecodeStepRegistry,
    features: FeatureSet,
    host_object_handler: Option<&'h dyn HostObjectHandler>,
    shared_buffers: Option<&'h SharedBufferRegistry>,
}

impl Default for Decoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h> Decoder<'h> {
    pub fn new() -> Decoder<'h> {
        Decoder {
            registry: DecodeStepRegistry::standard(),
            features: FeatureSet::ALL,
            host_object_handler: Some(&NODE_JS_BUFFERS),
            shared_buffers: None,
        }
    }

    /// Replaces the decode-step registry.
    pub fn with_registry(mut self, registry: DecodeStepRegistry) -> Decoder<'h> {
        self.registry = registry;
        self
    }

    /// Restricts the accepted features; tags and subtags requiring a
    /// feature outside the set are rejected.
    pub fn with_features(mut self, features: FeatureSet) -> Decoder<'h> {
        self.features = features;
        self
    }

    pub fn with_host_object_handler(mut self, handler: &'h dyn HostObjectHandler) -> Decoder<'h> {
        self.host_object_handler = Some(handler);
        self
    }

    /// Drops the host-object handler; `HostObject` tags then fail.
    pub fn without_host_object_handler(mut self) -> Decoder<'h> {
        self.host_object_handler = None;
        self
    }

    /// Supplies the table that SharedArrayBuffer transfer ids must resolve
    /// against. Without one, ids are accepted unchecked.
    pub fn with_shared_buffers(mut self, registry: &'h SharedBufferRegistry) -> Decoder<'h> {
        self.shared_buffers = Some(registry);
        self
    }

    /// Decodes the first value in `data`.
    pub fn decode(&self, data: &[u8]) -> Result<JsValue, DecodeError> {
        let stream = TagStreamReader::with_features(data, self.features)?;
        let mut decoder = ValueDecoder {
            stream,
            references: ReferenceTable::new(),
            registry: &self.registry,
            host_object_handler: self.host_object_handler,
            shared_buffers: self.shared_buffers,
        };
        decoder.decode_value()
    }
}

/// The in-flight state of one decode call.
pub struct ValueDecoder<'a, 'c> {
    stream: TagStreamReader<'a>,
    references: ReferenceTable,
    registry: &'c DecodeStepRegistry,
    host_object_handler: Option<&'c dyn HostObjectHandler>,
    shared_buffers: Option<&'c SharedBufferRegistry>,
}

impl<'a, 'c> ValueDecoder<'a, 'c> {
    /// A decoder over an already-constructed tag stream, for custom
    /// compositions.
    pub fn over(stream: TagStreamReader<'a>, registry: &'c DecodeStepRegistry) -> Self {
        ValueDecoder {
            stream,
            references: ReferenceTable::new(),
            registry,
            host_object_handler: None,
            shared_buffers: None,
        }
    }

    /// Reads the next tag and decodes one full value.
    pub fn decode_value(&mut self) -> Result<JsValue, DecodeError> {
        let tag = self.stream.read_tag()?;
        self.decode_tag(tag)
    }

    /// Decodes the payload of an already-read tag.
    pub fn decode_tag(&mut self, tag: SerializationTag) -> Result<JsValue, DecodeError> {
        match self.registry.get(tag) {
            Some(step) => step(self, tag),
            None => Err(DecodeError::UnhandledTag {
                offset: self.stream.pos().saturating_sub(1),
                byte: tag.byte(),
                version: self.stream.version(),
                context: "value",
            }),
        }
    }

    /// The underlying tag stream (host handlers and custom steps read
    /// payloads through this).
    pub fn stream(&mut self) -> &mut TagStreamReader<'a> {
        &mut self.stream
    }

    /// The reference table accumulated so far.
    pub fn references(&mut self) -> &mut ReferenceTable {
        &mut self.references
    }

    fn unhandled(&self, byte: u8, context: &'static str) -> DecodeError {
        DecodeError::UnhandledTag {
            offset: self.stream.pos(),
            byte,
            version: self.stream.version(),
            context,
        }
    }

    /// Reads key/value pairs up to `end_tag`, verifying the property-count
    /// trailer. Values are handed to `sink` as they complete.
    fn read_properties(
        &mut self,
        end_tag: SerializationTag,
        what: &'static str,
        mut sink: impl FnMut(PropertyKey, JsValue),
    ) -> Result<u64, DecodeError> {
        let mut count: u64 = 0;
        loop {
            let offset = self.stream.pos();
            let tag = self.stream.read_tag()?;
            if tag == end_tag {
                break;
            }
            if !crate::constants::JS_OBJECT_KEY_TAGS.contains(tag) {
                return Err(DecodeError::UnhandledTag {
                    offset,
                    byte: tag.byte(),
                    version: self.stream.version(),
                    context: "object key",
                });
            }
            let key_value = self.decode_tag(tag)?;
            let key = property_key_from_value(key_value)
                .ok_or_else(|| self.unhandled(tag.byte(), "object key"))?;
            let value = self.decode_value()?;
            sink(key, value);
            count += 1;
        }
        let offset = self.stream.pos();
        let expected = self.stream.read_varint()?;
        if expected != count {
            return Err(DecodeError::CountMismatch {
                offset,
                what,
                expected,
                actual: count,
            });
        }
        Ok(count)
    }

    /// Reads a string-tagged value (error messages, regexp sources).
    fn read_string_value(&mut self) -> Result<crate::jstypes::JsString, DecodeError> {
        let tag = self.stream.read_tag_in(&JS_STRING_TAGS)?;
        match self.decode_tag(tag)? {
            JsValue::String(s) => Ok(s),
            JsValue::PrimitiveObject(p) => match &*p {
                JsPrimitiveObject::String(s) => Ok(s.clone()),
                _ => Err(self.unhandled(tag.byte(), "string")),
            },
            _ => Err(self.unhandled(tag.byte(), "string")),
        }
    }
}

/// Normalises a decoded key value into a property key. Numbers follow the
/// integer-index rule; everything out of range is formatted the way
/// JavaScript prints numbers and kept as a string.
fn property_key_from_value(value: JsValue) -> Option<PropertyKey> {
    match value {
        JsValue::String(s) => Some(PropertyKey::from(s)),
        JsValue::Int32(i) => Some(if i >= 0 {
            PropertyKey::from(i as u32)
        } else {
            PropertyKey::from_name(&i.to_string())
        }),
        JsValue::Uint32(u) => Some(PropertyKey::from(u)),
        JsValue::Double(d) => Some(key_from_double(d)),
        JsValue::PrimitiveObject(p) => match &*p {
            JsPrimitiveObject::Number(n) => Some(key_from_double(*n)),
            JsPrimitiveObject::String(s) => Some(PropertyKey::from(s.clone())),
            _ => None,
        },
        _ => None,
    }
}

fn key_from_double(d: f64) -> PropertyKey {
    if d.is_finite() && d == d.trunc() && d >= 0.0 && (d as u64) < MAX_ARRAY_LENGTH {
        PropertyKey::Index(d as u32)
    } else if d.is_finite() && d == d.trunc() {
        PropertyKey::from_name(&format!("{}", d as i64))
    } else {
        PropertyKey::from_name(&format!("{d}"))
    }
}

fn decode_oddball(
    _d: &mut ValueDecoder<'_, '_>,
    tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    Ok(match tag {
        SerializationTag::TheHole => JsValue::Hole,
        SerializationTag::Undefined => JsValue::Undefined,
        SerializationTag::Null => JsValue::Null,
        SerializationTag::True => JsValue::Bool(true),
        _ => JsValue::Bool(false),
    })
}

fn decode_int32(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    Ok(JsValue::Int32(d.stream.read_int32()?))
}

fn decode_uint32(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    Ok(JsValue::Uint32(d.stream.read_varint_u32()?))
}

fn decode_double(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    Ok(JsValue::Double(d.stream.read_double()?))
}

fn decode_bigint(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    Ok(JsValue::BigInt(d.stream.read_bigint_body()?))
}

fn decode_string(
    d: &mut ValueDecoder<'_, '_>,
    tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    Ok(JsValue::String(d.stream.read_string_body(tag)?))
}

fn decode_object_reference(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    let offset = d.stream.pos();
    let id = d.stream.read_varint_u32()?;
    let value = d
        .references
        .get(id)
        .cloned()
        .ok_or(DecodeError::IllegalCyclicReference { offset, id })?;

    // A reference to a buffer may be wrapped by a view that follows it
    // directly, exactly as a freshly-written buffer may.
    if matches!(
        value,
        JsValue::ArrayBuffer(_) | JsValue::SharedArrayBuffer(_) | JsValue::ArrayBufferTransfer(_)
    ) && d.stream.peek_tag() == Some(SerializationTag::ArrayBufferView)
    {
        d.stream.read_tag()?;
        return decode_view_body(d, value);
    }
    Ok(value)
}

fn decode_js_object(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    let obj = Rc::new(RefCell::new(JsObject::new()));
    d.references.record(JsValue::Object(obj.clone()));
    let sink = |key: PropertyKey, value: JsValue| {
        obj.borrow_mut().insert(key, value);
    };
    d.read_properties(SerializationTag::EndJsObject, "object properties", sink)?;
    Ok(JsValue::Object(obj))
}

fn decode_dense_array(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    let array = Rc::new(RefCell::new(JsArray::new()));
    d.references.record(JsValue::Array(array.clone()));

    let length = d.stream.read_varint_u32()?;
    array.borrow_mut().set_length(length);
    for index in 0..length {
        let value = d.decode_value()?;
        if !matches!(value, JsValue::Hole) {
            array.borrow_mut().set(index, value);
        }
    }

    let sink = |key: PropertyKey, value: JsValue| match key {
        PropertyKey::Index(index) => array.borrow_mut().set(index, value),
        key @ PropertyKey::String(_) => array.borrow_mut().insert_property(key, value),
    };
    d.read_properties(
        SerializationTag::EndDenseJsArray,
        "dense array properties",
        sink,
    )?;

    let offset = d.stream.pos();
    let final_length = d.stream.read_varint_u32()?;
    if final_length != length {
        return Err(DecodeError::CountMismatch {
            offset,
            what: "dense array length",
            expected: u64::from(final_length),
            actual: u64::from(length),
        });
    }
    Ok(JsValue::Array(array))
}

fn decode_sparse_array(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    let array = Rc::new(RefCell::new(JsArray::new()));
    d.references.record(JsValue::Array(array.clone()));

    let length = d.stream.read_varint_u32()?;
    array.borrow_mut().set_length(length);

    let sink = |key: PropertyKey, value: JsValue| match key {
        PropertyKey::Index(index) => array.borrow_mut().set(index, value),
        key @ PropertyKey::String(_) => array.borrow_mut().insert_property(key, value),
    };
    d.read_properties(
        SerializationTag::EndSparseJsArray,
        "sparse array properties",
        sink,
    )?;

    let offset = d.stream.pos();
    let final_length = d.stream.read_varint_u32()?;
    if final_length != length {
        return Err(DecodeError::CountMismatch {
            offset,
            what: "sparse array length",
            expected: u64::from(final_length),
            actual: u64::from(length),
        });
    }
    Ok(JsValue::Array(array))
}

fn decode_map(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    let map = Rc::new(RefCell::new(JsMap::new()));
    d.references.record(JsValue::Map(map.clone()));

    let mut count: u64 = 0;
    loop {
        let tag = d.stream.read_tag()?;
        if tag == SerializationTag::EndJsMap {
            break;
        }
        let key = d.decode_tag(tag)?;
        let value = d.decode_value()?;
        map.borrow_mut().insert(key, value);
        count += 2;
    }
    let offset = d.stream.pos();
    let expected = d.stream.read_varint()?;
    if expected != count {
        return Err(DecodeError::CountMismatch {
            offset,
            what: "map entries",
            expected,
            actual: count,
        });
    }
    Ok(JsValue::Map(map))
}

fn decode_set(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    let set = Rc::new(RefCell::new(JsSet::new()));
    d.references.record(JsValue::Set(set.clone()));

    let mut count: u64 = 0;
    loop {
        let tag = d.stream.read_tag()?;
        if tag == SerializationTag::EndJsSet {
            break;
        }
        let value = d.decode_tag(tag)?;
        set.borrow_mut().insert(value);
        count += 1;
    }
    let offset = d.stream.pos();
    let expected = d.stream.read_varint()?;
    if expected != count {
        return Err(DecodeError::CountMismatch {
            offset,
            what: "set members",
            expected,
            actual: count,
        });
    }
    Ok(JsValue::Set(set))
}

fn decode_date(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    let epoch_ms = d.stream.read_double()?;
    let value = JsValue::date(epoch_ms);
    d.references.record(value.clone());
    Ok(value)
}

fn decode_regexp(
    d: &mut ValueDecoder<'_, '_>,
    tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    let source = d.read_string_value()?;
    let flags = RegExpFlags::from_bits(d.stream.read_varint_u32()?);
    if flags.contains(RegExpFlags::UNICODE_SETS)
        && !d
            .stream
            .features()
            .contains(SerializationFeature::RegExpUnicodeSets)
    {
        return Err(d.unhandled(tag.byte(), "regexp flags"));
    }
    let value = JsValue::regexp(JsRegExp::from_wire(source, flags));
    d.references.record(value.clone());
    Ok(value)
}

fn decode_error(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    let error = Rc::new(RefCell::new(JsError::default()));
    d.references.record(JsValue::Error(error.clone()));

    // Fields are read in whatever order they appear. V8 has written two
    // layouts over the life of version 15 (stack after the cause, then
    // stack before it); a plain field loop reads both.
    loop {
        let etag = d.stream.read_error_tag()?;
        if let Some(name) = JsErrorName::for_error_tag(etag) {
            error.borrow_mut().name = name;
            continue;
        }
        match etag {
            crate::constants::ErrorTag::Message => {
                let message = d.read_string_value()?.into_string();
                error.borrow_mut().message = Some(message);
            }
            crate::constants::ErrorTag::Stack => {
                let stack = d.read_string_value()?.into_string();
                error.borrow_mut().stack = Some(stack);
            }
            crate::constants::ErrorTag::Cause => {
                let cause = d.decode_value()?;
                error.borrow_mut().cause = Some(cause);
            }
            crate::constants::ErrorTag::End => break,
            _ => unreachable!("prototype tags handled above"),
        }
    }
    Ok(JsValue::Error(error))
}

fn decode_primitive_object(
    d: &mut ValueDecoder<'_, '_>,
    tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    let wrapped = match tag {
        SerializationTag::TrueObject => JsPrimitiveObject::True,
        SerializationTag::FalseObject => JsPrimitiveObject::False,
        SerializationTag::NumberObject => JsPrimitiveObject::Number(d.stream.read_double()?),
        SerializationTag::BigIntObject => JsPrimitiveObject::BigInt(d.stream.read_bigint_body()?),
        _ => JsPrimitiveObject::String(
            d.stream.read_string_body(SerializationTag::Utf8String)?,
        ),
    };
    let value = JsValue::primitive_object(wrapped);
    d.references.record(value.clone());
    Ok(value)
}

fn decode_array_buffer(
    d: &mut ValueDecoder<'_, '_>,
    tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    let value = match tag {
        SerializationTag::ArrayBuffer => {
            let byte_length = d.stream.read_varint_u32()?;
            let data = d.stream.read_bytes(byte_length as usize)?.to_vec();
            JsValue::array_buffer(JsArrayBuffer::new(data))
        }
        SerializationTag::ResizableArrayBuffer => {
            let byte_length = d.stream.read_varint_u32()?;
            let offset = d.stream.pos();
            let max_byte_length = d.stream.read_varint_u32()?;
            let data = d.stream.read_bytes(byte_length as usize)?.to_vec();
            let buffer = JsArrayBuffer::resizable(data, max_byte_length)
                .map_err(|bounds| DecodeError::BufferViewOutOfBounds { offset, bounds })?;
            JsValue::array_buffer(buffer)
        }
        SerializationTag::SharedArrayBuffer => {
            let offset = d.stream.pos();
            let buffer_id = d.stream.read_varint_u32()?;
            if let Some(registry) = d.shared_buffers {
                if !registry.contains(buffer_id) {
                    return Err(DecodeError::SharedBufferUnknown {
                        offset,
                        transfer_id: buffer_id,
                    });
                }
            }
            JsValue::shared_array_buffer(buffer_id)
        }
        _ => {
            let transfer_id = d.stream.read_varint_u32()?;
            JsValue::array_buffer_transfer(transfer_id)
        }
    };
    d.references.record(value.clone());

    // A buffer may be directly followed by the view that wraps it.
    if d.stream.peek_tag() == Some(SerializationTag::ArrayBufferView) {
        d.stream.read_tag()?;
        return decode_view_body(d, value);
    }
    Ok(value)
}

fn decode_orphan_view(
    d: &mut ValueDecoder<'_, '_>,
    tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    // The view token is only meaningful directly after an ArrayBuffer or
    // a reference to one.
    Err(d.unhandled(tag.byte(), "array buffer view without a preceding buffer"))
}

/// Reads the view token that follows a buffer and wraps `backing`.
fn decode_view_body(
    d: &mut ValueDecoder<'_, '_>,
    backing: JsValue,
) -> Result<JsValue, DecodeError> {
    let offset = d.stream.pos();
    let raw_kind = d.stream.read_varint_u32()?;
    let kind = u8::try_from(raw_kind)
        .ok()
        .and_then(ArrayBufferViewTag::from_byte)
        .ok_or_else(|| d.unhandled((raw_kind & 0xff) as u8, "array buffer view subtag"))?;
    if kind == ArrayBufferViewTag::Float16Array
        && !d
            .stream
            .features()
            .contains(SerializationFeature::Float16Array)
    {
        return Err(d.unhandled(kind.byte(), "array buffer view subtag"));
    }

    let byte_offset = d.stream.read_varint_u32()?;
    let byte_length = d.stream.read_varint_u32()?;
    let flags = if d.stream.version() >= crate::constants::VIEW_FLAGS_VERSION {
        d.stream.read_varint_u32()?
    } else {
        0
    };

    let length_tracking = flags & view_flags::IS_LENGTH_TRACKING != 0;
    let backing_resizable = flags & view_flags::IS_BUFFER_RESIZABLE != 0;
    if length_tracking && !backing_resizable {
        return Err(DecodeError::BufferViewOutOfBounds {
            offset,
            bounds: ViewBounds::InvalidFlagCombination,
        });
    }
    if let JsValue::ArrayBuffer(buffer) = &backing {
        if backing_resizable && !buffer.borrow().is_resizable() {
            return Err(DecodeError::BufferViewOutOfBounds {
                offset,
                bounds: ViewBounds::InvalidFlagCombination,
            });
        }
    }
    let wire_length = if length_tracking {
        None
    } else {
        Some(byte_length)
    };
    check_view_range(&backing, kind, byte_offset, wire_length)
        .map_err(|bounds| DecodeError::BufferViewOutOfBounds { offset, bounds })?;

    let view = JsArrayBufferView::from_wire_parts(backing, kind, byte_offset, wire_length, flags);
    let value = JsValue::view(view);
    d.references.record(value.clone());
    Ok(value)
}

fn decode_host_object(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    let Some(handler) = d.host_object_handler else {
        return Err(DecodeError::HostObject {
            offset: d.stream.pos(),
            reason: "no host object handler configured".into(),
        });
    };
    // The id is claimed before the payload is read, like every receiver.
    let id = d.references.reserve();
    let value = handler.decode(&mut d.stream)?;
    d.references.bind(id, value.clone());
    Ok(value)
}

fn decode_shared_object(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    let shared_value_id = d.stream.read_varint_u32()?;
    let value = JsValue::SharedObject(Rc::new(JsSharedObject { shared_value_id }));
    d.references.record(value.clone());
    Ok(value)
}

fn decode_wasm(
    d: &mut ValueDecoder<'_, '_>,
    _tag: SerializationTag,
) -> Result<JsValue, DecodeError> {
    Err(DecodeError::UnsupportedWasm {
        offset: d.stream.pos(),
    })
}
