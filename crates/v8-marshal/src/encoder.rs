//! The value-level encoder: composes the tag stream writer and an
//! identity → id map, dispatching on each value's runtime kind.
//!
//! Identity-eligible values are bound to their id before their children
//! are written, so a cycle terminates in an `ObjectReference` token on the
//! second visit.

use crate::constants::{
    ErrorTag, FeatureSet, SerializationFeature, SerializationTag, JS_OBJECT_KEY_TAGS,
    LATEST_VERSION, MINIMUM_VERSION,
};
use crate::error::EncodeError;
use crate::host::{HostObjectHandler, SharedBufferRegistry};
use crate::jstypes::{JsArray, JsMap, JsObject, JsSet, JsString, JsValue, PropertyKey};
use crate::references::IdentityMap;
use crate::stream::TagStreamWriter;

/// A reusable encoding configuration.
///
/// Defaults to the latest format version with no optional features, so
/// the output is readable by every runtime supporting the base version.
pub struct Encoder<'h> {
    version: u32,
    features: FeatureSet,
    host_object_handler: Option<&'h dyn HostObjectHandler>,
    shared_buffers: Option<&'h SharedBufferRegistry>,
}

impl Default for Encoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h> Encoder<'h> {
    pub fn new() -> Encoder<'h> {
        Encoder {
            version: LATEST_VERSION,
            features: FeatureSet::MAX_COMPATIBILITY,
            host_object_handler: None,
            shared_buffers: None,
        }
    }

    /// Sets the version written in the header. Tags newer than it cannot
    /// be emitted.
    pub fn with_declared_version(mut self, version: u32) -> Encoder<'h> {
        self.version = version;
        self
    }

    pub fn with_features(mut self, features: FeatureSet) -> Encoder<'h> {
        self.features = features;
        self
    }

    /// Enables one feature on top of the current set.
    pub fn with_feature(mut self, feature: SerializationFeature) -> Encoder<'h> {
        self.features = self.features.with(feature);
        self
    }

    /// The handler offered every value ahead of the built-in dispatch;
    /// values it claims are written as `HostObject` tokens.
    pub fn with_host_object_handler(mut self, handler: &'h dyn HostObjectHandler) -> Encoder<'h> {
        self.host_object_handler = Some(handler);
        self
    }

    /// Supplies the table that SharedArrayBuffer ids are validated
    /// against. Without one, ids are written unchecked.
    pub fn with_shared_buffers(mut self, registry: &'h SharedBufferRegistry) -> Encoder<'h> {
        self.shared_buffers = Some(registry);
        self
    }

    /// Serializes one value, returning the complete byte stream.
    pub fn encode(&self, value: &JsValue) -> Result<Vec<u8>, EncodeError> {
        if !(MINIMUM_VERSION..=LATEST_VERSION).contains(&self.version) {
            return Err(EncodeError::UnsupportedVersion {
                version: self.version,
            });
        }
        let mut stream = TagStreamWriter::with_options(self.version, self.features);
        stream.write_header();
        let mut encoder = ValueEncoder {
            stream,
            identities: IdentityMap::new(),
            host_object_handler: self.host_object_handler,
            shared_buffers: self.shared_buffers,
        };
        encoder.encode_value(value)?;
        Ok(encoder.stream.finish())
    }
}

/// The in-flight state of one encode call.
pub struct ValueEncoder<'c> {
    stream: TagStreamWriter,
    identities: IdentityMap,
    host_object_handler: Option<&'c dyn HostObjectHandler>,
    shared_buffers: Option<&'c SharedBufferRegistry>,
}

impl<'c> ValueEncoder<'c> {
    /// An encoder over an already-constructed tag stream, for custom
    /// compositions.
    pub fn over(stream: TagStreamWriter) -> ValueEncoder<'c> {
        ValueEncoder {
            stream,
            identities: IdentityMap::new(),
            host_object_handler: None,
            shared_buffers: None,
        }
    }

    /// The underlying tag stream.
    pub fn stream(&mut self) -> &mut TagStreamWriter {
        &mut self.stream
    }

    /// Consumes the encoder and returns the finished byte stream.
    pub fn finish(self) -> Vec<u8> {
        self.stream.finish()
    }

    /// Writes one value, emitting a back-reference when its identity has
    /// been written before.
    pub fn encode_value(&mut self, value: &JsValue) -> Result<(), EncodeError> {
        if let Some(id) = self.identities.get(value) {
            if self.identities.is_blocked(id) {
                // The only blocked window is an error cause being written
                // without the circular-cause feature.
                return Err(EncodeError::feature(SerializationFeature::CircularErrorCause));
            }
            return self.stream.write_object_reference(id);
        }

        let claiming_handler = self
            .host_object_handler
            .filter(|handler| handler.claims(value));

        // A view's backing buffer is serialized first and numbered below
        // the view, unless the host handler swallows the view whole.
        if let JsValue::ArrayBufferView(view) = value {
            if claiming_handler.is_none() {
                self.encode_value(view.backing())?;
                self.identities.insert(value);
                return self.stream.write_view_token(view);
            }
        }

        if value.identity().is_some() {
            self.identities.insert(value);
        }

        if let Some(handler) = claiming_handler {
            if handler.encode(value, &mut self.stream)? {
                return Ok(());
            }
        }

        self.encode_dispatch(value)
    }

    fn encode_dispatch(&mut self, value: &JsValue) -> Result<(), EncodeError> {
        use SerializationTag as T;
        match value {
            JsValue::Undefined => self.stream.write_constant(T::Undefined),
            JsValue::Null => self.stream.write_constant(T::Null),
            JsValue::Hole => self.stream.write_constant(T::TheHole),
            JsValue::Bool(true) => self.stream.write_constant(T::True),
            JsValue::Bool(false) => self.stream.write_constant(T::False),
            JsValue::Int32(v) => self.stream.write_int32(*v),
            JsValue::Uint32(v) => self.stream.write_uint32(*v),
            JsValue::Double(v) => self.stream.write_double(*v),
            JsValue::BigInt(v) => self.stream.write_bigint(v),
            JsValue::String(v) => self.stream.write_string(v),
            JsValue::Date(v) => self.stream.write_date(v),
            JsValue::RegExp(v) => self.stream.write_regexp(v),
            JsValue::PrimitiveObject(v) => self.stream.write_primitive_object(v),
            JsValue::Object(v) => self.encode_object(&v.borrow()),
            JsValue::Array(v) => self.encode_array(&v.borrow()),
            JsValue::Map(v) => self.encode_map(&v.borrow()),
            JsValue::Set(v) => self.encode_set(&v.borrow()),
            JsValue::ArrayBuffer(v) => self.stream.write_array_buffer(&v.borrow()),
            JsValue::SharedArrayBuffer(v) => {
                if let Some(registry) = self.shared_buffers {
                    if !registry.contains(v.buffer_id) {
                        return Err(EncodeError::SharedBufferUnknown {
                            transfer_id: v.buffer_id,
                        });
                    }
                }
                self.stream.write_shared_array_buffer(v.buffer_id)
            }
            JsValue::ArrayBufferTransfer(v) => {
                self.stream.write_array_buffer_transfer(v.transfer_id)
            }
            JsValue::ArrayBufferView(v) => {
                // Fallback for a handler that claimed the view and then
                // declined it.
                self.encode_value(v.backing())?;
                self.stream.write_view_token(v)
            }
            JsValue::Error(v) => self.encode_error(value, &v.borrow()),
            JsValue::HostObject(_) => Err(EncodeError::UnhandledValue {
                offset: self.stream.pos(),
                kind: value.kind(),
            }),
            JsValue::SharedObject(v) => self.stream.write_shared_object(v.shared_value_id),
        }
    }

    fn encode_property_key(&mut self, key: &PropertyKey) -> Result<(), EncodeError> {
        self.stream.set_constraint(&JS_OBJECT_KEY_TAGS);
        let result = match key {
            PropertyKey::Index(index) => self.stream.write_uint32(*index),
            PropertyKey::String(name) => self.stream.write_string(name),
        };
        self.stream.clear_constraint();
        result
    }

    fn encode_object(&mut self, object: &JsObject) -> Result<(), EncodeError> {
        self.stream.write_tag(SerializationTag::BeginJsObject)?;
        let mut count: u64 = 0;
        for (key, value) in object.entries() {
            self.encode_property_key(key)?;
            self.encode_value(value)?;
            count += 1;
        }
        self.stream.write_tag(SerializationTag::EndJsObject)?;
        self.stream.write_varint(count);
        Ok(())
    }

    fn encode_array(&mut self, array: &JsArray) -> Result<(), EncodeError> {
        if array.sparse_is_smaller() {
            self.encode_array_sparse(array)
        } else {
            self.encode_array_dense(array)
        }
    }

    fn encode_array_dense(&mut self, array: &JsArray) -> Result<(), EncodeError> {
        self.stream.write_tag(SerializationTag::BeginDenseJsArray)?;
        self.stream.write_varint(u64::from(array.length()));
        for index in 0..array.length() {
            match array.get(index) {
                Some(value) => self.encode_value(value)?,
                None => self.stream.write_constant(SerializationTag::TheHole)?,
            }
        }
        let mut count: u64 = 0;
        for (key, value) in array.properties() {
            self.encode_property_key(key)?;
            self.encode_value(value)?;
            count += 1;
        }
        self.stream.write_tag(SerializationTag::EndDenseJsArray)?;
        self.stream.write_varint(count);
        self.stream.write_varint(u64::from(array.length()));
        Ok(())
    }

    fn encode_array_sparse(&mut self, array: &JsArray) -> Result<(), EncodeError> {
        self.stream.write_tag(SerializationTag::BeginSparseJsArray)?;
        self.stream.write_varint(u64::from(array.length()));
        let mut count: u64 = 0;
        for (index, value) in array.elements() {
            self.encode_property_key(&PropertyKey::Index(index))?;
            self.encode_value(value)?;
            count += 1;
        }
        for (key, value) in array.properties() {
            self.encode_property_key(key)?;
            self.encode_value(value)?;
            count += 1;
        }
        self.stream.write_tag(SerializationTag::EndSparseJsArray)?;
        self.stream.write_varint(count);
        self.stream.write_varint(u64::from(array.length()));
        Ok(())
    }

    fn encode_map(&mut self, map: &JsMap) -> Result<(), EncodeError> {
        self.stream.write_tag(SerializationTag::BeginJsMap)?;
        let mut count: u64 = 0;
        for (key, value) in map.entries() {
            self.encode_value(key)?;
            self.encode_value(value)?;
            count += 2;
        }
        self.stream.write_tag(SerializationTag::EndJsMap)?;
        self.stream.write_varint(count);
        Ok(())
    }

    fn encode_set(&mut self, set: &JsSet) -> Result<(), EncodeError> {
        self.stream.write_tag(SerializationTag::BeginJsSet)?;
        let mut count: u64 = 0;
        for value in set.values() {
            self.encode_value(value)?;
            count += 1;
        }
        self.stream.write_tag(SerializationTag::EndJsSet)?;
        self.stream.write_varint(count);
        Ok(())
    }

    fn encode_error(
        &mut self,
        error_value: &JsValue,
        error: &crate::jstypes::JsError,
    ) -> Result<(), EncodeError> {
        self.stream.write_tag(SerializationTag::Error)?;
        if let Some(tag) = error.name.error_tag() {
            self.stream.write_varint(u64::from(tag.byte()));
        }
        if let Some(message) = &error.message {
            self.stream.write_varint(u64::from(ErrorTag::Message.byte()));
            self.stream.write_string(&JsString::new(message.clone()))?;
        }
        if let Some(stack) = &error.stack {
            self.stream.write_varint(u64::from(ErrorTag::Stack.byte()));
            self.stream.write_string(&JsString::new(stack.clone()))?;
        }
        if let Some(cause) = &error.cause {
            self.stream.write_varint(u64::from(ErrorTag::Cause.byte()));
            if self
                .stream
                .features()
                .contains(SerializationFeature::CircularErrorCause)
            {
                self.encode_value(cause)?;
            } else {
                // Readers without the circular-cause change cannot resolve
                // a back-reference into the error being read, so such a
                // reference must not be written.
                let id = self
                    .identities
                    .get(error_value)
                    .expect("error bound before its fields");
                self.identities.block(id);
                let result = self.encode_value(cause);
                self.identities.unblock(id);
                result?;
            }
        }
        self.stream.write_varint(u64::from(ErrorTag::End.byte()));
        Ok(())
    }
}
