//! Push-style tag stream writer.

use v8_marshal_buffers::Writer;

use crate::constants::{
    FeatureSet, RegExpFlags, SerializationFeature, SerializationTag, TagConstraint,
    LATEST_VERSION, MAX_BIGINT_BYTE_LENGTH, MAX_STRING_BYTE_LENGTH, VIEW_FLAGS_VERSION,
};
use crate::error::EncodeError;
use crate::jstypes::{
    JsArrayBuffer, JsArrayBufferView, JsBigInt, JsDate, JsPrimitiveObject, JsRegExp, JsString,
    StringEncoding,
};

/// Emits wire tokens, enforcing the legality rules the reader checks on
/// the way in: per-context tag sets, per-version tag availability, and
/// feature gating. A gated token fails closed with
/// [`EncodeError::FeatureNotEnabled`].
pub struct TagStreamWriter {
    w: Writer,
    version: u32,
    features: FeatureSet,
    constraint: Option<&'static TagConstraint>,
}

impl Default for TagStreamWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TagStreamWriter {
    /// A writer targeting the latest version with no optional features.
    pub fn new() -> TagStreamWriter {
        TagStreamWriter::with_options(LATEST_VERSION, FeatureSet::MAX_COMPATIBILITY)
    }

    /// A writer with an explicit declared version and feature set. The
    /// version must already be validated by the caller.
    pub fn with_options(version: u32, features: FeatureSet) -> TagStreamWriter {
        TagStreamWriter {
            w: Writer::new(),
            version,
            features,
            constraint: None,
        }
    }

    /// Current output offset.
    pub fn pos(&self) -> usize {
        self.w.len()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn features(&self) -> FeatureSet {
        self.features
    }

    /// Restricts subsequent tags to `constraint` until cleared.
    pub fn set_constraint(&mut self, constraint: &'static TagConstraint) {
        self.constraint = Some(constraint);
    }

    pub fn clear_constraint(&mut self) {
        self.constraint = None;
    }

    /// Writes the stream header: the version tag and the declared version.
    pub fn write_header(&mut self) {
        self.w.u8(SerializationTag::Version.byte());
        self.w.varint(u64::from(self.version));
    }

    /// Writes a tag byte after checking context, version and feature
    /// legality.
    pub fn write_tag(&mut self, tag: SerializationTag) -> Result<(), EncodeError> {
        if let Some(constraint) = self.constraint {
            if !constraint.contains(tag) {
                return Err(EncodeError::IllegalTagContext {
                    offset: self.pos(),
                    tag,
                    context: constraint.name,
                });
            }
        }
        if tag == SerializationTag::ResizableArrayBuffer
            && (self.version < tag.minimum_version()
                || !self
                    .features
                    .contains(SerializationFeature::ResizableArrayBuffers))
        {
            return Err(EncodeError::feature(
                SerializationFeature::ResizableArrayBuffers,
            ));
        }
        self.w.u8(tag.byte());
        Ok(())
    }

    pub fn write_varint(&mut self, n: u64) {
        self.w.varint(n);
    }

    pub fn write_zigzag(&mut self, n: i64) {
        self.w.zigzag(n);
    }

    pub fn write_double_raw(&mut self, value: f64) {
        self.w.f64(value);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.w.bytes(bytes);
    }

    /// Writes one of the constant tags (undefined, null, booleans, hole).
    pub fn write_constant(&mut self, tag: SerializationTag) -> Result<(), EncodeError> {
        self.write_tag(tag)
    }

    pub fn write_int32(&mut self, value: i32) -> Result<(), EncodeError> {
        self.write_tag(SerializationTag::Int32)?;
        self.w.zigzag(i64::from(value));
        Ok(())
    }

    pub fn write_uint32(&mut self, value: u32) -> Result<(), EncodeError> {
        self.write_tag(SerializationTag::Uint32)?;
        self.w.varint(u64::from(value));
        Ok(())
    }

    pub fn write_double(&mut self, value: f64) -> Result<(), EncodeError> {
        self.write_tag(SerializationTag::Double)?;
        self.w.f64(value);
        Ok(())
    }

    /// Writes a string, re-using its recorded wire form when the content
    /// still fits it, and otherwise picking OneByte for Latin-1 content
    /// and TwoByte beyond. Utf8 is only produced for strings that were
    /// decoded from Utf8.
    pub fn write_string(&mut self, value: &JsString) -> Result<(), EncodeError> {
        let form = match value.wire_form() {
            Some(StringEncoding::OneByte) if value.is_latin1() => StringEncoding::OneByte,
            Some(StringEncoding::Utf8) => StringEncoding::Utf8,
            Some(StringEncoding::TwoByte) => StringEncoding::TwoByte,
            _ if value.is_latin1() => StringEncoding::OneByte,
            _ => StringEncoding::TwoByte,
        };
        match form {
            StringEncoding::OneByte => {
                let length = value.as_str().chars().count() as u64;
                self.check_string_length(length)?;
                self.write_tag(SerializationTag::OneByteString)?;
                self.w.varint(length);
                for c in value.as_str().chars() {
                    self.w.u8(c as u32 as u8);
                }
            }
            StringEncoding::TwoByte => {
                let units: Vec<u16> = value.as_str().encode_utf16().collect();
                let byte_length = units.len() as u64 * 2;
                self.check_string_length(byte_length)?;
                let tag_pos = self.w.x;
                self.write_tag(SerializationTag::TwoByteString)?;
                self.w.varint(byte_length);
                // The body must start on an even offset; readers expect
                // aligned UTF-16 data. Shift the token right by one
                // padding byte when it would not.
                if self.w.x & 1 == 1 {
                    self.w.insert_u8_at(tag_pos, SerializationTag::Padding.byte());
                }
                for unit in units {
                    self.w.u16(unit);
                }
            }
            StringEncoding::Utf8 => {
                let bytes = value.as_str().as_bytes();
                self.check_string_length(bytes.len() as u64)?;
                self.write_tag(SerializationTag::Utf8String)?;
                self.w.varint(bytes.len() as u64);
                self.w.bytes(bytes);
            }
        }
        Ok(())
    }

    fn check_string_length(&self, byte_length: u64) -> Result<(), EncodeError> {
        if byte_length > MAX_STRING_BYTE_LENGTH {
            return Err(EncodeError::StringTooLong { byte_length });
        }
        Ok(())
    }

    /// Writes a varint length plus UTF-8 bytes with no tag (the body shape
    /// of StringObject and other UTF-8-only slots).
    pub fn write_utf8_body(&mut self, value: &str) {
        self.w.varint(value.len() as u64);
        self.w.bytes(value.as_bytes());
    }

    pub fn write_bigint(&mut self, value: &JsBigInt) -> Result<(), EncodeError> {
        self.write_tag(SerializationTag::BigInt)?;
        self.write_bigint_body(value)
    }

    /// The BigInt payload: sign-and-length bitfield, then the magnitude.
    pub fn write_bigint_body(&mut self, value: &JsBigInt) -> Result<(), EncodeError> {
        let byte_length = value.byte_length() as u64;
        if byte_length > MAX_BIGINT_BYTE_LENGTH {
            return Err(EncodeError::BigIntTooLarge { byte_length });
        }
        let bitfield = (byte_length << 1) | u64::from(value.is_negative());
        self.w.varint(bitfield);
        self.w.bytes(value.magnitude());
        Ok(())
    }

    pub fn write_date(&mut self, value: &JsDate) -> Result<(), EncodeError> {
        self.write_tag(SerializationTag::Date)?;
        self.w.f64(value.epoch_ms());
        Ok(())
    }

    pub fn write_regexp(&mut self, value: &JsRegExp) -> Result<(), EncodeError> {
        if value.flags().contains(RegExpFlags::UNICODE_SETS)
            && !self
                .features
                .contains(SerializationFeature::RegExpUnicodeSets)
        {
            return Err(EncodeError::feature(SerializationFeature::RegExpUnicodeSets));
        }
        self.write_tag(SerializationTag::RegExp)?;
        self.write_string(value.source())?;
        self.w.varint(u64::from(value.flags().canonical().bits()));
        Ok(())
    }

    pub fn write_primitive_object(&mut self, value: &JsPrimitiveObject) -> Result<(), EncodeError> {
        match value {
            JsPrimitiveObject::True => self.write_tag(SerializationTag::TrueObject),
            JsPrimitiveObject::False => self.write_tag(SerializationTag::FalseObject),
            JsPrimitiveObject::Number(n) => {
                self.write_tag(SerializationTag::NumberObject)?;
                self.w.f64(*n);
                Ok(())
            }
            JsPrimitiveObject::BigInt(b) => {
                self.write_tag(SerializationTag::BigIntObject)?;
                self.write_bigint_body(b)
            }
            JsPrimitiveObject::String(s) => {
                self.write_tag(SerializationTag::StringObject)?;
                self.write_utf8_body(s.as_str());
                Ok(())
            }
        }
    }

    pub fn write_array_buffer(&mut self, buffer: &JsArrayBuffer) -> Result<(), EncodeError> {
        match buffer.max_byte_length() {
            Some(max_byte_length) => {
                self.write_tag(SerializationTag::ResizableArrayBuffer)?;
                self.w.varint(u64::from(buffer.byte_length()));
                self.w.varint(u64::from(max_byte_length));
            }
            None => {
                self.write_tag(SerializationTag::ArrayBuffer)?;
                self.w.varint(u64::from(buffer.byte_length()));
            }
        }
        self.w.bytes(buffer.data());
        Ok(())
    }

    pub fn write_shared_array_buffer(&mut self, buffer_id: u32) -> Result<(), EncodeError> {
        self.write_tag(SerializationTag::SharedArrayBuffer)?;
        self.w.varint(u64::from(buffer_id));
        Ok(())
    }

    pub fn write_array_buffer_transfer(&mut self, transfer_id: u32) -> Result<(), EncodeError> {
        self.write_tag(SerializationTag::ArrayBufferTransfer)?;
        self.w.varint(u64::from(transfer_id));
        Ok(())
    }

    /// Writes the view token itself; the backing buffer must already be in
    /// the stream directly before it. The range is re-validated here
    /// because the backing buffer may have changed since the view was
    /// built.
    pub fn write_view_token(&mut self, view: &JsArrayBufferView) -> Result<(), EncodeError> {
        crate::jstypes::check_view_range(
            view.backing(),
            view.kind(),
            view.byte_offset(),
            view.byte_length(),
        )
        .map_err(|bounds| EncodeError::BufferViewOutOfBounds {
            offset: self.pos(),
            bounds,
        })?;
        if view.kind() == crate::constants::ArrayBufferViewTag::Float16Array
            && !self.features.contains(SerializationFeature::Float16Array)
        {
            return Err(EncodeError::feature(SerializationFeature::Float16Array));
        }
        let flags = view.flags();
        if flags != 0
            && (self.version < VIEW_FLAGS_VERSION
                || !self
                    .features
                    .contains(SerializationFeature::ResizableArrayBuffers))
        {
            return Err(EncodeError::feature(
                SerializationFeature::ResizableArrayBuffers,
            ));
        }
        self.write_tag(SerializationTag::ArrayBufferView)?;
        self.w.varint(u64::from(view.kind().byte()));
        self.w.varint(u64::from(view.byte_offset()));
        self.w.varint(u64::from(view.byte_length().unwrap_or(0)));
        if self.version >= VIEW_FLAGS_VERSION {
            self.w.varint(u64::from(flags));
        }
        Ok(())
    }

    pub fn write_object_reference(&mut self, id: u32) -> Result<(), EncodeError> {
        self.write_tag(SerializationTag::ObjectReference)?;
        self.w.varint(u64::from(id));
        Ok(())
    }

    pub fn write_shared_object(&mut self, shared_value_id: u32) -> Result<(), EncodeError> {
        self.write_tag(SerializationTag::SharedObject)?;
        self.w.varint(u64::from(shared_value_id));
        Ok(())
    }

    /// Consumes the writer and returns the finished byte stream.
    pub fn finish(mut self) -> Vec<u8> {
        self.w.flush()
    }
}
