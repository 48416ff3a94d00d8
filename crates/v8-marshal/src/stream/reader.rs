//! Pull-style tag stream reader.

use v8_marshal_buffers::{BufferError, Reader};

use crate::constants::{
    ErrorTag, FeatureSet, SerializationTag, TagConstraint, LATEST_VERSION, MAX_STRING_BYTE_LENGTH,
    MINIMUM_VERSION,
};
use crate::error::DecodeError;
use crate::jstypes::{JsBigInt, JsString, StringEncoding};

/// Reads one wire token at a time from a byte slice.
///
/// The header is validated on construction; afterwards the cursor sits on
/// the first body tag. Padding bytes are skipped transparently, as is the
/// legacy `VerifyObjectCount` tag together with its varint payload. Tags
/// newer than the negotiated version fail as unhandled.
pub struct TagStreamReader<'a> {
    r: Reader<'a>,
    version: u32,
    features: FeatureSet,
}

impl<'a> TagStreamReader<'a> {
    /// Validates the header and positions the reader on the first body
    /// tag. Decoding accepts every optional feature by default.
    pub fn new(data: &'a [u8]) -> Result<TagStreamReader<'a>, DecodeError> {
        TagStreamReader::with_features(data, FeatureSet::ALL)
    }

    /// Like [`TagStreamReader::new`] with an explicit feature set; tags and
    /// subtags requiring a disabled feature are rejected.
    pub fn with_features(
        data: &'a [u8],
        features: FeatureSet,
    ) -> Result<TagStreamReader<'a>, DecodeError> {
        let mut stream = TagStreamReader {
            r: Reader::new(data),
            version: LATEST_VERSION,
            features,
        };
        stream.read_header()?;
        Ok(stream)
    }

    fn read_header(&mut self) -> Result<(), DecodeError> {
        let offset = self.r.x;
        match self.r.try_u8() {
            Ok(byte) if byte == SerializationTag::Version.byte() => {}
            Ok(byte) => {
                return Err(DecodeError::HeaderInvalid {
                    offset,
                    reason: format!("expected version tag 0xff, found 0x{byte:02x}"),
                })
            }
            Err(_) => {
                return Err(DecodeError::HeaderInvalid {
                    offset,
                    reason: "empty input".into(),
                })
            }
        }
        let offset = self.r.x;
        let version = self.read_varint()?;
        if !(u64::from(MINIMUM_VERSION)..=u64::from(LATEST_VERSION)).contains(&version) {
            return Err(DecodeError::HeaderInvalid {
                offset,
                reason: format!("unsupported format version {version}"),
            });
        }
        self.version = version as u32;
        Ok(())
    }

    /// Current byte offset in the input.
    pub fn pos(&self) -> usize {
        self.r.x
    }

    /// The format version negotiated from the header.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn features(&self) -> FeatureSet {
        self.features
    }

    /// True once every input byte has been consumed.
    pub fn at_end(&self) -> bool {
        self.r.is_empty()
    }

    fn short(&self, needed: usize) -> DecodeError {
        DecodeError::ShortBuffer {
            offset: self.r.x,
            needed,
            available: self.r.remaining(),
        }
    }

    fn varint_error(&self, e: BufferError) -> DecodeError {
        match e {
            BufferError::VarintTooLong => DecodeError::MalformedVarint { offset: self.r.x },
            _ => self.short(1),
        }
    }

    /// Reads the next tag, skipping padding and legacy count checks.
    pub fn read_tag(&mut self) -> Result<SerializationTag, DecodeError> {
        self.read_tag_for("value")
    }

    fn read_tag_for(&mut self, context: &'static str) -> Result<SerializationTag, DecodeError> {
        loop {
            let offset = self.r.x;
            let byte = self.r.try_u8().map_err(|_| self.short(1))?;
            if byte == SerializationTag::Padding.byte() {
                continue;
            }
            if byte == SerializationTag::VerifyObjectCount.byte() {
                // Previously used for sanity checks; the count is ignored.
                self.read_varint()?;
                continue;
            }
            let Some(tag) = SerializationTag::from_byte(byte) else {
                return Err(DecodeError::UnhandledTag {
                    offset,
                    byte,
                    version: self.version,
                    context,
                });
            };
            if tag.minimum_version() > self.version {
                return Err(DecodeError::UnhandledTag {
                    offset,
                    byte,
                    version: self.version,
                    context,
                });
            }
            return Ok(tag);
        }
    }

    /// Reads the next tag and requires it to be a member of `constraint`.
    pub fn read_tag_in(
        &mut self,
        constraint: &TagConstraint,
    ) -> Result<SerializationTag, DecodeError> {
        let offset = self.r.x;
        let tag = self.read_tag_for(constraint.name)?;
        if !constraint.contains(tag) {
            return Err(DecodeError::UnhandledTag {
                offset,
                byte: tag.byte(),
                version: self.version,
                context: constraint.name,
            });
        }
        Ok(tag)
    }

    /// Reads the next tag and requires it to be exactly `want`.
    pub fn expect_tag(
        &mut self,
        want: SerializationTag,
        context: &'static str,
    ) -> Result<(), DecodeError> {
        let offset = self.r.x;
        let tag = self.read_tag_for(context)?;
        if tag != want {
            return Err(DecodeError::UnhandledTag {
                offset,
                byte: tag.byte(),
                version: self.version,
                context,
            });
        }
        Ok(())
    }

    /// The next tag without consuming it, looking through padding.
    /// `None` at end of input or on a byte that is not a tag.
    pub fn peek_tag(&self) -> Option<SerializationTag> {
        let mut ahead = 0;
        loop {
            let byte = self.r.try_peek_at(ahead).ok()?;
            if byte == SerializationTag::Padding.byte() {
                ahead += 1;
                continue;
            }
            return SerializationTag::from_byte(byte);
        }
    }

    /// Reads an unsigned varint.
    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        self.r.try_varint().map_err(|e| self.varint_error(e))
    }

    /// Reads an unsigned varint that must fit 32 bits.
    pub fn read_varint_u32(&mut self) -> Result<u32, DecodeError> {
        let offset = self.r.x;
        let value = self.read_varint()?;
        u32::try_from(value).map_err(|_| DecodeError::MalformedVarint { offset })
    }

    /// Reads a zig-zag signed varint.
    pub fn read_zigzag(&mut self) -> Result<i64, DecodeError> {
        self.r.try_zigzag().map_err(|e| self.varint_error(e))
    }

    /// Reads an Int32 payload (zig-zag varint within the i32 range).
    pub fn read_int32(&mut self) -> Result<i32, DecodeError> {
        let offset = self.r.x;
        let value = self.read_zigzag()?;
        i32::try_from(value).map_err(|_| DecodeError::MalformedVarint { offset })
    }

    /// Reads an 8-byte little-endian double.
    pub fn read_double(&mut self) -> Result<f64, DecodeError> {
        self.r.try_f64().map_err(|_| self.short(8))
    }

    /// Reads `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.r.try_bytes(n).map_err(|_| self.short(n))
    }

    fn read_body_length(&mut self) -> Result<usize, DecodeError> {
        let offset = self.r.x;
        let length = self.read_varint()?;
        if length > MAX_STRING_BYTE_LENGTH {
            return Err(DecodeError::StringTooLong {
                offset,
                byte_length: length,
            });
        }
        Ok(length as usize)
    }

    /// Reads the body of the given string tag.
    pub fn read_string_body(&mut self, tag: SerializationTag) -> Result<JsString, DecodeError> {
        match tag {
            SerializationTag::OneByteString => {
                let length = self.read_body_length()?;
                let bytes = self.read_bytes(length)?;
                // Latin-1: each byte is the identical code point.
                let value: String = bytes.iter().map(|&b| b as char).collect();
                Ok(JsString::with_wire_form(value, StringEncoding::OneByte))
            }
            SerializationTag::TwoByteString => {
                let length = self.read_body_length()?;
                if length % 2 != 0 {
                    return Err(DecodeError::InvalidString {
                        offset: self.r.x,
                        what: "odd-length utf-16",
                    });
                }
                let offset = self.r.x;
                let bytes = self.read_bytes(length)?;
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                let value = String::from_utf16(&units).map_err(|_| DecodeError::InvalidString {
                    offset,
                    what: "utf-16",
                })?;
                Ok(JsString::with_wire_form(value, StringEncoding::TwoByte))
            }
            SerializationTag::Utf8String => {
                let length = self.read_body_length()?;
                let offset = self.r.x;
                let bytes = self.read_bytes(length)?;
                let value =
                    std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidString {
                        offset,
                        what: "utf-8",
                    })?;
                Ok(JsString::with_wire_form(value, StringEncoding::Utf8))
            }
            _ => Err(DecodeError::UnhandledTag {
                offset: self.r.x,
                byte: tag.byte(),
                version: self.version,
                context: "string",
            }),
        }
    }

    /// Reads a BigInt payload: a varint bitfield carrying the sign bit and
    /// a 30-bit byte count, then the little-endian magnitude.
    pub fn read_bigint_body(&mut self) -> Result<JsBigInt, DecodeError> {
        let offset = self.r.x;
        let bitfield = self.read_varint()?;
        let negative = bitfield & 1 != 0;
        let byte_length = bitfield >> 1;
        if byte_length > crate::constants::MAX_BIGINT_BYTE_LENGTH {
            return Err(DecodeError::BigIntTooLarge {
                offset,
                byte_length,
            });
        }
        let magnitude = self.read_bytes(byte_length as usize)?.to_vec();
        Ok(JsBigInt::new(negative, magnitude))
    }

    /// Reads an error-body subtag (written as a varint).
    pub fn read_error_tag(&mut self) -> Result<ErrorTag, DecodeError> {
        let offset = self.r.x;
        let code = self.read_varint()?;
        u8::try_from(code)
            .ok()
            .and_then(ErrorTag::from_byte)
            .ok_or(DecodeError::UnhandledTag {
                offset,
                byte: (code & 0xff) as u8,
                version: self.version,
                context: "error body",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_required() {
        assert!(matches!(
            TagStreamReader::new(&[]),
            Err(DecodeError::HeaderInvalid { .. })
        ));
        assert!(matches!(
            TagStreamReader::new(&[0x00, 0x01]),
            Err(DecodeError::HeaderInvalid { .. })
        ));
    }

    #[test]
    fn header_version_range() {
        assert_eq!(TagStreamReader::new(&[0xff, 0x0f]).unwrap().version(), 15);
        assert_eq!(TagStreamReader::new(&[0xff, 0x0d]).unwrap().version(), 13);
        assert!(matches!(
            TagStreamReader::new(&[0xff, 0x10]),
            Err(DecodeError::HeaderInvalid { .. })
        ));
        assert!(matches!(
            TagStreamReader::new(&[0xff, 0x0c]),
            Err(DecodeError::HeaderInvalid { .. })
        ));
    }

    #[test]
    fn padding_is_skipped_between_tokens() {
        let mut stream = TagStreamReader::new(&[0xff, 0x0f, 0x00, 0x00, b'T']).unwrap();
        assert_eq!(stream.read_tag(), Ok(SerializationTag::True));
    }

    #[test]
    fn verify_object_count_is_consumed_and_ignored() {
        let mut stream = TagStreamReader::new(&[0xff, 0x0f, b'?', 0xac, 0x02, b'0']).unwrap();
        assert_eq!(stream.read_tag(), Ok(SerializationTag::Null));
    }

    #[test]
    fn unknown_byte_is_unhandled_with_position() {
        let mut stream = TagStreamReader::new(&[0xff, 0x0f, 0x01]).unwrap();
        match stream.read_tag() {
            Err(DecodeError::UnhandledTag { offset, byte, .. }) => {
                assert_eq!(offset, 2);
                assert_eq!(byte, 0x01);
            }
            other => panic!("expected UnhandledTag, got {other:?}"),
        }
    }

    #[test]
    fn version_gated_tag_is_unhandled_below_its_version() {
        // ResizableArrayBuffer ('~') requires version 15.
        let mut stream = TagStreamReader::new(&[0xff, 0x0e, b'~']).unwrap();
        assert!(matches!(
            stream.read_tag(),
            Err(DecodeError::UnhandledTag { byte: 0x7e, version: 14, .. })
        ));
    }

    #[test]
    fn one_byte_string_body() {
        let mut data = vec![0xff, 0x0f];
        data.extend([0x0b]);
        data.extend(b"Hello World");
        let mut stream = TagStreamReader::new(&data).unwrap();
        let s = stream.read_string_body(SerializationTag::OneByteString).unwrap();
        assert_eq!(s.as_str(), "Hello World");
        assert_eq!(s.wire_form(), Some(StringEncoding::OneByte));
    }

    #[test]
    fn two_byte_string_must_be_even() {
        let mut stream = TagStreamReader::new(&[0xff, 0x0f, 0x03, 0x61, 0x00, 0x62]).unwrap();
        assert!(matches!(
            stream.read_string_body(SerializationTag::TwoByteString),
            Err(DecodeError::InvalidString { what: "odd-length utf-16", .. })
        ));
    }

    #[test]
    fn unpaired_surrogate_is_invalid_utf16() {
        // 0xD800 with no low surrogate following.
        let mut stream = TagStreamReader::new(&[0xff, 0x0f, 0x02, 0x00, 0xd8]).unwrap();
        assert!(matches!(
            stream.read_string_body(SerializationTag::TwoByteString),
            Err(DecodeError::InvalidString { what: "utf-16", .. })
        ));
    }

    #[test]
    fn bigint_body_sign_and_magnitude() {
        // bitfield = (2 << 1) | 1 = 5, magnitude 0x2a 0x00
        let mut stream = TagStreamReader::new(&[0xff, 0x0f, 0x05, 0x2a, 0x00]).unwrap();
        let big = stream.read_bigint_body().unwrap();
        assert!(big.is_negative());
        assert_eq!(big.to_i128(), Some(-42));
    }

    #[test]
    fn truncated_varint_is_short_buffer() {
        let mut stream = TagStreamReader::new(&[0xff, 0x0f, 0x80]).unwrap();
        assert!(matches!(
            stream.read_varint(),
            Err(DecodeError::ShortBuffer { .. })
        ));
    }

    #[test]
    fn overlong_varint_is_malformed() {
        let mut data = vec![0xff, 0x0f];
        data.extend([0x80u8; 11]);
        let mut stream = TagStreamReader::new(&data).unwrap();
        assert!(matches!(
            stream.read_varint(),
            Err(DecodeError::MalformedVarint { .. })
        ));
    }

    #[test]
    fn peek_sees_through_padding() {
        let stream = TagStreamReader::new(&[0xff, 0x0f, 0x00, b'V']).unwrap();
        assert_eq!(stream.peek_tag(), Some(SerializationTag::ArrayBufferView));
    }
}
