//! Constant values of the V8 serialization format: tag bytes, typed-array
//! view subtags, error subtags, regexp flag bits, and the feature/version
//! gating tables.

use std::fmt;

/// The newest format version this implementation reads and writes.
pub const LATEST_VERSION: u32 = 15;

/// The oldest format version accepted. Version 13 introduced host objects
/// and is the floor used by every runtime still producing this format.
pub const MINIMUM_VERSION: u32 = 13;

/// The format version that introduced the view flags field on
/// ArrayBufferView tokens.
pub const VIEW_FLAGS_VERSION: u32 = 14;

/// One larger than the maximum integer index of a JavaScript array.
/// Integer-looking keys at or past this value are stored as string names.
pub const MAX_ARRAY_LENGTH: u64 = (1 << 32) - 1;

/// Inclusive bounds of integers a 64-bit float represents exactly
/// (`Number.MIN_SAFE_INTEGER` / `Number.MAX_SAFE_INTEGER`).
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;
pub const MIN_SAFE_INTEGER: i64 = -MAX_SAFE_INTEGER;

/// Cap on a single string body, in bytes. Wire lengths are 32-bit.
pub const MAX_STRING_BYTE_LENGTH: u64 = u32::MAX as u64;

/// Cap on a BigInt magnitude, in bytes. The BigInt bitfield reserves
/// 30 bits for the byte length.
pub const MAX_BIGINT_BYTE_LENGTH: u64 = (1 << 30) - 1;

/// 1-byte tags identifying the type of the next value on the wire.
///
/// The byte values are V8's `SerializationTag` table; most are mnemonic
/// ASCII characters. The `LegacyReserved*` tags were used by Chromium
/// before format version 13 and are never produced, but stay reserved so
/// old data cannot misparse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SerializationTag {
    /// 0xFF, followed by varint format version. Only valid at offset 0.
    Version = 0xff,
    /// Skipped wherever it appears; used to align TwoByteString bodies.
    Padding = 0x00,
    /// Legacy count-check tag; its varint payload is read and ignored.
    VerifyObjectCount = b'?',
    /// An absent array slot (distinct from `undefined`).
    TheHole = b'-',
    Undefined = b'_',
    Null = b'0',
    True = b'T',
    False = b'F',
    /// Payload: zig-zag varint.
    Int32 = b'I',
    /// Payload: varint.
    Uint32 = b'U',
    /// Payload: 8-byte little-endian IEEE-754.
    Double = b'N',
    /// Payload: varint bitfield (sign | byte_length << 1), then magnitude
    /// bytes little-endian.
    BigInt = b'Z',
    /// Payload: varint byte length, then UTF-8 bytes. Decode-only for new
    /// output.
    Utf8String = b'S',
    /// Payload: varint byte length, then Latin-1 bytes.
    OneByteString = b'"',
    /// Payload: varint byte length (must be even), then UTF-16-LE units.
    TwoByteString = b'c',
    /// Back-reference to an already-seen value. Payload: varint id.
    ObjectReference = b'^',
    BeginJsObject = b'o',
    /// Trailer: varint property count.
    EndJsObject = b'{',
    /// Opener payload: varint length.
    BeginSparseJsArray = b'a',
    /// Trailer: varint property count, varint length.
    EndSparseJsArray = b'@',
    /// Opener payload: varint length, then that many elements.
    BeginDenseJsArray = b'A',
    /// Trailer: varint property count, varint length.
    EndDenseJsArray = b'$',
    /// Payload: 8-byte little-endian double, milliseconds since epoch.
    Date = b'D',
    TrueObject = b'y',
    FalseObject = b'x',
    /// Payload: double.
    NumberObject = b'n',
    /// Payload: BigInt bitfield + magnitude.
    BigIntObject = b'z',
    /// Payload: varint byte length + UTF-8 bytes.
    StringObject = b's',
    /// Payload: source string token, then varint flag bitfield.
    RegExp = b'R',
    BeginJsMap = b';',
    /// Trailer: varint count of keys plus values (2x the entry count).
    EndJsMap = b':',
    BeginJsSet = b'\'',
    /// Trailer: varint element count.
    EndJsSet = b',',
    /// Payload: varint byte length, then raw bytes.
    ArrayBuffer = b'B',
    /// Payload: varint byte length, varint max byte length, then raw bytes.
    ResizableArrayBuffer = b'~',
    /// Payload: varint transfer id.
    ArrayBufferTransfer = b't',
    /// Must directly follow an ArrayBuffer or an ObjectReference to one.
    /// Payload: subtag byte, varint byte offset, varint byte length,
    /// varint flags (version >= 14).
    ArrayBufferView = b'V',
    /// Payload: varint transfer id into the caller's shared-buffer table.
    SharedArrayBuffer = b'u',
    /// A heap value shared across isolates. Payload: varint shared value id.
    SharedObject = b'p',
    WasmModuleTransfer = b'w',
    /// Escape hatch to the embedder's own wire format.
    HostObject = b'\\',
    WasmMemoryTransfer = b'm',
    /// Payload: error subtag sequence terminated by `ErrorTag::End`.
    Error = b'r',
    LegacyReservedMessagePort = b'M',
    LegacyReservedBlob = b'b',
    LegacyReservedBlobIndex = b'i',
    LegacyReservedFile = b'f',
    LegacyReservedFileIndex = b'e',
    LegacyReservedDomFileSystem = b'd',
    LegacyReservedFileList = b'l',
    LegacyReservedFileListIndex = b'L',
    LegacyReservedImageData = b'#',
    LegacyReservedImageBitmap = b'g',
    LegacyReservedImageBitmapTransfer = b'G',
    LegacyReservedOffscreenCanvas = b'H',
    LegacyReservedCryptoKey = b'K',
    LegacyReservedRtcCertificate = b'k',
}

impl SerializationTag {
    /// Classifies a raw byte as a tag.
    pub fn from_byte(byte: u8) -> Option<SerializationTag> {
        use SerializationTag::*;
        Some(match byte {
            0xff => Version,
            0x00 => Padding,
            b'?' => VerifyObjectCount,
            b'-' => TheHole,
            b'_' => Undefined,
            b'0' => Null,
            b'T' => True,
            b'F' => False,
            b'I' => Int32,
            b'U' => Uint32,
            b'N' => Double,
            b'Z' => BigInt,
            b'S' => Utf8String,
            b'"' => OneByteString,
            b'c' => TwoByteString,
            b'^' => ObjectReference,
            b'o' => BeginJsObject,
            b'{' => EndJsObject,
            b'a' => BeginSparseJsArray,
            b'@' => EndSparseJsArray,
            b'A' => BeginDenseJsArray,
            b'$' => EndDenseJsArray,
            b'D' => Date,
            b'y' => TrueObject,
            b'x' => FalseObject,
            b'n' => NumberObject,
            b'z' => BigIntObject,
            b's' => StringObject,
            b'R' => RegExp,
            b';' => BeginJsMap,
            b':' => EndJsMap,
            b'\'' => BeginJsSet,
            b',' => EndJsSet,
            b'B' => ArrayBuffer,
            b'~' => ResizableArrayBuffer,
            b't' => ArrayBufferTransfer,
            b'V' => ArrayBufferView,
            b'u' => SharedArrayBuffer,
            b'p' => SharedObject,
            b'w' => WasmModuleTransfer,
            b'\\' => HostObject,
            b'm' => WasmMemoryTransfer,
            b'r' => Error,
            b'M' => LegacyReservedMessagePort,
            b'b' => LegacyReservedBlob,
            b'i' => LegacyReservedBlobIndex,
            b'f' => LegacyReservedFile,
            b'e' => LegacyReservedFileIndex,
            b'd' => LegacyReservedDomFileSystem,
            b'l' => LegacyReservedFileList,
            b'L' => LegacyReservedFileListIndex,
            b'#' => LegacyReservedImageData,
            b'g' => LegacyReservedImageBitmap,
            b'G' => LegacyReservedImageBitmapTransfer,
            b'H' => LegacyReservedOffscreenCanvas,
            b'K' => LegacyReservedCryptoKey,
            b'k' => LegacyReservedRtcCertificate,
            _ => return None,
        })
    }

    /// The raw byte value of the tag.
    #[inline]
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// The lowest format version in which this tag may appear.
    pub fn minimum_version(self) -> u32 {
        match self {
            SerializationTag::ResizableArrayBuffer => 15,
            _ => MINIMUM_VERSION,
        }
    }
}

/// Subtag byte selecting an ArrayBufferView's element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ArrayBufferViewTag {
    Int8Array = b'b',
    Uint8Array = b'B',
    Uint8ClampedArray = b'C',
    Int16Array = b'w',
    Uint16Array = b'W',
    Int32Array = b'd',
    Uint32Array = b'D',
    Float16Array = b'h',
    Float32Array = b'f',
    Float64Array = b'F',
    BigInt64Array = b'q',
    BigUint64Array = b'Q',
    DataView = b'?',
}

impl ArrayBufferViewTag {
    pub fn from_byte(byte: u8) -> Option<ArrayBufferViewTag> {
        use ArrayBufferViewTag::*;
        Some(match byte {
            b'b' => Int8Array,
            b'B' => Uint8Array,
            b'C' => Uint8ClampedArray,
            b'w' => Int16Array,
            b'W' => Uint16Array,
            b'd' => Int32Array,
            b'D' => Uint32Array,
            b'h' => Float16Array,
            b'f' => Float32Array,
            b'F' => Float64Array,
            b'q' => BigInt64Array,
            b'Q' => BigUint64Array,
            b'?' => DataView,
            _ => return None,
        })
    }

    #[inline]
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Size in bytes of one element of this view kind.
    pub fn element_size(self) -> u32 {
        use ArrayBufferViewTag::*;
        match self {
            Int8Array | Uint8Array | Uint8ClampedArray | DataView => 1,
            Int16Array | Uint16Array | Float16Array => 2,
            Int32Array | Uint32Array | Float32Array => 4,
            Float64Array | BigInt64Array | BigUint64Array => 8,
        }
    }
}

/// Bits of the ArrayBufferView flags varint (format version >= 14).
pub mod view_flags {
    /// The view derives its length from the backing buffer at access time.
    pub const IS_LENGTH_TRACKING: u32 = 1;
    /// The backing buffer is resizable.
    pub const IS_BUFFER_RESIZABLE: u32 = 2;
    /// Every assigned bit.
    pub const ALL: u32 = IS_LENGTH_TRACKING | IS_BUFFER_RESIZABLE;
}

/// Subtags of an Error body. Each is written as a varint; the sequence is
/// terminated by [`ErrorTag::End`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorTag {
    /// The error is an EvalError. No accompanying data.
    EvalErrorPrototype = b'E',
    /// The error is a RangeError. No accompanying data.
    RangeErrorPrototype = b'R',
    /// The error is a ReferenceError. No accompanying data.
    ReferenceErrorPrototype = b'F',
    /// The error is a SyntaxError. No accompanying data.
    SyntaxErrorPrototype = b'S',
    /// The error is a TypeError. No accompanying data.
    TypeErrorPrototype = b'T',
    /// The error is a URIError. No accompanying data.
    UriErrorPrototype = b'U',
    /// Followed by a string token: the message.
    Message = b'm',
    /// Followed by a full value: the cause.
    Cause = b'c',
    /// Followed by a string token: the stack.
    Stack = b's',
    /// Terminates the error body.
    End = b'.',
}

impl ErrorTag {
    pub fn from_byte(byte: u8) -> Option<ErrorTag> {
        use ErrorTag::*;
        Some(match byte {
            b'E' => EvalErrorPrototype,
            b'R' => RangeErrorPrototype,
            b'F' => ReferenceErrorPrototype,
            b'S' => SyntaxErrorPrototype,
            b'T' => TypeErrorPrototype,
            b'U' => UriErrorPrototype,
            b'm' => Message,
            b'c' => Cause,
            b's' => Stack,
            b'.' => End,
            _ => return None,
        })
    }

    #[inline]
    pub fn byte(self) -> u8 {
        self as u8
    }
}

/// The `.name` values an Error survives serialization with. Anything else
/// collapses to plain `Error` on read, matching V8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JsErrorName {
    #[default]
    Error,
    EvalError,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
    UriError,
}

impl JsErrorName {
    pub fn as_str(self) -> &'static str {
        match self {
            JsErrorName::Error => "Error",
            JsErrorName::EvalError => "EvalError",
            JsErrorName::RangeError => "RangeError",
            JsErrorName::ReferenceError => "ReferenceError",
            JsErrorName::SyntaxError => "SyntaxError",
            JsErrorName::TypeError => "TypeError",
            JsErrorName::UriError => "UriError",
        }
    }

    /// The name that survives a serialization round-trip for `name`.
    pub fn for_name(name: &str) -> JsErrorName {
        match name {
            "EvalError" => JsErrorName::EvalError,
            "RangeError" => JsErrorName::RangeError,
            "ReferenceError" => JsErrorName::ReferenceError,
            "SyntaxError" => JsErrorName::SyntaxError,
            "TypeError" => JsErrorName::TypeError,
            "UriError" => JsErrorName::UriError,
            _ => JsErrorName::Error,
        }
    }

    /// The prototype subtag for this name; `None` for plain `Error`, which
    /// is the default and carries no subtag.
    pub fn error_tag(self) -> Option<ErrorTag> {
        match self {
            JsErrorName::Error => None,
            JsErrorName::EvalError => Some(ErrorTag::EvalErrorPrototype),
            JsErrorName::RangeError => Some(ErrorTag::RangeErrorPrototype),
            JsErrorName::ReferenceError => Some(ErrorTag::ReferenceErrorPrototype),
            JsErrorName::SyntaxError => Some(ErrorTag::SyntaxErrorPrototype),
            JsErrorName::TypeError => Some(ErrorTag::TypeErrorPrototype),
            JsErrorName::UriError => Some(ErrorTag::UriErrorPrototype),
        }
    }

    /// The name selected by a prototype subtag.
    pub fn for_error_tag(tag: ErrorTag) -> Option<JsErrorName> {
        Some(match tag {
            ErrorTag::EvalErrorPrototype => JsErrorName::EvalError,
            ErrorTag::RangeErrorPrototype => JsErrorName::RangeError,
            ErrorTag::ReferenceErrorPrototype => JsErrorName::ReferenceError,
            ErrorTag::SyntaxErrorPrototype => JsErrorName::SyntaxError,
            ErrorTag::TypeErrorPrototype => JsErrorName::TypeError,
            ErrorTag::UriErrorPrototype => JsErrorName::UriError,
            _ => return None,
        })
    }
}

impl fmt::Display for JsErrorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// V8's bit assignment for JavaScript RegExp flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegExpFlags(u32);

impl RegExpFlags {
    pub const GLOBAL: RegExpFlags = RegExpFlags(1 << 0); // g
    pub const IGNORE_CASE: RegExpFlags = RegExpFlags(1 << 1); // i
    pub const MULTILINE: RegExpFlags = RegExpFlags(1 << 2); // m
    pub const STICKY: RegExpFlags = RegExpFlags(1 << 3); // y
    pub const UNICODE: RegExpFlags = RegExpFlags(1 << 4); // u
    pub const DOT_ALL: RegExpFlags = RegExpFlags(1 << 5); // s
    pub const LINEAR: RegExpFlags = RegExpFlags(1 << 6); // l
    pub const HAS_INDICES: RegExpFlags = RegExpFlags(1 << 7); // d
    pub const UNICODE_SETS: RegExpFlags = RegExpFlags(1 << 8); // v

    const CANONICAL_MASK: u32 = 0x1ff;

    pub const fn empty() -> RegExpFlags {
        RegExpFlags(0)
    }

    /// Wraps raw wire bits, keeping unassigned bits as-is.
    pub const fn from_bits(bits: u32) -> RegExpFlags {
        RegExpFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: RegExpFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The flags with unassigned bits cleared.
    pub const fn canonical(self) -> RegExpFlags {
        RegExpFlags(self.0 & Self::CANONICAL_MASK)
    }

    /// Parses a flag-letter string such as `"gi"` or `"v"`.
    pub fn from_letters(letters: &str) -> Option<RegExpFlags> {
        let mut flags = RegExpFlags::empty();
        for c in letters.chars() {
            flags |= match c {
                'g' => Self::GLOBAL,
                'i' => Self::IGNORE_CASE,
                'm' => Self::MULTILINE,
                'y' => Self::STICKY,
                'u' => Self::UNICODE,
                's' => Self::DOT_ALL,
                'l' => Self::LINEAR,
                'd' => Self::HAS_INDICES,
                'v' => Self::UNICODE_SETS,
                _ => return None,
            };
        }
        Some(flags)
    }
}

impl std::ops::BitOr for RegExpFlags {
    type Output = RegExpFlags;
    fn bitor(self, rhs: RegExpFlags) -> RegExpFlags {
        RegExpFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for RegExpFlags {
    fn bitor_assign(&mut self, rhs: RegExpFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for RegExpFlags {
    /// Renders the canonical flag letters in JavaScript's conventional order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, c) in [
            (Self::HAS_INDICES, 'd'),
            (Self::GLOBAL, 'g'),
            (Self::IGNORE_CASE, 'i'),
            (Self::LINEAR, 'l'),
            (Self::MULTILINE, 'm'),
            (Self::DOT_ALL, 's'),
            (Self::UNICODE, 'u'),
            (Self::UNICODE_SETS, 'v'),
            (Self::STICKY, 'y'),
        ] {
            if self.contains(flag) {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

/// Format changes that shipped within format version 15 without a version
/// bump. Data written with a feature enabled cannot be read by runtimes
/// predating that feature, so encoding fails closed unless the feature is
/// switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SerializationFeature {
    /// The `v` (UnicodeSets) RegExp flag bit.
    RegExpUnicodeSets,
    /// The ResizableArrayBuffer tag and the length-tracking /
    /// backed-by-resizable view flags.
    ResizableArrayBuffers,
    /// Errors whose `cause` references the error itself.
    CircularErrorCause,
    /// The Float16 view subtag.
    Float16Array,
}

impl SerializationFeature {
    const fn bit(self) -> u32 {
        match self {
            SerializationFeature::RegExpUnicodeSets => 1,
            SerializationFeature::ResizableArrayBuffers => 2,
            SerializationFeature::CircularErrorCause => 4,
            SerializationFeature::Float16Array => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SerializationFeature::RegExpUnicodeSets => "RegExpUnicodeSets",
            SerializationFeature::ResizableArrayBuffers => "ResizableArrayBuffers",
            SerializationFeature::CircularErrorCause => "CircularErrorCause",
            SerializationFeature::Float16Array => "Float16Array",
        }
    }

    /// The lowest format version whose readers can understand the feature.
    pub fn required_version(self) -> u32 {
        LATEST_VERSION
    }
}

impl fmt::Display for SerializationFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An enabled set of [`SerializationFeature`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureSet(u32);

impl FeatureSet {
    /// No optional features: data readable by every runtime supporting the
    /// base format version.
    pub const MAX_COMPATIBILITY: FeatureSet = FeatureSet(0);
    /// Every feature this implementation knows.
    pub const ALL: FeatureSet = FeatureSet(0b1111);

    pub const fn contains(self, feature: SerializationFeature) -> bool {
        self.0 & feature.bit() != 0
    }

    pub const fn with(self, feature: SerializationFeature) -> FeatureSet {
        FeatureSet(self.0 | feature.bit())
    }

    pub fn insert(&mut self, feature: SerializationFeature) {
        self.0 |= feature.bit();
    }
}

impl From<SerializationFeature> for FeatureSet {
    fn from(feature: SerializationFeature) -> FeatureSet {
        FeatureSet(feature.bit())
    }
}

impl std::ops::BitOr<SerializationFeature> for FeatureSet {
    type Output = FeatureSet;
    fn bitor(self, rhs: SerializationFeature) -> FeatureSet {
        self.with(rhs)
    }
}

/// A named set of tags legal in one wire context.
pub struct TagConstraint {
    pub name: &'static str,
    pub allowed: &'static [SerializationTag],
}

impl TagConstraint {
    pub fn contains(&self, tag: SerializationTag) -> bool {
        self.allowed.contains(&tag)
    }
}

/// Tags legal as JavaScript object keys: numbers (except BigInt) and
/// strings.
pub static JS_OBJECT_KEY_TAGS: TagConstraint = TagConstraint {
    name: "object key",
    allowed: &[
        SerializationTag::Int32,
        SerializationTag::Uint32,
        SerializationTag::Double,
        SerializationTag::NumberObject,
        SerializationTag::OneByteString,
        SerializationTag::TwoByteString,
        SerializationTag::Utf8String,
        SerializationTag::StringObject,
    ],
};

/// Tags for the constant oddball values.
pub static JS_CONSTANT_TAGS: TagConstraint = TagConstraint {
    name: "constant",
    allowed: &[
        SerializationTag::TheHole,
        SerializationTag::Undefined,
        SerializationTag::Null,
        SerializationTag::True,
        SerializationTag::False,
    ],
};

/// Tags for the string wire forms.
pub static JS_STRING_TAGS: TagConstraint = TagConstraint {
    name: "string",
    allowed: &[
        SerializationTag::OneByteString,
        SerializationTag::TwoByteString,
        SerializationTag::Utf8String,
        SerializationTag::StringObject,
    ],
};

/// Tags opening one of the array-buffer family of values.
pub static JS_ARRAY_BUFFER_TAGS: TagConstraint = TagConstraint {
    name: "array buffer",
    allowed: &[
        SerializationTag::ArrayBuffer,
        SerializationTag::ResizableArrayBuffer,
        SerializationTag::SharedArrayBuffer,
        SerializationTag::ArrayBufferTransfer,
    ],
};

/// Tags for boxed primitive wrapper objects.
pub static JS_PRIMITIVE_OBJECT_TAGS: TagConstraint = TagConstraint {
    name: "primitive wrapper object",
    allowed: &[
        SerializationTag::TrueObject,
        SerializationTag::FalseObject,
        SerializationTag::NumberObject,
        SerializationTag::BigIntObject,
        SerializationTag::StringObject,
    ],
};
