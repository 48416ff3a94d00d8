//! Error taxonomy. Every error is fatal to the current top-level call;
//! decode errors carry the source offset and encode errors the output
//! offset, along with the tag context where one exists.

use std::fmt;

use thiserror::Error;

use crate::constants::{SerializationFeature, SerializationTag};

/// Why an ArrayBufferView was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewBounds {
    /// The view's range does not fit inside the backing buffer.
    OutOfRange {
        byte_offset: u32,
        byte_length: u32,
        buffer_byte_length: u32,
    },
    /// Offset or length is not a multiple of the element size.
    Misaligned {
        byte_offset: u32,
        byte_length: u32,
        element_size: u32,
    },
    /// A length-tracking view over a non-resizable backing buffer.
    InvalidFlagCombination,
    /// A resizable buffer declaring a maximum smaller than its contents.
    MaxByteLengthBelowLength {
        byte_length: u32,
        max_byte_length: u32,
    },
}

impl fmt::Display for ViewBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewBounds::OutOfRange {
                byte_offset,
                byte_length,
                buffer_byte_length,
            } => write!(
                f,
                "range {byte_offset}+{byte_length} exceeds buffer of {buffer_byte_length} bytes"
            ),
            ViewBounds::Misaligned {
                byte_offset,
                byte_length,
                element_size,
            } => write!(
                f,
                "offset {byte_offset} / length {byte_length} not aligned to {element_size}-byte elements"
            ),
            ViewBounds::InvalidFlagCombination => {
                write!(f, "length-tracking flag without a resizable backing buffer")
            }
            ViewBounds::MaxByteLengthBelowLength {
                byte_length,
                max_byte_length,
            } => write!(
                f,
                "max byte length {max_byte_length} is below the current length {byte_length}"
            ),
        }
    }
}

/// Failure while reading serialized data. The `offset` is the position in
/// the input where the failure was detected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("invalid header at offset {offset}: {reason}")]
    HeaderInvalid { offset: usize, reason: String },

    #[error(
        "unhandled tag byte 0x{byte:02x} at offset {offset} \
         (format version {version}) while reading {context}"
    )]
    UnhandledTag {
        offset: usize,
        byte: u8,
        version: u32,
        context: &'static str,
    },

    #[error("data truncated at offset {offset}: needed {needed} bytes, {available} available")]
    ShortBuffer {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("malformed varint at offset {offset}")]
    MalformedVarint { offset: usize },

    #[error("invalid {what} string body at offset {offset}")]
    InvalidString { offset: usize, what: &'static str },

    #[error(
        "count mismatch after reading {what} at offset {offset}: \
         declared {expected}, read {actual}"
    )]
    CountMismatch {
        offset: usize,
        what: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error("reference to unresolved object id {id} at offset {offset}")]
    IllegalCyclicReference { offset: usize, id: u32 },

    #[error("array buffer view at offset {offset}: {bounds}")]
    BufferViewOutOfBounds { offset: usize, bounds: ViewBounds },

    #[error("string of {byte_length} bytes at offset {offset} exceeds the implementation cap")]
    StringTooLong { offset: usize, byte_length: u64 },

    #[error("bigint of {byte_length} bytes at offset {offset} exceeds the implementation cap")]
    BigIntTooLarge { offset: usize, byte_length: u64 },

    #[error(
        "wasm transfer at offset {offset}: wasm objects reference memory \
         only reachable inside the process that serialized them"
    )]
    UnsupportedWasm { offset: usize },

    #[error("host object at offset {offset}: {reason}")]
    HostObject { offset: usize, reason: String },

    #[error("shared array buffer transfer id {transfer_id} at offset {offset} is not registered")]
    SharedBufferUnknown { offset: usize, transfer_id: u32 },
}

impl DecodeError {
    /// The input offset the error was raised at.
    pub fn offset(&self) -> usize {
        match self {
            DecodeError::HeaderInvalid { offset, .. }
            | DecodeError::UnhandledTag { offset, .. }
            | DecodeError::ShortBuffer { offset, .. }
            | DecodeError::MalformedVarint { offset }
            | DecodeError::InvalidString { offset, .. }
            | DecodeError::CountMismatch { offset, .. }
            | DecodeError::IllegalCyclicReference { offset, .. }
            | DecodeError::BufferViewOutOfBounds { offset, .. }
            | DecodeError::StringTooLong { offset, .. }
            | DecodeError::BigIntTooLarge { offset, .. }
            | DecodeError::UnsupportedWasm { offset }
            | DecodeError::HostObject { offset, .. }
            | DecodeError::SharedBufferUnknown { offset, .. } => *offset,
        }
    }
}

/// Failure while writing a value. The `offset` is the position in the
/// output produced so far; callers discard the buffer on error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodeError {
    #[error(
        "serialization feature {feature} (format version {required_version}) is not enabled"
    )]
    FeatureNotEnabled {
        feature: SerializationFeature,
        required_version: u32,
    },

    #[error("no encode step handles a {kind} value at output offset {offset}")]
    UnhandledValue { offset: usize, kind: &'static str },

    #[error("tag {tag:?} is not legal while writing a {context} at output offset {offset}")]
    IllegalTagContext {
        offset: usize,
        tag: SerializationTag,
        context: &'static str,
    },

    #[error("array buffer view at output offset {offset}: {bounds}")]
    BufferViewOutOfBounds { offset: usize, bounds: ViewBounds },

    #[error("string of {byte_length} bytes exceeds the implementation cap")]
    StringTooLong { byte_length: u64 },

    #[error("bigint of {byte_length} bytes exceeds the implementation cap")]
    BigIntTooLarge { byte_length: u64 },

    #[error("declared format version {version} is outside the supported range")]
    UnsupportedVersion { version: u32 },

    #[error("shared array buffer transfer id {transfer_id} is not registered")]
    SharedBufferUnknown { transfer_id: u32 },
}

impl EncodeError {
    /// Shorthand for the feature-gate failure.
    pub(crate) fn feature(feature: SerializationFeature) -> EncodeError {
        EncodeError::FeatureNotEnabled {
            feature,
            required_version: feature.required_version(),
        }
    }
}
