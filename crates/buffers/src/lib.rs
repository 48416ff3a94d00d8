//! Byte-level buffer primitives: a cursor-tracked [`Reader`] and an
//! auto-growing [`Writer`].
//!
//! Everything here is little-endian, matching the byte order of the V8
//! serialization wire format. Multi-byte integers additionally come in
//! unsigned LEB128 (`varint`) and zig-zag signed (`zigzag`) encodings.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use thiserror::Error;

/// Maximum number of bytes a single varint may occupy (ten 7-bit groups
/// cover a full 64-bit value).
pub const MAX_VARINT_BYTES: usize = 10;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("end of buffer")]
    EndOfBuffer,
    #[error("invalid utf-8")]
    InvalidUtf8,
    #[error("varint exceeds {MAX_VARINT_BYTES} bytes")]
    VarintTooLong,
}
