//! Host objects: the format's escape hatch for embedder-defined data,
//! plus the handlers shipped with the crate and the caller-owned registry
//! backing SharedArrayBuffer transfers.

use crate::constants::{ArrayBufferViewTag, SerializationTag};
use crate::error::{DecodeError, EncodeError};
use crate::jstypes::{JsArrayBuffer, JsArrayBufferView, JsValue};
use crate::stream::{TagStreamReader, TagStreamWriter};

/// Reads and writes `HostObject` payloads.
///
/// On encode the handler is offered every value (after back-reference
/// deduplication, before the built-in dispatch); it writes the complete
/// token — the `HostObject` tag and its payload — for values it claims.
/// `claims` must agree with `encode`: a handler must not write anything
/// for a value it then declines.
///
/// On decode the handler is invoked for every `HostObject` tag and reads
/// its payload from the stream with the reader's raw primitives.
pub trait HostObjectHandler {
    /// Whether `encode` would claim this value.
    fn claims(&self, value: &JsValue) -> bool;

    /// Writes the value if claimed, returning whether it was.
    fn encode(&self, value: &JsValue, writer: &mut TagStreamWriter) -> Result<bool, EncodeError>;

    /// Reads the payload following a `HostObject` tag.
    fn decode(&self, reader: &mut TagStreamReader<'_>) -> Result<JsValue, DecodeError>;
}

/// Node.js's custom framing for ArrayBuffer views.
///
/// `v8.serialize` does not use the engine's view token; it wraps every
/// view in a `HostObject` whose payload is `varint view-code, varint byte
/// length, raw bytes`. The bytes are the window the view exposes, so the
/// decoded view always starts at offset 0 of a fresh buffer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NodeJsBufferHandler;

impl NodeJsBufferHandler {
    fn code_for(kind: ArrayBufferViewTag) -> Option<u32> {
        Some(match kind {
            ArrayBufferViewTag::Int8Array => 0,
            ArrayBufferViewTag::Uint8Array => 1,
            ArrayBufferViewTag::Uint8ClampedArray => 2,
            ArrayBufferViewTag::Int16Array => 3,
            ArrayBufferViewTag::Uint16Array => 4,
            ArrayBufferViewTag::Int32Array => 5,
            ArrayBufferViewTag::Uint32Array => 6,
            ArrayBufferViewTag::Float32Array => 7,
            ArrayBufferViewTag::Float64Array => 8,
            ArrayBufferViewTag::DataView => 9,
            ArrayBufferViewTag::BigInt64Array => 11,
            ArrayBufferViewTag::BigUint64Array => 12,
            ArrayBufferViewTag::Float16Array => return None,
        })
    }

    fn kind_for(code: u32) -> Option<ArrayBufferViewTag> {
        Some(match code {
            0 => ArrayBufferViewTag::Int8Array,
            1 => ArrayBufferViewTag::Uint8Array,
            2 => ArrayBufferViewTag::Uint8ClampedArray,
            3 => ArrayBufferViewTag::Int16Array,
            4 => ArrayBufferViewTag::Uint16Array,
            5 => ArrayBufferViewTag::Int32Array,
            6 => ArrayBufferViewTag::Uint32Array,
            7 => ArrayBufferViewTag::Float32Array,
            8 => ArrayBufferViewTag::Float64Array,
            9 => ArrayBufferViewTag::DataView,
            // FastBuffer: Node's pooled Uint8Array variant.
            10 => ArrayBufferViewTag::Uint8Array,
            11 => ArrayBufferViewTag::BigInt64Array,
            12 => ArrayBufferViewTag::BigUint64Array,
            _ => return None,
        })
    }
}

impl HostObjectHandler for NodeJsBufferHandler {
    fn claims(&self, value: &JsValue) -> bool {
        match value {
            JsValue::ArrayBufferView(view) => {
                Self::code_for(view.kind()).is_some() && view.view_data().is_some()
            }
            _ => false,
        }
    }

    fn encode(&self, value: &JsValue, writer: &mut TagStreamWriter) -> Result<bool, EncodeError> {
        let JsValue::ArrayBufferView(view) = value else {
            return Ok(false);
        };
        let Some(code) = Self::code_for(view.kind()) else {
            return Ok(false);
        };
        let Some(data) = view.view_data() else {
            return Ok(false);
        };
        writer.write_tag(SerializationTag::HostObject)?;
        writer.write_varint(u64::from(code));
        writer.write_varint(data.len() as u64);
        writer.write_bytes(&data);
        Ok(true)
    }

    fn decode(&self, reader: &mut TagStreamReader<'_>) -> Result<JsValue, DecodeError> {
        let offset = reader.pos();
        let code = reader.read_varint_u32()?;
        let Some(kind) = Self::kind_for(code) else {
            return Err(DecodeError::HostObject {
                offset,
                reason: format!("unknown Node.js buffer view code {code}"),
            });
        };
        let byte_length = reader.read_varint_u32()?;
        let offset = reader.pos();
        let data = reader.read_bytes(byte_length as usize)?.to_vec();
        let backing = JsValue::array_buffer(JsArrayBuffer::new(data));
        let view = JsArrayBufferView::new(backing, kind, 0, byte_length)
            .map_err(|bounds| DecodeError::BufferViewOutOfBounds { offset, bounds })?;
        Ok(JsValue::view(view))
    }
}

/// A minimal symmetric framing for [`JsValue::HostObject`] envelopes:
/// varint payload length, then the payload verbatim. Useful for embedders
/// that carry pre-encoded opaque data.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawHostObjectHandler;

impl HostObjectHandler for RawHostObjectHandler {
    fn claims(&self, value: &JsValue) -> bool {
        matches!(value, JsValue::HostObject(_))
    }

    fn encode(&self, value: &JsValue, writer: &mut TagStreamWriter) -> Result<bool, EncodeError> {
        let JsValue::HostObject(host) = value else {
            return Ok(false);
        };
        writer.write_tag(SerializationTag::HostObject)?;
        writer.write_varint(host.payload.len() as u64);
        writer.write_bytes(&host.payload);
        Ok(true)
    }

    fn decode(&self, reader: &mut TagStreamReader<'_>) -> Result<JsValue, DecodeError> {
        let length = reader.read_varint_u32()?;
        let payload = reader.read_bytes(length as usize)?.to_vec();
        Ok(JsValue::host_object(payload))
    }
}

/// The caller-owned table of shared / transferred buffer memory, indexed
/// by transfer id. The codec only looks ids up; the actual memory
/// exchange happens out of band.
#[derive(Debug, Default, Clone)]
pub struct SharedBufferRegistry {
    buffers: Vec<Vec<u8>>,
}

impl SharedBufferRegistry {
    pub fn new() -> SharedBufferRegistry {
        SharedBufferRegistry::default()
    }

    /// Registers a buffer, returning the transfer id that identifies it
    /// on the wire.
    pub fn register(&mut self, data: Vec<u8>) -> u32 {
        let id = self.buffers.len() as u32;
        self.buffers.push(data);
        id
    }

    pub fn get(&self, transfer_id: u32) -> Option<&[u8]> {
        self.buffers.get(transfer_id as usize).map(|b| b.as_slice())
    }

    pub fn contains(&self, transfer_id: u32) -> bool {
        (transfer_id as usize) < self.buffers.len()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_codes_round_trip() {
        for kind in [
            ArrayBufferViewTag::Int8Array,
            ArrayBufferViewTag::Uint8Array,
            ArrayBufferViewTag::DataView,
            ArrayBufferViewTag::BigUint64Array,
        ] {
            let code = NodeJsBufferHandler::code_for(kind).unwrap();
            assert_eq!(NodeJsBufferHandler::kind_for(code), Some(kind));
        }
        assert!(NodeJsBufferHandler::code_for(ArrayBufferViewTag::Float16Array).is_none());
        assert_eq!(
            NodeJsBufferHandler::kind_for(10),
            Some(ArrayBufferViewTag::Uint8Array)
        );
        assert_eq!(NodeJsBufferHandler::kind_for(13), None);
    }

    #[test]
    fn registry_ids_are_dense() {
        let mut registry = SharedBufferRegistry::new();
        assert_eq!(registry.register(vec![1]), 0);
        assert_eq!(registry.register(vec![2]), 1);
        assert!(registry.contains(1));
        assert!(!registry.contains(2));
        assert_eq!(registry.get(0), Some([1u8].as_ref()));
    }
}
