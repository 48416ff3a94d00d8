//! Bidirectional codec for the V8 value-serialization format — the binary
//! format produced by Node.js `v8.serialize`, Deno KV, `postMessage`
//! structured clones and friends.
//!
//! The crate covers the engine's structured-clone domain: primitives,
//! strings in their three wire forms, dense and sparse arrays, plain
//! objects, maps, sets, dates, regexps, bigints, errors (with causes),
//! array buffers and views, and embedder-defined host objects. Shared
//! references and cycles round-trip with identity preserved.
//!
//! # Example
//!
//! ```
//! use v8_marshal::{decode, encode, JsValue};
//! use v8_marshal::jstypes::JsObject;
//!
//! let mut obj = JsObject::new();
//! obj.insert("greeting", "Hello World");
//! let bytes = encode(&JsValue::object(obj)).unwrap();
//! let back = decode(&bytes).unwrap();
//! assert!(matches!(back, JsValue::Object(_)));
//! ```

pub mod constants;
mod decoder;
mod encoder;
mod error;
mod host;
mod json;
pub mod jstypes;
mod references;
pub mod stream;

pub use constants::{
    ArrayBufferViewTag, ErrorTag, FeatureSet, JsErrorName, RegExpFlags, SerializationFeature,
    SerializationTag, LATEST_VERSION, MINIMUM_VERSION,
};
pub use decoder::{DecodeStep, DecodeStepRegistry, Decoder, ValueDecoder};
pub use encoder::{Encoder, ValueEncoder};
pub use error::{DecodeError, EncodeError, ViewBounds};
pub use host::{
    HostObjectHandler, NodeJsBufferHandler, RawHostObjectHandler, SharedBufferRegistry,
};
pub use json::{from_json, to_json};
pub use jstypes::JsValue;
pub use references::{IdentityMap, ReferenceTable, SerializedId};
pub use stream::{TagStreamReader, TagStreamWriter};

/// Serializes a value with the default configuration: latest format
/// version, no optional features.
pub fn encode(value: &JsValue) -> Result<Vec<u8>, EncodeError> {
    Encoder::new().encode(value)
}

/// Deserializes the first value in `data` with the default configuration:
/// all features accepted, Node.js buffer-view host objects understood.
pub fn decode(data: &[u8]) -> Result<JsValue, DecodeError> {
    Decoder::new().decode(data)
}
