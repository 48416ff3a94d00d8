//! The tagged union over every value the format can carry.

use std::cell::RefCell;
use std::rc::Rc;

use crate::constants::{MAX_SAFE_INTEGER, MIN_SAFE_INTEGER};
use crate::jstypes::array::JsArray;
use crate::jstypes::bigint::JsBigInt;
use crate::jstypes::buffers::{JsArrayBuffer, JsArrayBufferTransfer, JsArrayBufferView, JsSharedArrayBuffer};
use crate::jstypes::date::JsDate;
use crate::jstypes::jserror::JsError;
use crate::jstypes::map::JsMap;
use crate::jstypes::object::JsObject;
use crate::jstypes::primitive::JsPrimitiveObject;
use crate::jstypes::regexp::JsRegExp;
use crate::jstypes::set::JsSet;
use crate::jstypes::string::JsString;

/// A value whose representation belongs to the embedding application. The
/// payload only means something to a host-object handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsHostObject {
    pub payload: Vec<u8>,
}

/// A handle to a heap value shared between isolates inside the producing
/// engine. Only the id is observable from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsSharedObject {
    pub shared_value_id: u32,
}

/// A JavaScript value.
///
/// Composite values are reference-counted so that shared references and
/// cycles in a value graph are representable; the decoder fills such
/// containers in place. Two clones of the same `Rc` are the *same*
/// JavaScript object, and the encoder deduplicates them by pointer
/// identity.
#[derive(Debug, Clone)]
pub enum JsValue {
    Undefined,
    Null,
    /// An absent array slot. Distinct from `Undefined`.
    Hole,
    Bool(bool),
    Int32(i32),
    Uint32(u32),
    Double(f64),
    BigInt(JsBigInt),
    String(JsString),
    Date(Rc<JsDate>),
    RegExp(Rc<JsRegExp>),
    Object(Rc<RefCell<JsObject>>),
    Array(Rc<RefCell<JsArray>>),
    Map(Rc<RefCell<JsMap>>),
    Set(Rc<RefCell<JsSet>>),
    ArrayBuffer(Rc<RefCell<JsArrayBuffer>>),
    SharedArrayBuffer(Rc<JsSharedArrayBuffer>),
    ArrayBufferTransfer(Rc<JsArrayBufferTransfer>),
    ArrayBufferView(Rc<JsArrayBufferView>),
    Error(Rc<RefCell<JsError>>),
    PrimitiveObject(Rc<JsPrimitiveObject>),
    HostObject(Rc<JsHostObject>),
    SharedObject(Rc<JsSharedObject>),
}

impl JsValue {
    pub fn object(obj: JsObject) -> JsValue {
        JsValue::Object(Rc::new(RefCell::new(obj)))
    }

    pub fn array(array: JsArray) -> JsValue {
        JsValue::Array(Rc::new(RefCell::new(array)))
    }

    pub fn map(map: JsMap) -> JsValue {
        JsValue::Map(Rc::new(RefCell::new(map)))
    }

    pub fn set(set: JsSet) -> JsValue {
        JsValue::Set(Rc::new(RefCell::new(set)))
    }

    pub fn date(epoch_ms: f64) -> JsValue {
        JsValue::Date(Rc::new(JsDate::new(epoch_ms)))
    }

    pub fn regexp(regexp: JsRegExp) -> JsValue {
        JsValue::RegExp(Rc::new(regexp))
    }

    pub fn array_buffer(buffer: JsArrayBuffer) -> JsValue {
        JsValue::ArrayBuffer(Rc::new(RefCell::new(buffer)))
    }

    pub fn shared_array_buffer(buffer_id: u32) -> JsValue {
        JsValue::SharedArrayBuffer(Rc::new(JsSharedArrayBuffer { buffer_id }))
    }

    pub fn array_buffer_transfer(transfer_id: u32) -> JsValue {
        JsValue::ArrayBufferTransfer(Rc::new(JsArrayBufferTransfer { transfer_id }))
    }

    pub fn view(view: JsArrayBufferView) -> JsValue {
        JsValue::ArrayBufferView(Rc::new(view))
    }

    pub fn error(error: JsError) -> JsValue {
        JsValue::Error(Rc::new(RefCell::new(error)))
    }

    pub fn primitive_object(wrapped: JsPrimitiveObject) -> JsValue {
        JsValue::PrimitiveObject(Rc::new(wrapped))
    }

    pub fn host_object(payload: Vec<u8>) -> JsValue {
        JsValue::HostObject(Rc::new(JsHostObject { payload }))
    }

    /// A short noun for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "null",
            JsValue::Hole => "hole",
            JsValue::Bool(_) => "boolean",
            JsValue::Int32(_) | JsValue::Uint32(_) | JsValue::Double(_) => "number",
            JsValue::BigInt(_) => "bigint",
            JsValue::String(_) => "string",
            JsValue::Date(_) => "date",
            JsValue::RegExp(_) => "regexp",
            JsValue::Object(_) => "object",
            JsValue::Array(_) => "array",
            JsValue::Map(_) => "map",
            JsValue::Set(_) => "set",
            JsValue::ArrayBuffer(_) => "array buffer",
            JsValue::SharedArrayBuffer(_) => "shared array buffer",
            JsValue::ArrayBufferTransfer(_) => "array buffer transfer",
            JsValue::ArrayBufferView(_) => "array buffer view",
            JsValue::Error(_) => "error",
            JsValue::PrimitiveObject(_) => "primitive wrapper object",
            JsValue::HostObject(_) => "host object",
            JsValue::SharedObject(_) => "shared object",
        }
    }

    /// The heap address identifying this value for reference
    /// deduplication, or `None` for values that are never deduplicated
    /// (oddballs, numbers, bigints and bare strings).
    pub fn identity(&self) -> Option<usize> {
        match self {
            JsValue::Undefined
            | JsValue::Null
            | JsValue::Hole
            | JsValue::Bool(_)
            | JsValue::Int32(_)
            | JsValue::Uint32(_)
            | JsValue::Double(_)
            | JsValue::BigInt(_)
            | JsValue::String(_) => None,
            JsValue::Date(rc) => Some(Rc::as_ptr(rc) as usize),
            JsValue::RegExp(rc) => Some(Rc::as_ptr(rc) as usize),
            JsValue::Object(rc) => Some(Rc::as_ptr(rc) as usize),
            JsValue::Array(rc) => Some(Rc::as_ptr(rc) as usize),
            JsValue::Map(rc) => Some(Rc::as_ptr(rc) as usize),
            JsValue::Set(rc) => Some(Rc::as_ptr(rc) as usize),
            JsValue::ArrayBuffer(rc) => Some(Rc::as_ptr(rc) as usize),
            JsValue::SharedArrayBuffer(rc) => Some(Rc::as_ptr(rc) as usize),
            JsValue::ArrayBufferTransfer(rc) => Some(Rc::as_ptr(rc) as usize),
            JsValue::ArrayBufferView(rc) => Some(Rc::as_ptr(rc) as usize),
            JsValue::Error(rc) => Some(Rc::as_ptr(rc) as usize),
            JsValue::PrimitiveObject(rc) => Some(Rc::as_ptr(rc) as usize),
            JsValue::HostObject(rc) => Some(Rc::as_ptr(rc) as usize),
            JsValue::SharedObject(rc) => Some(Rc::as_ptr(rc) as usize),
        }
    }

    /// True for the same JavaScript object (pointer identity); always
    /// false for non-identity values.
    pub fn same_object(&self, other: &JsValue) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// The numeric value when this is one of the number representations.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Int32(v) => Some(f64::from(*v)),
            JsValue::Uint32(v) => Some(f64::from(*v)),
            JsValue::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for JsValue {
    fn from(value: bool) -> JsValue {
        JsValue::Bool(value)
    }
}

impl From<i32> for JsValue {
    fn from(value: i32) -> JsValue {
        JsValue::Int32(value)
    }
}

impl From<u32> for JsValue {
    fn from(value: u32) -> JsValue {
        JsValue::Uint32(value)
    }
}

impl From<f64> for JsValue {
    fn from(value: f64) -> JsValue {
        JsValue::Double(value)
    }
}

impl From<i64> for JsValue {
    /// Picks the narrowest wire representation: Uint32, Int32, Double for
    /// float-safe integers, BigInt beyond that.
    fn from(value: i64) -> JsValue {
        if (0..=u32::MAX as i64).contains(&value) {
            JsValue::Uint32(value as u32)
        } else if (i32::MIN as i64..0).contains(&value) {
            JsValue::Int32(value as i32)
        } else if (MIN_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&value) {
            JsValue::Double(value as f64)
        } else {
            JsValue::BigInt(JsBigInt::from_i64(value))
        }
    }
}

impl From<&str> for JsValue {
    fn from(value: &str) -> JsValue {
        JsValue::String(JsString::new(value))
    }
}

impl From<String> for JsValue {
    fn from(value: String) -> JsValue {
        JsValue::String(JsString::new(value))
    }
}

impl From<JsString> for JsValue {
    fn from(value: JsString) -> JsValue {
        JsValue::String(value)
    }
}

impl From<JsBigInt> for JsValue {
    fn from(value: JsBigInt) -> JsValue {
        JsValue::BigInt(value)
    }
}
