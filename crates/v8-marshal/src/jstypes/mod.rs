//! The in-memory value model: semantic containers preserving the
//! JavaScript-observable behavior of the values this format carries —
//! insertion-ordered objects and maps, sparse arrays with real holes,
//! SameValueZero sets, wire-form-aware strings, buffers and views.

mod array;
mod bigint;
mod buffers;
mod date;
mod equality;
mod jserror;
mod map;
mod object;
mod primitive;
mod regexp;
mod set;
mod string;
mod value;

pub use array::JsArray;
pub use bigint::JsBigInt;
pub use buffers::{JsArrayBuffer, JsArrayBufferTransfer, JsArrayBufferView, JsSharedArrayBuffer};
pub use date::JsDate;
pub use equality::{same_value_zero, value_eq};
pub use jserror::JsError;
pub use map::JsMap;
pub use object::{canonical_numeric_index, JsObject, PropertyKey};
pub use primitive::JsPrimitiveObject;
pub use regexp::{IncompatibleRegExpFlags, JsRegExp};
pub use set::JsSet;
pub use string::{JsString, StringEncoding};
pub use value::{JsHostObject, JsSharedObject, JsValue};

pub(crate) use buffers::check_view_range;
