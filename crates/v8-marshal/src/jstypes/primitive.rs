//! Boxed primitive wrapper objects (`new Boolean(true)`, `new Number(5)`,
//! `Object("s")` and friends).
//!
//! Unlike bare primitives these are heap objects in JavaScript, so they
//! participate in reference identity and deduplicate on the wire.

use crate::jstypes::bigint::JsBigInt;
use crate::jstypes::string::JsString;

/// A primitive wrapped in its object form.
#[derive(Debug, Clone, PartialEq)]
pub enum JsPrimitiveObject {
    True,
    False,
    Number(f64),
    BigInt(JsBigInt),
    String(JsString),
}
