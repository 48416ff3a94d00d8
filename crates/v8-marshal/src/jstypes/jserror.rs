//! JavaScript Error values.

use crate::constants::JsErrorName;
use crate::jstypes::value::JsValue;

/// A JavaScript Error.
///
/// Only the fields V8 serializes survive: the name (restricted to the
/// fixed set, anything else collapses to `Error`), message, stack, and
/// cause. The cause is a full value and may reference the error itself.
#[derive(Debug, Clone, Default)]
pub struct JsError {
    pub name: JsErrorName,
    pub message: Option<String>,
    pub stack: Option<String>,
    pub cause: Option<JsValue>,
}

impl JsError {
    pub fn new(name: JsErrorName) -> JsError {
        JsError {
            name,
            ..JsError::default()
        }
    }

    pub fn with_message(name: JsErrorName, message: impl Into<String>) -> JsError {
        JsError {
            name,
            message: Some(message.into()),
            ..JsError::default()
        }
    }
}
