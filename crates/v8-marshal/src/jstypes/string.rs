//! JavaScript string values with their wire form remembered.

use std::fmt;

/// The three string body encodings that exist on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringEncoding {
    /// Latin-1, one byte per code point.
    OneByte,
    /// UTF-16 little-endian code units.
    TwoByte,
    /// UTF-8 (accepted on read, never preferred for new output).
    Utf8,
}

/// A JavaScript string.
///
/// Content equality compares decoded code points; the wire form the string
/// was read with is carried alongside so a decode → encode round-trip can
/// reproduce the original bytes when the content still fits that form.
#[derive(Debug, Clone)]
pub struct JsString {
    value: String,
    wire_form: Option<StringEncoding>,
}

impl JsString {
    pub fn new(value: impl Into<String>) -> JsString {
        JsString {
            value: value.into(),
            wire_form: None,
        }
    }

    /// A string decoded from the given wire form.
    pub fn with_wire_form(value: impl Into<String>, form: StringEncoding) -> JsString {
        JsString {
            value: value.into(),
            wire_form: Some(form),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }

    /// The wire form this string was decoded from, when known.
    pub fn wire_form(&self) -> Option<StringEncoding> {
        self.wire_form
    }

    /// True when every code point fits in Latin-1 (the OneByte form).
    pub fn is_latin1(&self) -> bool {
        self.value.chars().all(|c| (c as u32) <= 0xff)
    }

    pub fn len_utf16(&self) -> usize {
        self.value.encode_utf16().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl PartialEq for JsString {
    fn eq(&self, other: &JsString) -> bool {
        self.value == other.value
    }
}

impl Eq for JsString {}

impl std::hash::Hash for JsString {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl From<&str> for JsString {
    fn from(value: &str) -> JsString {
        JsString::new(value)
    }
}

impl From<String> for JsString {
    fn from(value: String) -> JsString {
        JsString::new(value)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_wire_form() {
        let a = JsString::with_wire_form("abc", StringEncoding::OneByte);
        let b = JsString::with_wire_form("abc", StringEncoding::TwoByte);
        let c = JsString::new("abc");
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, JsString::new("abd"));
    }

    #[test]
    fn latin1_detection() {
        assert!(JsString::new("Hello World").is_latin1());
        assert!(JsString::new("café\u{ff}").is_latin1());
        assert!(!JsString::new("日本語").is_latin1());
        assert!(!JsString::new("a\u{100}").is_latin1());
    }
}
