//! JavaScript regular expressions: a source pattern plus a flag bitfield.

use thiserror::Error;

use crate::constants::RegExpFlags;
use crate::jstypes::string::JsString;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("the `u` and `v` regexp flags are mutually exclusive")]
pub struct IncompatibleRegExpFlags;

/// A JavaScript RegExp.
#[derive(Debug, Clone, PartialEq)]
pub struct JsRegExp {
    source: JsString,
    flags: RegExpFlags,
}

impl JsRegExp {
    /// Builds a regexp, enforcing that `u` (Unicode) and `v` (UnicodeSets)
    /// are not combined. `v` subsumes `u` and engines reject the pair.
    pub fn new(
        source: impl Into<JsString>,
        flags: RegExpFlags,
    ) -> Result<JsRegExp, IncompatibleRegExpFlags> {
        if flags.contains(RegExpFlags::UNICODE) && flags.contains(RegExpFlags::UNICODE_SETS) {
            return Err(IncompatibleRegExpFlags);
        }
        Ok(JsRegExp {
            source: source.into(),
            flags,
        })
    }

    /// Builds a regexp from wire data without flag validation. Early V8
    /// releases wrote streams combining `u` and `v`, and such data must
    /// still be readable.
    pub(crate) fn from_wire(source: JsString, flags: RegExpFlags) -> JsRegExp {
        JsRegExp { source, flags }
    }

    pub fn source(&self) -> &JsString {
        &self.source
    }

    pub fn flags(&self) -> RegExpFlags {
        self.flags
    }
}

impl std::fmt::Display for JsRegExp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unicode_and_unicode_sets_together() {
        let flags = RegExpFlags::UNICODE | RegExpFlags::UNICODE_SETS;
        assert_eq!(JsRegExp::new("x", flags), Err(IncompatibleRegExpFlags));
        assert!(JsRegExp::new("x", RegExpFlags::UNICODE_SETS).is_ok());
    }

    #[test]
    fn display_renders_literal_form() {
        let re = JsRegExp::new("^\\w+$", RegExpFlags::GLOBAL | RegExpFlags::IGNORE_CASE).unwrap();
        assert_eq!(re.to_string(), "/^\\w+$/gi");
    }
}
