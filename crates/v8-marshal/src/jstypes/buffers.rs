//! ArrayBuffer family: plain and resizable buffers, shared/transferred
//! buffer handles, and views over them.

use crate::constants::{view_flags, ArrayBufferViewTag};
use crate::error::ViewBounds;
use crate::jstypes::value::JsValue;

/// A JavaScript ArrayBuffer whose bytes travel on the wire.
///
/// A buffer carrying `max_byte_length` is the resizable variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsArrayBuffer {
    data: Vec<u8>,
    max_byte_length: Option<u32>,
}

impl JsArrayBuffer {
    pub fn new(data: Vec<u8>) -> JsArrayBuffer {
        JsArrayBuffer {
            data,
            max_byte_length: None,
        }
    }

    /// A resizable buffer that may grow up to `max_byte_length` bytes.
    pub fn resizable(data: Vec<u8>, max_byte_length: u32) -> Result<JsArrayBuffer, ViewBounds> {
        if (data.len() as u64) > u64::from(max_byte_length) {
            return Err(ViewBounds::MaxByteLengthBelowLength {
                byte_length: data.len() as u32,
                max_byte_length,
            });
        }
        Ok(JsArrayBuffer {
            data,
            max_byte_length: Some(max_byte_length),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn byte_length(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn is_resizable(&self) -> bool {
        self.max_byte_length.is_some()
    }

    pub fn max_byte_length(&self) -> Option<u32> {
        self.max_byte_length
    }
}

impl From<Vec<u8>> for JsArrayBuffer {
    fn from(data: Vec<u8>) -> JsArrayBuffer {
        JsArrayBuffer::new(data)
    }
}

impl From<&[u8]> for JsArrayBuffer {
    fn from(data: &[u8]) -> JsArrayBuffer {
        JsArrayBuffer::new(data.to_vec())
    }
}

/// A SharedArrayBuffer. Only the transfer id travels on the wire; the
/// memory itself is exchanged out of band through a caller-owned registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsSharedArrayBuffer {
    pub buffer_id: u32,
}

/// An ArrayBuffer moved (not copied) between contexts, identified by a
/// transfer id the embedder resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsArrayBufferTransfer {
    pub transfer_id: u32,
}

/// A typed-array or DataView window over a backing buffer.
#[derive(Debug, Clone)]
pub struct JsArrayBufferView {
    backing: JsValue,
    kind: ArrayBufferViewTag,
    byte_offset: u32,
    /// `None` for length-tracking views, which derive their length from
    /// the backing buffer at access time.
    byte_length: Option<u32>,
    flags: u32,
}

impl JsArrayBufferView {
    /// Builds a fixed-length view, validating the range against the
    /// backing buffer where its extent is knowable (shared and transferred
    /// buffers live elsewhere and cannot be checked).
    pub fn new(
        backing: JsValue,
        kind: ArrayBufferViewTag,
        byte_offset: u32,
        byte_length: u32,
    ) -> Result<JsArrayBufferView, ViewBounds> {
        debug_assert!(is_buffer_value(&backing));
        check_view_range(&backing, kind, byte_offset, Some(byte_length))?;
        let flags = if is_backing_resizable(&backing) {
            view_flags::IS_BUFFER_RESIZABLE
        } else {
            0
        };
        Ok(JsArrayBufferView {
            backing,
            kind,
            byte_offset,
            byte_length: Some(byte_length),
            flags,
        })
    }

    /// Builds a length-tracking view over a resizable buffer.
    pub fn length_tracking(
        backing: JsValue,
        kind: ArrayBufferViewTag,
        byte_offset: u32,
    ) -> Result<JsArrayBufferView, ViewBounds> {
        debug_assert!(is_buffer_value(&backing));
        if !is_backing_resizable(&backing) {
            return Err(ViewBounds::InvalidFlagCombination);
        }
        check_view_range(&backing, kind, byte_offset, None)?;
        Ok(JsArrayBufferView {
            backing,
            kind,
            byte_offset,
            byte_length: None,
            flags: view_flags::IS_LENGTH_TRACKING | view_flags::IS_BUFFER_RESIZABLE,
        })
    }

    /// Assembles a view from already-validated wire fields. The decoder
    /// keeps the flags exactly as read so they re-serialize untouched
    /// (a growable SharedArrayBuffer looks non-resizable from here, yet
    /// its views legitimately carry the resizable-backing flag).
    pub(crate) fn from_wire_parts(
        backing: JsValue,
        kind: ArrayBufferViewTag,
        byte_offset: u32,
        byte_length: Option<u32>,
        flags: u32,
    ) -> JsArrayBufferView {
        JsArrayBufferView {
            backing,
            kind,
            byte_offset,
            byte_length,
            flags,
        }
    }

    /// The buffer value this view windows into.
    pub fn backing(&self) -> &JsValue {
        &self.backing
    }

    pub fn kind(&self) -> ArrayBufferViewTag {
        self.kind
    }

    pub fn byte_offset(&self) -> u32 {
        self.byte_offset
    }

    /// The fixed byte length, or `None` for length-tracking views.
    pub fn byte_length(&self) -> Option<u32> {
        self.byte_length
    }

    pub fn is_length_tracking(&self) -> bool {
        self.byte_length.is_none()
    }

    pub fn is_backing_resizable(&self) -> bool {
        self.flags & view_flags::IS_BUFFER_RESIZABLE != 0
    }

    /// The wire flags varint for this view.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// The bytes visible through the view, when the backing buffer is
    /// local. Length-tracking views see the largest whole-element run from
    /// their offset.
    pub fn view_data(&self) -> Option<Vec<u8>> {
        let JsValue::ArrayBuffer(buffer) = &self.backing else {
            return None;
        };
        let buffer = buffer.borrow();
        let data = buffer.data();
        let start = self.byte_offset as usize;
        match self.byte_length {
            Some(len) => data.get(start..start + len as usize).map(|s| s.to_vec()),
            None => {
                let available = data.len().saturating_sub(start);
                let element = self.kind.element_size() as usize;
                let whole = available - available % element;
                data.get(start..start + whole).map(|s| s.to_vec())
            }
        }
    }
}

fn is_buffer_value(value: &JsValue) -> bool {
    matches!(
        value,
        JsValue::ArrayBuffer(_) | JsValue::SharedArrayBuffer(_) | JsValue::ArrayBufferTransfer(_)
    )
}

fn is_backing_resizable(value: &JsValue) -> bool {
    match value {
        JsValue::ArrayBuffer(buffer) => buffer.borrow().is_resizable(),
        _ => false,
    }
}

/// Range and alignment validation shared by construction and decoding.
/// Shared and transferred backings cannot be checked from here.
pub(crate) fn check_view_range(
    backing: &JsValue,
    kind: ArrayBufferViewTag,
    byte_offset: u32,
    byte_length: Option<u32>,
) -> Result<(), ViewBounds> {
    let JsValue::ArrayBuffer(buffer) = backing else {
        return Ok(());
    };
    let buffer_byte_length = buffer.borrow().byte_length();
    let element_size = kind.element_size();
    match byte_length {
        Some(byte_length) => {
            if u64::from(byte_offset) + u64::from(byte_length) > u64::from(buffer_byte_length) {
                return Err(ViewBounds::OutOfRange {
                    byte_offset,
                    byte_length,
                    buffer_byte_length,
                });
            }
            if element_size > 1
                && (byte_offset % element_size != 0 || byte_length % element_size != 0)
            {
                return Err(ViewBounds::Misaligned {
                    byte_offset,
                    byte_length,
                    element_size,
                });
            }
        }
        None => {
            if byte_offset > buffer_byte_length {
                return Err(ViewBounds::OutOfRange {
                    byte_offset,
                    byte_length: 0,
                    buffer_byte_length,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(len: usize) -> JsValue {
        JsValue::array_buffer(JsArrayBuffer::new(vec![0u8; len]))
    }

    #[test]
    fn fixed_view_bounds_are_checked() {
        let view = JsArrayBufferView::new(buffer(8), ArrayBufferViewTag::Uint8Array, 2, 6);
        assert!(view.is_ok());
        let out = JsArrayBufferView::new(buffer(8), ArrayBufferViewTag::Uint8Array, 4, 8);
        assert!(matches!(out, Err(ViewBounds::OutOfRange { .. })));
    }

    #[test]
    fn alignment_is_checked_for_wide_elements() {
        let bad = JsArrayBufferView::new(buffer(8), ArrayBufferViewTag::Int32Array, 2, 4);
        assert!(matches!(bad, Err(ViewBounds::Misaligned { .. })));
        let ok = JsArrayBufferView::new(buffer(8), ArrayBufferViewTag::Int32Array, 4, 4);
        assert!(ok.is_ok());
    }

    #[test]
    fn length_tracking_requires_resizable_backing() {
        let fixed = buffer(8);
        assert!(matches!(
            JsArrayBufferView::length_tracking(fixed, ArrayBufferViewTag::Uint8Array, 0),
            Err(ViewBounds::InvalidFlagCombination)
        ));

        let resizable =
            JsValue::array_buffer(JsArrayBuffer::resizable(vec![0u8; 4], 16).unwrap());
        let view =
            JsArrayBufferView::length_tracking(resizable, ArrayBufferViewTag::Uint8Array, 0)
                .unwrap();
        assert!(view.is_length_tracking());
        assert_eq!(
            view.flags(),
            view_flags::IS_LENGTH_TRACKING | view_flags::IS_BUFFER_RESIZABLE
        );
    }

    #[test]
    fn resizable_max_below_length_is_rejected() {
        assert!(matches!(
            JsArrayBuffer::resizable(vec![0u8; 10], 4),
            Err(ViewBounds::MaxByteLengthBelowLength { .. })
        ));
    }

    #[test]
    fn view_data_slices_the_backing() {
        let backing = JsValue::array_buffer(JsArrayBuffer::new(vec![1, 2, 3, 4, 5]));
        let view = JsArrayBufferView::new(backing, ArrayBufferViewTag::Uint8Array, 1, 3).unwrap();
        assert_eq!(view.view_data(), Some(vec![2, 3, 4]));
    }

    #[test]
    fn view_over_resizable_backing_sets_the_flag() {
        let backing = JsValue::array_buffer(JsArrayBuffer::resizable(vec![0u8; 8], 16).unwrap());
        let view = JsArrayBufferView::new(backing, ArrayBufferViewTag::Uint8Array, 0, 8).unwrap();
        assert!(!view.is_length_tracking());
        assert_eq!(view.flags(), view_flags::IS_BUFFER_RESIZABLE);
    }
}
