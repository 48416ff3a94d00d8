//! JavaScript Date: an instant on the UTC timeline with millisecond
//! resolution.

/// A JavaScript Date value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JsDate {
    epoch_ms: f64,
}

impl JsDate {
    /// An instant `epoch_ms` milliseconds after the Unix epoch. NaN encodes
    /// an invalid Date, as it does in JavaScript.
    pub fn new(epoch_ms: f64) -> JsDate {
        JsDate { epoch_ms }
    }

    pub fn epoch_ms(&self) -> f64 {
        self.epoch_ms
    }

    pub fn is_valid(&self) -> bool {
        self.epoch_ms.is_finite()
    }
}

impl From<f64> for JsDate {
    fn from(epoch_ms: f64) -> JsDate {
        JsDate::new(epoch_ms)
    }
}
