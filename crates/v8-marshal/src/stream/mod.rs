//! The tag-level stream layer: a pull-style [`TagStreamReader`] and a
//! push-style [`TagStreamWriter`] over the byte primitives. These are the
//! low-level entry points for custom compositions; most callers want the
//! value-level [`Decoder`](crate::Decoder) / [`Encoder`](crate::Encoder).

mod reader;
mod writer;

pub use reader::TagStreamReader;
pub use writer::TagStreamWriter;
