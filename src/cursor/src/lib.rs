//! Writes shader parameters through a precomputed layout.
//!
//! A [`ShaderCursor`] is a small `Copy` value that walks fields and
//! array elements of a root type layout while tracking three
//! coordinates: the byte offset of ordinary data, the index of the
//! binding range the current leaf belongs to, and the linear index
//! within that range. Writes go through a caller-supplied
//! [`ParameterSink`].

mod cursor;
mod error;
mod sink;

pub use cursor::*;
pub use error::*;
pub use sink::*;
