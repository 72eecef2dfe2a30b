//! The target-independent entity graph that layouts are computed from.
//!
//! Entities live in a single arena owned by a [`Session`] and refer to
//! each other by [`EntityId`]. Nothing in this crate knows about
//! targets; see `loupe-layout` for that.

macro_rules! bit {
    ($bit:expr) => {
        (1 << $bit)
    }
}

mod arena;
mod entity;
mod error;
mod program;
mod session;
mod types;

pub use arena::*;
pub use entity::*;
pub use error::*;
pub use program::*;
pub use session::*;
pub use types::*;

pub(crate) type SmallVec<T, const N: usize> = smallvec::SmallVec<[T; N]>;
