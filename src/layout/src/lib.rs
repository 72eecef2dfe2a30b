//! Per-target memory and binding layout for shader parameters.
//!
//! A [`Target`] turns entities from a `loupe_entity::Session` into
//! immutable, shared [`TypeLayout`] and [`VarLayout`] graphs. Each type
//! layout also carries the flattened descriptor, binding and sub-object
//! ranges an application walks to bind parameters.

macro_rules! stable_enum {
    (
        $(#[$($meta:meta)*])*
        $vis:vis enum $name:ident {
            $($(#[$($mem_meta:meta)*])* $member:ident = $val:literal,)*
        }
    ) => {
        $(#[$($meta)*])*
        $vis enum $name {
            $($(#[$($mem_meta)*])* $member,)*
        }

        impl From<$name> for u32 {
            fn from(val: $name) -> Self {
                match val {
                    $($name::$member => $val,)*
                }
            }
        }

        impl std::convert::TryFrom<u32> for $name {
            type Error = $crate::InvalidCode;
            fn try_from(val: u32) -> std::result::Result<Self, Self::Error> {
                match val {
                    $($val => Ok($name::$member),)*
                    _ => Err($crate::InvalidCode(val)),
                }
            }
        }
    };
}

mod binding;
mod cache;
mod chain;
mod compute;
mod error;
mod kind;
mod layout;
mod program;
mod ranges;
mod rules;
mod target;
#[cfg(test)]
mod testing;

pub use binding::*;
pub use chain::*;
pub use error::*;
pub use kind::*;
pub use layout::*;
pub use program::*;
pub use ranges::*;
pub use rules::*;
pub use target::*;

pub(crate) use cache::StagedCache;

pub(crate) type SmallVec<T, const N: usize> = smallvec::SmallVec<[T; N]>;

#[inline]
pub(crate) fn align_up(value: u32, align: u32) -> u32 {
    debug_assert_ne!(align, 0);
    (value + align - 1) / align * align
}
