use derive_more::Display;

use crate::EntityId;

#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[non_exhaustive]
pub enum EntityError {
    /// An id did not name an entity of the expected class.
    #[display(fmt = "unknown entity {}", _0)]
    UnknownEntity(EntityId),
    /// A name lookup failed.
    #[display(fmt = "unknown name `{}`", _0)]
    UnknownName(String),
    #[display(fmt = "{} is not a generic", _0)]
    NotAGeneric(EntityId),
    /// Struct types are declared, not interned.
    #[display(fmt = "nominal types cannot be interned")]
    NominalType,
    #[display(fmt = "expected {} generic arguments, found {}", expected, found)]
    ArgumentCountMismatch { expected: usize, found: usize },
}

pub type Error = EntityError;
pub type Result<T> = std::result::Result<T, Error>;

impl std::error::Error for Error {}
