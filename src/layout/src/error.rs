use derive_more::Display;

use entity::EntityId;

use crate::{BindingType, ResourceKind};

#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[non_exhaustive]
pub enum LayoutError {
    #[display(fmt = "not an aggregate")]
    NotAnAggregate,
    #[display(fmt = "not an array")]
    NotAnArray,
    #[display(fmt = "field index {} out of range ({} fields)", index, count)]
    FieldIndexOutOfRange { index: usize, count: usize },
    #[display(fmt = "element index {} out of range ({} elements)", index, count)]
    ElementIndexOutOfRange { index: u32, count: u32 },
    /// Element `index` of an unsized array lies past the last
    /// addressable offset or register.
    #[display(fmt = "element index {} overflows the array's offsets", index)]
    ElementOffsetOverflow { index: u32 },
    #[display(fmt = "binding range index {} out of range ({} ranges)", index, count)]
    BindingRangeIndexOutOfRange { index: usize, count: usize },
    /// A single-kind accessor was used on a layout whose consumed kind
    /// is `kind` (`None`, `Mixed`, or a kind the accessor can't use).
    #[display(fmt = "layout does not consume a single usable kind ({})", kind)]
    AmbiguousResourceKind { kind: ResourceKind },
    #[display(fmt = "expected a {} binding, found {}", expected, found)]
    ResourceKindMismatch { expected: BindingType, found: BindingType },
    /// The binding types agree but the resource was created for a
    /// different type than the leaf declares.
    #[display(fmt = "expected a resource of type {}, found {}", expected, found)]
    ResourceTypeMismatch { expected: EntityId, found: EntityId },
    #[display(fmt = "unknown name `{}`", _0)]
    UnknownName(String),
    #[display(fmt = "not ordinary data")]
    NotOrdinaryData,
    #[display(fmt = "{} bytes do not fit in {} bytes", size, capacity)]
    OrdinaryDataOverflow { size: usize, capacity: usize },
    #[display(fmt = "unknown entity")]
    UnknownEntity,
    /// The target's layout rules cannot represent the type.
    #[display(fmt = "unsupported type")]
    UnsupportedType,
    #[display(fmt = "no code available for target")]
    CodeUnavailable,
}

pub type Error = LayoutError;
pub type Result<T> = std::result::Result<T, Error>;

impl std::error::Error for Error {}

impl From<entity::EntityError> for Error {
    fn from(err: entity::EntityError) -> Self {
        match err {
            entity::EntityError::UnknownName(name) => Self::UnknownName(name),
            _ => Self::UnknownEntity,
        }
    }
}

/// A numeric code with no matching enum member.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[display(fmt = "invalid enum value {}", _0)]
pub struct InvalidCode(pub u32);

impl std::error::Error for InvalidCode {}
