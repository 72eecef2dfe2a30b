use derive_more::Display;
use layout::LayoutError;

#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[non_exhaustive]
pub enum CursorError {
    #[display(fmt = "{}", _0)]
    Layout(LayoutError),
    #[display(fmt = "no handle for descriptor set {}", _0)]
    MissingSet(usize),
    #[display(fmt = "a nested parameter group is entered through sub_object")]
    NestedGroup,
}

impl std::error::Error for CursorError {}

impl From<LayoutError> for CursorError {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

pub type Error = CursorError;
pub type Result<T> = std::result::Result<T, Error>;
