use derive_more::Display;

use crate::EntityId;

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ScalarType {
    #[display(fmt = "bool")]
    Bool,
    #[display(fmt = "int")]
    Int32,
    #[display(fmt = "uint")]
    UInt32,
    #[display(fmt = "int64_t")]
    Int64,
    #[display(fmt = "uint64_t")]
    UInt64,
    #[display(fmt = "half")]
    Float16,
    #[display(fmt = "float")]
    Float32,
    #[display(fmt = "double")]
    Float64,
}

impl ScalarType {
    /// Size of one value in GPU memory.
    #[inline]
    pub fn byte_size(self) -> u32 {
        match self {
            Self::Float16 => 2,
            Self::Bool | Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ResourceShape {
    Texture1D,
    Texture2D,
    Texture3D,
    TextureCube,
    #[display(fmt = "Buffer")]
    TypedBuffer,
    StructuredBuffer,
    ByteAddressBuffer,
    #[display(fmt = "RaytracingAccelerationStructure")]
    AccelerationStructure,
    SubpassInput,
}

impl ResourceShape {
    #[inline]
    pub fn is_texture(self) -> bool {
        matches!(self, Self::Texture1D | Self::Texture2D | Self::Texture3D
            | Self::TextureCube)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResourceAccess {
    Read,
    ReadWrite,
}

impl Default for ResourceAccess {
    fn default() -> Self {
        Self::Read
    }
}

/// A target-independent type.
///
/// Aggregates are nominal and refer to their fields by id; everything
/// else is structural and interned by the session, so two requests for
/// `float4` produce the same entity.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Type {
    Scalar(ScalarType),
    Vector { elem: ScalarType, count: u32 },
    Matrix { elem: ScalarType, rows: u32, columns: u32 },
    /// Fields are `Var` entities, in declaration order.
    Struct { fields: Vec<EntityId> },
    /// `count` is `None` for a runtime-sized array.
    Array { elem: EntityId, count: Option<u32> },
    Resource {
        shape: ResourceShape,
        access: ResourceAccess,
        result: Option<EntityId>,
    },
    CombinedTextureSampler { shape: ResourceShape },
    SamplerState,
    ConstantBuffer { elem: EntityId },
    ParameterBlock { elem: EntityId },
    /// An unsubstituted generic type parameter.
    Param(EntityId),
}

impl Type {
    #[inline]
    pub fn is_struct(&self) -> bool {
        matches!(self, Self::Struct { .. })
    }

    #[inline]
    pub fn is_parameter_group(&self) -> bool {
        matches!(self, Self::ConstantBuffer { .. } | Self::ParameterBlock { .. })
    }

    /// Nominal types get a fresh entity per declaration.
    #[inline]
    pub(crate) fn is_nominal(&self) -> bool {
        self.is_struct()
    }

    pub fn fields(&self) -> &[EntityId] {
        match self {
            Self::Struct { fields } => fields,
            _ => &[],
        }
    }
}
