use derive_more::Display;
use entity::{ResourceAccess, ResourceShape};

use crate::*;

stable_enum! {
    /// A descriptor category as seen by a graphics API. This is not the
    /// same thing as a [`ResourceKind`]: one resource kind may map to
    /// several binding types and vice versa, depending on the target.
    #[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
    pub enum BindingType {
        Unknown = 0,
        Sampler = 1,
        Texture = 2,
        ConstantBuffer = 3,
        ParameterBlock = 4,
        TypedBuffer = 5,
        RawBuffer = 6,
        CombinedTextureSampler = 7,
        InputRenderTarget = 8,
        InlineUniformData = 9,
        RayTracingAccelerationStructure = 10,
        VaryingInput = 11,
        VaryingOutput = 12,
        PushConstant = 13,
        MutableTexture = 14,
        MutableTypedBuffer = 15,
        MutableRawBuffer = 16,
        SpecializationConstant = 17,
    }
}

impl Default for BindingType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl BindingType {
    /// True for binding types that stand for a nested parameter group.
    #[inline]
    pub fn is_container(self) -> bool {
        matches!(self, Self::ConstantBuffer | Self::ParameterBlock
            | Self::PushConstant)
    }

    #[inline]
    pub fn is_mutable(self) -> bool {
        matches!(self, Self::MutableTexture | Self::MutableTypedBuffer
            | Self::MutableRawBuffer)
    }

    pub(crate) fn for_resource(shape: ResourceShape, access: ResourceAccess)
        -> Self
    {
        let rw = access == ResourceAccess::ReadWrite;
        match shape {
            _ if shape.is_texture() && rw => Self::MutableTexture,
            _ if shape.is_texture() => Self::Texture,
            ResourceShape::TypedBuffer if rw => Self::MutableTypedBuffer,
            ResourceShape::TypedBuffer => Self::TypedBuffer,
            ResourceShape::StructuredBuffer | ResourceShape::ByteAddressBuffer
                if rw => Self::MutableRawBuffer,
            ResourceShape::StructuredBuffer | ResourceShape::ByteAddressBuffer
                => Self::RawBuffer,
            ResourceShape::AccelerationStructure =>
                Self::RayTracingAccelerationStructure,
            ResourceShape::SubpassInput => Self::InputRenderTarget,
            _ => Self::Unknown,
        }
    }

    /// The binding type of a leaf that consumes only `kind`, for kinds
    /// that aren't resources.
    pub(crate) fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::VaryingInput => Self::VaryingInput,
            ResourceKind::VaryingOutput => Self::VaryingOutput,
            ResourceKind::SpecializationConstant =>
                Self::SpecializationConstant,
            ResourceKind::PushConstantBuffer => Self::PushConstant,
            ResourceKind::ConstantBuffer => Self::ConstantBuffer,
            ResourceKind::SamplerState => Self::Sampler,
            _ => Self::Unknown,
        }
    }
}
