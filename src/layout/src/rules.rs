use derivative::Derivative;
use derive_more::Display;
use entity::ScalarType;

use crate::*;

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum TargetFormat {
    D3D11,
    D3D12,
    Vulkan,
    /// Host code; every parameter is ordinary data.
    Cpu,
}

impl TargetFormat {
    #[inline]
    pub fn is_d3d(self) -> bool {
        matches!(self, Self::D3D11 | Self::D3D12)
    }

    /// Whether parameter blocks get their own register space or set.
    #[inline]
    pub fn has_register_spaces(self) -> bool {
        matches!(self, Self::D3D12 | Self::Vulkan)
    }

    /// Kinds that show up as descriptors in a set or table.
    pub fn is_descriptor_kind(self, kind: ResourceKind) -> bool {
        use ResourceKind as K;
        match self {
            Self::D3D11 | Self::D3D12 => matches!(kind, K::ConstantBuffer
                | K::ShaderResource | K::UnorderedAccess | K::SamplerState),
            Self::Vulkan => kind == K::DescriptorTableSlot,
            Self::Cpu => false,
        }
    }

    /// Kinds that restart from zero inside a parameter block's own
    /// register space.
    pub fn is_space_scoped(self, kind: ResourceKind) -> bool {
        match self {
            Self::D3D12 => self.is_descriptor_kind(kind),
            Self::Vulkan => matches!(kind, ResourceKind::DescriptorTableSlot
                | ResourceKind::SubpassInputAttachment),
            Self::D3D11 | Self::Cpu => false,
        }
    }

    /// Whether `layout` has descriptors of its own outside any block.
    /// Such descriptors claim space 0 and push nested blocks up by one.
    pub(crate) fn has_loose_descriptors(self, layout: &TypeLayout) -> bool {
        self.has_register_spaces() && layout.consumed_kinds()
            .any(|kind| self.is_descriptor_kind(kind))
    }

    /// The space a root layout numbers its nested blocks from.
    pub(crate) fn root_space(self, layout: &TypeLayout) -> u32 {
        let owns_space = layout.as_parameter_group()
            .map_or(false, |group| group.owns_space);
        if !owns_space && self.has_loose_descriptors(layout) { 1 } else { 0 }
    }

    /// Whether an array multiplies its element's usage of `kind`.
    /// Vulkan arrays occupy a single binding with a descriptor count.
    #[inline]
    pub fn splits_arrays(self, kind: ResourceKind) -> bool {
        !(self == Self::Vulkan && kind == ResourceKind::DescriptorTableSlot)
    }

    /// The kind the buffer behind a constant buffer consumes.
    pub(crate) fn constant_buffer_kind(self, push: bool) -> ResourceKind {
        match self {
            Self::Vulkan if push => ResourceKind::PushConstantBuffer,
            Self::Vulkan => ResourceKind::DescriptorTableSlot,
            Self::D3D11 | Self::D3D12 => ResourceKind::ConstantBuffer,
            Self::Cpu => ResourceKind::Bytes,
        }
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum MatrixLayoutMode {
    RowMajor,
    ColumnMajor,
}

/// Selects among a target's packing conventions.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum LayoutRules {
    Default,
    ConstantBuffer,
    StructuredBuffer,
    PushConstantBuffer,
    SpecializationConstant,
    VaryingInput,
    VaryingOutput,
}

impl Default for LayoutRules {
    fn default() -> Self {
        Self::Default
    }
}

impl LayoutRules {
    /// The kind varying layouts consume under these rules.
    #[inline]
    pub(crate) fn varying_kind(self) -> Option<ResourceKind> {
        match self {
            Self::VaryingInput => Some(ResourceKind::VaryingInput),
            Self::VaryingOutput => Some(ResourceKind::VaryingOutput),
            _ => None,
        }
    }
}

/// Target configuration.
#[derive(Clone, Copy, Debug, Derivative, Eq, Hash, PartialEq)]
#[derivative(Default)]
pub struct TargetDesc {
    #[derivative(Default(value = "TargetFormat::D3D12"))]
    pub format: TargetFormat,
    #[derivative(Default(value = "MatrixLayoutMode::ColumnMajor"))]
    pub matrix_layout: MatrixLayoutMode,
}

impl TargetDesc {
    #[inline]
    pub fn new(format: TargetFormat) -> Self {
        Self { format, ..Default::default() }
    }
}

/// How ordinary data is packed into bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Packing {
    /// Legacy HLSL `cbuffer` packing: 16-byte rows that nothing but an
    /// aggregate may straddle.
    D3DConstantBuffer,
    Std140,
    Std430,
    /// C-like packing with scalar alignment for vectors.
    Natural,
}

impl Packing {
    pub(crate) fn new(format: TargetFormat, rules: LayoutRules) -> Self {
        use LayoutRules as R;
        match (format, rules) {
            (TargetFormat::Cpu, _) => Self::Natural,
            (_, R::StructuredBuffer) if format.is_d3d() => Self::Natural,
            (_, _) if format.is_d3d() => Self::D3DConstantBuffer,
            (_, R::StructuredBuffer) | (_, R::PushConstantBuffer) => Self::Std430,
            (_, _) => Self::Std140,
        }
    }

    #[inline]
    fn rounds_aggregates(self) -> bool {
        matches!(self, Self::D3DConstantBuffer | Self::Std140)
    }

    /// `(size, alignment)` of one vector.
    pub(crate) fn vector(self, scalar_size: u32, count: u32) -> (u32, u32) {
        let size = scalar_size * count;
        let align = match self {
            Self::Std140 | Self::Std430 if count == 2 => 2 * scalar_size,
            Self::Std140 | Self::Std430 if count > 2 => 4 * scalar_size,
            _ => scalar_size,
        };
        (size, align)
    }

    #[inline]
    pub(crate) fn aggregate_alignment(self, align: u32) -> u32 {
        if self.rounds_aggregates() { align.max(16) } else { align }
    }

    #[inline]
    pub(crate) fn struct_size(self, size: u32, align: u32) -> u32 {
        match self {
            Self::D3DConstantBuffer => size,
            _ => align_up(size, align),
        }
    }

    #[inline]
    pub(crate) fn array_stride(self, elem_size: u32, elem_align: u32) -> u32 {
        align_up(elem_size, self.aggregate_alignment(elem_align))
    }

    #[inline]
    pub(crate) fn array_size(self, stride: u32, elem_size: u32, count: u32) ->
        u32
    {
        match self {
            Self::D3DConstantBuffer if count > 0 =>
                stride * (count - 1) + elem_size,
            _ => stride * count,
        }
    }

    /// Offset of a field of the given size and alignment placed at or
    /// after `offset`.
    pub(crate) fn place_field(
        self,
        offset: u32,
        size: u32,
        align: u32,
        aggregate: bool,
    ) -> u32 {
        let offset = align_up(offset, align);
        if self == Self::D3DConstantBuffer && !aggregate
            && offset % 16 + size > 16
        {
            align_up(offset, 16)
        } else {
            offset
        }
    }
}

pub(crate) fn scalar_size(format: TargetFormat, scalar: ScalarType) -> u32 {
    match (format, scalar) {
        (TargetFormat::Cpu, ScalarType::Bool) => 1,
        _ => scalar.byte_size(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_choice() {
        use LayoutRules as R;
        use TargetFormat as F;
        assert_eq!(Packing::new(F::D3D11, R::Default), Packing::D3DConstantBuffer);
        assert_eq!(Packing::new(F::D3D12, R::StructuredBuffer), Packing::Natural);
        assert_eq!(Packing::new(F::Vulkan, R::ConstantBuffer), Packing::Std140);
        assert_eq!(Packing::new(F::Vulkan, R::PushConstantBuffer), Packing::Std430);
        assert_eq!(Packing::new(F::Cpu, R::ConstantBuffer), Packing::Natural);
    }

    #[test]
    fn constant_buffer_rows() {
        let p = Packing::D3DConstantBuffer;
        // float3 then float: the float fits in the same row
        assert_eq!(p.place_field(12, 4, 4, false), 12);
        // float at 4 then float3: the float3 would straddle a row
        assert_eq!(p.place_field(4, 12, 4, false), 16);
        assert_eq!(p.place_field(4, 8, 4, false), 4);
        assert_eq!(p.place_field(4, 4, 16, true), 16);

        assert_eq!(p.array_stride(4, 4), 16);
        assert_eq!(p.array_size(16, 4, 3), 36);
        assert_eq!(p.struct_size(20, 16), 20);
    }

    #[test]
    fn std_vectors() {
        assert_eq!(Packing::Std140.vector(4, 3), (12, 16));
        assert_eq!(Packing::Std430.vector(4, 2), (8, 8));
        assert_eq!(Packing::Natural.vector(4, 3), (12, 4));
        assert_eq!(Packing::Std140.array_stride(4, 4), 16);
        assert_eq!(Packing::Std430.array_stride(4, 4), 4);
        assert_eq!(Packing::Std430.array_size(16, 12, 3), 48);
    }

    #[test]
    fn target_desc_default() {
        let desc = TargetDesc::default();
        assert_eq!(desc.format, TargetFormat::D3D12);
        assert_eq!(desc.matrix_layout, MatrixLayoutMode::ColumnMajor);
        assert_eq!(TargetDesc::new(TargetFormat::Vulkan).matrix_layout,
            MatrixLayoutMode::ColumnMajor);
    }
}
