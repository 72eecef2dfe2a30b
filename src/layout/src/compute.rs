use std::sync::Arc;

use entity::{
    EntityId, ResourceAccess, ResourceShape, ScalarType, Type, Var,
    VarModifiers,
};

use crate::*;
use crate::ranges::build_type_ranges;
use ResourceKind as K;

/// The pieces of a type layout short of its ranges.
pub(crate) struct Shape {
    pub(crate) sizes: KindMap<u32>,
    pub(crate) alignment: u32,
    pub(crate) kind: TypeLayoutKind,
}

impl Shape {
    fn bytes(size: u32, alignment: u32, kind: TypeLayoutKind) -> Self {
        Self { sizes: kind_map! { Bytes => size }, alignment, kind }
    }

    fn opaque(sizes: KindMap<u32>, kind: TypeLayoutKind) -> Self {
        Self { sizes, alignment: 1, kind }
    }

    fn single(resource: ResourceKind, size: u32, kind: TypeLayoutKind) ->
        Self
    {
        let mut sizes = KindMap::new();
        sizes.insert(resource, size);
        Self::opaque(sizes, kind)
    }
}

/// Size and alignment of host-side handles and pointers.
const CPU_HANDLE_SIZE: u32 = 8;

impl Target {
    pub(crate) fn compute_type_layout(&self, id: EntityId, rules: LayoutRules)
        -> Result<TypeLayout>
    {
        let shape = match *self.session.ty(id)? {
            Type::Scalar(scalar) => self.scalar_shape(scalar, rules)?,
            Type::Vector { elem, count } =>
                self.vector_shape(elem, count, rules)?,
            Type::Matrix { elem, rows, columns } =>
                self.matrix_shape(elem, rows, columns, rules)?,
            Type::Struct { ref fields } => self.struct_shape(fields, rules)?,
            Type::Array { elem, count } =>
                self.array_shape(elem, count, rules)?,
            Type::Resource { shape, access, result } =>
                self.resource_shape(shape, access, result, rules)?,
            Type::CombinedTextureSampler { .. } =>
                self.combined_sampler_shape(rules)?,
            Type::SamplerState => self.sampler_shape(rules)?,
            Type::ConstantBuffer { elem } => self.group_shape(
                id, ParameterGroupKind::ConstantBuffer, elem, rules)?,
            Type::ParameterBlock { elem } => self.group_shape(
                id, ParameterGroupKind::ParameterBlock, elem, rules)?,
            Type::Param(_) => return Err(Error::UnsupportedType),
        };
        Ok(self.finish(Some(id), rules, shape))
    }

    pub(crate) fn finish(
        &self,
        ty: Option<EntityId>,
        rules: LayoutRules,
        shape: Shape,
    ) -> TypeLayout {
        let mut layout = TypeLayout {
            ty,
            rules,
            sizes: shape.sizes,
            alignment: shape.alignment,
            kind: shape.kind,
            ranges: Default::default(),
        };
        let (ranges, offsets) = build_type_ranges(&layout, self.desc.format);
        layout.ranges = ranges;
        if let TypeLayoutKind::Struct(layout) = &mut layout.kind {
            layout.binding_range_offsets = offsets;
        }
        layout
    }

    fn packing(&self, rules: LayoutRules) -> Packing {
        Packing::new(self.desc.format, rules)
    }

    fn is_specialization(&self, rules: LayoutRules) -> bool {
        rules == LayoutRules::SpecializationConstant
    }

    fn scalar_shape(&self, scalar: ScalarType, rules: LayoutRules) ->
        Result<Shape>
    {
        let kind = TypeLayoutKind::Scalar(scalar);
        if let Some(varying) = rules.varying_kind() {
            return Ok(Shape::single(varying, 1, kind));
        }
        if self.is_specialization(rules) {
            return Ok(Shape::single(K::SpecializationConstant, 1, kind));
        }
        let size = scalar_size(self.desc.format, scalar);
        Ok(Shape::bytes(size, size, kind))
    }

    fn vector_shape(&self, elem: ScalarType, count: u32, rules: LayoutRules)
        -> Result<Shape>
    {
        let kind = TypeLayoutKind::Vector { elem, count };
        if let Some(varying) = rules.varying_kind() {
            return Ok(Shape::single(varying, 1, kind));
        }
        if self.is_specialization(rules) {
            return Ok(Shape::single(K::SpecializationConstant, count, kind));
        }
        let scalar = scalar_size(self.desc.format, elem);
        let (size, alignment) = self.packing(rules).vector(scalar, count);
        Ok(Shape::bytes(size, alignment, kind))
    }

    fn matrix_shape(
        &self,
        elem: ScalarType,
        rows: u32,
        columns: u32,
        rules: LayoutRules,
    ) -> Result<Shape> {
        if self.is_specialization(rules) {
            return Err(Error::UnsupportedType);
        }

        let mode = self.desc.matrix_layout;
        let (vectors, components) = match mode {
            MatrixLayoutMode::ColumnMajor => (columns, rows),
            MatrixLayoutMode::RowMajor => (rows, columns),
        };
        let scalar = self.session.interned(&Type::Scalar(elem))
            .ok_or(Error::UnknownEntity)?;
        let element = self.type_layout(scalar, rules)?;
        let kind = TypeLayoutKind::Matrix(MatrixLayout {
            element,
            rows,
            columns,
            mode,
        });

        if let Some(varying) = rules.varying_kind() {
            return Ok(Shape::single(varying, vectors, kind));
        }

        let packing = self.packing(rules);
        let scalar = scalar_size(self.desc.format, elem);
        let (vec_size, vec_align) = packing.vector(scalar, components);
        let stride = packing.array_stride(vec_size, vec_align);
        let size = packing.array_size(stride, vec_size, vectors);
        Ok(Shape::bytes(size, packing.aggregate_alignment(vec_align), kind))
    }

    /// Lays out `fields` (`Var` entities) in order. Push-constant and
    /// specialization-constant variables use their own rules.
    pub(crate) fn struct_shape(&self, fields: &[EntityId], rules: LayoutRules)
        -> Result<Shape>
    {
        if self.is_specialization(rules) {
            return Err(Error::UnsupportedType);
        }

        let packing = self.packing(rules);
        let mut sizes = KindMap::new();
        let mut offset = 0;
        let mut alignment = 1;
        let mut has_bytes = fields.is_empty();
        let mut vars = Vec::with_capacity(fields.len());
        for &field in fields {
            let var = self.session.var(field)?;
            let layout = self.type_layout(var.ty, var_rules(var, rules))?;
            let mut offsets = KindMap::new();
            for (kind, &size) in layout.sizes().iter() {
                if kind == K::Bytes {
                    let at = packing.place_field(
                        offset, size, layout.alignment, layout.is_aggregate());
                    offsets.insert(kind, VarOffset::from(at));
                    offset = at + size;
                    alignment = alignment.max(layout.alignment);
                    has_bytes = true;
                } else {
                    offsets.insert(kind, VarOffset::from(sizes.value(kind)));
                    sizes.add(kind, size);
                }
            }
            let name = self.session.name(field).map(str::to_owned);
            vars.push(Arc::new(
                VarLayout::new(Some(field), name, layout, offsets)));
        }

        let kind = TypeLayoutKind::Struct(StructLayout {
            fields: vars,
            binding_range_offsets: Vec::new(),
        });
        if !has_bytes {
            return Ok(Shape::opaque(sizes, kind));
        }
        let alignment = packing.aggregate_alignment(alignment);
        sizes.insert(K::Bytes, packing.struct_size(offset, alignment));
        Ok(Shape { sizes, alignment, kind })
    }

    fn array_shape(
        &self,
        elem: EntityId,
        count: Option<u32>,
        rules: LayoutRules,
    ) -> Result<Shape> {
        if self.is_specialization(rules)
            || count.is_none() && rules.varying_kind().is_some()
        {
            return Err(Error::UnsupportedType);
        }

        let format = self.desc.format;
        let packing = self.packing(rules);
        let element = self.type_layout(elem, rules)?;
        let mut sizes = KindMap::new();
        let mut alignment = 1;
        let mut element_stride = 0;
        for (kind, &size) in element.sizes().iter() {
            if kind == K::Bytes {
                element_stride = packing.array_stride(size, element.alignment);
                let total = count.map_or(0, |count|
                    packing.array_size(element_stride, size, count));
                sizes.insert(kind, total);
                alignment = packing.aggregate_alignment(element.alignment);
            } else if format.splits_arrays(kind) {
                // An unsized array is charged for one element.
                sizes.insert(kind, size.saturating_mul(count.unwrap_or(1)));
            } else {
                sizes.insert(kind, size);
            }
        }

        let kind = TypeLayoutKind::Array(ArrayLayout {
            element,
            count,
            element_stride,
        });
        Ok(Shape { sizes, alignment, kind })
    }

    fn check_bindable(&self, rules: LayoutRules) -> Result<()> {
        if rules.varying_kind().is_some() || self.is_specialization(rules) {
            return Err(Error::UnsupportedType);
        }
        Ok(())
    }

    fn handle_shape(&self, d3d: KindMap<u32>, vulkan: KindMap<u32>,
        kind: TypeLayoutKind) -> Shape
    {
        match self.desc.format {
            TargetFormat::D3D11 | TargetFormat::D3D12 => Shape::opaque(d3d, kind),
            TargetFormat::Vulkan => Shape::opaque(vulkan, kind),
            TargetFormat::Cpu =>
                Shape::bytes(CPU_HANDLE_SIZE, CPU_HANDLE_SIZE, kind),
        }
    }

    fn resource_shape(
        &self,
        shape: ResourceShape,
        access: ResourceAccess,
        result: Option<EntityId>,
        rules: LayoutRules,
    ) -> Result<Shape> {
        self.check_bindable(rules)?;

        let element = match (shape, result) {
            (ResourceShape::StructuredBuffer, Some(result)) =>
                Some(self.type_layout(result, LayoutRules::StructuredBuffer)?),
            _ => None,
        };
        let kind = TypeLayoutKind::Resource(ResourceLayout {
            binding_type: BindingType::for_resource(shape, access),
            element,
        });

        let d3d = if access == ResourceAccess::ReadWrite {
            kind_map! { UnorderedAccess => 1 }
        } else {
            kind_map! { ShaderResource => 1 }
        };
        let vulkan = if shape == ResourceShape::SubpassInput {
            kind_map! { DescriptorTableSlot => 1, SubpassInputAttachment => 1 }
        } else {
            kind_map! { DescriptorTableSlot => 1 }
        };
        Ok(self.handle_shape(d3d, vulkan, kind))
    }

    fn combined_sampler_shape(&self, rules: LayoutRules) -> Result<Shape> {
        self.check_bindable(rules)?;
        let kind = TypeLayoutKind::Resource(ResourceLayout {
            binding_type: BindingType::CombinedTextureSampler,
            element: None,
        });
        Ok(self.handle_shape(
            kind_map! { ShaderResource => 1, SamplerState => 1 },
            kind_map! { DescriptorTableSlot => 1 },
            kind,
        ))
    }

    fn sampler_shape(&self, rules: LayoutRules) -> Result<Shape> {
        self.check_bindable(rules)?;
        Ok(self.handle_shape(
            kind_map! { SamplerState => 1 },
            kind_map! { DescriptorTableSlot => 1 },
            TypeLayoutKind::Sampler,
        ))
    }

    fn group_shape(
        &self,
        id: EntityId,
        kind: ParameterGroupKind,
        elem: EntityId,
        rules: LayoutRules,
    ) -> Result<Shape> {
        self.check_bindable(rules)?;
        let push = rules == LayoutRules::PushConstantBuffer
            && kind == ParameterGroupKind::ConstantBuffer;
        let element_rules = if push { LayoutRules::PushConstantBuffer }
            else { LayoutRules::ConstantBuffer };
        let element = self.type_layout(elem, element_rules)?;
        let name = self.session.name(elem).map(str::to_owned);
        let kind = if push { ParameterGroupKind::PushConstantBuffer }
            else { kind };
        Ok(self.wrap_group(Some(id), kind, element, name))
    }

    /// Builds a parameter group around an already computed element.
    pub(crate) fn wrap_group(
        &self,
        id: Option<EntityId>,
        kind: ParameterGroupKind,
        element: Arc<TypeLayout>,
        element_name: Option<String>,
    ) -> Shape {
        let format = self.desc.format;
        let push = kind == ParameterGroupKind::PushConstantBuffer;
        let owns_space = kind == ParameterGroupKind::ParameterBlock
            && format.has_register_spaces();

        // The buffer holding the element's ordinary data
        let mut container_sizes = KindMap::new();
        if format == TargetFormat::Cpu {
            container_sizes.insert(K::Bytes, CPU_HANDLE_SIZE);
        } else if element.size(K::Bytes) > 0 {
            container_sizes.insert(format.constant_buffer_kind(push), 1);
        }
        let alignment =
            if format == TargetFormat::Cpu { CPU_HANDLE_SIZE } else { 1 };
        let binding_type = if push { BindingType::PushConstant }
            else { BindingType::ConstantBuffer };
        let container_layout = self.finish(id, element.rules, Shape {
            sizes: container_sizes.clone(),
            alignment,
            kind: TypeLayoutKind::Resource(ResourceLayout {
                binding_type,
                element: None,
            }),
        });
        let container = Arc::new(
            VarLayout::at_origin(None, None, Arc::new(container_layout)));

        let element_offsets = element.consumed_kinds()
            .map(|kind| {
                let index = match kind {
                    K::Bytes => 0,
                    K::RegisterSpace if owns_space => 1,
                    _ => container_sizes.value(kind),
                };
                (kind, VarOffset::from(index))
            })
            .collect();

        let mut sizes = KindMap::new();
        if format == TargetFormat::Cpu {
            sizes.insert(K::Bytes, CPU_HANDLE_SIZE);
        } else if owns_space {
            sizes.insert(K::RegisterSpace, 1 + element.size(K::RegisterSpace));
            for (kind, &size) in element.sizes().iter() {
                if kind == K::Bytes || kind == K::RegisterSpace
                    || format.is_space_scoped(kind)
                {
                    continue;
                }
                sizes.add(kind, size);
            }
        } else {
            sizes = container_sizes;
            for (kind, &size) in element.sizes().iter() {
                if kind != K::Bytes {
                    sizes.add(kind, size);
                }
            }
        }

        let element = Arc::new(VarLayout::new(
            None, element_name, element, element_offsets));
        Shape {
            sizes,
            alignment,
            kind: TypeLayoutKind::ParameterGroup(ParameterGroupLayout {
                kind,
                container,
                element,
                owns_space,
            }),
        }
    }
}

/// Rules a variable is laid out under inside an aggregate laid out
/// under `rules`.
pub(crate) fn var_rules(var: &Var, rules: LayoutRules) -> LayoutRules {
    if var.modifiers.contains(VarModifiers::SPECIALIZATION_CONSTANT) {
        LayoutRules::SpecializationConstant
    } else if var.modifiers.contains(VarModifiers::PUSH_CONSTANT) {
        LayoutRules::PushConstantBuffer
    } else {
        rules
    }
}
