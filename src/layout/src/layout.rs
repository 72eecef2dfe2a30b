use std::sync::Arc;

use entity::{EntityId, ScalarType, Semantic, Stage};

use crate::*;

/// Layout of a type on one target under one set of rules.
///
/// Type layouts are immutable once built and are shared through `Arc`.
/// The `ty` back-reference is an id into the session that produced it.
/// It is absent for layouts synthesized for a program's globals.
#[derive(Debug)]
pub struct TypeLayout {
    pub(crate) ty: Option<EntityId>,
    pub(crate) rules: LayoutRules,
    pub(crate) sizes: KindMap<u32>,
    /// Alignment of the `Bytes` part.
    pub(crate) alignment: u32,
    pub(crate) kind: TypeLayoutKind,
    pub(crate) ranges: Ranges,
}

#[derive(Debug)]
pub enum TypeLayoutKind {
    Scalar(ScalarType),
    Vector { elem: ScalarType, count: u32 },
    Matrix(MatrixLayout),
    Struct(StructLayout),
    Array(ArrayLayout),
    Resource(ResourceLayout),
    Sampler,
    ParameterGroup(ParameterGroupLayout),
}

#[derive(Debug)]
pub struct MatrixLayout {
    pub element: Arc<TypeLayout>,
    pub rows: u32,
    pub columns: u32,
    pub mode: MatrixLayoutMode,
}

#[derive(Debug)]
pub struct StructLayout {
    pub(crate) fields: Vec<Arc<VarLayout>>,
    /// Filled in when the struct's own ranges are built.
    pub(crate) binding_range_offsets: Vec<usize>,
}

#[derive(Debug)]
pub struct ArrayLayout {
    pub element: Arc<TypeLayout>,
    /// `None` for an unsized array.
    pub count: Option<u32>,
    /// Distance in bytes between consecutive elements.
    pub element_stride: u32,
}

#[derive(Debug)]
pub struct ResourceLayout {
    pub binding_type: BindingType,
    /// The element of a structured buffer, under structured-buffer
    /// rules.
    pub element: Option<Arc<TypeLayout>>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ParameterGroupKind {
    ConstantBuffer,
    ParameterBlock,
    PushConstantBuffer,
}

impl ParameterGroupKind {
    #[inline]
    pub fn binding_type(self) -> BindingType {
        match self {
            Self::ConstantBuffer => BindingType::ConstantBuffer,
            Self::ParameterBlock => BindingType::ParameterBlock,
            Self::PushConstantBuffer => BindingType::PushConstant,
        }
    }
}

/// Layout of a constant buffer or parameter block.
///
/// The container is the buffer or block itself; the element is its
/// payload. Offsets of the element are relative to the group, and
/// already skip whatever the container consumes of the same kinds.
#[derive(Debug)]
pub struct ParameterGroupLayout {
    pub(crate) kind: ParameterGroupKind,
    pub(crate) container: Arc<VarLayout>,
    pub(crate) element: Arc<VarLayout>,
    pub(crate) owns_space: bool,
}

impl StructLayout {
    #[inline]
    pub fn fields(&self) -> &[Arc<VarLayout>] {
        &self.fields
    }

    /// Index of the first binding range of each field.
    #[inline]
    pub fn binding_range_offsets(&self) -> &[usize] {
        &self.binding_range_offsets
    }
}

impl ParameterGroupLayout {
    #[inline]
    pub fn kind(&self) -> ParameterGroupKind {
        self.kind
    }

    #[inline]
    pub fn container_var_layout(&self) -> &Arc<VarLayout> {
        &self.container
    }

    #[inline]
    pub fn element_var_layout(&self) -> &Arc<VarLayout> {
        &self.element
    }

    /// True if the group occupies a register space (set) of its own.
    #[inline]
    pub fn owns_space(&self) -> bool {
        self.owns_space
    }
}

impl TypeLayout {
    #[inline]
    pub fn ty(&self) -> Option<EntityId> {
        self.ty
    }

    #[inline]
    pub fn rules(&self) -> LayoutRules {
        self.rules
    }

    #[inline]
    pub fn kind(&self) -> &TypeLayoutKind {
        &self.kind
    }

    #[inline]
    pub fn sizes(&self) -> &KindMap<u32> {
        &self.sizes
    }

    #[inline]
    pub fn size(&self, kind: ResourceKind) -> u32 {
        self.sizes.value(kind)
    }

    /// 1 for every kind but `Bytes`.
    #[inline]
    pub fn alignment(&self, kind: ResourceKind) -> u32 {
        if kind == ResourceKind::Bytes { self.alignment } else { 1 }
    }

    #[inline]
    pub fn stride(&self, kind: ResourceKind) -> u32 {
        align_up(self.size(kind), self.alignment(kind))
    }

    fn check_ordinary(&self) -> Result<()> {
        match self.consumed_kind() {
            ResourceKind::Bytes | ResourceKind::None => Ok(()),
            kind => Err(Error::AmbiguousResourceKind { kind }),
        }
    }

    /// Size in bytes of a layout that consumes only ordinary data.
    pub fn size_bytes(&self) -> Result<u32> {
        self.check_ordinary()?;
        Ok(self.size(ResourceKind::Bytes))
    }

    pub fn stride_bytes(&self) -> Result<u32> {
        self.check_ordinary()?;
        Ok(self.stride(ResourceKind::Bytes))
    }

    pub fn alignment_bytes(&self) -> Result<u32> {
        self.check_ordinary()?;
        Ok(self.alignment)
    }

    /// Kinds this layout reports a size for. An empty struct still
    /// reports zero `Bytes`.
    #[inline]
    pub fn consumed_kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.sizes.keys()
    }

    #[inline]
    pub fn consumed_kind(&self) -> ResourceKind {
        self.sizes.single_kind()
    }

    #[inline]
    pub fn consumes(&self, kind: ResourceKind) -> bool {
        self.sizes.contains_key(kind)
    }

    /// True if the layout consumes nothing but ordinary data.
    #[inline]
    pub fn is_ordinary_data(&self) -> bool {
        self.consumed_kinds().all(|kind| kind == ResourceKind::Bytes)
    }

    /// True if the layout consumes some kind other than `Bytes`.
    #[inline]
    pub(crate) fn has_bindings(&self) -> bool {
        !self.is_ordinary_data()
    }

    pub(crate) fn is_aggregate(&self) -> bool {
        matches!(self.kind, TypeLayoutKind::Struct(_)
            | TypeLayoutKind::Array(_) | TypeLayoutKind::Matrix(_))
    }

    pub fn as_struct(&self) -> Option<&StructLayout> {
        match &self.kind {
            TypeLayoutKind::Struct(layout) => Some(layout),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayLayout> {
        match &self.kind {
            TypeLayoutKind::Array(layout) => Some(layout),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&MatrixLayout> {
        match &self.kind {
            TypeLayoutKind::Matrix(layout) => Some(layout),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceLayout> {
        match &self.kind {
            TypeLayoutKind::Resource(layout) => Some(layout),
            _ => None,
        }
    }

    pub fn as_parameter_group(&self) -> Option<&ParameterGroupLayout> {
        match &self.kind {
            TypeLayoutKind::ParameterGroup(layout) => Some(layout),
            _ => None,
        }
    }

    /// Fields of a struct layout; empty for anything else.
    pub fn fields(&self) -> &[Arc<VarLayout>] {
        self.as_struct().map_or(&[][..], |layout| &layout.fields)
    }

    pub fn field(&self, index: usize) -> Result<&Arc<VarLayout>> {
        let fields = &self.as_struct().ok_or(Error::NotAnAggregate)?.fields;
        fields.get(index).ok_or(Error::FieldIndexOutOfRange {
            index,
            count: fields.len(),
        })
    }

    pub fn find_field_index(&self, name: &str) -> Result<usize> {
        let fields = &self.as_struct().ok_or(Error::NotAnAggregate)?.fields;
        fields.iter().position(|field| field.name() == Some(name))
            .ok_or_else(|| Error::UnknownName(name.to_owned()))
    }

    /// The element of an array, matrix, structured buffer, or
    /// parameter group.
    pub fn element_type_layout(&self) -> Option<&Arc<TypeLayout>> {
        match &self.kind {
            TypeLayoutKind::Array(layout) => Some(&layout.element),
            TypeLayoutKind::Matrix(layout) => Some(&layout.element),
            TypeLayoutKind::Resource(layout) => layout.element.as_ref(),
            TypeLayoutKind::ParameterGroup(layout) =>
                Some(&layout.element.type_layout),
            _ => None,
        }
    }

    /// Element count of a sized array.
    pub fn element_count(&self) -> Option<u32> {
        self.as_array()?.count
    }

    /// The binding type a leaf of this layout is bound as.
    pub fn binding_type(&self) -> BindingType {
        match &self.kind {
            TypeLayoutKind::Resource(layout) => layout.binding_type,
            TypeLayoutKind::Sampler => BindingType::Sampler,
            TypeLayoutKind::ParameterGroup(group) => group.kind.binding_type(),
            _ => BindingType::for_kind(
                self.consumed_kinds()
                    .find(|&kind| kind != ResourceKind::Bytes)
                    .unwrap_or(ResourceKind::Bytes),
            ),
        }
    }

    #[inline]
    pub fn binding_ranges(&self) -> &[BindingRangeInfo] {
        &self.ranges.binding_ranges
    }

    pub fn binding_range(&self, index: usize) -> Result<&BindingRangeInfo> {
        let ranges = &self.ranges.binding_ranges;
        ranges.get(index).ok_or(Error::BindingRangeIndexOutOfRange {
            index,
            count: ranges.len(),
        })
    }

    /// The first binding range contributed by field `index`.
    pub fn binding_range_offset_for_field(&self, index: usize) -> Result<usize>
    {
        let layout = self.as_struct().ok_or(Error::NotAnAggregate)?;
        layout.binding_range_offsets.get(index).copied()
            .ok_or(Error::FieldIndexOutOfRange {
                index,
                count: layout.fields.len(),
            })
    }

    /// The type layout of the leaf covered by binding range `index`.
    pub fn binding_range_leaf(&self, index: usize) -> Result<&TypeLayout> {
        Ok(self.binding_range(index)?.leaf_type_layout(self))
    }

    #[inline]
    pub fn descriptor_sets(&self) -> &[DescriptorSetInfo] {
        &self.ranges.descriptor_sets
    }

    #[inline]
    pub fn sub_object_ranges(&self) -> &[SubObjectRangeInfo] {
        &self.ranges.sub_object_ranges
    }

    pub fn sub_object_range_for_binding_range(&self, index: usize) ->
        Option<&SubObjectRangeInfo>
    {
        self.sub_object_ranges().iter()
            .find(|range| range.binding_range_index == index)
    }
}

/// Where a variable sits within its parent, for one kind.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct VarOffset {
    pub index: u32,
    pub space: u32,
}

impl From<u32> for VarOffset {
    fn from(index: u32) -> Self {
        Self { index, space: 0 }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SemanticKind {
    User,
    /// A system-value semantic (`SV_*`).
    System,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SemanticInfo {
    pub kind: SemanticKind,
    pub name: String,
    pub index: u32,
}

impl From<&Semantic> for SemanticInfo {
    fn from(semantic: &Semantic) -> Self {
        let is_system = semantic.name.get(..3)
            .map_or(false, |prefix| prefix.eq_ignore_ascii_case("SV_"));
        let kind = if is_system { SemanticKind::System }
            else { SemanticKind::User };
        Self { kind, name: semantic.name.clone(), index: semantic.index }
    }
}

/// Layout of a variable: its type layout plus its offsets, relative to
/// the immediately enclosing aggregate or parameter group.
#[derive(Debug)]
pub struct VarLayout {
    pub(crate) var: Option<EntityId>,
    pub(crate) name: Option<String>,
    pub(crate) type_layout: Arc<TypeLayout>,
    pub(crate) offsets: KindMap<VarOffset>,
    pub(crate) stage: Option<Stage>,
    pub(crate) semantic: Option<SemanticInfo>,
}

impl VarLayout {
    pub(crate) fn new(
        var: Option<EntityId>,
        name: Option<String>,
        type_layout: Arc<TypeLayout>,
        offsets: KindMap<VarOffset>,
    ) -> Self {
        Self { var, name, type_layout, offsets, stage: None, semantic: None }
    }

    /// Marks an entry point's varying input or output.
    pub(crate) fn varying(
        self,
        stage: Stage,
        semantic: Option<&Semantic>,
    ) -> Self {
        Self {
            stage: Some(stage),
            semantic: semantic.map(SemanticInfo::from),
            ..self
        }
    }

    /// A layout with every consumed kind at offset zero.
    pub(crate) fn at_origin(
        var: Option<EntityId>,
        name: Option<String>,
        type_layout: Arc<TypeLayout>,
    ) -> Self {
        let offsets = type_layout.consumed_kinds()
            .map(|kind| (kind, VarOffset::default()))
            .collect();
        Self::new(var, name, type_layout, offsets)
    }

    #[inline]
    pub fn var(&self) -> Option<EntityId> {
        self.var
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn type_layout(&self) -> &Arc<TypeLayout> {
        &self.type_layout
    }

    /// The stage whose varying input or output this is. Uniform
    /// variables have none.
    #[inline]
    pub fn stage(&self) -> Option<Stage> {
        self.stage
    }

    #[inline]
    pub fn semantic(&self) -> Option<&SemanticInfo> {
        self.semantic.as_ref()
    }

    #[inline]
    pub fn offsets(&self) -> &KindMap<VarOffset> {
        &self.offsets
    }

    #[inline]
    pub fn offset(&self, kind: ResourceKind) -> u32 {
        self.offsets.value(kind).index
    }

    #[inline]
    pub fn space(&self, kind: ResourceKind) -> u32 {
        self.offsets.value(kind).space
    }

    /// Byte offset of a variable that consumes only ordinary data.
    pub fn offset_bytes(&self) -> Result<u32> {
        self.type_layout.check_ordinary()?;
        Ok(self.offset(ResourceKind::Bytes))
    }

    /// The one bindable kind this variable consumes.
    pub fn binding_kind(&self) -> Result<ResourceKind> {
        match self.type_layout.consumed_kind() {
            kind @ (ResourceKind::None | ResourceKind::Mixed
                | ResourceKind::Bytes) =>
                Err(Error::AmbiguousResourceKind { kind }),
            kind => Ok(kind),
        }
    }

    pub fn binding_index(&self) -> Result<u32> {
        Ok(self.offset(self.binding_kind()?))
    }

    /// For a variable that only consumes register spaces, this is the
    /// first space it occupies.
    pub fn binding_space(&self) -> Result<u32> {
        let kind = self.binding_kind()?;
        if kind == ResourceKind::RegisterSpace {
            Ok(self.offset(kind))
        } else {
            Ok(self.space(kind))
        }
    }
}
