use std::sync::Arc;

use enum_map::EnumMap;
use entity::EntityId;

use crate::*;

/// Binding count of a range over an unsized array.
pub const UNBOUNDED: u32 = u32::MAX;

/// A contiguous run of descriptors of one binding type within a set.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DescriptorRangeInfo {
    pub kind: ResourceKind,
    pub binding_type: BindingType,
    /// Binding (or register) index of the first descriptor in the set.
    pub index_offset: u32,
    pub descriptor_count: u32,
}

/// One descriptor set or table.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DescriptorSetInfo {
    /// Relative to the set the enclosing parameter block is bound to.
    pub space_offset: u32,
    pub ranges: Vec<DescriptorRangeInfo>,
}

/// A contiguous run of bindable leaves, e.g. one texture field or one
/// whole array-of-textures field.
#[derive(Clone, Debug)]
pub struct BindingRangeInfo {
    /// `None` if the range has no descriptors (varyings, specialization
    /// constants, push constants).
    pub descriptor_set_index: Option<usize>,
    pub binding_type: BindingType,
    pub first_descriptor_range_index: usize,
    pub descriptor_range_count: usize,
    /// Number of bindings in the range; [`UNBOUNDED`] for unsized
    /// arrays.
    pub binding_count: u32,
    pub leaf_var: Option<EntityId>,
    /// `None` when the leaf is the owning type layout itself.
    pub(crate) leaf: Option<Arc<TypeLayout>>,
}

impl BindingRangeInfo {
    /// The leaf's type layout; `owner` is the type layout this range
    /// was obtained from.
    #[inline]
    pub fn leaf_type_layout<'a>(&'a self, owner: &'a TypeLayout) ->
        &'a TypeLayout
    {
        self.leaf.as_deref().unwrap_or(owner)
    }

    pub fn descriptor_ranges<'a>(&self, owner: &'a TypeLayout) ->
        &'a [DescriptorRangeInfo]
    {
        let set = match self.descriptor_set_index {
            Some(index) => &owner.descriptor_sets()[index],
            None => return &[],
        };
        let start = self.first_descriptor_range_index;
        &set.ranges[start..start + self.descriptor_range_count]
    }
}

/// A binding range whose leaf is a nested parameter group.
#[derive(Clone, Debug)]
pub struct SubObjectRangeInfo {
    pub binding_range_index: usize,
    pub space_offset: u32,
    /// Offsets of the nested group relative to the outer type.
    pub offset: Arc<VarLayout>,
}

#[derive(Debug, Default)]
pub(crate) struct Ranges {
    pub(crate) binding_ranges: Vec<BindingRangeInfo>,
    pub(crate) descriptor_sets: Vec<DescriptorSetInfo>,
    pub(crate) sub_object_ranges: Vec<SubObjectRangeInfo>,
}

/// Accumulated offsets on the way from the root to a node.
#[derive(Clone, Debug)]
struct RangePath {
    base: EnumMap<ResourceKind, u32>,
    /// Space offset of the set loose descriptors currently go into.
    space: u32,
    /// Product of enclosing array counts.
    count: u32,
}

impl RangePath {
    /// A block that owns a space numbers its own set 0. Any other type
    /// leaves set 0 to its loose descriptors, if it has any.
    fn for_type(layout: &TypeLayout, format: TargetFormat) -> Self {
        let mut base = EnumMap::default();
        base[ResourceKind::RegisterSpace] = format.root_space(layout);
        Self { base, space: 0, count: 1 }
    }

    fn for_offsets(offsets: &KindMap<VarOffset>) -> Self {
        let mut base = EnumMap::default();
        for (kind, offset) in offsets.iter() {
            base[kind] = offset.index;
        }
        Self { base, space: 0, count: 1 }
    }

    fn enter_var(&self, var: &VarLayout, format: TargetFormat) -> Self {
        let mut next = self.clone();
        for (kind, offset) in var.offsets().iter() {
            if kind == ResourceKind::Bytes {
                continue;
            }
            let scale = if format.splits_arrays(kind) { self.count } else { 1 };
            next.base[kind] = next.base[kind]
                .saturating_add(offset.index.saturating_mul(scale));
        }
        next
    }

    fn enter_array(&self, count: Option<u32>) -> Self {
        let mut next = self.clone();
        next.count = self.count.saturating_mul(count.unwrap_or(UNBOUNDED));
        next
    }
}

struct RangeBuilder {
    format: TargetFormat,
    ranges: Ranges,
}

/// Builds the ranges of `layout` as a root. Returns the ranges and,
/// for a struct, the first binding range of each field.
pub(crate) fn build_type_ranges(layout: &TypeLayout, format: TargetFormat)
    -> (Ranges, Vec<usize>)
{
    let mut builder = RangeBuilder { format, ranges: Default::default() };
    let offsets = builder.walk_root(layout, &RangePath::for_type(layout, format));
    (builder.ranges, offsets)
}

/// Builds ranges for a root placed at absolute `offsets`, as for a
/// program's globals.
pub(crate) fn build_root_ranges(
    layout: &TypeLayout,
    offsets: &KindMap<VarOffset>,
    format: TargetFormat,
) -> (Ranges, Vec<usize>) {
    let mut builder = RangeBuilder { format, ranges: Default::default() };
    let offsets = builder.walk_root(layout, &RangePath::for_offsets(offsets));
    (builder.ranges, offsets)
}

impl RangeBuilder {
    fn walk_root(&mut self, layout: &TypeLayout, path: &RangePath) ->
        Vec<usize>
    {
        match &layout.kind {
            TypeLayoutKind::Struct(layout) => layout.fields.iter()
                .map(|field| {
                    let offset = self.ranges.binding_ranges.len();
                    self.walk_var(field, path, true);
                    offset
                })
                .collect(),
            TypeLayoutKind::ParameterGroup(group) => {
                self.walk_group_contents(layout, group, path, true);
                Vec::new()
            },
            TypeLayoutKind::Array(array) if layout.has_bindings() => {
                let path = path.enter_array(array.count);
                self.walk(&array.element, &path, None, true);
                Vec::new()
            },
            _ if layout.has_bindings() => {
                self.add_leaf(layout, None, path, None, true);
                Vec::new()
            },
            _ => Vec::new(),
        }
    }

    fn walk_var(&mut self, var: &VarLayout, path: &RangePath, emit: bool) {
        let path = path.enter_var(var, self.format);
        self.walk(&var.type_layout, &path, var.var, emit);
    }

    fn walk(
        &mut self,
        layout: &Arc<TypeLayout>,
        path: &RangePath,
        leaf_var: Option<EntityId>,
        emit: bool,
    ) {
        if !layout.has_bindings() {
            return;
        }
        match &layout.kind {
            TypeLayoutKind::Struct(st) => for field in st.fields.iter() {
                self.walk_var(field, path, emit);
            },
            TypeLayoutKind::Array(array) => {
                let path = path.enter_array(array.count);
                self.walk(&array.element, &path, leaf_var, emit);
            },
            TypeLayoutKind::ParameterGroup(group) =>
                self.add_group(layout, group, path, leaf_var, emit),
            _ => self.add_leaf(layout, Some(layout), path, leaf_var, emit),
        }
    }

    fn set_index(&mut self, space: u32) -> usize {
        let sets = &mut self.ranges.descriptor_sets;
        match sets.iter().position(|set| set.space_offset == space) {
            Some(index) => index,
            None => {
                sets.push(DescriptorSetInfo {
                    space_offset: space,
                    ranges: Vec::new(),
                });
                sets.len() - 1
            },
        }
    }

    fn push_descriptors(
        &mut self,
        space: u32,
        ranges: impl IntoIterator<Item = DescriptorRangeInfo>,
    ) -> Option<(usize, usize, usize)> {
        let mut ranges = ranges.into_iter().peekable();
        ranges.peek()?;
        let set = self.set_index(space);
        let list = &mut self.ranges.descriptor_sets[set].ranges;
        let first = list.len();
        list.extend(ranges);
        Some((set, first, list.len() - first))
    }

    fn descriptor_binding_type(&self, binding_type: BindingType, kind: ResourceKind)
        -> BindingType
    {
        match (binding_type, kind) {
            (BindingType::CombinedTextureSampler, ResourceKind::ShaderResource)
                if self.format.is_d3d() => BindingType::Texture,
            (BindingType::CombinedTextureSampler, ResourceKind::SamplerState)
                if self.format.is_d3d() => BindingType::Sampler,
            _ => binding_type,
        }
    }

    fn add_leaf(
        &mut self,
        layout: &TypeLayout,
        leaf: Option<&Arc<TypeLayout>>,
        path: &RangePath,
        leaf_var: Option<EntityId>,
        emit: bool,
    ) {
        let binding_type = layout.binding_type();
        let descriptors: SmallVec<_, 2> = layout.sizes().iter()
            .filter(|&(kind, _)| self.format.is_descriptor_kind(kind))
            .map(|(kind, &size)| DescriptorRangeInfo {
                kind,
                binding_type: self.descriptor_binding_type(binding_type, kind),
                index_offset: path.base[kind],
                descriptor_count: path.count.saturating_mul(size),
            })
            .collect();
        let placed = self.push_descriptors(path.space, descriptors);

        if emit {
            let (set, first, count) = placed
                .map_or((None, 0, 0), |(set, first, count)|
                    (Some(set), first, count));
            self.ranges.binding_ranges.push(BindingRangeInfo {
                descriptor_set_index: set,
                binding_type,
                first_descriptor_range_index: first,
                descriptor_range_count: count,
                binding_count: path.count,
                leaf_var,
                leaf: leaf.cloned(),
            });
        }
    }

    fn add_group(
        &mut self,
        layout: &Arc<TypeLayout>,
        group: &ParameterGroupLayout,
        path: &RangePath,
        leaf_var: Option<EntityId>,
        emit: bool,
    ) {
        if !emit {
            self.walk_group_contents(layout, group, path, false);
            return;
        }

        let binding_range_index = self.ranges.binding_ranges.len();
        let (set, first, count, space_offset) = if group.owns_space {
            let space = path.base[ResourceKind::RegisterSpace];
            (Some(self.set_index(space)), 0, 0, space)
        } else {
            let format = self.format;
            let kinds = group.container.type_layout.consumed_kinds()
                .filter(|&kind| format.is_descriptor_kind(kind))
                .count();
            if kinds > 0 {
                let set = self.set_index(path.space);
                let first = self.ranges.descriptor_sets[set].ranges.len();
                (Some(set), first, kinds, path.space)
            } else {
                (None, 0, 0, path.space)
            }
        };
        self.ranges.binding_ranges.push(BindingRangeInfo {
            descriptor_set_index: set,
            binding_type: group.kind.binding_type(),
            first_descriptor_range_index: first,
            descriptor_range_count: count,
            binding_count: path.count,
            leaf_var,
            leaf: Some(Arc::clone(layout)),
        });

        let offsets = layout.consumed_kinds()
            .map(|kind| (kind, VarOffset { index: path.base[kind], space: path.space }))
            .collect();
        self.ranges.sub_object_ranges.push(SubObjectRangeInfo {
            binding_range_index,
            space_offset,
            offset: Arc::new(VarLayout::new(
                leaf_var, None, Arc::clone(layout), offsets)),
        });

        self.walk_group_contents(layout, group, path, false);
    }

    /// Walks the group once per element of the enclosing arrays if it
    /// owns a space, as each element is bound to sets of its own. An
    /// unsized array of blocks reports its first element only.
    fn walk_group_contents(
        &mut self,
        layout: &TypeLayout,
        group: &ParameterGroupLayout,
        path: &RangePath,
        emit: bool,
    ) {
        if !group.owns_space {
            self.walk_group_element(group, path, emit);
            return;
        }

        let format = self.format;
        let stride = layout.size(ResourceKind::RegisterSpace);
        let count = if path.count == UNBOUNDED { 1 } else { path.count };
        for i in 0..count {
            let space = path.base[ResourceKind::RegisterSpace]
                .saturating_add(i.saturating_mul(stride));
            let mut inner = path.clone();
            for (kind, base) in inner.base.iter_mut() {
                if format.is_space_scoped(kind) {
                    *base = 0;
                }
            }
            inner.base[ResourceKind::RegisterSpace] = space;
            inner.space = space;
            inner.count = 1;
            self.set_index(space);
            self.walk_group_element(group, &inner, emit);
        }
    }

    /// Records the container's own buffer and then everything inside
    /// the element. `emit` is set only when the group is the root.
    fn walk_group_element(
        &mut self,
        group: &ParameterGroupLayout,
        inner: &RangePath,
        emit: bool,
    ) {
        let format = self.format;
        let container = &group.container;
        let container_path = inner.enter_var(container, format);
        let descriptors: SmallVec<_, 1> = container.type_layout.sizes().iter()
            .filter(|&(kind, _)| format.is_descriptor_kind(kind))
            .map(|(kind, &size)| DescriptorRangeInfo {
                kind,
                binding_type: BindingType::ConstantBuffer,
                index_offset: container_path.base[kind],
                descriptor_count: inner.count.saturating_mul(size),
            })
            .collect();
        self.push_descriptors(inner.space, descriptors);

        let element = &group.element;
        let element_path = inner.enter_var(element, format);
        self.walk(&element.type_layout, &element_path, element.var, emit);
    }
}
