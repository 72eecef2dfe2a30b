use std::sync::Arc;

use enum_map::EnumMap;

use crate::*;

/// Absolute location of a variable for one resource kind.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct BindingLocation {
    /// Register, binding, or byte offset.
    pub index: u32,
    /// Register space or descriptor set.
    pub space: u32,
    /// Element within an arrayed binding (Vulkan).
    pub array_element: u32,
}

/// Walks a layout from a root variable, accumulating absolute offsets.
///
/// Offsets are relative to the immediately enclosing aggregate or
/// group, so they cannot simply be summed along a path: stepping into
/// a parameter group restarts ordinary data at the element and, for a
/// block with its own space, restarts its scoped kinds as well. Arrays
/// of aggregates split into one array per field for every kind but
/// Vulkan bindings, so inner offsets of those kinds are scaled by the
/// enclosing element count.
#[derive(Clone, Debug)]
pub struct VarLayoutChain {
    format: TargetFormat,
    var: Arc<VarLayout>,
    layout: Arc<TypeLayout>,
    base: EnumMap<ResourceKind, u32>,
    space: u32,
    /// Product of enclosing array counts.
    count: u32,
    /// Linear index among the elements of enclosing arrays.
    array_index: u32,
}

impl VarLayoutChain {
    pub fn new(format: TargetFormat, root: Arc<VarLayout>) -> Self {
        let mut base = EnumMap::default();
        for (kind, offset) in root.offsets().iter() {
            base[kind] = offset.index;
        }
        Self {
            format,
            layout: Arc::clone(&root.type_layout),
            var: root,
            base,
            space: 0,
            count: 1,
            array_index: 0,
        }
    }

    /// A chain rooted at a variable of type `layout` at offset zero.
    /// Nested blocks are numbered the way the type's own descriptor
    /// sets are: after space 0 if the type has loose descriptors.
    pub fn for_type(format: TargetFormat, layout: Arc<TypeLayout>) -> Self {
        let space = format.root_space(&layout);
        let mut chain = Self::new(format,
            Arc::new(VarLayout::at_origin(None, None, layout)));
        chain.base[ResourceKind::RegisterSpace] = space;
        chain
    }

    /// The variable most recently stepped into.
    #[inline]
    pub fn var_layout(&self) -> &Arc<VarLayout> {
        &self.var
    }

    #[inline]
    pub fn type_layout(&self) -> &Arc<TypeLayout> {
        &self.layout
    }

    #[inline]
    pub fn array_index(&self) -> u32 {
        self.array_index
    }

    fn add_offsets(&mut self, var: &VarLayout) {
        for (kind, offset) in var.offsets().iter() {
            let scale = if kind != ResourceKind::Bytes
                && self.format.splits_arrays(kind) { self.count } else { 1 };
            self.base[kind] = self.base[kind]
                .saturating_add(offset.index.saturating_mul(scale));
        }
    }

    fn step(&self, var: &Arc<VarLayout>) -> Self {
        let mut next = self.clone();
        next.add_offsets(var);
        next.var = Arc::clone(var);
        next.layout = Arc::clone(&var.type_layout);
        next
    }

    /// The state inside a group before its element's offsets apply.
    fn group_scope(&self, group: &ParameterGroupLayout) -> Self {
        let mut scope = self.clone();
        scope.base[ResourceKind::Bytes] = 0;
        if group.owns_space {
            let stride = self.layout.size(ResourceKind::RegisterSpace);
            let space = self.base[ResourceKind::RegisterSpace]
                .saturating_add(self.array_index.saturating_mul(stride));
            for (kind, base) in scope.base.iter_mut() {
                if self.format.is_space_scoped(kind) {
                    *base = 0;
                }
            }
            scope.base[ResourceKind::RegisterSpace] = space;
            scope.space = space;
            scope.count = 1;
            scope.array_index = 0;
        }
        scope
    }

    /// Steps from a parameter group into its element.
    pub fn group_element(&self) -> Result<Self> {
        let group = self.layout.as_parameter_group()
            .ok_or(Error::NotAnAggregate)?;
        Ok(self.group_scope(group).step(&group.element))
    }

    /// Steps into field `index`. A parameter group is entered
    /// implicitly.
    pub fn field(&self, index: usize) -> Result<Self> {
        if self.layout.as_parameter_group().is_some() {
            return self.group_element()?.field(index);
        }
        let field = self.layout.field(index)?;
        Ok(self.step(field))
    }

    pub fn field_by_name(&self, name: &str) -> Result<Self> {
        if self.layout.as_parameter_group().is_some() {
            return self.group_element()?.field_by_name(name);
        }
        let index = self.layout.find_field_index(name)?;
        self.field(index)
    }

    pub fn element(&self, index: u32) -> Result<Self> {
        let array = self.layout.as_array().ok_or(Error::NotAnArray)?;
        if let Some(count) = array.count {
            if index >= count {
                return Err(Error::ElementIndexOutOfRange { index, count });
            }
        }
        let count = array.count.unwrap_or(UNBOUNDED);
        let overflow = Error::ElementOffsetOverflow { index };

        let mut next = self.clone();
        next.base[ResourceKind::Bytes] = index.checked_mul(array.element_stride)
            .and_then(|offset| self.base[ResourceKind::Bytes].checked_add(offset))
            .ok_or_else(|| overflow.clone())?;
        next.array_index = self.array_index.checked_mul(count)
            .and_then(|linear| linear.checked_add(index))
            .ok_or_else(|| overflow.clone())?;
        next.count = self.count.saturating_mul(count);
        next.layout = Arc::clone(&array.element);

        // Every register the element occupies must stay addressable.
        for (kind, &size) in next.layout.sizes().iter() {
            if kind == ResourceKind::Bytes || !self.format.splits_arrays(kind) {
                continue;
            }
            next.array_index.checked_mul(size)
                .and_then(|offset| next.base[kind].checked_add(offset))
                .ok_or_else(|| overflow.clone())?;
        }
        Ok(next)
    }

    fn locate(&self, kind: ResourceKind, size: u32) -> BindingLocation {
        let space = if self.format.is_space_scoped(kind) { self.space }
            else { 0 };
        let base = self.base[kind];
        if kind == ResourceKind::Bytes {
            BindingLocation { index: base, ..Default::default() }
        } else if self.format.splits_arrays(kind) {
            BindingLocation {
                index: base.saturating_add(self.array_index.saturating_mul(size)),
                space,
                array_element: 0,
            }
        } else {
            BindingLocation { index: base, space, array_element: self.array_index }
        }
    }

    /// Absolute location of the current node for `kind`.
    pub fn location(&self, kind: ResourceKind) -> BindingLocation {
        self.locate(kind, self.layout.size(kind))
    }

    /// Absolute location of the buffer behind the current parameter
    /// group.
    pub fn container_location(&self, kind: ResourceKind) ->
        Result<BindingLocation>
    {
        let group = self.layout.as_parameter_group()
            .ok_or(Error::NotAnAggregate)?;
        if kind == ResourceKind::Bytes {
            // The group's own bytes are the host-side handle
            return Ok(self.location(kind));
        }
        let container = &group.container;
        Ok(self.group_scope(group).step(container)
            .locate(kind, container.type_layout.size(kind)))
    }

    /// A variable layout carrying the current node's absolute offsets.
    pub fn absolute_var_layout(&self) -> VarLayout {
        let offsets = self.layout.consumed_kinds()
            .map(|kind| {
                let location = self.location(kind);
                (kind, VarOffset { index: location.index, space: location.space })
            })
            .collect();
        VarLayout::new(
            self.var.var,
            self.var.name.clone(),
            Arc::clone(&self.layout),
            offsets,
        )
    }
}

#[cfg(test)]
mod tests {
    use entity::{EntityId, Session};
    use crate::testing::*;
    use super::*;

    fn chain(target: &Target, ty: EntityId) -> VarLayoutChain {
        let layout = target.get_type_layout(ty, LayoutRules::Default).unwrap();
        VarLayoutChain::for_type(target.format(), layout)
    }

    #[test]
    fn nested_struct_bytes() {
        let mut session = Session::new();
        let [_, _, c] = nested_structs(&mut session);
        let cb = session.constant_buffer(c);
        let target = target(session, TargetFormat::D3D11);

        let x = chain(&target, cb)
            .field_by_name("b").unwrap()
            .field_by_name("a").unwrap()
            .field_by_name("x").unwrap();
        assert_eq!(x.location(ResourceKind::Bytes).index, 32);
        assert_eq!(x.var_layout().offset_bytes(), Ok(0));
        assert_eq!(x.absolute_var_layout().offset(ResourceKind::Bytes), 32);
    }

    #[test]
    fn constant_buffer_element_follows_container() {
        let mut session = Session::new();
        let float = float(&mut session);
        let tex = session.texture_2d();
        let a = session.add_struct(None, "A", &[
            ("x", float),
            ("t", tex),
            ("y", float),
        ]);
        let cb = session.constant_buffer(a);
        let names: Vec<_> = (0..10).map(|i| format!("t{}", i)).collect();
        let mut fields: Vec<_> = names.iter()
            .map(|name| (name.as_str(), tex))
            .collect();
        fields.push(("cb", cb));
        let s = session.add_struct(None, "S", &fields);
        let target = target(session, TargetFormat::Vulkan);

        let cb = chain(&target, s).field_by_name("cb").unwrap();
        let slot = ResourceKind::DescriptorTableSlot;
        assert_eq!(cb.container_location(slot).unwrap().index, 10);
        let t = cb.field_by_name("t").unwrap();
        assert_eq!(t.var_layout().offset(slot), 1);
        assert_eq!(t.location(slot).index, 11);

        let y = cb.field_by_name("y").unwrap();
        assert_eq!(y.location(ResourceKind::Bytes).index, 4);
        assert_eq!(cb.container_location(ResourceKind::Bytes).unwrap().index, 0);
        assert_eq!(t.container_location(slot).unwrap_err(), Error::NotAnAggregate);
    }

    #[test]
    fn nested_array_linearization() {
        let mut session = Session::new();
        let tex = session.texture_2d();
        let row = session.array(tex, 4);
        let grid = session.array(row, 3);
        let flat = session.array(tex, 12);
        let session = Arc::new(session);

        for &format in &[TargetFormat::D3D11, TargetFormat::Vulkan] {
            let target = Target::new(Arc::clone(&session), TargetDesc::new(format));
            let nested = chain(&target, grid)
                .element(2).unwrap()
                .element(1).unwrap();
            let flat = chain(&target, flat).element(9).unwrap();
            assert_eq!(nested.array_index(), 9);
            assert_eq!(flat.array_index(), 9);

            let kind = flat.type_layout().consumed_kind();
            assert_eq!(nested.location(kind), flat.location(kind));
        }

        let target = Target::new(session, TargetDesc::new(TargetFormat::D3D11));
        assert_eq!(
            chain(&target, grid).element(3).unwrap_err(),
            Error::ElementIndexOutOfRange { index: 3, count: 3 },
        );
        assert_eq!(chain(&target, tex).element(0).unwrap_err(), Error::NotAnArray);
    }

    #[test]
    fn unsized_array_offsets_overflow() {
        let mut session = Session::new();
        let float = float(&mut session);
        let floats = session.array(float, None);
        let tex = session.texture_2d();
        let textures = session.array(tex, None);
        let data = session.add_struct(None, "Data", &[
            ("x", float),
            ("f", floats),
        ]);
        let maps = session.add_struct(None, "Maps", &[
            ("u", tex),
            ("t", textures),
        ]);
        let session = Arc::new(session);

        let cpu = Target::new(Arc::clone(&session), TargetDesc::new(TargetFormat::Cpu));
        let f = chain(&cpu, data).field_by_name("f").unwrap();
        assert_eq!(f.element(1000).unwrap().location(ResourceKind::Bytes).index,
            4 + 4000);
        let index = u32::MAX / 2;
        assert_eq!(f.element(index).unwrap_err(),
            Error::ElementOffsetOverflow { index });

        let d3d = Target::new(session, TargetDesc::new(TargetFormat::D3D11));
        let t = chain(&d3d, maps).field_by_name("t").unwrap();
        assert_eq!(t.element(7).unwrap().location(ResourceKind::ShaderResource)
            .index, 8);
        assert_eq!(t.element(u32::MAX).unwrap_err(),
            Error::ElementOffsetOverflow { index: u32::MAX });
    }

    #[test]
    fn arrays_of_structs_split() {
        let mut session = Session::new();
        let tex = session.texture_2d();
        let pair = session.add_struct(None, "Pair", &[("a", tex), ("b", tex)]);
        let pairs = session.array(pair, 3);
        let s = session.add_struct(None, "S", &[("first", tex), ("pairs", pairs)]);
        let session = Arc::new(session);

        let d3d = Target::new(Arc::clone(&session),
            TargetDesc::new(TargetFormat::D3D11));
        let b = chain(&d3d, s)
            .field_by_name("pairs").unwrap()
            .element(1).unwrap()
            .field_by_name("b").unwrap();
        assert_eq!(b.location(ResourceKind::ShaderResource).index, 5);

        let vulkan = Target::new(session, TargetDesc::new(TargetFormat::Vulkan));
        let b = chain(&vulkan, s)
            .field_by_name("pairs").unwrap()
            .element(1).unwrap()
            .field_by_name("b").unwrap();
        assert_eq!(b.location(ResourceKind::DescriptorTableSlot),
            BindingLocation { index: 2, space: 0, array_element: 1 });
    }

    #[test]
    fn parameter_block_spaces() {
        let mut session = Session::new();
        let light = light(&mut session);
        let block = session.parameter_block(light);
        let s = session.add_struct(None, "S", &[("a", block), ("b", block)]);
        let target = target(session, TargetFormat::D3D12);

        let b = chain(&target, s).field_by_name("b").unwrap();
        assert_eq!(b.location(ResourceKind::RegisterSpace).index, 1);
        assert_eq!(b.container_location(ResourceKind::ConstantBuffer).unwrap(),
            BindingLocation { index: 0, space: 1, array_element: 0 });

        let cookie = b.field_by_name("cookieMap").unwrap();
        assert_eq!(cookie.location(ResourceKind::ShaderResource),
            BindingLocation { index: 1, space: 1, array_element: 0 });
        let absolute = cookie.absolute_var_layout();
        assert_eq!(absolute.binding_index(), Ok(1));
        assert_eq!(absolute.binding_space(), Ok(1));
        assert_eq!(absolute.name(), Some("cookieMap"));

        let radius = b.field_by_name("radius").unwrap();
        assert_eq!(radius.location(ResourceKind::Bytes).index, 12);
    }
}
