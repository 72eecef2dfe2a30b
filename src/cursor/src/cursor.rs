use std::fmt::Debug;
use std::ptr;

use derivative::Derivative;
use layout::{
    BindingRangeInfo, LayoutError, ResourceKind, SubObjectRangeInfo,
    TypeLayout, UNBOUNDED,
};
use log::trace;

use crate::*;

/// A position inside a root type layout.
///
/// The root is usually a program's or entry point's type layout, or a
/// parameter block's. Binding range indices always refer to the root's
/// ranges, and byte offsets to the buffer holding the root's ordinary
/// data.
#[derive(Derivative)]
#[derivative(Clone(bound = ""), Copy(bound = ""), Debug(bound = "S: Debug"))]
pub struct ShaderCursor<'a, S> {
    #[derivative(Debug = "ignore")]
    root: &'a TypeLayout,
    sets: &'a [S],
    #[derivative(Debug = "ignore")]
    layout: &'a TypeLayout,
    byte_offset: u32,
    binding_range_index: usize,
    array_index: u32,
}

/// A nested parameter group reached by a cursor.
#[derive(Clone, Copy, Debug)]
pub struct SubObject<'a> {
    pub range: &'a SubObjectRangeInfo,
    /// Index within the binding range for arrays of groups.
    pub array_index: u32,
}

impl<'a> SubObject<'a> {
    /// The group's type layout; a new cursor over the group's contents
    /// starts here.
    #[inline]
    pub fn type_layout(&self) -> &'a TypeLayout {
        self.range.offset.type_layout()
    }

    /// Space offset of this element. Elements of an array of blocks
    /// take consecutive runs of spaces.
    pub fn space_offset(&self) -> u32 {
        let group = self.type_layout();
        let owns_space = group.as_parameter_group()
            .map_or(false, |group| group.owns_space());
        if !owns_space {
            return self.range.space_offset;
        }
        let stride = group.size(ResourceKind::RegisterSpace);
        self.range.space_offset
            .saturating_add(self.array_index.saturating_mul(stride))
    }
}

impl<'a, S> ShaderCursor<'a, S> {
    /// `sets` holds one handle per descriptor set of `root`, in the
    /// order of `root.descriptor_sets()`.
    pub fn new(root: &'a TypeLayout, sets: &'a [S]) -> Self {
        Self {
            root,
            sets,
            layout: root,
            byte_offset: 0,
            binding_range_index: 0,
            array_index: 0,
        }
    }

    #[inline]
    pub fn type_layout(&self) -> &'a TypeLayout {
        self.layout
    }

    #[inline]
    pub fn byte_offset(&self) -> u32 {
        self.byte_offset
    }

    #[inline]
    pub fn binding_range_index(&self) -> usize {
        self.binding_range_index
    }

    #[inline]
    pub fn array_index(&self) -> u32 {
        self.array_index
    }

    /// The layout fields are looked up in. A root parameter group
    /// stands for its element, whose ranges it reports in order.
    fn aggregate(&self) -> Result<&'a TypeLayout> {
        match self.layout.as_parameter_group() {
            Some(group) if ptr::eq(self.layout, self.root) =>
                Ok(&**group.element_var_layout().type_layout()),
            Some(_) => Err(Error::NestedGroup),
            None => Ok(self.layout),
        }
    }

    pub fn into_field(&self, index: usize) -> Result<Self> {
        let aggregate = self.aggregate()?;
        let field = aggregate.field(index)?;
        let first_range = aggregate.binding_range_offset_for_field(index)?;
        Ok(Self {
            layout: field.type_layout(),
            byte_offset: self.byte_offset + field.offset(ResourceKind::Bytes),
            binding_range_index: self.binding_range_index + first_range,
            ..*self
        })
    }

    pub fn into_field_by_name(&self, name: &str) -> Result<Self> {
        let index = self.aggregate()?.find_field_index(name)?;
        self.into_field(index)
    }

    pub fn into_element(&self, index: u32) -> Result<Self> {
        let array = self.layout.as_array().ok_or(LayoutError::NotAnArray)?;
        if let Some(count) = array.count {
            if index >= count {
                return Err(LayoutError::ElementIndexOutOfRange { index, count }
                    .into());
            }
        }
        let count = array.count.unwrap_or(UNBOUNDED);
        let overflow = || LayoutError::ElementOffsetOverflow { index };
        let byte_offset = index.checked_mul(array.element_stride)
            .and_then(|offset| self.byte_offset.checked_add(offset))
            .ok_or_else(overflow)?;
        let array_index = self.array_index.checked_mul(count)
            .and_then(|linear| linear.checked_add(index))
            .ok_or_else(overflow)?;
        Ok(Self {
            layout: &array.element,
            byte_offset,
            array_index,
            ..*self
        })
    }

    /// Copies `data` to the current location. The write may be shorter
    /// than the current node but never longer.
    pub fn write_ordinary_bytes(
        &self,
        sink: &mut impl ParameterSink<S>,
        data: &[u8],
    ) -> Result<()> {
        if !self.layout.consumes(ResourceKind::Bytes) {
            return Err(LayoutError::NotOrdinaryData.into());
        }
        let capacity = self.layout.size(ResourceKind::Bytes) as usize;
        if data.len() > capacity {
            return Err(LayoutError::OrdinaryDataOverflow {
                size: data.len(),
                capacity,
            }.into());
        }
        sink.write_bytes(self.byte_offset, data);
        Ok(())
    }

    fn binding_range(&self) -> Result<&'a BindingRangeInfo> {
        Ok(self.root.binding_range(self.binding_range_index)?)
    }

    /// Binds `resource` at the current leaf, emitting one write per
    /// descriptor range the leaf's binding range spans.
    pub fn write_binding(
        &self,
        sink: &mut impl ParameterSink<S>,
        resource: &dyn BindableResource,
    ) -> Result<()> {
        let range = self.binding_range()?;
        let found = resource.binding_type();
        if found != range.binding_type {
            return Err(LayoutError::ResourceKindMismatch {
                expected: range.binding_type,
                found,
            }.into());
        }
        if let (Some(found), Some(expected)) =
            (resource.type_id(), range.leaf_type_layout(self.root).ty())
        {
            if found != expected {
                return Err(LayoutError::ResourceTypeMismatch { expected, found }
                    .into());
            }
        }
        if self.array_index >= range.binding_count {
            return Err(LayoutError::ElementIndexOutOfRange {
                index: self.array_index,
                count: range.binding_count,
            }.into());
        }

        let set_index = match range.descriptor_set_index {
            Some(index) => index,
            None => return Ok(()),
        };
        let set = self.sets.get(set_index)
            .ok_or(Error::MissingSet(set_index))?;
        for descriptors in range.descriptor_ranges(self.root) {
            let (binding, array_element) =
                if descriptors.kind == ResourceKind::DescriptorTableSlot {
                    (descriptors.index_offset, self.array_index)
                } else {
                    (descriptors.index_offset + self.array_index, 0)
                };
            trace!(
                "ShaderCursor::write_binding: set: {}, binding: {}[{}], {}",
                set_index, binding, array_element, descriptors.binding_type,
            );
            sink.write_descriptor(DescriptorWrite {
                set,
                set_index,
                kind: descriptors.kind,
                binding_type: descriptors.binding_type,
                binding,
                array_element,
                resource,
            });
        }
        Ok(())
    }

    /// The nested parameter group at the current location.
    pub fn sub_object(&self) -> Result<SubObject<'a>> {
        let range = self.binding_range()?;
        if !range.binding_type.is_container() {
            return Err(LayoutError::NotAnAggregate.into());
        }
        let sub = self.root
            .sub_object_range_for_binding_range(self.binding_range_index)
            .ok_or(LayoutError::NotAnAggregate)?;
        Ok(SubObject { range: sub, array_index: self.array_index })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use entity::{ScalarType, Session};
    use layout::{BindingType, LayoutRules, Target, TargetDesc, TargetFormat};
    use super::*;

    #[derive(Debug)]
    struct Texture;

    impl BindableResource for Texture {
        fn binding_type(&self) -> BindingType {
            BindingType::Texture
        }
    }

    #[derive(Debug, Default)]
    struct Recorder {
        bytes: Vec<(u32, Vec<u8>)>,
        descriptors: Vec<(u32, u32, u32)>,
    }

    impl ParameterSink<u32> for Recorder {
        fn write_bytes(&mut self, offset: u32, data: &[u8]) {
            self.bytes.push((offset, data.to_vec()));
        }

        fn write_descriptor(&mut self, write: DescriptorWrite<'_, u32>) {
            self.descriptors.push((*write.set, write.binding, write.array_element));
        }
    }

    /// `struct Light { float3 intensity; Texture2D shadowMap;
    /// float radius; Texture2D cookieMap; }`
    fn light_block(format: TargetFormat) -> Arc<TypeLayout> {
        let mut session = Session::new();
        let float = session.scalar(ScalarType::Float32);
        let float3 = session.vector(ScalarType::Float32, 3);
        let tex = session.texture_2d();
        let light = session.add_struct(None, "Light", &[
            ("intensity", float3),
            ("shadowMap", tex),
            ("radius", float),
            ("cookieMap", tex),
        ]);
        let block = session.parameter_block(light);
        let target = Target::new(Arc::new(session), TargetDesc::new(format));
        target.get_type_layout(block, LayoutRules::Default).unwrap()
    }

    #[test]
    fn root_group_fields() {
        let layout = light_block(TargetFormat::Vulkan);
        let sets = [7u32];
        let root = ShaderCursor::new(&layout, &sets);
        let mut sink = Recorder::default();

        let radius = root.into_field_by_name("radius").unwrap();
        assert_eq!(radius.byte_offset(), 12);
        radius.write_ordinary_bytes(&mut sink, &1.5f32.to_ne_bytes()).unwrap();
        assert_eq!(sink.bytes, [(12, 1.5f32.to_ne_bytes().to_vec())]);

        let cookie = root.into_field(3).unwrap();
        assert_eq!(cookie.binding_range_index(), 1);
        cookie.write_binding(&mut sink, &Texture).unwrap();
        // Binding 0 holds the block's constant buffer
        assert_eq!(sink.descriptors, [(7, 2, 0)]);
    }

    #[test]
    fn byte_write_errors() {
        let layout = light_block(TargetFormat::D3D12);
        let root = ShaderCursor::new(&layout, &[0u32]);
        let mut sink = Recorder::default();

        let intensity = root.into_field(0).unwrap();
        assert_eq!(
            intensity.write_ordinary_bytes(&mut sink, &[0; 16]),
            Err(Error::Layout(
                LayoutError::OrdinaryDataOverflow { size: 16, capacity: 12 })),
        );
        let shadow = root.into_field(1).unwrap();
        assert_eq!(
            shadow.write_ordinary_bytes(&mut sink, &[0; 4]),
            Err(Error::Layout(LayoutError::NotOrdinaryData)),
        );
        assert!(sink.bytes.is_empty());
    }

    #[test]
    fn binding_errors() {
        #[derive(Debug)]
        struct Sampler;

        impl BindableResource for Sampler {
            fn binding_type(&self) -> BindingType {
                BindingType::Sampler
            }
        }

        let layout = light_block(TargetFormat::D3D12);
        let root = ShaderCursor::<u32>::new(&layout, &[]);
        let mut sink = Recorder::default();

        let shadow = root.into_field(1).unwrap();
        assert_eq!(
            shadow.write_binding(&mut sink, &Sampler),
            Err(Error::Layout(LayoutError::ResourceKindMismatch {
                expected: BindingType::Texture,
                found: BindingType::Sampler,
            })),
        );
        assert_eq!(shadow.write_binding(&mut sink, &Texture),
            Err(Error::MissingSet(0)));
        assert_eq!(shadow.sub_object().unwrap_err(),
            Error::Layout(LayoutError::NotAnAggregate));
        assert_eq!(shadow.into_element(0).unwrap_err(),
            Error::Layout(LayoutError::NotAnArray));
        assert!(sink.descriptors.is_empty());
    }
}
