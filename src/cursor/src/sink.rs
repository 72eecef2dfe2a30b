use std::fmt::Debug;

use derivative::Derivative;
use entity::EntityId;
use layout::{BindingType, ResourceKind};

/// Anything that can be bound to a resource, sampler, or buffer slot.
pub trait BindableResource: Debug {
    fn binding_type(&self) -> BindingType;

    /// The type the resource was created for, e.g. `Texture3D` or
    /// `StructuredBuffer<float4>`. When known it must be the type the
    /// binding's leaf declares.
    fn type_id(&self) -> Option<EntityId> {
        None
    }
}

/// One descriptor to update, addressed the way the target addresses
/// it.
///
/// On Vulkan `binding` is the binding number and `array_element` the
/// element within it. On D3D `binding` is the register and
/// `array_element` is always 0.
#[derive(Derivative)]
#[derivative(Clone(bound = ""), Copy(bound = ""), Debug(bound = "S: Debug"))]
pub struct DescriptorWrite<'a, S> {
    pub set: &'a S,
    pub set_index: usize,
    pub kind: ResourceKind,
    pub binding_type: BindingType,
    pub binding: u32,
    pub array_element: u32,
    pub resource: &'a dyn BindableResource,
}

/// Receives the writes a cursor produces. `S` is the caller's handle
/// for a descriptor set or table.
pub trait ParameterSink<S> {
    /// Writes ordinary data at `offset` bytes into the root's buffer.
    fn write_bytes(&mut self, offset: u32, data: &[u8]);

    fn write_descriptor(&mut self, write: DescriptorWrite<'_, S>);
}
