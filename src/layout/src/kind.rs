use std::fmt::Debug;
use std::hash::Hash;
use std::iter::FromIterator;

use derivative::Derivative;
use derive_more::Display;
use enum_map::{Enum, EnumMap};

stable_enum! {
    /// A physically distinct class of storage or binding slot that a
    /// parameter can consume.
    ///
    /// Codes are stable; new kinds are only ever appended.
    #[derive(Clone, Copy, Debug, Display, Enum, Eq, Hash, Ord, PartialEq, PartialOrd)]
    pub enum ResourceKind {
        /// Consumes nothing. Only ever returned by single-kind queries.
        None = 0,
        /// Consumes more than one kind. Only ever returned by
        /// single-kind queries.
        Mixed = 1,
        /// Ordinary data in a buffer.
        Bytes = 2,
        /// D3D `b` register.
        ConstantBuffer = 3,
        /// D3D `t` register.
        ShaderResource = 4,
        /// D3D `u` register.
        UnorderedAccess = 5,
        /// D3D `s` register.
        SamplerState = 6,
        /// Vulkan descriptor set binding.
        DescriptorTableSlot = 7,
        /// D3D12 register space or Vulkan descriptor set.
        RegisterSpace = 8,
        SpecializationConstant = 9,
        PushConstantBuffer = 10,
        VaryingInput = 11,
        VaryingOutput = 12,
        RayPayload = 13,
        HitAttributes = 14,
        CallablePayload = 15,
        ShaderRecord = 16,
        SubpassInputAttachment = 17,
        MetalArgumentBufferElement = 18,
        MetalAttribute = 19,
        MetalPayload = 20,
    }
}

impl ResourceKind {
    /// False for the `None` and `Mixed` pseudo-kinds.
    #[inline]
    pub fn is_concrete(self) -> bool {
        !matches!(self, Self::None | Self::Mixed)
    }

    /// Collapses a set of consumed kinds to a single kind.
    pub fn single(kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        let mut kinds = kinds.into_iter();
        match (kinds.next(), kinds.next()) {
            (None, _) => Self::None,
            (Some(kind), None) => kind,
            (Some(_), Some(_)) => Self::Mixed,
        }
    }
}

/// A partial map from concrete resource kinds to values, e.g. the size
/// or offset a layout has in each kind it consumes. Iteration follows
/// kind codes.
#[derive(Derivative)]
#[derivative(
    Clone(bound = "V: Clone"),
    Copy(bound = "V: Copy"),
    Default(bound = ""),
    Debug(bound = "V: Debug"),
    Eq(bound = "V: Eq"),
    Hash(bound = "V: Hash"),
    PartialEq(bound = "V: PartialEq"),
)]
pub struct KindMap<V> {
    slots: EnumMap<ResourceKind, Option<V>>,
}

impl<V> KindMap<V> {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn get(&self, kind: ResourceKind) -> Option<&V> {
        self.slots[kind].as_ref()
    }

    #[inline]
    pub fn contains_key(&self, kind: ResourceKind) -> bool {
        self.slots[kind].is_some()
    }

    /// Replaces any previous entry. `kind` must be concrete.
    #[inline]
    pub fn insert(&mut self, kind: ResourceKind, value: V) {
        debug_assert!(kind.is_concrete(), "{} used as a map key", kind);
        self.slots[kind] = Some(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, &V)> {
        self.slots.iter()
            .filter_map(|(kind, slot)| slot.as_ref().map(|value| (kind, value)))
    }

    pub fn keys(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.iter().map(|(kind, _)| kind)
    }

    /// Collapses the keys to one kind; see [`ResourceKind::single`].
    #[inline]
    pub fn single_kind(&self) -> ResourceKind {
        ResourceKind::single(self.keys())
    }
}

impl<V: Copy + Default> KindMap<V> {
    /// The value for `kind`; absent kinds read as the default.
    #[inline]
    pub fn value(&self, kind: ResourceKind) -> V {
        self.get(kind).copied().unwrap_or_default()
    }
}

impl KindMap<u32> {
    /// Accumulates a size, creating the entry at zero.
    #[inline]
    pub fn add(&mut self, kind: ResourceKind, amount: u32) {
        let total = self.value(kind) + amount;
        self.insert(kind, total);
    }
}

impl<V> FromIterator<(ResourceKind, V)> for KindMap<V> {
    fn from_iter<I>(iter: I) -> Self
        where I: IntoIterator<Item = (ResourceKind, V)>
    {
        let mut map = Self::new();
        for (kind, value) in iter {
            map.insert(kind, value);
        }
        map
    }
}

#[macro_export]
macro_rules! kind_map {
    ($($key:ident => $val:expr),*$(,)?) => {
        {
            let mut map = $crate::KindMap::new();
            $(map.insert($crate::ResourceKind::$key, $val);)*
            map
        }
    }
}
