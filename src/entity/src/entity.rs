use bitflags::bitflags;
use derive_more::Display;

use crate::*;

pub type EntityId = Id<Entity>;

#[derive(Debug)]
pub struct Entity {
    pub(crate) name: String,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
    pub(crate) kind: EntityKind,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EntityKind {
    Module,
    Type(Type),
    Var(Var),
    TypeParam,
    Func(Func),
    Generic(Generic),
    EntryPoint(EntryPoint),
}

bitflags! {
    #[derive(Default)]
    pub struct VarModifiers: u32 {
        const UNIFORM = bit!(0);
        const IN = bit!(1);
        const OUT = bit!(2);
        const PUSH_CONSTANT = bit!(3);
        const SPECIALIZATION_CONSTANT = bit!(4);
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Var {
    pub ty: EntityId,
    pub modifiers: VarModifiers,
    pub semantic: Option<Semantic>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Func {
    /// `Var` entities.
    pub params: Vec<EntityId>,
    pub result: Option<EntityId>,
    pub result_semantic: Option<Semantic>,
}

/// A varying semantic such as `TEXCOORD1` or `SV_Target`, split into
/// its name and trailing index.
#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
#[display(fmt = "{}{}", name, index)]
pub struct Semantic {
    pub name: String,
    pub index: u32,
}

impl Semantic {
    /// A missing or unparsable index is zero.
    pub fn parse(text: &str) -> Self {
        let name = text.trim_end_matches(|c: char| c.is_ascii_digit());
        let index = text[name.len()..].parse().unwrap_or(0);
        Self { name: name.to_owned(), index }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Generic {
    /// `TypeParam` entities.
    pub params: Vec<EntityId>,
    pub inner: Option<EntityId>,
}

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Stage {
    Vertex,
    Fragment,
    Compute,
    Geometry,
    Hull,
    Domain,
    RayGeneration,
    ClosestHit,
    AnyHit,
    Miss,
    Intersection,
    Callable,
}

impl Stage {
    #[inline]
    pub fn is_ray_tracing(self) -> bool {
        matches!(self, Self::RayGeneration | Self::ClosestHit | Self::AnyHit
            | Self::Miss | Self::Intersection | Self::Callable)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntryPoint {
    pub func: EntityId,
    pub stage: Stage,
    pub name_override: Option<String>,
}

impl Entity {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    #[inline]
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn as_type(&self) -> Option<&Type> {
        match &self.kind {
            EntityKind::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<&Var> {
        match &self.kind {
            EntityKind::Var(var) => Some(var),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&Func> {
        match &self.kind {
            EntityKind::Func(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_entry_point(&self) -> Option<&EntryPoint> {
        match &self.kind {
            EntityKind::EntryPoint(entry) => Some(entry),
            _ => None,
        }
    }
}
