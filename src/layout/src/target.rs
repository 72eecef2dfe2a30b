use std::sync::Arc;

use entity::{EntityId, EntityKind, Session};
use log::trace;

use crate::*;

type LayoutKey = (EntityId, LayoutRules);

/// Result of a layout request: types produce type layouts, variables
/// produce variable layouts.
#[derive(Clone, Debug)]
pub enum EntityLayout {
    Type(Arc<TypeLayout>),
    Var(Arc<VarLayout>),
}

impl EntityLayout {
    pub fn type_layout(&self) -> &Arc<TypeLayout> {
        match self {
            Self::Type(layout) => layout,
            Self::Var(layout) => &layout.type_layout,
        }
    }

    pub fn as_var(&self) -> Option<&Arc<VarLayout>> {
        match self {
            Self::Var(layout) => Some(layout),
            Self::Type(_) => None,
        }
    }
}

/// One compilation target. Owns the layout cache for entities of its
/// session.
///
/// Layout requests may come from several threads at once. Cached
/// layouts are staged until `commit` is called, after which lookups
/// take no lock at all.
#[derive(Debug)]
pub struct Target {
    pub(crate) session: Arc<Session>,
    pub(crate) desc: TargetDesc,
    types: StagedCache<LayoutKey, Arc<TypeLayout>>,
    vars: StagedCache<LayoutKey, Arc<VarLayout>>,
    pub(crate) code_generator: Option<Arc<dyn CodeGenerator>>,
}

impl Target {
    pub fn new(session: Arc<Session>, desc: TargetDesc) -> Self {
        Self {
            session,
            desc,
            types: StagedCache::new(),
            vars: StagedCache::new(),
            code_generator: None,
        }
    }

    pub fn with_code_generator(mut self, generator: Arc<dyn CodeGenerator>)
        -> Self
    {
        self.code_generator = Some(generator);
        self
    }

    #[inline]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    #[inline]
    pub fn desc(&self) -> &TargetDesc {
        &self.desc
    }

    #[inline]
    pub fn format(&self) -> TargetFormat {
        self.desc.format
    }

    /// Lays out a type or variable entity under `rules`. Repeated
    /// requests return the same shared layout.
    pub fn get_entity_layout(&self, entity: EntityId, rules: LayoutRules) ->
        Result<EntityLayout>
    {
        match self.session.entity(entity)?.kind() {
            EntityKind::Type(_) =>
                Ok(EntityLayout::Type(self.type_layout(entity, rules)?)),
            EntityKind::Var(_) =>
                Ok(EntityLayout::Var(self.var_layout(entity, rules)?)),
            _ => Err(Error::UnknownEntity),
        }
    }

    #[inline]
    pub fn get_type_layout(&self, ty: EntityId, rules: LayoutRules) ->
        Result<Arc<TypeLayout>>
    {
        self.type_layout(ty, rules)
    }

    /// Moves staged layouts into the committed map.
    pub fn commit(&mut self) {
        self.types.commit();
        self.vars.commit();
    }

    /// Number of cached layouts, committed or not.
    pub fn cached_layout_count(&self) -> usize {
        self.types.len() + self.vars.len()
    }

    /// Some rules only mean something on certain targets; elsewhere
    /// they fall back to constant-buffer rules.
    fn effective_rules(&self, rules: LayoutRules) -> LayoutRules {
        match rules {
            LayoutRules::SpecializationConstant
            | LayoutRules::PushConstantBuffer
                if self.desc.format != TargetFormat::Vulkan =>
                LayoutRules::ConstantBuffer,
            _ => rules,
        }
    }

    pub(crate) fn type_layout(&self, ty: EntityId, rules: LayoutRules) ->
        Result<Arc<TypeLayout>>
    {
        let key = (ty, self.effective_rules(rules));
        if let Some(layout) = self.types.get(&key) {
            trace!("layout cache hit: {} ({})", ty, key.1);
            return Ok(layout);
        }
        self.types.get_or_try_insert_with(&key, || {
            let layout = self.compute_type_layout(ty, key.1)?;
            trace!(
                "computed layout of {} `{}` ({}, {}): {:?}",
                ty, self.session.name(ty).unwrap_or(""), self.desc.format,
                key.1, layout.sizes,
            );
            Ok(Arc::new(layout))
        })
    }

    fn var_layout(&self, var: EntityId, rules: LayoutRules) ->
        Result<Arc<VarLayout>>
    {
        let key = (var, self.effective_rules(rules));
        self.vars.get_or_try_insert_with(&key, || {
            let decl = self.session.var(var)?;
            let layout = self.type_layout(decl.ty, rules)?;
            let name = self.session.name(var).map(str::to_owned);
            Ok(Arc::new(VarLayout::at_origin(Some(var), name, layout)))
        })
    }
}
