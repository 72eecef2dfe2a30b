use fnv::FnvHashMap;
use log::trace;

use crate::*;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct SpecializationKey {
    generic: EntityId,
    args: SmallVec<EntityId, 4>,
}

/// Owns every entity. Layout targets hold a shared reference to a
/// finished session, so all construction happens up front.
#[derive(Debug, Default)]
pub struct Session {
    entities: Arena<Entity>,
    interned: FnvHashMap<Type, EntityId>,
    specializations: FnvHashMap<SpecializationKey, EntityId>,
}

impl Session {
    pub fn new() -> Self {
        Default::default()
    }

    fn add(
        &mut self,
        name: impl Into<String>,
        parent: Option<EntityId>,
        kind: EntityKind,
    ) -> EntityId {
        let id = self.entities.add(Entity {
            name: name.into(),
            parent,
            children: Vec::new(),
            kind,
        });
        if let Some(parent) = parent {
            self.entities[parent].children.push(id);
        }
        id
    }

    pub fn add_module(&mut self, name: impl Into<String>) -> EntityId {
        self.add(name, None, EntityKind::Module)
    }

    /// Returns the unique entity for a structural type. Struct types
    /// are nominal; declare them with `add_struct`.
    pub fn intern_type(&mut self, ty: Type) -> Result<EntityId> {
        if ty.is_nominal() {
            return Err(Error::NominalType);
        }
        Ok(self.intern(ty))
    }

    fn intern(&mut self, ty: Type) -> EntityId {
        if let Some(&id) = self.interned.get(&ty) {
            return id;
        }
        // Layouts of vectors and matrices refer to their scalar element.
        match ty {
            Type::Vector { elem, .. } | Type::Matrix { elem, .. } => {
                self.intern(Type::Scalar(elem));
            },
            _ => {},
        }
        let name = self.type_name(&ty);
        let id = self.add(name, None, EntityKind::Type(ty.clone()));
        self.interned.insert(ty, id);
        id
    }

    /// The entity previously interned for `ty`, if any.
    pub fn interned(&self, ty: &Type) -> Option<EntityId> {
        self.interned.get(ty).copied()
    }

    fn type_name(&self, ty: &Type) -> String {
        let name = |id| self.name(id).unwrap_or("?");
        match *ty {
            Type::Scalar(elem) => elem.to_string(),
            Type::Vector { elem, count } => format!("{}{}", elem, count),
            Type::Matrix { elem, rows, columns } =>
                format!("{}{}x{}", elem, rows, columns),
            Type::Struct { .. } => String::new(),
            Type::Array { elem, count: Some(count) } =>
                format!("{}[{}]", name(elem), count),
            Type::Array { elem, count: None } => format!("{}[]", name(elem)),
            Type::Resource { shape, access, result } => {
                let rw = if access == ResourceAccess::ReadWrite { "RW" }
                    else { "" };
                match result {
                    Some(result) => format!("{}{}<{}>", rw, shape, name(result)),
                    None => format!("{}{}", rw, shape),
                }
            },
            Type::CombinedTextureSampler { shape } =>
                format!("Sampler{}", shape.to_string().trim_start_matches("Texture")),
            Type::SamplerState => "SamplerState".to_owned(),
            Type::ConstantBuffer { elem } =>
                format!("ConstantBuffer<{}>", name(elem)),
            Type::ParameterBlock { elem } =>
                format!("ParameterBlock<{}>", name(elem)),
            Type::Param(param) => name(param).to_owned(),
        }
    }

    #[inline]
    pub fn scalar(&mut self, elem: ScalarType) -> EntityId {
        self.intern(Type::Scalar(elem))
    }

    #[inline]
    pub fn vector(&mut self, elem: ScalarType, count: u32) -> EntityId {
        self.intern(Type::Vector { elem, count })
    }

    #[inline]
    pub fn matrix(&mut self, elem: ScalarType, rows: u32, columns: u32) ->
        EntityId
    {
        self.intern(Type::Matrix { elem, rows, columns })
    }

    #[inline]
    pub fn array(&mut self, elem: EntityId, count: impl Into<Option<u32>>) ->
        EntityId
    {
        self.intern(Type::Array { elem, count: count.into() })
    }

    #[inline]
    pub fn resource(
        &mut self,
        shape: ResourceShape,
        access: ResourceAccess,
        result: Option<EntityId>,
    ) -> EntityId {
        self.intern(Type::Resource { shape, access, result })
    }

    #[inline]
    pub fn texture_2d(&mut self) -> EntityId {
        self.resource(ResourceShape::Texture2D, ResourceAccess::Read, None)
    }

    #[inline]
    pub fn combined_texture_sampler(&mut self, shape: ResourceShape) ->
        EntityId
    {
        self.intern(Type::CombinedTextureSampler { shape })
    }

    #[inline]
    pub fn sampler_state(&mut self) -> EntityId {
        self.intern(Type::SamplerState)
    }

    #[inline]
    pub fn constant_buffer(&mut self, elem: EntityId) -> EntityId {
        self.intern(Type::ConstantBuffer { elem })
    }

    #[inline]
    pub fn parameter_block(&mut self, elem: EntityId) -> EntityId {
        self.intern(Type::ParameterBlock { elem })
    }

    pub fn add_struct(
        &mut self,
        parent: Option<EntityId>,
        name: impl Into<String>,
        fields: &[(&str, EntityId)],
    ) -> EntityId {
        let fields = fields.iter()
            .map(|&(name, ty)| {
                let var = Var {
                    ty,
                    modifiers: VarModifiers::empty(),
                    semantic: None,
                };
                (name.to_owned(), var)
            })
            .collect();
        self.add_struct_with(parent, name, fields)
    }

    fn add_struct_with(
        &mut self,
        parent: Option<EntityId>,
        name: impl Into<String>,
        fields: Vec<(String, Var)>,
    ) -> EntityId {
        let id = self.add(
            name, parent, EntityKind::Type(Type::Struct { fields: vec![] }));
        let ids: Vec<_> = fields.into_iter()
            .map(|(name, var)| self.add(name, Some(id), EntityKind::Var(var)))
            .collect();
        self.entities[id].kind = EntityKind::Type(Type::Struct { fields: ids });
        id
    }

    pub fn add_global(
        &mut self,
        module: EntityId,
        name: impl Into<String>,
        ty: EntityId,
        modifiers: VarModifiers,
    ) -> EntityId {
        let modifiers = modifiers | VarModifiers::UNIFORM;
        let var = Var { ty, modifiers, semantic: None };
        self.add(name, Some(module), EntityKind::Var(var))
    }

    /// Parameters without `UNIFORM` or `OUT` are treated as `IN`.
    pub fn add_function(
        &mut self,
        module: EntityId,
        name: impl Into<String>,
        params: &[(&str, EntityId, VarModifiers)],
        result: Option<EntityId>,
    ) -> EntityId {
        let id = self.add(name, Some(module),
            EntityKind::Func(Func {
                params: vec![],
                result,
                result_semantic: None,
            }));
        let ids: Vec<_> = params.iter()
            .map(|&(name, ty, mut modifiers)| {
                if !modifiers.intersects(VarModifiers::UNIFORM | VarModifiers::OUT)
                {
                    modifiers |= VarModifiers::IN;
                }
                let var = Var { ty, modifiers, semantic: None };
                self.add(name, Some(id), EntityKind::Var(var))
            })
            .collect();
        if let EntityKind::Func(func) = &mut self.entities[id].kind {
            func.params = ids;
        }
        id
    }

    /// Attaches a semantic such as `TEXCOORD1` to a variable, or to a
    /// function's result.
    pub fn set_semantic(&mut self, id: EntityId, semantic: &str) -> Result<()> {
        let semantic = Some(Semantic::parse(semantic));
        let entity = self.entities.get_mut(id)
            .ok_or(Error::UnknownEntity(id))?;
        match &mut entity.kind {
            EntityKind::Var(var) => var.semantic = semantic,
            EntityKind::Func(func) => func.result_semantic = semantic,
            _ => return Err(Error::UnknownEntity(id)),
        }
        Ok(())
    }

    pub fn add_entry_point(
        &mut self,
        module: EntityId,
        func: EntityId,
        stage: Stage,
    ) -> Result<EntityId> {
        self.func(func)?;
        let name = self.entities[func].name.clone();
        let entry = EntryPoint { func, stage, name_override: None };
        Ok(self.add(name, Some(module), EntityKind::EntryPoint(entry)))
    }

    /// Declares a generic type. `build` receives the parameter types and
    /// returns the (struct) type they parameterize.
    pub fn add_generic(
        &mut self,
        parent: Option<EntityId>,
        name: impl Into<String>,
        params: &[&str],
        build: impl FnOnce(&mut Self, &[EntityId]) -> EntityId,
    ) -> EntityId {
        let id = self.add(name, parent,
            EntityKind::Generic(Generic { params: vec![], inner: None }));
        let params: Vec<_> = params.iter()
            .map(|&name| self.add(name, Some(id), EntityKind::TypeParam))
            .collect();
        let param_types: Vec<_> = params.iter()
            .map(|&param| self.intern(Type::Param(param)))
            .collect();
        let inner = build(self, &param_types);
        self.entities[id].kind = EntityKind::Generic(Generic {
            params,
            inner: Some(inner),
        });
        id
    }

    /// Produces the specialized type for `generic` applied to `args`.
    /// The same argument list always yields the same entity.
    pub fn specialize(&mut self, generic: EntityId, args: &[EntityId]) ->
        Result<EntityId>
    {
        let (params, inner) = match &self.entity(generic)?.kind {
            EntityKind::Generic(g) => (g.params.clone(), g.inner),
            _ => return Err(Error::NotAGeneric(generic)),
        };
        if params.len() != args.len() {
            return Err(Error::ArgumentCountMismatch {
                expected: params.len(),
                found: args.len(),
            });
        }

        let key = SpecializationKey {
            generic,
            args: args.iter().copied().collect(),
        };
        if let Some(&id) = self.specializations.get(&key) {
            return Ok(id);
        }

        let inner = inner.ok_or(Error::UnknownEntity(generic))?;
        let subst: FnvHashMap<_, _> =
            params.into_iter().zip(args.iter().copied()).collect();
        let arg_names: Vec<_> = args.iter()
            .map(|&arg| self.name(arg).unwrap_or("?"))
            .collect();
        let name = format!("{}<{}>", self.entities[generic].name,
            arg_names.join(", "));
        let id = self.substitute_struct(inner, &subst, name)?;
        trace!("specialized {} as {}", generic, id);

        self.specializations.insert(key, id);
        Ok(id)
    }

    fn mentions_param(&self, ty: EntityId) -> Result<bool> {
        Ok(match *self.ty(ty)? {
            Type::Param(_) => true,
            Type::Array { elem, .. }
            | Type::ConstantBuffer { elem }
            | Type::ParameterBlock { elem }
            | Type::Resource { result: Some(elem), .. } =>
                self.mentions_param(elem)?,
            Type::Struct { ref fields } => {
                for &field in fields {
                    if self.mentions_param(self.var(field)?.ty)? {
                        return Ok(true);
                    }
                }
                false
            },
            _ => false,
        })
    }

    fn substitute(&mut self, ty: EntityId, subst: &FnvHashMap<EntityId, EntityId>)
        -> Result<EntityId>
    {
        if !self.mentions_param(ty)? {
            return Ok(ty);
        }
        Ok(match self.ty(ty)?.clone() {
            Type::Param(param) => subst.get(&param).copied().unwrap_or(ty),
            Type::Array { elem, count } => {
                let elem = self.substitute(elem, subst)?;
                self.array(elem, count)
            },
            Type::ConstantBuffer { elem } => {
                let elem = self.substitute(elem, subst)?;
                self.constant_buffer(elem)
            },
            Type::ParameterBlock { elem } => {
                let elem = self.substitute(elem, subst)?;
                self.parameter_block(elem)
            },
            Type::Resource { shape, access, result: Some(result) } => {
                let result = self.substitute(result, subst)?;
                self.resource(shape, access, Some(result))
            },
            Type::Struct { .. } => {
                let name = self.entities[ty].name.clone();
                self.substitute_struct(ty, subst, name)?
            },
            _ => ty,
        })
    }

    fn substitute_struct(
        &mut self,
        ty: EntityId,
        subst: &FnvHashMap<EntityId, EntityId>,
        name: String,
    ) -> Result<EntityId> {
        let fields = self.ty(ty)?.fields().to_vec();
        let mut new_fields = Vec::with_capacity(fields.len());
        for field in fields {
            let mut var = self.var(field)?.clone();
            var.ty = self.substitute(var.ty, subst)?;
            let field_name = self.entities[field].name.clone();
            new_fields.push((field_name, var));
        }
        let parent = self.entities[ty].parent;
        Ok(self.add_struct_with(parent, name, new_fields))
    }

    #[inline]
    pub fn entities(&self) -> &Arena<Entity> {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity> {
        self.entities.get(id).ok_or(Error::UnknownEntity(id))
    }

    pub fn ty(&self, id: EntityId) -> Result<&Type> {
        self.entity(id)?.as_type().ok_or(Error::UnknownEntity(id))
    }

    pub fn var(&self, id: EntityId) -> Result<&Var> {
        self.entity(id)?.as_var().ok_or(Error::UnknownEntity(id))
    }

    pub fn func(&self, id: EntityId) -> Result<&Func> {
        self.entity(id)?.as_func().ok_or(Error::UnknownEntity(id))
    }

    pub fn entry_point(&self, id: EntityId) -> Result<&EntryPoint> {
        self.entity(id)?.as_entry_point().ok_or(Error::UnknownEntity(id))
    }

    pub fn name(&self, id: EntityId) -> Option<&str> {
        Some(self.entities.get(id)?.name())
    }

    /// The entry point's exported name.
    pub fn entry_point_name(&self, id: EntityId) -> Result<&str> {
        let entry = self.entry_point(id)?;
        Ok(entry.name_override.as_deref()
            .unwrap_or(&self.entities[id].name))
    }

    /// Joins the names of `id` and its ancestors with `.`.
    pub fn qualified_name(&self, id: EntityId) -> String {
        let mut names = Vec::new();
        let mut cur = Some(id);
        while let Some(entity) = cur.and_then(|id| self.entities.get(id)) {
            names.push(entity.name());
            cur = entity.parent();
        }
        names.reverse();
        names.join(".")
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.entities.get(id).map_or(&[][..], |entity| entity.children())
    }

    pub fn find_child(&self, parent: EntityId, name: &str) -> Option<EntityId> {
        self.children(parent).iter().copied()
            .find(|&child| self.entities[child].name == name)
    }

    pub fn find_field_index(&self, ty: EntityId, name: &str) -> Option<usize> {
        self.ty(ty).ok()?.fields().iter()
            .position(|&field| self.entities[field].name == name)
    }

    /// Strips every level of array from `ty`.
    pub fn unwrap_array(&self, mut ty: EntityId) -> EntityId {
        while let Ok(&Type::Array { elem, .. }) = self.ty(ty) {
            ty = elem;
        }
        ty
    }

    /// The product of all array dimensions of `ty`; `None` if any level
    /// is unsized.
    pub fn total_array_element_count(&self, mut ty: EntityId) -> Option<u32> {
        let mut total = 1u32;
        while let Ok(&Type::Array { elem, count }) = self.ty(ty) {
            total = total.checked_mul(count?)?;
            ty = elem;
        }
        Some(total)
    }
}
