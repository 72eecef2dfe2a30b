use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use enum_map::EnumMap;
use entity::{EntityId, Program, Stage, VarModifiers};
use log::debug;

use crate::*;
use crate::ranges::build_root_ranges;

/// Produces target code for a specialized program. Nothing in this
/// crate generates code; a target without a generator reports
/// `CodeUnavailable`.
pub trait CodeGenerator: Debug + Send + Sync {
    fn program_code(&self, target: &TargetDesc, program: &ProgramLayout) ->
        Result<Vec<u8>>;

    fn entry_point_code(
        &self,
        target: &TargetDesc,
        program: &ProgramLayout,
        entry_point: &EntryPointLayout,
    ) -> Result<Vec<u8>>;
}

/// Layout of a linked program on one target.
///
/// The root variable has either a fictitious struct type with one field
/// per global parameter or, if the globals include ordinary data, a
/// constant buffer of that struct. Offsets reachable from the root are
/// absolute.
#[derive(Debug)]
pub struct ProgramLayout {
    var_layout: Arc<VarLayout>,
    params: Vec<Arc<VarLayout>>,
    entry_points: Vec<EntryPointLayout>,
}

/// Layout of one entry point's parameters.
///
/// Uniform parameters are allocated after the program's globals and
/// after the entry points that precede this one. Varying parameters
/// are numbered from zero.
#[derive(Debug)]
pub struct EntryPointLayout {
    entry_point: EntityId,
    name: String,
    stage: Stage,
    var_layout: Arc<VarLayout>,
    params: Vec<Arc<VarLayout>>,
    result: Option<Arc<VarLayout>>,
}

fn find_param<'a>(params: &'a [Arc<VarLayout>], name: &str) ->
    Result<&'a Arc<VarLayout>>
{
    params.iter().find(|param| param.name() == Some(name))
        .ok_or_else(|| Error::UnknownName(name.to_owned()))
}

impl ProgramLayout {
    #[inline]
    pub fn var_layout(&self) -> &Arc<VarLayout> {
        &self.var_layout
    }

    #[inline]
    pub fn type_layout(&self) -> &Arc<TypeLayout> {
        &self.var_layout.type_layout
    }

    /// Global parameters with absolute offsets.
    #[inline]
    pub fn params(&self) -> &[Arc<VarLayout>] {
        &self.params
    }

    pub fn find_param(&self, name: &str) -> Result<&Arc<VarLayout>> {
        find_param(&self.params, name)
    }

    /// Descriptor sets of the globals, at absolute set indices.
    #[inline]
    pub fn descriptor_sets(&self) -> &[DescriptorSetInfo] {
        self.type_layout().descriptor_sets()
    }

    #[inline]
    pub fn binding_ranges(&self) -> &[BindingRangeInfo] {
        self.type_layout().binding_ranges()
    }

    #[inline]
    pub fn entry_points(&self) -> &[EntryPointLayout] {
        &self.entry_points
    }

    pub fn find_entry_point(&self, name: &str) -> Result<&EntryPointLayout> {
        self.entry_points.iter().find(|entry| entry.name == name)
            .ok_or_else(|| Error::UnknownName(name.to_owned()))
    }
}

impl EntryPointLayout {
    #[inline]
    pub fn entry_point(&self) -> EntityId {
        self.entry_point
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The root of the uniform parameters.
    #[inline]
    pub fn var_layout(&self) -> &Arc<VarLayout> {
        &self.var_layout
    }

    #[inline]
    pub fn type_layout(&self) -> &Arc<TypeLayout> {
        &self.var_layout.type_layout
    }

    /// Every explicit parameter in declaration order, with absolute
    /// offsets.
    #[inline]
    pub fn params(&self) -> &[Arc<VarLayout>] {
        &self.params
    }

    pub fn find_param(&self, name: &str) -> Result<&Arc<VarLayout>> {
        find_param(&self.params, name)
    }

    #[inline]
    pub fn result_var_layout(&self) -> Option<&Arc<VarLayout>> {
        self.result.as_ref()
    }

    #[inline]
    pub fn descriptor_sets(&self) -> &[DescriptorSetInfo] {
        self.type_layout().descriptor_sets()
    }

    #[inline]
    pub fn binding_ranges(&self) -> &[BindingRangeInfo] {
        self.type_layout().binding_ranges()
    }
}

/// A program specialized to a target: its layout plus access to code.
#[derive(Debug)]
pub struct TargetProgram {
    desc: TargetDesc,
    program: Program,
    layout: ProgramLayout,
    code_generator: Option<Arc<dyn CodeGenerator>>,
}

impl Deref for TargetProgram {
    type Target = ProgramLayout;
    fn deref(&self) -> &Self::Target {
        &self.layout
    }
}

impl TargetProgram {
    #[inline]
    pub fn desc(&self) -> &TargetDesc {
        &self.desc
    }

    #[inline]
    pub fn program(&self) -> &Program {
        &self.program
    }

    #[inline]
    pub fn layout(&self) -> &ProgramLayout {
        &self.layout
    }

    /// Walks global parameters from the program root.
    pub fn chain(&self) -> VarLayoutChain {
        VarLayoutChain::new(self.desc.format, Arc::clone(&self.layout.var_layout))
    }

    pub fn get_code(&self) -> Result<Vec<u8>> {
        let generator = self.code_generator.as_ref()
            .ok_or(Error::CodeUnavailable)?;
        generator.program_code(&self.desc, &self.layout)
    }

    pub fn target_entry_points(&self) ->
        impl ExactSizeIterator<Item = TargetEntryPoint<'_>>
    {
        self.layout.entry_points.iter()
            .map(move |layout| TargetEntryPoint { program: self, layout })
    }

    pub fn find_target_entry_point(&self, name: &str) ->
        Result<TargetEntryPoint<'_>>
    {
        let layout = self.layout.find_entry_point(name)?;
        Ok(TargetEntryPoint { program: self, layout })
    }
}

/// An entry point of a [`TargetProgram`].
#[derive(Clone, Copy, Debug)]
pub struct TargetEntryPoint<'a> {
    program: &'a TargetProgram,
    layout: &'a EntryPointLayout,
}

impl<'a> Deref for TargetEntryPoint<'a> {
    type Target = EntryPointLayout;
    fn deref(&self) -> &Self::Target {
        self.layout
    }
}

impl<'a> TargetEntryPoint<'a> {
    #[inline]
    pub fn program(&self) -> &'a TargetProgram {
        self.program
    }

    /// Walks uniform parameters from the entry point's root.
    pub fn chain(&self) -> VarLayoutChain {
        VarLayoutChain::new(self.program.desc.format,
            Arc::clone(&self.layout.var_layout))
    }

    pub fn get_code(&self) -> Result<Vec<u8>> {
        let generator = self.program.code_generator.as_ref()
            .ok_or(Error::CodeUnavailable)?;
        generator.entry_point_code(
            &self.program.desc, &self.program.layout, self.layout)
    }
}

impl Target {
    /// Lays out a linked program and all of its entry points.
    pub fn specialize_program(&self, program: &Program) ->
        Result<TargetProgram>
    {
        let format = self.desc.format;
        let globals = self.uniform_root(
            program.globals(), ParameterGroupKind::ConstantBuffer)?;

        let entry_kind = if format == TargetFormat::Vulkan {
            ParameterGroupKind::PushConstantBuffer
        } else {
            ParameterGroupKind::ConstantBuffer
        };
        let mut entries = Vec::with_capacity(program.entry_points().len());
        for &id in program.entry_points() {
            let func = self.session.func(self.session.entry_point(id)?.func)?;
            let uniforms: Vec<_> = func.params.iter().copied()
                .filter(|&param| self.session.var(param)
                    .map_or(false, |var| var.modifiers
                        .contains(VarModifiers::UNIFORM)))
                .collect();
            let root = self.uniform_root(&uniforms, entry_kind)?;
            entries.push((id, uniforms, root));
        }

        let reserve = format.has_loose_descriptors(&globals) || entries.iter()
            .any(|(_, _, root)| format.has_loose_descriptors(root));

        let mut next: EnumMap<ResourceKind, u32> = EnumMap::default();
        if reserve {
            next[ResourceKind::RegisterSpace] = 1;
        }

        let var_layout = self.place_root(globals, &mut next, reserve);
        let chain = VarLayoutChain::new(format, Arc::clone(&var_layout));
        let mut params = Vec::with_capacity(program.globals().len());
        for index in 0..program.globals().len() {
            params.push(Arc::new(chain.field(index)?.absolute_var_layout()));
        }

        let mut entry_points = Vec::with_capacity(entries.len());
        for (id, uniforms, root) in entries {
            let root = self.place_root(root, &mut next, reserve);
            entry_points.push(self.entry_point_layout(id, &uniforms, root)?);
        }

        let layout = ProgramLayout { var_layout, params, entry_points };
        debug!(
            "{} program layout: {} globals, {} entry points, {} descriptor sets",
            format, layout.params.len(), layout.entry_points.len(),
            layout.descriptor_sets().len(),
        );

        Ok(TargetProgram {
            desc: self.desc,
            program: program.clone(),
            layout,
            code_generator: self.code_generator.clone(),
        })
    }

    /// Lays out `params` as a fictitious struct, wrapped in a group of
    /// kind `wrap` if it holds ordinary data.
    fn uniform_root(&self, params: &[EntityId], wrap: ParameterGroupKind) ->
        Result<TypeLayout>
    {
        let rules = if wrap == ParameterGroupKind::PushConstantBuffer {
            LayoutRules::PushConstantBuffer
        } else {
            LayoutRules::Default
        };
        let shape = self.struct_shape(params, rules)?;
        let layout = self.finish(None, rules, shape);
        if layout.size(ResourceKind::Bytes) == 0
            || self.desc.format == TargetFormat::Cpu
        {
            return Ok(layout);
        }
        let shape = self.wrap_group(None, wrap, Arc::new(layout), None);
        Ok(self.finish(None, rules, shape))
    }

    /// Places a root at the next free offsets and rebuilds its ranges
    /// with absolute indices.
    fn place_root(
        &self,
        mut layout: TypeLayout,
        next: &mut EnumMap<ResourceKind, u32>,
        reserve: bool,
    ) -> Arc<VarLayout> {
        let mut offsets: KindMap<VarOffset> = layout.consumed_kinds()
            .filter(|&kind| kind != ResourceKind::Bytes)
            .map(|kind| (kind, VarOffset::from(next[kind])))
            .collect();
        if layout.consumes(ResourceKind::Bytes) {
            offsets.insert(ResourceKind::Bytes, VarOffset::default());
        }
        if reserve {
            offsets.insert(ResourceKind::RegisterSpace,
                VarOffset::from(next[ResourceKind::RegisterSpace]));
        }
        for (kind, &size) in layout.sizes().iter() {
            if kind != ResourceKind::Bytes {
                next[kind] += size;
            }
        }

        let (ranges, field_offsets) =
            build_root_ranges(&layout, &offsets, self.desc.format);
        layout.ranges = ranges;
        if let TypeLayoutKind::Struct(st) = &mut layout.kind {
            st.binding_range_offsets = field_offsets;
        }
        Arc::new(VarLayout::new(None, None, Arc::new(layout), offsets))
    }

    fn entry_point_layout(
        &self,
        id: EntityId,
        uniforms: &[EntityId],
        var_layout: Arc<VarLayout>,
    ) -> Result<EntryPointLayout> {
        let session = &*self.session;
        let entry = session.entry_point(id)?;
        let func = session.func(entry.func)?;
        let chain = VarLayoutChain::new(self.desc.format, Arc::clone(&var_layout));

        let mut inputs = 0;
        let mut outputs = 0;
        let mut params = Vec::with_capacity(func.params.len());
        for &param in func.params.iter() {
            let var = session.var(param)?;
            let name = session.name(param).map(str::to_owned);
            if let Some(index) = uniforms.iter().position(|&u| u == param) {
                params.push(Arc::new(chain.field(index)?.absolute_var_layout()));
                continue;
            }

            let is_out = var.modifiers.contains(VarModifiers::OUT);
            let is_in = var.modifiers.contains(VarModifiers::IN);
            let rules = if is_in { LayoutRules::VaryingInput }
                else { LayoutRules::VaryingOutput };
            let layout = self.type_layout(var.ty, rules)?;
            let mut offsets = KindMap::new();
            if is_in {
                let size = layout.size(ResourceKind::VaryingInput);
                offsets.insert(ResourceKind::VaryingInput, VarOffset::from(inputs));
                inputs += size;
            }
            if is_out {
                // An `inout` parameter also claims as many output slots
                // as it has input slots.
                let size = layout.size(ResourceKind::VaryingOutput)
                    .max(layout.size(ResourceKind::VaryingInput));
                offsets.insert(ResourceKind::VaryingOutput, VarOffset::from(outputs));
                outputs += size;
            }
            let layout = VarLayout::new(Some(param), name, layout, offsets)
                .varying(entry.stage, var.semantic.as_ref());
            params.push(Arc::new(layout));
        }

        let result = match func.result {
            Some(ty) => {
                let layout = self.type_layout(ty, LayoutRules::VaryingOutput)?;
                let offsets = kind_map! { VaryingOutput => VarOffset::from(outputs) };
                let layout = VarLayout::new(None, None, layout, offsets)
                    .varying(entry.stage, func.result_semantic.as_ref());
                Some(Arc::new(layout))
            },
            None => None,
        };

        let name = session.entry_point_name(id)?.to_owned();
        debug!(
            "entry point `{}` ({}): {} params, {} inputs, {} outputs",
            name, entry.stage, params.len(), inputs, outputs,
        );
        Ok(EntryPointLayout {
            entry_point: id,
            name,
            stage: entry.stage,
            var_layout,
            params,
            result,
        })
    }
}
