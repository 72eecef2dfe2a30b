use log::debug;

use crate::*;

/// A linked set of modules and explicitly chosen entry points.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Program {
    modules: Vec<EntityId>,
    globals: Vec<EntityId>,
    entry_points: Vec<EntityId>,
}

impl Session {
    /// Links modules and entry points into a program. Only entry points
    /// listed in `components` are part of the program, even if a linked
    /// module declares others.
    pub fn link(&self, components: &[EntityId]) -> Result<Program> {
        let mut program = Program::default();
        for &id in components {
            match self.entity(id)?.kind() {
                EntityKind::Module => program.add_module(self, id),
                EntityKind::EntryPoint(_) => {
                    if let Some(module) = self.entities()[id].parent() {
                        program.add_module(self, module);
                    }
                    if !program.entry_points.contains(&id) {
                        program.entry_points.push(id);
                    }
                },
                _ => return Err(Error::UnknownEntity(id)),
            }
        }
        debug!(
            "linked {} modules: {} globals, {} entry points",
            program.modules.len(), program.globals.len(),
            program.entry_points.len(),
        );
        Ok(program)
    }
}

impl Program {
    fn add_module(&mut self, session: &Session, module: EntityId) {
        if self.modules.contains(&module) {
            return;
        }
        self.modules.push(module);
        self.globals.extend(session.children(module).iter().copied()
            .filter(|&child| session.var(child).is_ok()));
    }

    #[inline]
    pub fn modules(&self) -> &[EntityId] {
        &self.modules
    }

    /// Global shader parameters in link order.
    #[inline]
    pub fn globals(&self) -> &[EntityId] {
        &self.globals
    }

    #[inline]
    pub fn entry_points(&self) -> &[EntityId] {
        &self.entry_points
    }

    pub fn find_entry_point(&self, session: &Session, name: &str) ->
        Option<EntityId>
    {
        self.entry_points.iter().copied().find(|&id| {
            session.entry_point_name(id).map_or(false, |n| n == name)
        })
    }

    /// Looks up a top-level declaration of any linked module by name.
    pub fn find_entity(&self, session: &Session, name: &str) ->
        Result<EntityId>
    {
        self.modules.iter()
            .find_map(|&module| session.find_child(module, name))
            .ok_or_else(|| Error::UnknownName(name.to_owned()))
    }
}
