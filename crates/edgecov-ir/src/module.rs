//! Module IR: one translation unit.

use serde::{Deserialize, Serialize};

use crate::function::Function;
use crate::global::Global;
use crate::operand::GlobalId;

/// A translation unit: globals plus functions, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_filename: Option<String>,
    #[serde(default)]
    pub globals: Vec<Global>,
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl Module {
    /// Create an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Get a global by id.
    #[must_use]
    pub fn global(&self, id: GlobalId) -> Option<&Global> {
        self.globals.get(id.index())
    }

    /// Look up a global by name.
    #[must_use]
    pub fn global_by_name(&self, name: &str) -> Option<GlobalId> {
        self.globals
            .iter()
            .position(|g| g.name == name)
            .and_then(|idx| u32::try_from(idx).ok())
            .map(GlobalId)
    }

    /// Append a global and return its id.
    pub fn add_global(&mut self, global: Global) -> GlobalId {
        let id = GlobalId(u32::try_from(self.globals.len()).unwrap_or(u32::MAX));
        self.globals.push(global);
        id
    }

    /// Append a function.
    pub fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    /// Look up a function by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Look up a function by name, mutably.
    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name == name)
    }

    /// Functions that have a body.
    pub fn definitions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| !f.is_declaration())
    }

    /// Total number of basic blocks across all function bodies.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.functions.iter().map(|f| f.blocks.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    #[test]
    fn test_global_lookup() {
        let mut m = Module::new("m");
        let a = m.add_global(Global::external("a", Type::I16));
        let b = m.add_global(Global::internal("b", Type::I8, 0x1ff));
        assert_eq!(m.global_by_name("a"), Some(a));
        assert_eq!(m.global_by_name("b"), Some(b));
        assert_eq!(m.global(b).and_then(|g| g.initializer), Some(0xff));
        assert_eq!(m.global_by_name("c"), None);
    }

    #[test]
    fn test_definitions_skip_declarations() {
        let mut m = Module::new("m");
        m.add_function(crate::Function::new("ext", vec![], None));
        let mut f = crate::Function::new("def", vec![], None);
        f.add_block("entry");
        m.add_function(f);
        assert_eq!(m.definitions().count(), 1);
        assert_eq!(m.block_count(), 1);
    }
}
