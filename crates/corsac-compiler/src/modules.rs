//! Registry of importable modules.
//!
//! The built-in module is registered ready-made at compiler setup. User
//! modules are registered as pending ASTs and compiled once, on first
//! import or during setup; a tombstone entry replaces the pending AST
//! while its body compiles so that import cycles are detected on
//! re-entry.

use std::collections::BTreeMap;

use corsac_ast::{Module, Span};

use crate::error::{CompileError, Result};
use crate::objects::QLObjectPtr;

/// Canonical name of the built-in module.
pub const BUILTIN_MODULE_NAME: &str = "cx";

#[derive(Debug)]
pub enum ModuleEntry {
    /// Compiled and importable.
    Ready(QLObjectPtr),
    /// Registered but not yet compiled.
    Pending(Module),
    /// Currently compiling; importing it again is a cycle.
    InProgress,
}

#[derive(Debug, Default)]
pub struct ModuleHandler {
    modules: BTreeMap<String, ModuleEntry>,
}

impl ModuleHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn register_ready(&mut self, name: impl Into<String>, module: QLObjectPtr) {
        let name = name.into();
        tracing::debug!(module = %name, "registered module");
        self.modules.insert(name, ModuleEntry::Ready(module));
    }

    pub fn register_pending(&mut self, name: impl Into<String>, ast: Module) {
        let name = name.into();
        tracing::debug!(module = %name, "registered pending module");
        self.modules.insert(name, ModuleEntry::Pending(ast));
    }

    /// Names of modules still awaiting compilation.
    pub fn pending_names(&self) -> Vec<String> {
        self.modules
            .iter()
            .filter(|(_, entry)| matches!(entry, ModuleEntry::Pending(_)))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// The compiled module object, if `name` is registered and ready.
    pub fn ready(&self, name: &str) -> Option<QLObjectPtr> {
        match self.modules.get(name) {
            Some(ModuleEntry::Ready(module)) => Some(module.clone()),
            _ => None,
        }
    }

    /// Take a pending module's AST and leave a tombstone in its place.
    /// Returns an `Unsupported` cycle diagnostic if the module is already
    /// compiling.
    pub fn begin_compile(&mut self, name: &str, span: Span) -> Result<Option<Module>> {
        match self.modules.get(name) {
            Some(ModuleEntry::Pending(_)) => {
                let Some(ModuleEntry::Pending(ast)) =
                    self.modules.insert(name.to_string(), ModuleEntry::InProgress)
                else {
                    unreachable!("entry checked above");
                };
                Ok(Some(ast))
            }
            Some(ModuleEntry::InProgress) => Err(CompileError::unsupported(
                span,
                format!("import cycle detected while compiling module '{name}'"),
            )),
            Some(ModuleEntry::Ready(_)) => Ok(None),
            None => Err(CompileError::module_not_found(name, span)),
        }
    }

    /// Replace a tombstone with the compiled module object.
    pub fn finish_compile(&mut self, name: &str, module: QLObjectPtr) {
        tracing::debug!(module = %name, "compiled module");
        self.modules.insert(name.to_string(), ModuleEntry::Ready(module));
    }
}
