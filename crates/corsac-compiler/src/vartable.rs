//! Lexically nested name→object environments.
//!
//! Scopes form a chain: lookup walks from the innermost scope outward,
//! while `add` only ever touches the current scope, so child bindings
//! shadow without mutating the parent. Tables are never snapshot-copied,
//! only extended.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::objects::QLObjectPtr;

#[derive(Debug, Default)]
pub struct VarTable {
    parent: Option<Rc<VarTable>>,
    scope: RefCell<BTreeMap<String, QLObjectPtr>>,
}

impl VarTable {
    /// A fresh root scope.
    pub fn new_root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// A new inner scope chained to `self`.
    pub fn create_child(self: &Rc<Self>) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(Rc::clone(self)),
            scope: RefCell::new(BTreeMap::new()),
        })
    }

    /// Upsert a binding in the current scope.
    pub fn add(&self, name: impl Into<String>, object: QLObjectPtr) {
        self.scope.borrow_mut().insert(name.into(), object);
    }

    /// Walk from this scope outward; `None` if the name is unbound.
    pub fn lookup(&self, name: &str) -> Option<QLObjectPtr> {
        if let Some(found) = self.scope.borrow().get(name) {
            return Some(Rc::clone(found));
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(name))
    }

    /// Bindings of the current scope only, in sorted order. Used to turn a
    /// compiled module's top-level scope into the module's attribute table.
    pub fn local_bindings(&self) -> BTreeMap<String, QLObjectPtr> {
        self.scope.borrow().clone()
    }

    /// Functions in the current scope whose visualization spec is set.
    pub fn vis_funcs(&self) -> Vec<(String, QLObjectPtr)> {
        self.scope
            .borrow()
            .iter()
            .filter(|(_, obj)| obj.as_function().is_some_and(|f| f.has_visualization()))
            .map(|(name, obj)| (name.clone(), Rc::clone(obj)))
            .collect()
    }
}
