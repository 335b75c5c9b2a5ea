//! Runtime values exposed to the query language at compile time.
//!
//! Every value the visitor produces is a [`QLObject`] behind an
//! [`QLObjectPtr`] handle: a tagged payload plus a small capability
//! surface (kind, printable name, attribute table, owned IR node). Calls
//! and subscripts need the arena, so they dispatch through the compiler
//! rather than through methods here.

mod func;

pub use func::{ArgMap, BoundArgs, FuncBody, FuncObject};

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use corsac_ast::Span;
use serde::Serialize;

use crate::ir::{DataType, NodeId};

/// Shared handle to a QL object. Translation is single-threaded, so plain
/// reference counting suffices.
pub type QLObjectPtr = Rc<QLObject>;

/// Visualization spec attached by a visualization decorator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisSpec {
    pub vega_spec: String,
}

/// Kind tag of a QL object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Expr,
    Dataframe,
    Function,
    Module,
    Type,
    List,
    Tuple,
    None,
}

/// Kind-specific payload of a QL object.
#[derive(Debug)]
pub enum Payload {
    /// Thin wrapper over an expression IR node.
    Expr { node: NodeId },
    /// Wrapper over exactly one operator IR node.
    Dataframe { op: NodeId },
    Function(FuncObject),
    Module { name: String },
    Type { data_type: DataType },
    List { items: Vec<QLObjectPtr> },
    Tuple { items: Vec<QLObjectPtr> },
    None,
}

/// A compile-time value of the query language.
#[derive(Debug)]
pub struct QLObject {
    payload: Payload,
    attributes: RefCell<BTreeMap<String, QLObjectPtr>>,
    span: Span,
}

impl QLObject {
    fn create(payload: Payload, span: Span) -> QLObjectPtr {
        Rc::new(Self {
            payload,
            attributes: RefCell::new(BTreeMap::new()),
            span,
        })
    }

    pub fn expr(node: NodeId, span: Span) -> QLObjectPtr {
        Self::create(Payload::Expr { node }, span)
    }

    pub fn dataframe(op: NodeId, span: Span) -> QLObjectPtr {
        Self::create(Payload::Dataframe { op }, span)
    }

    pub fn function(func: FuncObject, span: Span) -> QLObjectPtr {
        Self::create(Payload::Function(func), span)
    }

    pub fn module(
        name: impl Into<String>,
        attributes: BTreeMap<String, QLObjectPtr>,
        span: Span,
    ) -> QLObjectPtr {
        let obj = Self::create(
            Payload::Module { name: name.into() },
            span,
        );
        *obj.attributes.borrow_mut() = attributes;
        obj
    }

    pub fn type_object(data_type: DataType, span: Span) -> QLObjectPtr {
        Self::create(Payload::Type { data_type }, span)
    }

    pub fn list(items: Vec<QLObjectPtr>, span: Span) -> QLObjectPtr {
        Self::create(Payload::List { items }, span)
    }

    pub fn tuple(items: Vec<QLObjectPtr>, span: Span) -> QLObjectPtr {
        Self::create(Payload::Tuple { items }, span)
    }

    pub fn none(span: Span) -> QLObjectPtr {
        Self::create(Payload::None, span)
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn kind(&self) -> ObjectKind {
        match &self.payload {
            Payload::Expr { .. } => ObjectKind::Expr,
            Payload::Dataframe { .. } => ObjectKind::Dataframe,
            Payload::Function(_) => ObjectKind::Function,
            Payload::Module { .. } => ObjectKind::Module,
            Payload::Type { .. } => ObjectKind::Type,
            Payload::List { .. } => ObjectKind::List,
            Payload::Tuple { .. } => ObjectKind::Tuple,
            Payload::None => ObjectKind::None,
        }
    }

    /// Printable name used in diagnostics.
    pub fn type_name(&self) -> String {
        match &self.payload {
            Payload::Expr { .. } => "expression".to_string(),
            Payload::Dataframe { .. } => "DataFrame".to_string(),
            Payload::Function(func) => format!("function '{}'", func.name()),
            Payload::Module { name } => format!("module '{name}'"),
            Payload::Type { data_type } => format!("type '{}'", data_type.name()),
            Payload::List { .. } => "list".to_string(),
            Payload::Tuple { .. } => "tuple".to_string(),
            Payload::None => "None".to_string(),
        }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn has_node(&self) -> bool {
        self.node().is_some()
    }

    /// The IR node this object owns, for `Expr` and `Dataframe` kinds.
    pub fn node(&self) -> Option<NodeId> {
        match &self.payload {
            Payload::Expr { node } => Some(*node),
            Payload::Dataframe { op } => Some(*op),
            _ => None,
        }
    }

    /// Attribute-table lookup. Dataframe method attributes are synthesized
    /// by the compiler, not stored here.
    pub fn attribute(&self, name: &str) -> Option<QLObjectPtr> {
        self.attributes.borrow().get(name).cloned()
    }

    /// Whether `set_attribute` is allowed on this kind.
    pub fn supports_attribute_assignment(&self) -> bool {
        matches!(self.payload, Payload::Module { .. } | Payload::Function(_))
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: QLObjectPtr) {
        self.attributes.borrow_mut().insert(name.into(), value);
    }

    /// Attribute names in sorted order.
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.borrow().keys().cloned().collect()
    }

    pub fn as_function(&self) -> Option<&FuncObject> {
        match &self.payload {
            Payload::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_data_type(&self) -> Option<DataType> {
        match &self.payload {
            Payload::Type { data_type } => Some(*data_type),
            _ => None,
        }
    }

    /// Items of a list or tuple.
    pub fn collection_items(&self) -> Option<&[QLObjectPtr]> {
        match &self.payload {
            Payload::List { items } | Payload::Tuple { items } => Some(items),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_printable_names() {
        let span = Span::point(1, 0);
        let df = QLObject::dataframe(NodeId(0), span);
        assert_eq!(df.kind(), ObjectKind::Dataframe);
        assert_eq!(df.type_name(), "DataFrame");
        assert!(df.has_node());

        let none = QLObject::none(span);
        assert_eq!(none.kind(), ObjectKind::None);
        assert!(!none.has_node());

        let ty = QLObject::type_object(DataType::Int64, span);
        assert_eq!(ty.type_name(), "type 'int64'");
    }

    #[test]
    fn module_attributes_are_sorted_and_lookupable() {
        let span = Span::point(1, 0);
        let mut attrs = BTreeMap::new();
        attrs.insert("b".to_string(), QLObject::none(span));
        attrs.insert("a".to_string(), QLObject::none(span));
        let module = QLObject::module("m", attrs, span);

        assert_eq!(module.attribute_names(), vec!["a", "b"]);
        assert!(module.attribute("a").is_some());
        assert!(module.attribute("c").is_none());
    }

    #[test]
    fn attribute_assignment_capability_is_kind_gated() {
        let span = Span::point(1, 0);
        assert!(!QLObject::dataframe(NodeId(0), span).supports_attribute_assignment());
        assert!(QLObject::module("m", BTreeMap::new(), span).supports_attribute_assignment());
    }
}
