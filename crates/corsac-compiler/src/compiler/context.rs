//! Per-evaluation operator context.
//!
//! The context travels down expression evaluation by value; child contexts
//! are built by copy-with-change, never mutated in place. It tells column
//! references which parent operator they bind to and restricts which names
//! may appear as subscript bases while a map expression is being built.

use crate::ir::NodeId;

/// Operator name recorded while evaluating the right-hand side of a map
/// assignment.
pub const MAP_OPERATOR_NAME: &str = "map";

#[derive(Debug, Clone, Default)]
pub struct OperatorContext {
    /// Parent operators the evaluated expression will attach to.
    pub parent_ops: Vec<NodeId>,
    /// Name of the operator being built, or empty outside operator
    /// construction.
    pub operator_name: String,
    /// Names that may legally appear as the base of a subscript in this
    /// context.
    pub referenceable_names: Vec<String>,
}

impl OperatorContext {
    /// The context used for plain statement-level evaluation.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Context for the right-hand side of `df[col] = expr`.
    pub fn map_assignment(parent: NodeId, referenceable_names: Vec<String>) -> Self {
        Self {
            parent_ops: vec![parent],
            operator_name: MAP_OPERATOR_NAME.to_string(),
            referenceable_names,
        }
    }

    pub fn is_map(&self) -> bool {
        self.operator_name == MAP_OPERATOR_NAME
    }

    /// A copy of this context with one more referenceable name.
    pub fn with_referenceable(&self, name: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.referenceable_names.push(name.into());
        next
    }
}
