//! Arena-backed IR graph of dataframe operators and scalar expressions.
//!
//! Nodes are created only through the typed `add_*` constructors and
//! removed only through [`IrGraph::delete_node`]. Ids increase
//! monotonically and are never reused within a translation.

mod node;
pub mod opcode;

pub use node::{
    AggregateAssignment, ColumnAssignment, DataType, ExpressionKind, IrNode, IrNodeKind, JoinKind,
    Literal, NodeId, OperatorKind,
};
pub use opcode::{Opcode, binary_opcode, unary_opcode};

use std::collections::BTreeMap;

use corsac_ast::Span;

use crate::error::{CompileError, Result};

/// The IR arena for one translation.
#[derive(Debug, Default)]
pub struct IrGraph {
    nodes: BTreeMap<NodeId, IrNode>,
    next_id: u32,
}

impl IrGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, span: Span, kind: IrNodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, IrNode { id, span, kind });
        id
    }

    fn insert_operator(&mut self, span: Span, op: OperatorKind) -> Result<NodeId> {
        for parent in op.parents() {
            self.expect_operator(parent, span)?;
        }
        Ok(self.insert(span, IrNodeKind::Operator(op)))
    }

    fn expect_operator(&self, id: NodeId, span: Span) -> Result<()> {
        match self.nodes.get(&id) {
            Some(node) if node.is_operator() => Ok(()),
            Some(node) => Err(CompileError::internal(
                span,
                format!("node {id} is a {}, not an operator", node.type_string()),
            )),
            None => Err(CompileError::internal(span, format!("unknown node {id}"))),
        }
    }

    fn expect_expression(&self, id: NodeId, span: Span) -> Result<()> {
        match self.nodes.get(&id) {
            Some(node) if node.is_expression() => Ok(()),
            Some(node) => Err(CompileError::internal(
                span,
                format!("node {id} is a {}, not an expression", node.type_string()),
            )),
            None => Err(CompileError::internal(span, format!("unknown node {id}"))),
        }
    }

    pub fn add_memory_source(
        &mut self,
        span: Span,
        table: impl Into<String>,
        columns: Vec<String>,
    ) -> NodeId {
        self.insert(
            span,
            IrNodeKind::Operator(OperatorKind::MemorySource {
                table: table.into(),
                columns,
            }),
        )
    }

    pub fn add_memory_sink(
        &mut self,
        span: Span,
        parent: NodeId,
        name: impl Into<String>,
        columns: Vec<String>,
    ) -> Result<NodeId> {
        self.insert_operator(
            span,
            OperatorKind::MemorySink {
                parent,
                name: name.into(),
                columns,
            },
        )
    }

    pub fn add_map(
        &mut self,
        span: Span,
        parent: NodeId,
        assignments: Vec<ColumnAssignment>,
        keep_input_columns: bool,
    ) -> Result<NodeId> {
        if assignments.is_empty() {
            return Err(CompileError::internal(span, "map requires at least one column"));
        }
        for assignment in &assignments {
            self.expect_expression(assignment.expr, span)?;
        }
        self.insert_operator(
            span,
            OperatorKind::Map {
                parent,
                assignments,
                keep_input_columns,
            },
        )
    }

    pub fn add_filter(&mut self, span: Span, parent: NodeId, predicate: NodeId) -> Result<NodeId> {
        self.expect_expression(predicate, span)?;
        self.insert_operator(span, OperatorKind::Filter { parent, predicate })
    }

    pub fn add_join(
        &mut self,
        span: Span,
        left: NodeId,
        right: NodeId,
        how: JoinKind,
        left_on: Vec<String>,
        right_on: Vec<String>,
    ) -> Result<NodeId> {
        if left_on.is_empty() || left_on.len() != right_on.len() {
            return Err(CompileError::internal(
                span,
                format!(
                    "join key lists must be non-empty and equal length, got {} and {}",
                    left_on.len(),
                    right_on.len()
                ),
            ));
        }
        self.insert_operator(
            span,
            OperatorKind::Join {
                left,
                right,
                how,
                left_on,
                right_on,
            },
        )
    }

    pub fn add_group_by(&mut self, span: Span, parent: NodeId, keys: Vec<NodeId>) -> Result<NodeId> {
        if keys.is_empty() {
            return Err(CompileError::internal(span, "group-by requires at least one key"));
        }
        for key in &keys {
            self.expect_expression(*key, span)?;
        }
        self.insert_operator(span, OperatorKind::GroupBy { parent, keys })
    }

    pub fn add_aggregate(
        &mut self,
        span: Span,
        parent: NodeId,
        aggregates: Vec<AggregateAssignment>,
    ) -> Result<NodeId> {
        if aggregates.is_empty() {
            return Err(CompileError::internal(span, "aggregate requires at least one output"));
        }
        for aggregate in &aggregates {
            self.expect_expression(aggregate.column, span)?;
        }
        self.insert_operator(span, OperatorKind::Aggregate { parent, aggregates })
    }

    pub fn add_limit(&mut self, span: Span, parent: NodeId, n: i64) -> Result<NodeId> {
        if n < 0 {
            return Err(CompileError::internal(span, format!("negative limit {n}")));
        }
        self.insert_operator(span, OperatorKind::Limit { parent, n })
    }

    pub fn add_union(&mut self, span: Span, parents: Vec<NodeId>) -> Result<NodeId> {
        if parents.len() < 2 {
            return Err(CompileError::internal(span, "union requires at least two inputs"));
        }
        self.insert_operator(span, OperatorKind::Union { parents })
    }

    pub fn add_drop(
        &mut self,
        span: Span,
        parent: NodeId,
        columns: Vec<String>,
    ) -> Result<NodeId> {
        if columns.is_empty() {
            return Err(CompileError::internal(span, "drop requires at least one column"));
        }
        self.insert_operator(span, OperatorKind::Drop { parent, columns })
    }

    pub fn add_column(
        &mut self,
        span: Span,
        name: impl Into<String>,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        if let Some(parent) = parent {
            self.expect_operator(parent, span)?;
        }
        Ok(self.insert(
            span,
            IrNodeKind::Expression(ExpressionKind::Column {
                name: name.into(),
                parent,
            }),
        ))
    }

    pub fn add_func(
        &mut self,
        span: Span,
        name: impl Into<String>,
        opcode: Option<Opcode>,
        args: Vec<NodeId>,
    ) -> Result<NodeId> {
        if let Some(opcode) = opcode
            && args.len() != opcode.arity()
        {
            return Err(CompileError::internal(
                span,
                format!(
                    "opcode '{}' takes {} argument(s), got {}",
                    opcode.name(),
                    opcode.arity(),
                    args.len()
                ),
            ));
        }
        for arg in &args {
            self.expect_expression(*arg, span)?;
        }
        Ok(self.insert(
            span,
            IrNodeKind::Expression(ExpressionKind::Func {
                name: name.into(),
                opcode,
                args,
            }),
        ))
    }

    pub fn add_literal(&mut self, span: Span, literal: Literal) -> NodeId {
        self.insert(span, IrNodeKind::Expression(ExpressionKind::Literal(literal)))
    }

    /// Delete a node that nothing else references. Used for the
    /// column-reference placeholder consumed by map assignment.
    pub fn delete_node(&mut self, id: NodeId) -> Result<()> {
        let Some(node) = self.nodes.get(&id) else {
            return Err(CompileError::internal(
                Span::synthesized(),
                format!("cannot delete unknown node {id}"),
            ));
        };
        let span = node.span;
        let dependents: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|other| other.references().contains(&id))
            .map(|other| other.id)
            .collect();
        if !dependents.is_empty() {
            return Err(CompileError::internal(
                span,
                format!("cannot delete node {id}: {} dependent(s) remain", dependents.len()),
            ));
        }
        self.nodes.remove(&id);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&IrNode> {
        self.nodes.get(&id)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &IrNode> {
        self.nodes.values()
    }

    pub fn operators(&self) -> impl Iterator<Item = &IrNode> {
        self.nodes().filter(|n| n.is_operator())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Render the operator DAG as a readable string, one operator per line
    /// in id order.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for node in self.operators() {
            let IrNodeKind::Operator(op) = &node.kind else {
                continue;
            };
            out.push_str(&format!("{}: {}", node.id, op.name()));
            match op {
                OperatorKind::MemorySource { table, columns } => {
                    out.push_str(&format!(" table='{table}'"));
                    if !columns.is_empty() {
                        out.push_str(&format!(" select={columns:?}"));
                    }
                }
                OperatorKind::MemorySink { parent, name, .. } => {
                    out.push_str(&format!(" name='{name}' parent={parent}"));
                }
                OperatorKind::Map {
                    parent,
                    assignments,
                    keep_input_columns,
                } => {
                    let cols: Vec<&str> = assignments.iter().map(|a| a.name.as_str()).collect();
                    out.push_str(&format!(
                        " cols={cols:?} keep_input={keep_input_columns} parent={parent}"
                    ));
                }
                OperatorKind::Filter { parent, predicate } => {
                    out.push_str(&format!(" predicate={predicate} parent={parent}"));
                }
                OperatorKind::Join {
                    left,
                    right,
                    how,
                    left_on,
                    right_on,
                } => {
                    out.push_str(&format!(
                        " how={} left={left} right={right} on={left_on:?}={right_on:?}",
                        how.name()
                    ));
                }
                OperatorKind::GroupBy { parent, keys } => {
                    out.push_str(&format!(" keys={keys:?} parent={parent}"));
                }
                OperatorKind::Aggregate { parent, aggregates } => {
                    let outs: Vec<String> = aggregates
                        .iter()
                        .map(|a| format!("{}={}({})", a.name, a.func, a.column))
                        .collect();
                    out.push_str(&format!(" aggs=[{}] parent={parent}", outs.join(", ")));
                }
                OperatorKind::Limit { parent, n } => {
                    out.push_str(&format!(" n={n} parent={parent}"));
                }
                OperatorKind::Union { parents } => {
                    out.push_str(&format!(" parents={parents:?}"));
                }
                OperatorKind::Drop { parent, columns } => {
                    out.push_str(&format!(" cols={columns:?} parent={parent}"));
                }
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp() -> Span {
        Span::point(1, 0)
    }

    #[test]
    fn ids_increase_monotonically_and_are_not_reused() {
        let mut graph = IrGraph::new();
        let a = graph.add_literal(sp(), Literal::Int(1));
        let b = graph.add_literal(sp(), Literal::Int(2));
        assert!(b > a);
        graph.delete_node(b).unwrap();
        let c = graph.add_literal(sp(), Literal::Int(3));
        assert!(c > b);
    }

    #[test]
    fn typed_constructors_validate_children() {
        let mut graph = IrGraph::new();
        let source = graph.add_memory_source(sp(), "t", vec![]);
        let lit = graph.add_literal(sp(), Literal::Int(1));

        // A sink's parent must be an operator.
        let err = graph.add_memory_sink(sp(), lit, "out", vec![]).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Internal);

        // A filter predicate must be an expression.
        let err = graph.add_filter(sp(), source, source).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Internal);

        assert!(graph.add_filter(sp(), source, lit).is_ok());
    }

    #[test]
    fn lowered_ops_enforce_arity() {
        let mut graph = IrGraph::new();
        let one = graph.add_literal(sp(), Literal::Int(1));
        let err = graph
            .add_func(sp(), Opcode::Add.name(), Some(Opcode::Add), vec![one])
            .unwrap_err();
        assert!(err.message.contains("takes 2"));
    }

    #[test]
    fn delete_refuses_nodes_with_dependents() {
        let mut graph = IrGraph::new();
        let one = graph.add_literal(sp(), Literal::Int(1));
        let two = graph.add_literal(sp(), Literal::Int(2));
        let sum = graph
            .add_func(sp(), Opcode::Add.name(), Some(Opcode::Add), vec![one, two])
            .unwrap();

        let err = graph.delete_node(one).unwrap_err();
        assert!(err.message.contains("dependent"));

        graph.delete_node(sum).unwrap();
        graph.delete_node(one).unwrap();
        assert!(graph.node(one).is_none());
        assert!(graph.node(two).is_some());
    }

    #[test]
    fn union_requires_two_parents() {
        let mut graph = IrGraph::new();
        let source = graph.add_memory_source(sp(), "t", vec![]);
        assert!(graph.add_union(sp(), vec![source]).is_err());
    }

    #[test]
    fn dump_renders_operators_in_id_order() {
        let mut graph = IrGraph::new();
        let source = graph.add_memory_source(sp(), "t", vec![]);
        graph.add_memory_sink(sp(), source, "out", vec![]).unwrap();

        let dump = graph.dump();
        let source_at = dump.find("memory_source table='t'").unwrap();
        let sink_at = dump.find("memory_sink name='out'").unwrap();
        assert!(source_at < sink_at);
    }
}
