//! Built-in callables: the `cx` module surface, dataframe methods, and the
//! visualization decorator. Native function bodies are one arm of the
//! closed [`Builtin`] set, dispatched here with full access to the arena.

use std::collections::BTreeMap;

use corsac_ast::Span;

use crate::compiler::Compiler;
use crate::error::{CompileError, Result};
use crate::ir::{
    AggregateAssignment, ColumnAssignment, ExpressionKind, IrGraph, JoinKind, Literal, NodeId,
};
use crate::modules::BUILTIN_MODULE_NAME;
use crate::objects::{BoundArgs, FuncBody, FuncObject, ObjectKind, QLObject, QLObjectPtr, VisSpec};

/// The closed set of native function behaviors.
#[derive(Debug, Clone)]
pub enum Builtin {
    /// `cx.DataFrame(table, select=[])` → memory-source operator.
    DataFrame,
    /// `cx.display(out, name='output')` → memory-sink operator.
    Display,
    /// `cx.vis.vega(vega_spec)` → a visualization decorator.
    VegaFactory,
    /// The decorator returned by `cx.vis.vega(...)`: marks a function as a
    /// visualization and attaches the spec without touching its body.
    VegaDecorator { spec: String },
    /// A scalar UDF registered in the compiler state; lowers to a
    /// function-call expression by name.
    ScalarUdf { name: String, arity: usize },
    /// A method bound to a dataframe's operator.
    DfMethod { method: DfMethod, op: NodeId },
    /// Subscript bound to a dataframe's operator: column reference, column
    /// keep-list, or row filter depending on the key.
    DfSubscript { op: NodeId },
}

/// Dataframe method surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DfMethod {
    Agg,
    Filter,
    Merge,
    Head,
    Drop,
    GroupBy,
    Append,
}

/// Assemble the built-in `cx` module object.
pub(crate) fn create_builtin_module(
    graph: &mut IrGraph,
    udfs: &BTreeMap<String, usize>,
) -> QLObjectPtr {
    let span = Span::synthesized();
    let mut attrs: BTreeMap<String, QLObjectPtr> = BTreeMap::new();

    let select_default = QLObject::list(Vec::new(), span);
    attrs.insert(
        "DataFrame".to_string(),
        QLObject::function(
            FuncObject::new("DataFrame", vec!["table", "select"], FuncBody::Native(Builtin::DataFrame))
                .with_default("select", select_default)
                .with_doc_string("Scan a table into a dataframe."),
            span,
        ),
    );

    let sink_name_default = graph.add_literal(span, Literal::String("output".to_string()));
    attrs.insert(
        "display".to_string(),
        QLObject::function(
            FuncObject::new("display", vec!["out", "name"], FuncBody::Native(Builtin::Display))
                .with_default("name", QLObject::expr(sink_name_default, span))
                .with_doc_string("Publish a dataframe under an output name."),
            span,
        ),
    );

    let mut vis_attrs: BTreeMap<String, QLObjectPtr> = BTreeMap::new();
    vis_attrs.insert(
        "vega".to_string(),
        QLObject::function(
            FuncObject::new("vega", vec!["vega_spec"], FuncBody::Native(Builtin::VegaFactory))
                .with_doc_string("Decorator attaching a vega visualization spec."),
            span,
        ),
    );
    attrs.insert(
        "vis".to_string(),
        QLObject::module(format!("{BUILTIN_MODULE_NAME}.vis"), vis_attrs, span),
    );

    for (name, arity) in udfs {
        let params: Vec<String> = (0..*arity).map(|i| format!("arg{i}")).collect();
        let param_refs: Vec<&str> = params.iter().map(String::as_str).collect();
        attrs.insert(
            name.clone(),
            QLObject::function(
                FuncObject::new(
                    name.clone(),
                    param_refs,
                    FuncBody::Native(Builtin::ScalarUdf {
                        name: name.clone(),
                        arity: *arity,
                    }),
                ),
                span,
            ),
        );
    }

    QLObject::module(BUILTIN_MODULE_NAME, attrs, span)
}

/// Synthesize a dataframe method attribute bound to `op`, or `None` when
/// the name is not a method.
pub(crate) fn dataframe_method(
    graph: &mut IrGraph,
    op: NodeId,
    name: &str,
    span: Span,
) -> Option<QLObjectPtr> {
    let func = match name {
        "agg" => FuncObject::new("agg", vec![], FuncBody::Native(Builtin::DfMethod {
            method: DfMethod::Agg,
            op,
        }))
        .with_variadic_keywords(),
        "filter" => FuncObject::new("filter", vec!["pred"], FuncBody::Native(Builtin::DfMethod {
            method: DfMethod::Filter,
            op,
        })),
        "merge" => FuncObject::new(
            "merge",
            vec!["right", "how", "left_on", "right_on"],
            FuncBody::Native(Builtin::DfMethod {
                method: DfMethod::Merge,
                op,
            }),
        )
        .with_default(
            "how",
            QLObject::expr(
                graph.add_literal(span, Literal::String("inner".to_string())),
                span,
            ),
        ),
        "head" => FuncObject::new("head", vec!["n"], FuncBody::Native(Builtin::DfMethod {
            method: DfMethod::Head,
            op,
        }))
        .with_default("n", QLObject::expr(graph.add_literal(span, Literal::Int(5)), span)),
        "drop" => FuncObject::new("drop", vec!["columns"], FuncBody::Native(Builtin::DfMethod {
            method: DfMethod::Drop,
            op,
        })),
        "groupby" => FuncObject::new("groupby", vec!["by"], FuncBody::Native(Builtin::DfMethod {
            method: DfMethod::GroupBy,
            op,
        })),
        "append" => FuncObject::new("append", vec!["objs"], FuncBody::Native(Builtin::DfMethod {
            method: DfMethod::Append,
            op,
        })),
        _ => return None,
    };
    Some(QLObject::function(func, span))
}

/// The subscript method of a dataframe.
pub(crate) fn dataframe_subscript(op: NodeId, span: Span) -> QLObjectPtr {
    QLObject::function(
        FuncObject::new("subscript", vec!["key"], FuncBody::Native(Builtin::DfSubscript { op })),
        span,
    )
}

impl Compiler {
    pub(crate) fn call_builtin(
        &mut self,
        builtin: &Builtin,
        bound: &BoundArgs,
        span: Span,
    ) -> Result<QLObjectPtr> {
        match builtin {
            Builtin::DataFrame => self.builtin_dataframe(bound, span),
            Builtin::Display => self.builtin_display(bound, span),
            Builtin::VegaFactory => {
                let spec =
                    self.string_literal_arg(bound.required("vega_spec", span)?, "vega_spec", span)?;
                Ok(QLObject::function(
                    FuncObject::new(
                        "vega_decorator",
                        vec!["fn"],
                        FuncBody::Native(Builtin::VegaDecorator { spec }),
                    ),
                    span,
                ))
            }
            Builtin::VegaDecorator { spec } => {
                let target = bound.required("fn", span)?;
                let Some(func) = target.as_function() else {
                    return Err(CompileError::type_mismatch(
                        "function",
                        &target.type_name(),
                        span,
                    ));
                };
                let decorated = func.clone().with_vis_spec(VisSpec {
                    vega_spec: spec.clone(),
                });
                Ok(QLObject::function(decorated, span))
            }
            Builtin::ScalarUdf { name, arity } => {
                let mut args = Vec::with_capacity(*arity);
                for i in 0..*arity {
                    let param = format!("arg{i}");
                    let value = bound.required(&param, span)?;
                    args.push(self.expr_arg(value, &param, span)?);
                }
                let node = self.graph.add_func(span, name.clone(), None, args)?;
                Ok(QLObject::expr(node, span))
            }
            Builtin::DfMethod { method, op } => self.call_dataframe_method(*method, *op, bound, span),
            Builtin::DfSubscript { op } => self.call_dataframe_subscript(*op, bound, span),
        }
    }

    fn builtin_dataframe(&mut self, bound: &BoundArgs, span: Span) -> Result<QLObjectPtr> {
        let table = self.string_literal_arg(bound.required("table", span)?, "table", span)?;
        let select = self.string_list_arg(bound.required("select", span)?, "select", span)?;
        if !self.state.has_table(&table) {
            return Err(CompileError::new(
                crate::error::ErrorKind::NameNotFound,
                span,
                format!("table '{table}' not found"),
            ));
        }
        let op = self.graph.add_memory_source(span, table, select);
        Ok(QLObject::dataframe(op, span))
    }

    fn builtin_display(&mut self, bound: &BoundArgs, span: Span) -> Result<QLObjectPtr> {
        // Under function-based execution sinks come from the exec-function
        // requests, not from display calls.
        if self.func_based_exec {
            return Ok(QLObject::none(span));
        }
        let df = self.dataframe_arg(bound.required("out", span)?, "out", span)?;
        let name = self.string_literal_arg(bound.required("name", span)?, "name", span)?;
        tracing::debug!(sink = %name, "display sink");
        self.graph.add_memory_sink(span, df, name, Vec::new())?;
        Ok(QLObject::none(span))
    }

    fn call_dataframe_method(
        &mut self,
        method: DfMethod,
        op: NodeId,
        bound: &BoundArgs,
        span: Span,
    ) -> Result<QLObjectPtr> {
        match method {
            DfMethod::Agg => {
                if bound.extra_keywords().is_empty() {
                    return Err(CompileError::argument(
                        span,
                        "agg requires at least one output column keyword",
                    ));
                }
                let mut aggregates = Vec::new();
                for (out_name, value) in bound.extra_keywords() {
                    let Some(items) = value.collection_items() else {
                        return Err(CompileError::type_mismatch(
                            "tuple of (column, function)",
                            &value.type_name(),
                            span,
                        ));
                    };
                    if value.kind() != ObjectKind::Tuple || items.len() != 2 {
                        return Err(CompileError::type_mismatch(
                            "tuple of (column, function)",
                            &value.type_name(),
                            span,
                        ));
                    }
                    let column = self.string_literal_arg(&items[0], "aggregate column", span)?;
                    let func = self.string_literal_arg(&items[1], "aggregate function", span)?;
                    let column = self.graph.add_column(span, column, Some(op))?;
                    aggregates.push(AggregateAssignment {
                        name: out_name.clone(),
                        func,
                        column,
                    });
                }
                let agg = self.graph.add_aggregate(span, op, aggregates)?;
                Ok(QLObject::dataframe(agg, span))
            }
            DfMethod::Filter => {
                let pred = self.expr_arg(bound.required("pred", span)?, "pred", span)?;
                let filter = self.graph.add_filter(span, op, pred)?;
                Ok(QLObject::dataframe(filter, span))
            }
            DfMethod::Merge => {
                let right = self.dataframe_arg(bound.required("right", span)?, "right", span)?;
                let how_text = self.string_literal_arg(bound.required("how", span)?, "how", span)?;
                let Some(how) = JoinKind::parse(&how_text) else {
                    return Err(CompileError::argument(
                        span,
                        format!("invalid join kind '{how_text}'"),
                    ));
                };
                let left_on =
                    self.string_list_arg(bound.required("left_on", span)?, "left_on", span)?;
                let right_on =
                    self.string_list_arg(bound.required("right_on", span)?, "right_on", span)?;
                let join = self.graph.add_join(span, op, right, how, left_on, right_on)?;
                Ok(QLObject::dataframe(join, span))
            }
            DfMethod::Head => {
                let n = self.int_literal_arg(bound.required("n", span)?, "n", span)?;
                let limit = self.graph.add_limit(span, op, n)?;
                Ok(QLObject::dataframe(limit, span))
            }
            DfMethod::Drop => {
                let columns =
                    self.string_list_arg(bound.required("columns", span)?, "columns", span)?;
                let drop = self.graph.add_drop(span, op, columns)?;
                Ok(QLObject::dataframe(drop, span))
            }
            DfMethod::GroupBy => {
                let names = self.string_list_arg(bound.required("by", span)?, "by", span)?;
                let mut keys = Vec::with_capacity(names.len());
                for name in names {
                    keys.push(self.graph.add_column(span, name, Some(op))?);
                }
                let group_by = self.graph.add_group_by(span, op, keys)?;
                Ok(QLObject::dataframe(group_by, span))
            }
            DfMethod::Append => {
                let objs = bound.required("objs", span)?;
                let Some(items) = objs.collection_items() else {
                    return Err(CompileError::type_mismatch("list", &objs.type_name(), span));
                };
                let mut parents = vec![op];
                for item in items {
                    parents.push(self.dataframe_arg(item, "objs", span)?);
                }
                let union = self.graph.add_union(span, parents)?;
                Ok(QLObject::dataframe(union, span))
            }
        }
    }

    fn call_dataframe_subscript(
        &mut self,
        op: NodeId,
        bound: &BoundArgs,
        span: Span,
    ) -> Result<QLObjectPtr> {
        let key = bound.required("key", span)?;
        match key.kind() {
            ObjectKind::Expr => {
                let node = self.expr_arg(key, "key", span)?;
                let is_string_literal = matches!(
                    self.graph.node(node).and_then(|n| n.as_expression()),
                    Some(ExpressionKind::Literal(Literal::String(_)))
                );
                if is_string_literal {
                    let name = self.string_literal_arg(key, "key", span)?;
                    let column = self.graph.add_column(span, name, Some(op))?;
                    return Ok(QLObject::expr(column, span));
                }
                let filter = self.graph.add_filter(span, op, node)?;
                Ok(QLObject::dataframe(filter, span))
            }
            ObjectKind::List => {
                let names = self.string_list_arg(key, "key", span)?;
                let mut assignments = Vec::with_capacity(names.len());
                for name in names {
                    let column = self.graph.add_column(span, name.clone(), Some(op))?;
                    assignments.push(ColumnAssignment { name, expr: column });
                }
                let map = self.graph.add_map(span, op, assignments, false)?;
                Ok(QLObject::dataframe(map, span))
            }
            _ => Err(CompileError::type_mismatch(
                "column name, column list, or predicate",
                &key.type_name(),
                span,
            )),
        }
    }

    /// The expression IR node an argument wraps.
    pub(crate) fn expr_arg(&self, obj: &QLObjectPtr, what: &str, span: Span) -> Result<NodeId> {
        let Some(node) = obj.node() else {
            return Err(CompileError::type_mismatch(
                &format!("expression for {what}"),
                &obj.type_name(),
                span,
            ));
        };
        match self.graph.node(node) {
            Some(ir) if ir.is_expression() => Ok(node),
            Some(ir) => Err(CompileError::type_mismatch(
                &format!("expression for {what}"),
                &ir.type_string(),
                span,
            )),
            None => Err(CompileError::internal(span, format!("unknown node {node}"))),
        }
    }

    /// The operator IR node a dataframe argument wraps.
    pub(crate) fn dataframe_arg(&self, obj: &QLObjectPtr, what: &str, span: Span) -> Result<NodeId> {
        if obj.kind() != ObjectKind::Dataframe {
            return Err(CompileError::type_mismatch(
                &format!("DataFrame for {what}"),
                &obj.type_name(),
                span,
            ));
        }
        obj.node()
            .ok_or_else(|| CompileError::internal(span, "dataframe without operator"))
    }

    pub(crate) fn string_literal_arg(
        &self,
        obj: &QLObjectPtr,
        what: &str,
        span: Span,
    ) -> Result<String> {
        let node = self.expr_arg(obj, what, span)?;
        match self.graph.node(node).and_then(|n| n.as_expression()) {
            Some(ExpressionKind::Literal(Literal::String(value))) => Ok(value.clone()),
            Some(other) => Err(CompileError::type_mismatch(
                &format!("string for {what}"),
                other.static_data_type().map_or("expression", |dt| dt.name()),
                span,
            )),
            None => Err(CompileError::internal(span, format!("unknown node {node}"))),
        }
    }

    pub(crate) fn int_literal_arg(&self, obj: &QLObjectPtr, what: &str, span: Span) -> Result<i64> {
        let node = self.expr_arg(obj, what, span)?;
        match self.graph.node(node).and_then(|n| n.as_expression()) {
            Some(ExpressionKind::Literal(Literal::Int(value))) => Ok(*value),
            Some(other) => Err(CompileError::type_mismatch(
                &format!("int for {what}"),
                other.static_data_type().map_or("expression", |dt| dt.name()),
                span,
            )),
            None => Err(CompileError::internal(span, format!("unknown node {node}"))),
        }
    }

    /// A list of column names: either a single string literal or a list of
    /// string literals.
    pub(crate) fn string_list_arg(
        &self,
        obj: &QLObjectPtr,
        what: &str,
        span: Span,
    ) -> Result<Vec<String>> {
        if obj.kind() == ObjectKind::Expr {
            return Ok(vec![self.string_literal_arg(obj, what, span)?]);
        }
        let Some(items) = obj.collection_items() else {
            return Err(CompileError::type_mismatch(
                &format!("string or list of strings for {what}"),
                &obj.type_name(),
                span,
            ));
        };
        items
            .iter()
            .map(|item| self.string_literal_arg(item, what, span))
            .collect()
    }
}
