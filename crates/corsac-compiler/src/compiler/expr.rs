//! Expression evaluation: dispatch over AST expression kinds, producing QL
//! objects and allocating IR into the arena.

use corsac_ast::{Expr, ExprKind, Keyword, Span};

use crate::builtins::{dataframe_method, dataframe_subscript};
use crate::compiler::{Compiler, OperatorContext};
use crate::error::{CompileError, Result};
use crate::ir::{ExpressionKind, Literal, NodeId, Opcode, binary_opcode, unary_opcode};
use crate::objects::{ArgMap, ObjectKind, QLObject, QLObjectPtr};

impl Compiler {
    /// Evaluate one expression under the given operator context.
    pub(crate) fn process(&mut self, expr: &Expr, ctx: &OperatorContext) -> Result<QLObjectPtr> {
        match &expr.kind {
            ExprKind::Name(name) => self.lookup_variable(name, expr.span),
            ExprKind::Str(value) => {
                let node = self.graph.add_literal(expr.span, Literal::String(value.clone()));
                Ok(QLObject::expr(node, expr.span))
            }
            ExprKind::Int(value) => {
                let node = self.graph.add_literal(expr.span, Literal::Int(*value));
                Ok(QLObject::expr(node, expr.span))
            }
            ExprKind::Float(value) => {
                let node = self.graph.add_literal(expr.span, Literal::Float(*value));
                Ok(QLObject::expr(node, expr.span))
            }
            ExprKind::Attribute { value, attr } => {
                let value_obj = self.process(value, ctx)?;
                self.get_attribute(&value_obj, attr, expr.span)
            }
            ExprKind::Subscript { value, index } => {
                self.process_subscript(value, index, ctx, expr.span)
            }
            ExprKind::Call {
                func,
                args,
                keywords,
            } => self.process_call(func, args, keywords, ctx, expr.span),
            ExprKind::List(items) => {
                let children = self.process_collection_children(items, ctx)?;
                Ok(QLObject::list(children, expr.span))
            }
            ExprKind::Tuple(items) => {
                let children = self.process_collection_children(items, ctx)?;
                Ok(QLObject::tuple(children, expr.span))
            }
            ExprKind::BinaryOp { op, left, right } => {
                self.process_binary(op, left, right, ctx, expr.span)
            }
            ExprKind::BoolOp { op, values } => {
                if values.len() != 2 {
                    return Err(CompileError::syntax(
                        expr.span,
                        format!("expected two operands to '{op}'"),
                    ));
                }
                self.process_binary(op, &values[0], &values[1], ctx, expr.span)
            }
            ExprKind::Compare {
                op,
                left,
                comparators,
            } => {
                if comparators.len() != 1 {
                    return Err(CompileError::syntax(
                        expr.span,
                        format!("only expected one argument to the right of '{op}'"),
                    ));
                }
                self.process_binary(op, left, &comparators[0], ctx, expr.span)
            }
            ExprKind::UnaryOp { op, operand } => self.process_unary(op, operand, ctx, expr.span),
        }
    }

    pub(crate) fn lookup_variable(&self, name: &str, span: Span) -> Result<QLObjectPtr> {
        self.var_table
            .lookup(name)
            .ok_or_else(|| CompileError::name_not_found(name, span))
    }

    /// Attribute dispatch: module/function attribute tables, dataframe
    /// methods, and dataframe column references for any other name.
    pub(crate) fn get_attribute(
        &mut self,
        obj: &QLObjectPtr,
        attr: &str,
        span: Span,
    ) -> Result<QLObjectPtr> {
        match obj.kind() {
            ObjectKind::Dataframe => {
                let op = self.dataframe_arg(obj, "attribute base", span)?;
                if let Some(method) = dataframe_method(&mut self.graph, op, attr, span) {
                    return Ok(method);
                }
                // Any other attribute reads as a column of the dataframe.
                let column = self.graph.add_column(span, attr, Some(op))?;
                Ok(QLObject::expr(column, span))
            }
            ObjectKind::Module | ObjectKind::Function => obj
                .attribute(attr)
                .ok_or_else(|| CompileError::no_attribute(&obj.type_name(), attr, span)),
            _ => Err(CompileError::no_attribute(&obj.type_name(), attr, span)),
        }
    }

    /// While a map expression is being built, the base of a subscript must
    /// be one of the context's referenceable names. Nested attribute
    /// access drills down to the innermost name.
    fn validate_subscript_value(&self, value: &Expr, ctx: &OperatorContext) -> Result<()> {
        if !ctx.is_map() {
            return Ok(());
        }
        match &value.kind {
            ExprKind::Attribute { value: inner, .. } => self.validate_subscript_value(inner, ctx),
            ExprKind::Name(name) => {
                if !ctx.referenceable_names.iter().any(|n| n == name) {
                    return Err(CompileError::name_not_in_context(name, value.span));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn process_subscript(
        &mut self,
        value: &Expr,
        index: &Expr,
        ctx: &OperatorContext,
        span: Span,
    ) -> Result<QLObjectPtr> {
        self.validate_subscript_value(value, ctx)?;
        let value_obj = self.process(value, ctx)?;
        if value_obj.kind() != ObjectKind::Dataframe {
            return Err(CompileError::not_subscriptable(&value_obj.type_name(), span));
        }
        let op = self.dataframe_arg(&value_obj, "subscript base", span)?;
        let subscript = dataframe_subscript(op, span);

        // A dataframe held in a name may be referenced again inside its own
        // subscript expression.
        let index_ctx = match &value.kind {
            ExprKind::Name(name) => ctx.with_referenceable(name.clone()),
            _ => ctx.clone(),
        };
        let key = self.process(index, &index_ctx)?;
        self.call_object(&subscript, ArgMap::positional(vec![key]), span)
    }

    fn process_call(
        &mut self,
        func: &Expr,
        args: &[Expr],
        keywords: &[Keyword],
        ctx: &OperatorContext,
        span: Span,
    ) -> Result<QLObjectPtr> {
        let func_obj = self.process(func, ctx)?;
        let mut arg_map = ArgMap::default();
        for arg in args {
            arg_map.positional.push(self.process(arg, ctx)?);
        }
        for keyword in keywords {
            let value = self.process(&keyword.value, ctx)?;
            arg_map.keywords.push((keyword.name.clone(), value));
        }
        self.call_object(&func_obj, arg_map, span)
    }

    fn process_collection_children(
        &mut self,
        items: &[Expr],
        ctx: &OperatorContext,
    ) -> Result<Vec<QLObjectPtr>> {
        items.iter().map(|item| self.process(item, ctx)).collect()
    }

    fn process_binary(
        &mut self,
        op: &str,
        left: &Expr,
        right: &Expr,
        ctx: &OperatorContext,
        span: Span,
    ) -> Result<QLObjectPtr> {
        let left_obj = self.process(left, ctx)?;
        let right_obj = self.process(right, ctx)?;
        let left_node = self.expr_arg(&left_obj, "left side of operation", left.span)?;
        let right_node = self.expr_arg(&right_obj, "right side of operation", right.span)?;

        let Some(opcode) = binary_opcode(op) else {
            return Err(CompileError::unsupported(
                span,
                format!("operator '{op}' not supported"),
            ));
        };
        // Operators over two literal operands evaluate at compile time.
        if let Some(folded) = self.fold_binary(opcode, left_node, right_node, span) {
            return Ok(QLObject::expr(folded, span));
        }
        let node = self
            .graph
            .add_func(span, opcode.name(), Some(opcode), vec![left_node, right_node])?;
        Ok(QLObject::expr(node, span))
    }

    fn literal_at(&self, node: NodeId) -> Option<Literal> {
        match self.graph.node(node).and_then(|n| n.as_expression()) {
            Some(ExpressionKind::Literal(literal)) => Some(literal.clone()),
            _ => None,
        }
    }

    fn fold_binary(
        &mut self,
        opcode: Opcode,
        left: NodeId,
        right: NodeId,
        span: Span,
    ) -> Option<NodeId> {
        let lhs = self.literal_at(left)?;
        let rhs = self.literal_at(right)?;
        let folded = eval_binary_literals(opcode, &lhs, &rhs)?;
        Some(self.graph.add_literal(span, folded))
    }

    fn process_unary(
        &mut self,
        op: &str,
        operand: &Expr,
        ctx: &OperatorContext,
        span: Span,
    ) -> Result<QLObjectPtr> {
        let operand_obj = self.process(operand, ctx)?;
        let operand_node = self.expr_arg(&operand_obj, "operand of unary op", operand.span)?;

        let Some(opcode) = unary_opcode(op) else {
            return Err(CompileError::unsupported(
                span,
                format!("unary operator '{op}' not supported"),
            ));
        };
        if opcode == Opcode::NonOp {
            // Unary plus passes its operand through unchanged.
            return Ok(operand_obj);
        }
        if let Some(literal) = self.literal_at(operand_node)
            && let Some(folded) = eval_unary_literal(opcode, &literal)
        {
            let node = self.graph.add_literal(span, folded);
            return Ok(QLObject::expr(node, span));
        }
        let node = self
            .graph
            .add_func(span, opcode.name(), Some(opcode), vec![operand_node])?;
        Ok(QLObject::expr(node, span))
    }
}

/// Compile-time evaluation of an operator over two literals. `None` means
/// the combination does not fold (mixed or unsupported types, division by
/// zero, overflow) and lowers to a function-call node instead.
fn eval_binary_literals(opcode: Opcode, lhs: &Literal, rhs: &Literal) -> Option<Literal> {
    use Literal::{Bool, Float, Int, String as Str};

    match (lhs, rhs) {
        (Int(l), Int(r)) => match opcode {
            Opcode::Add => l.checked_add(*r).map(Int),
            Opcode::Sub => l.checked_sub(*r).map(Int),
            Opcode::Mul => l.checked_mul(*r).map(Int),
            // Integer division semantics are the engine's concern.
            Opcode::Div => None,
            Opcode::Mod => (*r != 0).then(|| Int(l % r)),
            _ => fold_comparison(opcode, l.partial_cmp(r)),
        },
        (Float(l), Float(r)) => fold_float(opcode, *l, *r),
        (Int(l), Float(r)) => fold_float(opcode, *l as f64, *r),
        (Float(l), Int(r)) => fold_float(opcode, *l, *r as f64),
        (Str(l), Str(r)) => match opcode {
            Opcode::Add => Some(Str(format!("{l}{r}"))),
            _ => fold_comparison(opcode, l.partial_cmp(r)),
        },
        (Bool(l), Bool(r)) => match opcode {
            Opcode::And => Some(Bool(*l && *r)),
            Opcode::Or => Some(Bool(*l || *r)),
            Opcode::Eq => Some(Bool(l == r)),
            Opcode::NotEq => Some(Bool(l != r)),
            _ => None,
        },
        _ => None,
    }
}

fn fold_float(opcode: Opcode, l: f64, r: f64) -> Option<Literal> {
    match opcode {
        Opcode::Add => Some(Literal::Float(l + r)),
        Opcode::Sub => Some(Literal::Float(l - r)),
        Opcode::Mul => Some(Literal::Float(l * r)),
        Opcode::Div => (r != 0.0).then(|| Literal::Float(l / r)),
        _ => fold_comparison(opcode, l.partial_cmp(&r)),
    }
}

fn fold_comparison(opcode: Opcode, ordering: Option<std::cmp::Ordering>) -> Option<Literal> {
    let ordering = ordering?;
    let result = match opcode {
        Opcode::Eq => ordering.is_eq(),
        Opcode::NotEq => ordering.is_ne(),
        Opcode::Lt => ordering.is_lt(),
        Opcode::LtEq => ordering.is_le(),
        Opcode::Gt => ordering.is_gt(),
        Opcode::GtEq => ordering.is_ge(),
        _ => return None,
    };
    Some(Literal::Bool(result))
}

fn eval_unary_literal(opcode: Opcode, operand: &Literal) -> Option<Literal> {
    match (opcode, operand) {
        (Opcode::Negate, Literal::Int(v)) => v.checked_neg().map(Literal::Int),
        (Opcode::Negate, Literal::Float(v)) => Some(Literal::Float(-v)),
        (Opcode::Not, Literal::Bool(v)) => Some(Literal::Bool(!v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_folds_with_overflow_guard() {
        assert_eq!(
            eval_binary_literals(Opcode::Add, &Literal::Int(41), &Literal::Int(1)),
            Some(Literal::Int(42))
        );
        assert_eq!(
            eval_binary_literals(Opcode::Add, &Literal::Int(i64::MAX), &Literal::Int(1)),
            None
        );
        assert_eq!(
            eval_binary_literals(Opcode::Div, &Literal::Int(4), &Literal::Int(2)),
            None
        );
    }

    #[test]
    fn comparisons_fold_to_bool() {
        assert_eq!(
            eval_binary_literals(Opcode::Lt, &Literal::Int(1), &Literal::Int(2)),
            Some(Literal::Bool(true))
        );
        assert_eq!(
            eval_binary_literals(
                Opcode::Eq,
                &Literal::String("a".to_string()),
                &Literal::String("b".to_string())
            ),
            Some(Literal::Bool(false))
        );
    }

    #[test]
    fn division_by_zero_never_folds() {
        assert_eq!(
            eval_binary_literals(Opcode::Div, &Literal::Float(1.0), &Literal::Float(0.0)),
            None
        );
    }

    #[test]
    fn time_literals_do_not_fold() {
        assert_eq!(
            eval_binary_literals(Opcode::Add, &Literal::Time(1), &Literal::Int(2)),
            None
        );
    }

    #[test]
    fn unary_folds() {
        assert_eq!(
            eval_unary_literal(Opcode::Negate, &Literal::Int(3)),
            Some(Literal::Int(-3))
        );
        assert_eq!(
            eval_unary_literal(Opcode::Not, &Literal::Bool(true)),
            Some(Literal::Bool(false))
        );
        assert_eq!(eval_unary_literal(Opcode::Not, &Literal::Int(1)), None);
    }
}

