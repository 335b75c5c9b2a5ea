//! Host-driven execution of previously defined functions.
//!
//! After translation the host may invoke top-level functions by name with
//! string-encoded argument values. Each argument is parsed into a typed IR
//! literal according to the parameter's annotation, the function runs
//! through the visitor, and every returned dataframe is terminated with a
//! fresh memory sink named after the request's output prefix.

use corsac_ast::Span;

use crate::compiler::Compiler;
use crate::error::{CompileError, ErrorKind, Result};
use crate::ir::{DataType, Literal, NodeId};
use crate::objects::{ArgMap, ObjectKind, QLObject, QLObjectPtr};

/// One function-execution request.
#[derive(Debug, Clone)]
pub struct FuncToExecute {
    pub func_name: String,
    pub output_table_prefix: String,
    pub arg_values: Vec<ArgValue>,
}

/// A string-encoded argument value.
#[derive(Debug, Clone)]
pub struct ArgValue {
    pub name: String,
    pub value: String,
}

impl ArgValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Compiler {
    /// Invoke each requested function and terminate its outputs with
    /// memory sinks.
    pub fn process_exec_funcs(&mut self, funcs: &[FuncToExecute]) -> Result<()> {
        let span = Span::synthesized();
        for request in funcs {
            if request.func_name.is_empty() {
                return Err(CompileError::argument(
                    span,
                    "func_name must be specified for each function to execute",
                ));
            }
            if request.output_table_prefix.is_empty() {
                return Err(CompileError::argument(
                    span,
                    format!(
                        "output_table_prefix must be specified for function '{}'",
                        request.func_name
                    ),
                ));
            }
            tracing::debug!(func = %request.func_name, "exec function");

            let Some(obj) = self.var_table.lookup(&request.func_name) else {
                return Err(CompileError::new(
                    ErrorKind::NameNotFound,
                    span,
                    format!("function to execute '{}' not found", request.func_name),
                ));
            };
            let Some(func) = obj.as_function() else {
                return Err(CompileError::type_mismatch(
                    "function",
                    &obj.type_name(),
                    span,
                ));
            };

            let mut args = ArgMap::default();
            for arg in &request.arg_values {
                if !func.has_param(&arg.name) {
                    return Err(CompileError::argument(
                        span,
                        format!(
                            "function '{}' does not have an argument called '{}'",
                            request.func_name, arg.name
                        ),
                    ));
                }
                let Some(data_type) = func.arg_types().get(&arg.name).copied() else {
                    return Err(CompileError::argument(
                        span,
                        format!(
                            "argument type annotation required: function '{}', argument '{}'",
                            request.func_name, arg.name
                        ),
                    ));
                };
                let node = self.parse_string_as_type(span, &arg.value, data_type)?;
                // Binding accepts declared parameters as keywords, so the
                // request order need not match the declaration order.
                args.keywords
                    .push((arg.name.clone(), QLObject::expr(node, span)));
            }

            let returned = self.call_func(func, args, span)?;
            self.terminate_exec_output(&request.func_name, &request.output_table_prefix, &returned)?;
        }
        Ok(())
    }

    fn terminate_exec_output(
        &mut self,
        func_name: &str,
        prefix: &str,
        returned: &QLObjectPtr,
    ) -> Result<()> {
        let span = Span::synthesized();
        match returned.kind() {
            ObjectKind::Dataframe => {
                let op = self.dataframe_arg(returned, "return value", span)?;
                self.graph.add_memory_sink(span, op, prefix, Vec::new())?;
                Ok(())
            }
            ObjectKind::List | ObjectKind::Tuple => {
                let items = returned
                    .collection_items()
                    .ok_or_else(|| CompileError::internal(span, "collection without items"))?
                    .to_vec();
                for (i, item) in items.iter().enumerate() {
                    if item.kind() != ObjectKind::Dataframe {
                        return Err(CompileError::type_mismatch(
                            "DataFrame",
                            &format!(
                                "{} (function '{func_name}' return index {i})",
                                item.type_name()
                            ),
                            span,
                        ));
                    }
                    let op = self.dataframe_arg(item, "return value", span)?;
                    self.graph
                        .add_memory_sink(span, op, format!("{prefix}[{i}]"), Vec::new())?;
                }
                Ok(())
            }
            _ => Err(CompileError::type_mismatch(
                "DataFrame",
                &format!("{} (function '{func_name}' return)", returned.type_name()),
                span,
            )),
        }
    }

    /// Parse a string-encoded argument into a typed literal node.
    fn parse_string_as_type(
        &mut self,
        span: Span,
        value: &str,
        data_type: DataType,
    ) -> Result<NodeId> {
        let literal = match data_type {
            DataType::Bool => match value.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Literal::Bool(true),
                "false" | "f" | "0" => Literal::Bool(false),
                _ => {
                    return Err(CompileError::argument(
                        span,
                        format!("failed to parse argument value '{value}' as bool"),
                    ));
                }
            },
            DataType::Int64 => Literal::Int(parse_i64(value, "int64", span)?),
            DataType::Float64 => {
                let parsed: f64 = value.parse().map_err(|_| {
                    CompileError::argument(
                        span,
                        format!("failed to parse argument value '{value}' as float64"),
                    )
                })?;
                Literal::Float(parsed)
            }
            DataType::String => Literal::String(value.to_string()),
            DataType::Time64 => Literal::Time(parse_i64(value, "time", span)?),
            DataType::Duration64 => Literal::Duration(parse_i64(value, "duration", span)?),
            DataType::UInt128 => {
                return Err(CompileError::unsupported(
                    span,
                    "uint128 arguments to executed functions are not supported",
                ));
            }
        };
        Ok(self.graph.add_literal(span, literal))
    }
}

fn parse_i64(value: &str, what: &str, span: Span) -> Result<i64> {
    value.parse().map_err(|_| {
        CompileError::argument(
            span,
            format!("failed to parse argument value '{value}' as {what}"),
        )
    })
}
