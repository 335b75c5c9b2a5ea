//! Structured introspection payloads for hosts and UI layers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::compiler::{Compiler, MAIN_FUNC_NAME};
use crate::error::{CompileError, Result};
use crate::ir::DataType;
use crate::objects::{FuncObject, VisSpec};

/// Description of one declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgSpec {
    pub name: String,
    /// Semantic type resolved from a `Type` annotation, when present.
    pub data_type: Option<DataType>,
    pub has_default: bool,
}

/// Description of a function's parameters, emitted for the designated main
/// function or for visualization functions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuncArgsSpec {
    pub name: String,
    pub doc_string: String,
    pub args: Vec<ArgSpec>,
}

impl FuncArgsSpec {
    pub(crate) fn for_function(func: &FuncObject) -> Self {
        let args = func
            .params()
            .iter()
            .map(|param| ArgSpec {
                name: param.clone(),
                data_type: func.arg_types().get(param).copied(),
                has_default: func.has_default(param),
            })
            .collect();
        Self {
            name: func.name().to_string(),
            doc_string: func.doc_string().to_string(),
            args,
        }
    }
}

/// Per-function information for every visualization function in the
/// top-level scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisFuncsInfo {
    pub doc_strings: BTreeMap<String, String>,
    pub vis_specs: BTreeMap<String, VisSpec>,
    pub fn_args: BTreeMap<String, FuncArgsSpec>,
}

impl Compiler {
    /// Args spec of the designated main function.
    pub fn main_func_args_spec(&self) -> Result<FuncArgsSpec> {
        let span = corsac_ast::Span::synthesized();
        let Some(obj) = self.var_table.lookup(MAIN_FUNC_NAME) else {
            return Err(CompileError::argument(
                span,
                format!("could not find '{MAIN_FUNC_NAME}' function"),
            ));
        };
        let Some(func) = obj.as_function() else {
            return Err(CompileError::type_mismatch("function", &obj.type_name(), span));
        };
        Ok(FuncArgsSpec::for_function(func))
    }

    /// Doc-strings, visualization specs, and args specs for all
    /// visualization functions.
    pub fn vis_funcs_info(&self) -> VisFuncsInfo {
        let mut info = VisFuncsInfo::default();
        for (name, obj) in self.vis_funcs() {
            let Some(func) = obj.as_function() else {
                continue;
            };
            let Some(vis_spec) = func.vis_spec() else {
                continue;
            };
            info.doc_strings
                .insert(name.clone(), func.doc_string().to_string());
            info.vis_specs.insert(name.clone(), vis_spec.clone());
            info.fn_args
                .insert(name, FuncArgsSpec::for_function(func));
        }
        info
    }
}
