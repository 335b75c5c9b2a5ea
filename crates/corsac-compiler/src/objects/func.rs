//! Function objects: callables with declared parameters, argument binding,
//! annotation metadata, and a native-or-suite body thunk.

use std::collections::BTreeMap;
use std::rc::Weak;

use corsac_ast::{Span, Suite};

use crate::builtins::Builtin;
use crate::error::{CompileError, Result};
use crate::ir::DataType;
use crate::objects::{QLObjectPtr, VisSpec};
use crate::vartable::VarTable;

/// The body of a function object.
#[derive(Debug, Clone)]
pub enum FuncBody {
    /// One of the closed set of built-in behaviors, dispatched inside the
    /// compiler.
    Native(Builtin),
    /// A user-defined body: the stored AST suite plus the scope the
    /// function was defined in. Invocation binds arguments into a child of
    /// that scope and re-enters the visitor. The scope reference is weak;
    /// the owning translation keeps defining scopes alive for its own
    /// lifetime.
    Suite { body: Suite, scope: Weak<VarTable> },
}

/// A callable value.
#[derive(Debug, Clone)]
pub struct FuncObject {
    name: String,
    params: Vec<String>,
    defaults: BTreeMap<String, QLObjectPtr>,
    annotations: BTreeMap<String, QLObjectPtr>,
    arg_types: BTreeMap<String, DataType>,
    doc_string: String,
    vis_spec: Option<VisSpec>,
    /// Accept keyword arguments beyond the declared parameters. Only the
    /// aggregate method uses this; its keywords name output columns.
    variadic_keywords: bool,
    body: FuncBody,
}

impl FuncObject {
    pub fn new(name: impl Into<String>, params: Vec<&str>, body: FuncBody) -> Self {
        Self {
            name: name.into(),
            params: params.into_iter().map(str::to_string).collect(),
            defaults: BTreeMap::new(),
            annotations: BTreeMap::new(),
            arg_types: BTreeMap::new(),
            doc_string: String::new(),
            vis_spec: None,
            variadic_keywords: false,
            body,
        }
    }

    pub(crate) fn with_variadic_keywords(mut self) -> Self {
        self.variadic_keywords = true;
        self
    }

    pub fn with_default(mut self, param: &str, value: QLObjectPtr) -> Self {
        self.defaults.insert(param.to_string(), value);
        self
    }

    pub fn with_annotations(mut self, annotations: BTreeMap<String, QLObjectPtr>) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn with_arg_types(mut self, arg_types: BTreeMap<String, DataType>) -> Self {
        self.arg_types = arg_types;
        self
    }

    pub fn with_doc_string(mut self, doc_string: impl Into<String>) -> Self {
        self.doc_string = doc_string.into();
        self
    }

    pub fn with_vis_spec(mut self, vis_spec: VisSpec) -> Self {
        self.vis_spec = Some(vis_spec);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p == name)
    }

    pub fn has_default(&self, name: &str) -> bool {
        self.defaults.contains_key(name)
    }

    pub fn annotations(&self) -> &BTreeMap<String, QLObjectPtr> {
        &self.annotations
    }

    /// Parameter types resolved from `Type` annotations, used by the
    /// exec-function entrypoint and the args-spec emitter.
    pub fn arg_types(&self) -> &BTreeMap<String, DataType> {
        &self.arg_types
    }

    pub fn doc_string(&self) -> &str {
        &self.doc_string
    }

    pub fn vis_spec(&self) -> Option<&VisSpec> {
        self.vis_spec.as_ref()
    }

    pub fn has_visualization(&self) -> bool {
        self.vis_spec.is_some()
    }

    pub fn body(&self) -> &FuncBody {
        &self.body
    }

    /// Bind call-site arguments to declared parameters.
    ///
    /// Positional arguments fill parameters left-to-right, then keywords
    /// fill the rest by name, then defaults. Any unbound required
    /// parameter, unknown keyword, or double binding is an error; variadics
    /// are not accepted.
    pub fn bind_args(&self, args: ArgMap, span: Span) -> Result<BoundArgs> {
        if args.positional.len() > self.params.len() {
            return Err(CompileError::argument(
                span,
                format!(
                    "function '{}' takes {} argument(s) but {} were given",
                    self.name,
                    self.params.len(),
                    args.positional.len()
                ),
            ));
        }

        let mut values: BTreeMap<String, QLObjectPtr> = BTreeMap::new();
        let mut extra_keywords = Vec::new();
        for (param, value) in self.params.iter().zip(args.positional) {
            values.insert(param.clone(), value);
        }

        for (key, value) in args.keywords {
            if !self.has_param(&key) {
                if self.variadic_keywords {
                    extra_keywords.push((key, value));
                    continue;
                }
                return Err(CompileError::argument(
                    span,
                    format!(
                        "function '{}' got an unexpected keyword argument '{key}'",
                        self.name
                    ),
                ));
            }
            if values.contains_key(&key) {
                return Err(CompileError::argument(
                    span,
                    format!("function '{}' got multiple values for argument '{key}'", self.name),
                ));
            }
            values.insert(key, value);
        }

        for param in &self.params {
            if values.contains_key(param) {
                continue;
            }
            if let Some(default) = self.defaults.get(param) {
                values.insert(param.clone(), default.clone());
                continue;
            }
            return Err(CompileError::argument(
                span,
                format!("function '{}' missing required argument '{param}'", self.name),
            ));
        }

        Ok(BoundArgs {
            values,
            extra_keywords,
        })
    }
}

/// Arguments at a call site, before binding.
#[derive(Debug, Default)]
pub struct ArgMap {
    pub positional: Vec<QLObjectPtr>,
    pub keywords: Vec<(String, QLObjectPtr)>,
}

impl ArgMap {
    pub fn positional(args: Vec<QLObjectPtr>) -> Self {
        Self {
            positional: args,
            keywords: Vec::new(),
        }
    }
}

/// Fully bound arguments: one value per declared parameter, plus any
/// variadic keywords in call order when the callee accepts them.
#[derive(Debug)]
pub struct BoundArgs {
    values: BTreeMap<String, QLObjectPtr>,
    extra_keywords: Vec<(String, QLObjectPtr)>,
}

impl BoundArgs {
    /// Value for a declared parameter. Binding guarantees presence.
    pub fn get(&self, param: &str) -> Option<&QLObjectPtr> {
        self.values.get(param)
    }

    /// Value for a parameter the callee's signature declares. Absence means
    /// the callee and its binding disagree, which is an internal error.
    pub fn required(&self, param: &str, span: Span) -> Result<&QLObjectPtr> {
        self.values.get(param).ok_or_else(|| {
            CompileError::internal(span, format!("argument '{param}' missing after binding"))
        })
    }

    pub fn extra_keywords(&self) -> &[(String, QLObjectPtr)] {
        &self.extra_keywords
    }
}
