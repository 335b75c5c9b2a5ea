//! The AST visitor: translates a parsed module into the IR graph.
//!
//! The compiler owns the arena and the module registry and threads
//! `&mut self` through the recursion. Scopes are `Rc<VarTable>` chains;
//! entering a function body or a module body swaps the active scope and
//! restores it afterwards, so stored function bodies never hold owning
//! back-references to their defining visitor.

mod context;
mod exec;
mod expr;
mod introspect;

pub use context::{MAP_OPERATOR_NAME, OperatorContext};
pub use exec::{ArgValue, FuncToExecute};
pub use introspect::{ArgSpec, FuncArgsSpec, VisFuncsInfo};

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use corsac_ast::{Expr, ExprKind, FunctionDef, Module, Span, Stmt, StmtKind, Suite};

use crate::builtins::create_builtin_module;
use crate::error::{CompileError, ErrorKind, Result};
use crate::ir::{ColumnAssignment, DataType, ExpressionKind, IrGraph, Literal};
use crate::modules::{BUILTIN_MODULE_NAME, ModuleHandler};
use crate::objects::{ArgMap, FuncBody, FuncObject, ObjectKind, QLObject, QLObjectPtr};
use crate::vartable::VarTable;

/// Name of the function designated for host-driven execution.
pub const MAIN_FUNC_NAME: &str = "main";

/// Downstream metadata handed to the compiler by the host.
#[derive(Debug, Clone, Default)]
pub struct CompilerState {
    tables: Option<BTreeSet<String>>,
    udfs: BTreeMap<String, usize>,
}

impl CompilerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `cx.DataFrame` to the given table names. Without this the
    /// front-end defers table validation downstream.
    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = Some(tables.into_iter().map(Into::into).collect());
        self
    }

    /// Register a scalar UDF exposed as an attribute of the built-in
    /// module.
    pub fn with_udf(mut self, name: impl Into<String>, arity: usize) -> Self {
        self.udfs.insert(name.into(), arity);
        self
    }

    pub fn has_table(&self, name: &str) -> bool {
        match &self.tables {
            Some(tables) => tables.contains(name),
            None => true,
        }
    }

    pub(crate) fn udfs(&self) -> &BTreeMap<String, usize> {
        &self.udfs
    }
}

/// Per-translation configuration.
#[derive(Debug, Default)]
pub struct CompileOptions {
    /// When set, sinks come from exec-function requests and `cx.display`
    /// is a no-op.
    pub func_based_exec: bool,
    /// Host-provided names that may not be used as assignment targets.
    pub reserved_names: BTreeSet<String>,
    /// Pre-parsed user modules, importable by name.
    pub modules: BTreeMap<String, Module>,
}

/// The AST-to-IR translator for one script.
#[derive(Debug)]
pub struct Compiler {
    pub(crate) graph: IrGraph,
    pub(crate) state: CompilerState,
    pub(crate) modules: ModuleHandler,
    pub(crate) var_table: Rc<VarTable>,
    pub(crate) reserved_names: BTreeSet<String>,
    pub(crate) func_based_exec: bool,
    /// Scopes created for module bodies and function calls. Function
    /// bodies hold only weak references to their defining scope, so the
    /// translation owns every scope it creates and frees them together at
    /// teardown.
    retained_scopes: Vec<Rc<VarTable>>,
}

impl Compiler {
    pub fn new(state: CompilerState, options: CompileOptions) -> Result<Self> {
        let mut compiler = Self {
            graph: IrGraph::new(),
            state,
            modules: ModuleHandler::new(),
            var_table: VarTable::new_root(),
            reserved_names: options.reserved_names,
            func_based_exec: options.func_based_exec,
            retained_scopes: Vec::new(),
        };
        let top_scope = Rc::clone(&compiler.var_table);
        compiler.install_globals(&top_scope);
        compiler.setup_modules(options.modules)?;
        Ok(compiler)
    }

    /// Type objects, bool literals, and `None`, installed into a top-level
    /// scope before any statement runs.
    fn install_globals(&mut self, scope: &Rc<VarTable>) {
        let span = Span::synthesized();
        for (name, data_type) in [
            ("int", DataType::Int64),
            ("float", DataType::Float64),
            ("str", DataType::String),
            ("bool", DataType::Bool),
        ] {
            scope.add(name, QLObject::type_object(data_type, span));
        }
        scope.add("None", QLObject::none(span));

        let true_node = self.graph.add_literal(span, Literal::Bool(true));
        scope.add("True", QLObject::expr(true_node, span));
        let false_node = self.graph.add_literal(span, Literal::Bool(false));
        scope.add("False", QLObject::expr(false_node, span));
    }

    fn setup_modules(&mut self, user_modules: BTreeMap<String, Module>) -> Result<()> {
        let builtin = create_builtin_module(&mut self.graph, self.state.udfs());
        self.modules.register_ready(BUILTIN_MODULE_NAME, builtin);
        for (name, ast) in user_modules {
            self.modules.register_pending(name, ast);
        }
        // Compile every registered module up front; imports between them
        // recurse through ensure_module_compiled and detect cycles.
        for name in self.modules.pending_names() {
            self.ensure_module_compiled(&name, Span::synthesized())?;
        }
        Ok(())
    }

    /// The compiled module object for `name`, compiling it first if it is
    /// still pending. Re-entry while the module compiles is an import
    /// cycle.
    fn ensure_module_compiled(&mut self, name: &str, span: Span) -> Result<QLObjectPtr> {
        let Some(ast) = self.modules.begin_compile(name, span)? else {
            return self
                .modules
                .ready(name)
                .ok_or_else(|| CompileError::internal(span, format!("module '{name}' not ready")));
        };

        tracing::debug!(module = %name, "compiling user module");
        // Fresh top-level scope sharing this compiler's arena and module
        // registry, the same way a child visitor would. Globals live in a
        // parent scope so they do not become module attributes.
        let globals_scope = VarTable::new_root();
        self.install_globals(&globals_scope);
        let module_scope = globals_scope.create_child();
        self.retained_scopes.push(Rc::clone(&module_scope));
        let saved = std::mem::replace(&mut self.var_table, Rc::clone(&module_scope));
        let result = self.process_suite(&ast.body, false);
        self.var_table = saved;
        result?;

        let module = QLObject::module(name, module_scope.local_bindings(), span);
        self.modules.finish_compile(name, Rc::clone(&module));
        Ok(module)
    }

    /// Translate a top-level module.
    pub fn process_module(&mut self, module: &Module) -> Result<()> {
        self.process_suite(&module.body, false)?;
        Ok(())
    }

    /// Evaluate a module consisting of exactly one expression statement and
    /// return its value. With `import_builtin`, the expression sees the
    /// built-in module in a child scope, leaving the calling scope
    /// untouched.
    pub fn eval_single_expression(
        &mut self,
        module: &Module,
        import_builtin: bool,
    ) -> Result<QLObjectPtr> {
        let statements = &module.body.statements;
        if statements.len() != 1 {
            return Err(CompileError::syntax(
                module.span,
                "single-expression evaluation requires exactly one statement",
            ));
        }
        let StmtKind::Expr(expr) = &statements[0].kind else {
            return Err(CompileError::syntax(
                statements[0].span,
                "single-expression evaluation requires an expression statement",
            ));
        };

        if !import_builtin {
            return self.process(expr, &OperatorContext::empty());
        }

        let builtin = self
            .modules
            .ready(BUILTIN_MODULE_NAME)
            .ok_or_else(|| CompileError::internal(module.span, "built-in module not registered"))?;
        let child = self.var_table.create_child();
        child.add(BUILTIN_MODULE_NAME, builtin);
        let saved = std::mem::replace(&mut self.var_table, child);
        let result = self.process(expr, &OperatorContext::empty());
        self.var_table = saved;
        result
    }

    /// The IR graph built so far.
    pub fn graph(&self) -> &IrGraph {
        &self.graph
    }

    /// Tear the compiler down into its IR graph.
    pub fn into_graph(self) -> IrGraph {
        self.graph
    }

    pub(crate) fn process_suite(
        &mut self,
        body: &Suite,
        is_function_body: bool,
    ) -> Result<QLObjectPtr> {
        let mut statements = body.statements.as_slice();
        if statements.is_empty() {
            return Err(CompileError::syntax(body.span, "no runnable code found"));
        }

        if let StmtKind::DocString(text) = &statements[0].kind {
            if !is_function_body {
                let node = self
                    .graph
                    .add_literal(statements[0].span, Literal::String(text.clone()));
                self.var_table
                    .add("__doc__", QLObject::expr(node, statements[0].span));
            }
            // Function doc-strings are consumed at definition time.
            statements = &statements[1..];
        } else if !is_function_body {
            let node = self.graph.add_literal(body.span, Literal::String(String::new()));
            self.var_table.add("__doc__", QLObject::expr(node, body.span));
        }

        for stmt in statements {
            match &stmt.kind {
                StmtKind::Import { module, as_name } => {
                    self.process_import(module, as_name.as_deref(), stmt.span)?;
                }
                StmtKind::ImportFrom {
                    module,
                    names,
                    level,
                } => {
                    self.process_import_from(module, names, *level, stmt.span)?;
                }
                StmtKind::Assign { target, value } => {
                    self.process_assign(target, value, stmt.span)?;
                }
                StmtKind::FunctionDef(def) => {
                    self.process_function_def(def, stmt.span)?;
                }
                StmtKind::Expr(expr) => {
                    self.process(expr, &OperatorContext::empty())?;
                }
                StmtKind::DocString(_) => {
                    return Err(CompileError::syntax(
                        stmt.span,
                        "doc strings are only allowed at the start of a module or function",
                    ));
                }
                StmtKind::Return(value) => {
                    if !is_function_body {
                        return Err(CompileError::syntax(stmt.span, "'return' outside function"));
                    }
                    // A return ends the suite with its value.
                    return self.process_return(value.as_ref(), stmt.span);
                }
            }
        }

        // Falling off the end of a suite yields None.
        Ok(QLObject::none(body.span))
    }

    fn process_import(&mut self, module: &str, as_name: Option<&str>, span: Span) -> Result<()> {
        if !self.modules.contains(module) {
            return Err(CompileError::module_not_found(module, span));
        }
        let obj = self.ensure_module_compiled(module, span)?;
        self.var_table.add(as_name.unwrap_or(module), obj);
        Ok(())
    }

    fn process_import_from(
        &mut self,
        module: &str,
        names: &[corsac_ast::ImportAlias],
        level: u32,
        span: Span,
    ) -> Result<()> {
        if level != 0 {
            return Err(CompileError::unsupported(
                span,
                format!("relative imports are not supported (level {level})"),
            ));
        }
        if !self.modules.contains(module) {
            return Err(CompileError::module_not_found(module, span));
        }
        let obj = self.ensure_module_compiled(module, span)?;
        for alias in names {
            let Some(attr) = obj.attribute(&alias.name) else {
                return Err(CompileError::import_name_not_found(module, &alias.name, span));
            };
            self.var_table.add(alias.bound_name(), attr);
        }
        Ok(())
    }

    fn check_not_reserved(&self, name: &str, span: Span) -> Result<()> {
        if self.reserved_names.contains(name) {
            return Err(CompileError::argument(
                span,
                format!("'{name}' is a reserved name and may not be assigned"),
            ));
        }
        Ok(())
    }

    fn process_assign(&mut self, target: &Expr, value: &Expr, span: Span) -> Result<()> {
        match &target.kind {
            ExprKind::Subscript {
                value: base,
                index: _,
            } => self.process_subscript_assignment(target, base, value, span),
            ExprKind::Attribute { value: base, attr } => {
                self.process_attribute_assignment(target, base, attr, value, span)
            }
            ExprKind::Name(name) => {
                self.check_not_reserved(name, target.span)?;
                let processed = self.process(value, &OperatorContext::empty())?;
                self.var_table.add(name.clone(), processed);
                Ok(())
            }
            _ => Err(CompileError::syntax(
                target.span,
                "assignment target must be a name, subscript, or attribute",
            )),
        }
    }

    /// `df[col] = expr`: subscript assignment is only valid as a map
    /// assignment onto a dataframe held in a plain name.
    fn process_subscript_assignment(
        &mut self,
        target: &Expr,
        base: &Expr,
        value: &Expr,
        span: Span,
    ) -> Result<()> {
        let target_obj = self.process(target, &OperatorContext::empty())?;
        let base_obj = self.process(base, &OperatorContext::empty())?;
        if base_obj.kind() != ObjectKind::Dataframe {
            return Err(CompileError::type_mismatch(
                "DataFrame",
                &base_obj.type_name(),
                target.span,
            ));
        }
        self.process_map_assignment(base, &base_obj, &target_obj, value, span)
    }

    /// `target.name = expr`: a map assignment when the target is a
    /// dataframe, otherwise plain attribute assignment.
    fn process_attribute_assignment(
        &mut self,
        target: &Expr,
        base: &Expr,
        attr: &str,
        value: &Expr,
        span: Span,
    ) -> Result<()> {
        let base_obj = self.process(base, &OperatorContext::empty())?;
        if base_obj.kind() == ObjectKind::Dataframe {
            let target_obj = self.process(target, &OperatorContext::empty())?;
            return self.process_map_assignment(base, &base_obj, &target_obj, value, span);
        }

        let processed = self.process(value, &OperatorContext::empty())?;
        if !base_obj.supports_attribute_assignment() {
            return Err(CompileError::new(
                ErrorKind::TypeMismatch,
                target.span,
                format!("{} does not support attribute assignment", base_obj.type_name()),
            ));
        }
        base_obj.set_attribute(attr, processed);
        Ok(())
    }

    /// Rewrite `df[c] = e` into a new dataframe with a map operator that
    /// adds column `c`, then delete the placeholder column node the LHS
    /// produced.
    fn process_map_assignment(
        &mut self,
        base: &Expr,
        base_obj: &QLObjectPtr,
        target_obj: &QLObjectPtr,
        value: &Expr,
        span: Span,
    ) -> Result<()> {
        let ExprKind::Name(df_name) = &base.kind else {
            return Err(CompileError::syntax(
                base.span,
                "can only assign to a dataframe column through a plain name",
            ));
        };

        let target_node = self.expr_arg(target_obj, "assignment target", span)?;
        let Some(ExpressionKind::Column {
            name: column_name, ..
        }) = self.graph.node(target_node).and_then(|n| n.as_expression())
        else {
            return Err(CompileError::type_mismatch(
                "column assignment target",
                &target_obj.type_name(),
                span,
            ));
        };
        let column_name = column_name.clone();

        let parent_op = self
            .dataframe_arg(base_obj, "assignment base", span)?;

        let ctx = OperatorContext::map_assignment(
            parent_op,
            vec![column_name.clone(), df_name.clone()],
        );
        let value_obj = self.process(value, &ctx)?;
        let value_node = self.expr_arg(&value_obj, "assignment value", value.span)?;
        self.check_map_expression_columns(value_node, &ctx)?;

        let map = self.graph.add_map(
            span,
            parent_op,
            vec![ColumnAssignment {
                name: column_name,
                expr: value_node,
            }],
            true,
        )?;
        self.var_table.add(df_name.clone(), QLObject::dataframe(map, span));

        // The placeholder column consumed by the map assignment has no
        // dependents left.
        self.graph.delete_node(target_node)
    }

    /// Every column reference in a map expression must bind to one of the
    /// context's parent operators. The referenceable-name check covers
    /// subscripts written inline; this catches columns smuggled in through
    /// variables bound earlier.
    fn check_map_expression_columns(
        &self,
        root: crate::ir::NodeId,
        ctx: &OperatorContext,
    ) -> Result<()> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.graph.node(id) else {
                continue;
            };
            if let Some(ExpressionKind::Column {
                name,
                parent: Some(parent),
            }) = node.as_expression()
                && !ctx.parent_ops.contains(parent)
            {
                return Err(CompileError::name_not_in_context(name, node.span));
            }
            stack.extend(node.references());
        }
        Ok(())
    }

    fn process_function_def(&mut self, def: &FunctionDef, span: Span) -> Result<()> {
        self.check_not_reserved(&def.name, span)?;

        if let Some(vararg) = &def.vararg {
            return Err(CompileError::unsupported(
                span,
                format!("variable-length args ('*{vararg}') are not supported in function definitions"),
            ));
        }
        if let Some(kwarg) = &def.kwarg {
            return Err(CompileError::unsupported(
                span,
                format!(
                    "variable-length kwargs ('**{kwarg}') are not supported in function definitions"
                ),
            ));
        }

        let mut params = Vec::with_capacity(def.params.len());
        let mut annotations = BTreeMap::new();
        let mut arg_types = BTreeMap::new();
        for param in &def.params {
            if param.default.is_some() {
                return Err(CompileError::unsupported(
                    param.span,
                    "default values are not supported in function definitions",
                ));
            }
            params.push(param.name.as_str());
            if let Some(annotation) = &param.annotation {
                let annotation_obj = self.process(annotation, &OperatorContext::empty())?;
                if let Some(data_type) = annotation_obj.as_data_type() {
                    arg_types.insert(param.name.clone(), data_type);
                }
                annotations.insert(param.name.clone(), annotation_obj);
            }
        }

        let doc_string = match def.body.statements.first() {
            Some(Stmt {
                kind: StmtKind::DocString(text),
                ..
            }) => text.clone(),
            _ => String::new(),
        };

        let func = FuncObject::new(
            def.name.clone(),
            params,
            FuncBody::Suite {
                body: def.body.clone(),
                scope: Rc::downgrade(&self.var_table),
            },
        )
        .with_annotations(annotations)
        .with_arg_types(arg_types)
        .with_doc_string(doc_string);

        let mut bound: QLObjectPtr = QLObject::function(func, span);
        // Decorators apply bottom-up: the last decorator in source order
        // (closest to the definition) runs first.
        for decorator in def.decorators.iter().rev() {
            let decorator_obj = self.process(decorator, &OperatorContext::empty())?;
            let result =
                self.call_object(&decorator_obj, ArgMap::positional(vec![bound]), decorator.span)?;
            if result.kind() != ObjectKind::Function {
                return Err(CompileError::type_mismatch(
                    "function",
                    &result.type_name(),
                    decorator.span,
                ));
            }
            bound = result;
        }

        self.var_table.add(def.name.clone(), bound);
        Ok(())
    }

    fn process_return(&mut self, value: Option<&Expr>, span: Span) -> Result<QLObjectPtr> {
        match value {
            Some(expr) => self.process(expr, &OperatorContext::empty()),
            None => Ok(QLObject::none(span)),
        }
    }

    /// Call any callable object with the given arguments.
    pub(crate) fn call_object(
        &mut self,
        obj: &QLObjectPtr,
        args: ArgMap,
        span: Span,
    ) -> Result<QLObjectPtr> {
        let Some(func) = obj.as_function() else {
            // Calling a column reference reads like a method call on its
            // dataframe, so report it that way.
            if obj.kind() == ObjectKind::Expr
                && let Some(node) = obj.node()
                && let Some(ExpressionKind::Column { name, .. }) =
                    self.graph.node(node).and_then(|n| n.as_expression())
            {
                return Err(CompileError::new(
                    ErrorKind::TypeMismatch,
                    span,
                    format!("dataframe has no method '{name}'"),
                ));
            }
            return Err(CompileError::not_callable(&obj.type_name(), span));
        };
        self.call_func(func, args, span)
    }

    pub(crate) fn call_func(
        &mut self,
        func: &FuncObject,
        args: ArgMap,
        span: Span,
    ) -> Result<QLObjectPtr> {
        let bound = func.bind_args(args, span)?;

        for (param, annotation) in func.annotations() {
            let arg = bound.required(param, span)?;
            self.check_annotation(arg, annotation, span)?;
        }

        match func.body() {
            FuncBody::Native(builtin) => self.call_builtin(builtin, &bound, span),
            FuncBody::Suite { body, scope } => {
                let Some(defining_scope) = scope.upgrade() else {
                    return Err(CompileError::internal(
                        span,
                        format!("defining scope of function '{}' no longer exists", func.name()),
                    ));
                };
                let child = defining_scope.create_child();
                self.retained_scopes.push(Rc::clone(&child));
                for param in func.params() {
                    child.add(param.clone(), Rc::clone(bound.required(param, span)?));
                }
                let saved = std::mem::replace(&mut self.var_table, child);
                let result = self.process_suite(body, true);
                self.var_table = saved;
                result
            }
        }
    }

    /// Annotation soundness: a `Type` annotation requires the argument's
    /// expression to match the annotated primitive type; any other
    /// annotation object requires kind equality.
    fn check_annotation(
        &self,
        arg: &QLObjectPtr,
        annotation: &QLObjectPtr,
        span: Span,
    ) -> Result<()> {
        if let Some(expected) = annotation.as_data_type() {
            let node = self.expr_arg(arg, "annotated argument", span)?;
            let Some(expr) = self.graph.node(node).and_then(|n| n.as_expression()) else {
                return Err(CompileError::internal(span, format!("unknown node {node}")));
            };
            if let Some(actual) = expr.static_data_type()
                && actual != expected
            {
                return Err(CompileError::type_mismatch(
                    expected.name(),
                    actual.name(),
                    span,
                ));
            }
            return Ok(());
        }
        if annotation.kind() != arg.kind() {
            return Err(CompileError::type_mismatch(
                &annotation.type_name(),
                &arg.type_name(),
                span,
            ));
        }
        Ok(())
    }

    /// Functions in the top-level scope marked as visualizations.
    pub(crate) fn vis_funcs(&self) -> Vec<(String, QLObjectPtr)> {
        self.var_table.vis_funcs()
    }
}
