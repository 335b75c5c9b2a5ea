#![allow(dead_code)]

//! AST builder shorthand shared by the integration suites. Hosts normally
//! get these trees from their parser; tests assemble them by hand.

use corsac_ast::{Expr, Module, Param, Span, Stmt};
use corsac_compiler::{CompileOptions, Compiler, CompilerState, QLObjectPtr};

pub fn sp() -> Span {
    Span::point(1, 0)
}

pub fn at(line: u32, column: u32) -> Span {
    Span::point(line, column)
}

pub fn module(statements: Vec<Stmt>) -> Module {
    Module::new(statements, sp())
}

pub fn name(id: &str) -> Expr {
    Expr::name(id, sp())
}

pub fn string(value: &str) -> Expr {
    Expr::string(value, sp())
}

pub fn int(value: i64) -> Expr {
    Expr::int(value, sp())
}

pub fn float(value: f64) -> Expr {
    Expr::float(value, sp())
}

/// `cx.<attr>`
pub fn cx(attr: &str) -> Expr {
    name("cx").attr(attr, sp())
}

/// `cx.DataFrame('<table>')`
pub fn cx_dataframe(table: &str) -> Expr {
    cx("DataFrame").call(vec![string(table)], sp())
}

/// `cx.display(<out>, '<name>')`
pub fn cx_display(out: Expr, sink_name: &str) -> Stmt {
    Stmt::expr(cx("display").call(vec![out, string(sink_name)], sp()))
}

pub fn import_cx() -> Stmt {
    Stmt::import("cx", None, sp())
}

pub fn assign(target: &str, value: Expr) -> Stmt {
    Stmt::assign(name(target), value, sp())
}

/// `<df>['<column>'] = <value>`
pub fn subscript_assign(df: &str, column: &str, value: Expr) -> Stmt {
    Stmt::assign(name(df).index(string(column), sp()), value, sp())
}

pub fn param(p: &str) -> Param {
    Param::new(p, sp())
}

pub fn annotated_param(p: &str, annotation: Expr) -> Param {
    Param::new(p, sp()).with_annotation(annotation)
}

/// Opt-in test tracing (stderr, env-filtered).
pub fn init_test_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// A compiler over an empty state with default options.
pub fn new_compiler() -> Compiler {
    Compiler::new(CompilerState::new(), CompileOptions::default()).expect("compiler setup")
}

/// Compile a module built from the given statements, panicking on
/// diagnostics.
pub fn compile(statements: Vec<Stmt>) -> Compiler {
    let mut compiler = new_compiler();
    compiler.process_module(&module(statements)).expect("compile");
    compiler
}

/// Evaluate one expression in the compiler's current top-level scope.
pub fn eval(compiler: &mut Compiler, expr: Expr) -> QLObjectPtr {
    compiler
        .eval_single_expression(&module(vec![Stmt::expr(expr)]), false)
        .expect("eval")
}
