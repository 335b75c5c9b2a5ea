//! User-defined functions: definitions, decorators, annotations,
//! introspection.

mod common;

use common::*;
use corsac_ast::{Expr, FunctionDef, Stmt};
use corsac_compiler::ir::DataType;
use corsac_compiler::{ErrorKind, ObjectKind, VisSpec};

fn identity_decorator(name_str: &str) -> Stmt {
    // def <name>(f): return f
    let def = FunctionDef::new(
        name_str,
        vec![param("f")],
        vec![Stmt::ret(Some(name("f")), sp())],
        sp(),
    );
    Stmt::function_def(def, sp())
}

fn vega_decorator(spec: &str) -> Expr {
    // cx.vis.vega('<spec>')
    name("cx")
        .attr("vis", sp())
        .attr("vega", sp())
        .call(vec![string(spec)], sp())
}

#[test]
fn falling_off_the_end_returns_none() {
    let def = FunctionDef::new("f", vec![], vec![assign("x", int(1))], sp());
    let mut compiler = compile(vec![Stmt::function_def(def, sp())]);
    let result = eval(&mut compiler, name("f").call(vec![], sp()));
    assert_eq!(result.kind(), ObjectKind::None);
}

#[test]
fn bare_return_yields_none() {
    let def = FunctionDef::new("f", vec![], vec![Stmt::ret(None, sp())], sp());
    let mut compiler = compile(vec![Stmt::function_def(def, sp())]);
    let result = eval(&mut compiler, name("f").call(vec![], sp()));
    assert_eq!(result.kind(), ObjectKind::None);
}

#[test]
fn default_values_are_rejected() {
    let def = FunctionDef::new(
        "f",
        vec![param("a").with_default(int(1))],
        vec![Stmt::ret(None, sp())],
        sp(),
    );
    let mut compiler = new_compiler();
    let err = compiler
        .process_module(&module(vec![Stmt::function_def(def, sp())]))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unsupported);
    assert!(err.message.contains("default values"));
}

#[test]
fn varargs_and_kwargs_are_rejected() {
    let mut with_vararg = FunctionDef::new("f", vec![], vec![Stmt::ret(None, sp())], sp());
    with_vararg.vararg = Some("args".to_string());
    let mut compiler = new_compiler();
    let err = compiler
        .process_module(&module(vec![Stmt::function_def(with_vararg, sp())]))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unsupported);
    assert!(err.message.contains("*args"));

    let mut with_kwarg = FunctionDef::new("f", vec![], vec![Stmt::ret(None, sp())], sp());
    with_kwarg.kwarg = Some("kwargs".to_string());
    let mut compiler = new_compiler();
    let err = compiler
        .process_module(&module(vec![Stmt::function_def(with_kwarg, sp())]))
        .unwrap_err();
    assert!(err.message.contains("**kwargs"));
}

#[test]
fn identity_decorator_preserves_callability() {
    let decorated = FunctionDef::new("g", vec![], vec![Stmt::ret(Some(int(7)), sp())], sp())
        .with_decorators(vec![name("d")]);
    let mut compiler = compile(vec![
        identity_decorator("d"),
        Stmt::function_def(decorated, sp()),
    ]);

    let result = eval(&mut compiler, name("g").call(vec![], sp()));
    assert_eq!(result.kind(), ObjectKind::Expr);
}

#[test]
fn decorator_stacks_apply_bottom_up() {
    // @cx.vis.vega('outer')
    // @cx.vis.vega('inner')
    // def f(): ...
    // equals outer(inner(f)): the outer decorator runs last and wins.
    let def = FunctionDef::new("f", vec![], vec![Stmt::ret(None, sp())], sp())
        .with_decorators(vec![vega_decorator("outer"), vega_decorator("inner")]);
    let compiler = compile(vec![import_cx(), Stmt::function_def(def, sp())]);

    let info = compiler.vis_funcs_info();
    assert_eq!(
        info.vis_specs.get("f"),
        Some(&VisSpec {
            vega_spec: "outer".to_string()
        })
    );
}

#[test]
fn vis_funcs_info_reports_doc_strings_and_args() {
    let def = FunctionDef::new(
        "histogram",
        vec![annotated_param("start", name("int")), param("table")],
        vec![
            Stmt::doc_string("Latency histogram.", sp()),
            Stmt::ret(None, sp()),
        ],
        sp(),
    )
    .with_decorators(vec![vega_decorator("{}")]);
    let compiler = compile(vec![import_cx(), Stmt::function_def(def, sp())]);

    let info = compiler.vis_funcs_info();
    assert_eq!(info.doc_strings.get("histogram").map(String::as_str), Some("Latency histogram."));
    let args = &info.fn_args.get("histogram").unwrap().args;
    assert_eq!(args.len(), 2);
    assert_eq!(args[0].name, "start");
    assert_eq!(args[0].data_type, Some(DataType::Int64));
    assert!(!args[0].has_default);
    assert_eq!(args[1].data_type, None);
}

#[test]
fn vis_funcs_info_serializes_for_hosts() {
    let def = FunctionDef::new(
        "f",
        vec![annotated_param("start", name("int"))],
        vec![Stmt::ret(None, sp())],
        sp(),
    )
    .with_decorators(vec![vega_decorator("{\"mark\": \"line\"}")]);
    let compiler = compile(vec![import_cx(), Stmt::function_def(def, sp())]);

    let json = serde_json::to_value(compiler.vis_funcs_info()).unwrap();
    assert_eq!(json["vis_specs"]["f"]["vega_spec"], "{\"mark\": \"line\"}");
    assert_eq!(json["fn_args"]["f"]["args"][0]["name"], "start");
    assert_eq!(json["fn_args"]["f"]["args"][0]["data_type"], "Int64");
}

#[test]
fn undecorated_functions_are_not_visualizations() {
    let def = FunctionDef::new("f", vec![], vec![Stmt::ret(None, sp())], sp());
    let compiler = compile(vec![Stmt::function_def(def, sp())]);
    assert!(compiler.vis_funcs_info().vis_specs.is_empty());
}

#[test]
fn main_func_args_spec_requires_main() {
    let compiler = compile(vec![assign("x", int(1))]);
    let err = compiler.main_func_args_spec().unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArgumentError);
    assert!(err.message.contains("'main'"));
}

#[test]
fn main_func_args_spec_describes_parameters() {
    let def = FunctionDef::new(
        "main",
        vec![
            annotated_param("start_time", name("int")),
            annotated_param("service", name("str")),
        ],
        vec![Stmt::doc_string("Entry point.", sp()), Stmt::ret(None, sp())],
        sp(),
    );
    let compiler = compile(vec![Stmt::function_def(def, sp())]);

    let spec = compiler.main_func_args_spec().unwrap();
    assert_eq!(spec.name, "main");
    assert_eq!(spec.doc_string, "Entry point.");
    assert_eq!(spec.args.len(), 2);
    assert_eq!(spec.args[0].name, "start_time");
    assert_eq!(spec.args[0].data_type, Some(DataType::Int64));
    assert_eq!(spec.args[1].data_type, Some(DataType::String));
}

#[test]
fn non_type_annotations_check_kind_equality() {
    // def f(m: cx): return None, where the annotation object is the module.
    let def = FunctionDef::new(
        "f",
        vec![annotated_param("m", name("cx"))],
        vec![Stmt::ret(None, sp())],
        sp(),
    );
    let mut compiler = compile(vec![import_cx(), Stmt::function_def(def, sp())]);

    // Passing the module itself is fine.
    let ok = eval(&mut compiler, name("f").call(vec![name("cx")], sp()));
    assert_eq!(ok.kind(), ObjectKind::None);

    // Passing an expression is a kind mismatch.
    let err = compiler
        .eval_single_expression(
            &module(vec![Stmt::expr(name("f").call(vec![int(1)], sp()))]),
            false,
        )
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert!(err.message.contains("module 'cx'"));
}

#[test]
fn keyword_arguments_bind_user_functions() {
    let def = FunctionDef::new(
        "f",
        vec![param("a"), param("b")],
        vec![Stmt::ret(Some(name("a").binop("-", name("b"), sp())), sp())],
        sp(),
    );
    let mut compiler = compile(vec![Stmt::function_def(def, sp())]);

    let call = name("f").call_with_keywords(
        vec![],
        vec![
            corsac_ast::Keyword::new("b", int(2), sp()),
            corsac_ast::Keyword::new("a", int(44), sp()),
        ],
        sp(),
    );
    let result = eval(&mut compiler, call);
    let node = result.node().unwrap();
    let expr = compiler.graph().node(node).and_then(|n| n.as_expression());
    assert!(matches!(
        expr,
        Some(corsac_compiler::ir::ExpressionKind::Literal(
            corsac_compiler::ir::Literal::Int(42)
        ))
    ));
}

#[test]
fn doc_string_rejected_in_function_body_after_first_statement() {
    let def = FunctionDef::new(
        "f",
        vec![],
        vec![assign("x", int(1)), Stmt::doc_string("late", sp())],
        sp(),
    );
    let mut compiler = compile(vec![Stmt::function_def(def, sp())]);
    let err = compiler
        .eval_single_expression(
            &module(vec![Stmt::expr(name("f").call(vec![], sp()))]),
            false,
        )
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
}
