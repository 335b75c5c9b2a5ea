//! Scope semantics: lexical lookup, shadowing, globals, reserved names.

mod common;

use common::*;
use corsac_ast::{FunctionDef, Stmt};
use corsac_compiler::ir::{ExpressionKind, Literal};
use corsac_compiler::{
    CompileOptions, Compiler, CompilerState, ErrorKind, ObjectKind, QLObjectPtr,
};

fn literal_of(compiler: &Compiler, obj: &QLObjectPtr) -> Literal {
    let node = obj.node().expect("expression object");
    match compiler.graph().node(node).and_then(|n| n.as_expression()) {
        Some(ExpressionKind::Literal(literal)) => literal.clone(),
        other => panic!("expected literal, got {other:?}"),
    }
}

#[test]
fn function_scope_bindings_do_not_leak_into_parent() {
    // x = 1
    // def f():
    //     x = 2
    //     return x
    // f()
    let def = FunctionDef::new(
        "f",
        vec![],
        vec![
            assign("x", int(2)),
            Stmt::ret(Some(name("x")), sp()),
        ],
        sp(),
    );
    let mut compiler = compile(vec![
        assign("x", int(1)),
        Stmt::function_def(def, sp()),
        Stmt::expr(name("f").call(vec![], sp())),
    ]);

    // After the call's child scope is gone, the parent still sees 1.
    let x = eval(&mut compiler, name("x"));
    assert_eq!(literal_of(&compiler, &x), Literal::Int(1));
}

#[test]
fn function_body_reads_enclosing_scope() {
    // x = 41
    // def f(): return x + 1
    let def = FunctionDef::new(
        "f",
        vec![],
        vec![Stmt::ret(Some(name("x").binop("+", int(1), sp())), sp())],
        sp(),
    );
    let mut compiler = compile(vec![assign("x", int(41)), Stmt::function_def(def, sp())]);

    let result = eval(&mut compiler, name("f").call(vec![], sp()));
    assert_eq!(literal_of(&compiler, &result), Literal::Int(42));
}

#[test]
fn globals_are_installed_before_translation() {
    let mut compiler = new_compiler();

    let t = eval(&mut compiler, name("True"));
    assert_eq!(literal_of(&compiler, &t), Literal::Bool(true));
    let f = eval(&mut compiler, name("False"));
    assert_eq!(literal_of(&compiler, &f), Literal::Bool(false));

    assert_eq!(eval(&mut compiler, name("None")).kind(), ObjectKind::None);
    for type_name in ["int", "float", "str", "bool"] {
        assert_eq!(eval(&mut compiler, name(type_name)).kind(), ObjectKind::Type);
    }
}

#[test]
fn module_doc_string_binds_dunder_doc() {
    let mut compiler = new_compiler();
    compiler
        .process_module(&module(vec![
            Stmt::doc_string("Top-level doc.", sp()),
            assign("x", int(1)),
        ]))
        .unwrap();

    let doc = eval(&mut compiler, name("__doc__"));
    assert_eq!(
        literal_of(&compiler, &doc),
        Literal::String("Top-level doc.".to_string())
    );
}

#[test]
fn missing_doc_string_still_binds_empty_dunder_doc() {
    let mut compiler = new_compiler();
    compiler
        .process_module(&module(vec![assign("x", int(1))]))
        .unwrap();

    let doc = eval(&mut compiler, name("__doc__"));
    assert_eq!(literal_of(&compiler, &doc), Literal::String(String::new()));
}

#[test]
fn reserved_names_may_not_be_assigned() {
    let mut compiler = Compiler::new(
        CompilerState::new(),
        CompileOptions {
            reserved_names: ["out"].into_iter().map(String::from).collect(),
            ..CompileOptions::default()
        },
    )
    .unwrap();

    let err = compiler
        .process_module(&module(vec![assign("out", int(1))]))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArgumentError);
    assert!(err.message.contains("'out' is a reserved name"));
}

#[test]
fn reserved_names_may_not_name_functions() {
    let mut compiler = Compiler::new(
        CompilerState::new(),
        CompileOptions {
            reserved_names: ["out"].into_iter().map(String::from).collect(),
            ..CompileOptions::default()
        },
    )
    .unwrap();

    let def = FunctionDef::new("out", vec![], vec![Stmt::ret(None, sp())], sp());
    let err = compiler
        .process_module(&module(vec![Stmt::function_def(def, sp())]))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArgumentError);
}

#[test]
fn assignment_rebinds_in_current_scope() {
    let mut compiler = compile(vec![assign("x", int(1)), assign("x", int(2))]);
    let x = eval(&mut compiler, name("x"));
    assert_eq!(literal_of(&compiler, &x), Literal::Int(2));
}

#[test]
fn single_expression_eval_with_builtin_does_not_pollute_scope() {
    let mut compiler = new_compiler();

    // `cx` is visible inside the child evaluation...
    let df = compiler
        .eval_single_expression(&module(vec![Stmt::expr(cx_dataframe("t"))]), true)
        .unwrap();
    assert_eq!(df.kind(), ObjectKind::Dataframe);

    // ...but was never bound in the top-level scope.
    let err = compiler
        .eval_single_expression(&module(vec![Stmt::expr(name("cx"))]), false)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NameNotFound);
}

#[test]
fn return_outside_function_is_rejected() {
    let mut compiler = new_compiler();
    let err = compiler
        .process_module(&module(vec![Stmt::ret(Some(int(1)), sp())]))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert!(err.message.contains("'return' outside function"));
}

#[test]
fn doc_string_after_first_statement_is_rejected() {
    let mut compiler = new_compiler();
    let err = compiler
        .process_module(&module(vec![
            assign("x", int(1)),
            Stmt::doc_string("late", sp()),
        ]))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
}
