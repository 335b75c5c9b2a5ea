//! The exec-function entrypoint: string-encoded arguments, sink naming,
//! and request validation.

mod common;

use common::*;
use corsac_ast::{Expr, FunctionDef, Stmt};
use corsac_compiler::ir::OperatorKind;
use corsac_compiler::{
    ArgValue, CompileOptions, Compiler, CompilerState, ErrorKind, FuncToExecute,
};

fn exec_compiler(statements: Vec<Stmt>) -> Compiler {
    let mut compiler = Compiler::new(
        CompilerState::new(),
        CompileOptions {
            func_based_exec: true,
            ..CompileOptions::default()
        },
    )
    .unwrap();
    compiler.process_module(&module(statements)).unwrap();
    compiler
}

fn request(func: &str, prefix: &str, args: Vec<ArgValue>) -> FuncToExecute {
    FuncToExecute {
        func_name: func.to_string(),
        output_table_prefix: prefix.to_string(),
        arg_values: args,
    }
}

fn sink_names(compiler: &Compiler) -> Vec<String> {
    compiler
        .graph()
        .operators()
        .filter_map(|node| match node.as_operator() {
            Some(OperatorKind::MemorySink { name, .. }) => Some(name.clone()),
            _ => None,
        })
        .collect()
}

/// `def main(x: str): return cx.DataFrame(x)` plus the leading import.
fn main_returning_dataframe() -> Vec<Stmt> {
    let def = FunctionDef::new(
        "main",
        vec![annotated_param("x", name("str"))],
        vec![Stmt::ret(Some(cx("DataFrame").call(vec![name("x")], sp())), sp())],
        sp(),
    );
    vec![import_cx(), Stmt::function_def(def, sp())]
}

#[test]
fn single_dataframe_return_gets_the_bare_prefix() {
    let mut compiler = exec_compiler(main_returning_dataframe());
    compiler
        .process_exec_funcs(&[request("main", "o", vec![ArgValue::new("x", "t")])])
        .unwrap();
    assert_eq!(sink_names(&compiler), vec!["o"]);
}

#[test]
fn collection_returns_get_indexed_prefixes() {
    // def pair(): return [cx.DataFrame('a'), cx.DataFrame('b')]
    let def = FunctionDef::new(
        "pair",
        vec![],
        vec![Stmt::ret(
            Some(Expr::list(vec![cx_dataframe("a"), cx_dataframe("b")], sp())),
            sp(),
        )],
        sp(),
    );
    let mut compiler = exec_compiler(vec![import_cx(), Stmt::function_def(def, sp())]);
    compiler
        .process_exec_funcs(&[request("pair", "out", vec![])])
        .unwrap();
    assert_eq!(sink_names(&compiler), vec!["out[0]", "out[1]"]);
}

#[test]
fn display_is_inert_under_function_based_execution() {
    let compiler = exec_compiler(vec![
        import_cx(),
        assign("df", cx_dataframe("t")),
        cx_display(name("df"), "ignored"),
    ]);
    assert!(sink_names(&compiler).is_empty());
}

#[test]
fn typed_arguments_parse_from_strings() {
    // def f(n: int, frac: float, flag: bool, s: str): return cx.DataFrame(s)
    let def = FunctionDef::new(
        "f",
        vec![
            annotated_param("n", name("int")),
            annotated_param("frac", name("float")),
            annotated_param("flag", name("bool")),
            annotated_param("s", name("str")),
        ],
        vec![Stmt::ret(Some(cx("DataFrame").call(vec![name("s")], sp())), sp())],
        sp(),
    );
    let mut compiler = exec_compiler(vec![import_cx(), Stmt::function_def(def, sp())]);
    compiler
        .process_exec_funcs(&[request(
            "f",
            "o",
            vec![
                ArgValue::new("n", "42"),
                ArgValue::new("frac", "0.5"),
                ArgValue::new("flag", "true"),
                ArgValue::new("s", "t"),
            ],
        )])
        .unwrap();
    assert_eq!(sink_names(&compiler), vec!["o"]);
}

#[test]
fn malformed_argument_values_fail() {
    let mut compiler = exec_compiler(main_returning_dataframe());
    // 'x' is annotated str, so any text parses; use an int-annotated fn.
    let def = FunctionDef::new(
        "g",
        vec![annotated_param("n", name("int"))],
        vec![Stmt::ret(Some(cx("DataFrame").call(vec![string("t")], sp())), sp())],
        sp(),
    );
    compiler
        .process_module(&module(vec![Stmt::function_def(def, sp())]))
        .unwrap();

    let err = compiler
        .process_exec_funcs(&[request("g", "o", vec![ArgValue::new("n", "forty-two")])])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArgumentError);
    assert!(err.message.contains("forty-two"));
    assert!(err.message.contains("int64"));
}

#[test]
fn unknown_argument_names_fail() {
    let mut compiler = exec_compiler(main_returning_dataframe());
    let err = compiler
        .process_exec_funcs(&[request("main", "o", vec![ArgValue::new("nope", "t")])])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArgumentError);
    assert!(err.message.contains("'nope'"));
}

#[test]
fn unannotated_parameters_cannot_receive_exec_arguments() {
    let def = FunctionDef::new(
        "f",
        vec![param("x")],
        vec![Stmt::ret(Some(cx("DataFrame").call(vec![string("t")], sp())), sp())],
        sp(),
    );
    let mut compiler = exec_compiler(vec![import_cx(), Stmt::function_def(def, sp())]);
    let err = compiler
        .process_exec_funcs(&[request("f", "o", vec![ArgValue::new("x", "t")])])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArgumentError);
    assert!(err.message.contains("annotation required"));
}

#[test]
fn missing_function_name_or_prefix_fail() {
    let mut compiler = exec_compiler(main_returning_dataframe());
    let err = compiler
        .process_exec_funcs(&[request("", "o", vec![])])
        .unwrap_err();
    assert!(err.message.contains("func_name"));

    let err = compiler
        .process_exec_funcs(&[request("main", "", vec![])])
        .unwrap_err();
    assert!(err.message.contains("output_table_prefix"));
}

#[test]
fn unknown_function_fails() {
    let mut compiler = exec_compiler(main_returning_dataframe());
    let err = compiler
        .process_exec_funcs(&[request("absent", "o", vec![])])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NameNotFound);
}

#[test]
fn executing_a_non_function_fails() {
    let mut compiler = exec_compiler(vec![import_cx(), assign("x", int(1))]);
    let err = compiler
        .process_exec_funcs(&[request("x", "o", vec![])])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[test]
fn non_dataframe_returns_fail() {
    let def = FunctionDef::new("f", vec![], vec![Stmt::ret(Some(int(1)), sp())], sp());
    let mut compiler = exec_compiler(vec![import_cx(), Stmt::function_def(def, sp())]);
    let err = compiler
        .process_exec_funcs(&[request("f", "o", vec![])])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert!(err.message.contains("DataFrame"));
}
