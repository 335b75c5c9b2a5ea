//! Compiler front-end for the Corsac dataframe query language.
//!
//! The front-end consumes an already-parsed AST (see `corsac-ast`) and
//! produces a typed DAG of dataframe operators and scalar expressions for
//! downstream planning. Parsing, optimization, and execution live
//! elsewhere.
//!
//! # Example
//!
//! ```
//! use corsac_ast::{Expr, Module, Span, Stmt};
//! use corsac_compiler::{CompileOptions, Compiler, CompilerState};
//!
//! let sp = Span::point(1, 0);
//! // import cx
//! // df = cx.DataFrame('t')
//! // cx.display(df, 'out')
//! let module = Module::new(
//!     vec![
//!         Stmt::import("cx", None, sp),
//!         Stmt::assign(
//!             Expr::name("df", sp),
//!             Expr::name("cx", sp)
//!                 .attr("DataFrame", sp)
//!                 .call(vec![Expr::string("t", sp)], sp),
//!             sp,
//!         ),
//!         Stmt::expr(Expr::name("cx", sp).attr("display", sp).call(
//!             vec![Expr::name("df", sp), Expr::string("out", sp)],
//!             sp,
//!         )),
//!     ],
//!     sp,
//! );
//!
//! let mut compiler = Compiler::new(CompilerState::new(), CompileOptions::default()).unwrap();
//! compiler.process_module(&module).unwrap();
//! assert_eq!(compiler.graph().operators().count(), 2);
//! ```

pub mod builtins;
pub mod compiler;
pub mod error;
pub mod ir;
pub mod modules;
pub mod objects;
pub mod vartable;

pub use compiler::{
    ArgSpec, ArgValue, CompileOptions, Compiler, CompilerState, FuncArgsSpec, FuncToExecute,
    MAIN_FUNC_NAME, OperatorContext, VisFuncsInfo,
};
pub use error::{CompileError, ErrorKind, Result};
pub use ir::{DataType, IrGraph, NodeId};
pub use modules::BUILTIN_MODULE_NAME;
pub use objects::{ObjectKind, QLObject, QLObjectPtr, VisSpec};
