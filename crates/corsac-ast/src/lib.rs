//! AST node types and source spans for the Corsac query language.

pub mod ast;
pub mod span;

pub use ast::{
    Expr, ExprKind, FunctionDef, ImportAlias, Keyword, Module, Param, Stmt, StmtKind, Suite,
};
pub use span::{Location, Span};
