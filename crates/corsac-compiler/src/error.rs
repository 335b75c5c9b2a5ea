//! Diagnostics for the compiler front-end.
//!
//! Every failure carries the offending AST node's span and a message
//! rendered deterministically from its arguments, so hosts can compare
//! diagnostics against golden files. There is no recovery: the first
//! failing sub-evaluation aborts the whole translation.

use corsac_ast::Span;
use thiserror::Error;

/// The closed set of diagnostic kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-place construct.
    Syntax,
    /// A name lookup failed (variable, column context, table).
    NameNotFound,
    /// An import referenced an unregistered module.
    ModuleNotFound,
    /// A value's type contradicted an annotation or expected kind.
    TypeMismatch,
    /// Bad arguments at a call site.
    ArgumentError,
    /// A recognized construct the language intentionally does not support.
    Unsupported,
    /// An internal consistency violation (arena misuse).
    Internal,
}

impl ErrorKind {
    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "syntax error",
            ErrorKind::NameNotFound => "name error",
            ErrorKind::ModuleNotFound => "module error",
            ErrorKind::TypeMismatch => "type error",
            ErrorKind::ArgumentError => "argument error",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Internal => "internal error",
        }
    }
}

/// A position-annotated compile diagnostic.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{span}: {}: {message}", .kind.as_str())]
pub struct CompileError {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, CompileError>;

impl CompileError {
    pub fn new(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, span, message)
    }

    pub fn name_not_found(name: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::NameNotFound,
            span,
            format!("name '{name}' is not defined"),
        )
    }

    pub fn name_not_in_context(name: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::NameNotFound,
            span,
            format!("name '{name}' is not available in this context"),
        )
    }

    pub fn module_not_found(module: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::ModuleNotFound,
            span,
            format!("no module named '{module}'"),
        )
    }

    pub fn import_name_not_found(module: &str, name: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::ModuleNotFound,
            span,
            format!("cannot import name '{name}' from '{module}'"),
        )
    }

    pub fn type_mismatch(expected: &str, actual: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            span,
            format!("expected '{expected}', received '{actual}'"),
        )
    }

    pub fn not_callable(name: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            span,
            format!("'{name}' object is not callable"),
        )
    }

    pub fn not_subscriptable(name: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            span,
            format!("'{name}' object is not subscriptable"),
        )
    }

    pub fn no_attribute(name: &str, attr: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::NameNotFound,
            span,
            format!("'{name}' object has no attribute '{attr}'"),
        )
    }

    pub fn argument(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArgumentError, span, message)
    }

    pub fn unsupported(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, span, message)
    }

    pub fn internal(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, span, message)
    }
}
