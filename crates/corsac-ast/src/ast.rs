//! AST node types for the Corsac query language.
//!
//! The surface syntax is a strict subset of a dynamic scripting language.
//! Parsing happens upstream of this crate; hosts hand the compiler a
//! [`Module`] assembled by their parser (or, in tests, by the constructor
//! helpers below). Every node carries a [`Span`] so diagnostics can point
//! back into the original source.

use crate::span::Span;

/// Root of a parsed script or user module.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub body: Suite,
    pub span: Span,
}

impl Module {
    pub fn new(statements: Vec<Stmt>, span: Span) -> Self {
        Self {
            body: Suite { statements, span },
            span,
        }
    }
}

/// An ordered statement block (module body or function body).
#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// A statement with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// A bare string literal in statement position. Only legal as the first
    /// statement of a module or function body.
    DocString(String),
    /// `import X` / `import X as Y`.
    Import {
        module: String,
        as_name: Option<String>,
    },
    /// `from X import a, b as c`. `level` counts leading dots (relative
    /// imports); anything other than 0 is rejected by the compiler.
    ImportFrom {
        module: String,
        names: Vec<ImportAlias>,
        level: u32,
    },
    /// Single-target assignment.
    Assign { target: Expr, value: Expr },
    /// `def name(params): body` with optional decorators.
    FunctionDef(FunctionDef),
    /// An expression evaluated for effect.
    Expr(Expr),
    /// `return` / `return expr`. Only legal inside a function body.
    Return(Option<Expr>),
}

impl Stmt {
    pub fn doc_string(text: impl Into<String>, span: Span) -> Self {
        Self {
            kind: StmtKind::DocString(text.into()),
            span,
        }
    }

    pub fn import(module: impl Into<String>, as_name: Option<&str>, span: Span) -> Self {
        Self {
            kind: StmtKind::Import {
                module: module.into(),
                as_name: as_name.map(str::to_string),
            },
            span,
        }
    }

    pub fn import_from(
        module: impl Into<String>,
        names: Vec<ImportAlias>,
        level: u32,
        span: Span,
    ) -> Self {
        Self {
            kind: StmtKind::ImportFrom {
                module: module.into(),
                names,
                level,
            },
            span,
        }
    }

    pub fn assign(target: Expr, value: Expr, span: Span) -> Self {
        Self {
            kind: StmtKind::Assign { target, value },
            span,
        }
    }

    pub fn function_def(def: FunctionDef, span: Span) -> Self {
        Self {
            kind: StmtKind::FunctionDef(def),
            span,
        }
    }

    pub fn expr(expr: Expr) -> Self {
        let span = expr.span;
        Self {
            kind: StmtKind::Expr(expr),
            span,
        }
    }

    pub fn ret(value: Option<Expr>, span: Span) -> Self {
        Self {
            kind: StmtKind::Return(value),
            span,
        }
    }
}

/// One name brought in by `from X import …`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportAlias {
    pub name: String,
    pub as_name: Option<String>,
    pub span: Span,
}

impl ImportAlias {
    pub fn new(name: impl Into<String>, as_name: Option<&str>, span: Span) -> Self {
        Self {
            name: name.into(),
            as_name: as_name.map(str::to_string),
            span,
        }
    }

    /// The name this alias binds in the importing scope.
    pub fn bound_name(&self) -> &str {
        self.as_name.as_deref().unwrap_or(&self.name)
    }
}

/// A function definition statement.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    /// `*args` parameter name, if the source declared one. The compiler
    /// rejects it; it is carried so the diagnostic can point at it.
    pub vararg: Option<String>,
    /// `**kwargs` parameter name, if declared. Also rejected.
    pub kwarg: Option<String>,
    /// Decorator expressions, outermost first.
    pub decorators: Vec<Expr>,
    pub body: Suite,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, params: Vec<Param>, body: Vec<Stmt>, span: Span) -> Self {
        Self {
            name: name.into(),
            params,
            vararg: None,
            kwarg: None,
            decorators: Vec::new(),
            body: Suite {
                statements: body,
                span,
            },
        }
    }

    pub fn with_decorators(mut self, decorators: Vec<Expr>) -> Self {
        self.decorators = decorators;
        self
    }
}

/// A declared function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub annotation: Option<Expr>,
    pub default: Option<Expr>,
    pub span: Span,
}

impl Param {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: None,
            span,
        }
    }

    pub fn with_annotation(mut self, annotation: Expr) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn with_default(mut self, default: Expr) -> Self {
        self.default = Some(default);
        self
    }
}

/// A keyword argument at a call site.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

impl Keyword {
    pub fn new(name: impl Into<String>, value: Expr, span: Span) -> Self {
        Self {
            name: name.into(),
            value,
            span,
        }
    }
}

/// An expression with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Identifier reference.
    Name(String),
    /// String literal.
    Str(String),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// `value.attr`.
    Attribute { value: Box<Expr>, attr: String },
    /// `value[index]`.
    Subscript { value: Box<Expr>, index: Box<Expr> },
    /// `func(args, name=value, …)`.
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
    },
    /// `[a, b, …]`.
    List(Vec<Expr>),
    /// `(a, b, …)`.
    Tuple(Vec<Expr>),
    /// Arithmetic/modulo binary operator, carried as its surface text
    /// (`"+"`, `"-"`, `"*"`, `"/"`, `"%"`). The compiler resolves the text
    /// through a fixed opcode table.
    BinaryOp {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `and` / `or` over exactly the listed operands.
    BoolOp { op: String, values: Vec<Expr> },
    /// Comparison; `comparators` holds the right-hand operands of a
    /// (possibly chained) comparison in source order.
    Compare {
        op: String,
        left: Box<Expr>,
        comparators: Vec<Expr>,
    },
    /// `not x`, `-x`, `+x`.
    UnaryOp { op: String, operand: Box<Expr> },
}

impl Expr {
    pub fn name(id: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ExprKind::Name(id.into()),
            span,
        }
    }

    pub fn string(value: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ExprKind::Str(value.into()),
            span,
        }
    }

    pub fn int(value: i64, span: Span) -> Self {
        Self {
            kind: ExprKind::Int(value),
            span,
        }
    }

    pub fn float(value: f64, span: Span) -> Self {
        Self {
            kind: ExprKind::Float(value),
            span,
        }
    }

    pub fn list(items: Vec<Expr>, span: Span) -> Self {
        Self {
            kind: ExprKind::List(items),
            span,
        }
    }

    pub fn tuple(items: Vec<Expr>, span: Span) -> Self {
        Self {
            kind: ExprKind::Tuple(items),
            span,
        }
    }

    /// Build `self.attr`.
    pub fn attr(self, attr: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ExprKind::Attribute {
                value: Box::new(self),
                attr: attr.into(),
            },
            span,
        }
    }

    /// Build `self[index]`.
    pub fn index(self, index: Expr, span: Span) -> Self {
        Self {
            kind: ExprKind::Subscript {
                value: Box::new(self),
                index: Box::new(index),
            },
            span,
        }
    }

    /// Build `self(args…)` with no keyword arguments.
    pub fn call(self, args: Vec<Expr>, span: Span) -> Self {
        self.call_with_keywords(args, Vec::new(), span)
    }

    pub fn call_with_keywords(self, args: Vec<Expr>, keywords: Vec<Keyword>, span: Span) -> Self {
        Self {
            kind: ExprKind::Call {
                func: Box::new(self),
                args,
                keywords,
            },
            span,
        }
    }

    /// Build `self <op> rhs` for arithmetic operators.
    pub fn binop(self, op: impl Into<String>, rhs: Expr, span: Span) -> Self {
        Self {
            kind: ExprKind::BinaryOp {
                op: op.into(),
                left: Box::new(self),
                right: Box::new(rhs),
            },
            span,
        }
    }

    /// Build `self <op> rhs` for comparison operators.
    pub fn compare(self, op: impl Into<String>, rhs: Expr, span: Span) -> Self {
        Self {
            kind: ExprKind::Compare {
                op: op.into(),
                left: Box::new(self),
                comparators: vec![rhs],
            },
            span,
        }
    }

    /// Build `self and rhs` / `self or rhs`.
    pub fn boolop(self, op: impl Into<String>, rhs: Expr, span: Span) -> Self {
        Self {
            kind: ExprKind::BoolOp {
                op: op.into(),
                values: vec![self, rhs],
            },
            span,
        }
    }

    pub fn unary(op: impl Into<String>, operand: Expr, span: Span) -> Self {
        Self {
            kind: ExprKind::UnaryOp {
                op: op.into(),
                operand: Box::new(operand),
            },
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp(line: u32) -> Span {
        Span::point(line, 0)
    }

    #[test]
    fn builders_chain_into_nested_expressions() {
        // cx.DataFrame('t')
        let expr = Expr::name("cx", sp(1))
            .attr("DataFrame", sp(1))
            .call(vec![Expr::string("t", sp(1))], sp(1));

        let ExprKind::Call { func, args, .. } = &expr.kind else {
            panic!("expected call");
        };
        assert!(matches!(&func.kind, ExprKind::Attribute { attr, .. } if attr == "DataFrame"));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn import_alias_bound_name_prefers_as_name() {
        let plain = ImportAlias::new("a", None, sp(1));
        assert_eq!(plain.bound_name(), "a");
        let renamed = ImportAlias::new("a", Some("b"), sp(1));
        assert_eq!(renamed.bound_name(), "b");
    }

    #[test]
    fn stmt_expr_inherits_expression_span() {
        let stmt = Stmt::expr(Expr::int(1, sp(4)));
        assert_eq!(stmt.span, sp(4));
    }
}
