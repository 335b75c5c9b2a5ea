//! Fixed operator-text to opcode tables.
//!
//! The AST carries operators as their surface text; the compiler resolves
//! them here. Unknown operator text is a compile error at the call site.

use serde::Serialize;

/// Opcodes for lowered scalar function expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Not,
    Negate,
    /// Sentinel for unary `+`: the operand passes through unchanged and no
    /// IR node is created.
    NonOp,
}

impl Opcode {
    /// Canonical lowered function name for this opcode.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Sub => "subtract",
            Opcode::Mul => "multiply",
            Opcode::Div => "divide",
            Opcode::Mod => "modulo",
            Opcode::Eq => "equal",
            Opcode::NotEq => "notEqual",
            Opcode::Lt => "lessThan",
            Opcode::LtEq => "lessThanEqual",
            Opcode::Gt => "greaterThan",
            Opcode::GtEq => "greaterThanEqual",
            Opcode::And => "logicalAnd",
            Opcode::Or => "logicalOr",
            Opcode::Not => "logicalNot",
            Opcode::Negate => "negate",
            Opcode::NonOp => "",
        }
    }

    /// Number of expression children a lowered call with this opcode takes.
    pub fn arity(self) -> usize {
        match self {
            Opcode::Not | Opcode::Negate | Opcode::NonOp => 1,
            _ => 2,
        }
    }
}

/// Resolve binary/boolean/comparison operator text.
pub fn binary_opcode(op: &str) -> Option<Opcode> {
    match op {
        "+" => Some(Opcode::Add),
        "-" => Some(Opcode::Sub),
        "*" => Some(Opcode::Mul),
        "/" => Some(Opcode::Div),
        "%" => Some(Opcode::Mod),
        "==" => Some(Opcode::Eq),
        "!=" => Some(Opcode::NotEq),
        "<" => Some(Opcode::Lt),
        "<=" => Some(Opcode::LtEq),
        ">" => Some(Opcode::Gt),
        ">=" => Some(Opcode::GtEq),
        "and" => Some(Opcode::And),
        "or" => Some(Opcode::Or),
        _ => None,
    }
}

/// Resolve unary operator text.
pub fn unary_opcode(op: &str) -> Option<Opcode> {
    match op {
        "not" => Some(Opcode::Not),
        "-" => Some(Opcode::Negate),
        "+" => Some(Opcode::NonOp),
        _ => None,
    }
}
