//! IR node kinds: dataframe operators and scalar expressions.

use corsac_ast::Span;
use serde::Serialize;

use crate::ir::opcode::Opcode;

/// Stable identity of an IR node within one translation's arena.
///
/// Ids increase monotonically in allocation order and are never reused, so
/// downstream passes can reconstruct graph order deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Primitive value types of the query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataType {
    Bool,
    Int64,
    Float64,
    String,
    Time64,
    Duration64,
    UInt128,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
            DataType::String => "string",
            DataType::Time64 => "time64",
            DataType::Duration64 => "duration64",
            DataType::UInt128 => "uint128",
        }
    }
}

/// A literal scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Nanoseconds since the epoch.
    Time(i64),
    /// Nanoseconds.
    Duration(i64),
    UInt128(u128),
}

impl Literal {
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Bool(_) => DataType::Bool,
            Literal::Int(_) => DataType::Int64,
            Literal::Float(_) => DataType::Float64,
            Literal::String(_) => DataType::String,
            Literal::Time(_) => DataType::Time64,
            Literal::Duration(_) => DataType::Duration64,
            Literal::UInt128(_) => DataType::UInt128,
        }
    }
}

/// One `name = expression` output column of a map operator.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnAssignment {
    pub name: String,
    pub expr: NodeId,
}

/// One `out_name = func(column)` output of an aggregate operator.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateAssignment {
    pub name: String,
    pub func: String,
    pub column: NodeId,
}

/// Join flavors accepted by `merge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinKind {
    pub fn parse(how: &str) -> Option<Self> {
        match how {
            "inner" => Some(JoinKind::Inner),
            "left" => Some(JoinKind::Left),
            "right" => Some(JoinKind::Right),
            "outer" => Some(JoinKind::Outer),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "left",
            JoinKind::Right => "right",
            JoinKind::Outer => "outer",
        }
    }
}

/// Dataframe operator kinds. Operators form the dataflow DAG; each variant
/// records the parent operators it consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorKind {
    /// Scan of a named table.
    MemorySource { table: String, columns: Vec<String> },
    /// Terminal sink publishing its input under an output name.
    MemorySink {
        parent: NodeId,
        name: String,
        columns: Vec<String>,
    },
    /// Column projection/extension. When `keep_input_columns` is set, the
    /// assignments extend (or overwrite within) the input schema; otherwise
    /// they define the output schema completely.
    Map {
        parent: NodeId,
        assignments: Vec<ColumnAssignment>,
        keep_input_columns: bool,
    },
    /// Row filter on a boolean predicate expression.
    Filter { parent: NodeId, predicate: NodeId },
    /// Two-sided equi-join.
    Join {
        left: NodeId,
        right: NodeId,
        how: JoinKind,
        left_on: Vec<String>,
        right_on: Vec<String>,
    },
    /// Grouping keys for a downstream aggregate.
    GroupBy { parent: NodeId, keys: Vec<NodeId> },
    /// Aggregation. When the parent is a group-by operator the keys carry
    /// over; otherwise the aggregate is global.
    Aggregate {
        parent: NodeId,
        aggregates: Vec<AggregateAssignment>,
    },
    /// First-n rows.
    Limit { parent: NodeId, n: i64 },
    /// Row-wise union of same-schema inputs.
    Union { parents: Vec<NodeId> },
    /// Drop the named columns from the input schema.
    Drop { parent: NodeId, columns: Vec<String> },
}

impl OperatorKind {
    /// Parent operators this operator consumes.
    pub fn parents(&self) -> Vec<NodeId> {
        match self {
            OperatorKind::MemorySource { .. } => Vec::new(),
            OperatorKind::MemorySink { parent, .. }
            | OperatorKind::Map { parent, .. }
            | OperatorKind::Filter { parent, .. }
            | OperatorKind::GroupBy { parent, .. }
            | OperatorKind::Aggregate { parent, .. }
            | OperatorKind::Limit { parent, .. }
            | OperatorKind::Drop { parent, .. } => vec![*parent],
            OperatorKind::Join { left, right, .. } => vec![*left, *right],
            OperatorKind::Union { parents } => parents.clone(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OperatorKind::MemorySource { .. } => "memory_source",
            OperatorKind::MemorySink { .. } => "memory_sink",
            OperatorKind::Map { .. } => "map",
            OperatorKind::Filter { .. } => "filter",
            OperatorKind::Join { .. } => "join",
            OperatorKind::GroupBy { .. } => "group_by",
            OperatorKind::Aggregate { .. } => "aggregate",
            OperatorKind::Limit { .. } => "limit",
            OperatorKind::Union { .. } => "union",
            OperatorKind::Drop { .. } => "drop",
        }
    }
}

/// Scalar expression kinds. Expressions are trees over node ids whose
/// leaves are literals or column references.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// Reference to a column of a parent operator's schema. `parent` is the
    /// operator the reference was created against, when known.
    Column { name: String, parent: Option<NodeId> },
    /// Scalar function call. Binary/unary operators lower to calls with a
    /// fixed [`Opcode`]; registered UDFs call by name with no opcode.
    Func {
        name: String,
        opcode: Option<Opcode>,
        args: Vec<NodeId>,
    },
    /// Literal scalar.
    Literal(Literal),
}

impl ExpressionKind {
    /// Statically known value type, when the expression is a literal.
    pub fn static_data_type(&self) -> Option<DataType> {
        match self {
            ExpressionKind::Literal(lit) => Some(lit.data_type()),
            ExpressionKind::Column { .. } | ExpressionKind::Func { .. } => None,
        }
    }
}

/// An IR node: operator or expression, with its arena id and the source
/// span it was produced from.
#[derive(Debug, Clone, PartialEq)]
pub struct IrNode {
    pub id: NodeId,
    pub span: Span,
    pub kind: IrNodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrNodeKind {
    Operator(OperatorKind),
    Expression(ExpressionKind),
}

impl IrNode {
    pub fn is_operator(&self) -> bool {
        matches!(self.kind, IrNodeKind::Operator(_))
    }

    pub fn is_expression(&self) -> bool {
        matches!(self.kind, IrNodeKind::Expression(_))
    }

    pub fn as_operator(&self) -> Option<&OperatorKind> {
        match &self.kind {
            IrNodeKind::Operator(op) => Some(op),
            IrNodeKind::Expression(_) => None,
        }
    }

    pub fn as_expression(&self) -> Option<&ExpressionKind> {
        match &self.kind {
            IrNodeKind::Expression(expr) => Some(expr),
            IrNodeKind::Operator(_) => None,
        }
    }

    /// Printable kind name used in diagnostics.
    pub fn type_string(&self) -> String {
        match &self.kind {
            IrNodeKind::Operator(op) => format!("{} operator", op.name()),
            IrNodeKind::Expression(ExpressionKind::Column { .. }) => "column".to_string(),
            IrNodeKind::Expression(ExpressionKind::Func { .. }) => "function call".to_string(),
            IrNodeKind::Expression(ExpressionKind::Literal(lit)) => {
                lit.data_type().name().to_string()
            }
        }
    }

    /// Every node id this node references: operator parents, expression
    /// children, predicate/key/assignment expressions.
    pub fn references(&self) -> Vec<NodeId> {
        match &self.kind {
            IrNodeKind::Operator(op) => {
                let mut refs = op.parents();
                match op {
                    OperatorKind::Map { assignments, .. } => {
                        refs.extend(assignments.iter().map(|a| a.expr));
                    }
                    OperatorKind::Filter { predicate, .. } => refs.push(*predicate),
                    OperatorKind::GroupBy { keys, .. } => refs.extend(keys.iter().copied()),
                    OperatorKind::Aggregate { aggregates, .. } => {
                        refs.extend(aggregates.iter().map(|a| a.column));
                    }
                    _ => {}
                }
                refs
            }
            IrNodeKind::Expression(ExpressionKind::Func { args, .. }) => args.clone(),
            IrNodeKind::Expression(_) => Vec::new(),
        }
    }
}
