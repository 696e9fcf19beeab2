//! Filter expression trees built against resolved table metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metadata::TableMetadata;
use crate::types::{DataType, TypedLiteral, Value};

mod normalize;

pub use normalize::{collect_conjuncts, collect_disjuncts, fold_constant, normalize_term, NormalizedTerm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl ComparisonKind {
    pub const ALL: [ComparisonKind; 6] = [
        ComparisonKind::Equal,
        ComparisonKind::NotEqual,
        ComparisonKind::LessThan,
        ComparisonKind::LessEqual,
        ComparisonKind::GreaterThan,
        ComparisonKind::GreaterEqual,
    ];

    /// Kind that keeps the comparison true when its operands are swapped.
    pub fn flip(self) -> Self {
        match self {
            ComparisonKind::Equal => ComparisonKind::Equal,
            ComparisonKind::NotEqual => ComparisonKind::NotEqual,
            ComparisonKind::LessThan => ComparisonKind::GreaterThan,
            ComparisonKind::LessEqual => ComparisonKind::GreaterEqual,
            ComparisonKind::GreaterThan => ComparisonKind::LessThan,
            ComparisonKind::GreaterEqual => ComparisonKind::LessEqual,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonKind::Equal => "=",
            ComparisonKind::NotEqual => "!=",
            ComparisonKind::LessThan => "<",
            ComparisonKind::LessEqual => "<=",
            ComparisonKind::GreaterThan => ">",
            ComparisonKind::GreaterEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOp {
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Plus => "+",
            ArithmeticOp::Minus => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
}

/// A column resolved against table metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    name: String,
    data_type: DataType,
    ordinal: usize,
}

impl ColumnRef {
    /// Resolves `name` in `table`; unknown names fail here rather than at
    /// evaluation time.
    pub fn create(name: &str, table: &TableMetadata) -> Result<Self> {
        let column = table.require_column(name)?;
        Ok(Self {
            name: column.name.clone(),
            data_type: column.data_type,
            ordinal: column.offset,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Column(ColumnRef),
    Constant(TypedLiteral),
    Arithmetic(ArithmeticExpression),
    Comparison(ComparisonExpression),
    Logical(LogicalExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticExpression {
    pub op: ArithmeticOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

/// Binary comparison; immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonExpression {
    kind: ComparisonKind,
    left: Box<Expression>,
    right: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    pub op: LogicalOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

/// `column kind literal`, with the kind already flipped when the source
/// expression had the literal on the left.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPredicate {
    pub column: ColumnRef,
    pub kind: ComparisonKind,
    /// Folded literal in its own type; the scan builder casts it per column.
    pub literal: TypedLiteral,
}

impl ComparisonExpression {
    pub fn new(kind: ComparisonKind, left: Expression, right: Expression) -> Self {
        Self {
            kind,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn kind(&self) -> ComparisonKind {
        self.kind
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }
}

impl Expression {
    pub fn column(name: &str, table: &TableMetadata) -> Result<Self> {
        Ok(Expression::Column(ColumnRef::create(name, table)?))
    }

    pub fn constant(data_type: DataType, value: impl Into<Value>) -> Result<Self> {
        Ok(Expression::Constant(TypedLiteral::new(data_type, value)?))
    }

    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            Expression::Column(column) => Some(column),
            _ => None,
        }
    }

    /// Every column referenced anywhere in the tree, in visit order.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        let mut out = Vec::new();
        self.visit_columns(&mut out);
        out
    }

    fn visit_columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            Expression::Column(column) => out.push(column),
            Expression::Constant(_) => {}
            Expression::Arithmetic(node) => {
                node.left.visit_columns(out);
                node.right.visit_columns(out);
            }
            Expression::Comparison(node) => {
                node.left.visit_columns(out);
                node.right.visit_columns(out);
            }
            Expression::Logical(node) => {
                node.left.visit_columns(out);
                node.right.visit_columns(out);
            }
        }
    }
}

fn comparison(kind: ComparisonKind, left: Expression, right: Expression) -> Expression {
    Expression::Comparison(ComparisonExpression::new(kind, left, right))
}

pub fn equal(left: Expression, right: Expression) -> Expression {
    comparison(ComparisonKind::Equal, left, right)
}

pub fn not_equal(left: Expression, right: Expression) -> Expression {
    comparison(ComparisonKind::NotEqual, left, right)
}

pub fn less_than(left: Expression, right: Expression) -> Expression {
    comparison(ComparisonKind::LessThan, left, right)
}

pub fn less_equal(left: Expression, right: Expression) -> Expression {
    comparison(ComparisonKind::LessEqual, left, right)
}

pub fn greater_than(left: Expression, right: Expression) -> Expression {
    comparison(ComparisonKind::GreaterThan, left, right)
}

pub fn greater_equal(left: Expression, right: Expression) -> Expression {
    comparison(ComparisonKind::GreaterEqual, left, right)
}

fn arithmetic(op: ArithmeticOp, left: Expression, right: Expression) -> Expression {
    Expression::Arithmetic(ArithmeticExpression {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn plus(left: Expression, right: Expression) -> Expression {
    arithmetic(ArithmeticOp::Plus, left, right)
}

pub fn minus(left: Expression, right: Expression) -> Expression {
    arithmetic(ArithmeticOp::Minus, left, right)
}

pub fn multiply(left: Expression, right: Expression) -> Expression {
    arithmetic(ArithmeticOp::Multiply, left, right)
}

pub fn divide(left: Expression, right: Expression) -> Expression {
    arithmetic(ArithmeticOp::Divide, left, right)
}

pub fn and(left: Expression, right: Expression) -> Expression {
    Expression::Logical(LogicalExpression {
        op: LogicalOp::And,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn or(left: Expression, right: Expression) -> Expression {
    Expression::Logical(LogicalExpression {
        op: LogicalOp::Or,
        left: Box::new(left),
        right: Box::new(right),
    })
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Column(column) => f.write_str(column.name()),
            Expression::Constant(literal) => write!(f, "{literal}"),
            Expression::Arithmetic(node) => {
                write!(f, "({} {} {})", node.left, node.op.symbol(), node.right)
            }
            Expression::Comparison(node) => {
                write!(f, "({} {} {})", node.left, node.kind.symbol(), node.right)
            }
            Expression::Logical(node) => {
                let op = match node.op {
                    LogicalOp::And => "AND",
                    LogicalOp::Or => "OR",
                };
                write!(f, "({} {op} {})", node.left, node.right)
            }
        }
    }
}

impl fmt::Display for NormalizedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.column.name(),
            self.kind.symbol(),
            self.literal
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ColumnInfo;

    fn table() -> TableMetadata {
        TableMetadata::new(
            1,
            "t",
            vec![
                ColumnInfo::new("c1", 0, DataType::INT),
                ColumnInfo::new("c2", 1, DataType::VARCHAR),
            ],
        )
    }

    #[test]
    fn flip_is_an_involution() {
        for kind in ComparisonKind::ALL {
            assert_eq!(kind.flip().flip(), kind);
        }
        assert_eq!(ComparisonKind::LessEqual.flip(), ComparisonKind::GreaterEqual);
        assert_eq!(ComparisonKind::NotEqual.flip(), ComparisonKind::NotEqual);
    }

    #[test]
    fn column_ref_resolves_eagerly() {
        let table = table();
        let column = ColumnRef::create("C2", &table).expect("c2");
        assert_eq!(column.name(), "c2");
        assert_eq!(column.ordinal(), 1);
        assert_eq!(*column.data_type(), DataType::VARCHAR);
        assert!(ColumnRef::create("c3", &table).is_err());
    }

    #[test]
    fn display_and_column_listing() {
        let table = table();
        let expr = and(
            equal(
                Expression::column("c1", &table).expect("c1"),
                Expression::constant(DataType::INT, 1i64).expect("1"),
            ),
            less_than(
                Expression::constant(DataType::VARCHAR, "x").expect("x"),
                Expression::column("c2", &table).expect("c2"),
            ),
        );
        assert_eq!(expr.to_string(), "((c1 = 1) AND ('x' < c2))");
        let names: Vec<_> = expr.columns().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["c1", "c2"]);
    }
}
