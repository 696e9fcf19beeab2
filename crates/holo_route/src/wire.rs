//! Expression trees in the shape storage nodes evaluate for residual
//! filtering.
//!
//! Column nodes carry the column ordinal as an 8-byte sign-flipped integer;
//! constant nodes carry the flagless wire payload of the literal and its
//! type's wire tag; operators become scalar-function nodes.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};
use crate::expression::{
    ArithmeticOp, ColumnRef, ComparisonKind, Expression, LogicalOp, NormalizedPredicate,
};
use crate::types::codec::encode_i64_ordered;
use crate::types::{ExprType, TypedLiteral};

/// Scalar function signature of a function node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireFunc {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
    And,
    Or,
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl From<ComparisonKind> for WireFunc {
    fn from(kind: ComparisonKind) -> Self {
        match kind {
            ComparisonKind::Equal => WireFunc::Eq,
            ComparisonKind::NotEqual => WireFunc::Ne,
            ComparisonKind::LessThan => WireFunc::Lt,
            ComparisonKind::LessEqual => WireFunc::Le,
            ComparisonKind::GreaterThan => WireFunc::Gt,
            ComparisonKind::GreaterEqual => WireFunc::Ge,
        }
    }
}

impl From<ArithmeticOp> for WireFunc {
    fn from(op: ArithmeticOp) -> Self {
        match op {
            ArithmeticOp::Plus => WireFunc::Plus,
            ArithmeticOp::Minus => WireFunc::Minus,
            ArithmeticOp::Multiply => WireFunc::Multiply,
            ArithmeticOp::Divide => WireFunc::Divide,
        }
    }
}

impl From<LogicalOp> for WireFunc {
    fn from(op: LogicalOp) -> Self {
        match op {
            LogicalOp::And => WireFunc::And,
            LogicalOp::Or => WireFunc::Or,
        }
    }
}

/// One node of a filter expression as shipped to a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireExpr {
    /// Node tag: a constant's type, `ColumnRef` or `ScalarFunc`.
    pub tp: ExprType,
    /// Constant payload or encoded column ordinal; empty for functions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub val: Vec<u8>,
    /// Function signature, set only on `ScalarFunc` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<WireFunc>,
    /// Function arguments in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<WireExpr>,
}

impl WireExpr {
    pub fn column(column: &ColumnRef) -> Result<Self> {
        column.data_type().ensure_supported()?;
        let ordinal = i64::try_from(column.ordinal()).map_err(|_| {
            RouteError::invariant(format!(
                "column ordinal {} does not fit the wire encoding",
                column.ordinal()
            ))
        })?;
        Ok(Self {
            tp: ExprType::ColumnRef,
            val: encode_i64_ordered(ordinal).to_vec(),
            sig: None,
            children: Vec::new(),
        })
    }

    pub fn constant(literal: &TypedLiteral) -> Result<Self> {
        let data_type = literal.data_type();
        let val = data_type.encode_for_wire(literal.value())?;
        let tp = if literal.value().is_null() {
            ExprType::Null
        } else {
            data_type.wire_type()
        };
        Ok(Self {
            tp,
            val,
            sig: None,
            children: Vec::new(),
        })
    }

    pub fn function(sig: WireFunc, children: Vec<WireExpr>) -> Self {
        Self {
            tp: ExprType::ScalarFunc,
            val: Vec::new(),
            sig: Some(sig),
            children,
        }
    }

    pub fn from_expression(expr: &Expression) -> Result<Self> {
        match expr {
            Expression::Column(column) => Self::column(column),
            Expression::Constant(literal) => Self::constant(literal),
            Expression::Arithmetic(arith) => Ok(Self::function(
                arith.op.into(),
                vec![
                    Self::from_expression(&arith.left)?,
                    Self::from_expression(&arith.right)?,
                ],
            )),
            Expression::Comparison(cmp) => Ok(Self::function(
                cmp.kind().into(),
                vec![
                    Self::from_expression(cmp.left())?,
                    Self::from_expression(cmp.right())?,
                ],
            )),
            Expression::Logical(logical) => Ok(Self::function(
                logical.op.into(),
                vec![
                    Self::from_expression(&logical.left)?,
                    Self::from_expression(&logical.right)?,
                ],
            )),
        }
    }

    /// Column on the left, literal on the right.
    pub fn from_predicate(predicate: &NormalizedPredicate) -> Result<Self> {
        Ok(Self::function(
            predicate.kind.into(),
            vec![
                Self::column(&predicate.column)?,
                Self::constant(&predicate.literal)?,
            ],
        ))
    }

    /// Conjunction of `filters`, or `None` when there is nothing to push.
    pub fn conjunction(filters: &[Expression]) -> Result<Option<Self>> {
        let mut encoded = filters.iter().map(Self::from_expression);
        let Some(first) = encoded.next().transpose()? else {
            return Ok(None);
        };
        encoded
            .try_fold(first, |acc, next| {
                Ok(Self::function(WireFunc::And, vec![acc, next?]))
            })
            .map(Some)
    }
}
