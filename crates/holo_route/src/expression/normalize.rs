use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::expression::{
    ArithmeticOp, ColumnRef, ComparisonExpression, ComparisonKind, Expression, LogicalOp,
    NormalizedPredicate,
};
use crate::types::{DataType, TypedLiteral, Value};

/// How one conjunct of a filter can take part in range narrowing.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedTerm {
    Predicate(NormalizedPredicate),
    /// OR of equalities against a single column.
    PointSet {
        column: ColumnRef,
        points: Vec<TypedLiteral>,
    },
    /// Must be evaluated after the scan.
    Unusable,
}

impl ComparisonExpression {
    /// Rewrites the comparison as `column kind literal`.
    ///
    /// `Ok(None)` means the shape cannot be normalized: column against
    /// column, literal against literal, or a side that does not fold to a
    /// constant. Errors only come from encoding a folded literal.
    pub fn normalize(&self) -> Result<Option<NormalizedPredicate>> {
        if let Some(column) = self.left().as_column() {
            if let Some(literal) = fold_constant(self.right())? {
                return Ok(Some(NormalizedPredicate {
                    column: column.clone(),
                    kind: self.kind(),
                    literal,
                }));
            }
        }
        if let Some(column) = self.right().as_column() {
            if let Some(literal) = fold_constant(self.left())? {
                return Ok(Some(NormalizedPredicate {
                    column: column.clone(),
                    kind: self.kind().flip(),
                    literal,
                }));
            }
        }
        Ok(None)
    }
}

/// Reduces `expr` to a literal when it is built only from constants and
/// arithmetic over constants. Any column reference stops folding.
pub fn fold_constant(expr: &Expression) -> Result<Option<TypedLiteral>> {
    match expr {
        Expression::Constant(literal) => Ok(Some(literal.clone())),
        Expression::Arithmetic(node) => {
            let Some(left) = fold_constant(node.left.as_ref())? else {
                return Ok(None);
            };
            let Some(right) = fold_constant(node.right.as_ref())? else {
                return Ok(None);
            };
            fold_arithmetic(node.op, &left, &right)
        }
        _ => Ok(None),
    }
}

pub fn collect_conjuncts<'a>(expr: &'a Expression, out: &mut Vec<&'a Expression>) {
    match expr {
        Expression::Logical(node) if node.op == LogicalOp::And => {
            collect_conjuncts(node.left.as_ref(), out);
            collect_conjuncts(node.right.as_ref(), out);
        }
        _ => out.push(expr),
    }
}

pub fn collect_disjuncts<'a>(expr: &'a Expression, out: &mut Vec<&'a Expression>) {
    match expr {
        Expression::Logical(node) if node.op == LogicalOp::Or => {
            collect_disjuncts(node.left.as_ref(), out);
            collect_disjuncts(node.right.as_ref(), out);
        }
        _ => out.push(expr),
    }
}

/// Classifies one conjunct. Callers split AND chains first.
pub fn normalize_term(expr: &Expression) -> Result<NormalizedTerm> {
    match expr {
        Expression::Comparison(comparison) => Ok(comparison
            .normalize()?
            .map(NormalizedTerm::Predicate)
            .unwrap_or(NormalizedTerm::Unusable)),
        Expression::Logical(node) if node.op == LogicalOp::Or => normalize_point_set(expr),
        _ => Ok(NormalizedTerm::Unusable),
    }
}

fn normalize_point_set(expr: &Expression) -> Result<NormalizedTerm> {
    let mut disjuncts = Vec::new();
    collect_disjuncts(expr, &mut disjuncts);

    let mut column: Option<ColumnRef> = None;
    let mut points = Vec::with_capacity(disjuncts.len());
    for disjunct in disjuncts {
        let Expression::Comparison(comparison) = disjunct else {
            return Ok(NormalizedTerm::Unusable);
        };
        let Some(predicate) = comparison.normalize()? else {
            return Ok(NormalizedTerm::Unusable);
        };
        if predicate.kind != ComparisonKind::Equal {
            return Ok(NormalizedTerm::Unusable);
        }
        match &column {
            Some(existing) if existing != &predicate.column => {
                return Ok(NormalizedTerm::Unusable);
            }
            Some(_) => {}
            None => column = Some(predicate.column.clone()),
        }
        points.push(predicate.literal);
    }

    Ok(match column {
        Some(column) => NormalizedTerm::PointSet { column, points },
        None => NormalizedTerm::Unusable,
    })
}

#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i128),
    Float(f64),
    Decimal(Decimal),
}

impl Numeric {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(Numeric::Int(i128::from(*v))),
            Value::UInt(v) => Some(Numeric::Int(i128::from(*v))),
            Value::Float(v) => Some(Numeric::Float(*v)),
            Value::Decimal(v) => Some(Numeric::Decimal(*v)),
            _ => None,
        }
    }

    fn to_f64(self) -> Option<f64> {
        match self {
            Numeric::Int(v) => Some(v as f64),
            Numeric::Float(v) => Some(v),
            Numeric::Decimal(v) => v.to_f64(),
        }
    }

    fn to_decimal(self) -> Option<Decimal> {
        match self {
            Numeric::Int(v) => Decimal::try_from_i128_with_scale(v, 0).ok(),
            Numeric::Float(v) => Decimal::from_f64_retain(v),
            Numeric::Decimal(v) => Some(v),
        }
    }
}

/// Folds two constants. Integer division yields a decimal. Overflow,
/// division by zero and non-numeric operands leave the expression unfolded.
fn fold_arithmetic(
    op: ArithmeticOp,
    left: &TypedLiteral,
    right: &TypedLiteral,
) -> Result<Option<TypedLiteral>> {
    if left.value().is_null() || right.value().is_null() {
        return TypedLiteral::new(DataType::NULL, Value::Null).map(Some);
    }
    let (Some(l), Some(r)) = (Numeric::of(left.value()), Numeric::of(right.value())) else {
        return Ok(None);
    };

    let folded = match (l, r) {
        (Numeric::Float(_), _) | (_, Numeric::Float(_)) => {
            fold_float(op, l.to_f64(), r.to_f64()).map(|v| (DataType::DOUBLE, Value::Float(v)))
        }
        (Numeric::Int(a), Numeric::Int(b)) if op != ArithmeticOp::Divide => {
            fold_int(op, a, b)
        }
        _ => fold_decimal(op, l.to_decimal(), r.to_decimal())
            .map(|v| (DataType::DECIMAL, Value::Decimal(v))),
    };

    match folded {
        Some((data_type, value)) => TypedLiteral::new(data_type, value).map(Some),
        None => Ok(None),
    }
}

fn fold_float(op: ArithmeticOp, left: Option<f64>, right: Option<f64>) -> Option<f64> {
    let (a, b) = (left?, right?);
    let out = match op {
        ArithmeticOp::Plus => a + b,
        ArithmeticOp::Minus => a - b,
        ArithmeticOp::Multiply => a * b,
        ArithmeticOp::Divide if b == 0.0 => return None,
        ArithmeticOp::Divide => a / b,
    };
    out.is_finite().then_some(out)
}

fn fold_int(op: ArithmeticOp, a: i128, b: i128) -> Option<(DataType, Value)> {
    let out = match op {
        ArithmeticOp::Plus => a.checked_add(b)?,
        ArithmeticOp::Minus => a.checked_sub(b)?,
        ArithmeticOp::Multiply => a.checked_mul(b)?,
        ArithmeticOp::Divide => return None,
    };
    if let Ok(v) = i64::try_from(out) {
        return Some((DataType::BIGINT, Value::Int(v)));
    }
    u64::try_from(out)
        .ok()
        .map(|v| (DataType::BIGINT_UNSIGNED, Value::UInt(v)))
}

fn fold_decimal(op: ArithmeticOp, left: Option<Decimal>, right: Option<Decimal>) -> Option<Decimal> {
    let (a, b) = (left?, right?);
    match op {
        ArithmeticOp::Plus => a.checked_add(b),
        ArithmeticOp::Minus => a.checked_sub(b),
        ArithmeticOp::Multiply => a.checked_mul(b),
        ArithmeticOp::Divide => a.checked_div(b),
    }
}
