//! Scan plan construction.
//!
//! Filters are split into conjuncts, normalized, and folded into one
//! [`ranges::ColumnConstraint`] per column. Each access path (the record
//! range, narrowed on the integer handle when the primary key is the handle,
//! or a secondary index) is scored by how long a key prefix it can pin; the
//! longest wins. Terms the chosen path does not consume exactly stay behind
//! as residual filters to be re-checked after the scan, so the emitted ranges
//! only ever over-approximate.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::catalog::Catalog;
use crate::config::ScanPlannerConfig;
use crate::error::{Result, RouteError};
use crate::expression::{
    collect_conjuncts, normalize_term, ComparisonExpression, ComparisonKind, Expression,
    NormalizedPredicate, NormalizedTerm,
};
use crate::key::{index_prefix, record_prefix, record_range, KeyRange};
use crate::metadata::{IndexInfo, TableMetadata};
use crate::types::codec::encode_i64_ordered;
use crate::types::{TypeFamily, TypedLiteral, Value};

mod ranges;

use ranges::{bounded_range, point_prefixes, ColumnConstraint};

/// How the plan reads the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessPath {
    /// Every row key of the table.
    TableScan,
    /// Row keys narrowed on the integer handle.
    HandleRange,
    Index {
        index_id: i64,
        index_name: String,
        /// Leading index columns pinned by equality points.
        point_columns: usize,
        /// Whether the column after the points is narrowed by bounds.
        range_column: bool,
        covering: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlan {
    pub table_id: i64,
    /// Row-key or index path the ranges are expressed in.
    pub access: AccessPath,
    /// Sorted by start key, pairwise disjoint.
    pub key_ranges: Vec<KeyRange>,
    /// Filters the ranges do not enforce exactly.
    pub residual: Vec<Expression>,
    /// Index entries must be joined back to their rows.
    pub double_read: bool,
}

impl ScanPlan {
    /// Single range over every row of `table`.
    pub fn full_table(table: &TableMetadata) -> Self {
        Self {
            table_id: table.id,
            access: AccessPath::TableScan,
            key_ranges: vec![record_range(table.id)],
            residual: Vec::new(),
            double_read: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanPlanBuilder {
    config: ScanPlannerConfig,
}

/// One usable way to read the table, before ranges are materialized.
#[derive(Debug, Clone)]
struct Candidate<'a> {
    index: Option<&'a IndexInfo>,
    point_columns: Vec<usize>,
    range_column: Option<usize>,
    covering: bool,
}

impl Candidate<'_> {
    fn id(&self) -> i64 {
        self.index.map(|index| index.id).unwrap_or(0)
    }

    fn rank(&self, prefer_covering: bool) -> (usize, bool, bool, Reverse<i64>) {
        (
            self.point_columns.len(),
            self.range_column.is_some(),
            prefer_covering && self.covering,
            Reverse(self.id()),
        )
    }
}

impl ScanPlanBuilder {
    pub fn new(config: ScanPlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanPlannerConfig {
        &self.config
    }

    /// Plans a scan of `table` for `filters` (implicitly AND-ed).
    pub fn build_scan(
        &self,
        filters: &[Expression],
        output_columns: &[String],
        table: &TableMetadata,
    ) -> Result<ScanPlan> {
        let mut conjuncts = Vec::new();
        for filter in filters {
            collect_conjuncts(filter, &mut conjuncts);
        }
        let mut terms = Vec::with_capacity(conjuncts.len());
        for conjunct in conjuncts {
            terms.push(((*conjunct).clone(), normalize_term(conjunct)?));
        }
        self.plan(terms, output_columns, table)
    }

    /// Plans a scan from already normalized predicates.
    pub fn build_scan_from_predicates(
        &self,
        predicates: &[NormalizedPredicate],
        output_columns: &[String],
        table: &TableMetadata,
    ) -> Result<ScanPlan> {
        let terms = predicates
            .iter()
            .map(|predicate| {
                let source = Expression::Comparison(ComparisonExpression::new(
                    predicate.kind,
                    Expression::Column(predicate.column.clone()),
                    Expression::Constant(predicate.literal.clone()),
                ));
                (source, NormalizedTerm::Predicate(predicate.clone()))
            })
            .collect();
        self.plan(terms, output_columns, table)
    }

    /// Resolves `database.table` first; `filters` builds the filter list
    /// against the resolved metadata.
    pub fn build_scan_for<F>(
        &self,
        catalog: &dyn Catalog,
        database: &str,
        table: &str,
        output_columns: &[String],
        filters: F,
    ) -> Result<ScanPlan>
    where
        F: FnOnce(&TableMetadata) -> Result<Vec<Expression>>,
    {
        let metadata = catalog
            .resolve_table(database, table)?
            .ok_or_else(|| RouteError::TableNotFound {
                database: database.to_string(),
                table: table.to_string(),
            })?;
        let filters = filters(&metadata)?;
        self.build_scan(&filters, output_columns, &metadata)
    }

    fn plan(
        &self,
        terms: Vec<(Expression, NormalizedTerm)>,
        output_columns: &[String],
        table: &TableMetadata,
    ) -> Result<ScanPlan> {
        for name in output_columns {
            table.require_column(name)?;
        }

        let constraints = collect_constraints(&terms, table)?;
        let candidates = self.enumerate_candidates(table, &constraints, output_columns)?;
        let prefer_covering = self.config.prefer_covering_index;
        let best = candidates
            .into_iter()
            .max_by_key(|candidate| candidate.rank(prefer_covering));

        let (access, key_ranges, consumed, double_read) = match best {
            None => (
                AccessPath::TableScan,
                vec![record_range(table.id)],
                BTreeSet::new(),
                false,
            ),
            Some(candidate) => {
                let key_ranges = materialize_ranges(table, &candidate, &constraints)?;
                let consumed = consumed_terms(&candidate, &constraints);
                let access = match candidate.index {
                    None => AccessPath::HandleRange,
                    Some(index) => AccessPath::Index {
                        index_id: index.id,
                        index_name: index.name.clone(),
                        point_columns: candidate.point_columns.len(),
                        range_column: candidate.range_column.is_some(),
                        covering: candidate.covering,
                    },
                };
                let double_read = candidate.index.is_some() && !candidate.covering;
                (access, key_ranges, consumed, double_read)
            }
        };

        let residual: Vec<Expression> = terms
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| !consumed.contains(idx))
            .map(|(_, (source, _))| source)
            .collect();

        debug!(
            table_name = %table.name,
            table_id = table.id,
            access = ?access,
            ranges = key_ranges.len(),
            residual = residual.len(),
            "built scan plan"
        );

        Ok(ScanPlan {
            table_id: table.id,
            access,
            key_ranges,
            residual,
            double_read,
        })
    }

    fn enumerate_candidates<'a>(
        &self,
        table: &'a TableMetadata,
        constraints: &BTreeMap<usize, ColumnConstraint>,
        output_columns: &[String],
    ) -> Result<Vec<Candidate<'a>>> {
        let mut out = Vec::new();

        if let Some(handle) = table.handle_column() {
            if !handle.data_type.unsigned {
                if let Some(constraint) = constraints.get(&handle.offset) {
                    if constraint.has_points() && constraint.points.len() <= self.config.max_point_ranges {
                        out.push(Candidate {
                            index: None,
                            point_columns: vec![handle.offset],
                            range_column: None,
                            covering: true,
                        });
                    } else if constraint.has_bounds() {
                        out.push(Candidate {
                            index: None,
                            point_columns: Vec::new(),
                            range_column: Some(handle.offset),
                            covering: true,
                        });
                    }
                }
            }
        }

        for index in &table.indexes {
            let mut point_columns = Vec::new();
            let mut range_column = None;
            let mut fan_out = 1usize;
            for name in &index.columns {
                let ordinal = table.require_column(name)?.offset;
                let Some(constraint) = constraints.get(&ordinal) else {
                    break;
                };
                if constraint.has_points() {
                    let next = fan_out.saturating_mul(constraint.points.len());
                    if next > self.config.max_point_ranges {
                        debug!(
                            table_name = %table.name,
                            index_name = %index.name,
                            column = %name,
                            fan_out = next,
                            "point fan-out cap reached; index prefix stops here"
                        );
                        break;
                    }
                    fan_out = next;
                    point_columns.push(ordinal);
                    continue;
                }
                if constraint.has_bounds() {
                    range_column = Some(ordinal);
                }
                break;
            }
            if point_columns.is_empty() && range_column.is_none() {
                continue;
            }
            out.push(Candidate {
                index: Some(index),
                point_columns,
                range_column,
                covering: table.is_covering(index, output_columns),
            });
        }
        Ok(out)
    }
}

/// Folds normalized terms into per-column constraints keyed by ordinal.
fn collect_constraints(
    terms: &[(Expression, NormalizedTerm)],
    table: &TableMetadata,
) -> Result<BTreeMap<usize, ColumnConstraint>> {
    let mut by_column = BTreeMap::<usize, ColumnConstraint>::new();
    for (idx, (source, term)) in terms.iter().enumerate() {
        match term {
            NormalizedTerm::Predicate(predicate) => {
                if predicate.kind == ComparisonKind::NotEqual {
                    continue;
                }
                let Some(literal) = cast_for_column(source, &predicate.literal, &predicate.column, table)? else {
                    continue;
                };
                let constraint = by_column.entry(predicate.column.ordinal()).or_default();
                match predicate.kind {
                    ComparisonKind::Equal => constraint.add_points(idx, vec![literal]),
                    ComparisonKind::LessThan => constraint.add_upper_bound(idx, literal, false),
                    ComparisonKind::LessEqual => constraint.add_upper_bound(idx, literal, true),
                    ComparisonKind::GreaterThan => constraint.add_lower_bound(idx, literal, false),
                    ComparisonKind::GreaterEqual => constraint.add_lower_bound(idx, literal, true),
                    ComparisonKind::NotEqual => {}
                }
            }
            NormalizedTerm::PointSet { column, points } => {
                let mut cast = Vec::with_capacity(points.len());
                for point in points {
                    match cast_for_column(source, point, column, table)? {
                        Some(literal) => cast.push(literal),
                        None => break,
                    }
                }
                if cast.len() == points.len() {
                    by_column.entry(column.ordinal()).or_default().add_points(idx, cast);
                }
            }
            NormalizedTerm::Unusable => {}
        }
    }
    Ok(by_column)
}

/// Re-types a literal for its column. `None` leaves the term residual: NULL
/// literals never match a comparison and mismatched values cannot be encoded
/// under the column's type. Unsupported column types fail the plan.
fn cast_for_column(
    source: &Expression,
    literal: &TypedLiteral,
    column: &crate::expression::ColumnRef,
    table: &TableMetadata,
) -> Result<Option<TypedLiteral>> {
    if literal.value().is_null() {
        return Ok(None);
    }
    let mut data_type = *column.data_type();
    // Bounds must stay encodable even on NOT NULL columns.
    data_type.nullable = true;
    match literal.cast(&data_type) {
        Ok(cast) => Ok(Some(cast)),
        Err(err @ (RouteError::TypeMismatch { .. } | RouteError::NullViolation { .. })) => {
            debug!(
                table_name = %table.name,
                column = %column.name(),
                filter = %source,
                error = %err,
                "literal does not fit column type; keeping filter residual"
            );
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn materialize_ranges(
    table: &TableMetadata,
    candidate: &Candidate<'_>,
    constraints: &BTreeMap<usize, ColumnConstraint>,
) -> Result<Vec<KeyRange>> {
    let is_handle = candidate.index.is_none();
    let base = match candidate.index {
        Some(index) => index_prefix(table.id, index.id),
        None => record_prefix(table.id),
    };

    let mut point_keys = Vec::with_capacity(candidate.point_columns.len());
    for ordinal in &candidate.point_columns {
        let constraint = required(constraints, *ordinal)?;
        let keys = constraint
            .points
            .iter()
            .map(|point| component_key(point, is_handle))
            .collect::<Result<Vec<_>>>()?;
        point_keys.push(keys);
    }

    let bounds = match candidate.range_column {
        Some(ordinal) => {
            let constraint = required(constraints, ordinal)?;
            let lower = constraint
                .lower
                .as_ref()
                .map(|bound| component_key(&bound.literal, is_handle).map(|key| (key, bound.inclusive)))
                .transpose()?;
            let upper = constraint
                .upper
                .as_ref()
                .map(|bound| component_key(&bound.literal, is_handle).map(|key| (key, bound.inclusive)))
                .transpose()?;
            Some((lower, upper))
        }
        None => None,
    };

    let mut out = Vec::new();
    for prefix in point_prefixes(&base, &point_keys) {
        let range = match &bounds {
            Some((lower, upper)) => bounded_range(
                &prefix,
                lower.as_ref().map(|(key, inclusive)| (key.as_slice(), *inclusive)),
                upper.as_ref().map(|(key, inclusive)| (key.as_slice(), *inclusive)),
                !is_handle,
            ),
            None => bounded_range(&prefix, None, None, false),
        };
        if let Some(range) = range {
            out.push(range);
        }
    }

    out.sort_by(|a, b| a.start().cmp(b.start()));
    for pair in out.windows(2) {
        if !pair[0].precedes(&pair[1]) {
            return Err(RouteError::invariant(format!(
                "scan ranges {} and {} overlap",
                pair[0], pair[1]
            )));
        }
    }
    Ok(out)
}

fn required(
    constraints: &BTreeMap<usize, ColumnConstraint>,
    ordinal: usize,
) -> Result<&ColumnConstraint> {
    constraints
        .get(&ordinal)
        .ok_or_else(|| RouteError::invariant(format!("no constraint for column #{ordinal}")))
}

/// Key bytes of one column component: the flagged datum inside index keys,
/// the bare ordered integer inside row keys.
fn component_key(literal: &TypedLiteral, is_handle: bool) -> Result<Vec<u8>> {
    if !is_handle {
        return Ok(literal.key().to_vec());
    }
    match literal.value() {
        Value::Int(handle) if literal.data_type().family() == TypeFamily::Integer => {
            Ok(encode_i64_ordered(*handle).to_vec())
        }
        other => Err(RouteError::invariant(format!(
            "handle bound {other} is not a signed integer"
        ))),
    }
}

fn consumed_terms(
    candidate: &Candidate<'_>,
    constraints: &BTreeMap<usize, ColumnConstraint>,
) -> BTreeSet<usize> {
    let mut consumed = BTreeSet::new();
    for ordinal in &candidate.point_columns {
        if let Some(constraint) = constraints.get(ordinal) {
            if constraint.points_are_exact() {
                consumed.extend(constraint.point_terms.iter().copied());
            }
        }
    }
    if let Some(ordinal) = candidate.range_column {
        if let Some(constraint) = constraints.get(&ordinal) {
            consumed.extend(constraint.range_terms.iter().copied());
        }
    }
    consumed
}
