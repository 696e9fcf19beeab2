//! Per-column constraint accumulation and key-range construction.

use crate::key::{prefix_next, KeyRange};
use crate::types::codec::NIL_FLAG;
use crate::types::TypedLiteral;

#[derive(Debug, Clone)]
pub(crate) struct Bound {
    pub literal: TypedLiteral,
    pub inclusive: bool,
}

/// Everything the filter says about one column. Literals are already cast to
/// the column's type, so their key bytes order like the column values.
#[derive(Debug, Clone, Default)]
pub(crate) struct ColumnConstraint {
    /// Sorted by key bytes, deduplicated.
    pub points: Vec<TypedLiteral>,
    pub point_terms: Vec<usize>,
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
    pub range_terms: Vec<usize>,
}

impl ColumnConstraint {
    pub fn add_points(&mut self, term: usize, points: Vec<TypedLiteral>) {
        self.point_terms.push(term);
        self.points.extend(points);
        self.points.sort_by(|a, b| a.key().cmp(b.key()));
        self.points.dedup_by(|a, b| a.key() == b.key());
    }

    pub fn add_lower_bound(&mut self, term: usize, literal: TypedLiteral, inclusive: bool) {
        self.range_terms.push(term);
        self.lower = match self.lower.take() {
            None => Some(Bound { literal, inclusive }),
            Some(existing) => {
                if existing.literal.key() < literal.key()
                    || (existing.literal.key() == literal.key() && !inclusive && existing.inclusive)
                {
                    Some(Bound { literal, inclusive })
                } else {
                    Some(existing)
                }
            }
        };
    }

    pub fn add_upper_bound(&mut self, term: usize, literal: TypedLiteral, inclusive: bool) {
        self.range_terms.push(term);
        self.upper = match self.upper.take() {
            None => Some(Bound { literal, inclusive }),
            Some(existing) => {
                if existing.literal.key() > literal.key()
                    || (existing.literal.key() == literal.key() && !inclusive && existing.inclusive)
                {
                    Some(Bound { literal, inclusive })
                } else {
                    Some(existing)
                }
            }
        };
    }

    pub fn has_points(&self) -> bool {
        !self.points.is_empty()
    }

    pub fn has_bounds(&self) -> bool {
        self.lower.is_some() || self.upper.is_some()
    }

    /// A single point-producing term matches exactly the emitted points;
    /// several AND-ed ones are only over-approximated by their union.
    pub fn points_are_exact(&self) -> bool {
        self.point_terms.len() == 1
    }
}

/// Concatenates one encoded point per column, in column order, for every
/// combination. Output stays sorted when each input list is sorted.
pub(crate) fn point_prefixes(base: &[u8], columns: &[Vec<Vec<u8>>]) -> Vec<Vec<u8>> {
    let mut out = vec![base.to_vec()];
    for points in columns {
        let mut next = Vec::with_capacity(out.len() * points.len());
        for prefix in &out {
            for point in points {
                let mut key = prefix.clone();
                key.extend_from_slice(point);
                next.push(key);
            }
        }
        out = next;
    }
    out
}

/// Builds the range of keys under `base` whose next component lies between
/// the bounds. `skip_nulls` starts an open lower bound after the NULL
/// encoding. Returns `None` for an empty range.
pub(crate) fn bounded_range(
    base: &[u8],
    lower: Option<(&[u8], bool)>,
    upper: Option<(&[u8], bool)>,
    skip_nulls: bool,
) -> Option<KeyRange> {
    let start = match lower {
        None if skip_nulls => {
            let mut start = base.to_vec();
            start.push(NIL_FLAG + 1);
            start
        }
        None => base.to_vec(),
        Some((key, true)) => concat(base, key),
        Some((key, false)) => prefix_next(&concat(base, key))?,
    };
    let end = match upper {
        None => prefix_next(base).unwrap_or_default(),
        Some((key, true)) => prefix_next(&concat(base, key)).unwrap_or_default(),
        Some((key, false)) => concat(base, key),
    };
    if !end.is_empty() && start >= end {
        return None;
    }
    KeyRange::new(start, end).ok()
}

fn concat(base: &[u8], tail: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(base.len() + tail.len());
    out.extend_from_slice(base);
    out.extend_from_slice(tail);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn lit(v: i64) -> TypedLiteral {
        TypedLiteral::new(DataType::INT, v).expect("literal")
    }

    #[test]
    fn bounds_tighten_and_prefer_exclusive_on_ties() {
        let mut constraint = ColumnConstraint::default();
        constraint.add_lower_bound(0, lit(1), true);
        constraint.add_lower_bound(1, lit(5), true);
        constraint.add_lower_bound(2, lit(5), false);
        constraint.add_lower_bound(3, lit(2), false);
        let lower = constraint.lower.as_ref().expect("lower");
        assert_eq!(lower.literal, lit(5));
        assert!(!lower.inclusive);

        constraint.add_upper_bound(4, lit(10), false);
        constraint.add_upper_bound(5, lit(9), true);
        let upper = constraint.upper.as_ref().expect("upper");
        assert_eq!(upper.literal, lit(9));
        assert!(upper.inclusive);
        assert_eq!(constraint.range_terms, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn points_are_sorted_and_deduplicated() {
        let mut constraint = ColumnConstraint::default();
        constraint.add_points(0, vec![lit(3), lit(-1)]);
        constraint.add_points(1, vec![lit(3)]);
        assert_eq!(constraint.points, vec![lit(-1), lit(3)]);
        assert!(!constraint.points_are_exact());
    }

    #[test]
    fn point_prefixes_form_sorted_cartesian_product() {
        let prefixes = point_prefixes(b"p", &[vec![b"a".to_vec(), b"b".to_vec()], vec![b"x".to_vec(), b"y".to_vec()]]);
        assert_eq!(
            prefixes,
            vec![b"pax".to_vec(), b"pay".to_vec(), b"pbx".to_vec(), b"pby".to_vec()]
        );
    }

    #[test]
    fn bounded_range_handles_inclusivity_and_contradictions() {
        let range = bounded_range(b"p", Some((b"b", true)), Some((b"d", false)), false)
            .expect("range");
        assert_eq!(range.start(), b"pb");
        assert_eq!(range.end(), b"pd");

        let range = bounded_range(b"p", Some((b"b", false)), Some((b"d", true)), false)
            .expect("range");
        assert_eq!(range.start(), b"pc");
        assert_eq!(range.end(), b"pe");

        let range = bounded_range(b"p", None, Some((b"d", false)), true).expect("range");
        assert_eq!(range.start(), &[b'p', NIL_FLAG + 1]);

        assert!(bounded_range(b"p", Some((b"d", true)), Some((b"b", true)), false).is_none());
        assert!(bounded_range(b"p", Some((b"b", true)), Some((b"b", false)), false).is_none());
    }
}
