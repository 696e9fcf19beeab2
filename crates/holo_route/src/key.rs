//! Key-space layout and half-open key ranges.
//!
//! Row keys are `t{table_id}_r{handle}` and index keys are
//! `t{table_id}_i{index_id}{encoded column values}`, where ids and handles use
//! the sign-flipped big-endian integer encoding.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};
use crate::types::codec::encode_i64_ordered;
use crate::types::TypedLiteral;

const TABLE_PREFIX: u8 = b't';
const RECORD_SEPARATOR: &[u8; 2] = b"_r";
const INDEX_SEPARATOR: &[u8; 2] = b"_i";
const ID_LEN: usize = 8;
const TABLE_PREFIX_LEN: usize = 1 + ID_LEN;

/// Half-open `[start, end)` interval over encoded keys. An empty `end` is
/// unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    start: Vec<u8>,
    end: Vec<u8>,
}

impl KeyRange {
    /// Fails when a bounded `end` sorts before `start`. `start == end` is a
    /// valid empty range.
    pub fn new(start: impl Into<Vec<u8>>, end: impl Into<Vec<u8>>) -> Result<Self> {
        let start = start.into();
        let end = end.into();
        if !end.is_empty() && start > end {
            return Err(RouteError::invariant(format!(
                "key range start {} sorts after end {}",
                hex::encode(&start),
                hex::encode(&end)
            )));
        }
        Ok(Self { start, end })
    }

    /// The whole key space.
    pub fn full() -> Self {
        Self {
            start: Vec::new(),
            end: Vec::new(),
        }
    }

    /// All keys that start with `prefix`.
    pub fn prefix(prefix: &[u8]) -> Self {
        Self {
            start: prefix.to_vec(),
            end: prefix_next(prefix).unwrap_or_default(),
        }
    }

    /// Inclusive lower bound.
    pub fn start(&self) -> &[u8] {
        &self.start
    }

    /// Exclusive upper bound; empty when unbounded.
    pub fn end(&self) -> &[u8] {
        &self.end
    }

    /// True when the range runs to the end of the key space.
    pub fn is_unbounded(&self) -> bool {
        self.end.is_empty()
    }

    /// True when no key can fall inside the range.
    pub fn is_empty(&self) -> bool {
        !self.end.is_empty() && self.start >= self.end
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key_in_range(key, &self.start, &self.end)
    }

    /// Returns the overlap of both ranges, or `None` if they share no key.
    pub fn intersect(&self, other: &KeyRange) -> Option<KeyRange> {
        let start = if self.start >= other.start {
            self.start.clone()
        } else {
            other.start.clone()
        };
        let end = min_end_bound(&self.end, &other.end);
        let clipped = KeyRange { start, end };
        if clipped.is_empty() {
            return None;
        }
        Some(clipped)
    }

    /// True when every key of `self` sorts before `other.start`.
    pub fn precedes(&self, other: &KeyRange) -> bool {
        !self.end.is_empty() && self.end <= other.start
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.end.is_empty() {
            write!(f, "[{}, +inf)", hex::encode(&self.start))
        } else {
            write!(
                f,
                "[{}, {})",
                hex::encode(&self.start),
                hex::encode(&self.end)
            )
        }
    }
}

/// Smallest key greater than every key starting with `prefix`; `None` when
/// no such key exists (empty or all-`0xFF` prefix).
pub fn prefix_next(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut out = prefix.to_vec();
    for idx in (0..out.len()).rev() {
        if out[idx] != 0xFF {
            out[idx] += 1;
            out.truncate(idx + 1);
            return Some(out);
        }
    }
    None
}

/// Picks the tighter of two end bounds, treating empty as unbounded.
pub fn min_end_bound(left: &[u8], right: &[u8]) -> Vec<u8> {
    match (left.is_empty(), right.is_empty()) {
        (true, true) => Vec::new(),
        (true, false) => right.to_vec(),
        (false, true) => left.to_vec(),
        (false, false) => left.min(right).to_vec(),
    }
}

pub fn key_in_range(key: &[u8], start: &[u8], end: &[u8]) -> bool {
    let in_start = start.is_empty() || key >= start;
    let in_end = end.is_empty() || key < end;
    in_start && in_end
}

pub fn table_prefix(table_id: i64) -> Vec<u8> {
    let mut out = Vec::with_capacity(TABLE_PREFIX_LEN);
    out.push(TABLE_PREFIX);
    out.extend_from_slice(&encode_i64_ordered(table_id));
    out
}

pub fn record_prefix(table_id: i64) -> Vec<u8> {
    let mut out = table_prefix(table_id);
    out.extend_from_slice(RECORD_SEPARATOR);
    out
}

pub fn index_prefix(table_id: i64, index_id: i64) -> Vec<u8> {
    let mut out = table_prefix(table_id);
    out.extend_from_slice(INDEX_SEPARATOR);
    out.extend_from_slice(&encode_i64_ordered(index_id));
    out
}

pub fn encode_row_key(table_id: i64, handle: i64) -> Vec<u8> {
    let mut out = record_prefix(table_id);
    out.extend_from_slice(&encode_i64_ordered(handle));
    out
}

/// Index key prefix for the given leading column values, in index order.
pub fn encode_index_key(table_id: i64, index_id: i64, values: &[TypedLiteral]) -> Vec<u8> {
    let mut out = index_prefix(table_id, index_id);
    for literal in values {
        out.extend_from_slice(literal.key());
    }
    out
}

/// Every row key of a table.
pub fn record_range(table_id: i64) -> KeyRange {
    KeyRange::prefix(&record_prefix(table_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    #[test]
    fn key_range_rejects_inverted_bounds() {
        let err = KeyRange::new(b"m".to_vec(), b"a".to_vec()).expect_err("inverted");
        assert!(matches!(err, RouteError::InvariantViolation(_)));
        assert!(KeyRange::new(b"m".to_vec(), Vec::new()).is_ok());
        assert!(KeyRange::new(b"m".to_vec(), b"m".to_vec())
            .expect("degenerate")
            .is_empty());
    }

    #[test]
    fn intersect_clips_to_tighter_bounds() {
        let left = KeyRange::new(b"b".to_vec(), b"y".to_vec()).expect("range");
        let right = KeyRange::new(b"m".to_vec(), Vec::new()).expect("range");
        let clipped = left.intersect(&right).expect("overlap");
        assert_eq!(clipped.start(), b"m");
        assert_eq!(clipped.end(), b"y");

        let disjoint = KeyRange::new(b"a".to_vec(), b"b".to_vec()).expect("range");
        assert!(disjoint.intersect(&right).is_none());
        assert!(disjoint.precedes(&right));
    }

    #[test]
    fn prefix_next_carries_over_trailing_ff() {
        assert_eq!(prefix_next(&[0x01, 0xFF]), Some(vec![0x02]));
        assert_eq!(prefix_next(&[0x01, 0x02]), Some(vec![0x01, 0x03]));
        assert_eq!(prefix_next(&[0xFF, 0xFF]), None);
        assert_eq!(prefix_next(&[]), None);
    }

    #[test]
    fn row_keys_sort_by_signed_handle() {
        let negative = encode_row_key(42, -7);
        let positive = encode_row_key(42, 7);
        assert!(negative < positive);
        assert!(record_range(42).contains(&negative));
        assert!(record_range(42).contains(&positive));
        assert!(!record_range(43).contains(&negative));
        assert!(!record_range(42).contains(&index_prefix(42, 1)));
    }

    #[test]
    fn index_keys_nest_under_table_and_index_prefix() {
        let literal = TypedLiteral::new(DataType::INT, 1i64).expect("literal");
        let key = encode_index_key(42, 3, &[literal]);
        assert!(KeyRange::prefix(&index_prefix(42, 3)).contains(&key));
        assert!(KeyRange::prefix(&table_prefix(42)).contains(&key));
        assert!(!record_range(42).contains(&key));
    }

    #[test]
    fn display_renders_hex_and_open_end() {
        let range = KeyRange::new(vec![0x74, 0x80], Vec::new()).expect("range");
        assert_eq!(range.to_string(), "[7480, +inf)");
    }
}
