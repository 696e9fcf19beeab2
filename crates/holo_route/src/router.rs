//! Splits planned key ranges along partition boundaries.
//!
//! Every produced task covers the intersection of one input range with one
//! partition, and the tasks for a range tile it exactly. Any gap in coverage
//! fails the whole call with a retryable [`RouteError::PartitionNotFound`].

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::RangeRouterConfig;
use crate::error::{Result, RouteError};
use crate::key::{min_end_bound, KeyRange};
use crate::scan::ScanPlan;
use crate::topology::{PartitionDescriptor, StoreDescriptor, TopologySource};

/// A key range bound to the partition and store that serve it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    /// Fragment of the requested range, clipped to the partition bounds.
    pub range: KeyRange,
    /// Partition that owns every key of `range`.
    pub partition: PartitionDescriptor,
    /// Store currently serving the partition.
    pub store: StoreDescriptor,
}

#[derive(Debug, Clone, Default)]
pub struct RangeRouter {
    config: RangeRouterConfig,
}

impl RangeRouter {
    pub fn new(config: RangeRouterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RangeRouterConfig {
        &self.config
    }

    /// Tasks for `ranges`, in input order and ascending key order within
    /// each range. Empty ranges produce no tasks.
    pub fn split_ranges_by_partition(
        &self,
        source: &dyn TopologySource,
        ranges: &[KeyRange],
    ) -> Result<Vec<Task>> {
        let threshold = self.config.parallel_threshold;
        let per_range: Vec<Vec<Task>> = if threshold > 0 && ranges.len() >= threshold {
            ranges
                .par_iter()
                .map(|range| route_range(source, range))
                .collect::<Result<_>>()?
        } else {
            ranges
                .iter()
                .map(|range| route_range(source, range))
                .collect::<Result<_>>()?
        };

        let tasks: Vec<Task> = per_range.into_iter().flatten().collect();
        debug!(ranges = ranges.len(), tasks = tasks.len(), "routed key ranges");
        Ok(tasks)
    }

    pub fn route_plan(&self, source: &dyn TopologySource, plan: &ScanPlan) -> Result<Vec<Task>> {
        self.split_ranges_by_partition(source, &plan.key_ranges)
    }
}

fn route_range(source: &dyn TopologySource, range: &KeyRange) -> Result<Vec<Task>> {
    if range.is_empty() {
        return Ok(Vec::new());
    }

    let partitions = source.partitions_for_key_range(range)?;
    let partition_count = partitions.len();
    let mut cursor = range.start().to_vec();
    let mut previous: Option<u64> = None;
    let mut tasks = Vec::with_capacity(partition_count);

    for partition in partitions {
        let ends_before_cursor =
            !partition.end_key.is_empty() && partition.end_key.as_slice() <= cursor.as_slice();
        if ends_before_cursor || (previous.is_some() && partition.start_key < cursor) {
            if let Some(previous) = previous {
                return Err(RouteError::invariant(format!(
                    "partitions {previous} and {} overlap at {}",
                    partition.id,
                    hex::encode(&partition.start_key)
                )));
            }
            continue;
        }
        if partition.start_key > cursor {
            break;
        }

        let end = min_end_bound(range.end(), &partition.end_key);
        if !end.is_empty() && cursor > end {
            return Err(RouteError::invariant(format!(
                "clipped range start {} sorts after end {}",
                hex::encode(&cursor),
                hex::encode(&end)
            )));
        }

        let store = source.store_for_partition(partition.id)?;
        let next_cursor = partition.end_key.clone();
        previous = Some(partition.id);
        tasks.push(Task {
            range: KeyRange::new(std::mem::take(&mut cursor), end)?,
            partition,
            store,
        });

        if next_cursor.is_empty() || (!range.is_unbounded() && next_cursor.as_slice() >= range.end())
        {
            return Ok(tasks);
        }
        cursor = next_cursor;
    }

    warn!(
        key = %hex::encode(&cursor),
        range = %range,
        partitions = partition_count,
        "no partition covers key; topology needs refresh"
    );
    Err(RouteError::PartitionNotFound { key: cursor })
}
