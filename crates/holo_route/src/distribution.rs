//! Region distribution summaries for operational visibility.
//!
//! Both summaries are folds over routed tasks; the table-level entry points
//! resolve the table, route a full-table scan and fold the result.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::{Result, RouteError};
use crate::router::{RangeRouter, Task};
use crate::scan::ScanPlan;
use crate::topology::TopologySource;

/// Both summaries of one routing result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistributionReport {
    /// Task count keyed by `"{host}_{store_id}"`.
    pub region_count_by_node_and_store: BTreeMap<String, usize>,
    /// Region ids per store, in task order.
    pub region_ids_by_store: BTreeMap<u64, Vec<u64>>,
}

impl DistributionReport {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self {
            region_count_by_node_and_store: region_count_by_node_and_store(tasks),
            region_ids_by_store: region_ids_by_store(tasks),
        }
    }

    pub fn total_tasks(&self) -> usize {
        self.region_count_by_node_and_store.values().sum()
    }
}

pub fn region_count_by_node_and_store(tasks: &[Task]) -> BTreeMap<String, usize> {
    tasks.iter().fold(BTreeMap::new(), |mut acc, task| {
        *acc.entry(format!("{}_{}", task.store.host, task.store.id))
            .or_insert(0) += 1;
        acc
    })
}

pub fn region_ids_by_store(tasks: &[Task]) -> BTreeMap<u64, Vec<u64>> {
    tasks.iter().fold(BTreeMap::new(), |mut acc, task| {
        acc.entry(task.store.id)
            .or_insert_with(Vec::new)
            .push(task.partition.id);
        acc
    })
}

/// Task count per `"{host}_{store_id}"` for a full scan of `database.table`.
pub fn region_distribution(
    catalog: &dyn Catalog,
    topology: &dyn TopologySource,
    router: &RangeRouter,
    database: &str,
    table: &str,
) -> Result<BTreeMap<String, usize>> {
    let tasks = table_tasks(catalog, topology, router, database, table)?;
    Ok(region_count_by_node_and_store(&tasks))
}

/// Region ids per store for a full scan of `database.table`.
pub fn store_region_id_distribution(
    catalog: &dyn Catalog,
    topology: &dyn TopologySource,
    router: &RangeRouter,
    database: &str,
    table: &str,
) -> Result<BTreeMap<u64, Vec<u64>>> {
    let tasks = table_tasks(catalog, topology, router, database, table)?;
    Ok(region_ids_by_store(&tasks))
}

pub fn distribution_report(
    catalog: &dyn Catalog,
    topology: &dyn TopologySource,
    router: &RangeRouter,
    database: &str,
    table: &str,
) -> Result<DistributionReport> {
    let tasks = table_tasks(catalog, topology, router, database, table)?;
    Ok(DistributionReport::from_tasks(&tasks))
}

fn table_tasks(
    catalog: &dyn Catalog,
    topology: &dyn TopologySource,
    router: &RangeRouter,
    database: &str,
    table: &str,
) -> Result<Vec<Task>> {
    if database.trim().is_empty() {
        return Err(RouteError::illegal_argument("database name is empty"));
    }
    if table.trim().is_empty() {
        return Err(RouteError::illegal_argument("table name is empty"));
    }
    let metadata = catalog
        .resolve_table(database, table)?
        .ok_or_else(|| RouteError::illegal_argument(format!("Table not found {database}.{table}")))?;

    let plan = ScanPlan::full_table(&metadata);
    let tasks = router.route_plan(topology, &plan)?;
    debug!(
        database,
        table,
        table_id = metadata.id,
        tasks = tasks.len(),
        "collected region distribution"
    );
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyRange;
    use crate::topology::{PartitionDescriptor, StoreDescriptor};

    fn task(partition_id: u64, store_id: u64, host: &str) -> Task {
        Task {
            range: KeyRange::full(),
            partition: PartitionDescriptor::new(partition_id, Vec::new(), Vec::new(), store_id),
            store: StoreDescriptor::new(store_id, host, 20160),
        }
    }

    #[test]
    fn counts_are_keyed_by_host_and_store() {
        let tasks = vec![
            task(1, 1, "10.0.0.1"),
            task(2, 2, "10.0.0.2"),
            task(3, 1, "10.0.0.1"),
        ];
        let counts = region_count_by_node_and_store(&tasks);
        assert_eq!(counts.get("10.0.0.1_1"), Some(&2));
        assert_eq!(counts.get("10.0.0.2_2"), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn region_ids_keep_task_order_per_store() {
        let tasks = vec![task(7, 1, "a"), task(3, 2, "b"), task(5, 1, "a")];
        let ids = region_ids_by_store(&tasks);
        assert_eq!(ids.get(&1), Some(&vec![7, 5]));
        assert_eq!(ids.get(&2), Some(&vec![3]));
    }

    #[test]
    fn report_over_no_tasks_is_empty() {
        let report = DistributionReport::from_tasks(&[]);
        assert!(report.region_count_by_node_and_store.is_empty());
        assert!(report.region_ids_by_store.is_empty());
        assert_eq!(report.total_tasks(), 0);
    }
}
