//! Query routing for HoloStore tables.
//!
//! A filter over a table's columns flows through:
//! - the predicate normalizer, which canonicalizes comparisons to
//!   `column op literal`,
//! - the scan plan builder, which turns them into ordered key ranges using the
//!   order-preserving type codec,
//! - the range router, which splits those ranges into per-partition tasks
//!   against a topology snapshot,
//! - distribution reporting, which summarizes where the tasks land.
//!
//! Catalog and topology are collaborator traits; in-memory implementations
//! loadable from JSON snapshots are provided for embedding and tests.

pub mod catalog;
pub mod config;
pub mod distribution;
pub mod error;
pub mod expression;
pub mod key;
pub mod metadata;
pub mod router;
pub mod scan;
pub mod topology;
pub mod types;
pub mod wire;

pub use catalog::{Catalog, InMemoryCatalog};
pub use config::{RangeRouterConfig, RouteRuntimeConfig, ScanPlannerConfig};
pub use distribution::{
    distribution_report, region_count_by_node_and_store, region_distribution,
    region_ids_by_store, store_region_id_distribution, DistributionReport,
};
pub use error::{Result, RouteError, RouteErrorCode};
pub use expression::{
    ColumnRef, ComparisonExpression, ComparisonKind, Expression, NormalizedPredicate,
};
pub use key::KeyRange;
pub use metadata::{ColumnInfo, IndexInfo, TableMetadata};
pub use router::{RangeRouter, Task};
pub use scan::{AccessPath, ScanPlan, ScanPlanBuilder};
pub use topology::{PartitionDescriptor, StoreDescriptor, TopologySnapshot, TopologySource};
pub use types::{DataType, MySqlType, TypedLiteral, Value};
pub use wire::{WireExpr, WireFunc};
