//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Once;

use holo_route::key::encode_row_key;
use holo_route::{
    ColumnInfo, DataType, Expression, IndexInfo, InMemoryCatalog, PartitionDescriptor,
    StoreDescriptor, TableMetadata, TopologySnapshot,
};
use tracing_subscriber::EnvFilter;

pub const DATABASE: &str = "shop";
pub const ORDERS_TABLE_ID: i64 = 42;
pub const IDX_CUSTOMER: i64 = 1;
pub const IDX_STATUS_CREATED: i64 = 2;

static TRACING: Once = Once::new();

/// Installs an env-filtered subscriber once per test binary. `RUST_LOG`
/// overrides the quiet default.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_target(false)
            .with_test_writer()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("holo_route=warn")),
            )
            .try_init();
    });
}

/// `orders(id BIGINT PK handle, customer_id INT, status VARCHAR, amount
/// DECIMAL, created DATETIME)` with two secondary indexes.
pub fn orders_table() -> TableMetadata {
    TableMetadata::new(
        ORDERS_TABLE_ID,
        "orders",
        vec![
            ColumnInfo::new("id", 0, DataType::BIGINT.not_null()).with_primary_key(),
            ColumnInfo::new("customer_id", 1, DataType::INT),
            ColumnInfo::new("status", 2, DataType::VARCHAR),
            ColumnInfo::new("amount", 3, DataType::DECIMAL),
            ColumnInfo::new("created", 4, DataType::DATETIME),
        ],
    )
    .with_pk_handle()
    .with_index(IndexInfo::new(IDX_CUSTOMER, "idx_customer", ["customer_id"]))
    .with_index(IndexInfo::new(
        IDX_STATUS_CREATED,
        "idx_status_created",
        ["status", "created"],
    ))
}

pub fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_table(DATABASE, orders_table())
        .expect("register orders")
}

pub fn stores() -> Vec<StoreDescriptor> {
    vec![
        StoreDescriptor::new(1, "10.0.0.1", 20160),
        StoreDescriptor::new(2, "10.0.0.2", 20160),
        StoreDescriptor::new(3, "10.0.0.3", 20160),
    ]
}

/// Whole key space tiled into four partitions; the orders row range is split
/// at handles 0 and 1000.
pub fn topology() -> TopologySnapshot {
    let split_low = encode_row_key(ORDERS_TABLE_ID, 0);
    let split_high = encode_row_key(ORDERS_TABLE_ID, 1000);
    let split_tail = encode_row_key(ORDERS_TABLE_ID + 1, 0);
    TopologySnapshot::new(
        vec![
            PartitionDescriptor::new(10, Vec::new(), split_low.clone(), 1),
            PartitionDescriptor::new(11, split_low, split_high.clone(), 2),
            PartitionDescriptor::new(12, split_high, split_tail.clone(), 3),
            PartitionDescriptor::new(13, split_tail, Vec::new(), 1),
        ],
        stores(),
    )
    .expect("topology")
}

pub fn col(name: &str) -> Expression {
    Expression::column(name, &orders_table()).expect("column")
}

pub fn int(value: i64) -> Expression {
    Expression::constant(DataType::BIGINT, value).expect("int constant")
}

pub fn text(value: &str) -> Expression {
    Expression::constant(DataType::VARCHAR, value).expect("text constant")
}
