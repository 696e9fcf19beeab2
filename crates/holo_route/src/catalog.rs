//! Table-metadata resolution.
//!
//! The planner only needs `resolve_table`; the catalog service behind it is
//! external. `InMemoryCatalog` serves tests and hosts that ship a catalog
//! snapshot as JSON.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::metadata::TableMetadata;

/// Catalog collaborator.
pub trait Catalog: Send + Sync {
    /// Returns `Ok(None)` when the table does not exist; `Err` only when the
    /// catalog itself cannot answer.
    fn resolve_table(&self, database: &str, table: &str) -> Result<Option<Arc<TableMetadata>>>;
}

/// Snapshot catalog keyed by case-insensitive `(database, table)`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    tables: BTreeMap<(String, String), Arc<TableMetadata>>,
}

/// Wire model for a catalog snapshot.
#[derive(Debug, Deserialize)]
struct CatalogSnapshotView {
    #[serde(default)]
    databases: BTreeMap<String, Vec<TableMetadata>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers `table` under `database`, replacing any table
    /// of the same name.
    pub fn register(&mut self, database: &str, table: TableMetadata) -> Result<()> {
        table.validate()?;
        let key = catalog_key(database, &table.name);
        if let Some(previous) = self.tables.insert(key, Arc::new(table)) {
            debug!(
                database = %database,
                table_name = %previous.name,
                table_id = previous.id,
                "replaced table metadata"
            );
        }
        Ok(())
    }

    pub fn with_table(mut self, database: &str, table: TableMetadata) -> Result<Self> {
        self.register(database, table)?;
        Ok(self)
    }

    /// Loads a `{"databases": {"<db>": [<table>, ..]}}` snapshot. Invalid
    /// tables are skipped so one bad record does not hide the rest.
    pub fn from_json(payload: &str) -> anyhow::Result<Self> {
        let view: CatalogSnapshotView =
            serde_json::from_str(payload).context("decode catalog snapshot json")?;
        let mut catalog = Self::new();
        for (database, tables) in view.databases {
            for table in tables {
                let table_name = table.name.clone();
                if let Err(err) = catalog.register(&database, table) {
                    warn!(
                        database = %database,
                        table_name = %table_name,
                        error = %err,
                        "skipping invalid table metadata"
                    );
                }
            }
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Catalog for InMemoryCatalog {
    fn resolve_table(&self, database: &str, table: &str) -> Result<Option<Arc<TableMetadata>>> {
        Ok(self.tables.get(&catalog_key(database, table)).cloned())
    }
}

fn catalog_key(database: &str, table: &str) -> (String, String) {
    (
        database.trim().to_ascii_lowercase(),
        table.trim().to_ascii_lowercase(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ColumnInfo;
    use crate::types::DataType;

    fn table(id: i64, name: &str) -> TableMetadata {
        TableMetadata::new(id, name, vec![ColumnInfo::new("c1", 0, DataType::INT)])
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let catalog = InMemoryCatalog::new()
            .with_table("Test", table(1, "Orders"))
            .expect("register");
        let resolved = catalog
            .resolve_table("test", "ORDERS")
            .expect("resolve")
            .expect("table exists");
        assert_eq!(resolved.id, 1);
        assert!(catalog
            .resolve_table("test", "missing")
            .expect("resolve")
            .is_none());
    }

    #[test]
    fn register_rejects_invalid_metadata() {
        let mut catalog = InMemoryCatalog::new();
        assert!(catalog.register("test", table(0, "bad")).is_err());
        assert!(catalog.is_empty());
    }

    #[test]
    fn from_json_skips_invalid_tables() {
        let payload = r#"{
            "databases": {
                "test": [
                    {"id": 5, "name": "t1", "columns": [
                        {"name": "c1", "offset": 0, "data_type": {"tp": "long"}}
                    ]},
                    {"id": 0, "name": "broken", "columns": []}
                ]
            }
        }"#;
        let catalog = InMemoryCatalog::from_json(payload).expect("snapshot");
        assert_eq!(catalog.len(), 1);
        let t1 = catalog
            .resolve_table("test", "t1")
            .expect("resolve")
            .expect("t1");
        assert!(t1.columns[0].data_type.nullable);
    }

    #[test]
    fn from_json_reports_malformed_payload() {
        let err = InMemoryCatalog::from_json("{not json").expect_err("malformed");
        assert!(err.to_string().contains("catalog snapshot"));
    }
}
