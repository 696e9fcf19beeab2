//! Table, column and index metadata consumed by the planner.
//!
//! Records are plain serde structs so a catalog snapshot can be loaded from
//! JSON; `validate` is run on every record before it is registered.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};
use crate::types::{DataType, TypeFamily, Value};

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// SQL-visible column name.
    pub name: String,
    /// Ordinal position within the table's column list.
    pub offset: usize,
    pub data_type: DataType,
    #[serde(default)]
    pub primary_key: bool,
    /// Textual default as recorded by DDL, if any.
    #[serde(default)]
    pub default_value: Option<String>,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, offset: usize, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            offset,
            data_type,
            primary_key: false,
            default_value: None,
        }
    }

    pub fn with_primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn with_default(mut self, raw: impl Into<String>) -> Self {
        self.default_value = Some(raw.into());
        self
    }

    /// Parses the recorded default into a typed value.
    pub fn origin_default(&self) -> Result<Option<Value>> {
        self.default_value
            .as_deref()
            .map(|raw| self.data_type.origin_default_value(raw))
            .transpose()
    }
}

/// One secondary (or primary) index over named columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub id: i64,
    pub name: String,
    /// Indexed column names in key order.
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary: bool,
}

impl IndexInfo {
    pub fn new<S: Into<String>>(id: i64, name: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            id,
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
            primary: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self.unique = true;
        self
    }
}

/// Logical table description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Stable table identifier used in key encoding.
    pub id: i64,
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub indexes: Vec<IndexInfo>,
    /// Whether the single integer primary-key column doubles as the row
    /// handle inside record keys.
    #[serde(default)]
    pub pk_is_handle: bool,
}

impl TableMetadata {
    pub fn new(id: i64, name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            id,
            name: name.into(),
            columns,
            indexes: Vec::new(),
            pk_is_handle: false,
        }
    }

    pub fn with_index(mut self, index: IndexInfo) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_pk_handle(mut self) -> Self {
        self.pk_is_handle = true;
        self
    }

    /// Validates required fields before the record is registered.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RouteError::Catalog("table metadata has empty name".into()));
        }
        if self.id <= 0 {
            return Err(RouteError::Catalog(format!(
                "table {} has invalid id={}",
                self.name, self.id
            )));
        }
        if self.columns.is_empty() {
            return Err(RouteError::Catalog(format!(
                "table {} has no columns",
                self.name
            )));
        }

        let mut seen = BTreeSet::new();
        for (position, column) in self.columns.iter().enumerate() {
            if !seen.insert(column.name.to_ascii_lowercase()) {
                return Err(RouteError::Catalog(format!(
                    "table {} declares column {} twice",
                    self.name, column.name
                )));
            }
            if column.offset != position {
                return Err(RouteError::Catalog(format!(
                    "column {}.{} has offset {} but position {}",
                    self.name, column.name, column.offset, position
                )));
            }
        }

        let mut index_ids = BTreeSet::new();
        for index in &self.indexes {
            if index.id <= 0 || !index_ids.insert(index.id) {
                return Err(RouteError::Catalog(format!(
                    "table {} has invalid or duplicate index id {}",
                    self.name, index.id
                )));
            }
            if index.columns.is_empty() {
                return Err(RouteError::Catalog(format!(
                    "index {}.{} has no columns",
                    self.name, index.name
                )));
            }
            for name in &index.columns {
                self.require_column(name)?;
            }
        }

        if self.pk_is_handle {
            let primary: Vec<_> = self.columns.iter().filter(|c| c.primary_key).collect();
            match primary.as_slice() {
                [column] if column.data_type.family() == TypeFamily::Integer => {}
                _ => {
                    return Err(RouteError::Catalog(format!(
                        "table {} uses its primary key as handle but has no single integer primary key column",
                        self.name
                    )))
                }
            }
        }
        Ok(())
    }

    /// Case-insensitive column lookup.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn require_column(&self, name: &str) -> Result<&ColumnInfo> {
        self.column(name).ok_or_else(|| RouteError::ColumnNotFound {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    /// Column carried as the record-key handle, when the table has one.
    pub fn handle_column(&self) -> Option<&ColumnInfo> {
        if !self.pk_is_handle {
            return None;
        }
        self.columns.iter().find(|column| column.primary_key)
    }

    pub fn index(&self, id: i64) -> Option<&IndexInfo> {
        self.indexes.iter().find(|index| index.id == id)
    }

    /// Whether reading `index` alone yields every column in `output_columns`.
    /// Index entries always carry the row handle.
    pub fn is_covering(&self, index: &IndexInfo, output_columns: &[String]) -> bool {
        let handle = self.handle_column().map(|column| column.name.as_str());
        output_columns.iter().all(|output| {
            index
                .columns
                .iter()
                .any(|name| name.eq_ignore_ascii_case(output))
                || handle.is_some_and(|handle| handle.eq_ignore_ascii_case(output))
        })
    }
}
