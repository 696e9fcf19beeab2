//! Error taxonomy shared by the codec, planner, router and reporting layers.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RouteError>;

/// Stable machine-readable classification of [`RouteError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteErrorCode {
    UnsupportedType,
    TableNotFound,
    ColumnNotFound,
    PartitionNotFound,
    StoreNotFound,
    IllegalArgument,
    TypeMismatch,
    NullViolation,
    Decode,
    InvariantViolation,
    InvalidConfig,
    Topology,
    Catalog,
}

impl RouteErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteErrorCode::UnsupportedType => "unsupported_type",
            RouteErrorCode::TableNotFound => "table_not_found",
            RouteErrorCode::ColumnNotFound => "column_not_found",
            RouteErrorCode::PartitionNotFound => "partition_not_found",
            RouteErrorCode::StoreNotFound => "store_not_found",
            RouteErrorCode::IllegalArgument => "illegal_argument",
            RouteErrorCode::TypeMismatch => "type_mismatch",
            RouteErrorCode::NullViolation => "null_violation",
            RouteErrorCode::Decode => "decode",
            RouteErrorCode::InvariantViolation => "invariant_violation",
            RouteErrorCode::InvalidConfig => "invalid_config",
            RouteErrorCode::Topology => "topology",
            RouteErrorCode::Catalog => "catalog",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// A type without a working codec was asked to encode, decode or push a
    /// predicate. Retrying cannot change the outcome.
    #[error("{type_name} type not supported")]
    UnsupportedType { type_name: String },
    #[error("table not found: {database}.{table}")]
    TableNotFound { database: String, table: String },
    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },
    /// Transient topology gap. Callers refresh the topology and retry.
    #[error("no partition covers key {}", hex::encode(.key))]
    PartitionNotFound { key: Vec<u8> },
    #[error("store {store_id} for partition {partition_id} is unknown")]
    StoreNotFound { store_id: u64, partition_id: u64 },
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    #[error("value {value} is not valid for type {type_name}")]
    TypeMismatch { type_name: String, value: String },
    #[error("null value for non-nullable type {type_name}")]
    NullViolation { type_name: String },
    #[error("decode error: {0}")]
    Decode(String),
    /// Programming-defect class failure; never retried.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("topology source failed: {0}")]
    Topology(String),
    #[error("catalog failed: {0}")]
    Catalog(String),
}

impl RouteError {
    pub fn unsupported(type_name: impl Into<String>) -> Self {
        RouteError::UnsupportedType {
            type_name: type_name.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        RouteError::Decode(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        RouteError::InvariantViolation(msg.into())
    }

    pub fn illegal_argument(msg: impl Into<String>) -> Self {
        RouteError::IllegalArgument(msg.into())
    }

    pub fn code(&self) -> RouteErrorCode {
        match self {
            RouteError::UnsupportedType { .. } => RouteErrorCode::UnsupportedType,
            RouteError::TableNotFound { .. } => RouteErrorCode::TableNotFound,
            RouteError::ColumnNotFound { .. } => RouteErrorCode::ColumnNotFound,
            RouteError::PartitionNotFound { .. } => RouteErrorCode::PartitionNotFound,
            RouteError::StoreNotFound { .. } => RouteErrorCode::StoreNotFound,
            RouteError::IllegalArgument(_) => RouteErrorCode::IllegalArgument,
            RouteError::TypeMismatch { .. } => RouteErrorCode::TypeMismatch,
            RouteError::NullViolation { .. } => RouteErrorCode::NullViolation,
            RouteError::Decode(_) => RouteErrorCode::Decode,
            RouteError::InvariantViolation(_) => RouteErrorCode::InvariantViolation,
            RouteError::InvalidConfig(_) => RouteErrorCode::InvalidConfig,
            RouteError::Topology(_) => RouteErrorCode::Topology,
            RouteError::Catalog(_) => RouteErrorCode::Catalog,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }

    /// Only a topology gap can resolve itself after a refresh.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RouteError::PartitionNotFound { .. })
    }
}
