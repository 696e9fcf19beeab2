//! Column type system for HoloStore tables.
//!
//! Every column type is a [`DataType`]: a MySQL type tag plus nullability and
//! signedness flags. The tag maps onto a closed [`TypeFamily`], and the family
//! decides which codec rules apply. Families without a working codec are still
//! representable so that table metadata can describe every column, but every
//! encode/decode call on them fails with [`RouteError::UnsupportedType`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};

pub(crate) mod codec;
mod value;

pub use value::{TypedLiteral, Value};

/// MySQL column type tags as stored in table metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MySqlType {
    Decimal,
    Tiny,
    Short,
    Long,
    Float,
    Double,
    Null,
    Timestamp,
    LongLong,
    Int24,
    Date,
    Duration,
    Datetime,
    Year,
    Varchar,
    Bit,
    Json,
    NewDecimal,
    Enum,
    Set,
    TinyBlob,
    MediumBlob,
    LongBlob,
    Blob,
    VarString,
    String,
    Geometry,
}

impl MySqlType {
    /// Stable on-disk type code.
    pub fn code(self) -> u8 {
        match self {
            MySqlType::Decimal => 0,
            MySqlType::Tiny => 1,
            MySqlType::Short => 2,
            MySqlType::Long => 3,
            MySqlType::Float => 4,
            MySqlType::Double => 5,
            MySqlType::Null => 6,
            MySqlType::Timestamp => 7,
            MySqlType::LongLong => 8,
            MySqlType::Int24 => 9,
            MySqlType::Date => 10,
            MySqlType::Duration => 11,
            MySqlType::Datetime => 12,
            MySqlType::Year => 13,
            MySqlType::Varchar => 15,
            MySqlType::Bit => 16,
            MySqlType::Json => 0xf5,
            MySqlType::NewDecimal => 0xf6,
            MySqlType::Enum => 0xf7,
            MySqlType::Set => 0xf8,
            MySqlType::TinyBlob => 0xf9,
            MySqlType::MediumBlob => 0xfa,
            MySqlType::LongBlob => 0xfb,
            MySqlType::Blob => 0xfc,
            MySqlType::VarString => 0xfd,
            MySqlType::String => 0xfe,
            MySqlType::Geometry => 0xff,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        let tp = match code {
            0 => MySqlType::Decimal,
            1 => MySqlType::Tiny,
            2 => MySqlType::Short,
            3 => MySqlType::Long,
            4 => MySqlType::Float,
            5 => MySqlType::Double,
            6 => MySqlType::Null,
            7 => MySqlType::Timestamp,
            8 => MySqlType::LongLong,
            9 => MySqlType::Int24,
            10 => MySqlType::Date,
            11 => MySqlType::Duration,
            12 => MySqlType::Datetime,
            13 => MySqlType::Year,
            15 => MySqlType::Varchar,
            16 => MySqlType::Bit,
            0xf5 => MySqlType::Json,
            0xf6 => MySqlType::NewDecimal,
            0xf7 => MySqlType::Enum,
            0xf8 => MySqlType::Set,
            0xf9 => MySqlType::TinyBlob,
            0xfa => MySqlType::MediumBlob,
            0xfb => MySqlType::LongBlob,
            0xfc => MySqlType::Blob,
            0xfd => MySqlType::VarString,
            0xfe => MySqlType::String,
            0xff => MySqlType::Geometry,
            _ => return None,
        };
        Some(tp)
    }

    pub fn family(self) -> TypeFamily {
        match self {
            MySqlType::Tiny
            | MySqlType::Short
            | MySqlType::Int24
            | MySqlType::Long
            | MySqlType::LongLong
            | MySqlType::Year
            | MySqlType::Bit => TypeFamily::Integer,
            MySqlType::Float | MySqlType::Double => TypeFamily::Float,
            MySqlType::Decimal | MySqlType::NewDecimal => TypeFamily::Decimal,
            MySqlType::Varchar | MySqlType::VarString | MySqlType::String => TypeFamily::Text,
            MySqlType::TinyBlob
            | MySqlType::MediumBlob
            | MySqlType::LongBlob
            | MySqlType::Blob => TypeFamily::Bytes,
            MySqlType::Date => TypeFamily::Date,
            MySqlType::Datetime | MySqlType::Timestamp => TypeFamily::DateTime,
            MySqlType::Duration => TypeFamily::Duration,
            MySqlType::Enum => TypeFamily::Enum,
            MySqlType::Set => TypeFamily::Set,
            MySqlType::Json => TypeFamily::Json,
            MySqlType::Geometry => TypeFamily::Geometry,
            MySqlType::Null => TypeFamily::Null,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MySqlType::Decimal | MySqlType::NewDecimal => "decimal",
            MySqlType::Tiny => "tinyint",
            MySqlType::Short => "smallint",
            MySqlType::Int24 => "mediumint",
            MySqlType::Long => "int",
            MySqlType::LongLong => "bigint",
            MySqlType::Float => "float",
            MySqlType::Double => "double",
            MySqlType::Null => "null",
            MySqlType::Timestamp => "timestamp",
            MySqlType::Date => "date",
            MySqlType::Duration => "time",
            MySqlType::Datetime => "datetime",
            MySqlType::Year => "year",
            MySqlType::Varchar | MySqlType::VarString => "varchar",
            MySqlType::String => "char",
            MySqlType::Bit => "bit",
            MySqlType::Json => "json",
            MySqlType::Enum => "enum",
            MySqlType::Set => "set",
            MySqlType::TinyBlob => "tinyblob",
            MySqlType::MediumBlob => "mediumblob",
            MySqlType::LongBlob => "longblob",
            MySqlType::Blob => "blob",
            MySqlType::Geometry => "geometry",
        }
    }
}

/// Closed grouping of type tags that share one codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    Integer,
    Float,
    Decimal,
    Text,
    Bytes,
    Date,
    DateTime,
    Duration,
    Enum,
    Set,
    Json,
    Geometry,
    Null,
}

impl TypeFamily {
    /// Families whose codec is not implemented yet.
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            TypeFamily::Set | TypeFamily::Json | TypeFamily::Geometry
        )
    }
}

/// Expression node tags of the remote filter-expression protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprType {
    Null,
    Int64,
    Uint64,
    Float32,
    Float64,
    String,
    Bytes,
    MysqlBit,
    MysqlDecimal,
    MysqlDuration,
    MysqlEnum,
    MysqlHex,
    MysqlSet,
    MysqlTime,
    MysqlJson,
    ValueList,
    ColumnRef,
    ScalarFunc,
}

impl ExprType {
    pub fn code(self) -> u16 {
        match self {
            ExprType::Null => 0,
            ExprType::Int64 => 1,
            ExprType::Uint64 => 2,
            ExprType::Float32 => 3,
            ExprType::Float64 => 4,
            ExprType::String => 5,
            ExprType::Bytes => 6,
            ExprType::MysqlBit => 101,
            ExprType::MysqlDecimal => 102,
            ExprType::MysqlDuration => 103,
            ExprType::MysqlEnum => 104,
            ExprType::MysqlHex => 105,
            ExprType::MysqlSet => 106,
            ExprType::MysqlTime => 107,
            ExprType::MysqlJson => 108,
            ExprType::ValueList => 151,
            ExprType::ColumnRef => 201,
            ExprType::ScalarFunc => 10000,
        }
    }
}

/// A column type. Instances are plain values; the canonical ones live in the
/// associated consts and in [`registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataType {
    pub tp: MySqlType,
    /// Whether the column accepts NULL.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Only meaningful for the integer family.
    #[serde(default)]
    pub unsigned: bool,
}

fn default_nullable() -> bool {
    true
}

impl DataType {
    pub const TINYINT: DataType = DataType::new(MySqlType::Tiny);
    pub const SMALLINT: DataType = DataType::new(MySqlType::Short);
    pub const MEDIUMINT: DataType = DataType::new(MySqlType::Int24);
    pub const INT: DataType = DataType::new(MySqlType::Long);
    pub const BIGINT: DataType = DataType::new(MySqlType::LongLong);
    pub const BIGINT_UNSIGNED: DataType = DataType::new(MySqlType::LongLong).with_unsigned();
    pub const YEAR: DataType = DataType::new(MySqlType::Year);
    pub const BIT: DataType = DataType::new(MySqlType::Bit).with_unsigned();
    pub const FLOAT: DataType = DataType::new(MySqlType::Float);
    pub const DOUBLE: DataType = DataType::new(MySqlType::Double);
    pub const DECIMAL: DataType = DataType::new(MySqlType::NewDecimal);
    pub const VARCHAR: DataType = DataType::new(MySqlType::Varchar);
    pub const CHAR: DataType = DataType::new(MySqlType::String);
    pub const TEXT: DataType = DataType::new(MySqlType::Blob);
    pub const BLOB: DataType = DataType::new(MySqlType::Blob);
    pub const DATE: DataType = DataType::new(MySqlType::Date);
    pub const DATETIME: DataType = DataType::new(MySqlType::Datetime);
    pub const TIMESTAMP: DataType = DataType::new(MySqlType::Timestamp);
    pub const TIME: DataType = DataType::new(MySqlType::Duration);
    pub const ENUM: DataType = DataType::new(MySqlType::Enum);
    pub const SET: DataType = DataType::new(MySqlType::Set);
    pub const JSON: DataType = DataType::new(MySqlType::Json);
    pub const GEOMETRY: DataType = DataType::new(MySqlType::Geometry);
    pub const NULL: DataType = DataType::new(MySqlType::Null);

    pub const fn new(tp: MySqlType) -> Self {
        Self {
            tp,
            nullable: true,
            unsigned: false,
        }
    }

    pub const fn with_unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn family(&self) -> TypeFamily {
        self.tp.family()
    }

    pub fn is_supported(&self) -> bool {
        self.family().is_supported()
    }

    /// Fails with `UnsupportedType` for families without a codec.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(RouteError::unsupported(self.to_string()))
        }
    }

    /// Tag used for literals of this type in the remote expression protocol.
    pub fn wire_type(&self) -> ExprType {
        match self.family() {
            TypeFamily::Integer if self.tp == MySqlType::Bit => ExprType::MysqlBit,
            TypeFamily::Integer if self.unsigned => ExprType::Uint64,
            TypeFamily::Integer => ExprType::Int64,
            TypeFamily::Float if self.tp == MySqlType::Float => ExprType::Float32,
            TypeFamily::Float => ExprType::Float64,
            TypeFamily::Decimal => ExprType::MysqlDecimal,
            TypeFamily::Text => ExprType::String,
            TypeFamily::Bytes => ExprType::Bytes,
            TypeFamily::Date | TypeFamily::DateTime => ExprType::MysqlTime,
            TypeFamily::Duration => ExprType::MysqlDuration,
            TypeFamily::Enum => ExprType::MysqlEnum,
            TypeFamily::Set => ExprType::MysqlSet,
            TypeFamily::Json => ExprType::MysqlJson,
            TypeFamily::Geometry => ExprType::Bytes,
            TypeFamily::Null => ExprType::Null,
        }
    }

    /// Order-preserving encoding used for row keys, index keys and range
    /// boundaries.
    pub fn encode_key(&self, value: &Value) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        codec::encode_key(self, value, &mut out)?;
        Ok(out)
    }

    /// Compact storage encoding; not order-preserving.
    pub fn encode_value(&self, value: &Value) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        codec::encode_value(self, value, &mut out)?;
        Ok(out)
    }

    /// Flagless payload for pushing a literal to a remote node.
    pub fn encode_for_wire(&self, value: &Value) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        codec::encode_wire(self, value, &mut out)?;
        Ok(out)
    }

    /// Decodes one value produced by [`encode_key`](Self::encode_key) or
    /// [`encode_value`](Self::encode_value). Trailing bytes are rejected.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let mut cursor = 0usize;
        let value = codec::decode(self, bytes, &mut cursor)?;
        if cursor != bytes.len() {
            return Err(RouteError::decode(format!(
                "{} trailing bytes after {} value",
                bytes.len() - cursor,
                self
            )));
        }
        Ok(value)
    }

    /// Parses the textual default value recorded in column metadata.
    pub fn origin_default_value(&self, raw: &str) -> Result<Value> {
        value::parse_origin_default(self, raw)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tp.name())?;
        if self.unsigned && self.family() == TypeFamily::Integer {
            f.write_str(" unsigned")?;
        }
        Ok(())
    }
}

/// Read-only lookup from SQL type names to canonical [`DataType`]s.
#[derive(Debug)]
pub struct TypeRegistry {
    by_name: BTreeMap<&'static str, DataType>,
}

impl TypeRegistry {
    fn build() -> Self {
        let entries: [(&'static str, DataType); 30] = [
            ("tinyint", DataType::TINYINT),
            ("smallint", DataType::SMALLINT),
            ("mediumint", DataType::MEDIUMINT),
            ("int", DataType::INT),
            ("integer", DataType::INT),
            ("bigint", DataType::BIGINT),
            ("bigint unsigned", DataType::BIGINT_UNSIGNED),
            ("year", DataType::YEAR),
            ("bit", DataType::BIT),
            ("float", DataType::FLOAT),
            ("double", DataType::DOUBLE),
            ("real", DataType::DOUBLE),
            ("decimal", DataType::DECIMAL),
            ("numeric", DataType::DECIMAL),
            ("varchar", DataType::VARCHAR),
            ("char", DataType::CHAR),
            ("text", DataType::TEXT),
            ("blob", DataType::BLOB),
            ("tinyblob", DataType::new(MySqlType::TinyBlob)),
            ("mediumblob", DataType::new(MySqlType::MediumBlob)),
            ("longblob", DataType::new(MySqlType::LongBlob)),
            ("date", DataType::DATE),
            ("datetime", DataType::DATETIME),
            ("timestamp", DataType::TIMESTAMP),
            ("time", DataType::TIME),
            ("enum", DataType::ENUM),
            ("set", DataType::SET),
            ("json", DataType::JSON),
            ("geometry", DataType::GEOMETRY),
            ("null", DataType::NULL),
        ];
        Self {
            by_name: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<DataType> {
        let normalized = name.trim().to_ascii_lowercase();
        self.by_name.get(normalized.as_str()).copied()
    }
}

/// Process-wide type registry, built on first use and never mutated.
pub fn registry() -> &'static TypeRegistry {
    static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(TypeRegistry::build)
}
