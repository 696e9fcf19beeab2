use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{Result, RouteError};
use crate::types::{DataType, MySqlType, TypeFamily};

/// Decoded column value. Each variant is the canonical in-memory form of one
/// or more [`TypeFamily`] members.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Signed duration in nanoseconds.
    Duration(i64),
    /// 1-based enum ordinal.
    Enum(u64),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Duration(_) => "duration",
            Value::Enum(_) => "enum",
        }
    }

    /// Converts the value into the canonical variant for `data_type`.
    ///
    /// Conversions never lose ordering information: a negative integer is not
    /// accepted by an unsigned column, a fractional number is not accepted
    /// by an integer column and an integer must fit the column's width.
    pub fn coerce(&self, data_type: &DataType) -> Result<Value> {
        data_type.ensure_supported()?;
        if self.is_null() {
            if !data_type.nullable {
                return Err(RouteError::NullViolation {
                    type_name: data_type.to_string(),
                });
            }
            return Ok(Value::Null);
        }

        let coerced = match data_type.family() {
            TypeFamily::Integer if data_type.unsigned => match self {
                Value::UInt(v) => Some(Value::UInt(*v)),
                Value::Int(v) => u64::try_from(*v).ok().map(Value::UInt),
                Value::Decimal(d) if d.fract().is_zero() => d.to_u64().map(Value::UInt),
                _ => None,
            },
            TypeFamily::Integer => match self {
                Value::Int(v) => Some(Value::Int(*v)),
                Value::UInt(v) => i64::try_from(*v).ok().map(Value::Int),
                Value::Decimal(d) if d.fract().is_zero() => d.to_i64().map(Value::Int),
                _ => None,
            },
            TypeFamily::Float => match self {
                Value::Float(v) if v.is_nan() => None,
                Value::Float(v) => Some(Value::Float(*v)),
                Value::Int(v) => Some(Value::Float(*v as f64)),
                Value::UInt(v) => Some(Value::Float(*v as f64)),
                Value::Decimal(d) => d.to_f64().map(Value::Float),
                _ => None,
            },
            TypeFamily::Decimal => match self {
                Value::Decimal(d) => Some(Value::Decimal(*d)),
                Value::Int(v) => Some(Value::Decimal(Decimal::from(*v))),
                Value::UInt(v) => Some(Value::Decimal(Decimal::from(*v))),
                Value::Float(v) => Decimal::from_f64_retain(*v).map(Value::Decimal),
                _ => None,
            },
            TypeFamily::Text => match self {
                Value::Text(v) => Some(Value::Text(v.clone())),
                Value::Bytes(v) => String::from_utf8(v.clone()).ok().map(Value::Text),
                _ => None,
            },
            TypeFamily::Bytes => match self {
                Value::Bytes(v) => Some(Value::Bytes(v.clone())),
                Value::Text(v) => Some(Value::Bytes(v.as_bytes().to_vec())),
                _ => None,
            },
            TypeFamily::Date => match self {
                Value::Date(v) => Some(Value::Date(*v)),
                Value::DateTime(v) if v.time() == NaiveTime::MIN => Some(Value::Date(v.date())),
                Value::Text(v) => parse_date(v).map(Value::Date),
                _ => None,
            },
            // Stored precision is microseconds.
            TypeFamily::DateTime => match self {
                Value::DateTime(v) => v
                    .with_nanosecond(v.nanosecond() / 1_000 * 1_000)
                    .map(Value::DateTime),
                Value::Date(v) => Some(Value::DateTime(v.and_time(NaiveTime::MIN))),
                Value::Text(v) => parse_datetime(v).map(Value::DateTime),
                _ => None,
            },
            TypeFamily::Duration => match self {
                Value::Duration(v) => Some(Value::Duration(*v)),
                Value::Text(v) => parse_duration_nanos(v).map(Value::Duration),
                _ => None,
            },
            TypeFamily::Enum => match self {
                Value::Enum(v) => Some(Value::Enum(*v)),
                Value::UInt(v) => Some(Value::Enum(*v)),
                Value::Int(v) => u64::try_from(*v).ok().map(Value::Enum),
                _ => None,
            },
            TypeFamily::Null => None,
            TypeFamily::Set | TypeFamily::Json | TypeFamily::Geometry => {
                return Err(RouteError::unsupported(data_type.to_string()));
            }
        };

        coerced
            .filter(|value| fits_integer_width(data_type, value))
            .ok_or_else(|| RouteError::TypeMismatch {
                type_name: data_type.to_string(),
                value: self.to_string(),
            })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{v}'"),
            Value::Bytes(v) => write!(f, "x'{}'", hex::encode(v)),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.6f")),
            Value::Duration(v) => write!(f, "{v}ns"),
            Value::Enum(v) => write!(f, "enum#{v}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

/// A literal bound to its type, with its key encoding computed once.
///
/// Equality compares the decoded value, never the raw bytes.
#[derive(Debug, Clone)]
pub struct TypedLiteral {
    data_type: DataType,
    value: Value,
    key: Vec<u8>,
}

impl TypedLiteral {
    /// Fails with `UnsupportedType` for types without a codec; no literal is
    /// produced in that case.
    pub fn new(data_type: DataType, value: impl Into<Value>) -> Result<Self> {
        let value = value.into().coerce(&data_type)?;
        let key = data_type.encode_key(&value)?;
        Ok(Self {
            data_type,
            value,
            key,
        })
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Order-preserving key bytes of the value under its own type.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Re-types the literal for a column, e.g. an `INT` literal compared with
    /// a `DECIMAL` column.
    pub fn cast(&self, data_type: &DataType) -> Result<TypedLiteral> {
        if self.data_type == *data_type {
            return Ok(self.clone());
        }
        TypedLiteral::new(*data_type, self.value.clone())
    }
}

impl PartialEq for TypedLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.data_type.family() == other.data_type.family() && self.value == other.value
    }
}

impl fmt::Display for TypedLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

pub(crate) fn parse_origin_default(data_type: &DataType, raw: &str) -> Result<Value> {
    let mismatch = || RouteError::TypeMismatch {
        type_name: data_type.to_string(),
        value: raw.to_string(),
    };
    let trimmed = raw.trim();
    let value = match data_type.family() {
        TypeFamily::Integer if data_type.unsigned => {
            Value::UInt(trimmed.parse::<u64>().map_err(|_| mismatch())?)
        }
        TypeFamily::Integer => Value::Int(trimmed.parse::<i64>().map_err(|_| mismatch())?),
        TypeFamily::Float => Value::Float(trimmed.parse::<f64>().map_err(|_| mismatch())?),
        TypeFamily::Decimal => Value::Decimal(Decimal::from_str(trimmed).map_err(|_| mismatch())?),
        TypeFamily::Text => Value::Text(raw.to_string()),
        TypeFamily::Bytes => Value::Bytes(raw.as_bytes().to_vec()),
        TypeFamily::Date => Value::Date(parse_date(trimmed).ok_or_else(mismatch)?),
        TypeFamily::DateTime => Value::DateTime(parse_datetime(trimmed).ok_or_else(mismatch)?),
        TypeFamily::Duration => Value::Duration(parse_duration_nanos(trimmed).ok_or_else(mismatch)?),
        // Enum defaults are recorded either by ordinal or by member name; the
        // member list is not part of the type, so names stay textual.
        TypeFamily::Enum => match trimmed.parse::<u64>() {
            Ok(ordinal) => Value::Enum(ordinal),
            Err(_) => Value::Text(raw.to_string()),
        },
        // SET defaults are kept verbatim even though SET values cannot be
        // encoded yet.
        TypeFamily::Set => Value::Text(raw.to_string()),
        TypeFamily::Null => Value::Null,
        TypeFamily::Json | TypeFamily::Geometry => {
            return Err(RouteError::unsupported(data_type.to_string()));
        }
    };
    if !fits_integer_width(data_type, &value) {
        return Err(mismatch());
    }
    Ok(value)
}

/// Inclusive value range of an integer column.
fn integer_bounds(data_type: &DataType) -> (i128, i128) {
    let bits = match data_type.tp {
        MySqlType::Year => return (0, 2155),
        MySqlType::Tiny => 8,
        MySqlType::Short => 16,
        MySqlType::Int24 => 24,
        MySqlType::Long => 32,
        _ => 64,
    };
    if data_type.unsigned {
        (0, (1i128 << bits) - 1)
    } else {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    }
}

fn fits_integer_width(data_type: &DataType, value: &Value) -> bool {
    if data_type.family() != TypeFamily::Integer {
        return true;
    }
    let raw = match value {
        Value::Int(v) => i128::from(*v),
        Value::UInt(v) => i128::from(*v),
        _ => return true,
    };
    let (min, max) = integer_bounds(data_type);
    (min..=max).contains(&raw)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| parse_date(raw).map(|date| date.and_time(NaiveTime::MIN)))
}

/// Parses `[-]HH:MM:SS[.ffffff]`; hours may exceed 24 as in MySQL `TIME`.
fn parse_duration_nanos(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (negative, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let mut parts = body.splitn(3, ':');
    let hours = parts.next()?.parse::<i64>().ok()?;
    let minutes = parts.next()?.parse::<i64>().ok()?;
    let seconds_raw = parts.next()?;
    let (seconds, fraction) = match seconds_raw.split_once('.') {
        Some((whole, frac)) => (whole.parse::<i64>().ok()?, frac),
        None => (seconds_raw.parse::<i64>().ok()?, ""),
    };
    if !(0..60).contains(&minutes) || !(0..60).contains(&seconds) || fraction.len() > 9 {
        return None;
    }
    let mut frac_nanos = 0i64;
    if !fraction.is_empty() {
        let digits = fraction.parse::<i64>().ok()?;
        frac_nanos = digits * 10i64.pow(9 - fraction.len() as u32);
    }
    let total = hours
        .checked_mul(3_600)?
        .checked_add(minutes * 60 + seconds)?
        .checked_mul(1_000_000_000)?
        .checked_add(frac_nanos)?;
    Some(if negative { -total } else { total })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_rejects_lossy_conversions() {
        let err = Value::Int(-1)
            .coerce(&DataType::BIGINT_UNSIGNED)
            .expect_err("negative into unsigned");
        assert!(matches!(err, RouteError::TypeMismatch { .. }));

        let err = Value::Float(1.5)
            .coerce(&DataType::INT)
            .expect_err("float into int");
        assert!(matches!(err, RouteError::TypeMismatch { .. }));

        assert_eq!(
            Value::Int(7).coerce(&DataType::DECIMAL).expect("int into decimal"),
            Value::Decimal(Decimal::from(7))
        );
    }

    #[test]
    fn integers_must_fit_the_column_width() {
        for (data_type, value) in [
            (DataType::TINYINT, Value::Int(1000)),
            (DataType::TINYINT, Value::Int(-129)),
            (DataType::TINYINT.with_unsigned(), Value::UInt(300)),
            (DataType::SMALLINT, Value::Int(40_000)),
            (DataType::MEDIUMINT.with_unsigned(), Value::Int(1 << 24)),
            (DataType::INT, Value::Int(i64::from(i32::MAX) + 1)),
            (DataType::YEAR, Value::Int(2156)),
        ] {
            let err = value.coerce(&data_type).expect_err("out of range");
            assert!(matches!(err, RouteError::TypeMismatch { .. }), "{data_type} {value}");
            assert!(data_type.encode_key(&value).is_err());
            assert!(data_type.encode_value(&value).is_err());
            assert!(data_type.encode_for_wire(&value).is_err());
        }

        assert_eq!(
            Value::Int(-128).coerce(&DataType::TINYINT).expect("tinyint min"),
            Value::Int(-128)
        );
        assert_eq!(
            Value::Int(255)
                .coerce(&DataType::TINYINT.with_unsigned())
                .expect("unsigned tinyint max"),
            Value::UInt(255)
        );
        assert_eq!(
            Value::UInt(u64::MAX)
                .coerce(&DataType::BIGINT_UNSIGNED)
                .expect("bigint unsigned max"),
            Value::UInt(u64::MAX)
        );
        assert!(TypedLiteral::new(DataType::TINYINT, 1000i64).is_err());
    }

    #[test]
    fn coerce_null_respects_nullability() {
        assert_eq!(
            Value::Null.coerce(&DataType::INT).expect("nullable"),
            Value::Null
        );
        let err = Value::Null
            .coerce(&DataType::INT.not_null())
            .expect_err("not null");
        assert!(matches!(err, RouteError::NullViolation { .. }));
    }

    #[test]
    fn typed_literal_equality_ignores_integer_width() {
        let narrow = TypedLiteral::new(DataType::TINYINT, 1i64).expect("tinyint literal");
        let wide = TypedLiteral::new(DataType::BIGINT, 1i64).expect("bigint literal");
        assert_eq!(narrow, wide);
        assert_eq!(narrow.key(), wide.key());
    }

    #[test]
    fn typed_literal_of_unsupported_type_fails() {
        let err = TypedLiteral::new(DataType::SET, "a,b").expect_err("set literal");
        assert_eq!(
            err,
            RouteError::UnsupportedType {
                type_name: "set".to_string()
            }
        );
    }

    #[test]
    fn origin_defaults_parse_per_family() {
        assert_eq!(
            DataType::INT.origin_default_value(" 42 ").expect("int"),
            Value::Int(42)
        );
        assert_eq!(
            DataType::TIME.origin_default_value("-01:02:03.5").expect("time"),
            Value::Duration(-3_723_500_000_000)
        );
        assert_eq!(
            DataType::SET.origin_default_value("a,b").expect("set"),
            Value::Text("a,b".to_string())
        );
        assert!(matches!(
            DataType::JSON.origin_default_value("{}"),
            Err(RouteError::UnsupportedType { .. })
        ));
        assert!(matches!(
            DataType::DATE.origin_default_value("yesterday"),
            Err(RouteError::TypeMismatch { .. })
        ));
        assert!(matches!(
            DataType::TINYINT.origin_default_value("1000"),
            Err(RouteError::TypeMismatch { .. })
        ));
        assert!(matches!(
            DataType::TINYINT.with_unsigned().origin_default_value("300"),
            Err(RouteError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn text_coerces_into_temporal_types() {
        let value = Value::from("2024-02-29 10:11:12.5")
            .coerce(&DataType::DATETIME)
            .expect("datetime text");
        let expected = NaiveDate::from_ymd_opt(2024, 2, 29)
            .and_then(|d| d.and_hms_micro_opt(10, 11, 12, 500_000))
            .expect("valid datetime");
        assert_eq!(value, Value::DateTime(expected));
    }
}
