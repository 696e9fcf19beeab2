use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime};
use holo_route::{DataType, RouteError, Value};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn key(data_type: DataType, value: &Value) -> Vec<u8> {
    data_type.encode_key(value).expect("encode key")
}

fn assert_order_preserved(data_type: DataType, left: Value, right: Value, expected: Ordering) {
    let left_key = key(data_type, &left);
    let right_key = key(data_type, &right);
    match expected {
        Ordering::Less => assert!(left_key < right_key, "{left:?} vs {right:?}"),
        Ordering::Greater => assert!(left_key > right_key, "{left:?} vs {right:?}"),
        Ordering::Equal => assert_eq!(left_key, right_key, "{left:?} vs {right:?}"),
    }
}

fn assert_round_trips(data_type: DataType, value: Value) {
    let stored = data_type.encode_value(&value).expect("encode value");
    assert_eq!(data_type.decode(&stored).expect("decode value"), value);
    let keyed = key(data_type, &value);
    assert_eq!(data_type.decode(&keyed).expect("decode key"), value);
}

fn datetime_strategy() -> impl Strategy<Value = NaiveDateTime> {
    (
        1000i32..=9999,
        1u32..=12,
        1u32..=28,
        0u32..24,
        0u32..60,
        0u32..60,
        0u32..1_000_000,
    )
        .prop_map(|(year, month, day, hour, minute, second, micro)| {
            NaiveDate::from_ymd_opt(year, month, day)
                .and_then(|date| date.and_hms_micro_opt(hour, minute, second, micro))
                .expect("valid datetime")
        })
}

proptest! {
    #[test]
    fn signed_integer_order(left in any::<i64>(), right in any::<i64>()) {
        assert_order_preserved(DataType::BIGINT, Value::Int(left), Value::Int(right), left.cmp(&right));
        assert_round_trips(DataType::BIGINT, Value::Int(left));
    }

    #[test]
    fn unsigned_integer_order(left in any::<u64>(), right in any::<u64>()) {
        assert_order_preserved(
            DataType::BIGINT_UNSIGNED,
            Value::UInt(left),
            Value::UInt(right),
            left.cmp(&right),
        );
        assert_round_trips(DataType::BIGINT_UNSIGNED, Value::UInt(left));
    }

    #[test]
    fn float_order(left in -1.0e12f64..1.0e12, right in -1.0e12f64..1.0e12) {
        if let Some(expected) = left.partial_cmp(&right) {
            assert_order_preserved(DataType::DOUBLE, Value::Float(left), Value::Float(right), expected);
        }
        assert_round_trips(DataType::DOUBLE, Value::Float(left));
    }

    #[test]
    fn decimal_order(
        left in (any::<i64>(), 0u32..12),
        right in (any::<i64>(), 0u32..12),
    ) {
        let left = Decimal::new(left.0, left.1);
        let right = Decimal::new(right.0, right.1);
        assert_order_preserved(
            DataType::DECIMAL,
            Value::Decimal(left),
            Value::Decimal(right),
            left.cmp(&right),
        );
        assert_round_trips(DataType::DECIMAL, Value::Decimal(left));
    }

    #[test]
    fn text_order(left in ".{0,24}", right in ".{0,24}") {
        assert_order_preserved(
            DataType::VARCHAR,
            Value::Text(left.clone()),
            Value::Text(right.clone()),
            left.cmp(&right),
        );
        assert_round_trips(DataType::VARCHAR, Value::Text(left));
    }

    #[test]
    fn bytes_order(
        left in prop::collection::vec(any::<u8>(), 0..40),
        right in prop::collection::vec(any::<u8>(), 0..40),
    ) {
        assert_order_preserved(
            DataType::BLOB,
            Value::Bytes(left.clone()),
            Value::Bytes(right.clone()),
            left.cmp(&right),
        );
        assert_round_trips(DataType::BLOB, Value::Bytes(left));
    }

    #[test]
    fn datetime_order(left in datetime_strategy(), right in datetime_strategy()) {
        assert_order_preserved(
            DataType::DATETIME,
            Value::DateTime(left),
            Value::DateTime(right),
            left.cmp(&right),
        );
        assert_round_trips(DataType::DATETIME, Value::DateTime(left));
    }

    #[test]
    fn null_sorts_first(value in any::<i64>()) {
        assert_order_preserved(DataType::BIGINT, Value::Null, Value::Int(value), Ordering::Less);
    }
}

#[test]
fn unsupported_types_produce_no_bytes() {
    for data_type in [DataType::SET, DataType::JSON, DataType::GEOMETRY] {
        let value = Value::Text("a".to_string());
        for result in [
            data_type.encode_key(&value),
            data_type.encode_value(&value),
            data_type.encode_for_wire(&value),
        ] {
            assert!(matches!(result, Err(RouteError::UnsupportedType { .. })));
        }
        assert!(matches!(
            data_type.decode(&[0x01, b'a']),
            Err(RouteError::UnsupportedType { .. })
        ));
    }
}
