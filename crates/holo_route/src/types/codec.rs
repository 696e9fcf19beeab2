//! Flag-tagged datum codec.
//!
//! Every encoded datum starts with one flag byte naming its payload layout.
//! Key payloads are order preserving: for two values of the same type,
//! `a < b` implies `encode_key(a) < encode_key(b)` under unsigned byte-wise
//! comparison, and no key encoding is a proper prefix of another.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;

use crate::error::{Result, RouteError};
use crate::types::{DataType, TypeFamily, Value};

pub(crate) const NIL_FLAG: u8 = 0x00;
pub(crate) const BYTES_FLAG: u8 = 0x01;
pub(crate) const COMPACT_BYTES_FLAG: u8 = 0x02;
pub(crate) const INT_FLAG: u8 = 0x03;
pub(crate) const UINT_FLAG: u8 = 0x04;
pub(crate) const FLOAT_FLAG: u8 = 0x05;
pub(crate) const DECIMAL_FLAG: u8 = 0x06;
pub(crate) const DURATION_FLAG: u8 = 0x07;
pub(crate) const VARINT_FLAG: u8 = 0x08;
pub(crate) const UVARINT_FLAG: u8 = 0x09;

const SIGN_FLIP_MASK: u64 = 1u64 << 63;

const GROUP_SIZE: usize = 8;
const GROUP_MARKER: u8 = 0xFF;
const GROUP_PAD: u8 = 0x00;

const DECIMAL_NEGATIVE: u8 = 0x00;
const DECIMAL_ZERO: u8 = 0x01;
const DECIMAL_POSITIVE: u8 = 0x02;
const DECIMAL_POSITIVE_TERMINATOR: u8 = 0x00;
const DECIMAL_NEGATIVE_TERMINATOR: u8 = 0xFF;
const DECIMAL_EXPONENT_BIAS: u32 = 1u32 << 31;

/// Upper bound on significant digits a decoded decimal may carry.
pub(crate) const MAX_DECIMAL_DIGITS: usize = 29;
const MAX_DECIMAL_SCALE: i64 = 28;

const MICROS_BITS: u32 = 24;
const HMS_BITS: u32 = 17;
const MAX_PACKED_YEAR: i32 = 9999;

pub(crate) fn encode_i64_ordered(value: i64) -> [u8; 8] {
    (value as u64 ^ SIGN_FLIP_MASK).to_be_bytes()
}

pub(crate) fn decode_i64_ordered(bytes: [u8; 8]) -> i64 {
    (u64::from_be_bytes(bytes) ^ SIGN_FLIP_MASK) as i64
}

fn encode_f64_ordered(value: f64) -> [u8; 8] {
    // -0.0 and 0.0 compare equal and must share one encoding.
    let value = if value == 0.0 { 0.0 } else { value };
    let bits = value.to_bits();
    let ordered = if bits & SIGN_FLIP_MASK == 0 {
        bits | SIGN_FLIP_MASK
    } else {
        !bits
    };
    ordered.to_be_bytes()
}

fn decode_f64_ordered(bytes: [u8; 8]) -> f64 {
    let ordered = u64::from_be_bytes(bytes);
    let bits = if ordered & SIGN_FLIP_MASK != 0 {
        ordered ^ SIGN_FLIP_MASK
    } else {
        !ordered
    };
    f64::from_bits(bits)
}

pub(crate) fn encode_group_bytes(data: &[u8], out: &mut Vec<u8>) {
    out.reserve((data.len() / GROUP_SIZE + 1) * (GROUP_SIZE + 1));
    let mut chunks = data.chunks_exact(GROUP_SIZE);
    for chunk in &mut chunks {
        out.extend_from_slice(chunk);
        out.push(GROUP_MARKER);
    }
    let tail = chunks.remainder();
    let pad = GROUP_SIZE - tail.len();
    out.extend_from_slice(tail);
    out.extend(std::iter::repeat(GROUP_PAD).take(pad));
    out.push(GROUP_MARKER - pad as u8);
}

fn decode_group_bytes(bytes: &[u8], cursor: &mut usize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let group = read_slice(bytes, cursor, GROUP_SIZE + 1, "bytes group")?;
        let marker = group[GROUP_SIZE];
        let pad = usize::from(GROUP_MARKER - marker);
        if pad > GROUP_SIZE {
            return Err(RouteError::decode(format!(
                "invalid bytes group marker 0x{marker:02x}"
            )));
        }
        let real = GROUP_SIZE - pad;
        if group[real..GROUP_SIZE].iter().any(|b| *b != GROUP_PAD) {
            return Err(RouteError::decode("non-zero padding in bytes group"));
        }
        out.extend_from_slice(&group[..real]);
        if pad != 0 {
            return Ok(out);
        }
    }
}

fn write_uvarint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn write_varint(value: i64, out: &mut Vec<u8>) {
    write_uvarint(((value << 1) ^ (value >> 63)) as u64, out);
}

fn read_uvarint(bytes: &[u8], cursor: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = read_u8(bytes, cursor)?;
        if shift == 63 && byte > 1 {
            return Err(RouteError::decode("varint overflows u64"));
        }
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift > 63 {
            return Err(RouteError::decode("varint overflows u64"));
        }
    }
}

fn read_varint(bytes: &[u8], cursor: &mut usize) -> Result<i64> {
    let raw = read_uvarint(bytes, cursor)?;
    Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
}

fn encode_decimal(value: Decimal, out: &mut Vec<u8>) {
    if value.is_zero() {
        out.push(DECIMAL_ZERO);
        return;
    }
    let negative = value.is_sign_negative();
    let value = value.normalize();
    let all_digits = value.mantissa().unsigned_abs().to_string();
    let exponent = all_digits.len() as i64 - 1 - i64::from(value.scale());
    let digits = all_digits.trim_end_matches('0');
    let exponent = (exponent as i32 as u32 ^ DECIMAL_EXPONENT_BIAS).to_be_bytes();

    if negative {
        out.push(DECIMAL_NEGATIVE);
        out.extend(exponent.iter().map(|b| !b));
        out.extend(digits.bytes().map(|b| !b));
        out.push(DECIMAL_NEGATIVE_TERMINATOR);
    } else {
        out.push(DECIMAL_POSITIVE);
        out.extend_from_slice(&exponent);
        out.extend_from_slice(digits.as_bytes());
        out.push(DECIMAL_POSITIVE_TERMINATOR);
    }
}

fn decode_decimal(bytes: &[u8], cursor: &mut usize) -> Result<Decimal> {
    let negative = match read_u8(bytes, cursor)? {
        DECIMAL_ZERO => return Ok(Decimal::ZERO),
        DECIMAL_NEGATIVE => true,
        DECIMAL_POSITIVE => false,
        other => {
            return Err(RouteError::decode(format!(
                "invalid decimal sign marker 0x{other:02x}"
            )))
        }
    };
    let mut exponent = read_array::<4>(bytes, cursor)?;
    if negative {
        exponent.iter_mut().for_each(|b| *b = !*b);
    }
    let exponent = i64::from((u32::from_be_bytes(exponent) ^ DECIMAL_EXPONENT_BIAS) as i32);

    let terminator = if negative {
        DECIMAL_NEGATIVE_TERMINATOR
    } else {
        DECIMAL_POSITIVE_TERMINATOR
    };
    let mut mantissa = 0i128;
    let mut digit_count = 0usize;
    loop {
        let raw = read_u8(bytes, cursor)?;
        if raw == terminator {
            break;
        }
        let digit = if negative { !raw } else { raw };
        if !digit.is_ascii_digit() {
            return Err(RouteError::decode(format!(
                "invalid decimal digit byte 0x{raw:02x}"
            )));
        }
        digit_count += 1;
        if digit_count > MAX_DECIMAL_DIGITS {
            return Err(RouteError::decode("decimal has too many digits"));
        }
        mantissa = mantissa * 10 + i128::from(digit - b'0');
    }
    if digit_count == 0 {
        return Err(RouteError::decode("decimal without digits"));
    }

    let mut scale = digit_count as i64 - 1 - exponent;
    if scale < 0 {
        let factor = u32::try_from(-scale)
            .ok()
            .and_then(|pow| 10i128.checked_pow(pow))
            .ok_or_else(|| RouteError::decode("decimal exponent out of range"))?;
        mantissa = mantissa
            .checked_mul(factor)
            .ok_or_else(|| RouteError::decode("decimal exponent out of range"))?;
        scale = 0;
    }
    if scale > MAX_DECIMAL_SCALE {
        return Err(RouteError::decode("decimal scale out of range"));
    }
    if negative {
        mantissa = -mantissa;
    }
    Decimal::try_from_i128_with_scale(mantissa, scale as u32)
        .map_err(|err| RouteError::decode(format!("decimal out of range: {err}")))
}

fn pack_datetime(value: &NaiveDateTime) -> Option<u64> {
    if !(0..=MAX_PACKED_YEAR).contains(&value.year()) {
        return None;
    }
    let ymd = ((value.year() as u64 * 13 + u64::from(value.month())) << 5) | u64::from(value.day());
    let hms = (u64::from(value.hour()) << 12)
        | (u64::from(value.minute()) << 6)
        | u64::from(value.second());
    let micros = u64::from(value.nanosecond() / 1_000);
    Some((((ymd << HMS_BITS) | hms) << MICROS_BITS) | micros)
}

fn unpack_datetime(packed: u64) -> Result<NaiveDateTime> {
    let micros = (packed & ((1 << MICROS_BITS) - 1)) as u32;
    let ymdhms = packed >> MICROS_BITS;
    let hms = ymdhms & ((1 << HMS_BITS) - 1);
    let ymd = ymdhms >> HMS_BITS;
    let day = (ymd & 0x1F) as u32;
    let year_month = ymd >> 5;
    let month = (year_month % 13) as u32;
    let year = (year_month / 13) as i32;
    let second = (hms & 0x3F) as u32;
    let minute = ((hms >> 6) & 0x3F) as u32;
    let hour = (hms >> 12) as u32;
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_micro_opt(hour, minute, second, micros))
        .ok_or_else(|| RouteError::decode(format!("invalid packed datetime {packed}")))
}

fn packed_temporal(data_type: &DataType, value: &Value) -> Result<u64> {
    let datetime = match value {
        Value::Date(date) => date.and_time(chrono::NaiveTime::MIN),
        Value::DateTime(datetime) => *datetime,
        other => return Err(mismatch(data_type, other)),
    };
    pack_datetime(&datetime).ok_or_else(|| mismatch(data_type, value))
}

fn mismatch(data_type: &DataType, value: &Value) -> RouteError {
    RouteError::TypeMismatch {
        type_name: data_type.to_string(),
        value: value.to_string(),
    }
}

pub(crate) fn encode_key(data_type: &DataType, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    data_type.ensure_supported()?;
    let value = value.coerce(data_type)?;
    match &value {
        Value::Null => out.push(NIL_FLAG),
        Value::Int(v) => {
            out.push(INT_FLAG);
            out.extend_from_slice(&encode_i64_ordered(*v));
        }
        Value::UInt(v) | Value::Enum(v) => {
            out.push(UINT_FLAG);
            out.extend_from_slice(&v.to_be_bytes());
        }
        Value::Float(v) => {
            out.push(FLOAT_FLAG);
            out.extend_from_slice(&encode_f64_ordered(*v));
        }
        Value::Decimal(v) => {
            out.push(DECIMAL_FLAG);
            encode_decimal(*v, out);
        }
        Value::Text(v) => {
            out.push(BYTES_FLAG);
            encode_group_bytes(v.as_bytes(), out);
        }
        Value::Bytes(v) => {
            out.push(BYTES_FLAG);
            encode_group_bytes(v, out);
        }
        Value::Date(_) | Value::DateTime(_) => {
            let packed = packed_temporal(data_type, &value)?;
            out.push(UINT_FLAG);
            out.extend_from_slice(&packed.to_be_bytes());
        }
        Value::Duration(v) => {
            out.push(DURATION_FLAG);
            out.extend_from_slice(&encode_i64_ordered(*v));
        }
    }
    Ok(())
}

pub(crate) fn encode_value(data_type: &DataType, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    data_type.ensure_supported()?;
    let value = value.coerce(data_type)?;
    match &value {
        Value::Null => out.push(NIL_FLAG),
        Value::Int(v) => {
            out.push(VARINT_FLAG);
            write_varint(*v, out);
        }
        Value::UInt(v) | Value::Enum(v) => {
            out.push(UVARINT_FLAG);
            write_uvarint(*v, out);
        }
        Value::Text(v) => {
            out.push(COMPACT_BYTES_FLAG);
            write_uvarint(v.len() as u64, out);
            out.extend_from_slice(v.as_bytes());
        }
        Value::Bytes(v) => {
            out.push(COMPACT_BYTES_FLAG);
            write_uvarint(v.len() as u64, out);
            out.extend_from_slice(v);
        }
        // The remaining layouts are already compact.
        _ => encode_key(data_type, &value, out)?,
    }
    Ok(())
}

/// Flagless payload for the remote expression protocol. NULL has an empty
/// payload; the node type carries the nullness.
pub(crate) fn encode_wire(data_type: &DataType, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    data_type.ensure_supported()?;
    let value = value.coerce(data_type)?;
    match &value {
        Value::Null => {}
        Value::Int(v) => out.extend_from_slice(&encode_i64_ordered(*v)),
        Value::UInt(v) | Value::Enum(v) => out.extend_from_slice(&v.to_be_bytes()),
        Value::Float(v) => out.extend_from_slice(&encode_f64_ordered(*v)),
        Value::Decimal(v) => encode_decimal(*v, out),
        Value::Text(v) => out.extend_from_slice(v.as_bytes()),
        Value::Bytes(v) => out.extend_from_slice(v),
        Value::Date(_) | Value::DateTime(_) => {
            out.extend_from_slice(&packed_temporal(data_type, &value)?.to_be_bytes())
        }
        Value::Duration(v) => out.extend_from_slice(&encode_i64_ordered(*v)),
    }
    Ok(())
}

/// Decodes one datum written by either [`encode_key`] or [`encode_value`]
/// starting at `cursor`, advancing it past the datum.
pub(crate) fn decode(data_type: &DataType, bytes: &[u8], cursor: &mut usize) -> Result<Value> {
    data_type.ensure_supported()?;
    let flag = read_u8(bytes, cursor)?;
    let family = data_type.family();
    match flag {
        NIL_FLAG => Ok(Value::Null),
        INT_FLAG => {
            let raw = decode_i64_ordered(read_array(bytes, cursor)?);
            signed_value(data_type, raw)
        }
        VARINT_FLAG => {
            let raw = read_varint(bytes, cursor)?;
            signed_value(data_type, raw)
        }
        UINT_FLAG => {
            let raw = u64::from_be_bytes(read_array(bytes, cursor)?);
            unsigned_value(data_type, raw)
        }
        UVARINT_FLAG => {
            let raw = read_uvarint(bytes, cursor)?;
            unsigned_value(data_type, raw)
        }
        FLOAT_FLAG if family == TypeFamily::Float => {
            Ok(Value::Float(decode_f64_ordered(read_array(bytes, cursor)?)))
        }
        DECIMAL_FLAG if family == TypeFamily::Decimal => {
            Ok(Value::Decimal(decode_decimal(bytes, cursor)?))
        }
        BYTES_FLAG if matches!(family, TypeFamily::Text | TypeFamily::Bytes) => {
            let raw = decode_group_bytes(bytes, cursor)?;
            bytes_value(data_type, raw)
        }
        COMPACT_BYTES_FLAG if matches!(family, TypeFamily::Text | TypeFamily::Bytes) => {
            let len = usize::try_from(read_uvarint(bytes, cursor)?)
                .map_err(|_| RouteError::decode("compact bytes length overflows usize"))?;
            let raw = read_slice(bytes, cursor, len, "compact bytes")?.to_vec();
            bytes_value(data_type, raw)
        }
        DURATION_FLAG if family == TypeFamily::Duration => Ok(Value::Duration(
            decode_i64_ordered(read_array(bytes, cursor)?),
        )),
        other => Err(invalid_flag(data_type, other)),
    }
}

fn invalid_flag(data_type: &DataType, flag: u8) -> RouteError {
    RouteError::decode(format!("flag 0x{flag:02x} is not valid for type {data_type}"))
}

fn signed_value(data_type: &DataType, raw: i64) -> Result<Value> {
    match data_type.family() {
        TypeFamily::Integer if data_type.unsigned => u64::try_from(raw)
            .map(Value::UInt)
            .map_err(|_| RouteError::decode(format!("negative value {raw} for {data_type}"))),
        TypeFamily::Integer => Ok(Value::Int(raw)),
        _ => Err(invalid_flag(data_type, INT_FLAG)),
    }
}

fn unsigned_value(data_type: &DataType, raw: u64) -> Result<Value> {
    match data_type.family() {
        TypeFamily::Integer if data_type.unsigned => Ok(Value::UInt(raw)),
        TypeFamily::Integer => i64::try_from(raw)
            .map(Value::Int)
            .map_err(|_| RouteError::decode(format!("value {raw} overflows {data_type}"))),
        TypeFamily::Date => Ok(Value::Date(unpack_datetime(raw)?.date())),
        TypeFamily::DateTime => Ok(Value::DateTime(unpack_datetime(raw)?)),
        TypeFamily::Enum => Ok(Value::Enum(raw)),
        _ => Err(invalid_flag(data_type, UINT_FLAG)),
    }
}

fn bytes_value(data_type: &DataType, raw: Vec<u8>) -> Result<Value> {
    if data_type.family() == TypeFamily::Bytes {
        return Ok(Value::Bytes(raw));
    }
    String::from_utf8(raw)
        .map(Value::Text)
        .map_err(|_| RouteError::decode(format!("invalid utf-8 for {data_type}")))
}

fn read_u8(bytes: &[u8], cursor: &mut usize) -> Result<u8> {
    let byte = *bytes
        .get(*cursor)
        .ok_or_else(|| RouteError::decode("buffer underflow while decoding u8"))?;
    *cursor += 1;
    Ok(byte)
}

fn read_array<const N: usize>(bytes: &[u8], cursor: &mut usize) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(read_slice(bytes, cursor, N, "fixed-width payload")?);
    Ok(out)
}

fn read_slice<'a>(bytes: &'a [u8], cursor: &mut usize, len: usize, what: &str) -> Result<&'a [u8]> {
    let end = cursor
        .checked_add(len)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| RouteError::decode(format!("buffer underflow while decoding {what}")))?;
    let out = &bytes[*cursor..end];
    *cursor = end;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn key(data_type: DataType, value: impl Into<Value>) -> Vec<u8> {
        data_type.encode_key(&value.into()).expect("encode key")
    }

    fn assert_strictly_ascending(keys: &[Vec<u8>]) {
        for pair in keys.windows(2) {
            assert!(
                pair[0] < pair[1],
                "{} !< {}",
                hex::encode(&pair[0]),
                hex::encode(&pair[1])
            );
        }
    }

    #[test]
    fn signed_integer_keys_sort_across_zero() {
        let keys: Vec<_> = [i64::MIN, -300, -1, 0, 1, 255, i64::MAX]
            .into_iter()
            .map(|v| key(DataType::BIGINT, v))
            .collect();
        assert_strictly_ascending(&keys);
        assert_eq!(keys[3], vec![INT_FLAG, 0x80, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn null_sorts_before_every_value() {
        let null = key(DataType::BIGINT, Value::Null);
        assert_eq!(null, vec![NIL_FLAG]);
        assert!(null < key(DataType::BIGINT, i64::MIN));
        assert!(null < key(DataType::VARCHAR, ""));
    }

    #[test]
    fn byte_groups_pad_full_chunks_and_keep_prefix_order() {
        assert_eq!(
            key(DataType::VARCHAR, "abc"),
            vec![BYTES_FLAG, b'a', b'b', b'c', 0, 0, 0, 0, 0, 0xFA]
        );
        let eight = key(DataType::VARCHAR, "abcdefgh");
        assert_eq!(eight.len(), 1 + 18);
        assert_eq!(eight[9], 0xFF);
        assert_eq!(eight[18], 0xF7);

        let keys: Vec<_> = ["", "a", "a\0", "ab", "abcdefgh", "abcdefgh\0", "b"]
            .into_iter()
            .map(|v| key(DataType::VARCHAR, v))
            .collect();
        assert_strictly_ascending(&keys);
        for (i, a) in keys.iter().enumerate() {
            for (j, b) in keys.iter().enumerate() {
                if i != j {
                    assert!(!b.starts_with(a), "key {i} is a prefix of key {j}");
                }
            }
        }
    }

    #[test]
    fn decimal_keys_follow_numeric_order() {
        let values = [
            "-1000", "-10", "-1.5", "-1", "-0.01", "0", "0.01", "0.1", "1", "1.5", "10",
            "100", "1000.5",
        ];
        let keys: Vec<_> = values
            .iter()
            .map(|v| key(DataType::DECIMAL, Decimal::from_str(v).expect("decimal")))
            .collect();
        assert_strictly_ascending(&keys);

        for (raw, encoded) in values.iter().zip(&keys) {
            let decoded = DataType::DECIMAL.decode(encoded).expect("decode decimal");
            assert_eq!(
                decoded,
                Value::Decimal(Decimal::from_str(raw).expect("decimal"))
            );
        }
    }

    #[test]
    fn equal_decimals_with_different_scale_share_a_key() {
        let a = key(DataType::DECIMAL, Decimal::from_str("1.50").expect("decimal"));
        let b = key(DataType::DECIMAL, Decimal::from_str("1.5").expect("decimal"));
        assert_eq!(a, b);
    }

    #[test]
    fn float_keys_sort_and_collapse_negative_zero() {
        let keys: Vec<_> = [f64::NEG_INFINITY, -2.5, -0.5, 0.0, 0.5, 2.5, f64::INFINITY]
            .into_iter()
            .map(|v| key(DataType::DOUBLE, v))
            .collect();
        assert_strictly_ascending(&keys);
        assert_eq!(key(DataType::DOUBLE, -0.0), key(DataType::DOUBLE, 0.0));
        assert!(matches!(
            DataType::DOUBLE.encode_key(&Value::Float(f64::NAN)),
            Err(RouteError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn datetime_packs_under_uint_flag() {
        let value = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_micro_opt(13, 45, 30, 250))
            .expect("valid datetime");
        let encoded = key(DataType::DATETIME, Value::DateTime(value));
        assert_eq!(encoded[0], UINT_FLAG);

        let ymd = ((2024u64 * 13 + 3) << 5) | 9;
        let hms = (13u64 << 12) | (45 << 6) | 30;
        let packed = (((ymd << 17) | hms) << 24) | 250;
        assert_eq!(&encoded[1..], &packed.to_be_bytes());
        assert_eq!(
            DataType::DATETIME.decode(&encoded).expect("decode"),
            Value::DateTime(value)
        );

        let date = NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date");
        let date_key = key(DataType::DATE, Value::Date(date));
        assert!(date_key < encoded);
        assert_eq!(
            DataType::DATE.decode(&date_key).expect("decode date"),
            Value::Date(date)
        );
    }

    #[test]
    fn value_encoding_is_compact_and_decodes() {
        let encoded = DataType::BIGINT
            .encode_value(&Value::Int(-2))
            .expect("encode value");
        assert_eq!(encoded, vec![VARINT_FLAG, 0x03]);
        assert_eq!(
            DataType::BIGINT.decode(&encoded).expect("decode"),
            Value::Int(-2)
        );

        let text = DataType::VARCHAR
            .encode_value(&Value::from("héllo"))
            .expect("encode text");
        assert_eq!(text[0], COMPACT_BYTES_FLAG);
        assert_eq!(text[1] as usize, "héllo".len());
        assert_eq!(
            DataType::VARCHAR.decode(&text).expect("decode text"),
            Value::from("héllo")
        );

        let big = DataType::BIGINT_UNSIGNED
            .encode_value(&Value::UInt(u64::MAX))
            .expect("encode uvarint");
        assert_eq!(big.len(), 11);
        assert_eq!(
            DataType::BIGINT_UNSIGNED.decode(&big).expect("decode uvarint"),
            Value::UInt(u64::MAX)
        );
    }

    #[test]
    fn wire_payloads_carry_no_flag() {
        assert_eq!(
            DataType::INT.encode_for_wire(&Value::Int(1)).expect("wire"),
            encode_i64_ordered(1).to_vec()
        );
        assert_eq!(
            DataType::VARCHAR
                .encode_for_wire(&Value::from("ab"))
                .expect("wire"),
            b"ab".to_vec()
        );
        assert!(DataType::INT
            .encode_for_wire(&Value::Null)
            .expect("wire")
            .is_empty());
    }

    #[test]
    fn unsupported_types_fail_every_codec_operation() {
        for data_type in [DataType::SET, DataType::JSON, DataType::GEOMETRY] {
            let value = Value::from("a");
            let expected = RouteError::unsupported(data_type.to_string());
            assert_eq!(data_type.encode_key(&value), Err(expected.clone()));
            assert_eq!(data_type.encode_value(&value), Err(expected.clone()));
            assert_eq!(data_type.encode_for_wire(&value), Err(expected.clone()));
            assert_eq!(data_type.decode(&[BYTES_FLAG]), Err(expected));
        }
    }

    #[test]
    fn corrupt_input_fails_with_decode_errors() {
        let truncated = &key(DataType::BIGINT, 7i64)[..5];
        assert!(matches!(
            DataType::BIGINT.decode(truncated),
            Err(RouteError::Decode(_))
        ));
        assert!(matches!(
            DataType::VARCHAR.decode(&[FLOAT_FLAG, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(RouteError::Decode(_))
        ));
        assert!(matches!(
            DataType::VARCHAR.decode(&[BYTES_FLAG, b'a', 0, 0, 0, 0, 0, 0, 0, 0x10]),
            Err(RouteError::Decode(_))
        ));
        assert!(matches!(
            DataType::BIGINT.decode(&[0x7E]),
            Err(RouteError::Decode(_))
        ));
    }

    #[test]
    fn duration_and_enum_keys_sort_by_payload() {
        let keys: Vec<_> = [-5_000i64, 0, 5_000]
            .into_iter()
            .map(|v| key(DataType::TIME, Value::Duration(v)))
            .collect();
        assert_strictly_ascending(&keys);
        assert_eq!(keys[0][0], DURATION_FLAG);

        let first = key(DataType::ENUM, Value::Enum(1));
        let second = key(DataType::ENUM, Value::Enum(2));
        assert_eq!(first[0], UINT_FLAG);
        assert!(first < second);
        assert_eq!(
            DataType::ENUM.decode(&second).expect("decode enum"),
            Value::Enum(2)
        );
    }
}
