//! MySQL Column Values
//!
//! Decodes a single column value out of a row image, driven by the
//! `(type, metadata)` pair recorded in the governing table map. Integer
//! columns are decoded unsigned; the binlog carries no signedness
//! information at this format version.

use std::io::{Read, Seek};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::ColumnType;
use crate::error::{Error, Result};
use crate::event::table_map::ColumnMetadata;
use crate::reader::EventReader;

/// A decoded MySQL column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    UInt(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Exact decimal rendered as text, e.g. `-1234.5678`
    Decimal(String),
    /// 1-based index into the column's value list
    Enum(u64),
    /// Member bitmask over the column's value list
    Set(u64),
    Bit(u64),
    Timestamp(DateTime<Utc>),
    Date {
        year: u16,
        month: u8,
        day: u8,
    },
    Time {
        hours: u32,
        minutes: u8,
        seconds: u8,
    },
    DateTime {
        year: u16,
        month: u8,
        day: u8,
        hours: u8,
        minutes: u8,
        seconds: u8,
    },
    Year(u16),
}

/// Decode one column value using its table-map type and metadata.
pub fn read_value<R: Read + Seek>(
    reader: &mut EventReader<R>,
    column_type: ColumnType,
    metadata: &ColumnMetadata,
) -> Result<Value> {
    match (column_type, metadata) {
        (ColumnType::Tiny, _) => Ok(Value::UInt(reader.read_uint(1)?)),
        (ColumnType::Short, _) => Ok(Value::UInt(reader.read_uint(2)?)),
        (ColumnType::Int24, _) => Ok(Value::UInt(reader.read_uint(3)?)),
        (ColumnType::Long, _) => Ok(Value::UInt(reader.read_uint(4)?)),
        (ColumnType::LongLong, _) => Ok(Value::UInt(reader.read_u64()?)),

        (ColumnType::Float, ColumnMetadata::PackLength { size: 8 }) => {
            Ok(Value::Double(reader.read_f64()?))
        }
        (ColumnType::Float, ColumnMetadata::PackLength { .. }) => {
            Ok(Value::Float(reader.read_f32()?))
        }
        (ColumnType::Double, ColumnMetadata::PackLength { size: 4 }) => {
            Ok(Value::Float(reader.read_f32()?))
        }
        (ColumnType::Double, ColumnMetadata::PackLength { .. }) => {
            Ok(Value::Double(reader.read_f64()?))
        }

        (ColumnType::Timestamp, _) => {
            let seconds = reader.read_u32()?;
            // In range for any u32, so the fallback never fires
            let when = DateTime::from_timestamp(i64::from(seconds), 0)
                .unwrap_or(DateTime::UNIX_EPOCH);
            Ok(Value::Timestamp(when))
        }
        (ColumnType::Year, _) => {
            let offset = reader.read_u8()?;
            Ok(Value::Year(1900 + u16::from(offset)))
        }
        (ColumnType::Date, _) => {
            let packed = reader.read_uint(3)?;
            Ok(Value::Date {
                year: (packed >> 9) as u16,
                month: ((packed >> 5) & 0x0F) as u8,
                day: (packed & 0x1F) as u8,
            })
        }
        (ColumnType::Time, _) => {
            let packed = reader.read_uint(3)?;
            Ok(Value::Time {
                hours: (packed / 10_000) as u32,
                minutes: ((packed / 100) % 100) as u8,
                seconds: (packed % 100) as u8,
            })
        }
        (ColumnType::DateTime, _) => {
            let packed = reader.read_u64()?;
            let date = packed / 1_000_000;
            let time = packed % 1_000_000;
            Ok(Value::DateTime {
                year: (date / 10_000) as u16,
                month: ((date / 100) % 100) as u8,
                day: (date % 100) as u8,
                hours: (time / 10_000) as u8,
                minutes: ((time / 100) % 100) as u8,
                seconds: (time % 100) as u8,
            })
        }

        (ColumnType::Varchar, ColumnMetadata::MaxLength { max_length }) => {
            let prefix = if *max_length > 255 { 2 } else { 1 };
            let len = reader.read_uint(prefix)? as usize;
            Ok(Value::String(reader.read_string(len)?))
        }
        (ColumnType::String | ColumnType::VarString, ColumnMetadata::StringPack { .. }) => {
            let len = reader.read_u8()? as usize;
            Ok(Value::String(reader.read_string(len)?))
        }

        (ColumnType::Bit, ColumnMetadata::Bits { bits }) => {
            let bytes = (usize::from(*bits) + 7) / 8;
            Ok(Value::Bit(reader.read_uint(bytes)?))
        }
        (ColumnType::Enum, ColumnMetadata::EnumSize { size }) => {
            Ok(Value::Enum(reader.read_uint(usize::from(*size))?))
        }
        (ColumnType::Set, ColumnMetadata::EnumSize { size }) => {
            Ok(Value::Set(reader.read_uint(usize::from(*size))?))
        }

        (ColumnType::Blob, ColumnMetadata::LengthSize { length_size }) => {
            let len = reader.read_uint(usize::from(*length_size))? as usize;
            Ok(Value::Bytes(reader.read_bytes(len)?))
        }
        (ColumnType::Geometry, ColumnMetadata::LengthSize { length_size }) => {
            let len = reader.read_uint(usize::from(*length_size))? as usize;
            Ok(Value::Bytes(reader.read_bytes(len)?))
        }

        (ColumnType::NewDecimal, ColumnMetadata::Decimal { precision, decimals }) => Ok(
            Value::Decimal(read_decimal(reader, *precision, *decimals)?),
        ),

        (other, _) => Err(Error::UnsupportedColumnValue(other)),
    }
}

const DIGITS_PER_GROUP: usize = 9;
/// Storage bytes for a partial group of 0..=8 decimal digits
const COMPRESSED_BYTES: [usize; 9] = [0, 1, 1, 2, 2, 3, 3, 4, 4];

/// Decode a packed NEWDECIMAL value into its text form.
///
/// The storage format splits digits into big-endian groups of nine per
/// four bytes, with shorter leading/trailing groups packed into fewer
/// bytes. The sign lives in the top bit of the first byte; negative
/// values are stored bitwise-complemented.
fn read_decimal<R: Read + Seek>(
    reader: &mut EventReader<R>,
    precision: u8,
    decimals: u8,
) -> Result<String> {
    let integral = usize::from(precision).saturating_sub(usize::from(decimals));
    let scale = usize::from(decimals);

    let full_integral = integral / DIGITS_PER_GROUP;
    let part_integral = integral % DIGITS_PER_GROUP;
    let full_fractional = scale / DIGITS_PER_GROUP;
    let part_fractional = scale % DIGITS_PER_GROUP;

    let stored = 4 * full_integral
        + COMPRESSED_BYTES[part_integral]
        + 4 * full_fractional
        + COMPRESSED_BYTES[part_fractional];
    if stored == 0 {
        return Ok("0".to_string());
    }

    let mut bytes = reader.read_bytes(stored)?;
    let negative = bytes[0] & 0x80 == 0;
    bytes[0] ^= 0x80;
    if negative {
        for b in &mut bytes {
            *b = !*b;
        }
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }

    let mut pos = 0;
    let mut take = |n: usize| {
        let group = be_uint(&bytes[pos..pos + n]);
        pos += n;
        group
    };

    let mut started = false;
    let lead = COMPRESSED_BYTES[part_integral];
    if lead > 0 {
        let group = take(lead);
        if group > 0 {
            started = true;
            out.push_str(&group.to_string());
        }
    }
    for _ in 0..full_integral {
        let group = take(4);
        if started {
            out.push_str(&format!("{:09}", group));
        } else if group > 0 {
            started = true;
            out.push_str(&group.to_string());
        }
    }
    if !started {
        out.push('0');
    }

    if scale > 0 {
        out.push('.');
        for _ in 0..full_fractional {
            let group = take(4);
            out.push_str(&format!("{:09}", group));
        }
        let tail = COMPRESSED_BYTES[part_fractional];
        if tail > 0 {
            let group = take(tail);
            out.push_str(&format!("{:0width$}", group, width = part_fractional));
        }
    }

    Ok(out)
}

fn be_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, b| (acc << 8) | u64::from(*b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(bytes: &[u8]) -> EventReader<Cursor<&[u8]>> {
        EventReader::new(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_unsigned_integers() {
        let mut r = reader(&[0x2A]);
        assert_eq!(
            read_value(&mut r, ColumnType::Tiny, &ColumnMetadata::None).unwrap(),
            Value::UInt(42)
        );

        let mut r = reader(&[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(
            read_value(&mut r, ColumnType::Long, &ColumnMetadata::None).unwrap(),
            Value::UInt(1)
        );
    }

    #[test]
    fn test_varchar_short_prefix() {
        let mut r = reader(b"\x05hello");
        let meta = ColumnMetadata::MaxLength { max_length: 20 };
        assert_eq!(
            read_value(&mut r, ColumnType::Varchar, &meta).unwrap(),
            Value::String("hello".to_string())
        );
    }

    #[test]
    fn test_varchar_long_prefix() {
        let mut r = reader(b"\x05\x00hello");
        let meta = ColumnMetadata::MaxLength { max_length: 300 };
        assert_eq!(
            read_value(&mut r, ColumnType::Varchar, &meta).unwrap(),
            Value::String("hello".to_string())
        );
    }

    #[test]
    fn test_bit_value() {
        let mut r = reader(&[0xFF, 0x03]);
        let meta = ColumnMetadata::Bits { bits: 10 };
        assert_eq!(
            read_value(&mut r, ColumnType::Bit, &meta).unwrap(),
            Value::Bit(0x3FF)
        );
    }

    #[test]
    fn test_enum_and_set() {
        let mut r = reader(&[0x02]);
        let meta = ColumnMetadata::EnumSize { size: 1 };
        assert_eq!(
            read_value(&mut r, ColumnType::Enum, &meta).unwrap(),
            Value::Enum(2)
        );

        let mut r = reader(&[0x05, 0x00]);
        let meta = ColumnMetadata::EnumSize { size: 2 };
        assert_eq!(
            read_value(&mut r, ColumnType::Set, &meta).unwrap(),
            Value::Set(0b101)
        );
    }

    #[test]
    fn test_blob_with_two_byte_length() {
        let mut r = reader(&[0x03, 0x00, 0xAA, 0xBB, 0xCC]);
        let meta = ColumnMetadata::LengthSize { length_size: 2 };
        assert_eq!(
            read_value(&mut r, ColumnType::Blob, &meta).unwrap(),
            Value::Bytes(vec![0xAA, 0xBB, 0xCC])
        );
    }

    #[test]
    fn test_temporal_packed_formats() {
        // 2024-03-07 as (2024 << 9) | (3 << 5) | 7
        let packed: u64 = (2024 << 9) | (3 << 5) | 7;
        let mut bytes = packed.to_le_bytes().to_vec();
        bytes.truncate(3);
        let mut r = reader(&bytes);
        assert_eq!(
            read_value(&mut r, ColumnType::Date, &ColumnMetadata::None).unwrap(),
            Value::Date {
                year: 2024,
                month: 3,
                day: 7
            }
        );

        let mut bytes = 123456u64.to_le_bytes().to_vec();
        bytes.truncate(3);
        let mut r = reader(&bytes);
        assert_eq!(
            read_value(&mut r, ColumnType::Time, &ColumnMetadata::None).unwrap(),
            Value::Time {
                hours: 12,
                minutes: 34,
                seconds: 56
            }
        );

        let bytes = 20240307123456u64.to_le_bytes();
        let mut r = reader(&bytes);
        assert_eq!(
            read_value(&mut r, ColumnType::DateTime, &ColumnMetadata::None).unwrap(),
            Value::DateTime {
                year: 2024,
                month: 3,
                day: 7,
                hours: 12,
                minutes: 34,
                seconds: 56
            }
        );
    }

    #[test]
    fn test_timestamp_epoch_seconds() {
        let bytes = 1700000000u32.to_le_bytes();
        let mut r = reader(&bytes);
        match read_value(&mut r, ColumnType::Timestamp, &ColumnMetadata::None).unwrap() {
            Value::Timestamp(when) => assert_eq!(when.timestamp(), 1700000000),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_decimal_positive() {
        // decimal(10,4) = 1234.5678: 3-byte integral group, 2-byte fractional
        let mut r = reader(&[0x80, 0x04, 0xD2, 0x16, 0x2E]);
        let meta = ColumnMetadata::Decimal {
            precision: 10,
            decimals: 4,
        };
        assert_eq!(
            read_value(&mut r, ColumnType::NewDecimal, &meta).unwrap(),
            Value::Decimal("1234.5678".to_string())
        );
    }

    #[test]
    fn test_decimal_negative() {
        // Same digits as above, bitwise complemented
        let mut r = reader(&[0x7F, 0xFB, 0x2D, 0xE9, 0xD1]);
        let meta = ColumnMetadata::Decimal {
            precision: 10,
            decimals: 4,
        };
        assert_eq!(
            read_value(&mut r, ColumnType::NewDecimal, &meta).unwrap(),
            Value::Decimal("-1234.5678".to_string())
        );
    }

    #[test]
    fn test_decimal_with_full_group() {
        // decimal(14,4) = 123456789.5678: 1 compressed + 1 full integral group
        let mut bytes = vec![0x80];
        bytes.extend_from_slice(&123456789u32.to_be_bytes());
        bytes.extend_from_slice(&[0x16, 0x2E]);
        let mut r = reader(&bytes);
        let meta = ColumnMetadata::Decimal {
            precision: 14,
            decimals: 4,
        };
        assert_eq!(
            read_value(&mut r, ColumnType::NewDecimal, &meta).unwrap(),
            Value::Decimal("123456789.5678".to_string())
        );
    }

    #[test]
    fn test_decimal_zero() {
        // decimal(5,0) = 0
        let mut r = reader(&[0x80, 0x00, 0x00]);
        let meta = ColumnMetadata::Decimal {
            precision: 5,
            decimals: 0,
        };
        assert_eq!(
            read_value(&mut r, ColumnType::NewDecimal, &meta).unwrap(),
            Value::Decimal("0".to_string())
        );
    }

    #[test]
    fn test_decimal_fraction_only() {
        // decimal(4,4) = 0.0042
        let mut r = reader(&[0x80, 0x2A]);
        let meta = ColumnMetadata::Decimal {
            precision: 4,
            decimals: 4,
        };
        assert_eq!(
            read_value(&mut r, ColumnType::NewDecimal, &meta).unwrap(),
            Value::Decimal("0.0042".to_string())
        );
    }

    #[test]
    fn test_undecodable_type_is_rejected() {
        let mut r = reader(&[0x00]);
        assert!(matches!(
            read_value(&mut r, ColumnType::Json, &ColumnMetadata::None),
            Err(Error::UnsupportedColumnValue(ColumnType::Json))
        ));
    }
}
