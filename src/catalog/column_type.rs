//! MySQL Column Type Codes
//!
//! Canonical `enum_field_types` assignments as they appear in table map
//! events and row images.

use serde::Serialize;

use crate::error::{Error, Result};

/// MySQL column types by canonical numeric code.
///
/// A `String`/`VarString` tag in a table map may really be an `Enum` or
/// `Set` column; the real type is discovered from the column metadata
/// and remapped by the table map parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
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
    Time,
    DateTime,
    Year,
    NewDate,
    Varchar,
    Bit,
    Timestamp2,
    DateTime2,
    Time2,
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

impl ColumnType {
    /// Map a wire code to a column type.
    pub fn from_code(code: u8) -> Result<Self> {
        let ty = match code {
            0 => ColumnType::Decimal,
            1 => ColumnType::Tiny,
            2 => ColumnType::Short,
            3 => ColumnType::Long,
            4 => ColumnType::Float,
            5 => ColumnType::Double,
            6 => ColumnType::Null,
            7 => ColumnType::Timestamp,
            8 => ColumnType::LongLong,
            9 => ColumnType::Int24,
            10 => ColumnType::Date,
            11 => ColumnType::Time,
            12 => ColumnType::DateTime,
            13 => ColumnType::Year,
            14 => ColumnType::NewDate,
            15 => ColumnType::Varchar,
            16 => ColumnType::Bit,
            17 => ColumnType::Timestamp2,
            18 => ColumnType::DateTime2,
            19 => ColumnType::Time2,
            245 => ColumnType::Json,
            246 => ColumnType::NewDecimal,
            247 => ColumnType::Enum,
            248 => ColumnType::Set,
            249 => ColumnType::TinyBlob,
            250 => ColumnType::MediumBlob,
            251 => ColumnType::LongBlob,
            252 => ColumnType::Blob,
            253 => ColumnType::VarString,
            254 => ColumnType::String,
            255 => ColumnType::Geometry,
            other => return Err(Error::UnknownColumnType(other)),
        };
        Ok(ty)
    }

    /// Canonical wire code for this column type.
    pub fn code(&self) -> u8 {
        match self {
            ColumnType::Decimal => 0,
            ColumnType::Tiny => 1,
            ColumnType::Short => 2,
            ColumnType::Long => 3,
            ColumnType::Float => 4,
            ColumnType::Double => 5,
            ColumnType::Null => 6,
            ColumnType::Timestamp => 7,
            ColumnType::LongLong => 8,
            ColumnType::Int24 => 9,
            ColumnType::Date => 10,
            ColumnType::Time => 11,
            ColumnType::DateTime => 12,
            ColumnType::Year => 13,
            ColumnType::NewDate => 14,
            ColumnType::Varchar => 15,
            ColumnType::Bit => 16,
            ColumnType::Timestamp2 => 17,
            ColumnType::DateTime2 => 18,
            ColumnType::Time2 => 19,
            ColumnType::Json => 245,
            ColumnType::NewDecimal => 246,
            ColumnType::Enum => 247,
            ColumnType::Set => 248,
            ColumnType::TinyBlob => 249,
            ColumnType::MediumBlob => 250,
            ColumnType::LongBlob => 251,
            ColumnType::Blob => 252,
            ColumnType::VarString => 253,
            ColumnType::String => 254,
            ColumnType::Geometry => 255,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_round_trip() {
        let codes: Vec<u8> = (0..=19).chain(245..=255).collect();
        for code in codes {
            let ty = ColumnType::from_code(code).unwrap();
            assert_eq!(ty.code(), code);
        }
    }

    #[test]
    fn test_unassigned_code_is_rejected() {
        assert!(matches!(
            ColumnType::from_code(100),
            Err(Error::UnknownColumnType(100))
        ));
    }
}
