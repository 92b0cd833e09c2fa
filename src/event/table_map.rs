//! Table Map Event
//!
//! Maps a numeric `table_id` to the schema needed to interpret the row
//! events that follow: database and table names, per-column types,
//! nullability, and type-dependent metadata. Row events carry only the
//! `table_id`, so the decoder keeps the most recent definition per id
//! in a `TableMap` cache.

use std::collections::HashMap;
use std::io::{Read, Seek};

use serde::Serialize;

use crate::catalog::{table_map_flags, ColumnType};
use crate::error::{Error, Result};
use crate::reader::EventReader;

/// Decoded table map event body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableMapEvent {
    /// 48-bit table handle assigned by the server
    pub table_id: u64,
    pub flags: TableMapFlags,
    pub definition: TableDefinition,
}

/// Decoded table map flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TableMapFlags {
    pub bit_len_exact: bool,
    /// Raw bits outside the named set
    pub unknown: u16,
}

impl TableMapFlags {
    pub fn from_bits(bits: u16) -> Self {
        Self {
            bit_len_exact: bits & table_map_flags::BIT_LEN_EXACT != 0,
            unknown: bits & !table_map_flags::BIT_LEN_EXACT,
        }
    }
}

/// Everything needed to decode a row image for one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDefinition {
    pub database: String,
    pub table: String,
    pub columns: Vec<Column>,
}

/// One column of a mapped table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    /// Final type, after any string→enum/set remap
    pub column_type: ColumnType,
    pub nullable: bool,
    pub metadata: ColumnMetadata,
}

/// Type-dependent column metadata, one shape per wire layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMetadata {
    None,
    /// float, double: storage size in bytes
    PackLength { size: u8 },
    /// varchar: declared maximum length
    MaxLength { max_length: u16 },
    /// bit: total width in bits
    Bits { bits: u16 },
    /// newdecimal
    Decimal { precision: u8, decimals: u8 },
    /// blob, geometry: width of the per-value length prefix
    LengthSize { length_size: u8 },
    /// string/var_string that stayed a string
    StringPack { max_length: u8 },
    /// enum/set discovered by remap: storage size in bytes
    EnumSize { size: u8 },
}

impl TableMapEvent {
    /// Parse a table map event body.
    ///
    /// The declared metadata length bounds the per-column metadata
    /// region; a mismatch between declared and consumed bytes is an
    /// error.
    pub fn read<R: Read + Seek>(reader: &mut EventReader<R>) -> Result<Self> {
        let table_id = reader.read_u48()?;
        let flags = TableMapFlags::from_bits(reader.read_u16()?);
        let database = reader.read_lp_string_nul()?;
        let table = reader.read_lp_string_nul()?;

        let column_count = reader.read_len_enc_int()? as usize;
        let mut column_types = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            column_types.push(ColumnType::from_code(reader.read_u8()?)?);
        }

        let metadata_length = reader.read_len_enc_int()?;
        let metadata_start = reader.position();
        let mut typed = Vec::with_capacity(column_count);
        for ty in &column_types {
            typed.push(read_column_metadata(reader, *ty)?);
        }
        let consumed = reader.position() - metadata_start;
        if consumed != metadata_length {
            return Err(Error::MetadataLengthMismatch {
                declared: metadata_length,
                consumed,
            });
        }

        let nullable = reader.read_bit_array(column_count)?;
        let columns = typed
            .into_iter()
            .zip(nullable)
            .map(|((column_type, metadata), nullable)| Column {
                column_type,
                nullable,
                metadata,
            })
            .collect();

        Ok(Self {
            table_id,
            flags,
            definition: TableDefinition {
                database,
                table,
                columns,
            },
        })
    }
}

/// Read one column's metadata, resolving the final `(type, metadata)` pair.
///
/// A `string`/`var_string` tag stores the column's real type in its
/// first metadata byte; when that names an enum or set, the returned
/// type is the remapped one and no trace of the tag survives.
fn read_column_metadata<R: Read + Seek>(
    reader: &mut EventReader<R>,
    column_type: ColumnType,
) -> Result<(ColumnType, ColumnMetadata)> {
    let pair = match column_type {
        ColumnType::Float | ColumnType::Double => {
            let size = reader.read_u8()?;
            (column_type, ColumnMetadata::PackLength { size })
        }
        ColumnType::Varchar => {
            let max_length = reader.read_u16()?;
            (column_type, ColumnMetadata::MaxLength { max_length })
        }
        ColumnType::Bit => {
            let bits = reader.read_u8()?;
            let bytes = reader.read_u8()?;
            (
                column_type,
                ColumnMetadata::Bits {
                    bits: u16::from(bytes) * 8 + u16::from(bits),
                },
            )
        }
        ColumnType::NewDecimal => {
            let precision = reader.read_u8()?;
            let decimals = reader.read_u8()?;
            (
                column_type,
                ColumnMetadata::Decimal {
                    precision,
                    decimals,
                },
            )
        }
        ColumnType::Blob | ColumnType::Geometry => {
            let length_size = reader.read_u8()?;
            (column_type, ColumnMetadata::LengthSize { length_size })
        }
        ColumnType::String | ColumnType::VarString => {
            let real_type = ColumnType::from_code(reader.read_u8()?)?;
            match real_type {
                ColumnType::Enum | ColumnType::Set => {
                    let size = reader.read_u8()?;
                    (real_type, ColumnMetadata::EnumSize { size })
                }
                _ => {
                    let max_length = reader.read_u8()?;
                    (column_type, ColumnMetadata::StringPack { max_length })
                }
            }
        }
        _ => (column_type, ColumnMetadata::None),
    };
    Ok(pair)
}

/// Cache of the most recent table definition per `table_id`.
///
/// Later maps overwrite earlier ones for the same id; a definition is
/// installed only after its event parsed completely, so a mid-parse
/// failure leaves any prior mapping intact.
#[derive(Debug, Default)]
pub struct TableMap {
    tables: HashMap<u64, TableDefinition>,
}

impl TableMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table_id: u64, definition: TableDefinition) {
        self.tables.insert(table_id, definition);
    }

    pub fn get(&self, table_id: u64) -> Option<&TableDefinition> {
        self.tables.get(&table_id)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
