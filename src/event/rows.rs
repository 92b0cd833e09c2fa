//! Row Mutation Events
//!
//! Write, update, and delete rows events share one body layout and none
//! of them is self-describing: the column types come from the cached
//! table map for the event's `table_id`. Update rows carry a before and
//! an after image per row; the other two carry a single image.

use std::io::{Read, Seek};

use serde::Serialize;

use crate::catalog::{rows_flags, EventType};
use crate::error::{Error, Result};
use crate::event::table_map::{TableDefinition, TableMap};
use crate::event::EventHeader;
use crate::reader::EventReader;
use crate::value::{read_value, Value};

/// Decoded rows event body (write, update, or delete).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowsEvent {
    /// 48-bit table handle, resolved against the table map cache
    pub table_id: u64,
    pub flags: RowsFlags,
    pub rows: Vec<RowChange>,
}

/// Decoded rows event flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RowsFlags {
    pub stmt_end: bool,
    pub no_foreign_key_checks: bool,
    pub relaxed_unique_checks: bool,
    pub complete_rows: bool,
    /// Raw bits outside the named set
    pub unknown: u16,
}

impl RowsFlags {
    pub fn from_bits(bits: u16) -> Self {
        Self {
            stmt_end: bits & rows_flags::STMT_END != 0,
            no_foreign_key_checks: bits & rows_flags::NO_FOREIGN_KEY_CHECKS != 0,
            relaxed_unique_checks: bits & rows_flags::RELAXED_UNIQUE_CHECKS != 0,
            complete_rows: bits & rows_flags::COMPLETE_ROWS != 0,
            unknown: bits & !rows_flags::KNOWN,
        }
    }
}

/// One mutated row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowChange {
    Insert { after: Row },
    Update { before: Row, after: Row },
    Delete { before: Row },
}

/// A single row image, one cell per table column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub cells: Vec<Cell>,
}

/// One slot of a row image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    /// Column excluded by the event's columns-used bitmap
    Absent,
    Null,
    Value(Value),
}

impl RowsEvent {
    /// Parse a rows event body of the given kind.
    pub fn read<R: Read + Seek>(
        reader: &mut EventReader<R>,
        header: &EventHeader,
        kind: EventType,
        table_map: &TableMap,
    ) -> Result<Self> {
        let table_id = reader.read_u48()?;
        let flags = RowsFlags::from_bits(reader.read_u16()?);

        let definition = table_map
            .get(table_id)
            .ok_or(Error::UnknownTableId(table_id))?;

        let column_count = reader.read_len_enc_int()? as usize;
        if column_count != definition.columns.len() {
            return Err(Error::ColumnCountMismatch {
                event: column_count,
                cached: definition.columns.len(),
            });
        }

        // write: after image only; delete: before only; update: both
        let first_used = reader.read_bit_array(column_count)?;
        let second_used = if kind == EventType::UpdateRows {
            Some(reader.read_bit_array(column_count)?)
        } else {
            None
        };

        let mut rows = Vec::new();
        while reader.remaining(header) > 0 {
            let change = match kind {
                EventType::WriteRows => RowChange::Insert {
                    after: read_row_image(reader, definition, &first_used)?,
                },
                EventType::DeleteRows => RowChange::Delete {
                    before: read_row_image(reader, definition, &first_used)?,
                },
                EventType::UpdateRows => {
                    let before = read_row_image(reader, definition, &first_used)?;
                    let after = read_row_image(
                        reader,
                        definition,
                        second_used.as_ref().unwrap_or(&first_used),
                    )?;
                    RowChange::Update { before, after }
                }
                other => return Err(Error::UnsupportedEvent(other)),
            };
            if reader.position() > header.body_end() {
                return Err(Error::OverReadRowImage {
                    position: reader.position(),
                    body_end: header.body_end(),
                });
            }
            rows.push(change);
        }

        Ok(Self {
            table_id,
            flags,
            rows,
        })
    }
}

/// Read one row image against the cached definition.
///
/// The null bitmap spans the full column count, not just the columns
/// present in the image.
fn read_row_image<R: Read + Seek>(
    reader: &mut EventReader<R>,
    definition: &TableDefinition,
    columns_used: &[bool],
) -> Result<Row> {
    let null_bits = reader.read_bit_array(definition.columns.len())?;

    let mut cells = Vec::with_capacity(definition.columns.len());
    for (i, column) in definition.columns.iter().enumerate() {
        let cell = if !columns_used[i] {
            Cell::Absent
        } else if null_bits[i] {
            Cell::Null
        } else {
            Cell::Value(read_value(reader, column.column_type, &column.metadata)?)
        };
        cells.push(cell);
    }
    Ok(Row { cells })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnType;
    use crate::event::table_map::{Column, ColumnMetadata};
    use crate::event::HeaderFlags;
    use std::io::Cursor;

    /// `test`.`t` with columns [int, varchar(20), bit(10)]
    fn sample_table_map(table_id: u64) -> TableMap {
        let mut cache = TableMap::new();
        cache.insert(
            table_id,
            TableDefinition {
                database: "test".to_string(),
                table: "t".to_string(),
                columns: vec![
                    Column {
                        column_type: ColumnType::Long,
                        nullable: false,
                        metadata: ColumnMetadata::None,
                    },
                    Column {
                        column_type: ColumnType::Varchar,
                        nullable: true,
                        metadata: ColumnMetadata::MaxLength { max_length: 20 },
                    },
                    Column {
                        column_type: ColumnType::Bit,
                        nullable: false,
                        metadata: ColumnMetadata::Bits { bits: 10 },
                    },
                ],
            },
        );
        cache
    }

    fn body_reader(
        body: &[u8],
        kind: EventType,
    ) -> (EventReader<Cursor<Vec<u8>>>, EventHeader) {
        let mut stream = vec![0u8; 19];
        stream.extend_from_slice(body);
        let header = EventHeader {
            timestamp: 0,
            event_type: kind,
            server_id: 1,
            event_length: 19 + body.len() as u32,
            next_position: 0,
            flags: HeaderFlags::default(),
            offset: 0,
        };
        let mut reader = EventReader::new(Cursor::new(stream)).unwrap();
        reader.seek(19).unwrap();
        (reader, header)
    }

    fn rows_prefix(table_id: u64, flags: u16, bitmaps: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&table_id.to_le_bytes()[..6]);
        body.extend_from_slice(&flags.to_le_bytes());
        body.push(3); // column count
        body.extend_from_slice(bitmaps);
        body
    }

    fn sample_image(n: u32, s: &str, bits: u16) -> Vec<u8> {
        let mut image = vec![0u8]; // null bitmap: nothing null
        image.extend_from_slice(&n.to_le_bytes());
        image.push(s.len() as u8);
        image.extend_from_slice(s.as_bytes());
        image.extend_from_slice(&bits.to_le_bytes());
        image
    }

    #[test]
    fn test_write_rows_single_image() {
        let mut body = rows_prefix(2605, 0x01, &[0b111]);
        body.extend_from_slice(&sample_image(1, "hello", 0x3FF));
        let (mut reader, header) = body_reader(&body, EventType::WriteRows);

        let event =
            RowsEvent::read(&mut reader, &header, EventType::WriteRows, &sample_table_map(2605))
                .unwrap();
        assert_eq!(event.table_id, 2605);
        assert!(event.flags.stmt_end);
        assert_eq!(event.rows.len(), 1);
        match &event.rows[0] {
            RowChange::Insert { after } => {
                assert_eq!(after.cells.len(), 3);
                assert_eq!(after.cells[0], Cell::Value(Value::UInt(1)));
                assert_eq!(after.cells[1], Cell::Value(Value::String("hello".to_string())));
                assert_eq!(after.cells[2], Cell::Value(Value::Bit(0x3FF)));
            }
            other => panic!("unexpected change {:?}", other),
        }
        assert_eq!(reader.position(), header.body_end());
    }

    #[test]
    fn test_write_rows_multiple_images() {
        let mut body = rows_prefix(2605, 0, &[0b111]);
        body.extend_from_slice(&sample_image(1, "a", 1));
        body.extend_from_slice(&sample_image(2, "b", 2));
        let (mut reader, header) = body_reader(&body, EventType::WriteRows);

        let event =
            RowsEvent::read(&mut reader, &header, EventType::WriteRows, &sample_table_map(2605))
                .unwrap();
        assert_eq!(event.rows.len(), 2);
        assert_eq!(reader.position(), header.body_end());
    }

    #[test]
    fn test_update_rows_before_and_after() {
        let mut body = rows_prefix(2605, 0, &[0b111, 0b111]);
        body.extend_from_slice(&sample_image(1, "old", 5));
        body.extend_from_slice(&sample_image(1, "new", 5));
        let (mut reader, header) = body_reader(&body, EventType::UpdateRows);

        let event =
            RowsEvent::read(&mut reader, &header, EventType::UpdateRows, &sample_table_map(2605))
                .unwrap();
        assert_eq!(event.rows.len(), 1);
        match &event.rows[0] {
            RowChange::Update { before, after } => {
                assert_eq!(before.cells.len(), after.cells.len());
                assert_eq!(before.cells[1], Cell::Value(Value::String("old".to_string())));
                assert_eq!(after.cells[1], Cell::Value(Value::String("new".to_string())));
                assert_eq!(before.cells[0], after.cells[0]);
            }
            other => panic!("unexpected change {:?}", other),
        }
    }

    #[test]
    fn test_delete_rows_with_null_cell() {
        let mut body = rows_prefix(2605, 0, &[0b111]);
        let mut image = vec![0b010u8]; // varchar column is NULL
        image.extend_from_slice(&7u32.to_le_bytes());
        image.extend_from_slice(&3u16.to_le_bytes());
        body.extend_from_slice(&image);
        let (mut reader, header) = body_reader(&body, EventType::DeleteRows);

        let event =
            RowsEvent::read(&mut reader, &header, EventType::DeleteRows, &sample_table_map(2605))
                .unwrap();
        match &event.rows[0] {
            RowChange::Delete { before } => {
                assert_eq!(before.cells[0], Cell::Value(Value::UInt(7)));
                assert_eq!(before.cells[1], Cell::Null);
                assert_eq!(before.cells[2], Cell::Value(Value::Bit(3)));
            }
            other => panic!("unexpected change {:?}", other),
        }
    }

    #[test]
    fn test_absent_cells_for_unused_columns() {
        let mut body = rows_prefix(2605, 0, &[0b101]); // varchar excluded
        let mut image = vec![0u8];
        image.extend_from_slice(&1u32.to_le_bytes());
        image.extend_from_slice(&0x3FFu16.to_le_bytes());
        body.extend_from_slice(&image);
        let (mut reader, header) = body_reader(&body, EventType::WriteRows);

        let event =
            RowsEvent::read(&mut reader, &header, EventType::WriteRows, &sample_table_map(2605))
                .unwrap();
        match &event.rows[0] {
            RowChange::Insert { after } => {
                assert_eq!(after.cells.len(), 3);
                assert_eq!(after.cells[0], Cell::Value(Value::UInt(1)));
                assert_eq!(after.cells[1], Cell::Absent);
                assert_eq!(after.cells[2], Cell::Value(Value::Bit(0x3FF)));
            }
            other => panic!("unexpected change {:?}", other),
        }
    }

    #[test]
    fn test_unknown_table_id_is_fatal() {
        let body = rows_prefix(9999, 0, &[0b111]);
        let (mut reader, header) = body_reader(&body, EventType::WriteRows);

        assert!(matches!(
            RowsEvent::read(&mut reader, &header, EventType::WriteRows, &sample_table_map(2605)),
            Err(Error::UnknownTableId(9999))
        ));
    }

    #[test]
    fn test_column_count_mismatch() {
        let mut body = rows_prefix(2605, 0, &[0b11]);
        body[8] = 2; // claim two columns against a three-column map
        let (mut reader, header) = body_reader(&body, EventType::WriteRows);

        assert!(matches!(
            RowsEvent::read(&mut reader, &header, EventType::WriteRows, &sample_table_map(2605)),
            Err(Error::ColumnCountMismatch { event: 2, cached: 3 })
        ));
    }

    #[test]
    fn test_row_image_past_body_end() {
        let mut body = rows_prefix(2605, 0, &[0b111]);
        body.extend_from_slice(&sample_image(1, "hello", 0x3FF));
        // Header claims the body stops mid-image
        let mut stream = vec![0u8; 19];
        stream.extend_from_slice(&body);
        let header = EventHeader {
            timestamp: 0,
            event_type: EventType::WriteRows,
            server_id: 1,
            event_length: 19 + body.len() as u32 - 4,
            next_position: 0,
            flags: HeaderFlags::default(),
            offset: 0,
        };
        let mut reader = EventReader::new(Cursor::new(stream)).unwrap();
        reader.seek(19).unwrap();

        assert!(matches!(
            RowsEvent::read(&mut reader, &header, EventType::WriteRows, &sample_table_map(2605)),
            Err(Error::OverReadRowImage { .. })
        ));
    }
}
