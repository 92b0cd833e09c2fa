//! Binlog Events
//!
//! The event record handed to callers: a common header plus a tagged
//! body. Body layouts with real structure live in their own modules
//! (query, table map, rows); the small fixed-shape bodies and the
//! per-type dispatch live here.

use std::io::{Read, Seek};

use serde::Serialize;

use crate::catalog::{EventType, IntvarKind};
use crate::config::{DecoderConfig, UnhandledEventPolicy};
use crate::error::{Error, Result};
use crate::reader::EventReader;

pub mod header;
pub mod query;
pub mod rows;
pub mod table_map;

pub use header::{EventHeader, HeaderFlags, HEADER_LEN};
pub use query::{QueryEvent, QueryFlags2, StatusVar};
pub use rows::{Cell, Row, RowChange, RowsEvent, RowsFlags};
pub use table_map::{
    Column, ColumnMetadata, TableDefinition, TableMap, TableMapEvent, TableMapFlags,
};

/// One parsed binlog event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub header: EventHeader,
    pub data: EventData,
}

/// Event body, tagged by the header's event type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventData {
    FormatDescription(FormatDescriptionEvent),
    Rotate(RotateEvent),
    Query(QueryEvent),
    Intvar(IntvarEvent),
    Xid(XidEvent),
    Rand(RandEvent),
    TableMap(TableMapEvent),
    WriteRows(RowsEvent),
    UpdateRows(RowsEvent),
    DeleteRows(RowsEvent),
    Stop,
    Heartbeat,
    Incident(IncidentEvent),
    /// Body of an unhandled type, kept verbatim
    Opaque(Vec<u8>),
    /// Body of an unhandled type, skipped over
    Skipped,
}

/// First event of every v4 binlog: describes the writer and the format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatDescriptionEvent {
    pub binlog_version: u16,
    /// Server version string, stored null-padded to 50 bytes
    pub server_version: String,
    pub create_timestamp: u32,
    /// Common header length the writer uses (19 for v4)
    pub header_length: u8,
}

/// Written when the server switches to a new binlog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotateEvent {
    /// First event offset in the next file
    pub position: u64,
    pub next_file: String,
}

/// Auto-increment / LAST_INSERT_ID context for statement replication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntvarEvent {
    pub kind: IntvarKind,
    pub value: u64,
}

/// Transaction commit marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XidEvent {
    pub xid: u64,
}

/// RAND() seeds for statement replication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RandEvent {
    pub seed1: u64,
    pub seed2: u64,
}

/// Replication incident notice, surfaced opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentEvent {
    pub payload: Vec<u8>,
}

impl EventData {
    /// Parse the body selected by the header's event type.
    ///
    /// A table map event installs its definition into `table_map` as a
    /// side effect; installation happens only after the body parsed
    /// completely.
    pub fn read<R: Read + Seek>(
        reader: &mut EventReader<R>,
        event_header: &EventHeader,
        table_map: &mut TableMap,
        config: &DecoderConfig,
    ) -> Result<Self> {
        match event_header.event_type {
            EventType::FormatDescription => {
                let event = read_format_description(reader)?;
                tracing::info!(
                    "Binlog format: version {} from {}",
                    event.binlog_version,
                    event.server_version
                );
                Ok(EventData::FormatDescription(event))
            }
            EventType::Rotate => {
                let position = reader.read_u64()?;
                let next_file = reader.read_string(reader.remaining(event_header) as usize)?;
                tracing::info!("Binlog rotate to {}:{}", next_file, position);
                Ok(EventData::Rotate(RotateEvent {
                    position,
                    next_file,
                }))
            }
            EventType::Query => {
                let event = QueryEvent::read(reader, event_header, config.max_query_length)?;
                Ok(EventData::Query(event))
            }
            EventType::Intvar => Ok(EventData::Intvar(IntvarEvent {
                kind: IntvarKind::from_code(reader.read_u8()?),
                value: reader.read_u64()?,
            })),
            EventType::Xid => Ok(EventData::Xid(XidEvent {
                xid: reader.read_u64()?,
            })),
            EventType::Rand => Ok(EventData::Rand(RandEvent {
                seed1: reader.read_u64()?,
                seed2: reader.read_u64()?,
            })),
            EventType::TableMap => {
                let event = TableMapEvent::read(reader)?;
                tracing::debug!(
                    "TableMap: {} -> {}.{}",
                    event.table_id,
                    event.definition.database,
                    event.definition.table
                );
                table_map.insert(event.table_id, event.definition.clone());
                Ok(EventData::TableMap(event))
            }
            EventType::WriteRows => {
                let event = RowsEvent::read(reader, event_header, EventType::WriteRows, table_map)?;
                Ok(EventData::WriteRows(event))
            }
            EventType::UpdateRows => {
                let event =
                    RowsEvent::read(reader, event_header, EventType::UpdateRows, table_map)?;
                Ok(EventData::UpdateRows(event))
            }
            EventType::DeleteRows => {
                let event =
                    RowsEvent::read(reader, event_header, EventType::DeleteRows, table_map)?;
                Ok(EventData::DeleteRows(event))
            }
            EventType::Stop => Ok(EventData::Stop),
            EventType::Heartbeat => Ok(EventData::Heartbeat),
            EventType::Incident => {
                let payload = reader.read_bytes(reader.remaining(event_header) as usize)?;
                tracing::warn!("Incident event ({} byte payload)", payload.len());
                Ok(EventData::Incident(IncidentEvent { payload }))
            }
            unhandled => match config.unhandled_events {
                UnhandledEventPolicy::Skip => {
                    tracing::trace!(
                        "Skipping {:?} event at offset {}",
                        unhandled,
                        event_header.offset
                    );
                    reader.skip(reader.remaining(event_header))?;
                    Ok(EventData::Skipped)
                }
                UnhandledEventPolicy::Keep => {
                    let body = reader.read_bytes(reader.remaining(event_header) as usize)?;
                    Ok(EventData::Opaque(body))
                }
                UnhandledEventPolicy::Fail => Err(Error::UnsupportedEvent(unhandled)),
            },
        }
    }
}

/// The server version field is null-padded to a fixed 50 bytes.
fn read_format_description<R: Read + Seek>(
    reader: &mut EventReader<R>,
) -> Result<FormatDescriptionEvent> {
    let binlog_version = reader.read_u16()?;
    let padded = reader.read_bytes(50)?;
    let end = padded.iter().position(|&b| b == 0).unwrap_or(padded.len());
    let server_version = String::from_utf8_lossy(&padded[..end]).into_owned();
    let create_timestamp = reader.read_u32()?;
    let header_length = reader.read_u8()?;
    // The per-type post-header length table follows; nothing here needs it
    Ok(FormatDescriptionEvent {
        binlog_version,
        server_version,
        create_timestamp,
        header_length,
    })
}
