//! Query Event
//!
//! Carries a statement executed on the origin server together with a
//! self-delimiting block of session status variables. The status block
//! declares its own byte length; its inner parser must land exactly on
//! that boundary.

use std::io::{Read, Seek};

use serde::Serialize;

use crate::catalog::{query_flags2, Collation};
use crate::error::{Error, Result};
use crate::event::EventHeader;
use crate::reader::EventReader;

/// Decoded query event body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryEvent {
    /// Server thread that executed the statement
    pub thread_id: u32,
    /// Statement execution time in seconds
    pub elapsed_time: u32,
    /// Error code the statement finished with (0 = success)
    pub error_code: u16,
    /// Session status variables in stream order
    pub status: Vec<StatusVar>,
    /// Default database the statement ran against
    pub database: String,
    /// Statement text, possibly truncated by `max_query_length`
    pub query: String,
}

/// A single query-event status variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusVar {
    Flags2(QueryFlags2),
    SqlMode(u64),
    CatalogDeprecated(String),
    AutoIncrement { increment: u16, offset: u16 },
    Charset {
        client: Collation,
        connection: Collation,
        server: Collation,
    },
    TimeZone(String),
    Catalog(String),
    LcTimeNames(u16),
    CharsetDatabase(u16),
    TableMapForUpdate(u64),
    MasterDataWritten(u32),
    Invoker { username: String, hostname: String },
}

/// Decoded `flags2` status variable bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct QueryFlags2 {
    pub auto_is_null: bool,
    pub not_autocommit: bool,
    pub no_foreign_key_checks: bool,
    pub relaxed_unique_checks: bool,
    /// Raw bits outside the named set
    pub unknown: u32,
}

impl QueryFlags2 {
    pub fn from_bits(bits: u32) -> Self {
        Self {
            auto_is_null: bits & query_flags2::AUTO_IS_NULL != 0,
            not_autocommit: bits & query_flags2::NOT_AUTOCOMMIT != 0,
            no_foreign_key_checks: bits & query_flags2::NO_FOREIGN_KEY_CHECKS != 0,
            relaxed_unique_checks: bits & query_flags2::RELAXED_UNIQUE_CHECKS != 0,
            unknown: bits & !query_flags2::KNOWN,
        }
    }

    /// Re-encode the named bits only.
    pub fn to_bits(&self) -> u32 {
        let mut bits = 0;
        if self.auto_is_null {
            bits |= query_flags2::AUTO_IS_NULL;
        }
        if self.not_autocommit {
            bits |= query_flags2::NOT_AUTOCOMMIT;
        }
        if self.no_foreign_key_checks {
            bits |= query_flags2::NO_FOREIGN_KEY_CHECKS;
        }
        if self.relaxed_unique_checks {
            bits |= query_flags2::RELAXED_UNIQUE_CHECKS;
        }
        bits
    }
}

impl QueryEvent {
    /// Parse a query event body.
    ///
    /// `max_query_length` caps the decoded statement text; the body is
    /// consumed to its end either way.
    pub fn read<R: Read + Seek>(
        reader: &mut EventReader<R>,
        header: &EventHeader,
        max_query_length: Option<usize>,
    ) -> Result<Self> {
        let thread_id = reader.read_u32()?;
        let elapsed_time = reader.read_u32()?;
        let db_length = reader.read_u8()? as usize;
        let error_code = reader.read_u16()?;

        let status_length = reader.read_u16()?;
        let status = read_status_block(reader, u64::from(status_length))?;

        let database = reader.read_string_nul(db_length)?;

        let query_length = reader.remaining(header) as usize;
        let query = match max_query_length {
            Some(max) if max < query_length => {
                let text = reader.read_string(max)?;
                reader.skip((query_length - max) as u64)?;
                text
            }
            _ => reader.read_string(query_length)?,
        };

        Ok(Self {
            thread_id,
            elapsed_time,
            error_code,
            status,
            database,
            query,
        })
    }
}

/// Read status variables until exactly `status_length` bytes are consumed.
fn read_status_block<R: Read + Seek>(
    reader: &mut EventReader<R>,
    status_length: u64,
) -> Result<Vec<StatusVar>> {
    let status_end = reader.position() + status_length;
    let mut status = Vec::new();

    while reader.position() < status_end {
        let code = reader.read_u8()?;
        let var = match code {
            0 => StatusVar::Flags2(QueryFlags2::from_bits(reader.read_u32()?)),
            1 => StatusVar::SqlMode(reader.read_u64()?),
            2 => StatusVar::CatalogDeprecated(reader.read_lp_string_nul()?),
            3 => StatusVar::AutoIncrement {
                increment: reader.read_u16()?,
                offset: reader.read_u16()?,
            },
            4 => StatusVar::Charset {
                client: Collation::from_code(reader.read_u16()?),
                connection: Collation::from_code(reader.read_u16()?),
                server: Collation::from_code(reader.read_u16()?),
            },
            5 => StatusVar::TimeZone(reader.read_lp_string()?),
            6 => StatusVar::Catalog(reader.read_lp_string()?),
            7 => StatusVar::LcTimeNames(reader.read_u16()?),
            8 => StatusVar::CharsetDatabase(reader.read_u16()?),
            9 => StatusVar::TableMapForUpdate(reader.read_u64()?),
            10 => StatusVar::MasterDataWritten(reader.read_u32()?),
            11 => StatusVar::Invoker {
                username: reader.read_lp_string()?,
                hostname: reader.read_lp_string()?,
            },
            // Unknown payload shape: the block cannot be resynchronized
            other => return Err(Error::UnsupportedStatus(other)),
        };

        if reader.position() > status_end {
            return Err(Error::OverReadStatus {
                position: reader.position(),
                status_end,
            });
        }
        status.push(var);
    }

    Ok(status)
}
