//! Binlog Event Type Codes
//!
//! The closed v4 event-type enumeration (codes 0..=27) plus the flag
//! masks carried in event headers and bodies.

use serde::Serialize;

/// Binlog event types, in canonical code order (0..=27).
///
/// Codes outside the known range decode to `Unknown` rather than
/// failing: the stream remains walkable because every event carries its
/// own length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Unknown,
    StartV3,
    Query,
    Stop,
    Rotate,
    Intvar,
    Load,
    Slave,
    CreateFile,
    AppendBlock,
    ExecLoad,
    DeleteFile,
    NewLoad,
    Rand,
    UserVar,
    FormatDescription,
    Xid,
    BeginLoadQuery,
    ExecuteLoadQuery,
    TableMap,
    PreGaWriteRows,
    PreGaUpdateRows,
    PreGaDeleteRows,
    WriteRows,
    UpdateRows,
    DeleteRows,
    Incident,
    Heartbeat,
}

impl EventType {
    /// Map a wire code to an event type. Out-of-range codes are `Unknown`.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => EventType::Unknown,
            1 => EventType::StartV3,
            2 => EventType::Query,
            3 => EventType::Stop,
            4 => EventType::Rotate,
            5 => EventType::Intvar,
            6 => EventType::Load,
            7 => EventType::Slave,
            8 => EventType::CreateFile,
            9 => EventType::AppendBlock,
            10 => EventType::ExecLoad,
            11 => EventType::DeleteFile,
            12 => EventType::NewLoad,
            13 => EventType::Rand,
            14 => EventType::UserVar,
            15 => EventType::FormatDescription,
            16 => EventType::Xid,
            17 => EventType::BeginLoadQuery,
            18 => EventType::ExecuteLoadQuery,
            19 => EventType::TableMap,
            20 => EventType::PreGaWriteRows,
            21 => EventType::PreGaUpdateRows,
            22 => EventType::PreGaDeleteRows,
            23 => EventType::WriteRows,
            24 => EventType::UpdateRows,
            25 => EventType::DeleteRows,
            26 => EventType::Incident,
            27 => EventType::Heartbeat,
            _ => EventType::Unknown,
        }
    }

    /// Canonical wire code for this event type.
    pub fn code(&self) -> u8 {
        match self {
            EventType::Unknown => 0,
            EventType::StartV3 => 1,
            EventType::Query => 2,
            EventType::Stop => 3,
            EventType::Rotate => 4,
            EventType::Intvar => 5,
            EventType::Load => 6,
            EventType::Slave => 7,
            EventType::CreateFile => 8,
            EventType::AppendBlock => 9,
            EventType::ExecLoad => 10,
            EventType::DeleteFile => 11,
            EventType::NewLoad => 12,
            EventType::Rand => 13,
            EventType::UserVar => 14,
            EventType::FormatDescription => 15,
            EventType::Xid => 16,
            EventType::BeginLoadQuery => 17,
            EventType::ExecuteLoadQuery => 18,
            EventType::TableMap => 19,
            EventType::PreGaWriteRows => 20,
            EventType::PreGaUpdateRows => 21,
            EventType::PreGaDeleteRows => 22,
            EventType::WriteRows => 23,
            EventType::UpdateRows => 24,
            EventType::DeleteRows => 25,
            EventType::Incident => 26,
            EventType::Heartbeat => 27,
        }
    }

    /// Row-mutation events require a prior table map for the same table_id.
    pub fn is_rows_event(&self) -> bool {
        matches!(
            self,
            EventType::WriteRows | EventType::UpdateRows | EventType::DeleteRows
        )
    }
}

/// Event header flag bits (the 16-bit bitmap at header offset 17)
pub mod header_flags {
    pub const BINLOG_IN_USE: u16 = 0x01;
    pub const THREAD_SPECIFIC: u16 = 0x04;
    pub const SUPPRESS_USE: u16 = 0x08;
    pub const ARTIFICIAL: u16 = 0x20;
    pub const RELAY_LOG: u16 = 0x40;

    /// All bits this decoder assigns a name to.
    pub const KNOWN: u16 =
        BINLOG_IN_USE | THREAD_SPECIFIC | SUPPRESS_USE | ARTIFICIAL | RELAY_LOG;
}

/// Rows event flag bits (write/update/delete post-header)
pub mod rows_flags {
    pub const STMT_END: u16 = 0x01;
    pub const NO_FOREIGN_KEY_CHECKS: u16 = 0x02;
    pub const RELAXED_UNIQUE_CHECKS: u16 = 0x04;
    pub const COMPLETE_ROWS: u16 = 0x08;

    pub const KNOWN: u16 =
        STMT_END | NO_FOREIGN_KEY_CHECKS | RELAXED_UNIQUE_CHECKS | COMPLETE_ROWS;
}

/// Table map event flag bits
pub mod table_map_flags {
    pub const BIT_LEN_EXACT: u16 = 0x01;
}

/// Bits of the `flags2` query status variable (code 0)
pub mod query_flags2 {
    pub const AUTO_IS_NULL: u32 = 1 << 14;
    pub const NOT_AUTOCOMMIT: u32 = 1 << 19;
    pub const NO_FOREIGN_KEY_CHECKS: u32 = 1 << 26;
    pub const RELAXED_UNIQUE_CHECKS: u32 = 1 << 27;

    pub const KNOWN: u32 =
        AUTO_IS_NULL | NOT_AUTOCOMMIT | NO_FOREIGN_KEY_CHECKS | RELAXED_UNIQUE_CHECKS;
}

/// Intvar event kinds (first body byte of an intvar event)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntvarKind {
    LastInsertId,
    InsertId,
    Unknown,
}

impl IntvarKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => IntvarKind::LastInsertId,
            2 => IntvarKind::InsertId,
            _ => IntvarKind::Unknown,
        }
    }
}
