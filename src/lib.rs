//! WolfTail - MySQL Binary Log Event Decoder
//!
//! A streaming decoder that turns MySQL/MariaDB binary log files into
//! structured event records for replication capture, auditing, and
//! change-data-capture pipelines.
//!
//! # Architecture
//!
//! The decoder walks the binlog one length-prefixed event at a time:
//! the fixed 19-byte header selects a body parser, and a table map
//! cache owned by the decoder carries the per-table schema that row
//! mutation events need. Everything is synchronous and single-threaded;
//! dropping the decoder cancels nothing because nothing runs in the
//! background.
//!
//! # Features
//!
//! - Format description, rotate, query, intvar, xid, rand, table map,
//!   write/update/delete rows, stop, heartbeat, and incident events
//! - Full row image decoding driven by cached table definitions,
//!   including the string→enum/set column type remap
//! - Query status variable block decoding (flags2, sql_mode, charset,
//!   auto_increment, time zone, and friends)
//! - Strict bounds checking: over-reads of status blocks, metadata
//!   regions, and row images fail loudly instead of drifting
//! - Configurable handling of event types outside the decoded set
//!
//! # Example
//!
//! ```no_run
//! use wolftail::BinlogDecoder;
//!
//! # fn main() -> wolftail::Result<()> {
//! let mut decoder = BinlogDecoder::open("mysql-bin.000001")?;
//! while let Some(event) = decoder.next_event()? {
//!     println!("{:?} at offset {}", event.header.event_type, event.header.offset);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod decoder;
pub mod error;
pub mod event;
pub mod reader;
pub mod value;

pub use config::{DecoderConfig, UnhandledEventPolicy};
pub use decoder::{BinlogDecoder, BINLOG_MAGIC};
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{Collation, ColumnType, EventType};
    pub use crate::config::{DecoderConfig, UnhandledEventPolicy};
    pub use crate::decoder::BinlogDecoder;
    pub use crate::error::{Error, Result};
    pub use crate::event::{
        Cell, Event, EventData, EventHeader, Row, RowChange, RowsEvent, TableDefinition, TableMap,
    };
    pub use crate::value::Value;
}
