//! WolfTail Error Types

use thiserror::Error;

use crate::catalog::{ColumnType, EventType};

/// Result type alias for WolfTail operations
pub type Result<T> = std::result::Result<T, Error>;

/// WolfTail error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Framing errors
    #[error("Bad magic at start of binlog: got {0:?}")]
    BadMagic([u8; 4]),

    // Header errors
    #[error("Malformed event header: declared event_length {event_length} is below the 19-byte minimum")]
    MalformedHeader { event_length: u32 },

    // Body errors
    #[error("Query status block read past its declared end (position {position}, status end {status_end})")]
    OverReadStatus { position: u64, status_end: u64 },

    #[error("Row image read past event body end (position {position}, body end {body_end})")]
    OverReadRowImage { position: u64, body_end: u64 },

    #[error("Rows event references table_id {0} with no prior table map")]
    UnknownTableId(u64),

    #[error("Rows event declares {event} columns but table map has {cached}")]
    ColumnCountMismatch { event: usize, cached: usize },

    #[error("Table map metadata region declared {declared} bytes but {consumed} were consumed")]
    MetadataLengthMismatch { declared: u64, consumed: u64 },

    #[error("Refusing to decode event type {0:?}")]
    UnsupportedEvent(EventType),

    #[error("Unsupported query status variable code {0}")]
    UnsupportedStatus(u8),

    #[error("Unknown MySQL column type code {0}")]
    UnknownColumnType(u8),

    #[error("No value decoder for column type {0:?} with the recorded metadata")]
    UnsupportedColumnValue(ColumnType),

    #[error("Invalid length-encoded integer prefix 0x{0:02X}")]
    InvalidLengthEncodedInt(u8),

    #[error("Expected NUL terminator after string")]
    MissingNullTerminator,

    // I/O errors
    #[error("Short read: source could not supply the requested bytes: {0}")]
    ShortRead(std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error leaves the decoder at an unusable position.
    ///
    /// After any of these the caller must seek back to a known event
    /// boundary (the last good `next_position`) before decoding again.
    pub fn poisons_position(&self) -> bool {
        !matches!(self, Error::Config(_) | Error::ConfigParse(_))
    }
}
