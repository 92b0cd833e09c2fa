//! Static Binlog Catalog
//!
//! Numeric code tables shared by the whole decoder: event types, header
//! and body flag masks, MySQL column types, and collation assignments.
//! All numeric values follow the canonical MySQL assignments.

mod collation;
mod column_type;
mod event_type;

pub use collation::Collation;
pub use column_type::ColumnType;
pub use event_type::{header_flags, query_flags2, rows_flags, table_map_flags};
pub use event_type::{EventType, IntvarKind};
