//! Binlog Event Header
//!
//! Every v4 event opens with the same 19-byte header:
//!
//! ```text
//! +----------------------------------+
//! | timestamp         0 : 4  (LE)    |
//! | event_type        4 : 1          |
//! | server_id         5 : 4  (LE)    |
//! | event_length      9 : 4  (LE)    |
//! | next_position    13 : 4  (LE)    |
//! | flags            17 : 2  (LE)    |
//! +----------------------------------+
//! ```
//!
//! `event_length` covers header plus body, which pins down the body end
//! for every downstream parser.

use std::io::{Read, Seek};

use serde::Serialize;

use crate::catalog::{header_flags, EventType};
use crate::error::{Error, Result};
use crate::reader::EventReader;

/// Fixed size of the common event header.
pub const HEADER_LEN: u64 = 19;

/// Decoded common event header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventHeader {
    /// Event creation time, seconds since the Unix epoch
    pub timestamp: u32,
    /// Event kind selecting the body parser
    pub event_type: EventType,
    /// Originating server id
    pub server_id: u32,
    /// Total event size in bytes, header included
    pub event_length: u32,
    /// Absolute offset of the next event in the file
    pub next_position: u32,
    /// Decoded header flag set
    pub flags: HeaderFlags,
    /// Absolute offset this header was read from
    pub offset: u64,
}

impl EventHeader {
    /// Read the next header, or `None` at clean end of stream.
    ///
    /// On success the reader sits at the first body byte. A declared
    /// `event_length` below 19 is rejected; the reader is then left just
    /// past the 19 header bytes, having consumed nothing of any body.
    pub fn read<R: Read + Seek>(reader: &mut EventReader<R>) -> Result<Option<Self>> {
        let offset = reader.position();
        let mut buf = [0u8; HEADER_LEN as usize];
        if !reader.try_read_exact(&mut buf)? {
            return Ok(None);
        }

        let timestamp = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let event_type = EventType::from_code(buf[4]);
        let server_id = u32::from_le_bytes([buf[5], buf[6], buf[7], buf[8]]);
        let event_length = u32::from_le_bytes([buf[9], buf[10], buf[11], buf[12]]);
        let next_position = u32::from_le_bytes([buf[13], buf[14], buf[15], buf[16]]);
        let flags = HeaderFlags::from_bits(u16::from_le_bytes([buf[17], buf[18]]));

        if u64::from(event_length) < HEADER_LEN {
            return Err(Error::MalformedHeader { event_length });
        }

        Ok(Some(Self {
            timestamp,
            event_type,
            server_id,
            event_length,
            next_position,
            flags,
            offset,
        }))
    }

    /// Absolute offset one past the last body byte.
    pub fn body_end(&self) -> u64 {
        self.offset + u64::from(self.event_length)
    }

    /// Body size in bytes.
    pub fn body_length(&self) -> u64 {
        u64::from(self.event_length) - HEADER_LEN
    }
}

/// Decoded event header flag set.
///
/// Bits without a canonical name are kept in `unknown`; `to_bits`
/// re-encodes only the named bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HeaderFlags {
    pub binlog_in_use: bool,
    pub thread_specific: bool,
    pub suppress_use: bool,
    pub artificial: bool,
    pub relay_log: bool,
    /// Raw bits outside the named set
    pub unknown: u16,
}

impl HeaderFlags {
    pub fn from_bits(bits: u16) -> Self {
        Self {
            binlog_in_use: bits & header_flags::BINLOG_IN_USE != 0,
            thread_specific: bits & header_flags::THREAD_SPECIFIC != 0,
            suppress_use: bits & header_flags::SUPPRESS_USE != 0,
            artificial: bits & header_flags::ARTIFICIAL != 0,
            relay_log: bits & header_flags::RELAY_LOG != 0,
            unknown: bits & !header_flags::KNOWN,
        }
    }

    /// Re-encode the named bits only.
    pub fn to_bits(&self) -> u16 {
        let mut bits = 0;
        if self.binlog_in_use {
            bits |= header_flags::BINLOG_IN_USE;
        }
        if self.thread_specific {
            bits |= header_flags::THREAD_SPECIFIC;
        }
        if self.suppress_use {
            bits |= header_flags::SUPPRESS_USE;
        }
        if self.artificial {
            bits |= header_flags::ARTIFICIAL;
        }
        if self.relay_log {
            bits |= header_flags::RELAY_LOG;
        }
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header_bytes(
        timestamp: u32,
        type_code: u8,
        server_id: u32,
        event_length: u32,
        next_position: u32,
        flags: u16,
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity(19);
        out.extend_from_slice(&timestamp.to_le_bytes());
        out.push(type_code);
        out.extend_from_slice(&server_id.to_le_bytes());
        out.extend_from_slice(&event_length.to_le_bytes());
        out.extend_from_slice(&next_position.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out
    }

    #[test]
    fn test_parse_header() {
        let bytes = header_bytes(1700000000, 16, 1, 27, 131, 0x01);
        let mut r = EventReader::new(Cursor::new(bytes.as_slice())).unwrap();

        let header = EventHeader::read(&mut r).unwrap().unwrap();
        assert_eq!(header.timestamp, 1700000000);
        assert_eq!(header.event_type, EventType::Xid);
        assert_eq!(header.server_id, 1);
        assert_eq!(header.event_length, 27);
        assert_eq!(header.next_position, 131);
        assert!(header.flags.binlog_in_use);
        assert_eq!(header.offset, 0);
        assert_eq!(header.body_end(), 27);
        assert_eq!(header.body_length(), 8);
        assert_eq!(r.position(), 19);
    }

    #[test]
    fn test_clean_eof_yields_none() {
        let mut r = EventReader::new(Cursor::new(&[][..])).unwrap();
        assert!(EventHeader::read(&mut r).unwrap().is_none());
    }

    #[test]
    fn test_truncated_header_is_short_read() {
        let mut r = EventReader::new(Cursor::new(&[0u8; 7][..])).unwrap();
        assert!(matches!(
            EventHeader::read(&mut r),
            Err(Error::ShortRead(_))
        ));
    }

    #[test]
    fn test_malformed_length_rejected_after_header() {
        let bytes = header_bytes(0, 2, 1, 15, 0, 0);
        let mut r = EventReader::new(Cursor::new(bytes.as_slice())).unwrap();
        assert!(matches!(
            EventHeader::read(&mut r),
            Err(Error::MalformedHeader { event_length: 15 })
        ));
        // Only the 19 header bytes were consumed
        assert_eq!(r.position(), 19);
    }

    #[test]
    fn test_flags_round_trip_named_bits_only() {
        let flags = HeaderFlags::from_bits(0x01 | 0x20 | 0x8000);
        assert!(flags.binlog_in_use);
        assert!(flags.artificial);
        assert!(!flags.relay_log);
        assert_eq!(flags.unknown, 0x8000);
        assert_eq!(flags.to_bits(), 0x21);
    }

    #[test]
    fn test_unknown_event_code_tolerated() {
        let bytes = header_bytes(0, 0xA3, 1, 19, 0, 0);
        let mut r = EventReader::new(Cursor::new(bytes.as_slice())).unwrap();
        let header = EventHeader::read(&mut r).unwrap().unwrap();
        assert_eq!(header.event_type, EventType::Unknown);
    }
}
