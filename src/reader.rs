//! Positioned Byte Reader
//!
//! Wraps any `Read + Seek` source with absolute-position tracking and
//! the MySQL field primitives the event parsers are built from:
//! little-endian integers, length-encoded integers, length-prefixed and
//! null-terminated strings, and LSB-first bit arrays.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};
use crate::event::EventHeader;

/// Positioned reader over a binlog byte source.
pub struct EventReader<R> {
    source: R,
    position: u64,
}

impl<R: Read + Seek> EventReader<R> {
    /// Wrap a source, picking up its current stream position.
    pub fn new(mut source: R) -> Result<Self> {
        let position = source.stream_position()?;
        Ok(Self { source, position })
    }

    /// Current absolute offset in the source.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes left until the body end of the given event header.
    pub fn remaining(&self, header: &EventHeader) -> u64 {
        header.body_end().saturating_sub(self.position)
    }

    /// Seek to an absolute offset (e.g. back to a known event boundary).
    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.source.seek(SeekFrom::Start(position))?;
        self.position = position;
        Ok(())
    }

    /// Skip forward over `n` bytes without decoding them.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        let target = self.position + n;
        self.source.seek(SeekFrom::Start(target))?;
        self.position = target;
        Ok(())
    }

    /// Fill `buf` exactly, or report a short read.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.source.read_exact(buf) {
            Ok(()) => {
                self.position += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::ShortRead(e)),
            Err(e) => Err(e.into()),
        }
    }

    /// Fill `buf` exactly, distinguishing clean end-of-stream (no bytes at
    /// all available) from a truncated read mid-record.
    ///
    /// Returns `Ok(false)` at clean end of stream.
    pub fn try_read_exact(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.source.read(&mut buf[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(Error::ShortRead(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("got {} of {} bytes", filled, buf.len()),
                )));
            }
            filled += n;
        }
        self.position += buf.len() as u64;
        Ok(true)
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let v = self.map_eof(|s| s.read_u8())?;
        self.position += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let v = self.map_eof(|s| s.read_u16::<LittleEndian>())?;
        self.position += 2;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let v = self.map_eof(|s| s.read_u32::<LittleEndian>())?;
        self.position += 4;
        Ok(v)
    }

    /// 48-bit little-endian unsigned (table ids).
    pub fn read_u48(&mut self) -> Result<u64> {
        let v = self.map_eof(|s| s.read_uint::<LittleEndian>(6))?;
        self.position += 6;
        Ok(v)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let v = self.map_eof(|s| s.read_u64::<LittleEndian>())?;
        self.position += 8;
        Ok(v)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let v = self.map_eof(|s| s.read_f32::<LittleEndian>())?;
        self.position += 4;
        Ok(v)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let v = self.map_eof(|s| s.read_f64::<LittleEndian>())?;
        self.position += 8;
        Ok(v)
    }

    /// Little-endian unsigned integer of 1..=8 bytes.
    pub fn read_uint(&mut self, size: usize) -> Result<u64> {
        let v = self.map_eof(|s| s.read_uint::<LittleEndian>(size))?;
        self.position += size as u64;
        Ok(v)
    }

    /// MySQL length-encoded integer.
    ///
    /// One-byte values below 0xFB are literal; 0xFC/0xFD/0xFE prefix a
    /// 2-, 3- or 8-byte little-endian value. 0xFB (SQL NULL) and 0xFF
    /// never encode a length here.
    pub fn read_len_enc_int(&mut self) -> Result<u64> {
        let prefix = self.read_u8()?;
        match prefix {
            v @ 0..=0xFA => Ok(u64::from(v)),
            0xFC => Ok(u64::from(self.read_u16()?)),
            0xFD => Ok(self.read_uint(3)?),
            0xFE => self.read_u64(),
            other => Err(Error::InvalidLengthEncodedInt(other)),
        }
    }

    /// Exactly `n` bytes as a string (invalid UTF-8 replaced).
    pub fn read_string(&mut self, n: usize) -> Result<String> {
        let bytes = self.read_bytes(n)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Exactly `n` bytes, then a verified NUL terminator.
    pub fn read_string_nul(&mut self, n: usize) -> Result<String> {
        let s = self.read_string(n)?;
        if self.read_u8()? != 0 {
            return Err(Error::MissingNullTerminator);
        }
        Ok(s)
    }

    /// One-byte length prefix, then that many bytes.
    pub fn read_lp_string(&mut self) -> Result<String> {
        let len = self.read_u8()? as usize;
        self.read_string(len)
    }

    /// One-byte length prefix, the bytes, then a verified NUL terminator.
    pub fn read_lp_string_nul(&mut self) -> Result<String> {
        let len = self.read_u8()? as usize;
        self.read_string_nul(len)
    }

    /// Bit array of `n` bits packed LSB-first into ⌈n/8⌉ bytes.
    pub fn read_bit_array(&mut self, n: usize) -> Result<Vec<bool>> {
        let bytes = self.read_bytes((n + 7) / 8)?;
        Ok((0..n).map(|i| bytes[i / 8] & (1 << (i % 8)) != 0).collect())
    }

    fn map_eof<T>(
        &mut self,
        f: impl FnOnce(&mut R) -> std::io::Result<T>,
    ) -> Result<T> {
        match f(&mut self.source) {
            Ok(v) => Ok(v),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::ShortRead(e)),
            Err(e) => Err(e.into()),
        }
    }
}
