//! Binlog Decoder
//!
//! The driver callers interact with: opens a binlog (checking the
//! 4-byte magic), then yields one decoded event per `next_event` call
//! in strict file order. A table map cache owned by the decoder carries
//! the schema context row events need.
//!
//! After an error the stream position is undefined; callers that want
//! to continue should `seek` back to the `next_position` of the last
//! good event.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use crate::config::DecoderConfig;
use crate::error::{Error, Result};
use crate::event::{Event, EventData, EventHeader, TableMap};
use crate::reader::EventReader;

/// Magic bytes opening every binlog file: 0xFE 'b' 'i' 'n'
pub const BINLOG_MAGIC: [u8; 4] = [0xFE, 0x62, 0x69, 0x6E];

/// Streaming decoder over one binlog.
pub struct BinlogDecoder<R> {
    reader: EventReader<R>,
    table_map: TableMap,
    config: DecoderConfig,
}

impl BinlogDecoder<BufReader<File>> {
    /// Open a binlog file and verify its magic.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        tracing::debug!("Opened binlog {}", path.as_ref().display());
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> BinlogDecoder<R> {
    /// Wrap a source positioned at the file start (magic included).
    pub fn from_reader(source: R) -> Result<Self> {
        let mut reader = EventReader::new(source)?;
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != BINLOG_MAGIC {
            return Err(Error::BadMagic(magic));
        }
        Ok(Self {
            reader,
            table_map: TableMap::new(),
            config: DecoderConfig::default(),
        })
    }

    /// Wrap a source already positioned at an event boundary, with no
    /// magic in front (e.g. mid-file after repositioning).
    pub fn resume(source: R) -> Result<Self> {
        Ok(Self {
            reader: EventReader::new(source)?,
            table_map: TableMap::new(),
            config: DecoderConfig::default(),
        })
    }

    /// Replace the decoder configuration.
    pub fn with_config(mut self, config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Decode the next event, or `None` at clean end of stream.
    pub fn next_event(&mut self) -> Result<Option<Event>> {
        let header = match EventHeader::read(&mut self.reader)? {
            Some(header) => header,
            None => return Ok(None),
        };

        let data = EventData::read(&mut self.reader, &header, &mut self.table_map, &self.config)?;

        // Parsers that leave declared-but-unneeded trailing bytes (e.g.
        // the format description length table) still advance the stream
        // by exactly event_length.
        let trailing = self.reader.remaining(&header);
        if trailing > 0 {
            self.reader.skip(trailing)?;
        }

        tracing::trace!(
            "Decoded {:?} event at offset {} ({} bytes)",
            header.event_type,
            header.offset,
            header.event_length
        );
        Ok(Some(Event { header, data }))
    }

    /// Iterate remaining events.
    pub fn events(&mut self) -> Events<'_, R> {
        Events { decoder: self }
    }

    /// Reposition to an absolute offset, e.g. a known event boundary.
    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.reader.seek(position)
    }

    /// Current absolute offset.
    pub fn position(&self) -> u64 {
        self.reader.position()
    }

    /// Table definitions seen so far.
    pub fn table_map(&self) -> &TableMap {
        &self.table_map
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }
}

/// Iterator over the decoder's remaining events.
pub struct Events<'a, R> {
    decoder: &'a mut BinlogDecoder<R>,
}

impl<R: Read + Seek> Iterator for Events<'_, R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_event().transpose()
    }
}
