//! IMF Stream Reader
//!
//! Detects the optional length header and walks the 4-byte event records.
//!
//! - Type 0: the first two bytes are both zero; the whole buffer is song data.
//! - Type 1: the first two bytes are a little-endian byte length of the song
//!   data, which starts at offset 2. Trailing bytes after it (tags, metadata)
//!   are ignored.

use super::Event;
use nom::combinator::map;
use nom::number::complete::{le_u16, le_u8};
use nom::sequence::tuple;
use nom::IResult;

/// Size of one event record in bytes
pub const EVENT_LEN: usize = 4;

/// Byte offset of the song data in type-1 files
const TYPE1_DATA_OFFSET: usize = 2;

fn length_header(input: &[u8]) -> IResult<&[u8], u16> {
    le_u16(input)
}

fn event_record(input: &[u8]) -> IResult<&[u8], Event> {
    map(
        tuple((le_u8, le_u8, le_u16)),
        |(register, value, delay_ticks)| Event {
            register,
            value,
            delay_ticks,
        },
    )(input)
}

/// Zero-copy view over the usable song data of an IMF buffer
#[derive(Debug, Clone, Copy)]
pub struct ImfReader<'a> {
    data: &'a [u8],
    declared_length: Option<u16>,
}

impl<'a> ImfReader<'a> {
    /// Inspect the header and locate the song data
    pub fn new(raw: &'a [u8]) -> Self {
        let declared_length = match length_header(raw) {
            Ok((_, 0)) | Err(_) => None,
            Ok((_, len)) => Some(len),
        };

        let data = match declared_length {
            None => raw,
            Some(len) => {
                let start = TYPE1_DATA_OFFSET;
                let end = (start + len as usize).min(raw.len());
                if end < start + len as usize {
                    tracing::debug!(
                        declared = len,
                        available = raw.len() - start,
                        "IMF length header exceeds buffer, truncating"
                    );
                }
                &raw[start..end]
            }
        };

        let reader = ImfReader {
            data,
            declared_length,
        };
        let format = if declared_length.is_some() {
            "type-1"
        } else {
            "type-0"
        };
        tracing::debug!(
            format,
            events = reader.event_count(),
            trailing = reader.trailing_bytes(),
            "parsed IMF header"
        );
        reader
    }

    /// True for type-1 streams carrying a length header
    pub fn has_length_header(&self) -> bool {
        self.declared_length.is_some()
    }

    /// The length from the type-1 header, if present
    pub fn declared_length(&self) -> Option<u16> {
        self.declared_length
    }

    /// The usable song data (header excluded)
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Number of complete event records
    pub fn event_count(&self) -> usize {
        self.data.len() / EVENT_LEN
    }

    /// Bytes of a trailing partial record that will be skipped
    pub fn trailing_bytes(&self) -> usize {
        self.data.len() % EVENT_LEN
    }

    /// Iterate the events from the start
    ///
    /// Each call returns a fresh iterator, so the sequence can be replayed.
    pub fn events(&self) -> Events<'a> {
        Events { rest: self.data }
    }
}

/// Lazy iterator over IMF event records
#[derive(Debug, Clone)]
pub struct Events<'a> {
    rest: &'a [u8],
}

impl Iterator for Events<'_> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        if self.rest.len() < EVENT_LEN {
            return None;
        }
        let (rest, event) = event_record(self.rest).ok()?;
        self.rest = rest;
        Some(event)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.rest.len() / EVENT_LEN;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Events<'_> {}
