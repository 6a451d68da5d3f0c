// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Back-referencing value stream codec.
//!
//! # Stream Format
//!
//! ```text
//! +-------------------------------------------+
//! | Magic "DPXS" (4) | Version (2, u16 LE)    |
//! +-------------------------------------------+
//! | Item*                                     |
//! |   0x01 | len (4, u32 LE) | bytes (len)    |  new value, next handle
//! |   0x02 | handle (4, u32 LE)               |  repeat of an earlier value
//! |   0x03                                    |  reset: clear handle tables
//! +-------------------------------------------+
//! ```
//!
//! Handles count from 0 and restart after every reset. Reaching EOF exactly at
//! an item boundary ends the stream cleanly.

use crate::error::{DecodeError, Error, Result as CrateResult};
use crate::framing::read_full;
use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::HashMap;
use std::io::{self, Read};

/// Magic bytes: "DPXS".
pub const MAGIC: [u8; 4] = *b"DPXS";

/// Current stream version.
pub const STREAM_VERSION: u16 = 1;

/// Header size in bytes.
pub const HEADER_LEN: usize = 6;

const TAG_VALUE: u8 = 0x01;
const TAG_BACKREF: u8 = 0x02;
const TAG_RESET: u8 = 0x03;

/// Append-only encoder for one output stream.
#[derive(Debug)]
pub struct StreamEncoder {
    buf: Vec<u8>,
    handles: HashMap<Vec<u8>, u32>,
    values: usize,
    resets: usize,
}

impl StreamEncoder {
    /// Create an encoder with the stream header already written.
    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&STREAM_VERSION.to_le_bytes());
        Self {
            buf,
            handles: HashMap::new(),
            values: 0,
            resets: 0,
        }
    }

    /// Append one value, as a back-reference when an identical value was
    /// written since the last reset.
    ///
    /// Values of 4 GiB or more are rejected before anything is written.
    pub fn push(&mut self, value: &[u8]) -> CrateResult<()> {
        if let Some(&handle) = self.handles.get(value) {
            self.buf.push(TAG_BACKREF);
            self.buf.extend_from_slice(&handle.to_le_bytes());
            self.values += 1;
            return Ok(());
        }
        let len = value_len(value.len())?;
        let handle = self.handles.len() as u32;
        self.handles.insert(value.to_vec(), handle);
        self.buf.push(TAG_VALUE);
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(value);
        self.values += 1;
        Ok(())
    }

    /// Drop the back-reference table and tell the decoder to do the same.
    pub fn reset(&mut self) {
        self.handles.clear();
        self.buf.push(TAG_RESET);
        self.resets += 1;
    }

    /// Values appended so far.
    pub fn values(&self) -> usize {
        self.values
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Seal the stream and return its bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for StreamEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode `values` as one stream, with no resets.
pub fn encode_values<'a>(values: impl IntoIterator<Item = &'a [u8]>) -> CrateResult<Vec<u8>> {
    let mut encoder = StreamEncoder::new();
    for value in values {
        encoder.push(value)?;
    }
    Ok(encoder.finish())
}

fn value_len(len: usize) -> CrateResult<u32> {
    u32::try_from(len).map_err(|_| Error::ValueTooLong { length: len as u64 })
}

/// Lazy decoder yielding one value per item.
///
/// The iterator is fused: after the first error it yields `None`.
#[derive(Debug)]
pub struct StreamDecoder<R: Read> {
    reader: R,
    handles: Vec<Vec<u8>>,
    offset: u64,
    started: bool,
    done: bool,
}

impl<R: Read> StreamDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            handles: Vec::new(),
            offset: 0,
            started: false,
            done: false,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn read_header(&mut self) -> Result<(), DecodeError> {
        let mut header = [0u8; HEADER_LEN];
        let n = read_full(&mut self.reader, &mut header).map_err(|e| io_error(&e))?;
        if n < HEADER_LEN {
            return Err(DecodeError::Truncated {
                offset: n as u64,
                reason: "missing stream header".into(),
            });
        }
        self.offset = HEADER_LEN as u64;

        let mut found = [0u8; 4];
        found.copy_from_slice(&header[..4]);
        if found != MAGIC {
            return Err(DecodeError::BadMagic { found });
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != STREAM_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        Ok(())
    }

    fn read_u32(&mut self, what: &str) -> Result<u32, DecodeError> {
        let offset = self.offset;
        let value = self.reader.read_u32::<LittleEndian>().map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                DecodeError::Truncated {
                    offset,
                    reason: format!("incomplete {}", what),
                }
            } else {
                io_error(&e)
            }
        })?;
        self.offset += 4;
        Ok(value)
    }

    fn next_item(&mut self) -> Result<Option<Vec<u8>>, DecodeError> {
        if !self.started {
            self.started = true;
            self.read_header()?;
        }
        loop {
            let mut tag = [0u8; 1];
            if read_full(&mut self.reader, &mut tag).map_err(|e| io_error(&e))? == 0 {
                return Ok(None);
            }
            let tag_offset = self.offset;
            self.offset += 1;

            match tag[0] {
                TAG_VALUE => {
                    let len = self.read_u32("value length")?;
                    let mut value = Vec::new();
                    let got = (&mut self.reader)
                        .take(u64::from(len))
                        .read_to_end(&mut value)
                        .map_err(|e| io_error(&e))?;
                    if got < len as usize {
                        return Err(DecodeError::Truncated {
                            offset: self.offset + got as u64,
                            reason: format!("value needs {} bytes, {} available", len, got),
                        });
                    }
                    self.offset += u64::from(len);
                    self.handles.push(value.clone());
                    return Ok(Some(value));
                }
                TAG_BACKREF => {
                    let handle = self.read_u32("back-reference")?;
                    return self
                        .handles
                        .get(handle as usize)
                        .cloned()
                        .map(Some)
                        .ok_or(DecodeError::DanglingHandle {
                            handle,
                            known: self.handles.len(),
                        });
                }
                TAG_RESET => self.handles.clear(),
                tag => {
                    return Err(DecodeError::UnknownTag {
                        tag,
                        offset: tag_offset,
                    })
                }
            }
        }
    }
}

impl<R: Read> Iterator for StreamDecoder<R> {
    type Item = Result<Vec<u8>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_item() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn io_error(e: &io::Error) -> DecodeError {
    DecodeError::Io(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Vec<Result<Vec<u8>, DecodeError>> {
        StreamDecoder::new(bytes).collect()
    }

    #[test]
    fn test_empty_stream_is_header_only() {
        let bytes = StreamEncoder::new().finish();
        assert_eq!(bytes, b"DPXS\x01\x00");
        assert!(decode(&bytes).is_empty());
    }

    #[test]
    fn test_repeated_values_become_backrefs() {
        let mut encoder = StreamEncoder::new();
        encoder.push(b"key").unwrap();
        encoder.push(b"key").unwrap();
        encoder.push(b"other").unwrap();
        let bytes = encoder.finish();
        // header + (1+4+3) + (1+4) + (1+4+5)
        assert_eq!(bytes.len(), HEADER_LEN + 8 + 5 + 10);
        assert_eq!(bytes[HEADER_LEN + 8], TAG_BACKREF);

        let values: Vec<_> = decode(&bytes).into_iter().map(Result::unwrap).collect();
        assert_eq!(values, [b"key".to_vec(), b"key".to_vec(), b"other".to_vec()]);
    }

    #[test]
    fn test_reset_restarts_handles() {
        let mut encoder = StreamEncoder::new();
        encoder.push(b"a").unwrap();
        encoder.reset();
        encoder.push(b"b").unwrap();
        encoder.push(b"a").unwrap();
        encoder.push(b"b").unwrap();
        assert_eq!(encoder.resets(), 1);
        assert_eq!(encoder.values(), 4);
        let values: Vec<_> = decode(&encoder.finish())
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(values, [b"a".to_vec(), b"b".to_vec(), b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_value_length_must_fit_u32() {
        assert_eq!(value_len(u32::MAX as usize).unwrap(), u32::MAX);
        assert!(matches!(
            value_len(u32::MAX as usize + 1),
            Err(Error::ValueTooLong { length }) if length == 1 << 32
        ));
    }

    #[test]
    fn test_bad_magic() {
        let result = decode(b"NOPE\x01\x00");
        assert_eq!(
            result,
            [Err(DecodeError::BadMagic { found: *b"NOPE" })]
        );
    }

    #[test]
    fn test_unsupported_version() {
        let result = decode(b"DPXS\x02\x00");
        assert_eq!(result, [Err(DecodeError::UnsupportedVersion(2))]);
    }

    #[test]
    fn test_truncated_value_then_fused() {
        let mut bytes = encode_values([b"hello".as_slice(), b"world".as_slice()]).unwrap();
        bytes.truncate(bytes.len() - 1);
        let mut decoder = StreamDecoder::new(bytes.as_slice());
        assert_eq!(decoder.next(), Some(Ok(b"hello".to_vec())));
        assert_eq!(decoder.offset(), (HEADER_LEN + 1 + 4 + 5) as u64);
        assert!(matches!(decoder.next(), Some(Err(DecodeError::Truncated { .. }))));
        assert_eq!(decoder.next(), None);
    }

    #[test]
    fn test_dangling_handle_and_unknown_tag() {
        let mut bytes = StreamEncoder::new().finish();
        bytes.extend_from_slice(&[TAG_BACKREF, 5, 0, 0, 0]);
        assert_eq!(
            decode(&bytes),
            [Err(DecodeError::DanglingHandle { handle: 5, known: 0 })]
        );

        let mut bytes = StreamEncoder::new().finish();
        bytes.push(0x7f);
        assert_eq!(
            decode(&bytes),
            [Err(DecodeError::UnknownTag {
                tag: 0x7f,
                offset: HEADER_LEN as u64
            })]
        );
    }

    #[test]
    fn test_missing_header_is_truncation() {
        assert!(matches!(
            decode(b"DP").as_slice(),
            [Err(DecodeError::Truncated { offset: 2, .. })]
        ));
    }
}
