// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length-prefixed record framing.
//!
//! ```text
//! +----------------------+------------------------+
//! | length (8, u64 LE)   | payload (length - 8)   |
//! +----------------------+------------------------+
//! ```
//!
//! The declared length covers the prefix itself. EOF before a prefix is a
//! clean end of stream; EOF anywhere inside a record is an error.

use crate::error::{Error, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Read, Write};

/// Size of the length prefix.
pub const PREFIX_LEN: u64 = 8;

/// Largest accepted frame, prefix included (1 MiB).
pub const MAX_FRAME_LEN: u64 = 1024 * 1024;

/// Writes framed records to an underlying sink.
#[derive(Debug)]
pub struct FrameWriter<W: Write> {
    inner: W,
    max_len: u64,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            max_len: MAX_FRAME_LEN,
        }
    }

    /// Write one record. Payloads that would exceed the maximum frame size
    /// are rejected before anything is written.
    pub fn write_record(&mut self, payload: &[u8]) -> Result<()> {
        let length = payload.len() as u64 + PREFIX_LEN;
        if length > self.max_len {
            return Err(Error::FrameTooLong {
                length,
                max: self.max_len,
            });
        }
        self.inner.write_u64::<LittleEndian>(length)?;
        self.inner.write_all(payload)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads framed records from an underlying source.
#[derive(Debug)]
pub struct FrameReader<R: Read> {
    inner: R,
    max_len: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            max_len: MAX_FRAME_LEN,
        }
    }

    /// Read the next record, or `None` on a clean end of stream.
    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>> {
        let mut prefix = [0u8; PREFIX_LEN as usize];
        match read_full(&mut self.inner, &mut prefix)? {
            0 => return Ok(None),
            n if n < prefix.len() => {
                return Err(Error::FrameTruncated {
                    expected: PREFIX_LEN,
                })
            }
            _ => {}
        }

        let length = u64::from_le_bytes(prefix);
        if length < PREFIX_LEN {
            return Err(Error::FrameTooShort(length));
        }
        if length > self.max_len {
            return Err(Error::FrameTooLong {
                length,
                max: self.max_len,
            });
        }

        let expected = length - PREFIX_LEN;
        let mut payload = vec![0u8; expected as usize];
        if read_full(&mut self.inner, &mut payload)? < payload.len() {
            return Err(Error::FrameTruncated { expected });
        }
        Ok(Some(payload))
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Fill `buf` as far as the reader allows; returns the byte count read.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
