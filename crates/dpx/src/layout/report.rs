// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parsing and checking of the runtime's compressed-oops diagnostic report.
//!
//! # Report Format (JDK 8 HotSpot)
//!
//! ```text
//! heap address: 0x00000006c0000000, size: 4096 MB, Compressed Oops mode: Zero based, Oop shift amount: 3
//! Narrow klass base: 0x0000000000000000, Narrow klass shift: 3
//! Compressed class space size: 1073741824 Address: 0x00000007c0000000 Req Addr: 0x00000007c0000000
//! ```
//!
//! This is the only place free text from the runtime is interpreted. A
//! parsed [`ProbeReport`] can be handed on as one framed JSON record.

use super::contract::{CompressedOopsMode, LayoutContract, RuntimeSizing};
use crate::error::{Error, Result};
use crate::framing::{FrameReader, FrameWriter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};

/// Number of report lines the runtime prints.
pub const REPORT_LINES: usize = 3;

/// Layout values reported by the verification runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub heap_base: u64,
    /// Reported heap size, converted to bytes.
    pub heap_size: u64,
    pub compressed_oops_mode: CompressedOopsMode,
    /// Base printed after the mode label for non-zero based modes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_oops_base: Option<u64>,
    pub oop_shift: u32,
    pub narrow_klass_base: u64,
    pub narrow_klass_shift: u32,
    pub compressed_class_space_size: u64,
    pub compressed_class_space_base: u64,
    pub compressed_class_space_requested_base: u64,
}

impl ProbeReport {
    /// Parse the report from the runtime's stdout. Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        Self::from_lines(&lines)
    }

    /// Parse the three report lines.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        if lines.len() < REPORT_LINES {
            return Err(Error::ProbeFailed(format!(
                "expected {} report lines, got {}",
                REPORT_LINES,
                lines.len()
            )));
        }
        let heap = parse_heap_line(lines[0].as_ref())?;
        let (narrow_klass_base, narrow_klass_shift) = parse_klass_line(lines[1].as_ref())?;
        let class_space = parse_class_space_line(lines[2].as_ref())?;

        Ok(Self {
            heap_base: heap.base,
            heap_size: heap.size,
            compressed_oops_mode: heap.mode,
            compressed_oops_base: heap.mode_base,
            oop_shift: heap.shift,
            narrow_klass_base,
            narrow_klass_shift,
            compressed_class_space_size: class_space.size,
            compressed_class_space_base: class_space.base,
            compressed_class_space_requested_base: class_space.requested,
        })
    }

    /// Compare against a full contract, field by field in a fixed order.
    ///
    /// Fails on the first disagreeing field.
    pub fn check(&self, expected: &LayoutContract) -> Result<()> {
        ensure("heap_base", Addr(expected.heap_base), Addr(self.heap_base))?;
        ensure("heap_max_size", expected.heap_max_size, self.heap_size)?;
        ensure("heap_min_size", expected.heap_min_size, self.heap_size)?;
        ensure(
            "compressed_oops_mode",
            expected.compressed_oops_mode,
            self.compressed_oops_mode,
        )?;
        ensure("oop_shift", expected.oop_shift, self.oop_shift)?;
        ensure(
            "narrow_klass_base",
            Addr(expected.narrow_klass_base),
            Addr(self.narrow_klass_base),
        )?;
        ensure(
            "narrow_klass_shift",
            expected.narrow_klass_shift,
            self.narrow_klass_shift,
        )?;
        ensure(
            "compressed_class_space_size",
            expected.compressed_class_space_size,
            self.compressed_class_space_size,
        )?;
        ensure(
            "compressed_class_space_base",
            Addr(expected.compressed_class_space_base),
            Addr(self.compressed_class_space_base),
        )?;
        self.check_requested_base()
    }

    /// Compare only the caller-controlled sizing.
    pub fn check_sizing(&self, sizing: &RuntimeSizing) -> Result<()> {
        ensure("heap_base", Addr(sizing.heap_base), Addr(self.heap_base))?;
        ensure("heap_max_size", sizing.heap_max_size, self.heap_size)?;
        ensure("heap_min_size", sizing.heap_min_size, self.heap_size)?;
        ensure(
            "compressed_class_space_size",
            sizing.compressed_class_space_size,
            self.compressed_class_space_size,
        )?;
        self.check_requested_base()
    }

    fn check_requested_base(&self) -> Result<()> {
        ensure(
            "compressed_class_space_requested_base",
            Addr(self.compressed_class_space_base),
            Addr(self.compressed_class_space_requested_base),
        )
    }

    /// Build the contract implied by this report and the sizing it was
    /// probed with.
    pub fn to_contract(&self, sizing: &RuntimeSizing) -> LayoutContract {
        LayoutContract {
            compressed_oops_mode: self.compressed_oops_mode,
            oop_shift: self.oop_shift,
            heap_base: self.heap_base,
            heap_min_size: sizing.heap_min_size,
            heap_max_size: sizing.heap_max_size,
            metaspace_size: sizing.metaspace_size,
            max_metaspace_size: sizing.max_metaspace_size,
            narrow_klass_base: self.narrow_klass_base,
            narrow_klass_shift: self.narrow_klass_shift,
            compressed_class_space_size: self.compressed_class_space_size,
            compressed_class_space_base: self.compressed_class_space_base,
        }
    }

    /// Write as one framed JSON record.
    pub fn write_framed<W: Write>(&self, writer: W) -> Result<()> {
        let mut framed = FrameWriter::new(writer);
        framed.write_record(&serde_json::to_vec(self)?)?;
        framed.flush()
    }

    /// Read one framed JSON record.
    pub fn read_framed<R: Read>(reader: R) -> Result<Self> {
        let payload = FrameReader::new(reader)
            .read_record()?
            .ok_or_else(|| Error::ProbeFailed("no framed report in stream".into()))?;
        Ok(serde_json::from_slice(&payload)?)
    }
}

fn ensure<T: PartialEq + fmt::Display>(field: &'static str, expected: T, actual: T) -> Result<()> {
    if expected == actual {
        return Ok(());
    }
    Err(Error::LayoutMismatch {
        field,
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// Address shown in hex in mismatch messages.
#[derive(PartialEq)]
struct Addr(u64);

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

struct HeapLine {
    base: u64,
    size: u64,
    mode: CompressedOopsMode,
    mode_base: Option<u64>,
    shift: u32,
}

fn parse_heap_line(line: &str) -> Result<HeapLine> {
    let mut base = None;
    let mut size = None;
    let mut mode = None;
    let mut mode_base = None;
    let mut shift = 0;

    for (key, value) in pairs(line) {
        match key {
            "heap address" => base = Some(parse_hex(key, value)?),
            "size" => {
                let mb = value
                    .strip_suffix(" MB")
                    .ok_or_else(|| malformed(key, value))?;
                let mb: u64 = mb.trim().parse().map_err(|_| malformed(key, value))?;
                size = Some(
                    mb.checked_mul(1024 * 1024)
                        .ok_or_else(|| malformed(key, value))?,
                );
            }
            "Compressed Oops mode" => {
                let (label, extra) = match value.split_once(": ") {
                    Some((label, extra)) => (label, Some(extra)),
                    None => (value, None),
                };
                mode = Some(label.trim().parse::<CompressedOopsMode>()?);
                mode_base = extra.map(|b| parse_hex(key, b)).transpose()?;
            }
            "Oop shift amount" => shift = value.trim().parse().map_err(|_| malformed(key, value))?,
            _ => {}
        }
    }

    Ok(HeapLine {
        base: base.ok_or_else(|| missing("heap address"))?,
        size: size.ok_or_else(|| missing("size"))?,
        mode: mode.ok_or_else(|| missing("Compressed Oops mode"))?,
        mode_base,
        shift,
    })
}

fn parse_klass_line(line: &str) -> Result<(u64, u32)> {
    let mut base = None;
    let mut shift = None;
    for (key, value) in pairs(line) {
        match key {
            "Narrow klass base" => base = Some(parse_hex(key, value)?),
            "Narrow klass shift" => {
                shift = Some(value.trim().parse().map_err(|_| malformed(key, value))?);
            }
            _ => {}
        }
    }
    Ok((
        base.ok_or_else(|| missing("Narrow klass base"))?,
        shift.ok_or_else(|| missing("Narrow klass shift"))?,
    ))
}

struct ClassSpaceLine {
    size: u64,
    base: u64,
    requested: u64,
}

fn parse_class_space_line(line: &str) -> Result<ClassSpaceLine> {
    const SIZE: &str = "Compressed class space size: ";
    let rest = line
        .trim()
        .strip_prefix(SIZE)
        .ok_or_else(|| missing("Compressed class space size"))?;
    let (size, rest) = rest
        .split_once(" Address: ")
        .ok_or_else(|| missing("Address"))?;
    let (base, requested) = rest
        .split_once(" Req Addr: ")
        .ok_or_else(|| missing("Req Addr"))?;

    Ok(ClassSpaceLine {
        size: size
            .trim()
            .parse()
            .map_err(|_| malformed("Compressed class space size", size))?,
        base: parse_hex("Address", base)?,
        requested: parse_hex("Req Addr", requested)?,
    })
}

/// `key: value` pairs separated by `, `.
fn pairs(line: &str) -> impl Iterator<Item = (&str, &str)> {
    line.trim()
        .split(", ")
        .filter_map(|pair| pair.split_once(": "))
        .map(|(k, v)| (k.trim(), v.trim()))
}

fn parse_hex(key: &str, value: &str) -> Result<u64> {
    let digits = value
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| malformed(key, value))?;
    u64::from_str_radix(digits, 16).map_err(|_| malformed(key, value))
}

fn missing(key: &str) -> Error {
    Error::ProbeFailed(format!("report is missing `{}`", key))
}

fn malformed(key: &str, value: &str) -> Error {
    Error::ProbeFailed(format!("malformed `{}` value `{}`", key, value))
}
