// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Layout contract value types.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the runtime compresses object references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressedOopsMode {
    /// Heap below 4 GiB, references are raw 32-bit addresses.
    ThirtyTwoBit,
    /// Heap below 32 GiB, references are shifted with a zero base.
    ZeroBased,
    /// Non-zero base whose bits do not overlap the shifted reference.
    DisjointBase,
    /// Non-zero base added after shifting.
    HeapBased,
}

impl CompressedOopsMode {
    pub const ALL: [CompressedOopsMode; 4] = [
        CompressedOopsMode::ThirtyTwoBit,
        CompressedOopsMode::ZeroBased,
        CompressedOopsMode::DisjointBase,
        CompressedOopsMode::HeapBased,
    ];

    /// Label used in the runtime's diagnostic report.
    pub fn label(self) -> &'static str {
        match self {
            CompressedOopsMode::ThirtyTwoBit => "32-bit",
            CompressedOopsMode::ZeroBased => "Zero based",
            CompressedOopsMode::DisjointBase => "Non-zero disjoint base",
            CompressedOopsMode::HeapBased => "Non-zero based",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }
}

impl fmt::Display for CompressedOopsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CompressedOopsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_label(s)
            .ok_or_else(|| Error::ProbeFailed(format!("unknown compressed oops mode `{}`", s)))
    }
}

/// Caller-controlled sizing parameters, passed to the verification runtime
/// as command-line flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuntimeSizing {
    /// `-Xms`, in bytes.
    pub heap_min_size: u64,
    /// `-Xmx`, in bytes.
    pub heap_max_size: u64,
    /// `-XX:HeapBaseMinAddress`.
    pub heap_base: u64,
    pub metaspace_size: u64,
    pub max_metaspace_size: u64,
    pub compressed_class_space_size: u64,
}

impl RuntimeSizing {
    pub fn validate(&self) -> Result<()> {
        if self.heap_max_size == 0 {
            return Err(Error::Configuration("heap_max_size must be positive".into()));
        }
        if self.heap_min_size > self.heap_max_size {
            return Err(Error::Configuration(format!(
                "heap_min_size {} exceeds heap_max_size {}",
                self.heap_min_size, self.heap_max_size
            )));
        }
        if self.metaspace_size > self.max_metaspace_size {
            return Err(Error::Configuration(format!(
                "metaspace_size {} exceeds max_metaspace_size {}",
                self.metaspace_size, self.max_metaspace_size
            )));
        }
        if self.compressed_class_space_size == 0 {
            return Err(Error::Configuration(
                "compressed_class_space_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Validated object-layout parameters of the host runtime.
///
/// Produced once by the layout probe and never mutated; the native engine
/// relies on it for every direct memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutContract {
    pub compressed_oops_mode: CompressedOopsMode,
    pub oop_shift: u32,
    pub heap_base: u64,
    pub heap_min_size: u64,
    pub heap_max_size: u64,
    pub metaspace_size: u64,
    pub max_metaspace_size: u64,
    /// Base used to decode compressed class pointers.
    pub narrow_klass_base: u64,
    pub narrow_klass_shift: u32,
    pub compressed_class_space_size: u64,
    pub compressed_class_space_base: u64,
}

impl LayoutContract {
    /// The sizing subset that was passed to the runtime.
    pub fn sizing(&self) -> RuntimeSizing {
        RuntimeSizing {
            heap_min_size: self.heap_min_size,
            heap_max_size: self.heap_max_size,
            heap_base: self.heap_base,
            metaspace_size: self.metaspace_size,
            max_metaspace_size: self.max_metaspace_size,
            compressed_class_space_size: self.compressed_class_space_size,
        }
    }

    /// Decode a compressed class pointer.
    pub fn decode_klass(&self, narrow: u32) -> u64 {
        self.narrow_klass_base + (u64::from(narrow) << self.narrow_klass_shift)
    }
}

impl fmt::Display for LayoutContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "compressed oops mode   {}", self.compressed_oops_mode)?;
        writeln!(f, "oop shift              {}", self.oop_shift)?;
        writeln!(f, "heap base              {:#x}", self.heap_base)?;
        writeln!(f, "heap size              {}..{}", self.heap_min_size, self.heap_max_size)?;
        writeln!(
            f,
            "metaspace size         {}..{}",
            self.metaspace_size, self.max_metaspace_size
        )?;
        writeln!(f, "narrow klass base      {:#x}", self.narrow_klass_base)?;
        writeln!(f, "narrow klass shift     {}", self.narrow_klass_shift)?;
        writeln!(
            f,
            "class space            {} @ {:#x}",
            self.compressed_class_space_size, self.compressed_class_space_base
        )
    }
}
