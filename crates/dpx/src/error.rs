// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types shared by every dpx subsystem.
//!
//! None of these are retried internally. A layout mismatch or a probe failure
//! means the native engine must not be initialized at all.

use thiserror::Error;

/// Errors raised while decoding a partition stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended in the middle of an item (or a key without its value).
    #[error("stream truncated at byte {offset}: {reason}")]
    Truncated { offset: u64, reason: String },

    /// Stream header magic does not match.
    #[error("bad stream magic {found:02x?}")]
    BadMagic { found: [u8; 4] },

    /// Stream header carries a version this decoder does not know.
    #[error("unsupported stream version {0}")]
    UnsupportedVersion(u16),

    /// Item tag is not one of new/back-reference/reset.
    #[error("unknown item tag 0x{tag:02x} at byte {offset}")]
    UnknownTag { tag: u8, offset: u64 },

    /// Back-reference points past the handle table.
    #[error("back-reference to handle {handle} but only {known} values known")]
    DanglingHandle { handle: u32, known: usize },

    /// Stream ended after a key with no value following it.
    #[error("stream ended after the key of record {record} without its value")]
    UnpairedKey { record: u64 },

    /// Underlying reader failed for a reason other than end of input.
    #[error("read failed: {0}")]
    Io(String),
}

/// Crate error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Interface without a binding, unknown type, or malformed registration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Probed runtime layout disagrees with the expected contract.
    #[error("layout mismatch on `{field}`: expected {expected}, actual {actual}")]
    LayoutMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    /// Verification subprocess could not run or its report was unreadable.
    #[error("layout probe failed: {0}")]
    ProbeFailed(String),

    /// Partition input ended abnormally.
    #[error("partition stream decode failed: {0}")]
    PartitionDecode(#[from] DecodeError),

    /// Declared frame length exceeds the maximum record size.
    #[error("frame of {length} bytes exceeds maximum of {max}")]
    FrameTooLong { length: u64, max: u64 },

    /// Declared frame length is smaller than its own prefix.
    #[error("frame length {0} is shorter than the 8-byte prefix")]
    FrameTooShort(u64),

    /// Stream value longer than its u32 length field can describe.
    #[error("value of {length} bytes does not fit a stream length field")]
    ValueTooLong { length: u64 },

    /// Input ended inside a frame.
    #[error("frame truncated: expected {expected} payload bytes")]
    FrameTruncated { expected: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for errors that describe a genuine layout drift rather than an
    /// infrastructure failure.
    pub fn is_layout_drift(&self) -> bool {
        matches!(self, Error::LayoutMismatch { .. })
    }
}

/// Convenient alias for results using the crate [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
