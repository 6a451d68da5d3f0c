// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Layout-contract derivation and verification.
//!
//! The native engine decodes compressed references and class pointers on
//! its own, so the runtime's reference compression mode, shifts and base
//! addresses must be known exactly before any direct memory access. They
//! are obtained from an isolated runtime started with the same sizing and
//! compared field by field with what the caller expects.
//!
//! # Example
//!
//! ```no_run
//! use dpx::layout::{RuntimeFlags, RuntimeLayoutProbe};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! // The report carries one heap size, so -Xms and -Xmx must agree.
//! let mut sizing = RuntimeFlags::query(Path::new("java"))?.sizing()?;
//! sizing.heap_min_size = sizing.heap_max_size;
//! let probe = RuntimeLayoutProbe::new("java").with_timeout(Duration::from_secs(10));
//! let contract = probe.derive(&sizing)?;
//! let verified = probe.validate(&contract)?;
//! assert_eq!(verified, contract);
//! # Ok::<(), dpx::Error>(())
//! ```

mod contract;
mod flags;
mod probe;
mod report;

pub use contract::{CompressedOopsMode, LayoutContract, RuntimeSizing};
pub use flags::RuntimeFlags;
pub use probe::{RuntimeLayoutProbe, DEFAULT_PROBE_TIMEOUT};
pub use report::{ProbeReport, REPORT_LINES};
