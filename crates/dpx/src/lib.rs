// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! dpx: managed-runtime contract layer for a zero-copy offload engine
//!
//! A native engine that reads object memory directly needs two things before
//! the first object crosses over: the layout of every class it may meet, and
//! proof that the runtime lays objects out the way the engine assumes.
//!
//! # Features
//!
//! - **Schema discovery** ([`types`]): walk a root type's field and
//!   type-argument graph into a deduplicated [`SchemaSet`](types::SchemaSet),
//!   resolving interfaces through explicit bindings
//! - **Layout contract** ([`layout`]): probe an isolated runtime and verify
//!   its compressed-reference parameters field by field
//! - **Stream partitioning** ([`partition`]): hash-route a key/value stream
//!   into N sealed buffers with bounded encoder state
//! - **Engine seam** ([`engine`]): lifecycle-checked [`Session`] over any
//!   [`OffloadEngine`]
//!
//! # Configuration File
//!
//! ```toml
//! [runtime]
//! java = "java"
//! probe_timeout_secs = 30
//!
//! [partition]
//! count = 32
//!
//! [[mappings]]
//! interface = "java.util.List<java.lang.String>"
//! concrete = "java.util.ArrayList<java.lang.String>"
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod framing;
pub mod layout;
pub mod partition;
pub mod types;

pub use config::{DpxConfig, EngineOptions, PartitionConfig, RuntimeConfig};
pub use engine::{OffloadEngine, Session, SessionState};
pub use error::{DecodeError, Error, Result};
pub use framing::{FrameReader, FrameWriter};
pub use layout::{LayoutContract, ProbeReport, RuntimeLayoutProbe, RuntimeSizing};
pub use partition::{Partitioned, StreamEnd, StreamPartitioner};
pub use types::{InterfaceMapping, SchemaSet, TypeDescriptor, TypeGraphCollector, TypeRegistry};
