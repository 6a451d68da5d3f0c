// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema discovery for the offload engine.
//!
//! The engine reads object memory directly, so before any object crosses over
//! it must be told the layout of every concrete class reachable from the
//! types it will handle.
//!
//! # Features
//!
//! - **TypeDescriptor**: structural type identity (raw type, arguments, owner)
//! - **TypeRegistry**: explicitly registered class descriptions, no reflection
//! - **InterfaceMapping**: concrete substitutes for interface-shaped types
//! - **TypeGraphCollector**: depth-first walk producing a [`SchemaSet`]
//!
//! # Example
//!
//! ```rust
//! use dpx::types::{ClassDefBuilder, InterfaceMapping, TypeGraphCollector, TypeRegistry};
//!
//! let mut registry = TypeRegistry::with_builtins();
//! registry.define(
//!     ClassDefBuilder::class("pkg.Album")
//!         .parse_field("title", "java.lang.String")?
//!         .parse_field("tracks", "java.util.List<java.lang.String>")?
//!         .build(),
//! )?;
//!
//! let mapping = InterfaceMapping::new().with(
//!     "java.util.List<java.lang.String>".parse()?,
//!     "java.util.ArrayList<java.lang.String>".parse()?,
//! )?;
//!
//! let schema = TypeGraphCollector::new(&registry).collect(&"pkg.Album".parse()?, Some(&mapping))?;
//! assert!(schema.contains_name("java.util.ArrayList"));
//! assert!(schema.contains_name("java.util.List"));
//! # Ok::<(), dpx::Error>(())
//! ```

mod builder;
mod collector;
mod descriptor;
mod mapping;
mod registry;
mod schema;

pub use builder::ClassDefBuilder;
pub use collector::TypeGraphCollector;
pub use descriptor::{PrimitiveKind, RawType, TypeDescriptor};
pub use mapping::{InterfaceBinding, InterfaceMapping};
pub use registry::{ClassDef, ClassKind, ClassSpec, FieldDef, FieldSpec, KindSpec, TypeRegistry};
pub use schema::{EntryKind, EnumTable, SchemaEntry, SchemaSet};
