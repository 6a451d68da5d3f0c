// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Seam to the native offload engine.
//!
//! The engine itself lives outside this crate. [`Session`] drives any
//! [`OffloadEngine`] through its lifecycle:
//!
//! ```text
//! new -> initialize(contract) -> register(schema)* -> start -> stop -> destroy
//!                                                       ^        |
//!                                                       +--------+
//! ```
//!
//! `initialize` also registers the built-in types every engine needs
//! (`byte[]`, `char[]`, `java.lang.String`, `java.lang.Integer`).

pub use crate::config::EngineOptions;
use crate::error::{Error, Result};
use crate::layout::LayoutContract;
use crate::types::{InterfaceMapping, SchemaSet, TypeDescriptor, TypeGraphCollector, TypeRegistry};

/// Types registered by every session before any caller schema.
pub const BUILTIN_ROOTS: [&str; 4] = ["byte[]", "char[]", "java.lang.String", "java.lang.Integer"];

/// Native zero-copy serialization engine.
///
/// Implementations read object memory directly, so they are only ever
/// handed a verified [`LayoutContract`] and the schemas of the types they
/// will see.
pub trait OffloadEngine {
    fn initialize(&mut self, contract: &LayoutContract, options: &EngineOptions) -> Result<()>;

    /// Learn the layout of every entry in `schema`.
    fn register(&mut self, schema: &SchemaSet) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn destroy(&mut self) -> Result<()>;

    /// Encode the object image `object` of type `ty`.
    fn serialize(&mut self, ty: &TypeDescriptor, object: &[u8]) -> Result<Vec<u8>>;

    /// Rebuild an object image of type `ty` from `buffer`.
    fn deserialize(&mut self, ty: &TypeDescriptor, buffer: &[u8]) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Initialized,
    Started,
    Stopped,
    Destroyed,
}

/// Lifecycle wrapper enforcing call order on an [`OffloadEngine`].
#[derive(Debug)]
pub struct Session<E: OffloadEngine> {
    engine: E,
    state: SessionState,
    contract: Option<LayoutContract>,
    options: EngineOptions,
    registered: SchemaSet,
}

impl<E: OffloadEngine> Session<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: SessionState::Created,
            contract: None,
            options: EngineOptions::default(),
            registered: SchemaSet::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn contract(&self) -> Option<&LayoutContract> {
        self.contract.as_ref()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Everything handed to the engine so far.
    pub fn registered(&self) -> &SchemaSet {
        &self.registered
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Hand the verified contract to the engine, then register the built-ins.
    pub fn initialize(&mut self, contract: &LayoutContract, options: &EngineOptions) -> Result<()> {
        self.expect_state(&[SessionState::Created], "initialize")?;
        options.validate()?;
        self.engine.initialize(contract, options)?;
        self.contract = Some(*contract);
        self.options = *options;
        self.state = SessionState::Initialized;

        let builtins = TypeRegistry::with_builtins();
        let roots = BUILTIN_ROOTS
            .iter()
            .map(|name| name.parse::<TypeDescriptor>())
            .collect::<Result<Vec<_>>>()?;
        let schema = TypeGraphCollector::new(&builtins).collect_all(&roots, None)?;
        self.register(&schema)?;
        log::info!(
            "[session] initialized ({} built-in entries)",
            self.registered.len()
        );
        Ok(())
    }

    /// Register the parts of `schema` the engine has not seen yet.
    ///
    /// Only allowed between `initialize` and `start`.
    pub fn register(&mut self, schema: &SchemaSet) -> Result<()> {
        self.expect_state(&[SessionState::Initialized], "register")?;
        let mut fresh = SchemaSet::new();
        for entry in schema.entries() {
            if !self.registered.contains(&entry.ty) {
                fresh.insert(&entry.ty, entry.kind);
            }
        }
        if fresh.is_empty() {
            return Ok(());
        }
        let tables = schema
            .enum_tables()
            .iter()
            .filter(|t| fresh.contains_name(&t.name))
            .cloned()
            .collect();
        fresh.set_enum_tables(tables);

        self.engine.register(&fresh)?;
        log::debug!("[session] registered {} new entries", fresh.len());
        self.registered.merge(&fresh);
        Ok(())
    }

    /// Collect the schema of `root` and register it.
    pub fn register_type(
        &mut self,
        registry: &TypeRegistry,
        root: &TypeDescriptor,
        mapping: Option<&InterfaceMapping>,
    ) -> Result<()> {
        let schema = TypeGraphCollector::new(registry).collect(root, mapping)?;
        self.register(&schema)
    }

    pub fn start(&mut self) -> Result<()> {
        self.expect_state(&[SessionState::Initialized, SessionState::Stopped], "start")?;
        self.engine.start()?;
        self.state = SessionState::Started;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.expect_state(&[SessionState::Started], "stop")?;
        self.engine.stop()?;
        self.state = SessionState::Stopped;
        Ok(())
    }

    /// Stop the engine if running and release it. Idempotent.
    pub fn destroy(&mut self) -> Result<()> {
        match self.state {
            SessionState::Destroyed => return Ok(()),
            SessionState::Created => {
                self.state = SessionState::Destroyed;
                return Ok(());
            }
            SessionState::Started => self.stop()?,
            SessionState::Initialized | SessionState::Stopped => {}
        }
        self.state = SessionState::Destroyed;
        self.engine.destroy()
    }

    pub fn serialize(&mut self, ty: &TypeDescriptor, object: &[u8]) -> Result<Vec<u8>> {
        self.expect_running(ty, "serialize")?;
        self.engine.serialize(ty, object)
    }

    pub fn deserialize(&mut self, ty: &TypeDescriptor, buffer: &[u8]) -> Result<Vec<u8>> {
        self.expect_running(ty, "deserialize")?;
        self.engine.deserialize(ty, buffer)
    }

    fn expect_running(&self, ty: &TypeDescriptor, op: &str) -> Result<()> {
        self.expect_state(&[SessionState::Started], op)?;
        if !self.registered.contains(ty) {
            return Err(Error::Configuration(format!(
                "{}: type `{}` was never registered",
                op, ty
            )));
        }
        Ok(())
    }

    fn expect_state(&self, allowed: &[SessionState], op: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(Error::Configuration(format!(
            "{} not allowed in state {:?}",
            op, self.state
        )))
    }
}

impl<E: OffloadEngine> Drop for Session<E> {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            log::warn!("[session] destroy on drop failed: {}", e);
        }
    }
}
