// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Collected schema: the raw classes the engine must know the layout of.

use super::descriptor::TypeDescriptor;
use serde::Serialize;
use std::collections::HashMap;

/// Role of a schema entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Class or array with a fixed layout.
    Concrete,
    /// Enum; always paired with an [`EnumTable`].
    Enum,
    /// Interface declared at a use site. Never walked as a terminal: its
    /// substitute is always present too.
    InterfaceMarker,
}

/// One schema entry (an erased raw type).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SchemaEntry {
    pub ty: TypeDescriptor,
    pub kind: EntryKind,
}

/// Ordinal -> name table for one enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumTable {
    pub name: String,
    pub variants: Vec<String>,
}

impl EnumTable {
    pub fn name_of(&self, ordinal: usize) -> Option<&str> {
        self.variants.get(ordinal).map(String::as_str)
    }

    pub fn ordinal_of(&self, variant: &str) -> Option<usize> {
        self.variants.iter().position(|v| v == variant)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Deduplicated, discovery-ordered set of schema entries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaSet {
    entries: Vec<SchemaEntry>,
    #[serde(skip)]
    index: HashMap<TypeDescriptor, usize>,
    enum_tables: Vec<EnumTable>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the erasure of `ty`. Returns `false` if it was already present.
    pub fn insert(&mut self, ty: &TypeDescriptor, kind: EntryKind) -> bool {
        let erased = ty.erasure();
        if self.index.contains_key(&erased) {
            return false;
        }
        self.index.insert(erased.clone(), self.entries.len());
        self.entries.push(SchemaEntry { ty: erased, kind });
        true
    }

    /// True if the erasure of `ty` is present.
    pub fn contains(&self, ty: &TypeDescriptor) -> bool {
        self.index.contains_key(&ty.erasure())
    }

    /// Parse-and-lookup convenience.
    pub fn contains_name(&self, text: &str) -> bool {
        text.parse::<TypeDescriptor>()
            .map(|ty| self.contains(&ty))
            .unwrap_or(false)
    }

    pub fn kind_of(&self, ty: &TypeDescriptor) -> Option<EntryKind> {
        self.index
            .get(&ty.erasure())
            .map(|&i| self.entries[i].kind)
    }

    /// Every entry in discovery order, markers included.
    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    /// Entries with a layout (classes, arrays, enums).
    pub fn concrete(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.entries
            .iter()
            .filter(|e| e.kind != EntryKind::InterfaceMarker)
    }

    pub fn markers(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::InterfaceMarker)
    }

    pub fn enum_tables(&self) -> &[EnumTable] {
        &self.enum_tables
    }

    pub fn enum_table(&self, name: &str) -> Option<&EnumTable> {
        self.enum_tables.iter().find(|t| t.name == name)
    }

    pub(crate) fn set_enum_tables(&mut self, tables: Vec<EnumTable>) {
        self.enum_tables = tables;
    }

    /// Union `other` into `self`, keeping first-seen order.
    pub fn merge(&mut self, other: &SchemaSet) {
        for entry in &other.entries {
            self.insert(&entry.ty, entry.kind);
        }
        for table in &other.enum_tables {
            if self.enum_table(&table.name).is_none() {
                self.enum_tables.push(table.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
