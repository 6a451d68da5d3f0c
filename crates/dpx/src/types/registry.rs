// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registered class descriptions.
//!
//! The collector never introspects live objects. Every class it may reach has
//! to be described up front, either with [`ClassDefBuilder`](super::ClassDefBuilder)
//! or from a `[[classes]]` table in a TOML registry file.

use super::descriptor::{PrimitiveKind, TypeDescriptor};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of a registered class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    /// No fixed layout; must be substituted through an interface mapping.
    Interface,
    /// Enum with variants in ordinal order.
    Enum { variants: Vec<String> },
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeDescriptor,
    /// Static fields carry no per-instance layout and are skipped by the walk.
    pub is_static: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            is_static: false,
        }
    }

    pub fn static_field(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            is_static: true,
            ..Self::new(name, ty)
        }
    }
}

/// Description of one raw class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub kind: ClassKind,
    pub type_params: Vec<String>,
    pub fields: Vec<FieldDef>,
}

impl ClassDef {
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, ClassKind::Enum { .. })
    }

    /// Instance (non-static) fields in declaration order.
    pub fn instance_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.is_static)
    }

    pub fn variants(&self) -> &[String] {
        match &self.kind {
            ClassKind::Enum { variants } => variants,
            _ => &[],
        }
    }
}

/// Serialized form of a kind in registry files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindSpec {
    #[default]
    Class,
    Interface,
    Enum,
}

/// Serialized form of a field in registry files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

/// Serialized form of a [`ClassDef`].
///
/// Field types are parsed in the context of `type_params`, so a bare `T`
/// becomes a type variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSpec {
    pub name: String,
    #[serde(default)]
    pub kind: KindSpec,
    #[serde(default)]
    pub type_params: Vec<String>,
    #[serde(default)]
    pub variants: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl ClassSpec {
    pub fn to_def(&self) -> Result<ClassDef> {
        if self.kind != KindSpec::Enum && !self.variants.is_empty() {
            return Err(Error::Configuration(format!(
                "class `{}` declares variants but is not an enum",
                self.name
            )));
        }
        let kind = match self.kind {
            KindSpec::Class => ClassKind::Class,
            KindSpec::Interface => ClassKind::Interface,
            KindSpec::Enum => ClassKind::Enum {
                variants: self.variants.clone(),
            },
        };
        let fields = self
            .fields
            .iter()
            .map(|f| {
                Ok(FieldDef {
                    name: f.name.clone(),
                    ty: TypeDescriptor::parse_in(&f.ty, &self.type_params)?,
                    is_static: f.is_static,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ClassDef {
            name: self.name.clone(),
            kind,
            type_params: self.type_params.clone(),
            fields,
        })
    }
}

/// Lookup table from raw class name to its description.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    classes: HashMap<String, ClassDef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the runtime classes every schema needs.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for def in builtin_classes() {
            registry.classes.insert(def.name.clone(), def);
        }
        registry
    }

    /// Register a class. Re-registering an identical definition is a no-op;
    /// a conflicting one is a configuration error.
    pub fn define(&mut self, def: ClassDef) -> Result<()> {
        validate_def(&def)?;
        if let Some(existing) = self.classes.get(&def.name) {
            if *existing == def {
                return Ok(());
            }
            return Err(Error::Configuration(format!(
                "conflicting definitions for class `{}`",
                def.name
            )));
        }
        log::debug!("[schema] registered class {}", def.name);
        self.classes.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn define_all(&mut self, specs: &[ClassSpec]) -> Result<()> {
        for spec in specs {
            self.define(spec.to_def()?)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    /// Like [`get`](Self::get) but a missing class is a configuration error.
    pub fn require(&self, name: &str) -> Result<&ClassDef> {
        self.get(name)
            .ok_or_else(|| Error::Configuration(format!("class `{}` is not registered", name)))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

fn validate_def(def: &ClassDef) -> Result<()> {
    if def.name.is_empty() {
        return Err(Error::Configuration("class with empty name".into()));
    }
    if def.is_interface() && def.instance_fields().next().is_some() {
        return Err(Error::Configuration(format!(
            "interface `{}` declares instance fields",
            def.name
        )));
    }
    let mut seen = std::collections::HashSet::new();
    for field in &def.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(Error::Configuration(format!(
                "class `{}` declares field `{}` twice",
                def.name, field.name
            )));
        }
    }
    let mut variants = std::collections::HashSet::new();
    for variant in def.variants() {
        if !variants.insert(variant.as_str()) {
            return Err(Error::Configuration(format!(
                "enum `{}` declares variant `{}` twice",
                def.name, variant
            )));
        }
    }
    Ok(())
}

fn class(name: &str, fields: Vec<FieldDef>) -> ClassDef {
    ClassDef {
        name: name.into(),
        kind: ClassKind::Class,
        type_params: Vec::new(),
        fields,
    }
}

fn generic_class(name: &str, params: &[&str], fields: Vec<FieldDef>) -> ClassDef {
    ClassDef {
        type_params: params.iter().map(|p| (*p).to_string()).collect(),
        ..class(name, fields)
    }
}

fn interface(name: &str, params: &[&str]) -> ClassDef {
    ClassDef {
        kind: ClassKind::Interface,
        ..generic_class(name, params, Vec::new())
    }
}

fn boxed(name: &str, kind: PrimitiveKind) -> ClassDef {
    class(
        name,
        vec![
            FieldDef::static_field(
                "serialVersionUID",
                TypeDescriptor::primitive(PrimitiveKind::Long),
            ),
            FieldDef::new("value", TypeDescriptor::primitive(kind)),
        ],
    )
}

fn builtin_classes() -> Vec<ClassDef> {
    use PrimitiveKind::*;
    let prim = TypeDescriptor::primitive;
    let var = |name: &str| TypeDescriptor::variable(name);
    let object = || TypeDescriptor::class("java.lang.Object");
    let node = || TypeDescriptor::generic("java.util.HashMap$Node", vec![var("K"), var("V")]);

    vec![
        class("java.lang.Object", Vec::new()),
        class(
            "java.lang.String",
            vec![
                FieldDef::new("value", TypeDescriptor::array_of(prim(Char))),
                FieldDef::new("hash", prim(Int)),
            ],
        ),
        boxed("java.lang.Boolean", Boolean),
        boxed("java.lang.Byte", Byte),
        boxed("java.lang.Character", Char),
        boxed("java.lang.Short", Short),
        boxed("java.lang.Integer", Int),
        boxed("java.lang.Long", Long),
        boxed("java.lang.Float", Float),
        boxed("java.lang.Double", Double),
        interface("java.util.List", &["E"]),
        interface("java.util.Set", &["E"]),
        interface("java.util.Map", &["K", "V"]),
        generic_class(
            "java.util.ArrayList",
            &["E"],
            vec![
                FieldDef::static_field("DEFAULT_CAPACITY", prim(Int)),
                FieldDef::new("elementData", TypeDescriptor::array_of(object())),
                FieldDef::new("size", prim(Int)),
            ],
        ),
        generic_class(
            "java.util.HashMap",
            &["K", "V"],
            vec![
                FieldDef::new("table", TypeDescriptor::array_of(node())),
                FieldDef::new("size", prim(Int)),
                FieldDef::new("modCount", prim(Int)),
                FieldDef::new("threshold", prim(Int)),
                FieldDef::new("loadFactor", prim(Float)),
            ],
        ),
        generic_class(
            "java.util.HashMap$Node",
            &["K", "V"],
            vec![
                FieldDef::new("hash", prim(Int)),
                FieldDef::new("key", var("K")),
                FieldDef::new("value", var("V")),
                FieldDef::new("next", node()),
            ],
        ),
        generic_class(
            "java.util.HashSet",
            &["E"],
            vec![
                FieldDef::static_field("PRESENT", object()),
                FieldDef::new(
                    "map",
                    TypeDescriptor::generic("java.util.HashMap", vec![var("E"), object()]),
                ),
            ],
        ),
    ]
}
