// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type graph walk producing a [`SchemaSet`].
//!
//! The walk is over *types*, not instances: for each reachable type the raw
//! class's declared instance fields and every actual type argument are
//! visited. A visited set keyed by structural descriptor equality makes the
//! walk terminate on self-referential and mutually recursive definitions.
//!
//! # Rules
//!
//! | Reached type | Entry | Continues into |
//! |--------------|-------|----------------|
//! | primitive, type variable | none | - |
//! | array | concrete | component |
//! | class | concrete | instance fields, type arguments |
//! | enum | enum (+ variant table) | instance fields |
//! | interface | marker | mapped substitute, type arguments |

use super::descriptor::{RawType, TypeDescriptor};
use super::mapping::InterfaceMapping;
use super::registry::{ClassDef, ClassKind, TypeRegistry};
use super::schema::{EntryKind, EnumTable, SchemaSet};
use crate::error::{Error, Result};
use std::collections::HashSet;

/// Computes the schema reachable from a root type.
#[derive(Debug, Clone, Copy)]
pub struct TypeGraphCollector<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> TypeGraphCollector<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    /// Collect every type reachable from `root`.
    ///
    /// Fails with [`Error::Configuration`] when an interface is reached and
    /// `mapping` is `None` or has no binding for it, when a substitute is not
    /// a registered concrete class, or when a class is not registered.
    ///
    /// Before returning, the variant table of every enum entry is built, so
    /// the engine can resolve ordinal and name for all variants up front.
    pub fn collect(
        &self,
        root: &TypeDescriptor,
        mapping: Option<&InterfaceMapping>,
    ) -> Result<SchemaSet> {
        let mut walk = Walk {
            registry: self.registry,
            mapping,
            visited: HashSet::new(),
            stack: vec![root.clone()],
            schema: SchemaSet::new(),
        };
        walk.run()?;

        let mut schema = walk.schema;
        let tables = materialize_enum_tables(self.registry, &schema)?;
        schema.set_enum_tables(tables);

        log::debug!(
            "[schema] collected {} entries ({} enums) from {}",
            schema.len(),
            schema.enum_tables().len(),
            root
        );
        Ok(schema)
    }

    /// Collect several roots into one schema.
    pub fn collect_all<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a TypeDescriptor>,
        mapping: Option<&InterfaceMapping>,
    ) -> Result<SchemaSet> {
        let mut schema = SchemaSet::new();
        for root in roots {
            schema.merge(&self.collect(root, mapping)?);
        }
        Ok(schema)
    }
}

struct Walk<'a> {
    registry: &'a TypeRegistry,
    mapping: Option<&'a InterfaceMapping>,
    visited: HashSet<TypeDescriptor>,
    stack: Vec<TypeDescriptor>,
    schema: SchemaSet,
}

impl Walk<'_> {
    fn run(&mut self) -> Result<()> {
        while let Some(ty) = self.stack.pop() {
            if self.visited.contains(&ty) {
                continue;
            }
            let next = self.visit(&ty)?;
            self.visited.insert(ty);
            // Reverse so the walk order matches a recursive depth-first walk.
            self.stack.extend(next.into_iter().rev());
        }
        Ok(())
    }

    /// Record `ty` and return the types to visit next, in order.
    fn visit(&mut self, ty: &TypeDescriptor) -> Result<Vec<TypeDescriptor>> {
        let name = match ty.raw() {
            RawType::Primitive(_) | RawType::Variable(_) => return Ok(Vec::new()),
            RawType::Array(component) => {
                self.schema.insert(ty, EntryKind::Concrete);
                return Ok(vec![(**component).clone()]);
            }
            RawType::Class(name) => name,
        };

        let def = self.registry.require(name)?;
        check_arity(ty, def)?;

        let mut next = Vec::new();
        match &def.kind {
            ClassKind::Interface => {
                let substitute = self.resolve(ty)?;
                self.schema.insert(ty, EntryKind::InterfaceMarker);
                log::trace!("[schema] {} -> {}", ty, substitute);
                next.push(substitute);
            }
            ClassKind::Enum { .. } => {
                self.schema.insert(ty, EntryKind::Enum);
                next.extend(def.instance_fields().map(|f| f.ty.clone()));
            }
            ClassKind::Class => {
                self.schema.insert(ty, EntryKind::Concrete);
                next.extend(def.instance_fields().map(|f| f.ty.clone()));
            }
        }
        next.extend(ty.args().iter().cloned());
        Ok(next)
    }

    fn resolve(&self, interface: &TypeDescriptor) -> Result<TypeDescriptor> {
        let mapping = self.mapping.ok_or_else(|| {
            Error::Configuration(format!(
                "interface `{}` reached but no interface mapping was supplied",
                interface
            ))
        })?;
        let substitute = mapping.find(interface).ok_or_else(|| {
            Error::Configuration(format!("no concrete binding for interface `{}`", interface))
        })?;
        let concrete = substitute
            .class_name()
            .map(|name| self.registry.require(name))
            .transpose()?
            .filter(|def| !def.is_interface());
        if concrete.is_none() {
            return Err(Error::Configuration(format!(
                "substitute `{}` for `{}` is not a concrete class",
                substitute, interface
            )));
        }
        Ok(substitute.clone())
    }
}

fn check_arity(ty: &TypeDescriptor, def: &ClassDef) -> Result<()> {
    // A raw use (no arguments) is always allowed.
    if ty.is_generic() && ty.args().len() != def.type_params.len() {
        return Err(Error::Configuration(format!(
            "`{}` has {} type arguments but `{}` declares {}",
            ty,
            ty.args().len(),
            def.name,
            def.type_params.len()
        )));
    }
    Ok(())
}

/// Build the variant table of every enum in `schema`, in schema order.
fn materialize_enum_tables(registry: &TypeRegistry, schema: &SchemaSet) -> Result<Vec<EnumTable>> {
    schema
        .entries()
        .iter()
        .filter(|e| e.kind == EntryKind::Enum)
        .map(|e| {
            let name = e.ty.class_name().unwrap_or_default();
            let def = registry.require(name)?;
            Ok(EnumTable {
                name: def.name.clone(),
                variants: def.variants().to_vec(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassDefBuilder, PrimitiveKind};

    fn td(s: &str) -> TypeDescriptor {
        s.parse().unwrap()
    }

    fn names(schema: &SchemaSet) -> Vec<String> {
        schema.entries().iter().map(|e| e.ty.to_string()).collect()
    }

    #[test]
    fn test_primitive_root_is_empty() {
        let registry = TypeRegistry::new();
        let schema = TypeGraphCollector::new(&registry)
            .collect(&TypeDescriptor::primitive(PrimitiveKind::Long), None)
            .unwrap();
        assert!(schema.is_empty());
    }

    #[test]
    fn test_primitive_array_is_an_entry() {
        let registry = TypeRegistry::new();
        let schema = TypeGraphCollector::new(&registry)
            .collect(&td("byte[]"), None)
            .unwrap();
        assert_eq!(names(&schema), ["byte[]"]);
    }

    #[test]
    fn test_unregistered_class_fails() {
        let registry = TypeRegistry::new();
        let err = TypeGraphCollector::new(&registry)
            .collect(&td("pkg.Nope"), None)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(msg) if msg.contains("pkg.Nope")));
    }

    #[test]
    fn test_arity_mismatch_fails() {
        let registry = TypeRegistry::with_builtins();
        let err = TypeGraphCollector::new(&registry)
            .collect(&td("java.util.ArrayList<pkg.A, pkg.B>"), None)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_substitute_must_be_concrete() {
        let mut registry = TypeRegistry::with_builtins();
        registry
            .define(ClassDefBuilder::interface("pkg.Shape").build())
            .unwrap();
        let mapping = InterfaceMapping::new()
            .with(td("pkg.Shape"), td("java.util.List"))
            .unwrap();
        let err = TypeGraphCollector::new(&registry)
            .collect(&td("pkg.Shape"), Some(&mapping))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(msg) if msg.contains("not a concrete")));
    }

    #[test]
    fn test_variables_terminate() {
        let registry = TypeRegistry::with_builtins();
        let schema = TypeGraphCollector::new(&registry)
            .collect(&td("java.util.HashMap<java.lang.String, java.lang.Integer>"), None)
            .unwrap();
        assert_eq!(
            names(&schema),
            [
                "java.util.HashMap",
                "java.util.HashMap$Node[]",
                "java.util.HashMap$Node",
                "java.lang.String",
                "char[]",
                "java.lang.Integer",
            ]
        );
    }
}
