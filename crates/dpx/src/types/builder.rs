// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder API for ClassDef.

use super::descriptor::{PrimitiveKind, TypeDescriptor};
use super::registry::{ClassDef, ClassKind, FieldDef};
use crate::error::Result;

/// Builder for creating ClassDef instances.
#[derive(Debug)]
pub struct ClassDefBuilder {
    name: String,
    kind: ClassKind,
    type_params: Vec<String>,
    fields: Vec<FieldDef>,
}

impl ClassDefBuilder {
    /// Create a new builder for a concrete class.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ClassKind::Class,
            type_params: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Create a builder for an interface (no instance fields).
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: ClassKind::Interface,
            ..Self::class(name)
        }
    }

    /// Create a builder for an enum with no variants yet.
    pub fn enumeration(name: impl Into<String>) -> Self {
        Self {
            kind: ClassKind::Enum {
                variants: Vec::new(),
            },
            ..Self::class(name)
        }
    }

    /// Declare a type parameter.
    pub fn type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    /// Append an enum variant (ordinal = position). Ignored for non-enums.
    pub fn variant(mut self, name: impl Into<String>) -> Self {
        if let ClassKind::Enum { variants } = &mut self.kind {
            variants.push(name.into());
        }
        self
    }

    /// Add an instance field.
    pub fn field(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.fields.push(FieldDef::new(name, ty));
        self
    }

    /// Add a primitive instance field.
    pub fn primitive_field(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.field(name, TypeDescriptor::primitive(kind))
    }

    /// Add a static field.
    pub fn static_field(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.fields.push(FieldDef::static_field(name, ty));
        self
    }

    /// Add an instance field from its textual type, resolving declared type
    /// parameters.
    pub fn parse_field(self, name: impl Into<String>, ty: &str) -> Result<Self> {
        let ty = TypeDescriptor::parse_in(ty, &self.type_params)?;
        Ok(self.field(name, ty))
    }

    /// Build the ClassDef.
    pub fn build(self) -> ClassDef {
        ClassDef {
            name: self.name,
            kind: self.kind,
            type_params: self.type_params,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawType;

    #[test]
    fn test_builder_class() {
        let def = ClassDefBuilder::class("pkg.D")
            .primitive_field("c1", PrimitiveKind::Char)
            .primitive_field("f", PrimitiveKind::Float)
            .static_field("INSTANCES", TypeDescriptor::primitive(PrimitiveKind::Int))
            .build();
        assert_eq!(def.fields.len(), 3);
        assert_eq!(def.instance_fields().count(), 2);
    }

    #[test]
    fn test_builder_enum_variants_in_order() {
        let def = ClassDefBuilder::enumeration("pkg.C$Size")
            .variant("SMALL")
            .variant("LARGE")
            .variant("EXTRALARGE")
            .build();
        assert_eq!(def.variants(), ["SMALL", "LARGE", "EXTRALARGE"]);
    }

    #[test]
    fn test_variant_ignored_for_class() {
        let def = ClassDefBuilder::class("pkg.A").variant("X").build();
        assert!(def.variants().is_empty());
    }

    #[test]
    fn test_parse_field_uses_type_params() {
        let def = ClassDefBuilder::class("pkg.Pair")
            .type_param("L")
            .type_param("R")
            .parse_field("left", "L")
            .and_then(|b| b.parse_field("right", "java.util.List<R>"))
            .unwrap()
            .build();
        assert_eq!(def.fields[0].ty.raw(), &RawType::Variable("L".into()));
        assert_eq!(
            def.fields[1].ty.args()[0].raw(),
            &RawType::Variable("R".into())
        );
    }
}
