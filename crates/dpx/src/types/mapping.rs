// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interface substitution table.
//!
//! Interfaces have no fixed layout, so every interface-shaped type the walk
//! reaches needs a concrete stand-in, e.g. `List<Image>` -> `ArrayList<Image>`.
//! Lookup is by full structural equality: `List<Image>` and `List<String>`
//! are separate bindings.

use super::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One interface -> concrete binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceBinding {
    pub interface: TypeDescriptor,
    pub concrete: TypeDescriptor,
}

/// Caller-supplied interface bindings.
#[derive(Debug, Clone, Default)]
pub struct InterfaceMapping {
    bindings: HashMap<TypeDescriptor, TypeDescriptor>,
}

impl InterfaceMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `interface` to `concrete`.
    ///
    /// Binding the same pair twice is accepted; rebinding an interface to a
    /// different substitute is a configuration error.
    pub fn bind(&mut self, interface: TypeDescriptor, concrete: TypeDescriptor) -> Result<()> {
        if interface == concrete {
            return Err(Error::Configuration(format!(
                "interface `{}` bound to itself",
                interface
            )));
        }
        match self.bindings.get(&interface) {
            Some(existing) if *existing == concrete => Ok(()),
            Some(existing) => Err(Error::Configuration(format!(
                "interface `{}` already bound to `{}`",
                interface, existing
            ))),
            None => {
                self.bindings.insert(interface, concrete);
                Ok(())
            }
        }
    }

    /// Builder-style [`bind`](Self::bind).
    pub fn with(mut self, interface: TypeDescriptor, concrete: TypeDescriptor) -> Result<Self> {
        self.bind(interface, concrete)?;
        Ok(self)
    }

    pub fn from_bindings(bindings: impl IntoIterator<Item = InterfaceBinding>) -> Result<Self> {
        let mut mapping = Self::new();
        for binding in bindings {
            mapping.bind(binding.interface, binding.concrete)?;
        }
        Ok(mapping)
    }

    /// Substitute for `interface`, if bound.
    pub fn find(&self, interface: &TypeDescriptor) -> Option<&TypeDescriptor> {
        self.bindings.get(interface)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn td(s: &str) -> TypeDescriptor {
        s.parse().unwrap()
    }

    #[test]
    fn test_lookup_is_structural() {
        let mapping = InterfaceMapping::new()
            .with(td("java.util.List<pkg.Image>"), td("java.util.ArrayList<pkg.Image>"))
            .unwrap()
            .with(td("java.util.List<java.lang.String>"), td("pkg.StringList"))
            .unwrap();

        let query = TypeDescriptor::generic("java.util.List", vec![td("pkg.Image")]);
        assert_eq!(mapping.find(&query), Some(&td("java.util.ArrayList<pkg.Image>")));
        assert_eq!(
            mapping.find(&td("java.util.List<java.lang.String>")),
            Some(&td("pkg.StringList"))
        );
        assert!(mapping.find(&td("java.util.List")).is_none());
    }

    #[test]
    fn test_rebinding_conflict() {
        let mut mapping = InterfaceMapping::new();
        mapping.bind(td("pkg.I"), td("pkg.A")).unwrap();
        mapping.bind(td("pkg.I"), td("pkg.A")).unwrap();
        assert!(mapping.bind(td("pkg.I"), td("pkg.B")).is_err());
        assert!(mapping.bind(td("pkg.J"), td("pkg.J")).is_err());
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_from_bindings_toml() {
        #[derive(Deserialize)]
        struct File {
            mappings: Vec<InterfaceBinding>,
        }
        let file: File = toml::from_str(
            r#"
            [[mappings]]
            interface = "java.util.List<pkg.Image>"
            concrete = "java.util.ArrayList<pkg.Image>"
            "#,
        )
        .unwrap();
        let mapping = InterfaceMapping::from_bindings(file.mappings).unwrap();
        assert_eq!(mapping.len(), 1);
    }
}
