// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structural type identities.
//!
//! A [`TypeDescriptor`] names a possibly-generic type by its raw identity, its
//! actual type arguments and its owner. Equality and hashing are derived, so
//! two descriptors built independently for `List<Image>` are the same key.
//!
//! # Textual form
//!
//! ```text
//! int                          primitive
//! java.lang.String             class
//! java.util.List<pkg.Image>    generic instantiation
//! long[][]                     arrays
//! pkg.Outer<A>$Inner<B>        inner class of a generic owner
//! java.util.List<'T>           type variable of the enclosing class
//! ```
//!
//! Type variables print with a leading `'` so the text reads back as the same
//! descriptor anywhere. Inside a class definition (see [`TypeDescriptor::parse_in`])
//! the declared parameter names are also accepted bare.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Primitive kinds. These have no schema entry; the engine encodes them inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        Self::Boolean,
        Self::Byte,
        Self::Char,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
    ];

    /// Source-level keyword.
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Raw identity of a type, before type arguments are applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawType {
    Primitive(PrimitiveKind),
    /// Named class, interface or enum (binary name, `$` for nesting).
    Class(String),
    /// Array of the component type.
    Array(Box<TypeDescriptor>),
    /// Type parameter of the enclosing generic class (erased).
    Variable(String),
}

/// A possibly-generic type identity with structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeDescriptor {
    raw: RawType,
    args: Vec<TypeDescriptor>,
    owner: Option<Box<TypeDescriptor>>,
}

impl TypeDescriptor {
    fn from_raw(raw: RawType) -> Self {
        Self {
            raw,
            args: Vec::new(),
            owner: None,
        }
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::from_raw(RawType::Primitive(kind))
    }

    /// Non-generic named class.
    pub fn class(name: impl Into<String>) -> Self {
        Self::from_raw(RawType::Class(name.into()))
    }

    /// Generic instantiation `name<args...>`.
    pub fn generic(name: impl Into<String>, args: Vec<TypeDescriptor>) -> Self {
        Self {
            raw: RawType::Class(name.into()),
            args,
            owner: None,
        }
    }

    pub fn array_of(component: TypeDescriptor) -> Self {
        Self::from_raw(RawType::Array(Box::new(component)))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::from_raw(RawType::Variable(name.into()))
    }

    /// Attach an owner type (for inner classes of generic owners).
    pub fn with_owner(mut self, owner: TypeDescriptor) -> Self {
        self.owner = Some(Box::new(owner));
        self
    }

    pub fn raw(&self) -> &RawType {
        &self.raw
    }

    pub fn args(&self) -> &[TypeDescriptor] {
        &self.args
    }

    pub fn owner(&self) -> Option<&TypeDescriptor> {
        self.owner.as_deref()
    }

    pub fn is_generic(&self) -> bool {
        !self.args.is_empty()
    }

    /// Class name for named types, `None` for primitives, arrays and variables.
    pub fn class_name(&self) -> Option<&str> {
        match &self.raw {
            RawType::Class(name) => Some(name),
            _ => None,
        }
    }

    /// Component type if this is an array.
    pub fn component(&self) -> Option<&TypeDescriptor> {
        match &self.raw {
            RawType::Array(component) => Some(component),
            _ => None,
        }
    }

    /// The raw type with type arguments and owner dropped.
    ///
    /// Array components are erased recursively, so `List<String>[]` erases to
    /// `List[]`.
    pub fn erasure(&self) -> TypeDescriptor {
        match &self.raw {
            RawType::Array(component) => Self::array_of(component.erasure()),
            raw => Self::from_raw(raw.clone()),
        }
    }

    /// Parse a descriptor where bare identifiers in `params` denote type
    /// variables of the enclosing class.
    pub fn parse_in(text: &str, params: &[String]) -> Result<Self> {
        let mut parser = Parser {
            text,
            pos: 0,
            params,
        };
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos != text.len() {
            return Err(parser.error("trailing characters"));
        }
        Ok(ty)
    }
}

impl FromStr for TypeDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_in(s, &[])
    }
}

impl TryFrom<String> for TypeDescriptor {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TypeDescriptor> for String {
    fn from(value: TypeDescriptor) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.raw {
            RawType::Primitive(kind) => return f.write_str(kind.name()),
            RawType::Variable(name) => return write!(f, "'{}", name),
            RawType::Array(component) => return write!(f, "{}[]", component),
            RawType::Class(name) => match &self.owner {
                Some(owner) => {
                    let simple = name.rsplit('$').next().unwrap_or(name);
                    write!(f, "{}${}", owner, simple)?;
                }
                None => f.write_str(name)?,
            },
        }
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    params: &'a [String],
}

impl Parser<'_> {
    fn error(&self, reason: &str) -> Error {
        Error::Configuration(format!(
            "invalid type descriptor `{}` at {}: {}",
            self.text, self.pos, reason
        ))
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn ident(&mut self, allow_dots: bool) -> Result<&str> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            let ok = c.is_alphanumeric() || c == '_' || c == '$' || (allow_dots && c == '.');
            if !ok {
                break;
            }
            self.pos += c.len_utf8();
        }
        if start == self.pos {
            return Err(self.error("expected identifier"));
        }
        Ok(&self.text[start..self.pos])
    }

    fn parse_args(&mut self) -> Result<Vec<TypeDescriptor>> {
        let mut args = Vec::new();
        if !self.eat('<') {
            return Ok(args);
        }
        loop {
            args.push(self.parse_type()?);
            if self.eat(',') {
                continue;
            }
            if self.eat('>') {
                return Ok(args);
            }
            return Err(self.error("expected `,` or `>`"));
        }
    }

    fn parse_type(&mut self) -> Result<TypeDescriptor> {
        if self.eat('\'') {
            let name = self.ident(false)?.to_string();
            return self.parse_dims(TypeDescriptor::variable(name));
        }
        let name = self.ident(true)?.to_string();
        let ty = if let Some(kind) = PrimitiveKind::from_name(&name) {
            TypeDescriptor::primitive(kind)
        } else if self.params.iter().any(|p| *p == name) {
            TypeDescriptor::variable(name)
        } else {
            let args = self.parse_args()?;
            let mut ty = TypeDescriptor::generic(name, args);
            // `Owner<..>$Inner<..>`: only a generic owner needs an explicit owner link.
            while ty.is_generic() && self.eat('$') {
                let simple = self.ident(false)?.to_string();
                let raw_name = format!("{}${}", ty.class_name().unwrap_or_default(), simple);
                let args = self.parse_args()?;
                ty = TypeDescriptor::generic(raw_name, args).with_owner(ty);
            }
            ty
        };
        self.parse_dims(ty)
    }

    fn parse_dims(&mut self, mut ty: TypeDescriptor) -> Result<TypeDescriptor> {
        while self.eat('[') {
            if !self.eat(']') {
                return Err(self.error("expected `]`"));
            }
            ty = TypeDescriptor::array_of(ty);
        }
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_structural_equality_of_generics() {
        let a = TypeDescriptor::generic(
            "java.util.List",
            vec![TypeDescriptor::class("pkg.Image")],
        );
        let b: TypeDescriptor = "java.util.List<pkg.Image>".parse().unwrap();
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn test_argument_order_matters() {
        let ab: TypeDescriptor = "java.util.Map<A, B>".parse().unwrap();
        let ba: TypeDescriptor = "java.util.Map<B, A>".parse().unwrap();
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_parse_primitives_and_arrays() {
        let cube: TypeDescriptor = "int[][][]".parse().unwrap();
        let plane = cube.component().unwrap();
        let row = plane.component().unwrap();
        let elem = row.component().unwrap();
        assert_eq!(elem, &TypeDescriptor::primitive(PrimitiveKind::Int));
        assert_eq!(cube.to_string(), "int[][][]");
    }

    #[test]
    fn test_display_round_trip() {
        for text in [
            "java.util.Map<java.lang.String, java.util.List<pkg.Image>>",
            "pkg.C$Size[]",
            "pkg.Outer<java.lang.String>$Inner<pkg.A>",
            "java.util.List<int[]>",
        ] {
            let ty: TypeDescriptor = text.parse().unwrap();
            assert_eq!(ty.to_string(), text);
        }
    }

    #[test]
    fn test_owner_participates_in_equality() {
        let a: TypeDescriptor = "pkg.Outer<A>$Inner<X>".parse().unwrap();
        let b: TypeDescriptor = "pkg.Outer<B>$Inner<X>".parse().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.owner().unwrap().args()[0], TypeDescriptor::class("A"));
        assert_eq!(a.class_name(), Some("pkg.Outer$Inner"));
    }

    #[test]
    fn test_type_variables_in_context() {
        let params = vec!["T".to_string()];
        let ty = TypeDescriptor::parse_in("java.util.List<T>[]", &params).unwrap();
        let list = ty.component().unwrap();
        assert_eq!(list.args()[0].raw(), &RawType::Variable("T".into()));

        let plain: TypeDescriptor = "T".parse().unwrap();
        assert_eq!(plain.class_name(), Some("T"));
    }

    #[test]
    fn test_type_variables_round_trip_outside_context() {
        let params = vec!["T".to_string()];
        let declared = TypeDescriptor::parse_in("java.util.List<T>[]", &params).unwrap();
        assert_eq!(declared.to_string(), "java.util.List<'T>[]");

        let reparsed: TypeDescriptor = declared.to_string().parse().unwrap();
        assert_eq!(reparsed, declared);
        assert_eq!(
            TypeDescriptor::parse_in("java.util.List<'T>[]", &params).unwrap(),
            declared
        );

        let bare: TypeDescriptor = "'E[][]".parse().unwrap();
        assert_eq!(
            bare,
            TypeDescriptor::array_of(TypeDescriptor::array_of(TypeDescriptor::variable("E")))
        );
        assert!("'".parse::<TypeDescriptor>().is_err());
        assert!("'T<A>".parse::<TypeDescriptor>().is_err());
    }

    #[test]
    fn test_erasure() {
        let ty: TypeDescriptor = "java.util.List<java.lang.String>[]".parse().unwrap();
        assert_eq!(ty.erasure().to_string(), "java.util.List[]");
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "List<", "List<A,>", "int[", "A B", "List<A>>"] {
            let err = bad.parse::<TypeDescriptor>().unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "{bad}");
        }
    }

    #[test]
    fn test_serde_as_string() {
        let ty: TypeDescriptor = "java.util.List<pkg.Image>".parse().unwrap();
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, "\"java.util.List<pkg.Image>\"");
        let back: TypeDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);
    }
}
