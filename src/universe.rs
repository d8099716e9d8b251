//! The type universe: named declarations a generation run resolves against.
//!
//! Universes are read from JSON documents:
//!
//! ```json
//! {
//!   "package": "ansiblelocal",
//!   "types": [
//!     { "name": "Config", "fields": [
//!       { "name": "Common", "type": "common.PackerConfig", "tag": "mapstructure:\",squash\"" },
//!       { "name": "Command", "type": "string" }
//!     ] },
//!     { "name": "Policy", "type": "string" }
//!   ]
//! }
//! ```
//!
//! A declaration either lists `fields` (a struct) or names an underlying
//! `type` (a named non-struct type). Field types are type expressions, or an
//! object with `fields` for an anonymous struct.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LoadError, SchemaError};
use crate::tag::StructTag;
use crate::typeexpr::parse_type_expr;
use crate::types::{FieldDescriptor, TypeName, TypeShape};
use crate::validator::validate_universe_document;

/// A named declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Struct(Vec<FieldDescriptor>),
    /// A named type whose underlying type is not a struct.
    Alias(TypeShape),
}

#[derive(Debug, Clone, Default)]
pub struct Universe {
    package: Option<String>,
    types: BTreeMap<TypeName, Declaration>,
}

#[derive(Deserialize)]
struct UniverseDoc {
    #[serde(default)]
    package: Option<String>,
    types: Vec<DeclarationDoc>,
}

#[derive(Deserialize)]
struct DeclarationDoc {
    name: String,
    #[serde(default)]
    fields: Option<Vec<FieldDoc>>,
    #[serde(default, rename = "type")]
    underlying: Option<TypeDoc>,
}

#[derive(Deserialize)]
struct FieldDoc {
    name: String,
    #[serde(rename = "type")]
    ty: TypeDoc,
    #[serde(default)]
    tag: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TypeDoc {
    Expr(String),
    Struct { fields: Vec<FieldDoc> },
}

impl Universe {
    pub fn new(package: Option<String>) -> Self {
        Self {
            package,
            types: BTreeMap::new(),
        }
    }

    /// Build a universe from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidDocument` when the document does not match
    /// the universe schema, `LoadError::DuplicateType` for repeated
    /// declarations, and `LoadError::InvalidType` / `LoadError::InvalidTag`
    /// for malformed field types or tags.
    pub fn from_document(doc: &Value) -> Result<Self, LoadError> {
        validate_universe_document(doc)?;

        let doc: UniverseDoc =
            serde_json::from_value(doc.clone()).map_err(|e| LoadError::InvalidDocument {
                errors: vec![SchemaError {
                    path: "/".to_string(),
                    message: e.to_string(),
                }],
            })?;

        let mut universe = Self::new(doc.package);
        for decl in doc.types {
            let declaration = match (decl.fields, decl.underlying) {
                (Some(fields), None) | (None, Some(TypeDoc::Struct { fields })) => {
                    Declaration::Struct(build_fields(&decl.name, fields)?)
                }
                (None, Some(TypeDoc::Expr(expr))) => {
                    Declaration::Alias(parse_type_expr(&expr).map_err(|source| {
                        LoadError::InvalidType {
                            location: decl.name.clone(),
                            source,
                        }
                    })?)
                }
                _ => return Err(LoadError::MissingDefinition { name: decl.name }),
            };
            universe.declare(TypeName::new(&decl.name), declaration)?;
        }

        Ok(universe)
    }

    /// Add a declaration.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::DuplicateType` if `name` is already declared.
    pub fn declare(&mut self, name: TypeName, declaration: Declaration) -> Result<(), LoadError> {
        if self.types.contains_key(&name) {
            return Err(LoadError::DuplicateType {
                name: name.to_string(),
            });
        }
        self.types.insert(name, declaration);
        Ok(())
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// Look a type up. Names qualified with the universe's own package also
    /// resolve to unqualified declarations.
    pub fn get(&self, name: &TypeName) -> Option<&Declaration> {
        self.types.get(name).or_else(|| {
            match (name.package(), self.package()) {
                (Some(qualifier), Some(own)) if qualifier == own => {
                    self.types.get(&TypeName::new(name.name()))
                }
                _ => None,
            }
        })
    }

    pub fn struct_fields(&self, name: &TypeName) -> Option<&[FieldDescriptor]> {
        match self.get(name)? {
            Declaration::Struct(fields) => Some(fields),
            Declaration::Alias(_) => None,
        }
    }

    pub fn is_struct(&self, name: &TypeName) -> bool {
        self.struct_fields(name).is_some()
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &TypeName> {
        self.types.keys()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn build_fields(owner: &str, docs: Vec<FieldDoc>) -> Result<Vec<FieldDescriptor>, LoadError> {
    docs.into_iter().map(|doc| build_field(owner, doc)).collect()
}

fn build_field(owner: &str, doc: FieldDoc) -> Result<FieldDescriptor, LoadError> {
    let location = format!("{}.{}", owner, doc.name);

    let tag = StructTag::parse(&doc.tag).map_err(|source| LoadError::InvalidTag {
        location: location.clone(),
        source,
    })?;

    let shape = match doc.ty {
        TypeDoc::Expr(expr) => parse_type_expr(&expr).map_err(|source| LoadError::InvalidType {
            location: location.clone(),
            source,
        })?,
        TypeDoc::Struct { fields } => TypeShape::AnonymousStruct(build_fields(&location, fields)?),
    };

    Ok(FieldDescriptor::new(doc.name, shape, tag))
}
