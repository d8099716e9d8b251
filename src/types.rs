//! Core types for projection generation.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::overrides::OverrideTable;
use crate::tag::{StructTag, TagGrammar};

/// Prefix prepended to a type's name to name its flat projection.
pub const DEFAULT_PROJECTION_PREFIX: &str = "Flat";

/// Built-in scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    String,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

impl ScalarKind {
    /// Parse a scalar kind from its type name.
    ///
    /// `byte` and `rune` are accepted as aliases of `uint8` and `int32`.
    /// Returns `None` for anything that is not a built-in scalar.
    pub fn parse(s: &str) -> Option<Self> {
        let kind = match s {
            "bool" => ScalarKind::Bool,
            "string" => ScalarKind::String,
            "int" => ScalarKind::Int,
            "int8" => ScalarKind::Int8,
            "int16" => ScalarKind::Int16,
            "int32" | "rune" => ScalarKind::Int32,
            "int64" => ScalarKind::Int64,
            "uint" => ScalarKind::Uint,
            "uint8" | "byte" => ScalarKind::Uint8,
            "uint16" => ScalarKind::Uint16,
            "uint32" => ScalarKind::Uint32,
            "uint64" => ScalarKind::Uint64,
            "uintptr" => ScalarKind::Uintptr,
            "float32" => ScalarKind::Float32,
            "float64" => ScalarKind::Float64,
            "complex64" => ScalarKind::Complex64,
            "complex128" => ScalarKind::Complex128,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::String => "string",
            ScalarKind::Int => "int",
            ScalarKind::Int8 => "int8",
            ScalarKind::Int16 => "int16",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Uint => "uint",
            ScalarKind::Uint8 => "uint8",
            ScalarKind::Uint16 => "uint16",
            ScalarKind::Uint32 => "uint32",
            ScalarKind::Uint64 => "uint64",
            ScalarKind::Uintptr => "uintptr",
            ScalarKind::Float32 => "float32",
            ScalarKind::Float64 => "float64",
            ScalarKind::Complex64 => "complex64",
            ScalarKind::Complex128 => "complex128",
        }
    }

    /// True for every integer, floating point and complex kind.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ScalarKind::Bool | ScalarKind::String)
    }
}

/// Identity of a named type, optionally qualified by its package
/// (`Config`, `common.PackerConfig`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeName {
    package: Option<String>,
    name: String,
}

impl TypeName {
    /// Build a type name from `Name` or `pkg.Name` text.
    pub fn new(text: &str) -> Self {
        match text.rsplit_once('.') {
            Some((package, name)) => Self {
                package: Some(package.to_string()),
                name: name.to_string(),
            },
            None => Self {
                package: None,
                name: text.to_string(),
            },
        }
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derive the projection name: the prefix goes in front of the
    /// unqualified name, the package qualifier is preserved.
    pub fn projection(&self, prefix: &str) -> ProjectionName {
        ProjectionName(TypeName {
            package: self.package.clone(),
            name: format!("{}{}", prefix, self.name),
        })
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => write!(f, "{}.{}", package, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl Serialize for TypeName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Name of a generated flat projection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectionName(TypeName);

impl ProjectionName {
    pub fn as_type_name(&self) -> &TypeName {
        &self.0
    }
}

impl fmt::Display for ProjectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for ProjectionName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Structural shape of a field's type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    Scalar(ScalarKind),
    Pointer(Box<TypeShape>),
    Sequence(Box<TypeShape>),
    Mapping(Box<TypeShape>, Box<TypeShape>),
    /// Reference to a declaration in the type universe (or an external type).
    Named(TypeName),
    /// Reference to the flat projection of a named struct. Only produced by
    /// flattening.
    Projected {
        source: TypeName,
        projection: ProjectionName,
    },
    AnonymousStruct(Vec<FieldDescriptor>),
    Callable,
    Unsupported(String),
}

impl TypeShape {
    pub fn pointer(self) -> Self {
        TypeShape::Pointer(Box::new(self))
    }

    /// Strip a single level of pointer indirection.
    pub fn strip_pointer(&self) -> &TypeShape {
        match self {
            TypeShape::Pointer(inner) => inner,
            other => other,
        }
    }

    /// The named type reached by following pointers, if any.
    pub fn named_target(&self) -> Option<&TypeName> {
        match self {
            TypeShape::Pointer(inner) => inner.named_target(),
            TypeShape::Named(name) => Some(name),
            TypeShape::Projected { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, TypeShape::Callable)
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeShape::Scalar(kind) => f.write_str(kind.as_str()),
            TypeShape::Pointer(inner) => write!(f, "*{}", inner),
            TypeShape::Sequence(elem) => write!(f, "[]{}", elem),
            TypeShape::Mapping(key, value) => write!(f, "map[{}]{}", key, value),
            TypeShape::Named(name) => name.fmt(f),
            TypeShape::Projected { projection, .. } => projection.fmt(f),
            TypeShape::AnonymousStruct(fields) => {
                f.write_str("struct {")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    write!(f, " {} {}", field.name, field.shape)?;
                    if !field.tag.is_empty() {
                        write!(f, " `{}`", field.tag)?;
                    }
                }
                f.write_str(" }")
            }
            TypeShape::Callable => f.write_str("func()"),
            TypeShape::Unsupported(text) => f.write_str(text),
        }
    }
}

impl Serialize for TypeShape {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single struct field: its name, type shape and parsed tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub shape: TypeShape,
    pub tag: StructTag,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, shape: TypeShape, tag: StructTag) -> Self {
        Self {
            name: name.into(),
            shape,
            tag,
        }
    }

    /// Only exported fields (leading uppercase letter) carry configuration.
    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }

    pub fn with_shape(&self, shape: TypeShape) -> Self {
        Self {
            shape,
            ..self.clone()
        }
    }

    pub fn with_tag(&self, tag: StructTag) -> Self {
        Self {
            tag,
            ..self.clone()
        }
    }
}

/// Ordered field list produced by the flattening passes.
///
/// Field names are unique; each pass returns a new schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct FlatSchema {
    fields: Vec<FieldDescriptor>,
}

impl FlatSchema {
    pub(crate) fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Options for a generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Root types to project, sorted and deduplicated.
    pub roots: Vec<TypeName>,
    /// Prefix used to name projections.
    pub prefix: String,
    /// External types replaced by opaque placeholders.
    pub overrides: OverrideTable,
    /// Tag keys and options recognized on fields.
    pub grammar: TagGrammar,
}

impl GenerateOptions {
    /// Create options for the given roots with the default prefix,
    /// the standard override table and the current tag grammar.
    ///
    /// Root names are trimmed, sorted and deduplicated; blank names are dropped.
    pub fn new<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roots: Vec<TypeName> = roots
            .into_iter()
            .map(|r| r.as_ref().trim().to_string())
            .filter(|r| !r.is_empty())
            .map(|r| TypeName::new(&r))
            .collect();
        roots.sort();
        roots.dedup();

        Self {
            roots,
            prefix: DEFAULT_PROJECTION_PREFIX.to_string(),
            overrides: OverrideTable::standard(),
            grammar: TagGrammar::default(),
        }
    }

    /// Set the projection prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Replace the override table.
    pub fn overrides(mut self, overrides: OverrideTable) -> Self {
        self.overrides = overrides;
        self
    }

    /// Replace the tag grammar.
    pub fn grammar(mut self, grammar: TagGrammar) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn projection_name(&self, ty: &TypeName) -> ProjectionName {
        ty.projection(&self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_kind_parse_aliases() {
        assert_eq!(ScalarKind::parse("byte"), Some(ScalarKind::Uint8));
        assert_eq!(ScalarKind::parse("rune"), Some(ScalarKind::Int32));
        assert_eq!(ScalarKind::parse("float64"), Some(ScalarKind::Float64));
        assert_eq!(ScalarKind::parse("Duration"), None);
        assert_eq!(ScalarKind::parse(""), None);
    }

    #[test]
    fn scalar_kind_numeric() {
        assert!(ScalarKind::Complex128.is_numeric());
        assert!(ScalarKind::Uintptr.is_numeric());
        assert!(!ScalarKind::Bool.is_numeric());
        assert!(!ScalarKind::String.is_numeric());
    }

    #[test]
    fn type_name_qualified() {
        let name = TypeName::new("common.PackerConfig");
        assert_eq!(name.package(), Some("common"));
        assert_eq!(name.name(), "PackerConfig");
        assert_eq!(name.to_string(), "common.PackerConfig");
        assert_eq!(
            name.projection("Flat").to_string(),
            "common.FlatPackerConfig"
        );
    }

    #[test]
    fn type_name_unqualified() {
        let name = TypeName::new("Config");
        assert_eq!(name.package(), None);
        assert_eq!(name.projection("Flat").to_string(), "FlatConfig");
    }

    #[test]
    fn type_shape_display() {
        let shape = TypeShape::Mapping(
            Box::new(TypeShape::Scalar(ScalarKind::String)),
            Box::new(TypeShape::Sequence(Box::new(
                TypeShape::Scalar(ScalarKind::Int).pointer(),
            ))),
        );
        assert_eq!(shape.to_string(), "map[string][]*int");

        let projected = TypeShape::Projected {
            source: TypeName::new("Rule"),
            projection: TypeName::new("Rule").projection("Flat"),
        };
        assert_eq!(TypeShape::Sequence(Box::new(projected)).to_string(), "[]FlatRule");
    }

    #[test]
    fn named_target_follows_pointers() {
        let shape = TypeShape::Named(TypeName::new("Rule")).pointer().pointer();
        assert_eq!(shape.named_target(), Some(&TypeName::new("Rule")));

        let shape = TypeShape::Sequence(Box::new(TypeShape::Named(TypeName::new("Rule"))));
        assert_eq!(shape.named_target(), None);
    }

    #[test]
    fn field_exported() {
        let field = FieldDescriptor::new(
            "Name",
            TypeShape::Scalar(ScalarKind::String),
            StructTag::default(),
        );
        assert!(field.is_exported());

        let field = FieldDescriptor::new(
            "ctx",
            TypeShape::Named(TypeName::new("interpolate.Context")),
            StructTag::default(),
        );
        assert!(!field.is_exported());
    }

    #[test]
    fn generate_options_normalizes_roots() {
        let opts = GenerateOptions::new(["Config", " Rule ", "", "Config"]);
        assert_eq!(opts.roots, vec![TypeName::new("Config"), TypeName::new("Rule")]);
        assert_eq!(opts.prefix, DEFAULT_PROJECTION_PREFIX);
    }

    #[test]
    fn generate_options_prefix() {
        let opts = GenerateOptions::new(["Config"]).prefix("Projected");
        assert_eq!(
            opts.projection_name(&TypeName::new("Config")).to_string(),
            "ProjectedConfig"
        );
    }
}
