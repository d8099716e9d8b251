//! Struct flattening: squash expansion and optionality normalization.
//!
//! Flattening walks a root struct depth-first in declaration order. Fields
//! tagged `squash` are replaced in place by their own flattened fields; every
//! other field has its shape normalized so that it is optional:
//!
//! | Field shape (after one pointer is stripped) | Flat shape |
//! |---------------------------------------------|------------|
//! | overridden external type | `*string` / `*bool` |
//! | scalar, or named type over a scalar | `*scalar`, `*T` |
//! | named struct `T` | `*FlatT` |
//! | sequence of named structs | `[]FlatT` |
//! | mapping, other sequences, other named types | unchanged |
//! | anonymous struct | `*struct { .. }`, fields flattened |
//!
//! Named structs are never expanded here: the flat field references the
//! sibling projection of that struct, and the struct is recorded as required.

use std::collections::{BTreeSet, HashSet};
use std::hash::Hash;

use crate::diagnostics::{Diagnostic, DiagnosticCode, Outcome};
use crate::error::GenerateError;
use crate::types::{FieldDescriptor, FlatSchema, GenerateOptions, TypeName, TypeShape};
use crate::universe::{Declaration, Universe};

/// Result of flattening one root.
#[derive(Debug, Clone, PartialEq)]
pub struct Flattened {
    pub schema: FlatSchema,
    /// Named structs whose sibling projections the flat schema references.
    pub requires: BTreeSet<TypeName>,
}

/// Flatten the struct named `root`.
///
/// # Errors
///
/// Returns `GenerateError::RootNotFound` / `GenerateError::NotAStruct` when
/// `root` does not name a struct, and `GenerateError::SquashCycle` when a
/// struct squashes itself, directly or not.
pub fn flatten(
    universe: &Universe,
    root: &TypeName,
    options: &GenerateOptions,
) -> Result<Outcome<Flattened>, GenerateError> {
    let Some(fields) = resolve_struct(universe, root) else {
        let name = root.to_string();
        return Err(if universe.contains(root) {
            GenerateError::NotAStruct { name }
        } else {
            GenerateError::RootNotFound { name }
        });
    };

    let mut ctx = FlattenCtx {
        universe,
        options,
        squashing: vec![root.clone()],
        requires: BTreeSet::new(),
        diagnostics: Vec::new(),
    };
    let fields = ctx.flatten_struct(&root.to_string(), fields)?;

    Ok(Outcome::new(
        Flattened {
            schema: FlatSchema::new(fields),
            requires: ctx.requires,
        },
        ctx.diagnostics,
    ))
}

/// Keep the first item for every key. `on_duplicate` sees each dropped item.
pub(crate) fn unique_by<T, K, F, D>(items: Vec<T>, key: F, mut on_duplicate: D) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
    D: FnMut(&T),
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let fresh = seen.insert(key(item));
            if !fresh {
                on_duplicate(item);
            }
            fresh
        })
        .collect()
}

struct FlattenCtx<'a> {
    universe: &'a Universe,
    options: &'a GenerateOptions,
    /// Named structs whose squash expansion is in progress.
    squashing: Vec<TypeName>,
    requires: BTreeSet<TypeName>,
    diagnostics: Vec<Diagnostic>,
}

impl FlattenCtx<'_> {
    /// Flatten a field list and drop later duplicates by field name.
    fn flatten_struct(
        &mut self,
        path: &str,
        fields: &[FieldDescriptor],
    ) -> Result<Vec<FieldDescriptor>, GenerateError> {
        let mut collected = Vec::new();
        self.flatten_fields(path, fields, &mut collected)?;

        let diagnostics = &mut self.diagnostics;
        let unique = unique_by(
            collected,
            |(_, field)| field.name.clone(),
            |(owner, field)| {
                diagnostics.push(Diagnostic::warning(
                    DiagnosticCode::DuplicateField,
                    format!("{}.{}", owner, field.name),
                    format!("skipping duplicate {} field", field.name),
                ));
            },
        );

        Ok(unique.into_iter().map(|(_, field)| field).collect())
    }

    /// Append the flattened form of `fields` to `out`, each paired with the
    /// path of the struct that declared it.
    fn flatten_fields(
        &mut self,
        path: &str,
        fields: &[FieldDescriptor],
        out: &mut Vec<(String, FieldDescriptor)>,
    ) -> Result<(), GenerateError> {
        for field in fields {
            self.expand_field(path, field, out)?;
        }
        Ok(())
    }

    fn expand_field(
        &mut self,
        path: &str,
        field: &FieldDescriptor,
        out: &mut Vec<(String, FieldDescriptor)>,
    ) -> Result<(), GenerateError> {
        if !field.is_exported() || field.shape.is_callable() {
            return Ok(());
        }

        let field_path = format!("{}.{}", path, field.name);
        let meta = field.tag.meta(&self.options.grammar);

        if meta.squash {
            return self.squash(&field_path, field, out);
        }

        let shape = self.normalize(&field_path, &field.shape, meta.self_defined)?;
        out.push((path.to_string(), field.with_shape(shape)));
        Ok(())
    }

    fn squash(
        &mut self,
        field_path: &str,
        field: &FieldDescriptor,
        out: &mut Vec<(String, FieldDescriptor)>,
    ) -> Result<(), GenerateError> {
        match &field.shape {
            TypeShape::Named(name) => {
                let Some(fields) = resolve_struct(self.universe, name) else {
                    self.squash_dropped(field_path, field);
                    return Ok(());
                };
                if self.squashing.contains(name) {
                    return Err(GenerateError::SquashCycle {
                        path: field_path.to_string(),
                        name: name.to_string(),
                    });
                }
                self.squashing.push(name.clone());
                let result = self.flatten_fields(&name.to_string(), fields, out);
                self.squashing.pop();
                result
            }
            TypeShape::AnonymousStruct(fields) => self.flatten_fields(field_path, fields, out),
            _ => {
                self.squash_dropped(field_path, field);
                Ok(())
            }
        }
    }

    fn squash_dropped(&mut self, field_path: &str, field: &FieldDescriptor) {
        self.diagnostics.push(Diagnostic::warning(
            DiagnosticCode::SquashNonStruct,
            field_path,
            format!(
                "squash on non-struct type {}; field {} dropped",
                field.shape, field.name
            ),
        ));
    }

    /// Normalize a non-squashed field shape.
    fn normalize(
        &mut self,
        field_path: &str,
        shape: &TypeShape,
        self_defined: bool,
    ) -> Result<TypeShape, GenerateError> {
        let inner = shape.strip_pointer();
        let normalized = match inner {
            TypeShape::Named(name) => {
                if let Some(placeholder) = self.options.overrides.shape_for(name) {
                    placeholder
                } else if self_defined && resolve_struct(self.universe, name).is_some() {
                    inner.clone().pointer()
                } else {
                    self.normalize_named(name)
                }
            }
            TypeShape::Scalar(_) | TypeShape::Projected { .. } => inner.clone().pointer(),
            TypeShape::Sequence(elem) => TypeShape::Sequence(Box::new(self.project_element(elem))),
            TypeShape::AnonymousStruct(fields) => {
                TypeShape::AnonymousStruct(self.flatten_struct(field_path, fields)?).pointer()
            }
            TypeShape::Pointer(_)
            | TypeShape::Mapping(..)
            | TypeShape::Callable
            | TypeShape::Unsupported(_) => inner.clone(),
        };
        Ok(normalized)
    }

    fn normalize_named(&mut self, name: &TypeName) -> TypeShape {
        let universe = self.universe;
        if resolve_struct(universe, name).is_some() {
            return self.project(name).pointer();
        }

        match resolve_alias(universe, name) {
            Some(TypeShape::Scalar(_)) => return TypeShape::Named(name.clone()).pointer(),
            Some(TypeShape::Sequence(elem)) => {
                let projected = self.project_element(elem);
                if projected != **elem {
                    return TypeShape::Sequence(Box::new(projected));
                }
            }
            _ => {}
        }

        TypeShape::Named(name.clone())
    }

    /// Replace named struct elements with their projections, through
    /// pointers and nested sequences.
    fn project_element(&mut self, elem: &TypeShape) -> TypeShape {
        match elem {
            TypeShape::Named(name) if resolve_struct(self.universe, name).is_some() => {
                self.project(name)
            }
            TypeShape::Pointer(inner) => self.project_element(inner).pointer(),
            TypeShape::Sequence(inner) => TypeShape::Sequence(Box::new(self.project_element(inner))),
            other => other.clone(),
        }
    }

    fn project(&mut self, name: &TypeName) -> TypeShape {
        self.requires.insert(name.clone());
        TypeShape::Projected {
            source: name.clone(),
            projection: self.options.projection_name(name),
        }
    }
}

/// Fields of the struct `name` denotes in `universe`, following named
/// aliases (`type A B` where `B` is a struct).
pub(crate) fn resolve_struct<'u>(
    universe: &'u Universe,
    name: &TypeName,
) -> Option<&'u [FieldDescriptor]> {
    let mut current = name;
    for _ in 0..=universe.len() {
        match universe.get(current)? {
            Declaration::Struct(fields) => return Some(fields),
            Declaration::Alias(TypeShape::Named(next)) => current = next,
            Declaration::Alias(_) => return None,
        }
    }
    None
}

/// The underlying shape of the named non-struct type `name`, following
/// aliases of aliases. `None` for structs and unknown names.
pub(crate) fn resolve_alias<'u>(universe: &'u Universe, name: &TypeName) -> Option<&'u TypeShape> {
    let mut current = name;
    for _ in 0..=universe.len() {
        match universe.get(current)? {
            Declaration::Struct(_) => return None,
            Declaration::Alias(TypeShape::Named(next)) => current = next,
            Declaration::Alias(shape) => return Some(shape),
        }
    }
    None
}
