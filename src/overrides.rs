//! Override table for external types with no natural optional representation.
//!
//! A hit replaces the field's type with an opaque `*string` or `*bool`
//! placeholder. Table files map qualified type names either to a placeholder
//! directly or to an object with a note:
//!
//! ```json
//! {
//!   "time.Duration": "string",
//!   "config.Trilean": { "placeholder": "bool", "note": "tri-state flag" }
//! }
//! ```
//!
//! Entries without a note load, but every generation using them reports a
//! D007 warning.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::LoadError;
use crate::types::{ScalarKind, TypeName, TypeShape};

/// Replacement type for an overridden external type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placeholder {
    String,
    Bool,
}

impl Placeholder {
    /// The replacement shape: always a pointer so the field stays optional.
    pub fn shape(&self) -> TypeShape {
        let kind = match self {
            Placeholder::String => ScalarKind::String,
            Placeholder::Bool => ScalarKind::Bool,
        };
        TypeShape::Scalar(kind).pointer()
    }
}

/// A documented override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    pub placeholder: Placeholder,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverrideTable {
    entries: BTreeMap<TypeName, OverrideEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntryDoc {
    Shorthand(Placeholder),
    Full {
        placeholder: Placeholder,
        #[serde(default)]
        note: String,
    },
}

impl OverrideTable {
    /// The table every run starts from.
    pub fn standard() -> Self {
        Self::default()
            .insert(
                "time.Duration",
                Placeholder::String,
                "durations are written as strings such as \"5m\"",
            )
            .insert(
                "config.Trilean",
                Placeholder::Bool,
                "tri-state flag; unset is expressed by omitting the attribute",
            )
            .insert(
                "powershell.ExecutionPolicy",
                Placeholder::String,
                "enum decoded from its string name",
            )
    }

    /// Return the table with `name` overridden.
    pub fn insert(mut self, name: &str, placeholder: Placeholder, note: impl Into<String>) -> Self {
        self.entries.insert(
            TypeName::new(name),
            OverrideEntry {
                placeholder,
                note: note.into(),
            },
        );
        self
    }

    /// Entries of `other` win over entries of `self`.
    pub fn merge(mut self, other: OverrideTable) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn get(&self, name: &TypeName) -> Option<&OverrideEntry> {
        self.entries.get(name)
    }

    /// Replacement shape for `name`, if overridden.
    pub fn shape_for(&self, name: &TypeName) -> Option<TypeShape> {
        self.get(name).map(|e| e.placeholder.shape())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeName, &OverrideEntry)> {
        self.entries.iter()
    }

    /// A warning for every entry that carries no note.
    pub fn undocumented(&self) -> Vec<Diagnostic> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.note.trim().is_empty())
            .map(|(name, entry)| {
                Diagnostic::warning(
                    DiagnosticCode::UndocumentedOverride,
                    name.to_string(),
                    format!(
                        "override {} -> {} has no note; document why the type is replaced",
                        name,
                        entry.placeholder.shape()
                    ),
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse an override table from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidJson` for malformed JSON and
    /// `LoadError::InvalidOverrides` for unknown placeholders.
    pub fn from_json_str(content: &str) -> Result<Self, LoadError> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })?;
        let docs: BTreeMap<String, EntryDoc> =
            serde_json::from_value(value).map_err(|e| LoadError::InvalidOverrides {
                message: e.to_string(),
            })?;

        Ok(docs
            .into_iter()
            .fold(Self::default(), |table, (name, doc)| match doc {
                EntryDoc::Shorthand(placeholder) => table.insert(&name, placeholder, ""),
                EntryDoc::Full { placeholder, note } => table.insert(&name, placeholder, note),
            }))
    }

    /// Load an override table from a file.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::FileNotFound` / `LoadError::ReadError` for IO
    /// failures, otherwise the errors of [`OverrideTable::from_json_str`].
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }
}
