//! Registry of generated projections across generation batches.
//!
//! Projections reference their siblings by name only. Once every batch has
//! been recorded, [`Registry::validate`] checks that those names resolve:
//! each projection name belongs to exactly one root, and every required
//! sibling was generated by some batch.

use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::generate::Generation;
use crate::types::{ProjectionName, TypeName};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    root: TypeName,
    projection: ProjectionName,
    requires: BTreeSet<TypeName>,
    batch: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<Entry>,
    batches: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every projection of a generation batch.
    pub fn record(&mut self, generation: &Generation) {
        let batch = self.batches;
        self.batches += 1;
        self.entries
            .extend(generation.projections.iter().map(|projection| Entry {
                root: projection.root.clone(),
                projection: projection.name.clone(),
                requires: projection.requires.clone(),
                batch,
            }));
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, root: &TypeName) -> bool {
        self.entries.iter().any(|e| &e.root == root)
    }

    /// Projection name recorded first for `root`.
    pub fn projection_of(&self, root: &TypeName) -> Option<&ProjectionName> {
        self.entries
            .iter()
            .find(|e| &e.root == root)
            .map(|e| &e.projection)
    }

    /// Check the naming contract over everything recorded so far.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        let mut owners: BTreeMap<&ProjectionName, BTreeSet<&TypeName>> = BTreeMap::new();
        let mut names: BTreeMap<&TypeName, BTreeSet<&ProjectionName>> = BTreeMap::new();
        for entry in &self.entries {
            owners.entry(&entry.projection).or_default().insert(&entry.root);
            names.entry(&entry.root).or_default().insert(&entry.projection);
        }

        for (projection, roots) in &owners {
            if roots.len() > 1 {
                let roots: Vec<String> = roots.iter().map(ToString::to_string).collect();
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::ProjectionCollision,
                    projection.to_string(),
                    format!("projection {} is derived from {}", projection, roots.join(", ")),
                ));
            }
            if let Some(root) = names.keys().find(|root| **root == projection.as_type_name()) {
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::ProjectionCollision,
                    projection.to_string(),
                    format!("projection {} has the same name as root type {}", projection, root),
                ));
            }
        }

        for (root, projections) in &names {
            if projections.len() > 1 {
                let projections: Vec<String> = projections.iter().map(ToString::to_string).collect();
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::ProjectionCollision,
                    root.to_string(),
                    format!("root {} was projected as {}", root, projections.join(", ")),
                ));
            }
        }

        for entry in &self.entries {
            for sibling in &entry.requires {
                if !names.contains_key(sibling) {
                    diagnostics.push(Diagnostic::error(
                        DiagnosticCode::MissingSibling,
                        entry.root.to_string(),
                        format!(
                            "{} references the projection of {}, which no batch generated (batch {})",
                            entry.projection, sibling, entry.batch
                        ),
                    ));
                }
            }
        }

        diagnostics
    }
}
