//! Artifact rendering and writing.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::diagnostics::Diagnostic;
use crate::error::EmitError;
use crate::generate::{FlatView, Generation, Projection};
use crate::spec::SpecSet;
use crate::types::{FlatSchema, ProjectionName, TypeName};
use crate::validator::validate_artifact;

/// Name written into the `generated_by` header.
pub const GENERATOR: &str = "hcl2spec";

#[derive(Serialize)]
struct Artifact<'a> {
    generated_by: String,
    package: Option<&'a str>,
    projections: Vec<ProjectionDoc<'a>>,
    diagnostics: &'a [Diagnostic],
}

#[derive(Serialize)]
struct ProjectionDoc<'a> {
    root: &'a TypeName,
    name: &'a ProjectionName,
    fields: &'a FlatSchema,
    spec: &'a SpecSet,
    zero: FlatView,
    requires: &'a BTreeSet<TypeName>,
}

impl<'a> From<&'a Projection> for ProjectionDoc<'a> {
    fn from(projection: &'a Projection) -> Self {
        Self {
            root: &projection.root,
            name: &projection.name,
            fields: &projection.schema,
            spec: projection.spec(),
            zero: projection.project(),
            requires: &projection.requires,
        }
    }
}

/// The `generated_by` header for a generator invocation.
pub fn generated_by(invocation: &str) -> String {
    let invocation = invocation.trim();
    if invocation.is_empty() {
        GENERATOR.to_string()
    } else {
        format!("{} {}", GENERATOR, invocation)
    }
}

/// Render a generation as JSON text.
///
/// The rendered text is parsed back and validated against the artifact
/// schema; text that fails is never returned.
///
/// # Errors
///
/// Returns `EmitError::Serialize` if serialization fails and
/// `EmitError::InvalidOutput` if the rendered artifact is invalid.
pub fn render(generation: &Generation, invocation: &str, pretty: bool) -> Result<String, EmitError> {
    let artifact = Artifact {
        generated_by: generated_by(invocation),
        package: generation.package.as_deref(),
        projections: generation.projections.iter().map(ProjectionDoc::from).collect(),
        diagnostics: &generation.diagnostics,
    };

    let text = if pretty {
        serde_json::to_string_pretty(&artifact)
    } else {
        serde_json::to_string(&artifact)
    }
    .map_err(|source| EmitError::Serialize { source })?;

    let reparsed: Value =
        serde_json::from_str(&text).map_err(|source| EmitError::Serialize { source })?;
    validate_artifact(&reparsed)?;

    Ok(text)
}

/// Write rendered output to `path`.
///
/// # Errors
///
/// Returns `EmitError::WriteError` if the file cannot be written.
pub fn write_artifact(path: &Path, content: &str) -> Result<(), EmitError> {
    std::fs::write(path, content).map_err(|source| EmitError::WriteError {
        path: path.to_path_buf(),
        source,
    })
}
