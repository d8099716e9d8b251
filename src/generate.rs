//! Generation runs: one flat projection and spec set per requested root.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::accessor::{synthesize_accessors, to_snake_case};
use crate::diagnostics::{count, Diagnostic, Outcome, Severity};
use crate::error::GenerateError;
use crate::flatten::flatten;
use crate::lower::lower_schema;
use crate::spec::SpecSet;
use crate::types::{FlatSchema, GenerateOptions, ProjectionName, ScalarKind, TypeName, TypeShape};
use crate::universe::Universe;

/// The zero value of a flat projection: every field unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatView {
    pub projection: ProjectionName,
    /// Zero value per accessor.
    pub values: Map<String, Value>,
}

impl FlatView {
    pub fn get(&self, accessor: &str) -> Option<&Value> {
        self.values.get(accessor)
    }
}

/// The flat projection of one root type.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub root: TypeName,
    pub name: ProjectionName,
    pub schema: FlatSchema,
    pub specs: SpecSet,
    /// Roots whose projections this one references.
    pub requires: BTreeSet<TypeName>,
    /// Tag key the accessors were written under.
    accessor_key: String,
}

impl Projection {
    /// A zero-valued instance of the projection.
    pub fn project(&self) -> FlatView {
        let values = self
            .schema
            .fields()
            .iter()
            .map(|field| {
                let accessor = field
                    .tag
                    .get(&self.accessor_key)
                    .map(|entry| entry.name.clone())
                    .unwrap_or_else(|| to_snake_case(&field.name));
                (accessor, zero_value(&field.shape))
            })
            .collect();

        FlatView {
            projection: self.name.clone(),
            values,
        }
    }

    pub fn spec(&self) -> &SpecSet {
        &self.specs
    }
}

fn zero_value(shape: &TypeShape) -> Value {
    match shape {
        TypeShape::Sequence(_) => Value::Array(Vec::new()),
        TypeShape::Mapping(..) => Value::Object(Map::new()),
        TypeShape::Scalar(ScalarKind::Bool) => Value::Bool(false),
        TypeShape::Scalar(ScalarKind::String) => Value::String(String::new()),
        TypeShape::Scalar(_) => Value::from(0),
        _ => Value::Null,
    }
}

/// Result of a generation run.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    pub package: Option<String>,
    /// One projection per root, sorted by root.
    pub projections: Vec<Projection>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Generation {
    pub fn projection(&self, root: &TypeName) -> Option<&Projection> {
        self.projections.iter().find(|p| &p.root == root)
    }

    pub fn errors(&self) -> usize {
        count(&self.diagnostics, Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        count(&self.diagnostics, Severity::Warning)
    }
}

/// Generate projections for every root in `options`.
///
/// Override entries without a note are reported before any root's findings.
///
/// # Errors
///
/// Returns `GenerateError::NoRoots` when no root is requested, and the
/// errors of [`compile_root`] for the first root that fails.
///
/// # Example
///
/// ```
/// use hcl2spec::{generate, load_universe_str, GenerateOptions};
///
/// let universe = load_universe_str(r#"{"types": [
///     {"name": "Config", "fields": [
///         {"name": "Command", "type": "string", "tag": "mapstructure:\"cmd\""}
///     ]}
/// ]}"#).unwrap();
///
/// let generation = generate(&universe, &GenerateOptions::new(["Config"])).unwrap();
/// let projection = &generation.projections[0];
/// assert_eq!(projection.name.to_string(), "FlatConfig");
/// assert!(projection.spec().contains_key("cmd"));
/// ```
pub fn generate(universe: &Universe, options: &GenerateOptions) -> Result<Generation, GenerateError> {
    if options.roots.is_empty() {
        return Err(GenerateError::NoRoots);
    }

    let mut generation = Generation {
        package: universe.package().map(str::to_string),
        diagnostics: options.overrides.undocumented(),
        ..Generation::default()
    };

    for root in &options.roots {
        let outcome = compile_root(universe, root, options)?;
        generation.projections.push(outcome.value);
        generation.diagnostics.extend(outcome.diagnostics);
    }

    Ok(generation)
}

/// Flatten, tag and lower a single root.
///
/// # Errors
///
/// Returns the errors of [`flatten`], for the root or for any sibling
/// expanded into its spec set.
pub fn compile_root(
    universe: &Universe,
    root: &TypeName,
    options: &GenerateOptions,
) -> Result<Outcome<Projection>, GenerateError> {
    let path = root.to_string();

    let flattened = flatten(universe, root, options)?;
    let mut diagnostics = flattened.diagnostics;

    let tagged = synthesize_accessors(&flattened.value.schema, &options.grammar, &path);
    diagnostics.extend(tagged.diagnostics);

    let lowered = lower_schema(universe, options, root, &tagged.value)?;
    diagnostics.extend(lowered.diagnostics);

    let projection = Projection {
        root: root.clone(),
        name: options.projection_name(root),
        schema: tagged.value,
        specs: lowered.value,
        requires: flattened.value.requires,
        accessor_key: options.grammar.accessor_key.clone(),
    };

    Ok(Outcome::new(projection, diagnostics))
}
