//! HCL2 Spec Generator
//!
//! Derives flat, fully optional projections of configuration structs and the
//! HCL2 decode specs that populate them.
//!
//! Configuration structs are decoded by a layer where every field is optional
//! and embedded structs can be squashed into their parent. HCL2 decoding has
//! neither: non-pointer fields are required and blocks cannot be inlined. This
//! library bridges the two by generating, for each root struct, a flat
//! projection (`FlatConfig` for `Config`) with squashed fields bubbled up and
//! every leaf made optional, plus a decode-spec tree keyed by accessor.
//!
//! # Example
//!
//! ```
//! use hcl2spec::{generate, load_universe_str, DecodeSpecNode, GenerateOptions};
//!
//! let universe = load_universe_str(r#"{"types": [
//!     {"name": "Config", "fields": [
//!         {"name": "Common", "type": "Common", "tag": "mapstructure:\",squash\""},
//!         {"name": "Env", "type": "map[string]int"}
//!     ]},
//!     {"name": "Common", "fields": [
//!         {"name": "PackerDebug", "type": "bool"}
//!     ]}
//! ]}"#).unwrap();
//!
//! let generation = generate(&universe, &GenerateOptions::new(["Config"])).unwrap();
//! let config = &generation.projections[0];
//!
//! // the squashed field is bubbled up and made optional
//! assert_eq!(config.schema.names(), vec!["PackerDebug", "Env"]);
//! assert_eq!(config.schema.fields()[0].shape.to_string(), "*bool");
//!
//! // mapping values always decode as strings
//! assert_eq!(config.spec()["env"], DecodeSpecNode::mapping_attrs("env"));
//! ```
//!
//! # Field Rules
//!
//! | Field | Flat field | Decode spec |
//! |-------|------------|-------------|
//! | `Name string` | `*string` | `AttrSpec` (`cty.String`) |
//! | `Ports []int` | `[]int` | `AttrSpec` (`cty.List(cty.Number)`) |
//! | `Env map[string]T` | unchanged | `BlockAttrsSpec` (`cty.String`) |
//! | `Retry Retry` | `*FlatRetry` | `BlockSpec` |
//! | `Rules []Rule` | `[]FlatRule` | `BlockListSpec` |
//! | `Opts struct {..}` | `*struct {..}` | `BlockObjectSpec` |
//! | `mapstructure:",squash"` | fields inlined | one spec per inlined field |
//! | `mapstructure-to-hcl2:",self-defined"` | unchanged | `SelfDefinedSpec` |

mod accessor;
mod diagnostics;
mod emit;
mod error;
mod flatten;
mod generate;
mod loader;
mod lower;
mod overrides;
mod registry;
mod spec;
mod tag;
mod typeexpr;
mod types;
mod universe;
mod validator;

pub use accessor::{accessor_name, accessor_of, synthesize_accessors, to_snake_case};
pub use diagnostics::{Diagnostic, DiagnosticCode, Outcome, Severity};
pub use emit::{generated_by, render, write_artifact, GENERATOR};
pub use error::{EmitError, GenerateError, LoadError, SchemaError, TagError, TypeExprError};
pub use flatten::{flatten, Flattened};
pub use generate::{compile_root, generate, FlatView, Generation, Projection};
pub use loader::{is_url, load_universe, load_universe_auto, load_universe_str};
pub use lower::{lower_field, lower_schema};
pub use overrides::{OverrideEntry, OverrideTable, Placeholder};
pub use registry::Registry;
pub use spec::{visit_specs, BlockListNested, CtyType, DecodeSpecNode, ObjectSpec, SpecSet};
pub use tag::{FieldTagMeta, StructTag, TagEntry, TagGrammar, TAG_GRAMMAR_VERSION};
pub use typeexpr::parse_type_expr;
pub use types::{
    FieldDescriptor, FlatSchema, GenerateOptions, ProjectionName, ScalarKind, TypeName, TypeShape,
    DEFAULT_PROJECTION_PREFIX,
};
pub use universe::{Declaration, Universe};
pub use validator::{validate_against_schema, validate_artifact, validate_universe_document};

#[cfg(feature = "remote")]
pub use loader::load_universe_url;
