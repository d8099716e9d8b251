//! JSON Schema validation of universe documents and rendered artifacts.

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::{EmitError, LoadError, SchemaError};

const UNIVERSE_SCHEMA: &str = r##"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "required": ["types"],
  "properties": {
    "package": { "type": "string" },
    "types": { "type": "array", "items": { "$ref": "#/$defs/declaration" } }
  },
  "$defs": {
    "declaration": {
      "type": "object",
      "required": ["name"],
      "properties": {
        "name": { "type": "string", "minLength": 1 },
        "fields": { "type": "array", "items": { "$ref": "#/$defs/field" } },
        "type": { "$ref": "#/$defs/type" }
      },
      "oneOf": [
        { "required": ["fields"] },
        { "required": ["type"] }
      ]
    },
    "field": {
      "type": "object",
      "required": ["name", "type"],
      "properties": {
        "name": { "type": "string", "minLength": 1 },
        "type": { "$ref": "#/$defs/type" },
        "tag": { "type": "string" }
      }
    },
    "type": {
      "oneOf": [
        { "type": "string", "minLength": 1 },
        {
          "type": "object",
          "required": ["fields"],
          "properties": {
            "fields": { "type": "array", "items": { "$ref": "#/$defs/field" } }
          }
        }
      ]
    }
  }
}"##;

const ARTIFACT_SCHEMA: &str = r##"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "required": ["generated_by", "projections", "diagnostics"],
  "properties": {
    "generated_by": { "type": "string" },
    "package": { "type": ["string", "null"] },
    "projections": { "type": "array", "items": { "$ref": "#/$defs/projection" } },
    "diagnostics": { "type": "array", "items": { "$ref": "#/$defs/diagnostic" } }
  },
  "$defs": {
    "projection": {
      "type": "object",
      "required": ["root", "name", "fields", "spec", "zero", "requires"],
      "properties": {
        "root": { "type": "string" },
        "name": { "type": "string" },
        "fields": { "type": "array", "items": { "$ref": "#/$defs/field" } },
        "spec": { "$ref": "#/$defs/spec_set" },
        "zero": {
          "type": "object",
          "required": ["projection", "values"],
          "properties": {
            "projection": { "type": "string" },
            "values": { "type": "object" }
          }
        },
        "requires": { "type": "array", "items": { "type": "string" } }
      }
    },
    "field": {
      "type": "object",
      "required": ["name", "type", "tag"],
      "properties": {
        "name": { "type": "string" },
        "type": { "type": "string" },
        "tag": { "type": "string" }
      }
    },
    "spec_set": {
      "type": "object",
      "additionalProperties": { "$ref": "#/$defs/node" }
    },
    "object_spec": {
      "type": "object",
      "additionalProperties": false,
      "properties": {
        "contract": { "type": "string" },
        "specs": { "$ref": "#/$defs/spec_set" }
      }
    },
    "node": {
      "type": "object",
      "required": ["kind"],
      "properties": {
        "kind": {
          "enum": ["AttrSpec", "BlockAttrsSpec", "BlockSpec", "BlockListSpec", "BlockObjectSpec", "SelfDefinedSpec"]
        },
        "required": { "const": false },
        "nested": {
          "anyOf": [
            { "$ref": "#/$defs/node" },
            { "$ref": "#/$defs/object_spec" }
          ]
        }
      }
    },
    "diagnostic": {
      "type": "object",
      "required": ["severity", "code", "path", "message"],
      "properties": {
        "severity": { "enum": ["error", "warning"] },
        "code": { "type": "string" },
        "path": { "type": "string" },
        "message": { "type": "string" }
      }
    }
  }
}"##;

static UNIVERSE_SCHEMA_VALUE: Lazy<Value> =
    Lazy::new(|| serde_json::from_str(UNIVERSE_SCHEMA).expect("embedded universe schema is valid JSON"));

static ARTIFACT_SCHEMA_VALUE: Lazy<Value> =
    Lazy::new(|| serde_json::from_str(ARTIFACT_SCHEMA).expect("embedded artifact schema is valid JSON"));

/// Validate a raw type universe document.
///
/// # Errors
///
/// Returns `LoadError::InvalidDocument` with every violation found.
pub fn validate_universe_document(doc: &Value) -> Result<(), LoadError> {
    validate_against_schema(&UNIVERSE_SCHEMA_VALUE, doc)
        .map_err(|errors| LoadError::InvalidDocument { errors })
}

/// Validate a rendered artifact before it is written.
///
/// # Errors
///
/// Returns `EmitError::InvalidOutput` with every violation found.
pub fn validate_artifact(artifact: &Value) -> Result<(), EmitError> {
    validate_against_schema(&ARTIFACT_SCHEMA_VALUE, artifact)
        .map_err(|errors| EmitError::InvalidOutput { errors })
}

/// Validate an instance against a JSON Schema, collecting every error.
pub fn validate_against_schema(schema: &Value, instance: &Value) -> Result<(), Vec<SchemaError>> {
    let validator = jsonschema::validator_for(schema).map_err(|e| {
        vec![SchemaError {
            path: String::new(),
            message: format!("invalid schema: {}", e),
        }]
    })?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(instance)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
