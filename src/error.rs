//! Error types for universe loading, generation and emission.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading a type universe or an override table.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Universe errors (exit code 2)
    #[error("no type universe found in {path}")]
    NoUniverse { path: PathBuf },

    #[error("ambiguous type universe in {path}: {} candidates found", candidates.len())]
    AmbiguousUniverse {
        path: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid type universe: {} error(s), first: {}", errors.len(), errors.first().map(ToString::to_string).unwrap_or_default())]
    InvalidDocument { errors: Vec<SchemaError> },

    #[error("type {name} is declared more than once")]
    DuplicateType { name: String },

    #[error("type {name} must declare either fields or an underlying type")]
    MissingDefinition { name: String },

    #[error("invalid type for {location}: {source}")]
    InvalidType {
        location: String,
        #[source]
        source: TypeExprError,
    },

    #[error("invalid tag on {location}: {source}")]
    InvalidTag {
        location: String,
        #[source]
        source: TagError,
    },

    #[error("invalid override table: {message}")]
    InvalidOverrides { message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors that abort a generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("no root types requested")]
    NoRoots,

    #[error("type {name} not found in the type universe")]
    RootNotFound { name: String },

    #[error("type {name} is not a struct")]
    NotAStruct { name: String },

    #[error("squash cycle at {path}: {name} embeds itself")]
    SquashCycle { path: String, name: String },
}

impl GenerateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            GenerateError::Load(e) => e.exit_code(),
            _ => 2,
        }
    }
}

/// Errors while rendering or writing the generated artifact.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("cannot serialize artifact: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },

    #[error("rendered artifact failed validation with {} error(s)", errors.len())]
    InvalidOutput { errors: Vec<SchemaError> },

    #[error("cannot write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EmitError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            EmitError::WriteError { .. } => 3,
            _ => 2,
        }
    }
}

/// A malformed type expression.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} at offset {offset} in `{expr}`")]
pub struct TypeExprError {
    pub expr: String,
    pub offset: usize,
    pub message: String,
}

/// A malformed struct tag.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("invalid tag key `{key}`")]
    InvalidKey { key: String },

    #[error("tag key `{key}` has no value")]
    MissingValue { key: String },

    #[error("value of tag key `{key}` is not quoted")]
    UnquotedValue { key: String },

    #[error("value of tag key `{key}` is not terminated")]
    UnterminatedValue { key: String },
}

/// Single JSON Schema validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid value.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}
