//! Non-fatal findings reported alongside generation results.

use std::fmt;

use serde::{Serialize, Serializer};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticCode {
    DuplicateField,
    DuplicateAccessor,
    SquashNonStruct,
    SelfDefinedUnnamed,
    UnresolvedType,
    UnsupportedShape,
    UndocumentedOverride,
    ProjectionCollision,
    MissingSibling,
}

impl DiagnosticCode {
    pub fn code_str(self) -> &'static str {
        match self {
            DiagnosticCode::DuplicateField => "D001",
            DiagnosticCode::DuplicateAccessor => "D002",
            DiagnosticCode::SquashNonStruct => "D003",
            DiagnosticCode::SelfDefinedUnnamed => "D004",
            DiagnosticCode::UnresolvedType => "D005",
            DiagnosticCode::UnsupportedShape => "D006",
            DiagnosticCode::UndocumentedOverride => "D007",
            DiagnosticCode::ProjectionCollision => "R001",
            DiagnosticCode::MissingSibling => "R002",
        }
    }
}

impl Serialize for DiagnosticCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code_str())
    }
}

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    /// Dotted path to the offending field (e.g., "Config.Tags").
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(code: DiagnosticCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn error(code: DiagnosticCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {} - {}",
            self.severity.as_str(),
            self.code.code_str(),
            self.path,
            self.message
        )
    }
}

/// A pass result with the diagnostics it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Outcome<T> {
    pub fn new(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self { value, diagnostics }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }
}

pub fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_path() {
        let diag = Diagnostic::warning(
            DiagnosticCode::DuplicateField,
            "Config.Tags",
            "skipping duplicate Tags field",
        );
        assert_eq!(
            diag.to_string(),
            "warning[D001]: Config.Tags - skipping duplicate Tags field"
        );
    }

    #[test]
    fn serializes_code_string() {
        let diag = Diagnostic::error(DiagnosticCode::MissingSibling, "Rule", "no projection");
        let value = serde_json::to_value(&diag).unwrap();
        assert_eq!(value["code"], "R002");
        assert_eq!(value["severity"], "error");
    }

    #[test]
    fn count_by_severity() {
        let diags = vec![
            Diagnostic::warning(DiagnosticCode::DuplicateField, "A.B", ""),
            Diagnostic::warning(DiagnosticCode::DuplicateAccessor, "A.C", ""),
            Diagnostic::error(DiagnosticCode::ProjectionCollision, "A", ""),
        ];
        assert_eq!(count(&diags, Severity::Warning), 2);
        assert_eq!(count(&diags, Severity::Error), 1);
    }

    #[test]
    fn outcome_map_keeps_diagnostics() {
        let outcome = Outcome::new(
            2,
            vec![Diagnostic::warning(DiagnosticCode::UnsupportedShape, "A.F", "")],
        );
        let mapped = outcome.map(|v| v * 2);
        assert_eq!(mapped.value, 4);
        assert_eq!(mapped.diagnostics.len(), 1);
    }
}
