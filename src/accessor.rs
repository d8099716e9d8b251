//! Accessor synthesis: the external key each flat field is decoded from.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostics::{Diagnostic, DiagnosticCode, Outcome};
use crate::flatten::unique_by;
use crate::tag::{TagEntry, TagGrammar};
use crate::types::{FieldDescriptor, FlatSchema, TypeShape};

/// A character followed by a capitalized word (`DWord` in `ABCDWord`).
static WORD_START: Lazy<Regex> =
    Lazy::new(|| Regex::new("(.)([A-Z][a-z]+)").expect("word start pattern is valid"));

/// A lowercase letter or digit followed by an uppercase letter.
static CAMEL_HUMP: Lazy<Regex> =
    Lazy::new(|| Regex::new("([a-z0-9])([A-Z])").expect("camel hump pattern is valid"));

/// Convert a field name to snake case.
///
/// ```
/// use hcl2spec::to_snake_case;
///
/// assert_eq!(to_snake_case("PackerBuildName"), "packer_build_name");
/// assert_eq!(to_snake_case("HTTPServer"), "http_server");
/// ```
pub fn to_snake_case(name: &str) -> String {
    let snake = WORD_START.replace_all(name, "${1}_${2}");
    let snake = CAMEL_HUMP.replace_all(&snake, "${1}_${2}");
    snake.to_lowercase()
}

/// The accessor a field is given: its explicit decode name, else its
/// snake-cased field name.
pub fn accessor_name(field: &FieldDescriptor, grammar: &TagGrammar) -> String {
    field
        .tag
        .meta(grammar)
        .external_name
        .unwrap_or_else(|| to_snake_case(&field.name))
}

/// The accessor already written onto a field's tag, if any.
pub fn accessor_of<'f>(field: &'f FieldDescriptor, grammar: &TagGrammar) -> Option<&'f str> {
    field
        .tag
        .get(&grammar.accessor_key)
        .map(|entry| entry.name.as_str())
        .filter(|name| !name.is_empty())
}

/// Write accessors onto every field tag, inside anonymous structs too, and
/// drop fields whose accessor was already claimed.
pub fn synthesize_accessors(
    schema: &FlatSchema,
    grammar: &TagGrammar,
    path: &str,
) -> Outcome<FlatSchema> {
    let mut diagnostics = Vec::new();
    let fields = synthesize_fields(schema.fields(), grammar, path, &mut diagnostics);
    Outcome::new(FlatSchema::new(fields), diagnostics)
}

fn synthesize_fields(
    fields: &[FieldDescriptor],
    grammar: &TagGrammar,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<FieldDescriptor> {
    let tagged: Vec<(String, FieldDescriptor)> = fields
        .iter()
        .map(|field| {
            let accessor = accessor_name(field, grammar);
            let field_path = format!("{}.{}", path, field.name);
            let shape = with_nested_accessors(&field.shape, grammar, &field_path, diagnostics);
            let tag = field
                .tag
                .set(TagEntry::named(grammar.accessor_key.as_str(), accessor.as_str()));
            (accessor, field.with_shape(shape).with_tag(tag))
        })
        .collect();

    unique_by(
        tagged,
        |(accessor, _)| accessor.clone(),
        |(accessor, field)| {
            diagnostics.push(Diagnostic::warning(
                DiagnosticCode::DuplicateAccessor,
                format!("{}.{}", path, field.name),
                format!(
                    "skipping field {} (duplicate `{}` {} tag)",
                    field.name, accessor, grammar.accessor_key
                ),
            ));
        },
    )
    .into_iter()
    .map(|(_, field)| field)
    .collect()
}

fn with_nested_accessors(
    shape: &TypeShape,
    grammar: &TagGrammar,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> TypeShape {
    match shape {
        TypeShape::Pointer(inner) => with_nested_accessors(inner, grammar, path, diagnostics).pointer(),
        TypeShape::AnonymousStruct(fields) => {
            TypeShape::AnonymousStruct(synthesize_fields(fields, grammar, path, diagnostics))
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::StructTag;
    use crate::types::ScalarKind;

    fn field(name: &str, tag: &str) -> FieldDescriptor {
        FieldDescriptor::new(
            name,
            TypeShape::Scalar(ScalarKind::String).pointer(),
            StructTag::parse(tag).unwrap(),
        )
    }

    #[test]
    fn snake_case_boundaries() {
        assert_eq!(to_snake_case("Name"), "name");
        assert_eq!(to_snake_case("PackerBuildName"), "packer_build_name");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("WinRMUseSSL"), "win_rm_use_ssl");
        assert_eq!(to_snake_case("IPv6Address"), "i_pv6_address");
        assert_eq!(to_snake_case("ABCDWord"), "abcd_word");
    }

    #[test]
    fn snake_case_idempotent() {
        for name in ["PackerBuildName", "HTTPServer", "ABCDWord", "Count", "SSHPort22"] {
            let once = to_snake_case(name);
            assert_eq!(to_snake_case(&once), once);
        }
    }

    #[test]
    fn explicit_name_wins() {
        let grammar = TagGrammar::default();
        assert_eq!(accessor_name(&field("Command", r#"mapstructure:"cmd""#), &grammar), "cmd");
        assert_eq!(
            accessor_name(&field("Command", r#"mapstructure:",omitempty""#), &grammar),
            "command"
        );
    }

    #[test]
    fn accessor_written_onto_tag() {
        let grammar = TagGrammar::default();
        let schema = FlatSchema::new(vec![field("StagingDir", r#"mapstructure:"staging_directory""#)]);
        let out = synthesize_accessors(&schema, &grammar, "Config");

        let tagged = &out.value.fields()[0];
        assert_eq!(accessor_of(tagged, &grammar), Some("staging_directory"));
        assert_eq!(
            tagged.tag.to_string(),
            r#"mapstructure:"staging_directory" cty:"staging_directory""#
        );
    }

    #[test]
    fn duplicate_accessor_dropped() {
        let grammar = TagGrammar::default();
        let schema = FlatSchema::new(vec![
            field("Command", ""),
            field("Cmd", r#"mapstructure:"command""#),
        ]);
        let out = synthesize_accessors(&schema, &grammar, "Config");

        assert_eq!(out.value.names(), vec!["Command"]);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].code, DiagnosticCode::DuplicateAccessor);
        assert_eq!(out.diagnostics[0].path, "Config.Cmd");
    }

    #[test]
    fn anonymous_struct_fields_tagged() {
        let grammar = TagGrammar::default();
        let schema = FlatSchema::new(vec![FieldDescriptor::new(
            "Retry",
            TypeShape::AnonymousStruct(vec![field("MaxAttempts", "")]).pointer(),
            StructTag::default(),
        )]);
        let out = synthesize_accessors(&schema, &grammar, "Config");

        match out.value.fields()[0].shape.strip_pointer() {
            TypeShape::AnonymousStruct(inner) => {
                assert_eq!(accessor_of(&inner[0], &grammar), Some("max_attempts"));
            }
            other => panic!("expected anonymous struct, got {other:?}"),
        }
    }
}
