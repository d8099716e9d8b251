//! Lowering of flat schemas into decode-spec sets.
//!
//! Dispatch, first match wins:
//!
//! 1. self-defined field: a reference to the field type's own decode spec
//! 2. pointer: lower the pointee
//! 3. scalar: attribute of the matching cty type
//! 4. mapping: block of string attributes
//! 5. sequence of scalars: list attribute
//! 6. sequence of structs or of sequences: block list
//! 7. named struct or projection: block holding the sibling's spec set
//! 8. anonymous struct: object block
//! 9. anything else: boolean attribute and a diagnostic
//!
//! A sibling's spec set is expanded in place the first time the tree reaches
//! it. Every later reference, recursive or not, is a contract-only reference
//! to that projection, so each projection appears at most once per tree.

use std::collections::BTreeSet;

use crate::accessor::{accessor_name, accessor_of, synthesize_accessors};
use crate::diagnostics::{Diagnostic, DiagnosticCode, Outcome};
use crate::error::GenerateError;
use crate::flatten::flatten;
use crate::spec::{BlockListNested, CtyType, DecodeSpecNode, ObjectSpec, SpecSet};
use crate::types::{FieldDescriptor, FlatSchema, GenerateOptions, TypeName, TypeShape};
use crate::universe::{Declaration, Universe};

/// Lower the accessor-tagged flat schema of `root`.
///
/// # Errors
///
/// Returns the flattening error of any sibling expanded into the tree.
pub fn lower_schema(
    universe: &Universe,
    options: &GenerateOptions,
    root: &TypeName,
    schema: &FlatSchema,
) -> Result<Outcome<SpecSet>, GenerateError> {
    let mut lowering = Lowering::new(universe, options);
    lowering.expanded.insert(root.clone());
    let specs = lowering.lower_fields(&root.to_string(), schema.fields())?;
    Ok(Outcome::new(specs, lowering.diagnostics))
}

/// Lower a single accessor-tagged field.
///
/// # Errors
///
/// Returns the flattening error of any sibling expanded into the tree.
pub fn lower_field(
    universe: &Universe,
    options: &GenerateOptions,
    path: &str,
    field: &FieldDescriptor,
) -> Result<Outcome<DecodeSpecNode>, GenerateError> {
    let mut lowering = Lowering::new(universe, options);
    let node = lowering.lower_field(path, field)?;
    Ok(Outcome::new(node, lowering.diagnostics))
}

struct Lowering<'a> {
    universe: &'a Universe,
    options: &'a GenerateOptions,
    /// Projections already expanded somewhere in this tree.
    expanded: BTreeSet<TypeName>,
    /// Named aliases currently being lowered.
    aliases: Vec<TypeName>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lowering<'a> {
    fn new(universe: &'a Universe, options: &'a GenerateOptions) -> Self {
        Self {
            universe,
            options,
            expanded: BTreeSet::new(),
            aliases: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn lower_fields(
        &mut self,
        path: &str,
        fields: &[FieldDescriptor],
    ) -> Result<SpecSet, GenerateError> {
        let mut specs = SpecSet::new();
        for field in fields {
            let node = self.lower_field(&format!("{}.{}", path, field.name), field)?;
            specs.entry(node.accessor().to_string()).or_insert(node);
        }
        Ok(specs)
    }

    fn lower_field(
        &mut self,
        path: &str,
        field: &FieldDescriptor,
    ) -> Result<DecodeSpecNode, GenerateError> {
        let options = self.options;
        let grammar = &options.grammar;
        let accessor = accessor_of(field, grammar)
            .map(str::to_string)
            .unwrap_or_else(|| accessor_name(field, grammar));

        if field.tag.meta(grammar).self_defined {
            match field.shape.named_target() {
                Some(type_name) => {
                    return Ok(DecodeSpecNode::SelfDefined {
                        name: accessor,
                        type_name: type_name.clone(),
                    })
                }
                None => self.diagnostics.push(Diagnostic::warning(
                    DiagnosticCode::SelfDefinedUnnamed,
                    path,
                    format!("self-defined field has no named type ({}); lowered inline", field.shape),
                )),
            }
        }

        self.lower_shape(path, &accessor, &field.shape)
    }

    fn lower_shape(
        &mut self,
        path: &str,
        accessor: &str,
        shape: &TypeShape,
    ) -> Result<DecodeSpecNode, GenerateError> {
        let node = match shape {
            TypeShape::Pointer(inner) => return self.lower_shape(path, accessor, inner),
            TypeShape::Scalar(kind) => DecodeSpecNode::attribute(accessor, CtyType::from_scalar(*kind)),
            TypeShape::Mapping(..) => DecodeSpecNode::mapping_attrs(accessor),
            TypeShape::Sequence(elem) => return self.lower_sequence(path, accessor, elem),
            TypeShape::Named(name) => return self.lower_named(path, accessor, name),
            TypeShape::Projected { source, .. } => DecodeSpecNode::Block {
                type_name: accessor.to_string(),
                nested: self.sibling(source)?,
            },
            TypeShape::AnonymousStruct(fields) => DecodeSpecNode::BlockObject {
                type_name: accessor.to_string(),
                nested: ObjectSpec {
                    contract: None,
                    specs: Some(self.lower_fields(path, fields)?),
                },
            },
            TypeShape::Callable | TypeShape::Unsupported(_) => self.unsupported(path, accessor, shape),
        };
        Ok(node)
    }

    fn lower_sequence(
        &mut self,
        path: &str,
        accessor: &str,
        elem: &TypeShape,
    ) -> Result<DecodeSpecNode, GenerateError> {
        let block_list = |nested: BlockListNested| DecodeSpecNode::BlockList {
            type_name: accessor.to_string(),
            nested,
        };

        let node = match elem.strip_pointer() {
            TypeShape::Scalar(kind) => {
                DecodeSpecNode::attribute(accessor, CtyType::list(CtyType::from_scalar(*kind)))
            }
            TypeShape::Projected { source, .. } => {
                block_list(BlockListNested::Object(self.sibling(source)?))
            }
            TypeShape::Sequence(inner) => {
                let nested = self.lower_sequence(path, accessor, inner)?;
                block_list(BlockListNested::Node(Box::new(nested)))
            }
            TypeShape::Named(name) => {
                if let Some(placeholder) = self.options.overrides.shape_for(name) {
                    return self.lower_sequence(path, accessor, &placeholder);
                }
                let universe = self.universe;
                match universe.get(name) {
                    Some(Declaration::Struct(_)) => {
                        block_list(BlockListNested::Object(self.sibling(name)?))
                    }
                    Some(Declaration::Alias(underlying)) => {
                        return self.through_alias(path, accessor, name, |lowering| {
                            lowering.lower_sequence(path, accessor, underlying)
                        })
                    }
                    None => {
                        self.unresolved(path, name);
                        DecodeSpecNode::attribute(accessor, CtyType::list(CtyType::String))
                    }
                }
            }
            other => return self.lower_shape(path, accessor, other),
        };
        Ok(node)
    }

    fn lower_named(
        &mut self,
        path: &str,
        accessor: &str,
        name: &TypeName,
    ) -> Result<DecodeSpecNode, GenerateError> {
        if let Some(placeholder) = self.options.overrides.shape_for(name) {
            return self.lower_shape(path, accessor, &placeholder);
        }

        let universe = self.universe;
        match universe.get(name) {
            Some(Declaration::Struct(_)) => Ok(DecodeSpecNode::Block {
                type_name: accessor.to_string(),
                nested: self.sibling(name)?,
            }),
            Some(Declaration::Alias(underlying)) => {
                self.through_alias(path, accessor, name, |lowering| {
                    lowering.lower_shape(path, accessor, underlying)
                })
            }
            None => {
                self.unresolved(path, name);
                Ok(DecodeSpecNode::attribute(accessor, CtyType::String))
            }
        }
    }

    /// Lower the underlying shape of a named alias, unless that alias is
    /// already being lowered.
    fn through_alias<F>(
        &mut self,
        path: &str,
        accessor: &str,
        name: &TypeName,
        lower: F,
    ) -> Result<DecodeSpecNode, GenerateError>
    where
        F: FnOnce(&mut Self) -> Result<DecodeSpecNode, GenerateError>,
    {
        if self.aliases.contains(name) {
            return Ok(self.unsupported(path, accessor, &TypeShape::Named(name.clone())));
        }
        self.aliases.push(name.clone());
        let node = lower(self);
        self.aliases.pop();
        node
    }

    /// The spec set of the sibling projection of `source`, expanded in place
    /// on first reference and contract-only afterwards.
    ///
    /// Findings inside a sibling belong to the sibling's own generation and
    /// are not reported here.
    fn sibling(&mut self, source: &TypeName) -> Result<ObjectSpec, GenerateError> {
        let contract = Some(self.options.projection_name(source));
        if !self.expanded.insert(source.clone()) {
            return Ok(ObjectSpec {
                contract,
                specs: None,
            });
        }

        let flattened = flatten(self.universe, source, self.options)?;
        let path = source.to_string();
        let schema = synthesize_accessors(&flattened.value.schema, &self.options.grammar, &path).value;

        let reported = self.diagnostics.len();
        let specs = self.lower_fields(&path, schema.fields())?;
        self.diagnostics.truncate(reported);

        Ok(ObjectSpec {
            contract,
            specs: Some(specs),
        })
    }

    fn unresolved(&mut self, path: &str, name: &TypeName) {
        self.diagnostics.push(Diagnostic::warning(
            DiagnosticCode::UnresolvedType,
            path,
            format!("type {} not found in the type universe; decoded as a string", name),
        ));
    }

    fn unsupported(&mut self, path: &str, accessor: &str, shape: &TypeShape) -> DecodeSpecNode {
        self.diagnostics.push(Diagnostic::warning(
            DiagnosticCode::UnsupportedShape,
            path,
            format!("could not find a decode spec for type {}; needs manual attention", shape),
        ));
        DecodeSpecNode::attribute(accessor, CtyType::Bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_universe_str;
    use crate::spec::visit_specs;

    fn universe(types: &str) -> Universe {
        load_universe_str(&format!(r#"{{"types": {}}}"#, types)).unwrap()
    }

    fn lower_root(universe: &Universe, root: &str) -> Outcome<SpecSet> {
        let options = GenerateOptions::new([root]);
        let root = TypeName::new(root);
        let flat = flatten(universe, &root, &options).unwrap();
        let tagged = synthesize_accessors(&flat.value.schema, &options.grammar, &root.to_string());
        lower_schema(universe, &options, &root, &tagged.value).unwrap()
    }

    #[test]
    fn scalars_and_lists() {
        let u = universe(
            r#"[{"name": "Config", "fields": [
                {"name": "Enabled", "type": "bool"},
                {"name": "Ratio", "type": "float32"},
                {"name": "Inline", "type": "[]string"},
                {"name": "Ports", "type": "[]*uint16"}
            ]}]"#,
        );
        let specs = lower_root(&u, "Config").value;

        assert_eq!(specs["enabled"], DecodeSpecNode::attribute("enabled", CtyType::Bool));
        assert_eq!(specs["ratio"], DecodeSpecNode::attribute("ratio", CtyType::Number));
        assert_eq!(
            specs["inline"],
            DecodeSpecNode::attribute("inline", CtyType::list(CtyType::String))
        );
        assert_eq!(
            specs["ports"],
            DecodeSpecNode::attribute("ports", CtyType::list(CtyType::Number))
        );
    }

    #[test]
    fn mapping_values_are_strings() {
        let u = universe(
            r#"[{"name": "Config", "fields": [{"name": "Env", "type": "map[string]int"}]}]"#,
        );
        let specs = lower_root(&u, "Config").value;
        assert_eq!(specs["env"], DecodeSpecNode::mapping_attrs("env"));
    }

    #[test]
    fn named_struct_block_expands_sibling() {
        let u = universe(
            r#"[
                {"name": "Config", "fields": [{"name": "Retry", "type": "*Retry"}]},
                {"name": "Retry", "fields": [{"name": "MaxAttempts", "type": "int"}]}
            ]"#,
        );
        let specs = lower_root(&u, "Config").value;
        match &specs["retry"] {
            DecodeSpecNode::Block { nested, .. } => {
                assert_eq!(nested.contract.as_ref().unwrap().to_string(), "FlatRetry");
                assert!(nested.specs.as_ref().unwrap().contains_key("max_attempts"));
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn sequence_of_sequences_nests_block_lists() {
        let u = universe(
            r#"[
                {"name": "Config", "fields": [{"name": "Grid", "type": "[][]Cell"}]},
                {"name": "Cell", "fields": [{"name": "X", "type": "int"}]}
            ]"#,
        );
        let specs = lower_root(&u, "Config").value;
        let DecodeSpecNode::BlockList { nested: BlockListNested::Node(inner), .. } = &specs["grid"] else {
            panic!("expected outer block list, got {:?}", specs["grid"]);
        };
        let DecodeSpecNode::BlockList { nested: BlockListNested::Object(object), .. } = inner.as_ref() else {
            panic!("expected inner block list, got {inner:?}");
        };
        assert!(object.specs.as_ref().unwrap().contains_key("x"));
    }

    #[test]
    fn recursive_types_terminate() {
        let u = universe(
            r#"[
                {"name": "Node", "fields": [
                    {"name": "Value", "type": "string"},
                    {"name": "Children", "type": "[]Node"},
                    {"name": "Parent", "type": "*Node"}
                ]}
            ]"#,
        );
        let specs = lower_root(&u, "Node").value;
        match &specs["children"] {
            DecodeSpecNode::BlockList {
                nested: BlockListNested::Object(object),
                ..
            } => assert!(object.is_back_reference()),
            other => panic!("expected block list, got {other:?}"),
        }
        match &specs["parent"] {
            DecodeSpecNode::Block { nested, .. } => assert!(nested.is_back_reference()),
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn mutually_recursive_siblings_terminate() {
        let u = universe(
            r#"[
                {"name": "A", "fields": [{"name": "B", "type": "*B"}]},
                {"name": "B", "fields": [{"name": "A", "type": "*A"}]}
            ]"#,
        );
        let specs = lower_root(&u, "A").value;
        let DecodeSpecNode::Block { nested, .. } = &specs["b"] else {
            panic!("expected block");
        };
        let inner = nested.specs.as_ref().unwrap();
        let DecodeSpecNode::Block { nested, .. } = &inner["a"] else {
            panic!("expected block");
        };
        assert!(nested.is_back_reference());
    }

    #[test]
    fn self_defined_references_own_type() {
        let u = universe(
            r#"[
                {"name": "Config", "fields": [
                    {"name": "Child", "type": "*Config", "tag": "mapstructure-to-hcl2:\",self-defined\""}
                ]}
            ]"#,
        );
        let specs = lower_root(&u, "Config").value;
        assert_eq!(
            specs["child"],
            DecodeSpecNode::SelfDefined {
                name: "child".into(),
                type_name: TypeName::new("Config"),
            }
        );
    }

    #[test]
    fn self_defined_without_named_type_warns() {
        let u = universe(
            r#"[{"name": "Config", "fields": [
                {"name": "Names", "type": "[]string", "tag": "mapstructure-to-hcl2:\",self-defined\""}
            ]}]"#,
        );
        let out = lower_root(&u, "Config");
        assert_eq!(out.diagnostics[0].code, DiagnosticCode::SelfDefinedUnnamed);
        assert_eq!(
            out.value["names"],
            DecodeSpecNode::attribute("names", CtyType::list(CtyType::String))
        );
    }

    #[test]
    fn named_alias_lowers_as_underlying() {
        let u = universe(
            r#"[
                {"name": "Config", "fields": [
                    {"name": "Mode", "type": "Mode"},
                    {"name": "Modes", "type": "[]Mode"}
                ]},
                {"name": "Mode", "type": "string"}
            ]"#,
        );
        let out = lower_root(&u, "Config");
        assert_eq!(out.value["mode"], DecodeSpecNode::attribute("mode", CtyType::String));
        assert_eq!(
            out.value["modes"],
            DecodeSpecNode::attribute("modes", CtyType::list(CtyType::String))
        );
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn fallbacks_report_diagnostics() {
        let u = universe(
            r#"[{"name": "Config", "fields": [
                {"name": "Source", "type": "other.Source"},
                {"name": "Done", "type": "chan bool"}
            ]}]"#,
        );
        let out = lower_root(&u, "Config");
        assert_eq!(out.value["source"], DecodeSpecNode::attribute("source", CtyType::String));
        assert_eq!(out.value["done"], DecodeSpecNode::attribute("done", CtyType::Bool));

        let codes: Vec<_> = out.diagnostics.iter().map(|d| d.code).collect();
        assert!(codes.contains(&DiagnosticCode::UnresolvedType));
        assert!(codes.contains(&DiagnosticCode::UnsupportedShape));
    }

    #[test]
    fn sibling_findings_not_reported() {
        let u = universe(
            r#"[
                {"name": "Config", "fields": [{"name": "Rule", "type": "Rule"}]},
                {"name": "Rule", "fields": [{"name": "Source", "type": "other.Source"}]}
            ]"#,
        );
        assert!(lower_root(&u, "Config").diagnostics.is_empty());
        assert_eq!(lower_root(&u, "Rule").diagnostics.len(), 1);
    }

    #[test]
    fn nothing_is_required() {
        let u = universe(
            r#"[
                {"name": "Config", "fields": [
                    {"name": "Name", "type": "string"},
                    {"name": "Env", "type": "map[string]string"},
                    {"name": "Rules", "type": "[]Rule"},
                    {"name": "Opts", "type": {"fields": [{"name": "Debug", "type": "bool"}]}}
                ]},
                {"name": "Rule", "fields": [{"name": "Tags", "type": "map[string]string"}]}
            ]"#,
        );
        let specs = lower_root(&u, "Config").value;
        let mut visited = 0;
        visit_specs(&specs, &mut |node| {
            visited += 1;
            assert!(!node.is_required());
        });
        assert_eq!(visited, 6);
    }

    #[test]
    fn lower_single_field() {
        let u = universe(r#"[{"name": "Config", "fields": []}]"#);
        let options = GenerateOptions::new(["Config"]);
        let field = FieldDescriptor::new(
            "Timeout",
            TypeShape::Named(TypeName::new("time.Duration")),
            crate::tag::StructTag::default(),
        );
        let out = lower_field(&u, &options, "Config.Timeout", &field).unwrap();
        assert_eq!(out.value, DecodeSpecNode::attribute("timeout", CtyType::String));
    }

    #[test]
    fn sequence_depth_three_nests_three_block_lists() {
        let u = universe(
            r#"[
                {"name": "Config", "fields": [{"name": "Cube", "type": "[][][]Cell"}]},
                {"name": "Cell", "fields": [{"name": "X", "type": "int"}]}
            ]"#,
        );
        let specs = lower_root(&u, "Config").value;

        let mut node = &specs["cube"];
        for _ in 0..2 {
            let DecodeSpecNode::BlockList { nested: BlockListNested::Node(inner), .. } = node else {
                panic!("expected nested block list, got {node:?}");
            };
            node = inner.as_ref();
        }
        let DecodeSpecNode::BlockList { nested: BlockListNested::Object(object), .. } = node else {
            panic!("expected innermost block list, got {node:?}");
        };
        assert_eq!(object.contract.as_ref().unwrap().to_string(), "FlatCell");
        assert!(object.specs.as_ref().unwrap().contains_key("x"));
    }

    #[test]
    fn shared_sibling_expanded_once() {
        // T0 -> {T1, T1}, T1 -> {T2, T2}, ... : every type reachable twice
        let depth = 20;
        let types: Vec<String> = (0..depth)
            .map(|i| {
                if i + 1 == depth {
                    format!(r#"{{"name": "T{}", "fields": []}}"#, i)
                } else {
                    format!(
                        r#"{{"name": "T{i}", "fields": [
                            {{"name": "L", "type": "*T{next}"}},
                            {{"name": "R", "type": "*T{next}"}}
                        ]}}"#,
                        i = i,
                        next = i + 1
                    )
                }
            })
            .collect();
        let u = universe(&format!("[{}]", types.join(",")));
        let specs = lower_root(&u, "T0").value;

        let mut visited = 0;
        visit_specs(&specs, &mut |_| visited += 1);
        assert_eq!(visited, 2 * (depth - 1));

        let DecodeSpecNode::Block { nested: left, .. } = &specs["l"] else {
            panic!("expected block");
        };
        let DecodeSpecNode::Block { nested: right, .. } = &specs["r"] else {
            panic!("expected block");
        };
        assert!(!left.is_back_reference());
        assert!(right.is_back_reference());
        assert_eq!(right.contract.as_ref().unwrap().to_string(), "FlatT1");
    }

    #[test]
    fn sibling_flatten_error_propagates() {
        let u = universe(
            r#"[
                {"name": "Config", "fields": [{"name": "Bad", "type": "*Bad"}]},
                {"name": "Bad", "fields": [{"name": "Loop", "type": "Loop", "tag": "mapstructure:\",squash\""}]},
                {"name": "Loop", "fields": [{"name": "B", "type": "Bad", "tag": "mapstructure:\",squash\""}]}
            ]"#,
        );
        let options = GenerateOptions::new(["Config"]);
        let root = TypeName::new("Config");
        let flat = flatten(&u, &root, &options).unwrap();
        let tagged = synthesize_accessors(&flat.value.schema, &options.grammar, "Config");

        let result = lower_schema(&u, &options, &root, &tagged.value);
        assert!(matches!(
            result,
            Err(GenerateError::SquashCycle { path, name }) if path == "Loop.B" && name == "Bad"
        ));
    }
}
