//! Decode-spec tree: how a document value populates a flat projection.
//!
//! Nodes mirror the HCL2 `hcldec` spec kinds. Every attribute is optional:
//! the `required` flag exists only so the serialized tree states it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::types::{ProjectionName, ScalarKind, TypeName};

/// Value type of an attribute, rendered as `cty.String`, `cty.List(cty.Number)`...
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CtyType {
    Bool,
    String,
    Number,
    List(Box<CtyType>),
}

impl CtyType {
    pub fn from_scalar(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Bool => CtyType::Bool,
            ScalarKind::String => CtyType::String,
            _ => CtyType::Number,
        }
    }

    pub fn list(element: CtyType) -> Self {
        CtyType::List(Box::new(element))
    }
}

impl fmt::Display for CtyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CtyType::Bool => f.write_str("cty.Bool"),
            CtyType::String => f.write_str("cty.String"),
            CtyType::Number => f.write_str("cty.Number"),
            CtyType::List(element) => write!(f, "cty.List({})", element),
        }
    }
}

impl Serialize for CtyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Decode specs keyed by accessor, sorted.
pub type SpecSet = BTreeMap<String, DecodeSpecNode>;

/// Spec set of a nested block.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ObjectSpec {
    /// Projection whose spec set this is; `None` for anonymous structs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<ProjectionName>,
    /// `None` for a reference to a projection expanded elsewhere in the tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specs: Option<SpecSet>,
}

impl ObjectSpec {
    pub fn is_back_reference(&self) -> bool {
        self.contract.is_some() && self.specs.is_none()
    }
}

/// What a block list repeats.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockListNested {
    Object(ObjectSpec),
    Node(Box<DecodeSpecNode>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum DecodeSpecNode {
    #[serde(rename = "AttrSpec")]
    Attribute {
        name: String,
        #[serde(rename = "type")]
        ty: CtyType,
        required: bool,
    },
    /// A block of string-valued attributes. Mapping values are always
    /// decoded as strings, whatever their declared type.
    #[serde(rename = "BlockAttrsSpec")]
    MappingAttrs {
        type_name: String,
        element_type: CtyType,
        required: bool,
    },
    #[serde(rename = "BlockSpec")]
    Block { type_name: String, nested: ObjectSpec },
    #[serde(rename = "BlockListSpec")]
    BlockList {
        type_name: String,
        nested: BlockListNested,
    },
    #[serde(rename = "BlockObjectSpec")]
    BlockObject { type_name: String, nested: ObjectSpec },
    /// Defers to the decode spec of `type_name` itself.
    #[serde(rename = "SelfDefinedSpec")]
    SelfDefined { name: String, type_name: TypeName },
}

impl DecodeSpecNode {
    pub fn attribute(accessor: &str, ty: CtyType) -> Self {
        DecodeSpecNode::Attribute {
            name: accessor.to_string(),
            ty,
            required: false,
        }
    }

    pub fn mapping_attrs(accessor: &str) -> Self {
        DecodeSpecNode::MappingAttrs {
            type_name: accessor.to_string(),
            element_type: CtyType::String,
            required: false,
        }
    }

    /// The key this node decodes.
    pub fn accessor(&self) -> &str {
        match self {
            DecodeSpecNode::Attribute { name, .. } | DecodeSpecNode::SelfDefined { name, .. } => {
                name
            }
            DecodeSpecNode::MappingAttrs { type_name, .. }
            | DecodeSpecNode::Block { type_name, .. }
            | DecodeSpecNode::BlockList { type_name, .. }
            | DecodeSpecNode::BlockObject { type_name, .. } => type_name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DecodeSpecNode::Attribute { .. } => "AttrSpec",
            DecodeSpecNode::MappingAttrs { .. } => "BlockAttrsSpec",
            DecodeSpecNode::Block { .. } => "BlockSpec",
            DecodeSpecNode::BlockList { .. } => "BlockListSpec",
            DecodeSpecNode::BlockObject { .. } => "BlockObjectSpec",
            DecodeSpecNode::SelfDefined { .. } => "SelfDefinedSpec",
        }
    }

    pub fn is_required(&self) -> bool {
        match self {
            DecodeSpecNode::Attribute { required, .. }
            | DecodeSpecNode::MappingAttrs { required, .. } => *required,
            _ => false,
        }
    }

    /// Visit this node and every node nested below it, depth-first.
    pub fn visit<F: FnMut(&DecodeSpecNode)>(&self, f: &mut F) {
        f(self);
        match self {
            DecodeSpecNode::Block { nested, .. } | DecodeSpecNode::BlockObject { nested, .. } => {
                visit_object(nested, f)
            }
            DecodeSpecNode::BlockList { nested, .. } => match nested {
                BlockListNested::Object(object) => visit_object(object, f),
                BlockListNested::Node(node) => node.visit(f),
            },
            _ => {}
        }
    }
}

fn visit_object<F: FnMut(&DecodeSpecNode)>(object: &ObjectSpec, f: &mut F) {
    for node in object.specs.iter().flat_map(|specs| specs.values()) {
        node.visit(f);
    }
}

/// Visit every node of a spec set, depth-first.
pub fn visit_specs<F: FnMut(&DecodeSpecNode)>(specs: &SpecSet, f: &mut F) {
    for node in specs.values() {
        node.visit(f);
    }
}
