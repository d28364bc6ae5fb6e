//! Config Schema Definitions
//!
//! The settings tree validated against configuration files: option leaves
//! with accepted types, nested scopes, and placeholder scopes for
//! indexable axes. The built-in tree ships as `spec/definitions.json`;
//! plugin schemas use the same document shape and are merged per source
//! unit.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::Result;

/// Raw JSON document node: `{type, spec}` discriminated records.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    #[serde(rename = "type")]
    pub node_type: String,
    pub spec: RawSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub children: Vec<RawNode>,
    #[serde(rename = "type", default)]
    pub value_type: Option<ValueTypes>,
    #[serde(rename = "placeholderName", default)]
    pub placeholder_name: Option<String>,
    #[serde(default)]
    pub scope: Vec<RawNode>,
}

/// An option's accepted type set, written as one name or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ValueTypes {
    One(String),
    Many(Vec<String>),
}

impl ValueTypes {
    pub fn names(&self) -> Vec<String> {
        match self {
            ValueTypes::One(name) => vec![name.clone()],
            ValueTypes::Many(names) => names.clone(),
        }
    }
}

/// Resolved schema node.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    Option {
        description: String,
        /// Accepted canonical type names.
        types: Vec<String>,
    },
    Scope {
        description: String,
        children: IndexMap<String, SchemaNode>,
    },
    /// One indexable axis whose children share a subtree, e.g. named
    /// worker pools.
    Placeholder {
        description: String,
        placeholder_name: String,
        scope: IndexMap<String, SchemaNode>,
    },
}

impl SchemaNode {
    pub fn description(&self) -> &str {
        match self {
            SchemaNode::Option { description, .. } => description,
            SchemaNode::Scope { description, .. } => description,
            SchemaNode::Placeholder { description, .. } => description,
        }
    }

    pub fn children(&self) -> Option<&IndexMap<String, SchemaNode>> {
        match self {
            SchemaNode::Scope { children, .. } => Some(children),
            _ => None,
        }
    }
}

fn convert(raw: &RawNode) -> Option<(String, SchemaNode)> {
    let name = raw.spec.name.clone();
    let node = match raw.node_type.as_str() {
        "ConfigOption" => SchemaNode::Option {
            description: raw.spec.description.clone(),
            types: raw
                .spec
                .value_type
                .as_ref()
                .map(|t| t.names())
                .unwrap_or_default(),
        },
        "ConfigScope" => SchemaNode::Scope {
            description: raw.spec.description.clone(),
            children: raw.spec.children.iter().filter_map(convert).collect(),
        },
        "ConfigPlaceholderScope" => SchemaNode::Placeholder {
            description: raw.spec.description.clone(),
            placeholder_name: raw
                .spec
                .placeholder_name
                .clone()
                .unwrap_or_else(|| "name".to_string()),
            scope: raw.spec.scope.iter().filter_map(convert).collect(),
        },
        _ => return None,
    };
    Some((name, node))
}

/// Parse a schema document into its top-level entries.
pub fn parse_document(text: &str) -> Result<IndexMap<String, SchemaNode>> {
    let raw: Vec<RawNode> = serde_json::from_str(text)?;
    Ok(raw.iter().filter_map(convert).collect())
}

const BUILTIN_DEFINITIONS: &str = include_str!("../../spec/definitions.json");

static BUILTIN_ROOT: Lazy<IndexMap<String, SchemaNode>> = Lazy::new(|| {
    parse_document(BUILTIN_DEFINITIONS).expect("packaged schema definitions parse")
});

/// The built-in root scope entries.
pub fn builtin_root() -> &'static IndexMap<String, SchemaNode> {
    &BUILTIN_ROOT
}

/// Assemble a root scope: built-ins plus plugin-contributed entries.
pub fn root_with(extra: Vec<(String, SchemaNode)>) -> IndexMap<String, SchemaNode> {
    let mut root = builtin_root().clone();
    for (name, node) in extra {
        root.insert(name, node);
    }
    root
}

/// Look up a dotted path in a root scope, descending through scopes and
/// placeholder axes.
pub fn lookup<'a>(
    root: &'a IndexMap<String, SchemaNode>,
    path: &[String],
) -> Option<&'a SchemaNode> {
    let mut children = root;
    let mut index = 0;
    while index < path.len() {
        let node = children.get(&path[index])?;
        index += 1;
        if index == path.len() {
            return Some(node);
        }
        match node {
            SchemaNode::Scope { children: next, .. } => children = next,
            SchemaNode::Placeholder { scope, .. } => {
                // The next segment names the axis instance.
                index += 1;
                if index == path.len() {
                    return Some(node);
                }
                children = scope;
            }
            SchemaNode::Option { .. } => return None,
        }
    }
    None
}
