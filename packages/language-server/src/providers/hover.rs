//! Hover: built-in member documentation, definition signatures, inferred
//! types.

use nextflow_compiler::symbols::DefinitionKind;
use nextflow_compiler::types::dsl;
use nextflow_compiler::unit::Target;
use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind};

use crate::state::AnalysisState;

pub fn hover(state: &AnalysisState, uri: &str, line: usize, col: usize) -> Option<Hover> {
    let cache = state.cache_for(uri)?;
    let unit = cache.unit(uri)?;
    let stack = cache.nodes_at(uri, line, col);

    for node in &stack {
        match unit.metadata.target(*node) {
            Some(Target::Builtin { scope, member }) => {
                let member = dsl::builtin_member(scope, member)?;
                let mut value = format!("```\n{}\n```", member.signature());
                if !member.doc.is_empty() {
                    value.push_str("\n\n");
                    value.push_str(member.doc);
                }
                if let Some(note) = member.deprecated {
                    value.push_str(&format!("\n\n*Deprecated: {}*", note));
                }
                return Some(markdown(value));
            }
            Some(Target::Node { uri: def_uri, node: def_node, .. }) => {
                let def_unit = cache.unit(def_uri)?;
                if let Some(definition) =
                    def_unit.definitions.iter().find(|d| d.node == *def_node)
                {
                    let header = match definition.kind {
                        DefinitionKind::Process => format!("process {}", definition.name),
                        DefinitionKind::Workflow => format!("workflow {}", definition.name),
                        DefinitionKind::Function => format!("def {}(...)", definition.name),
                    };
                    return Some(markdown(format!("```\n{}\n```", header)));
                }
                // A plain variable: show its inferred type when known.
                if let Some(ty) = def_unit.metadata.variable_type(*def_node) {
                    return Some(markdown(format!("```\n{}\n```", ty)));
                }
            }
            None => {}
        }
    }

    // Fall back to the innermost expression with an inferred type.
    for node in &stack {
        if unit.metadata.has_type(*node) {
            let ty = unit.metadata.get_type(*node);
            if !ty.is_dynamic() {
                return Some(markdown(format!("```\n{}\n```", ty)));
            }
        }
    }
    None
}

fn markdown(value: String) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        }),
        range: None,
    }
}
