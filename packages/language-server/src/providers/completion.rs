//! Completion
//!
//! Scripts complete scope names, module definitions and DSL members
//! after a dot; configs complete schema paths from the ambient block
//! context.

use nextflow_compiler::schema::definitions::{self, SchemaNode};
use nextflow_compiler::types::dsl;
use nextflow_compiler::types::ty::Type;
use nextflow_compiler::unit::FileKind;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, Documentation, MarkupContent, MarkupKind,
};

use crate::state::AnalysisState;

const SCRIPT_KEYWORDS: &[&str] = &[
    "include", "process", "workflow", "output", "def", "if", "else", "return", "try",
    "catch", "true", "false", "null",
];

pub fn completion(state: &AnalysisState, uri: &str, line: usize, col: usize) -> Vec<CompletionItem> {
    let Some(text) = state.files.contents(uri) else {
        return Vec::new();
    };
    let line_text = text.lines().nth(line).unwrap_or("");
    let prefix = &line_text[..col.min(line_text.len())];

    match nextflow_compiler::file_kind_of(uri) {
        Some(FileKind::Script) => script_completion(state, uri, line, prefix),
        Some(FileKind::Config) => config_completion(state, prefix),
        None => Vec::new(),
    }
}

/// The dotted word ending at the cursor, e.g. `Channel.` or `process.cp`.
fn dotted_prefix(prefix: &str) -> &str {
    let start = prefix
        .rfind(|c: char| !c.is_alphanumeric() && c != '_' && c != '.')
        .map(|i| i + 1)
        .unwrap_or(0);
    &prefix[start..]
}

fn member_item(member: &dsl::ClassMember) -> CompletionItem {
    let kind = match member.kind {
        dsl::MemberKind::Method => CompletionItemKind::FUNCTION,
        dsl::MemberKind::Constant => CompletionItemKind::CONSTANT,
        dsl::MemberKind::Namespace => CompletionItemKind::MODULE,
    };
    CompletionItem {
        label: member.name.to_string(),
        kind: Some(kind),
        detail: Some(member.signature()),
        documentation: Some(Documentation::MarkupContent(MarkupContent {
            kind: MarkupKind::Markdown,
            value: member.doc.to_string(),
        })),
        ..CompletionItem::default()
    }
}

fn script_completion(
    state: &AnalysisState,
    uri: &str,
    line: usize,
    prefix: &str,
) -> Vec<CompletionItem> {
    let word = dotted_prefix(prefix);

    // Member completion after a dot.
    if let Some((receiver, _partial)) = word.rsplit_once('.') {
        if let Some(scope) = dsl::namespace(receiver) {
            return scope.members.iter().map(member_item).collect();
        }
        // Receiver type from the analysis cache, when it was inferred.
        if let Some(cache) = state.cache_for(uri) {
            let receiver_col = prefix.len().saturating_sub(word.len())
                + receiver.len().saturating_sub(1);
            let stack = cache.nodes_at(uri, line, receiver_col);
            if let Some(unit) = cache.unit(uri) {
                for node in stack {
                    if !unit.metadata.has_type(node) {
                        continue;
                    }
                    if let Type::Named { name, .. } = unit.metadata.get_type(node) {
                        return dsl::members_of(name).iter().map(member_item).collect();
                    }
                }
            }
        }
        return Vec::new();
    }

    // Plain name position: definitions, includes, globals, keywords.
    let mut items: Vec<CompletionItem> = Vec::new();
    if let Some(cache) = state.cache_for(uri) {
        if let Some(unit) = cache.unit(uri) {
            for definition in &unit.definitions {
                items.push(CompletionItem {
                    label: definition.name.clone(),
                    kind: Some(CompletionItemKind::FUNCTION),
                    detail: Some(definition.kind.describe().to_string()),
                    ..CompletionItem::default()
                });
            }
            for include in &unit.includes {
                for entry in &include.entries {
                    items.push(CompletionItem {
                        label: entry.local_name.clone(),
                        kind: Some(CompletionItemKind::FUNCTION),
                        detail: Some(format!("included from '{}'", include.source)),
                        ..CompletionItem::default()
                    });
                }
            }
        }
    }
    items.extend(dsl::global_scope().members.iter().map(member_item));
    for keyword in SCRIPT_KEYWORDS {
        items.push(CompletionItem {
            label: keyword.to_string(),
            kind: Some(CompletionItemKind::KEYWORD),
            ..CompletionItem::default()
        });
    }
    items
}

fn schema_item(name: &str, node: &SchemaNode) -> CompletionItem {
    let kind = match node {
        SchemaNode::Option { .. } => CompletionItemKind::PROPERTY,
        _ => CompletionItemKind::MODULE,
    };
    CompletionItem {
        label: name.to_string(),
        kind: Some(kind),
        documentation: Some(Documentation::MarkupContent(MarkupContent {
            kind: MarkupKind::Markdown,
            value: node.description().to_string(),
        })),
        ..CompletionItem::default()
    }
}

fn config_completion(_state: &AnalysisState, prefix: &str) -> Vec<CompletionItem> {
    let word = dotted_prefix(prefix);
    let root = definitions::builtin_root();

    let segments: Vec<String> = word
        .split('.')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    let complete_path = word.ends_with('.');

    // Walk the known segments; complete the children of the last scope.
    let lookup_path: &[String] = if complete_path {
        &segments
    } else if segments.len() > 1 {
        &segments[..segments.len() - 1]
    } else {
        &[]
    };

    if lookup_path.is_empty() {
        return root.iter().map(|(name, node)| schema_item(name, node)).collect();
    }
    match definitions::lookup(root, lookup_path) {
        Some(SchemaNode::Scope { children, .. }) => {
            children.iter().map(|(name, node)| schema_item(name, node)).collect()
        }
        Some(SchemaNode::Placeholder { scope, .. }) => {
            scope.iter().map(|(name, node)| schema_item(name, node)).collect()
        }
        _ => Vec::new(),
    }
}
