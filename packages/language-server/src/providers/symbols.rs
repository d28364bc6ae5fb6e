//! Document and workspace symbols.

use nextflow_compiler::config::ast::{ConfigStatement};
use nextflow_compiler::symbols::DefinitionKind;
use tower_lsp::lsp_types::{
    DocumentSymbol, Location, SymbolInformation, SymbolKind, Url,
};

use super::to_range;
use crate::state::AnalysisState;

fn definition_kind(kind: DefinitionKind) -> SymbolKind {
    match kind {
        DefinitionKind::Process => SymbolKind::FUNCTION,
        DefinitionKind::Workflow => SymbolKind::NAMESPACE,
        DefinitionKind::Function => SymbolKind::FUNCTION,
    }
}

pub fn document_symbols(state: &AnalysisState, uri: &str) -> Vec<DocumentSymbol> {
    let Some(cache) = state.cache_for(uri) else {
        return Vec::new();
    };
    let Some(unit) = cache.unit(uri) else {
        return Vec::new();
    };

    if let Some(config) = unit.config() {
        return config
            .statements
            .iter()
            .filter_map(|statement| match statement {
                ConfigStatement::Block(block) => {
                    #[allow(deprecated)]
                    let symbol = DocumentSymbol {
                        name: block.name(),
                        detail: None,
                        kind: SymbolKind::NAMESPACE,
                        tags: None,
                        deprecated: None,
                        range: to_range(block.span),
                        selection_range: to_range(block.name_span),
                        children: None,
                    };
                    Some(symbol)
                }
                ConfigStatement::Assign(assign) => {
                    #[allow(deprecated)]
                    let symbol = DocumentSymbol {
                        name: assign.names.join("."),
                        detail: None,
                        kind: SymbolKind::PROPERTY,
                        tags: None,
                        deprecated: None,
                        range: to_range(assign.span),
                        selection_range: to_range(assign.name_span),
                        children: None,
                    };
                    Some(symbol)
                }
                _ => None,
            })
            .collect();
    }

    unit.definitions
        .iter()
        .map(|definition| {
            #[allow(deprecated)]
            let symbol = DocumentSymbol {
                name: definition.name.clone(),
                detail: Some(definition.kind.describe().to_string()),
                kind: definition_kind(definition.kind),
                tags: None,
                deprecated: None,
                range: to_range(definition.span),
                selection_range: to_range(definition.name_span),
                children: None,
            };
            symbol
        })
        .collect()
}

/// Case-insensitive containment match over every script definition in
/// the workspace.
pub fn workspace_symbols(state: &AnalysisState, query: &str) -> Vec<SymbolInformation> {
    let query = query.to_lowercase();
    let mut out = Vec::new();
    for (uri, unit) in state.scripts.units() {
        for definition in &unit.definitions {
            if !query.is_empty() && !definition.name.to_lowercase().contains(&query) {
                continue;
            }
            let Ok(url) = Url::parse(uri) else { continue };
            #[allow(deprecated)]
            out.push(SymbolInformation {
                name: definition.name.clone(),
                kind: definition_kind(definition.kind),
                tags: None,
                deprecated: None,
                location: Location { uri: url, range: to_range(definition.name_span) },
                container_name: None,
            });
        }
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}
