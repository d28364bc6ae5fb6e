//! Document links for script includes and config includes.

use std::collections::HashSet;

use nextflow_compiler::config::ast::ConfigStatement;
use nextflow_compiler::resolve::include_resolver::resolve_source;
use nextflow_compiler::script::ast::Expression;
use tower_lsp::lsp_types::{DocumentLink, Url};

use super::to_range;
use crate::state::AnalysisState;

pub fn document_links(state: &AnalysisState, uri: &str) -> Vec<DocumentLink> {
    let Some(cache) = state.cache_for(uri) else {
        return Vec::new();
    };
    let Some(unit) = cache.unit(uri) else {
        return Vec::new();
    };
    let known: HashSet<String> = state.files.uris().cloned().collect();
    let mut links = Vec::new();

    if let Some(module) = unit.script() {
        for declaration in &module.declarations {
            let nextflow_compiler::script::ast::Declaration::Include(include) = declaration
            else {
                continue;
            };
            let Some(target) = resolve_source(uri, &include.source, &known) else {
                continue;
            };
            let Ok(target) = Url::parse(&target) else { continue };
            links.push(DocumentLink {
                range: to_range(include.source_span),
                target: Some(target),
                tooltip: None,
                data: None,
            });
        }
    }

    if let Some(config) = unit.config() {
        collect_config_links(uri, &config.statements, &known, &mut links);
    }
    links
}

fn collect_config_links(
    uri: &str,
    statements: &[ConfigStatement],
    known: &HashSet<String>,
    links: &mut Vec<DocumentLink>,
) {
    for statement in statements {
        match statement {
            ConfigStatement::Include(include) => {
                let Expression::Str(source) = include.source.unwrapped() else {
                    continue;
                };
                let Some(target) = resolve_source(uri, &source.value, known) else {
                    continue;
                };
                let Ok(target) = Url::parse(&target) else { continue };
                links.push(DocumentLink {
                    range: to_range(source.span),
                    target: Some(target),
                    tooltip: None,
                    data: None,
                });
            }
            ConfigStatement::Block(block) => {
                collect_config_links(uri, &block.statements, known, links);
            }
            _ => {}
        }
    }
}
