//! Go-to-definition via resolved node targets.

use nextflow_compiler::unit::Target;
use tower_lsp::lsp_types::{Location, Url};

use super::to_range;
use crate::state::AnalysisState;

pub fn definition(state: &AnalysisState, uri: &str, line: usize, col: usize) -> Option<Location> {
    let cache = state.cache_for(uri)?;
    let unit = cache.unit(uri)?;
    for node in cache.nodes_at(uri, line, col) {
        if let Some(Target::Node { uri: def_uri, span, .. }) = unit.metadata.target(node) {
            let url = Url::parse(def_uri).ok()?;
            return Some(Location { uri: url, range: to_range(*span) });
        }
    }
    None
}
