//! Find-references via same-target scanning across the cache.

use std::collections::HashSet;

use tower_lsp::lsp_types::{Location, Url};

use super::to_range;
use crate::state::AnalysisState;

pub fn references(state: &AnalysisState, uri: &str, line: usize, col: usize) -> Vec<Location> {
    let Some(cache) = state.cache_for(uri) else {
        return Vec::new();
    };
    let Some(unit) = cache.unit(uri) else {
        return Vec::new();
    };

    for node in cache.nodes_at(uri, line, col) {
        let Some(target) = unit.metadata.target(node) else { continue };
        let mut seen = HashSet::new();
        let mut locations = Vec::new();
        for (ref_uri, _, span) in cache.references(target) {
            if !seen.insert((ref_uri.clone(), span)) {
                continue;
            }
            if let Ok(url) = Url::parse(&ref_uri) {
                locations.push(Location { uri: url, range: to_range(span) });
            }
        }
        locations.sort_by_key(|l| (l.uri.to_string(), l.range.start.line, l.range.start.character));
        return locations;
    }
    Vec::new()
}
