//! Formatting: whole-document replacement with the canonical printer.

use nextflow_compiler::script::formatter::{FormatOptions, Formatter};
use tower_lsp::lsp_types::{Position, Range, TextEdit};

use crate::state::AnalysisState;

pub fn format(state: &AnalysisState, uri: &str) -> Vec<TextEdit> {
    let Some(cache) = state.cache_for(uri) else {
        return Vec::new();
    };
    let Some(unit) = cache.unit(uri) else {
        return Vec::new();
    };
    // Never reformat a file that does not parse cleanly.
    if unit
        .errors
        .has_errors_in(nextflow_compiler::CompilePhase::Syntax)
    {
        return Vec::new();
    }
    let Some(text) = state.files.contents(uri) else {
        return Vec::new();
    };

    let options = FormatOptions {
        harshil_alignment: state.settings.formatting.harshil_alignment,
        mahesh_form: state.settings.formatting.mahesh_form,
    };
    let formatted = if let Some(module) = unit.script() {
        Formatter::new(options).format_script(module)
    } else if let Some(config) = unit.config() {
        Formatter::new(options).format_config(config)
    } else {
        return Vec::new();
    };

    if formatted == *text {
        return Vec::new();
    }

    let end_line = text.lines().count() as u32;
    vec![TextEdit {
        range: Range {
            start: Position { line: 0, character: 0 },
            end: Position { line: end_line, character: 0 },
        },
        new_text: formatted,
    }]
}
