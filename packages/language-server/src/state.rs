//! Analysis State
//!
//! Everything the language server knows about the workspace, guarded by
//! one mutex: the file cache, one AST-node cache per file kind, the
//! plugin-spec registry and the active settings. Notification handlers
//! mutate the file cache in constant time; the debounced analysis task
//! runs the phase pipeline and returns what to publish.

use std::collections::HashSet;

use nextflow_compiler::cache::{AnalysisOptions, AstNodeCache, FileCache};
use nextflow_compiler::parse_util::ParseError;
use nextflow_compiler::schema::plugins::PluginRegistry;
use nextflow_compiler::unit::FileKind;

use crate::configuration::Settings;

pub struct AnalysisState {
    pub files: FileCache,
    pub scripts: AstNodeCache,
    pub configs: AstNodeCache,
    pub registry: PluginRegistry,
    pub settings: Settings,
    /// Bumped on every edit; providers snapshot it as a cancellation
    /// check.
    pub edit_generation: u64,
}

impl AnalysisState {
    pub fn new() -> Self {
        AnalysisState {
            files: FileCache::new(),
            scripts: AstNodeCache::new(FileKind::Script),
            configs: AstNodeCache::new(FileKind::Config),
            registry: PluginRegistry::new(),
            settings: Settings::default(),
            edit_generation: 0,
        }
    }

    pub fn cache_for(&self, uri: &str) -> Option<&AstNodeCache> {
        match nextflow_compiler::file_kind_of(uri)? {
            FileKind::Script => Some(&self.scripts),
            FileKind::Config => Some(&self.configs),
        }
    }

    /// Run one analysis pass over the pending change set. Returns each
    /// URI whose diagnostics need republishing, with its current
    /// diagnostic list (empty to clear).
    pub fn analyze(&mut self) -> Vec<(String, Vec<ParseError>)> {
        let changed = self.files.take_changed();
        if changed.is_empty() {
            return Vec::new();
        }
        let options = AnalysisOptions { type_checking: self.settings.type_checking };

        let mut republish: HashSet<String> = HashSet::new();
        republish.extend(self.scripts.update(&changed, &self.files, &self.registry, &options));
        republish.extend(self.configs.update(&changed, &self.files, &self.registry, &options));

        let mut out: Vec<(String, Vec<ParseError>)> = republish
            .into_iter()
            .map(|uri| {
                let diagnostics = self
                    .cache_for(&uri)
                    .map(|cache| cache.diagnostics(&uri).to_vec())
                    .unwrap_or_default();
                (uri, diagnostics)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Apply one LSP content change. `range` is `(start_line, start_col,
    /// end_line, end_col)`; `None` replaces the whole document.
    pub fn apply_change(
        &mut self,
        uri: &str,
        range: Option<(usize, usize, usize, usize)>,
        text: &str,
    ) {
        let updated = match range {
            None => text.to_string(),
            Some((start_line, start_col, end_line, end_col)) => {
                let current = self
                    .files
                    .contents(uri)
                    .cloned()
                    .unwrap_or_default();
                let file = nextflow_compiler::SourceFile::new(current.clone(), uri.to_string());
                let start = file.offset_at(start_line, start_col);
                let end = file.offset_at(end_line, end_col).max(start);
                let mut updated = String::with_capacity(current.len() + text.len());
                updated.push_str(&current[..start]);
                updated.push_str(text);
                updated.push_str(&current[end..]);
                updated
            }
        };
        self.files.did_change(uri, updated);
        self.edit_generation += 1;
    }
}

impl Default for AnalysisState {
    fn default() -> Self {
        AnalysisState::new()
    }
}
