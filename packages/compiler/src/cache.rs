//! Analysis Caches
//!
//! The file cache tracks current text and the changed set; one AST-node
//! cache per file kind owns the source units and runs the phase pipeline
//! incrementally: drop stale units, re-parse changed files, re-resolve
//! affected includes (widening the changed set), then name resolution and
//! type checking or schema validation, parent maps and position indexes,
//! and finally a diagnostic diff for publishing.

use std::collections::{HashMap, HashSet};

use crate::compiler::{file_kind_of, Compiler};
use crate::node::{build_parent_map, ParentMap, PositionIndex};
use crate::parse_util::ParseError;
use crate::resolve::include_resolver::IncludeResolver;
use crate::resolve::script_resolver::resolve_script;
use crate::schema::plugins::PluginRegistry;
use crate::schema::validator::{validate_config, ValidatorOptions};
use crate::types::checker::{check_script, ExternalSignatures};
use crate::unit::{FileKind, SourceUnit, Target};
use crate::script::ast::NodeId;
use crate::parse_util::{CompilePhase, ParseSourceSpan};

/// URI → current text plus the set of URIs changed since the last
/// analysis pass. Mutated by notification handlers in constant time.
#[derive(Debug, Default)]
pub struct FileCache {
    contents: HashMap<String, String>,
    open: HashSet<String>,
    changed: HashSet<String>,
}

impl FileCache {
    pub fn new() -> Self {
        FileCache::default()
    }

    pub fn did_open(&mut self, uri: &str, text: String) {
        self.contents.insert(uri.to_string(), text);
        self.open.insert(uri.to_string());
        self.changed.insert(uri.to_string());
    }

    pub fn did_change(&mut self, uri: &str, text: String) {
        self.contents.insert(uri.to_string(), text);
        self.changed.insert(uri.to_string());
    }

    pub fn did_close(&mut self, uri: &str) {
        self.open.remove(uri);
        self.changed.insert(uri.to_string());
    }

    /// A file appeared or changed on disk without being open.
    pub fn set_disk_contents(&mut self, uri: &str, text: Option<String>) {
        if self.open.contains(uri) {
            return;
        }
        match text {
            Some(text) => {
                self.contents.insert(uri.to_string(), text);
            }
            None => {
                self.contents.remove(uri);
            }
        }
        self.changed.insert(uri.to_string());
    }

    pub fn remove(&mut self, uri: &str) {
        self.contents.remove(uri);
        self.open.remove(uri);
        self.changed.insert(uri.to_string());
    }

    pub fn rename(&mut self, old_uri: &str, new_uri: &str) {
        if let Some(text) = self.contents.remove(old_uri) {
            self.contents.insert(new_uri.to_string(), text);
        }
        if self.open.remove(old_uri) {
            self.open.insert(new_uri.to_string());
        }
        self.changed.insert(old_uri.to_string());
        self.changed.insert(new_uri.to_string());
    }

    pub fn contents(&self, uri: &str) -> Option<&String> {
        self.contents.get(uri)
    }

    pub fn is_open(&self, uri: &str) -> bool {
        self.open.contains(uri)
    }

    pub fn uris(&self) -> impl Iterator<Item = &String> {
        self.contents.keys()
    }

    /// Drain the changed set for an analysis pass.
    pub fn take_changed(&mut self) -> HashSet<String> {
        std::mem::take(&mut self.changed)
    }

    /// Mark every known file changed, e.g. after a configuration switch.
    pub fn invalidate_all(&mut self) {
        let all: Vec<String> = self.contents.keys().cloned().collect();
        self.changed.extend(all);
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub type_checking: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions { type_checking: true }
    }
}

/// Per-file-kind cache of analyzed units with their parent maps,
/// position indexes and last-published diagnostics.
pub struct AstNodeCache {
    kind: FileKind,
    compiler: Compiler,
    units: HashMap<String, SourceUnit>,
    parents: HashMap<String, ParentMap>,
    indexes: HashMap<String, PositionIndex>,
    published: HashMap<String, Vec<ParseError>>,
}

impl AstNodeCache {
    pub fn new(kind: FileKind) -> Self {
        AstNodeCache {
            kind,
            compiler: Compiler::new(),
            units: HashMap::new(),
            parents: HashMap::new(),
            indexes: HashMap::new(),
            published: HashMap::new(),
        }
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Run the incremental pipeline for one change set. Returns the URIs
    /// whose diagnostics changed and need republishing.
    pub fn update(
        &mut self,
        changed: &HashSet<String>,
        files: &FileCache,
        registry: &PluginRegistry,
        options: &AnalysisOptions,
    ) -> HashSet<String> {
        let mut relevant: HashSet<String> = changed
            .iter()
            .filter(|uri| file_kind_of(uri) == Some(self.kind))
            .cloned()
            .collect();
        tracing::debug!(kind = ?self.kind, changed = relevant.len(), "analysis pass");

        // 1-2. Drop stale units; re-parse what still has contents.
        for uri in &relevant {
            self.units.remove(uri);
            self.parents.remove(uri);
            self.indexes.remove(uri);
            if let Some(text) = files.contents(uri) {
                let unit = self.compiler.compile(uri, text, self.kind);
                self.units.insert(uri.clone(), unit);
            }
        }

        // 3. Include resolution may widen the changed set with dependents.
        if self.kind == FileKind::Script {
            let widened = IncludeResolver::resolve(&mut self.units, &relevant);
            relevant.extend(widened);
        }
        relevant.retain(|uri| self.units.contains_key(uri));

        // 4. Name resolution plus type checking or schema validation.
        for uri in &relevant {
            let Some(mut unit) = self.units.remove(uri) else { continue };
            match self.kind {
                FileKind::Script => {
                    resolve_script(&mut unit);
                    let skip_types = unit.errors.has_errors_in(CompilePhase::Syntax)
                        || unit.errors.has_errors_in(CompilePhase::NameResolution);
                    if options.type_checking && !skip_types {
                        let external = self.external_signatures(&unit);
                        check_script(&mut unit, &external);
                    }
                }
                FileKind::Config => {
                    let validator_options =
                        ValidatorOptions { type_checking: options.type_checking };
                    validate_config(&mut unit, registry, &validator_options);
                }
            }
            self.units.insert(uri.clone(), unit);
        }

        // 5. Parent maps and position indexes for the changed units.
        for uri in &relevant {
            let Some(unit) = self.units.get(uri) else { continue };
            self.parents.insert(uri.clone(), build_parent_map(unit.root()));
            self.indexes
                .insert(uri.clone(), PositionIndex::build(unit.root()));
        }

        // 6. Diagnostic diff against the last published state.
        let mut republish = HashSet::new();
        for uri in changed
            .iter()
            .filter(|uri| file_kind_of(uri) == Some(self.kind))
            .chain(relevant.iter())
        {
            let current: Vec<ParseError> = self
                .units
                .get(uri)
                .map(|u| u.errors.all().to_vec())
                .unwrap_or_default();
            let previous = self.published.get(uri);
            if previous.map(|p| p != &current).unwrap_or(!current.is_empty()) {
                republish.insert(uri.clone());
            }
            if self.units.contains_key(uri) {
                self.published.insert(uri.clone(), current);
            } else {
                self.published.remove(uri);
            }
        }
        republish
    }

    /// Call shapes of the definitions this unit includes, keyed by the
    /// local names they are visible under.
    fn external_signatures(&self, unit: &SourceUnit) -> ExternalSignatures {
        let mut external = ExternalSignatures::default();
        for state in &unit.includes {
            let Some(target_uri) = &state.resolved_uri else { continue };
            let Some(target_unit) = self.units.get(target_uri) else { continue };
            for entry in &state.entries {
                let Some(definition) = &entry.definition else { continue };
                if let Some(signature) = target_unit.process_signatures.get(&definition.name) {
                    external
                        .processes
                        .insert(entry.local_name.clone(), signature.clone());
                }
                if let Some(signature) = target_unit.workflow_signatures.get(&definition.name)
                {
                    external
                        .workflows
                        .insert(entry.local_name.clone(), signature.clone());
                }
            }
        }
        external
    }

    pub fn unit(&self, uri: &str) -> Option<&SourceUnit> {
        self.units.get(uri)
    }

    pub fn units(&self) -> impl Iterator<Item = (&String, &SourceUnit)> {
        self.units.iter()
    }

    pub fn parent_map(&self, uri: &str) -> Option<&ParentMap> {
        self.parents.get(uri)
    }

    pub fn position_index(&self, uri: &str) -> Option<&PositionIndex> {
        self.indexes.get(uri)
    }

    pub fn diagnostics(&self, uri: &str) -> &[ParseError] {
        self.units
            .get(uri)
            .map(|u| u.errors.all())
            .unwrap_or(&[])
    }

    /// AST ancestors covering a position, innermost first.
    pub fn nodes_at(&self, uri: &str, line: usize, col: usize) -> Vec<NodeId> {
        self.indexes
            .get(uri)
            .map(|index| index.stack_at(line, col))
            .unwrap_or_default()
    }

    /// The resolved target of a node, if any phase recorded one.
    pub fn target_of(&self, uri: &str, node: NodeId) -> Option<Target> {
        self.units
            .get(uri)?
            .metadata
            .target(node)
            .cloned()
    }

    /// All nodes across the cache whose resolved target matches, with
    /// their spans. Includes the declaration itself when it lives in the
    /// cache.
    pub fn references(&self, target: &Target) -> Vec<(String, NodeId, ParseSourceSpan)> {
        let mut out = Vec::new();
        for (uri, unit) in &self.units {
            for (node, node_target) in unit.metadata.targets() {
                if node_target == target {
                    if let Some(span) =
                        self.indexes.get(uri).and_then(|index| index.span_of(*node))
                    {
                        out.push((uri.clone(), *node, span));
                    }
                }
            }
        }
        if let Target::Node { uri, node, span } = target {
            if self.units.contains_key(uri) {
                out.push((uri.clone(), *node, *span));
            }
        }
        out
    }
}
