//! Include Resolver
//!
//! Binds `include { .. } from '..'` declarations to the exported
//! definitions of other workspace units. Resolution state is cached per
//! unit; a pass re-resolves a unit's includes only when the including
//! file or a target file is in the changed set (or resolution never ran),
//! keeping the per-pass work proportional to the change.

use std::collections::{HashMap, HashSet};

use crate::parse_util::{CompilePhase, ParseError};
use crate::script::ast::{Declaration, IncludeDecl};
use crate::symbols::Definition;
use crate::unit::{IncludeState, IncludeTarget, SourceUnit, Target};

pub struct IncludeResolver;

impl IncludeResolver {
    /// Resolve includes across all script units. Returns the URIs whose
    /// include bindings were recomputed this pass, so the caller can widen
    /// its changed set for the downstream phases.
    pub fn resolve(
        units: &mut HashMap<String, SourceUnit>,
        changed: &HashSet<String>,
    ) -> HashSet<String> {
        // Snapshot the export surface first; the per-unit pass below needs
        // mutable access to one unit at a time.
        let known_uris: HashSet<String> = units.keys().cloned().collect();
        let mut exports: HashMap<String, Vec<Definition>> = HashMap::new();
        for (uri, unit) in units.iter() {
            exports.insert(uri.clone(), unit.definitions.clone());
        }

        let mut re_resolved = HashSet::new();
        for (uri, unit) in units.iter_mut() {
            if unit.script().is_none() {
                continue;
            }
            if !needs_resolution(unit, changed) {
                continue;
            }
            resolve_unit(unit, &known_uris, &exports);
            re_resolved.insert(uri.clone());
        }
        re_resolved
    }
}

fn needs_resolution(unit: &SourceUnit, changed: &HashSet<String>) -> bool {
    let include_decls = include_decls(unit);
    if include_decls.is_empty() && unit.includes.is_empty() {
        return false;
    }
    if changed.contains(&unit.uri) {
        return true;
    }
    if unit.includes.len() != include_decls.len() {
        return true;
    }
    unit.includes.iter().any(|state| {
        !state.resolved
            || state
                .resolved_uri
                .as_ref()
                .map(|target| changed.contains(target))
                .unwrap_or(false)
    })
}

fn include_decls(unit: &SourceUnit) -> Vec<&IncludeDecl> {
    match unit.script() {
        Some(module) => module
            .declarations
            .iter()
            .filter_map(|d| match d {
                Declaration::Include(include) => Some(include),
                _ => None,
            })
            .collect(),
        None => Vec::new(),
    }
}

fn resolve_unit(
    unit: &mut SourceUnit,
    known_uris: &HashSet<String>,
    exports: &HashMap<String, Vec<Definition>>,
) {
    unit.errors.clear_phase(CompilePhase::IncludeResolution);

    let decls: Vec<IncludeDecl> = include_decls(unit).into_iter().cloned().collect();
    let mut states = Vec::new();
    let mut errors = Vec::new();
    let mut bound: HashMap<String, crate::parse_util::ParseSourceSpan> = HashMap::new();
    let mut targets = Vec::new();

    for decl in &decls {
        let resolved_uri = resolve_source(&unit.uri, &decl.source, known_uris);
        let mut entries = Vec::new();

        match &resolved_uri {
            None => {
                errors.push(ParseError::new(
                    decl.source_span,
                    format!("Unable to resolve include '{}'", decl.source),
                    CompilePhase::IncludeResolution,
                ));
            }
            Some(target_uri) => {
                let definitions = exports.get(target_uri).map(|d| d.as_slice()).unwrap_or(&[]);
                for entry in &decl.entries {
                    let matches: Vec<&Definition> = definitions
                        .iter()
                        .filter(|d| d.name == entry.name)
                        .collect();
                    let definition = match matches.len() {
                        0 => {
                            errors.push(ParseError::new(
                                entry.span,
                                format!(
                                    "'{}' is not defined in module '{}'",
                                    entry.name, decl.source
                                ),
                                CompilePhase::IncludeResolution,
                            ));
                            None
                        }
                        1 => Some(matches[0].clone()),
                        _ => {
                            errors.push(ParseError::new(
                                entry.span,
                                format!(
                                    "'{}' is defined more than once in module '{}'",
                                    entry.name, decl.source
                                ),
                                CompilePhase::IncludeResolution,
                            ));
                            Some(matches[0].clone())
                        }
                    };

                    let local_name = entry.local_name().to_string();
                    if let Some(first) = bound.get(&local_name) {
                        errors.push(
                            ParseError::new(
                                entry.span,
                                format!("'{}' is included more than once", local_name),
                                CompilePhase::IncludeResolution,
                            )
                            .with_related(crate::parse_util::RelatedInformation {
                                uri: unit.uri.clone(),
                                span: *first,
                                message: "first included here".to_string(),
                            }),
                        );
                    } else {
                        bound.insert(local_name.clone(), entry.span);
                    }

                    if let Some(definition) = &definition {
                        targets.push((
                            entry.id,
                            Target::Node {
                                uri: definition.uri.clone(),
                                node: definition.node,
                                span: definition.name_span,
                            },
                        ));
                    }
                    entries.push(IncludeTarget {
                        entry: entry.id,
                        name: entry.name.clone(),
                        local_name,
                        definition,
                    });
                }
            }
        }

        states.push(IncludeState {
            decl: decl.id,
            source: decl.source.clone(),
            resolved_uri,
            entries,
            resolved: true,
        });
    }

    unit.includes = states;
    unit.errors.extend(errors);
    for (node, target) in targets {
        unit.metadata.set_target(node, target);
    }
}

/// Resolve an include source relative to the including file. Tries the
/// literal path, then with a `.nf` suffix, then as a module directory
/// with a `main.nf` entry script.
pub fn resolve_source(
    including: &str,
    source: &str,
    known_uris: &HashSet<String>,
) -> Option<String> {
    if source.is_empty() {
        return None;
    }
    let base = joined(including, source);
    let candidates = [
        base.clone(),
        format!("{}.nf", base),
        format!("{}/main.nf", base),
    ];
    candidates.into_iter().find(|c| known_uris.contains(c))
}

/// Join a relative path onto the directory of `including`, folding `.`
/// and `..` segments. The scheme and authority of `file://` style URIs
/// pass through untouched.
fn joined(including: &str, source: &str) -> String {
    let (prefix, path) = match including.find("://") {
        Some(i) => {
            let after = i + 3;
            let slash = including[after..]
                .find('/')
                .map(|j| after + j)
                .unwrap_or(including.len());
            (&including[..slash], &including[slash..])
        }
        None => ("", including),
    };
    let absolute = path.starts_with('/');
    let dir_end = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let mut segments: Vec<&str> = path[..dir_end].split('/').filter(|s| !s.is_empty()).collect();
    for segment in source.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let mut joined_path = segments.join("/");
    if absolute {
        joined_path.insert(0, '/');
    }
    format!("{}{}", prefix, joined_path)
}
