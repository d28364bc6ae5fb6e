//! Compiler Driver
//!
//! Thin façade turning one source text into a populated source unit:
//! parse, collect syntax errors, extract definitions and call signatures.
//! No cross-file state; include resolution and the later phases run in
//! the caches.

use std::collections::HashMap;

use crate::config::parser::ConfigParser;
use crate::parse_util::SourceFile;
use crate::script::ast::Declaration;
use crate::script::parser::Parser;
use crate::symbols;
use crate::unit::{FileKind, SourceUnit, UnitAst};

/// Classify a URI by file suffix. `nf-test.config` files belong to the
/// test harness and are never analyzed.
pub fn file_kind_of(uri: &str) -> Option<FileKind> {
    if uri.ends_with(".nf") {
        return Some(FileKind::Script);
    }
    if uri.ends_with(".config") && !uri.ends_with("nf-test.config") {
        return Some(FileKind::Config);
    }
    None
}

pub struct Compiler;

impl Compiler {
    pub fn new() -> Self {
        Compiler
    }

    /// Parse one source into a unit. Always returns a unit; on syntax
    /// failure the AST is partial and the errors carry the details.
    pub fn compile(&self, uri: &str, text: &str, kind: FileKind) -> SourceUnit {
        match kind {
            FileKind::Script => self.compile_script(uri, text),
            FileKind::Config => self.compile_config(uri, text),
        }
    }

    fn compile_script(&self, uri: &str, text: &str) -> SourceUnit {
        let result = Parser::new().parse(text);
        let definitions = symbols::definitions(uri, &result.module);

        let mut process_signatures = HashMap::new();
        let mut workflow_signatures = HashMap::new();
        for declaration in &result.module.declarations {
            match declaration {
                Declaration::Process(process) => {
                    let signature = symbols::process_signature(process);
                    process_signatures.insert(process.name.clone(), signature);
                }
                Declaration::Workflow(workflow) => {
                    if let Some(name) = &workflow.name {
                        workflow_signatures
                            .insert(name.clone(), symbols::workflow_signature(workflow));
                    }
                }
                _ => {}
            }
        }

        let mut unit = SourceUnit {
            uri: uri.to_string(),
            file: SourceFile::new(text.to_string(), uri.to_string()),
            kind: FileKind::Script,
            ast: UnitAst::Script(result.module),
            errors: Default::default(),
            metadata: Default::default(),
            node_count: result.node_count,
            includes: Vec::new(),
            definitions,
            process_signatures,
            workflow_signatures,
        };
        unit.errors.extend(result.errors);
        unit
    }

    fn compile_config(&self, uri: &str, text: &str) -> SourceUnit {
        let result = ConfigParser::new().parse(text);
        let mut unit = SourceUnit {
            uri: uri.to_string(),
            file: SourceFile::new(text.to_string(), uri.to_string()),
            kind: FileKind::Config,
            ast: UnitAst::Config(result.module),
            errors: Default::default(),
            metadata: Default::default(),
            node_count: result.node_count,
            includes: Vec::new(),
            definitions: Vec::new(),
            process_signatures: HashMap::new(),
            workflow_signatures: HashMap::new(),
        };
        unit.errors.extend(result.errors);
        unit
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}
