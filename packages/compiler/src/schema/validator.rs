//! Config Schema Validation
//!
//! Resolves every assignment's dotted path against the active schema
//! (built-ins plus plugin scopes for the unit's `plugins` block) and
//! checks value types when type checking is enabled. Profile scopes are
//! schema-transparent; `env.` and `params.` bypass the schema entirely.
//! Unknown options are warnings, never fatal.

use crate::parse_util::{CompilePhase, ParseError};
use crate::config::ast::*;
use crate::script::ast::{ConstantValue, Expression, Statement, StringTokenKind};
use crate::unit::SourceUnit;

use super::definitions::{self, SchemaNode};
use super::plugins::PluginRegistry;

pub struct ValidatorOptions {
    pub type_checking: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        ValidatorOptions { type_checking: true }
    }
}

/// Validate a config unit, replacing previous name-resolution and
/// type-checking diagnostics.
pub fn validate_config(
    unit: &mut SourceUnit,
    registry: &PluginRegistry,
    options: &ValidatorOptions,
) {
    unit.errors.clear_phase(CompilePhase::NameResolution);
    unit.errors.clear_phase(CompilePhase::TypeChecking);

    let errors = {
        let Some(module) = unit.config() else { return };
        let plugin_scopes = plugin_scopes(module, registry);
        let root = definitions::root_with(plugin_scopes);
        let mut validator = Validator {
            root,
            options,
            errors: Vec::new(),
            path: Vec::new(),
            profile_depth: 0,
        };
        for statement in &module.statements {
            validator.visit_statement(statement, true);
        }
        validator.errors
    };
    unit.errors.extend(errors);
}

/// Scopes contributed by the plugins named in the unit's `plugins` block.
fn plugin_scopes(module: &ConfigModule, registry: &PluginRegistry) -> Vec<(String, SchemaNode)> {
    let mut scopes = Vec::new();
    for statement in &module.statements {
        let ConfigStatement::Apply(apply) = statement else { continue };
        if apply.name != "plugins" {
            continue;
        }
        for item in &apply.statements {
            let Statement::Expr(stmt) = item else { continue };
            let Expression::MethodCall(call) = stmt.expression.unwrapped() else {
                continue;
            };
            if call.name != "id" {
                continue;
            }
            if let Some(Expression::Str(reference)) = call.args.first().map(|a| a.unwrapped()) {
                if let Some(spec) = registry.find(&reference.value) {
                    scopes.extend(spec.scopes.iter().cloned());
                }
            }
        }
    }
    scopes
}

struct Validator<'a> {
    root: indexmap::IndexMap<String, SchemaNode>,
    options: &'a ValidatorOptions,
    errors: Vec<ParseError>,
    /// Ambient scope segments from enclosing named blocks.
    path: Vec<String>,
    /// Depth of enclosing `profiles` blocks; the first two segments under
    /// one are schema-transparent.
    profile_depth: u32,
}

impl<'a> Validator<'a> {
    fn visit_statement(&mut self, statement: &ConfigStatement, top_level: bool) {
        match statement {
            ConfigStatement::Assign(assign) => self.visit_assign(assign),
            ConfigStatement::Block(block) => self.visit_block(block),
            ConfigStatement::Include(include) => {
                // Includes are legal at top level or directly inside a
                // profile definition.
                let inside_profile = self.profile_depth > 0 && self.path.is_empty();
                if !top_level && !inside_profile {
                    self.errors.push(ParseError::new(
                        include.span,
                        "Config includes are only allowed at the top level or inside a profile",
                        CompilePhase::NameResolution,
                    ));
                }
            }
            ConfigStatement::Apply(_) => {}
            ConfigStatement::Incomplete(_) => {}
        }
    }

    fn visit_block(&mut self, block: &ConfigBlock) {
        match &block.kind {
            ConfigBlockKind::Selector { kind, target } => {
                // `withLabel:` / `withName:` refine the process scope and
                // keep the ambient path.
                if kind != "withLabel" && kind != "withName" {
                    self.errors.push(ParseError::warning(
                        block.name_span,
                        format!("Unrecognized selector '{}:{}'", kind, target),
                        CompilePhase::NameResolution,
                    ));
                }
                for statement in &block.statements {
                    self.visit_statement(statement, false);
                }
            }
            ConfigBlockKind::Named(name) if name == "profiles" => {
                self.profile_depth += 1;
                // Children are the profile names, each transparent.
                for statement in &block.statements {
                    match statement {
                        ConfigStatement::Block(profile) => {
                            for inner in &profile.statements {
                                self.visit_statement(inner, false);
                            }
                        }
                        other => self.visit_statement(other, false),
                    }
                }
                self.profile_depth -= 1;
            }
            ConfigBlockKind::Named(name) => {
                let depth = self.push_path(name);
                for statement in &block.statements {
                    self.visit_statement(statement, false);
                }
                self.pop_path(depth);
            }
        }
    }

    fn push_path(&mut self, dotted: &str) -> usize {
        let mut count = 0;
        for segment in dotted.split('.') {
            self.path.push(segment.to_string());
            count += 1;
        }
        count
    }

    fn pop_path(&mut self, count: usize) {
        for _ in 0..count {
            self.path.pop();
        }
    }

    fn visit_assign(&mut self, assign: &ConfigAssign) {
        let mut path: Vec<String> = self.path.clone();
        path.extend(assign.names.iter().cloned());

        // A leading `profiles.<name>` prefix is schema-transparent.
        if path.first().map(|s| s == "profiles").unwrap_or(false) {
            if path.len() <= 2 {
                return;
            }
            path.drain(..2);
        }

        match path.first().map(String::as_str) {
            Some("env") => {
                // env exposes flat variable names only.
                if path.len() != 2 {
                    self.errors.push(ParseError::warning(
                        assign.name_span,
                        format!(
                            "Environment variables must be flat names; '{}' nests too deeply",
                            path.join(".")
                        ),
                        CompilePhase::NameResolution,
                    ));
                }
                return;
            }
            Some("params") => return,
            _ => {}
        }

        match definitions::lookup(&self.root, &path) {
            None => {
                self.errors.push(ParseError::warning(
                    assign.name_span,
                    format!("Unrecognized config option '{}'", path.join(".")),
                    CompilePhase::NameResolution,
                ));
            }
            Some(SchemaNode::Scope { .. }) | Some(SchemaNode::Placeholder { .. }) => {
                self.errors.push(ParseError::warning(
                    assign.name_span,
                    format!("'{}' is a config scope and cannot be assigned", path.join(".")),
                    CompilePhase::NameResolution,
                ));
            }
            Some(SchemaNode::Option { types, .. }) => {
                if self.options.type_checking && !types.is_empty() {
                    if let Some(actual) = value_type_name(&assign.value) {
                        if !accepts(types, actual) {
                            self.errors.push(ParseError::warning(
                                assign.value.span(),
                                format!(
                                    "'{}' expects {} but the value is a {}",
                                    path.join("."),
                                    types.join(" or "),
                                    actual
                                ),
                                CompilePhase::TypeChecking,
                            ));
                        }
                    }
                }
            }
        }
    }
}

/// Canonical type name of a literal config value; `None` when the value
/// is an expression the validator cannot see through.
fn value_type_name(expression: &Expression) -> Option<&'static str> {
    match expression.unwrapped() {
        Expression::Constant(constant) => Some(match constant.value {
            ConstantValue::Integer(_) => "Integer",
            ConstantValue::Float(_) => "Float",
            ConstantValue::Boolean(_) => "Boolean",
            ConstantValue::Null => return None,
        }),
        Expression::Str(string) => {
            if string.kind == StringTokenKind::Slashy {
                None
            } else {
                Some("String")
            }
        }
        Expression::List(_) => Some("List"),
        Expression::Map(_) => Some("Record"),
        Expression::Closure(_) => Some("Closure"),
        _ => None,
    }
}

/// Whether an option's accepted type set admits a literal of `actual`.
fn accepts(types: &[String], actual: &'static str) -> bool {
    if types.iter().any(|t| t == actual) {
        return true;
    }
    match actual {
        // Durations, memory sizes and paths are written as strings.
        "String" => types.iter().any(|t| {
            matches!(t.as_str(), "Duration" | "MemoryUnit" | "Path")
        }),
        "Integer" => types.iter().any(|t| t == "Float"),
        "Record" => types.iter().any(|t| t == "Map"),
        _ => false,
    }
}
