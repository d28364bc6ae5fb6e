//! Config Parser
//!
//! Parses Nextflow configuration files: dotted assignments, scoped and
//! selector blocks, `includeConfig` statements and plugin apply blocks.
//! Shares the script lexer and expression grammar; recovers at statement
//! boundaries and keeps partial trailing paths for completion.

use crate::parse_util::{ParseLocation, ParseSourceSpan};
use crate::script::ast::Statement;
use crate::script::lexer::Lexer;
use crate::script::parser::Cursor;

use super::ast::*;

/// Blocks whose bodies invoke items instead of assigning options.
const APPLY_BLOCKS: &[&str] = &["plugins"];

#[derive(Debug)]
pub struct ConfigParseResult {
    pub module: ConfigModule,
    pub errors: Vec<crate::parse_util::ParseError>,
    pub node_count: u32,
}

pub struct ConfigParser {
    lexer: Lexer,
}

impl ConfigParser {
    pub fn new() -> Self {
        ConfigParser { lexer: Lexer::new() }
    }

    pub fn parse(&self, text: &str) -> ConfigParseResult {
        let tokens = self.lexer.tokenize(text);
        let end = tokens
            .last()
            .map(|t| t.end)
            .unwrap_or_else(ParseLocation::zero);
        let mut cursor = Cursor::new(tokens, end);
        let module = parse_config_module(&mut cursor);
        ConfigParseResult {
            module,
            errors: cursor.errors.clone(),
            node_count: cursor.ids.count(),
        }
    }
}

impl Default for ConfigParser {
    fn default() -> Self {
        ConfigParser::new()
    }
}

fn parse_config_module(cursor: &mut Cursor) -> ConfigModule {
    let id = cursor.ids.next_id();
    let start = cursor.location();
    let statements = parse_statements_until(cursor, None);
    ConfigModule {
        id,
        span: ParseSourceSpan::new(start, cursor.prev_end()),
        statements,
    }
}

/// Parse config statements until `terminator` (or end of input).
fn parse_statements_until(cursor: &mut Cursor, terminator: Option<char>) -> Vec<ConfigStatement> {
    let mut statements = Vec::new();
    loop {
        cursor.skip_newlines();
        if cursor.at_end() {
            break;
        }
        if let Some(t) = terminator {
            if cursor.check_character(t) {
                break;
            }
        }
        let before_index = cursor.location().offset;
        if let Some(statement) = parse_config_statement(cursor) {
            statements.push(statement);
        }
        if cursor.location().offset == before_index && !cursor.at_end() {
            // Guarantee progress on unparseable input.
            let span = cursor.here();
            if let Some(token) = cursor.advance() {
                if token.is_error() {
                    cursor.error(span, token.str_value.clone());
                } else {
                    cursor.error(span, format!("Unexpected token '{}'", token.str_value));
                }
            }
        }
    }
    statements
}

fn parse_config_statement(cursor: &mut Cursor) -> Option<ConfigStatement> {
    if cursor.check_identifier("includeConfig") {
        let id = cursor.ids.next_id();
        let start = cursor.location();
        cursor.advance();
        let source = cursor.parse_expression();
        return Some(ConfigStatement::Include(ConfigInclude {
            id,
            span: cursor.span_from(start),
            source,
        }));
    }

    if !cursor.peek().map(|t| t.is_name()).unwrap_or(false) {
        return None;
    }

    let id = cursor.ids.next_id();
    let start = cursor.location();
    let (first, first_span) = cursor.expect_name();

    // Selector block: `withLabel:big { ... }`
    if cursor.check_character(':')
        && cursor.peek_at(1).map(|t| t.is_name()).unwrap_or(false)
    {
        cursor.advance(); // :
        let (target, target_span) = cursor.expect_name();
        cursor.skip_newlines();
        cursor.expect_character('{');
        let statements = parse_statements_until(cursor, Some('}'));
        cursor.expect_character('}');
        return Some(ConfigStatement::Block(ConfigBlock {
            id,
            span: cursor.span_from(start),
            kind: ConfigBlockKind::Selector { kind: first, target },
            name_span: ParseSourceSpan::new(first_span.start, target_span.end),
            statements,
        }));
    }

    // Dotted path
    let mut names = vec![first];
    let mut trailing_dot = false;
    while cursor.check_character('.') {
        cursor.advance();
        if cursor.peek().map(|t| t.is_name()).unwrap_or(false) {
            let (segment, _) = cursor.expect_name();
            names.push(segment);
        } else {
            trailing_dot = true;
            break;
        }
    }
    let name_span = cursor.span_from(first_span.start);

    if trailing_dot {
        // Partial input such as `process.` retained for completion.
        return Some(ConfigStatement::Incomplete(ConfigIncomplete {
            id,
            span: cursor.span_from(start),
            text: format!("{}.", names.join(".")),
        }));
    }

    if cursor.consume_operator("=") {
        cursor.skip_newlines();
        let value = cursor.parse_expression();
        return Some(ConfigStatement::Assign(ConfigAssign {
            id,
            span: cursor.span_from(start),
            names,
            name_span,
            value,
        }));
    }

    if cursor.check_character('{') {
        cursor.advance();
        let name = names.join(".");
        if APPLY_BLOCKS.contains(&name.as_str()) {
            let statements = parse_apply_body(cursor);
            cursor.expect_character('}');
            return Some(ConfigStatement::Apply(ConfigApply {
                id,
                span: cursor.span_from(start),
                name,
                statements,
            }));
        }
        let statements = parse_statements_until(cursor, Some('}'));
        cursor.expect_character('}');
        return Some(ConfigStatement::Block(ConfigBlock {
            id,
            span: cursor.span_from(start),
            kind: ConfigBlockKind::Named(name),
            name_span,
            statements,
        }));
    }

    let span = cursor.here();
    cursor.error(span, "Expected '=', ':' or '{' after config name");
    cursor.synchronize();
    Some(ConfigStatement::Incomplete(ConfigIncomplete {
        id,
        span: cursor.span_from(start),
        text: names.join("."),
    }))
}

/// Apply-block bodies are plain script statements (`id 'nf-hello@0.5.0'`).
fn parse_apply_body(cursor: &mut Cursor) -> Vec<Statement> {
    let mut statements = Vec::new();
    loop {
        cursor.skip_newlines();
        if cursor.check_character('}') || cursor.at_end() {
            break;
        }
        let before = cursor.location().offset;
        if let Some(statement) = cursor.parse_statement() {
            statements.push(statement);
        }
        if cursor.location().offset == before && !cursor.at_end() && !cursor.check_character('}')
        {
            cursor.advance();
        }
    }
    statements
}
