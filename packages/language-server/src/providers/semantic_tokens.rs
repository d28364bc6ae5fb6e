//! Semantic tokens (full document only).

use nextflow_compiler::config::ast::{ConfigBlockKind, ConfigStatement};
use nextflow_compiler::node::{walk, AnyNode};
use nextflow_compiler::parse_util::{ParseLocation, ParseSourceSpan};
use nextflow_compiler::script::ast::{Declaration, Expression};
use nextflow_compiler::script::lexer::{Lexer, TokenType};
use nextflow_compiler::types::dsl::{self, MemberKind};
use nextflow_compiler::unit::Target;
use tower_lsp::lsp_types::{SemanticToken, SemanticTokenModifier, SemanticTokenType};

use crate::state::AnalysisState;

pub const TOKEN_TYPES: &[SemanticTokenType] = &[
    SemanticTokenType::NAMESPACE,
    SemanticTokenType::TYPE,
    SemanticTokenType::FUNCTION,
    SemanticTokenType::VARIABLE,
    SemanticTokenType::PARAMETER,
    SemanticTokenType::PROPERTY,
    SemanticTokenType::KEYWORD,
];

pub const TOKEN_MODIFIERS: &[SemanticTokenModifier] = &[
    SemanticTokenModifier::DECLARATION,
    SemanticTokenModifier::READONLY,
    SemanticTokenModifier::DEFAULT_LIBRARY,
];

const NAMESPACE: u32 = 0;
const TYPE: u32 = 1;
const FUNCTION: u32 = 2;
const VARIABLE: u32 = 3;
const PARAMETER: u32 = 4;
const PROPERTY: u32 = 5;
const KEYWORD: u32 = 6;

bitflags::bitflags! {
    /// Modifier bits in `TOKEN_MODIFIERS` order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Modifiers: u32 {
        const DECLARATION = 1 << 0;
        const READONLY = 1 << 1;
        const DEFAULT_LIBRARY = 1 << 2;
    }
}

struct RawToken {
    line: u32,
    col: u32,
    len: u32,
    token_type: u32,
    modifiers: Modifiers,
}

fn push(tokens: &mut Vec<RawToken>, span: ParseSourceSpan, token_type: u32, modifiers: Modifiers) {
    // Multi-line spans cannot be encoded; skip them.
    if span.start.line != span.end.line || span.len() == 0 {
        return;
    }
    tokens.push(RawToken {
        line: span.start.line as u32,
        col: span.start.col as u32,
        len: span.len() as u32,
        token_type,
        modifiers,
    });
}

/// Span of a declaration's leading contextual keyword, e.g. the
/// `process` of `process NAME {`.
fn leading_word(start: ParseLocation, len: usize) -> ParseSourceSpan {
    ParseSourceSpan::new(
        start,
        ParseLocation::new(start.offset + len, start.line, start.col + len),
    )
}

fn builtin_modifiers(scope: &str, member: &str) -> (u32, Modifiers) {
    match dsl::builtin_member(scope, member) {
        Some(m) => match m.kind {
            MemberKind::Method => (FUNCTION, Modifiers::DEFAULT_LIBRARY),
            MemberKind::Constant => (VARIABLE, Modifiers::READONLY | Modifiers::DEFAULT_LIBRARY),
            MemberKind::Namespace => (NAMESPACE, Modifiers::DEFAULT_LIBRARY),
        },
        None => (FUNCTION, Modifiers::DEFAULT_LIBRARY),
    }
}

pub fn semantic_tokens(state: &AnalysisState, uri: &str) -> Vec<SemanticToken> {
    let Some(cache) = state.cache_for(uri) else {
        return Vec::new();
    };
    let Some(unit) = cache.unit(uri) else {
        return Vec::new();
    };

    let mut raw: Vec<RawToken> = Vec::new();

    // Lexical keywords never survive into the AST; take them straight
    // off the token stream.
    if let Some(text) = state.files.contents(uri) {
        for token in Lexer::new().tokenize(text) {
            if token.token_type == TokenType::Keyword {
                push(&mut raw, token.span(), KEYWORD, Modifiers::empty());
            }
        }
    }

    if let Some(module) = unit.script() {
        for declaration in &module.declarations {
            match declaration {
                Declaration::Process(process) => {
                    // The contextual `process` word leads the span.
                    push(&mut raw, leading_word(process.span.start, 7), KEYWORD, Modifiers::empty());
                    push(&mut raw, process.name_span, FUNCTION, Modifiers::DECLARATION);
                }
                Declaration::Workflow(workflow) => {
                    push(&mut raw, leading_word(workflow.span.start, 8), KEYWORD, Modifiers::empty());
                    if let Some(span) = workflow.name_span {
                        push(&mut raw, span, FUNCTION, Modifiers::DECLARATION);
                    }
                }
                Declaration::Function(function) => {
                    push(&mut raw, function.name_span, FUNCTION, Modifiers::DECLARATION);
                }
                Declaration::Output(output) => {
                    push(&mut raw, leading_word(output.span.start, 6), KEYWORD, Modifiers::empty());
                }
                _ => {}
            }
        }
        walk(unit.root(), &mut |node| match node {
            AnyNode::Expression(Expression::Variable(variable)) => {
                match unit.metadata.target(variable.id) {
                    Some(Target::Builtin { scope, member }) => {
                        let (token_type, modifiers) = builtin_modifiers(scope, member);
                        push(&mut raw, variable.span, token_type, modifiers);
                    }
                    Some(Target::Node { .. }) => {
                        push(&mut raw, variable.span, VARIABLE, Modifiers::empty());
                    }
                    None => {}
                }
            }
            AnyNode::Expression(Expression::MethodCall(call)) => {
                match unit.metadata.target(call.id) {
                    Some(Target::Builtin { .. }) => {
                        push(&mut raw, call.name_span, FUNCTION, Modifiers::DEFAULT_LIBRARY);
                    }
                    Some(Target::Node { .. }) => {
                        push(&mut raw, call.name_span, FUNCTION, Modifiers::empty());
                    }
                    None => {}
                }
            }
            AnyNode::Expression(Expression::Property(property)) => {
                push(&mut raw, property.name_span, PROPERTY, Modifiers::empty());
            }
            AnyNode::Param(param) => {
                push(&mut raw, param.span, PARAMETER, Modifiers::DECLARATION);
            }
            AnyNode::TypeAnnotation(annotation) => {
                push(&mut raw, annotation.span, TYPE, Modifiers::empty());
            }
            _ => {}
        });
    }

    if let Some(config) = unit.config() {
        collect_config_tokens(&config.statements, &mut raw);
    }

    encode(raw)
}

fn collect_config_tokens(statements: &[ConfigStatement], raw: &mut Vec<RawToken>) {
    for statement in statements {
        match statement {
            ConfigStatement::Assign(assign) => {
                push(raw, assign.name_span, PROPERTY, Modifiers::empty());
            }
            ConfigStatement::Block(block) => {
                let token_type = match &block.kind {
                    ConfigBlockKind::Named(_) => NAMESPACE,
                    ConfigBlockKind::Selector { .. } => PROPERTY,
                };
                push(raw, block.name_span, token_type, Modifiers::empty());
                collect_config_tokens(&block.statements, raw);
            }
            _ => {}
        }
    }
}

/// Sort and delta-encode per the LSP semantic token wire format.
fn encode(mut raw: Vec<RawToken>) -> Vec<SemanticToken> {
    raw.sort_by_key(|t| (t.line, t.col));
    raw.dedup_by_key(|t| (t.line, t.col));
    let mut out = Vec::with_capacity(raw.len());
    let mut prev_line = 0u32;
    let mut prev_col = 0u32;
    for token in raw {
        let delta_line = token.line - prev_line;
        let delta_start = if delta_line == 0 {
            token.col - prev_col
        } else {
            token.col
        };
        out.push(SemanticToken {
            delta_line,
            delta_start,
            length: token.len,
            token_type: token.token_type,
            token_modifiers_bitset: token.modifiers.bits(),
        });
        prev_line = token.line;
        prev_col = token.col;
    }
    out
}
