//! Script Parser
//!
//! Recursive descent over the token stream. On malformed input the parser
//! records syntax errors with ranges, synchronizes at statement or section
//! boundaries, and still returns a partial module so downstream phases and
//! IDE features keep working.

use crate::parse_util::{CompilePhase, ParseError, ParseLocation, ParseSourceSpan};

use super::ast::*;
use super::lexer::{InterpolationSegment, Lexer, StringTokenKind, Token, TokenType};

#[derive(Debug)]
pub struct ParseResult {
    pub module: ScriptModule,
    pub errors: Vec<ParseError>,
    pub node_count: u32,
}

pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new() -> Self {
        Parser { lexer: Lexer::new() }
    }

    pub fn parse(&self, text: &str) -> ParseResult {
        let tokens = self.lexer.tokenize(text);
        let end = tokens
            .last()
            .map(|t| t.end)
            .unwrap_or_else(ParseLocation::zero);
        let mut cursor = Cursor::new(tokens, end);
        let module = cursor.parse_module();
        ParseResult {
            module,
            errors: cursor.errors,
            node_count: cursor.ids.count(),
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Parser::new()
    }
}

pub(crate) struct Cursor {
    tokens: Vec<Token>,
    index: usize,
    pub(crate) errors: Vec<ParseError>,
    pub(crate) ids: NodeIdGen,
    eof: ParseLocation,
}

impl Cursor {
    pub(crate) fn new(tokens: Vec<Token>, eof: ParseLocation) -> Self {
        Cursor {
            tokens,
            index: 0,
            errors: Vec::new(),
            ids: NodeIdGen::new(),
            eof,
        }
    }

    // -- token access -------------------------------------------------------

    pub(crate) fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    pub(crate) fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.index + ahead)
    }

    /// Next non-newline token, used for lookahead across line breaks.
    pub(crate) fn peek_significant(&self) -> Option<&Token> {
        self.tokens[self.index..].iter().find(|t| !t.is_newline())
    }

    pub(crate) fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    pub(crate) fn location(&self) -> ParseLocation {
        self.peek().map(|t| t.start).unwrap_or(self.eof)
    }

    pub(crate) fn prev_end(&self) -> ParseLocation {
        if self.index == 0 {
            return self.location();
        }
        self.tokens
            .get(self.index - 1)
            .map(|t| t.end)
            .unwrap_or(self.eof)
    }

    pub(crate) fn span_from(&self, start: ParseLocation) -> ParseSourceSpan {
        ParseSourceSpan::new(start, self.prev_end())
    }

    pub(crate) fn here(&self) -> ParseSourceSpan {
        let loc = self.location();
        let end = self.peek().map(|t| t.end).unwrap_or(loc);
        ParseSourceSpan::new(loc, end)
    }

    pub(crate) fn skip_newlines(&mut self) {
        while self.peek().map(|t| t.is_newline()).unwrap_or(false) {
            self.index += 1;
        }
    }

    pub(crate) fn check_character(&self, code: char) -> bool {
        self.peek().map(|t| t.is_character(code)).unwrap_or(false)
    }

    pub(crate) fn check_operator(&self, op: &str) -> bool {
        self.peek().map(|t| t.is_operator(op)).unwrap_or(false)
    }

    pub(crate) fn check_keyword(&self, keyword: &str) -> bool {
        self.peek().map(|t| t.is_keyword(keyword)).unwrap_or(false)
    }

    pub(crate) fn check_identifier(&self, name: &str) -> bool {
        self.peek()
            .map(|t| t.is_identifier() && t.str_value == name)
            .unwrap_or(false)
    }

    pub(crate) fn consume_character(&mut self, code: char) -> bool {
        if self.check_character(code) {
            self.index += 1;
            return true;
        }
        false
    }

    pub(crate) fn consume_operator(&mut self, op: &str) -> bool {
        if self.check_operator(op) {
            self.index += 1;
            return true;
        }
        false
    }

    pub(crate) fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.index += 1;
            return true;
        }
        false
    }

    pub(crate) fn expect_character(&mut self, code: char) {
        if !self.consume_character(code) {
            let span = self.here();
            self.error(span, format!("Expected '{}'", code));
        }
    }

    /// Take an identifier-like token or synthesize an empty name.
    pub(crate) fn expect_name(&mut self) -> (String, ParseSourceSpan) {
        if self.peek().map(|t| t.is_name()).unwrap_or(false) {
            let token = self.advance().unwrap();
            return (token.str_value.clone(), token.span());
        }
        let span = self.here();
        self.error(span, "Expected a name");
        (String::new(), span)
    }

    pub(crate) fn error(&mut self, span: ParseSourceSpan, msg: impl Into<String>) {
        self.errors
            .push(ParseError::new(span, msg, CompilePhase::Syntax));
    }

    /// Skip to the next statement boundary after a parse failure.
    pub(crate) fn synchronize(&mut self) {
        while let Some(token) = self.peek() {
            if token.is_newline() || token.is_character('}') {
                return;
            }
            self.index += 1;
        }
    }

    // -- module -------------------------------------------------------------

    pub(crate) fn parse_module(&mut self) -> ScriptModule {
        let id = self.ids.next_id();
        let start = self.location();
        let mut declarations = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_end() {
                break;
            }
            let before = self.index;
            if let Some(declaration) = self.parse_declaration() {
                declarations.push(declaration);
            }
            if self.index == before {
                // Nothing consumed; drop the offending token to guarantee
                // progress.
                let span = self.here();
                let token = self.advance();
                if let Some(token) = token {
                    if !token.is_error() {
                        self.error(span, format!("Unexpected token '{}'", token.str_value));
                    } else {
                        self.error(span, token.str_value.clone());
                    }
                }
            }
        }
        ScriptModule {
            id,
            span: ParseSourceSpan::new(start, self.prev_end()),
            declarations,
        }
    }

    fn parse_declaration(&mut self) -> Option<Declaration> {
        if self.check_keyword("include") {
            return self.parse_include().map(Declaration::Include);
        }
        if self.check_identifier("process")
            && self.peek_at(1).map(|t| t.is_name()).unwrap_or(false)
        {
            return self.parse_process().map(Declaration::Process);
        }
        if self.check_identifier("workflow") {
            // `workflow {` or `workflow name {`; a property access like
            // `workflow.onComplete` stays a statement.
            let next = self.peek_at(1);
            let is_def = match next {
                Some(t) if t.is_character('{') => true,
                Some(t) if t.is_name() => self
                    .peek_at(2)
                    .map(|t| t.is_character('{'))
                    .unwrap_or(false),
                _ => false,
            };
            if is_def {
                return self.parse_workflow().map(Declaration::Workflow);
            }
        }
        if self.check_identifier("output")
            && self.peek_at(1).map(|t| t.is_character('{')).unwrap_or(false)
        {
            return self.parse_output().map(Declaration::Output);
        }
        if self.check_identifier("nextflow") && self.is_feature_flag_ahead() {
            return self.parse_feature_flag().map(Declaration::FeatureFlag);
        }
        if self.is_function_def_ahead() {
            return self.parse_function().map(Declaration::Function);
        }
        self.parse_statement().map(Declaration::Stmt)
    }

    fn is_feature_flag_ahead(&self) -> bool {
        // nextflow.enable.dsl = 2
        let mut ahead = 1;
        loop {
            match (self.peek_at(ahead), self.peek_at(ahead + 1)) {
                (Some(dot), Some(name)) if dot.is_character('.') && name.is_name() => {
                    ahead += 2;
                }
                _ => break,
            }
        }
        ahead > 1
            && self
                .peek_at(ahead)
                .map(|t| t.is_operator("="))
                .unwrap_or(false)
    }

    fn is_function_def_ahead(&self) -> bool {
        // `def name(` or `Type name(`
        if self.check_keyword("def") {
            return self.peek_at(1).map(|t| t.is_name()).unwrap_or(false)
                && self
                    .peek_at(2)
                    .map(|t| t.is_character('('))
                    .unwrap_or(false);
        }
        self.peek().map(|t| t.is_identifier()).unwrap_or(false)
            && self.peek_at(1).map(|t| t.is_identifier()).unwrap_or(false)
            && self
                .peek_at(2)
                .map(|t| t.is_character('('))
                .unwrap_or(false)
    }

    fn parse_include(&mut self) -> Option<IncludeDecl> {
        let id = self.ids.next_id();
        let start = self.location();
        self.consume_keyword("include");
        self.expect_character('{');
        let mut entries = Vec::new();
        loop {
            self.skip_newlines();
            if self.check_character('}') || self.at_end() {
                break;
            }
            let entry_id = self.ids.next_id();
            let (name, name_span) = self.expect_name();
            let mut alias = None;
            if self.consume_keyword("as") {
                let (alias_name, _) = self.expect_name();
                alias = Some(alias_name);
            }
            entries.push(IncludeEntry {
                id: entry_id,
                span: self.span_from(name_span.start),
                name,
                alias,
            });
            if !self.consume_character(';') {
                self.skip_newlines();
            }
        }
        self.expect_character('}');
        let mut source = String::new();
        let mut source_span = self.here();
        if self.consume_keyword("from") {
            if self.peek().map(|t| t.is_string()).unwrap_or(false) {
                let token = self.advance().unwrap();
                source = token.str_value.clone();
                source_span = token.span();
            } else {
                let span = self.here();
                self.error(span, "Expected a source path after 'from'");
            }
        } else {
            let span = self.here();
            self.error(span, "Expected 'from' after include entries");
        }
        Some(IncludeDecl {
            id,
            span: self.span_from(start),
            entries,
            source,
            source_span,
        })
    }

    fn parse_feature_flag(&mut self) -> Option<FeatureFlagDecl> {
        let id = self.ids.next_id();
        let start = self.location();
        let mut segments = Vec::new();
        let (first, first_span) = self.expect_name();
        segments.push(first);
        while self.check_character('.')
            && self.peek_at(1).map(|t| t.is_name()).unwrap_or(false)
        {
            self.advance();
            let (segment, _) = self.expect_name();
            segments.push(segment);
        }
        let name_span = self.span_from(first_span.start);
        if !self.consume_operator("=") {
            let span = self.here();
            self.error(span, "Expected '=' in feature flag declaration");
        }
        let value = self.parse_expression();
        Some(FeatureFlagDecl {
            id,
            span: self.span_from(start),
            name: segments.join("."),
            name_span,
            value,
        })
    }

    // -- process ------------------------------------------------------------

    fn parse_process(&mut self) -> Option<ProcessDef> {
        let id = self.ids.next_id();
        let start = self.location();
        self.advance(); // process
        let (name, name_span) = self.expect_name();
        self.skip_newlines();
        self.expect_character('{');

        let mut directives = Vec::new();
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut when = None;
        let mut body: Option<ProcessBody> = None;
        let mut stub = Vec::new();
        let mut topics = Vec::new();
        let mut section = ProcessSection::Directives;

        loop {
            self.skip_newlines();
            if self.check_character('}') || self.at_end() {
                break;
            }
            if let Some(label) = self.section_label() {
                match label.as_str() {
                    "input" => section = ProcessSection::Input,
                    "output" => section = ProcessSection::Output,
                    "when" => section = ProcessSection::When,
                    "script" => section = ProcessSection::Body(ProcessBodyKind::Script),
                    "shell" => section = ProcessSection::Body(ProcessBodyKind::Shell),
                    "exec" => section = ProcessSection::Body(ProcessBodyKind::Exec),
                    "stub" => section = ProcessSection::Stub,
                    "topic" => section = ProcessSection::Topic,
                    other => {
                        let span = self.here();
                        self.error(span, format!("Unknown process section '{}'", other));
                        section = ProcessSection::Directives;
                    }
                }
                continue;
            }
            if let ProcessSection::When = section {
                when = Some(self.parse_expression());
                continue;
            }
            let before = self.index;
            let Some(statement) = self.parse_statement() else {
                if self.index == before {
                    self.advance();
                }
                continue;
            };
            match section {
                ProcessSection::Directives => directives.push(statement),
                ProcessSection::Input => inputs.push(statement),
                ProcessSection::Output => outputs.push(statement),
                ProcessSection::When => {}
                ProcessSection::Body(kind) => {
                    if let Some(existing) = body.as_mut() {
                        existing.statements.push(statement);
                    } else {
                        body = Some(ProcessBody { kind, statements: vec![statement] });
                    }
                }
                ProcessSection::Stub => stub.push(statement),
                ProcessSection::Topic => topics.push(statement),
            }
        }
        self.expect_character('}');

        let form = if inputs.iter().chain(outputs.iter()).any(has_type_annotation) {
            ProcessForm::Typed
        } else {
            ProcessForm::Legacy
        };
        Some(ProcessDef {
            id,
            span: self.span_from(start),
            name,
            name_span,
            form,
            directives,
            inputs,
            outputs,
            when,
            body,
            stub,
            topics,
        })
    }

    /// `ident ':'` at the start of a line introduces a section.
    fn section_label(&mut self) -> Option<String> {
        let token = self.peek()?;
        if !token.is_name() {
            return None;
        }
        let next = self.peek_at(1)?;
        if !next.is_character(':') {
            return None;
        }
        // `withLabel:foo` style selectors are not sections.
        if self
            .peek_at(2)
            .map(|t| t.is_name() && t.start.line == next.end.line && !t.is_newline())
            .unwrap_or(false)
            && !SECTION_LABELS.contains(&token.str_value.as_str())
        {
            return None;
        }
        let label = token.str_value.clone();
        self.index += 2;
        Some(label)
    }

    // -- workflow -----------------------------------------------------------

    fn parse_workflow(&mut self) -> Option<WorkflowDef> {
        let id = self.ids.next_id();
        let start = self.location();
        self.advance(); // workflow
        let mut name = None;
        let mut name_span = None;
        if self.peek().map(|t| t.is_name()).unwrap_or(false) {
            let token = self.advance().unwrap();
            name = Some(token.str_value.clone());
            name_span = Some(token.span());
        }
        self.skip_newlines();
        self.expect_character('{');

        let mut takes = Vec::new();
        let mut main = Vec::new();
        let mut emits = Vec::new();
        let mut publishers = Vec::new();
        let mut on_complete = None;
        let mut on_error = None;
        let mut section = WorkflowSection::Main;

        loop {
            self.skip_newlines();
            if self.check_character('}') || self.at_end() {
                break;
            }
            if let Some(label) = self.section_label() {
                match label.as_str() {
                    "take" => section = WorkflowSection::Take,
                    "main" => section = WorkflowSection::Main,
                    "emit" => section = WorkflowSection::Emit,
                    "publish" => section = WorkflowSection::Publish,
                    other => {
                        let span = self.here();
                        self.error(span, format!("Unknown workflow section '{}'", other));
                        section = WorkflowSection::Main;
                    }
                }
                continue;
            }
            match section {
                WorkflowSection::Take => {
                    let entry_id = self.ids.next_id();
                    let (take_name, take_span) = self.expect_name();
                    if take_name.is_empty() {
                        self.synchronize();
                        continue;
                    }
                    takes.push(TakeEntry { id: entry_id, span: take_span, name: take_name });
                }
                WorkflowSection::Main => {
                    let before = self.index;
                    let Some(statement) = self.parse_statement() else {
                        if self.index == before {
                            self.advance();
                        }
                        continue;
                    };
                    match lifecycle_handler(&statement) {
                        Some(LifecycleKind::OnComplete) => {
                            on_complete = Some(Box::new(statement))
                        }
                        Some(LifecycleKind::OnError) => on_error = Some(Box::new(statement)),
                        None => main.push(statement),
                    }
                }
                WorkflowSection::Emit => {
                    if let Some(entry) = self.parse_emit_entry() {
                        emits.push(entry);
                    }
                }
                WorkflowSection::Publish => {
                    if let Some(entry) = self.parse_publish_entry() {
                        publishers.push(entry);
                    }
                }
            }
        }
        self.expect_character('}');
        Some(WorkflowDef {
            id,
            span: self.span_from(start),
            name,
            name_span,
            takes,
            main,
            emits,
            publishers,
            on_complete,
            on_error,
        })
    }

    fn parse_emit_entry(&mut self) -> Option<EmitEntry> {
        let id = self.ids.next_id();
        let start = self.location();
        // `name = expr` names the emission; a bare expression stays
        // anonymous unless it is a plain variable.
        if self.peek().map(|t| t.is_identifier()).unwrap_or(false)
            && self.peek_at(1).map(|t| t.is_operator("=")).unwrap_or(false)
        {
            let token = self.advance().unwrap();
            let name = token.str_value.clone();
            let name_span = token.span();
            self.advance(); // =
            let value = self.parse_expression();
            return Some(EmitEntry {
                id,
                span: self.span_from(start),
                name: Some(name),
                name_span: Some(name_span),
                value: Some(value),
            });
        }
        let value = self.parse_expression();
        let (name, name_span) = match value.unwrapped() {
            Expression::Variable(v) => (Some(v.name.clone()), Some(v.span)),
            _ => (None, None),
        };
        Some(EmitEntry {
            id,
            span: self.span_from(start),
            name,
            name_span,
            value: Some(value),
        })
    }

    fn parse_publish_entry(&mut self) -> Option<PublishEntry> {
        let id = self.ids.next_id();
        let start = self.location();
        // `source >> 'target'` parses as a shift expression; pull it
        // apart here.
        let expression = self.parse_expression();
        let (source, target, target_span) = match expression {
            Expression::Binary(binary) if binary.op == ">>" => {
                match binary.right.unwrapped() {
                    Expression::Str(string) => {
                        (*binary.left, string.value.clone(), string.span)
                    }
                    other => {
                        let span = other.span();
                        self.error(span, "Expected a publish target");
                        (*binary.left, String::new(), span)
                    }
                }
            }
            other => {
                let span = self.here();
                self.error(span, "Expected '>>' in publish statement");
                self.synchronize();
                (other, String::new(), span)
            }
        };
        Some(PublishEntry {
            id,
            span: self.span_from(start),
            source,
            target,
            target_span,
        })
    }

    // -- functions & output block -------------------------------------------

    fn parse_function(&mut self) -> Option<FunctionDef> {
        let id = self.ids.next_id();
        let start = self.location();
        let mut return_type = None;
        if !self.consume_keyword("def") {
            return_type = Some(self.parse_type_annotation());
        }
        let (name, name_span) = self.expect_name();
        self.expect_character('(');
        let params = self.parse_params(')');
        self.expect_character(')');
        self.skip_newlines();
        self.expect_character('{');
        let body = self.parse_block_body();
        self.expect_character('}');
        Some(FunctionDef {
            id,
            span: self.span_from(start),
            name,
            name_span,
            params,
            return_type,
            body,
            doc: None,
        })
    }

    fn parse_params(&mut self, terminator: char) -> Vec<Param> {
        let mut params = Vec::new();
        loop {
            self.skip_newlines();
            if self.check_character(terminator) || self.at_end() {
                break;
            }
            let id = self.ids.next_id();
            let start = self.location();
            // `Type name` or bare `name`
            let mut ty = None;
            if self.peek().map(|t| t.is_identifier()).unwrap_or(false)
                && self.peek_at(1).map(|t| t.is_identifier()).unwrap_or(false)
            {
                ty = Some(self.parse_type_annotation());
            }
            let (name, _) = self.expect_name();
            if name.is_empty() {
                self.synchronize();
                break;
            }
            params.push(Param { id, span: self.span_from(start), name, ty });
            if !self.consume_character(',') {
                break;
            }
        }
        params
    }

    fn parse_type_annotation(&mut self) -> TypeAnnotation {
        let id = self.ids.next_id();
        let start = self.location();
        let (name, _) = self.expect_name();
        let mut args = Vec::new();
        if self.consume_operator("<") {
            loop {
                args.push(self.parse_type_annotation());
                if !self.consume_character(',') {
                    break;
                }
            }
            if !self.consume_operator(">") {
                let span = self.here();
                self.error(span, "Expected '>' to close type arguments");
            }
        }
        TypeAnnotation { id, span: self.span_from(start), name, args }
    }

    fn parse_output(&mut self) -> Option<OutputDef> {
        let id = self.ids.next_id();
        let start = self.location();
        self.advance(); // output
        self.expect_character('{');
        let mut targets = Vec::new();
        loop {
            self.skip_newlines();
            if self.check_character('}') || self.at_end() {
                break;
            }
            let target_id = self.ids.next_id();
            let target_start = self.location();
            let (name, name_span) = self.expect_name();
            if name.is_empty() {
                self.synchronize();
                continue;
            }
            self.skip_newlines();
            let mut body = Vec::new();
            if self.consume_character('{') {
                body = self.parse_block_body();
                self.expect_character('}');
            }
            targets.push(OutputTarget {
                id: target_id,
                span: self.span_from(target_start),
                name,
                name_span,
                body,
            });
        }
        self.expect_character('}');
        Some(OutputDef { id, span: self.span_from(start), targets })
    }

    // -- statements ----------------------------------------------------------

    fn parse_block_body(&mut self) -> Vec<Statement> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            if self.check_character('}') || self.at_end() {
                break;
            }
            let before = self.index;
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            if self.index == before {
                self.advance();
            }
        }
        statements
    }

    pub(crate) fn parse_statement(&mut self) -> Option<Statement> {
        self.skip_newlines();
        let token = self.peek()?.clone();

        if token.is_keyword("def") && !self.is_function_def_ahead() {
            return self.parse_var_decl();
        }
        if token.is_keyword("if") {
            return self.parse_if();
        }
        if token.is_keyword("return") {
            let id = self.ids.next_id();
            let start = self.location();
            self.advance();
            let value = if self.statement_ends() {
                None
            } else {
                Some(self.parse_expression())
            };
            return Some(Statement::Return(ReturnStmt {
                id,
                span: self.span_from(start),
                value,
                synthetic: false,
            }));
        }
        if token.is_keyword("throw") {
            let id = self.ids.next_id();
            let start = self.location();
            self.advance();
            let value = self.parse_expression();
            return Some(Statement::Throw(ThrowStmt {
                id,
                span: self.span_from(start),
                value,
            }));
        }
        if token.is_keyword("try") {
            return self.parse_try_catch();
        }
        if token.is_character('{') {
            let id = self.ids.next_id();
            let start = self.location();
            self.advance();
            let statements = self.parse_block_body();
            self.expect_character('}');
            return Some(Statement::Block(BlockStmt {
                id,
                span: self.span_from(start),
                statements,
            }));
        }
        // Typed local declaration: `String name = ...`
        if token.is_identifier()
            && self.peek_at(1).map(|t| t.is_identifier()).unwrap_or(false)
            && self.peek_at(2).map(|t| t.is_operator("=")).unwrap_or(false)
        {
            return self.parse_var_decl();
        }

        // Incomplete trailing `foo.`
        if token.is_name()
            && self.peek_at(1).map(|t| t.is_character('.')).unwrap_or(false)
            && self
                .peek_at(2)
                .map(|t| t.is_newline())
                .unwrap_or(self.peek_at(2).is_none())
        {
            let id = self.ids.next_id();
            let start = self.location();
            self.advance();
            self.advance();
            let span = self.span_from(start);
            return Some(Statement::Incomplete(IncompleteStmt {
                id,
                span,
                text: format!("{}.", token.str_value),
            }));
        }

        let id = self.ids.next_id();
        let start = self.location();
        let expression = self.parse_statement_expression();

        // Assignment statement
        for op in ["=", "+=", "-=", "*=", "/=", "%=", "<<="] {
            if self.check_operator(op) {
                self.advance();
                let value = self.parse_expression();
                return Some(Statement::Assignment(AssignmentStmt {
                    id,
                    span: self.span_from(start),
                    op: op.to_string(),
                    target: expression,
                    value,
                }));
            }
        }
        Some(Statement::Expr(ExprStmt {
            id,
            span: self.span_from(start),
            expression,
        }))
    }

    pub(crate) fn statement_ends(&self) -> bool {
        match self.peek() {
            None => true,
            Some(t) => t.is_newline() || t.is_character('}'),
        }
    }

    fn parse_var_decl(&mut self) -> Option<Statement> {
        let id = self.ids.next_id();
        let start = self.location();
        let is_def = self.consume_keyword("def");
        let mut names = Vec::new();
        if is_def && self.consume_character('(') {
            // def (a, b) = tuple
            loop {
                let name_id = self.ids.next_id();
                let (name, name_span) = self.expect_name();
                if name.is_empty() {
                    break;
                }
                names.push(VarDeclName { id: name_id, span: name_span, name, ty: None });
                if !self.consume_character(',') {
                    break;
                }
            }
            self.expect_character(')');
        } else {
            let mut ty = None;
            if !is_def {
                ty = Some(self.parse_type_annotation());
            } else if self.peek().map(|t| t.is_identifier()).unwrap_or(false)
                && self.peek_at(1).map(|t| t.is_identifier()).unwrap_or(false)
            {
                // def String name = ...
                ty = Some(self.parse_type_annotation());
            }
            let name_id = self.ids.next_id();
            let (name, name_span) = self.expect_name();
            if name.is_empty() {
                self.synchronize();
                return None;
            }
            names.push(VarDeclName { id: name_id, span: name_span, name, ty });
        }
        let mut initializer = None;
        if self.consume_operator("=") {
            initializer = Some(self.parse_expression());
        }
        Some(Statement::VarDecl(VarDeclStmt {
            id,
            span: self.span_from(start),
            names,
            initializer,
        }))
    }

    fn parse_if(&mut self) -> Option<Statement> {
        let id = self.ids.next_id();
        let start = self.location();
        self.advance(); // if
        self.expect_character('(');
        let condition = self.parse_expression();
        self.expect_character(')');
        self.skip_newlines();
        let then_branch = Box::new(self.parse_statement()?);
        let mut else_branch = None;
        let checkpoint = self.index;
        self.skip_newlines();
        if self.consume_keyword("else") {
            self.skip_newlines();
            else_branch = self.parse_statement().map(Box::new);
        } else {
            self.index = checkpoint;
        }
        Some(Statement::If(IfStmt {
            id,
            span: self.span_from(start),
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn parse_try_catch(&mut self) -> Option<Statement> {
        let id = self.ids.next_id();
        let start = self.location();
        self.advance(); // try
        self.skip_newlines();
        self.expect_character('{');
        let body = self.parse_block_body();
        self.expect_character('}');
        let mut catches = Vec::new();
        let mut finally = None;
        loop {
            let checkpoint = self.index;
            self.skip_newlines();
            if self.consume_keyword("catch") {
                let clause_id = self.ids.next_id();
                let clause_start = self.prev_end();
                self.expect_character('(');
                let mut ty = None;
                if self.peek().map(|t| t.is_identifier()).unwrap_or(false)
                    && self.peek_at(1).map(|t| t.is_identifier()).unwrap_or(false)
                {
                    ty = Some(self.parse_type_annotation());
                }
                let (param_name, param_span) = self.expect_name();
                self.expect_character(')');
                self.skip_newlines();
                self.expect_character('{');
                let clause_body = self.parse_block_body();
                self.expect_character('}');
                catches.push(CatchClause {
                    id: clause_id,
                    span: self.span_from(clause_start),
                    param_name,
                    param_span,
                    ty,
                    body: clause_body,
                });
                continue;
            }
            if self.consume_keyword("finally") {
                self.skip_newlines();
                self.expect_character('{');
                finally = Some(self.parse_block_body());
                self.expect_character('}');
                continue;
            }
            self.index = checkpoint;
            break;
        }
        Some(Statement::TryCatch(TryCatchStmt {
            id,
            span: self.span_from(start),
            body,
            catches,
            finally,
        }))
    }

    /// A statement-leading expression, with the command-call form
    /// (`cpus 4`, `publishDir 'out', mode: 'copy'`) layered on top.
    pub(crate) fn parse_statement_expression(&mut self) -> Expression {
        let token = match self.peek() {
            Some(t) => t.clone(),
            None => return self.empty_expression(),
        };
        if token.is_identifier() && self.starts_command_argument(1) {
            let id = self.ids.next_id();
            let start = self.location();
            self.advance();
            let (args, named_args) = self.parse_argument_list(true);
            return Expression::MethodCall(MethodCallExpr {
                id,
                span: self.span_from(start),
                receiver: None,
                name: token.str_value.clone(),
                name_span: token.span(),
                args,
                named_args,
                safe: false,
                command_form: true,
            });
        }
        self.parse_expression()
    }

    /// Does the token at `ahead` begin a command-call argument?
    fn starts_command_argument(&self, ahead: usize) -> bool {
        let Some(token) = self.peek_at(ahead) else {
            return false;
        };
        match token.token_type {
            TokenType::String | TokenType::Number => true,
            TokenType::Identifier => {
                // `foo bar` is a command call; `foo bar(...)` as well.
                // Named argument `foo mode: 'copy'` too.
                true
            }
            TokenType::Keyword => {
                matches!(token.str_value.as_str(), "true" | "false" | "null")
            }
            TokenType::Character => token.is_character('['),
            _ => false,
        }
    }

    // -- expressions ---------------------------------------------------------

    pub(crate) fn parse_expression(&mut self) -> Expression {
        self.parse_pipe()
    }

    fn empty_expression(&mut self) -> Expression {
        let id = self.ids.next_id();
        Expression::Empty(EmptyExpr { id, span: self.here() })
    }

    fn parse_pipe(&mut self) -> Expression {
        let start = self.location();
        let mut result = self.parse_ternary();
        loop {
            // A `|` may start a continuation line.
            if !self.check_operator("|") {
                match self.peek_significant() {
                    Some(token) if token.is_operator("|") => self.skip_newlines(),
                    _ => break,
                }
            }
            self.advance();
            self.skip_newlines();
            let right = self.parse_ternary();
            let id = self.ids.next_id();
            result = Expression::Binary(BinaryExpr {
                id,
                span: self.span_from(start),
                op: "|".to_string(),
                left: Box::new(result),
                right: Box::new(right),
            });
        }
        result
    }

    fn parse_ternary(&mut self) -> Expression {
        let start = self.location();
        let condition = self.parse_elvis();
        if self.check_operator("?") {
            self.advance();
            self.skip_newlines();
            let true_expr = self.parse_expression();
            self.skip_newlines();
            self.expect_character(':');
            self.skip_newlines();
            let false_expr = self.parse_expression();
            let id = self.ids.next_id();
            return Expression::Ternary(TernaryExpr {
                id,
                span: self.span_from(start),
                condition: Box::new(condition),
                true_expr: Box::new(true_expr),
                false_expr: Box::new(false_expr),
            });
        }
        condition
    }

    fn parse_elvis(&mut self) -> Expression {
        let start = self.location();
        let mut result = self.parse_or();
        while self.check_operator("?:") {
            self.advance();
            self.skip_newlines();
            let fallback = self.parse_or();
            let id = self.ids.next_id();
            result = Expression::Elvis(ElvisExpr {
                id,
                span: self.span_from(start),
                value: Box::new(result),
                fallback: Box::new(fallback),
            });
        }
        result
    }

    fn parse_binary_level(
        &mut self,
        ops: &[&str],
        next: fn(&mut Cursor) -> Expression,
    ) -> Expression {
        let start = self.location();
        let mut result = next(self);
        loop {
            let Some(token) = self.peek() else { break };
            if !token.is_any_operator() && !token.is_keyword("in") && !token.is_keyword("instanceof")
            {
                break;
            }
            let op = token.str_value.clone();
            if !ops.contains(&op.as_str()) {
                break;
            }
            self.advance();
            self.skip_newlines();
            let right = next(self);
            let id = self.ids.next_id();
            result = Expression::Binary(BinaryExpr {
                id,
                span: self.span_from(start),
                op,
                left: Box::new(result),
                right: Box::new(right),
            });
        }
        result
    }

    fn parse_or(&mut self) -> Expression {
        self.parse_binary_level(&["||"], |c| c.parse_and())
    }

    fn parse_and(&mut self) -> Expression {
        self.parse_binary_level(&["&&"], |c| c.parse_bitwise())
    }

    fn parse_bitwise(&mut self) -> Expression {
        self.parse_binary_level(&["&", "^"], |c| c.parse_equality())
    }

    fn parse_equality(&mut self) -> Expression {
        self.parse_binary_level(&["==", "!=", "<=>", "=~", "==~"], |c| c.parse_relational())
    }

    fn parse_relational(&mut self) -> Expression {
        let start = self.location();
        let mut result =
            self.parse_binary_level(&["<", ">", "<=", ">=", "in", "instanceof"], |c| {
                c.parse_range()
            });
        while self.check_keyword("as") {
            self.advance();
            let ty = self.parse_type_annotation();
            let id = self.ids.next_id();
            result = Expression::Cast(CastExpr {
                id,
                span: self.span_from(start),
                expression: Box::new(result),
                ty,
            });
        }
        result
    }

    fn parse_range(&mut self) -> Expression {
        let start = self.location();
        let from = self.parse_shift();
        for (op, exclusive) in [("..<", true), ("..", false)] {
            if self.check_operator(op) {
                self.advance();
                let to = self.parse_shift();
                let id = self.ids.next_id();
                return Expression::Range(RangeExpr {
                    id,
                    span: self.span_from(start),
                    from: Box::new(from),
                    to: Box::new(to),
                    exclusive,
                });
            }
        }
        from
    }

    fn parse_shift(&mut self) -> Expression {
        self.parse_binary_level(&["<<", ">>"], |c| c.parse_additive())
    }

    fn parse_additive(&mut self) -> Expression {
        self.parse_binary_level(&["+", "-"], |c| c.parse_multiplicative())
    }

    fn parse_multiplicative(&mut self) -> Expression {
        self.parse_binary_level(&["*", "/", "%"], |c| c.parse_power())
    }

    fn parse_power(&mut self) -> Expression {
        self.parse_binary_level(&["**"], |c| c.parse_unary())
    }

    fn parse_unary(&mut self) -> Expression {
        let start = self.location();
        for op in ["!", "-", "+", "~"] {
            if self.check_operator(op) {
                self.advance();
                let operand = self.parse_unary();
                let id = self.ids.next_id();
                return Expression::Unary(UnaryExpr {
                    id,
                    span: self.span_from(start),
                    op: op.to_string(),
                    operand: Box::new(operand),
                });
            }
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Expression {
        let start = self.location();
        let mut result = self.parse_primary();
        loop {
            // A chain may continue on the next line with a leading dot.
            if self.peek().map(|t| t.is_newline()).unwrap_or(false) {
                match self.peek_significant() {
                    Some(t) if t.is_character('.') || t.is_operator("?.") => {
                        self.skip_newlines()
                    }
                    _ => break,
                }
            }
            // Property access and method calls, including safe/spread forms.
            let (safe, spread) = if self.check_character('.') {
                (false, false)
            } else if self.check_operator("?.") {
                (true, false)
            } else if self.check_operator("*.") {
                (false, true)
            } else if self.check_character('[') {
                self.advance();
                self.skip_newlines();
                let index = self.parse_expression();
                self.skip_newlines();
                self.expect_character(']');
                let id = self.ids.next_id();
                result = Expression::Index(IndexExpr {
                    id,
                    span: self.span_from(start),
                    receiver: Box::new(result),
                    index: Box::new(index),
                });
                continue;
            } else if self.check_character('(') {
                // Direct call on a bare name: `P(1)`
                if let Expression::Variable(variable) = &result {
                    let name = variable.name.clone();
                    let name_span = variable.span;
                    self.advance();
                    let (args, named_args) = self.parse_paren_arguments();
                    let closure_args = self.parse_trailing_closures();
                    let id = self.ids.next_id();
                    let mut all_args = args;
                    all_args.extend(closure_args);
                    result = Expression::MethodCall(MethodCallExpr {
                        id,
                        span: self.span_from(start),
                        receiver: None,
                        name,
                        name_span,
                        args: all_args,
                        named_args,
                        safe: false,
                        command_form: false,
                    });
                    continue;
                }
                break;
            } else if self.check_character('{') {
                // Trailing closure on a bare name: `view { it }`
                if let Expression::Variable(variable) = &result {
                    let name = variable.name.clone();
                    let name_span = variable.span;
                    let closure = self.parse_closure();
                    let id = self.ids.next_id();
                    result = Expression::MethodCall(MethodCallExpr {
                        id,
                        span: self.span_from(start),
                        receiver: None,
                        name,
                        name_span,
                        args: vec![closure],
                        named_args: Vec::new(),
                        safe: false,
                        command_form: true,
                    });
                    continue;
                }
                break;
            } else {
                break;
            };
            self.advance(); // . ?. *.
            self.skip_newlines();
            let (name, name_span) = self.expect_name();
            if self.check_character('(') {
                self.advance();
                let (args, named_args) = self.parse_paren_arguments();
                let closure_args = self.parse_trailing_closures();
                let id = self.ids.next_id();
                let mut all_args = args;
                all_args.extend(closure_args);
                result = Expression::MethodCall(MethodCallExpr {
                    id,
                    span: self.span_from(start),
                    receiver: Some(Box::new(result)),
                    name,
                    name_span,
                    args: all_args,
                    named_args,
                    safe,
                    command_form: false,
                });
            } else if self.check_character('{') {
                let closure = self.parse_closure();
                let id = self.ids.next_id();
                result = Expression::MethodCall(MethodCallExpr {
                    id,
                    span: self.span_from(start),
                    receiver: Some(Box::new(result)),
                    name,
                    name_span,
                    args: vec![closure],
                    named_args: Vec::new(),
                    safe,
                    command_form: true,
                });
            } else {
                let id = self.ids.next_id();
                result = Expression::Property(PropertyExpr {
                    id,
                    span: self.span_from(start),
                    receiver: Box::new(result),
                    name,
                    name_span,
                    safe,
                    spread,
                });
            }
        }
        result
    }

    fn parse_paren_arguments(&mut self) -> (Vec<Expression>, Vec<NamedArg>) {
        let mut args = Vec::new();
        let mut named_args = Vec::new();
        loop {
            self.skip_newlines();
            if self.check_character(')') || self.at_end() {
                break;
            }
            self.parse_argument(&mut args, &mut named_args);
            self.skip_newlines();
            if !self.consume_character(',') {
                break;
            }
        }
        self.skip_newlines();
        self.expect_character(')');
        (args, named_args)
    }

    /// Trailing closure arguments after a call: `collectFile(name: 'x') { }`
    fn parse_trailing_closures(&mut self) -> Vec<Expression> {
        let mut closures = Vec::new();
        while self.check_character('{') {
            closures.push(self.parse_closure());
        }
        closures
    }

    fn parse_argument_list(&mut self, command_form: bool) -> (Vec<Expression>, Vec<NamedArg>) {
        let mut args = Vec::new();
        let mut named_args = Vec::new();
        loop {
            if command_form && self.statement_ends() {
                break;
            }
            self.parse_argument(&mut args, &mut named_args);
            if !self.consume_character(',') {
                break;
            }
            self.skip_newlines();
        }
        (args, named_args)
    }

    pub(crate) fn parse_argument(&mut self, args: &mut Vec<Expression>, named_args: &mut Vec<NamedArg>) {
        // Named argument: `name: expr`
        if self.peek().map(|t| t.is_name() || t.is_string()).unwrap_or(false)
            && self.peek_at(1).map(|t| t.is_character(':')).unwrap_or(false)
        {
            let id = self.ids.next_id();
            let token = self.advance().unwrap();
            self.advance(); // :
            self.skip_newlines();
            let value = self.parse_expression();
            let span = ParseSourceSpan::new(token.start, self.prev_end());
            named_args.push(NamedArg {
                id,
                span,
                name: token.str_value.clone(),
                name_span: token.span(),
                value,
            });
            return;
        }
        args.push(self.parse_expression());
    }

    pub(crate) fn parse_closure(&mut self) -> Expression {
        let id = self.ids.next_id();
        let start = self.location();
        self.expect_character('{');
        // Attempt an explicit parameter list `a, b ->`; reset on failure.
        let checkpoint = self.index;
        let checkpoint_ids = self.ids.count();
        let mut params = Vec::new();
        let mut implicit_params = true;
        self.skip_newlines();
        loop {
            if self.check_operator("->") && !params.is_empty() {
                self.advance();
                implicit_params = false;
                break;
            }
            let is_param = self.peek().map(|t| t.is_identifier()).unwrap_or(false)
                || (self.peek().map(|t| t.is_identifier()).unwrap_or(false)
                    && self.peek_at(1).map(|t| t.is_identifier()).unwrap_or(false));
            if !is_param {
                break;
            }
            let param_id = self.ids.next_id();
            let param_start = self.location();
            let mut ty = None;
            if self.peek().map(|t| t.is_identifier()).unwrap_or(false)
                && self.peek_at(1).map(|t| t.is_identifier()).unwrap_or(false)
            {
                ty = Some(self.parse_type_annotation());
            }
            let token = self.advance().unwrap();
            params.push(Param {
                id: param_id,
                span: ParseSourceSpan::new(param_start, token.end),
                name: token.str_value.clone(),
                ty,
            });
            if self.consume_character(',') {
                self.skip_newlines();
                continue;
            }
            if self.check_operator("->") {
                continue;
            }
            break;
        }
        if implicit_params {
            // Ids handed to the failed parameter attempt stay unused;
            // they only need to be unique, not dense.
            let _ = checkpoint_ids;
            self.index = checkpoint;
            params = Vec::new();
        }
        let body = self.parse_block_body();
        self.expect_character('}');
        Expression::Closure(ClosureExpr {
            id,
            span: self.span_from(start),
            params,
            implicit_params,
            body,
        })
    }

    fn parse_primary(&mut self) -> Expression {
        self.skip_newlines();
        let Some(token) = self.peek().cloned() else {
            let span = self.here();
            self.error(span, "Unexpected end of input");
            return self.empty_expression();
        };

        match token.token_type {
            TokenType::Number => {
                self.advance();
                let id = self.ids.next_id();
                let is_float = token.str_value.contains('.')
                    || token.str_value.contains('e')
                    || token.str_value.contains('E');
                let value = if is_float {
                    ConstantValue::Float(token.num_value)
                } else {
                    ConstantValue::Integer(token.num_value as i64)
                };
                Expression::Constant(ConstantExpr { id, span: token.span(), value })
            }
            TokenType::String => {
                self.advance();
                let id = self.ids.next_id();
                let parts = self.parse_interpolations(&token.interpolations);
                Expression::Str(StringExpr {
                    id,
                    span: token.span(),
                    value: token.str_value.clone(),
                    kind: token.string_kind.unwrap_or(StringTokenKind::SingleQuoted),
                    parts,
                })
            }
            TokenType::Keyword => match token.str_value.as_str() {
                "true" | "false" => {
                    self.advance();
                    let id = self.ids.next_id();
                    Expression::Constant(ConstantExpr {
                        id,
                        span: token.span(),
                        value: ConstantValue::Boolean(token.str_value == "true"),
                    })
                }
                "null" => {
                    self.advance();
                    let id = self.ids.next_id();
                    Expression::Constant(ConstantExpr {
                        id,
                        span: token.span(),
                        value: ConstantValue::Null,
                    })
                }
                "new" => {
                    // Constructor call: `new Exception('boom')`
                    self.advance();
                    let (name, name_span) = self.expect_name();
                    let mut args = Vec::new();
                    let mut named_args = Vec::new();
                    if self.consume_character('(') {
                        let (a, n) = self.parse_paren_arguments();
                        args = a;
                        named_args = n;
                    }
                    let id = self.ids.next_id();
                    Expression::MethodCall(MethodCallExpr {
                        id,
                        span: self.span_from(token.start),
                        receiver: None,
                        name,
                        name_span,
                        args,
                        named_args,
                        safe: false,
                        command_form: false,
                    })
                }
                _ => {
                    // Contextual keywords double as plain variables.
                    self.advance();
                    let id = self.ids.next_id();
                    Expression::Variable(VariableExpr {
                        id,
                        span: token.span(),
                        name: token.str_value.clone(),
                    })
                }
            },
            TokenType::Identifier => {
                self.advance();
                let id = self.ids.next_id();
                Expression::Variable(VariableExpr {
                    id,
                    span: token.span(),
                    name: token.str_value.clone(),
                })
            }
            TokenType::Character => match token.str_value.chars().next().unwrap_or('\0') {
                '(' => {
                    self.advance();
                    self.skip_newlines();
                    let first = self.parse_expression();
                    self.skip_newlines();
                    if self.consume_character(',') {
                        let mut elements = vec![first];
                        loop {
                            self.skip_newlines();
                            if self.check_character(')') {
                                break;
                            }
                            elements.push(self.parse_expression());
                            self.skip_newlines();
                            if !self.consume_character(',') {
                                break;
                            }
                        }
                        self.expect_character(')');
                        let id = self.ids.next_id();
                        return Expression::Tuple(TupleExpr {
                            id,
                            span: self.span_from(token.start),
                            elements,
                        });
                    }
                    self.expect_character(')');
                    let id = self.ids.next_id();
                    Expression::Paren(ParenExpr {
                        id,
                        span: self.span_from(token.start),
                        expression: Box::new(first),
                    })
                }
                '[' => self.parse_list_or_map(token.start),
                '{' => self.parse_closure(),
                _ => {
                    let span = self.here();
                    self.error(span, format!("Unexpected token '{}'", token.str_value));
                    self.advance();
                    self.empty_expression()
                }
            },
            TokenType::Error => {
                self.advance();
                let span = token.span();
                self.error(span, token.str_value.clone());
                self.empty_expression()
            }
            TokenType::Operator | TokenType::Newline => {
                let span = self.here();
                self.error(span, format!("Unexpected token '{}'", token.str_value));
                self.advance();
                self.empty_expression()
            }
        }
    }

    fn parse_list_or_map(&mut self, start: ParseLocation) -> Expression {
        self.advance(); // [
        self.skip_newlines();
        // Empty map literal `[:]`
        if self.check_character(':') {
            self.advance();
            self.expect_character(']');
            let id = self.ids.next_id();
            return Expression::Map(MapExpr {
                id,
                span: self.span_from(start),
                entries: Vec::new(),
            });
        }
        if self.check_character(']') {
            self.advance();
            let id = self.ids.next_id();
            return Expression::List(ListExpr {
                id,
                span: self.span_from(start),
                elements: Vec::new(),
            });
        }
        // Map when the first element is `key: value`.
        let is_map = self
            .peek()
            .map(|t| t.is_name() || t.is_string())
            .unwrap_or(false)
            && self.peek_at(1).map(|t| t.is_character(':')).unwrap_or(false);
        if is_map {
            let mut entries = Vec::new();
            loop {
                self.skip_newlines();
                if self.check_character(']') || self.at_end() {
                    break;
                }
                let entry_id = self.ids.next_id();
                let key_token = match self.peek() {
                    Some(t) if t.is_name() || t.is_string() => self.advance().unwrap(),
                    _ => {
                        let span = self.here();
                        self.error(span, "Expected a map key");
                        self.synchronize();
                        break;
                    }
                };
                self.expect_character(':');
                self.skip_newlines();
                let value = self.parse_expression();
                entries.push(MapEntry {
                    id: entry_id,
                    span: ParseSourceSpan::new(key_token.start, self.prev_end()),
                    key: key_token.str_value.clone(),
                    key_span: key_token.span(),
                    value,
                });
                self.skip_newlines();
                if !self.consume_character(',') {
                    break;
                }
            }
            self.expect_character(']');
            let id = self.ids.next_id();
            return Expression::Map(MapExpr {
                id,
                span: self.span_from(start),
                entries,
            });
        }
        let mut elements = Vec::new();
        loop {
            self.skip_newlines();
            if self.check_character(']') || self.at_end() {
                break;
            }
            elements.push(self.parse_expression());
            self.skip_newlines();
            if !self.consume_character(',') {
                break;
            }
        }
        self.expect_character(']');
        let id = self.ids.next_id();
        Expression::List(ListExpr {
            id,
            span: self.span_from(start),
            elements,
        })
    }

    /// Lower interpolation segments captured by the lexer into embedded
    /// expressions, rebased to absolute file positions.
    fn parse_interpolations(&mut self, segments: &[InterpolationSegment]) -> Vec<Expression> {
        let mut parts = Vec::new();
        for segment in segments {
            let tokens = Lexer::new().tokenize(&segment.text);
            let rebased: Vec<Token> = tokens
                .into_iter()
                .map(|mut t| {
                    t.start = rebase(t.start, segment.start);
                    t.end = rebase(t.end, segment.start);
                    t
                })
                .collect();
            if rebased.is_empty() {
                continue;
            }
            let saved_tokens = std::mem::replace(&mut self.tokens, rebased);
            let saved_index = self.index;
            self.index = 0;
            let expression = self.parse_expression();
            self.tokens = saved_tokens;
            self.index = saved_index;
            parts.push(expression);
        }
        parts
    }
}

fn rebase(loc: ParseLocation, base: ParseLocation) -> ParseLocation {
    if loc.line == 0 {
        ParseLocation::new(base.offset + loc.offset, base.line, base.col + loc.col)
    } else {
        ParseLocation::new(base.offset + loc.offset, base.line + loc.line, loc.col)
    }
}

const SECTION_LABELS: &[&str] = &[
    "input", "output", "when", "script", "shell", "exec", "stub", "topic", "take", "main",
    "emit", "publish",
];

enum ProcessSection {
    Directives,
    Input,
    Output,
    When,
    Body(ProcessBodyKind),
    Stub,
    Topic,
}

enum WorkflowSection {
    Take,
    Main,
    Emit,
    Publish,
}

enum LifecycleKind {
    OnComplete,
    OnError,
}

/// `onComplete { }` / `onError { }` command statements inside a workflow
/// body are lifecycle handlers, not operator calls.
fn lifecycle_handler(statement: &Statement) -> Option<LifecycleKind> {
    let Statement::Expr(expr_stmt) = statement else {
        return None;
    };
    let Expression::MethodCall(call) = &expr_stmt.expression else {
        return None;
    };
    if call.receiver.is_some() {
        return None;
    }
    match call.name.as_str() {
        "onComplete" => Some(LifecycleKind::OnComplete),
        "onError" => Some(LifecycleKind::OnError),
        _ => None,
    }
}

fn has_type_annotation(statement: &Statement) -> bool {
    match statement {
        Statement::VarDecl(decl) => decl.names.iter().any(|n| n.ty.is_some()),
        _ => false,
    }
}
