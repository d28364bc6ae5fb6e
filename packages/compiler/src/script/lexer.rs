//! Script Lexer
//!
//! Tokenizes Nextflow scripts (and config files, which share the token
//! grammar) into a flat token stream for the recursive-descent parsers.
//! Malformed input never panics; it produces `Error` tokens the parsers
//! report as syntax diagnostics.

use serde::{Deserialize, Serialize};

use crate::chars;
use crate::parse_util::{ParseLocation, ParseSourceSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    Character,
    Identifier,
    Keyword,
    String,
    Operator,
    Number,
    Newline,
    Error,
}

/// String token kinds. Interpolation segments are recorded separately on
/// the token so the parser can lower them into embedded expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringTokenKind {
    SingleQuoted,
    DoubleQuoted,
    TripleSingleQuoted,
    TripleDoubleQuoted,
    Slashy,
}

/// An interpolated piece of a double-quoted or slashy string: the byte
/// range of the expression text inside the token, relative to the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationSegment {
    pub text: String,
    pub start: ParseLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub start: ParseLocation,
    pub end: ParseLocation,
    pub token_type: TokenType,
    pub num_value: f64,
    pub str_value: String,
    pub string_kind: Option<StringTokenKind>,
    pub interpolations: Vec<InterpolationSegment>,
}

impl Token {
    pub fn new(
        start: ParseLocation,
        end: ParseLocation,
        token_type: TokenType,
        num_value: f64,
        str_value: String,
    ) -> Self {
        Token {
            start,
            end,
            token_type,
            num_value,
            str_value,
            string_kind: None,
            interpolations: Vec::new(),
        }
    }

    pub fn span(&self) -> ParseSourceSpan {
        ParseSourceSpan::new(self.start, self.end)
    }

    pub fn is_character(&self, code: char) -> bool {
        self.token_type == TokenType::Character && self.str_value.chars().next() == Some(code)
    }

    pub fn is_identifier(&self) -> bool {
        self.token_type == TokenType::Identifier
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.token_type == TokenType::Keyword && self.str_value == keyword
    }

    /// Identifiers plus contextual keywords, which remain legal names.
    pub fn is_name(&self) -> bool {
        matches!(self.token_type, TokenType::Identifier | TokenType::Keyword)
    }

    pub fn is_operator(&self, operator: &str) -> bool {
        self.token_type == TokenType::Operator && self.str_value == operator
    }

    pub fn is_any_operator(&self) -> bool {
        self.token_type == TokenType::Operator
    }

    pub fn is_number(&self) -> bool {
        self.token_type == TokenType::Number
    }

    pub fn is_string(&self) -> bool {
        self.token_type == TokenType::String
    }

    pub fn is_newline(&self) -> bool {
        self.token_type == TokenType::Newline
    }

    pub fn is_error(&self) -> bool {
        self.token_type == TokenType::Error
    }

    pub fn is_interpolated(&self) -> bool {
        !self.interpolations.is_empty()
    }
}

const KEYWORDS: &[&str] = &[
    "def", "if", "else", "return", "throw", "try", "catch", "finally", "as", "in",
    "include", "from", "true", "false", "null", "instanceof", "new", "assert",
];

/// Multi-character operators, longest first so greedy matching wins.
const OPERATORS: &[&str] = &[
    "<<=", ">>=", "**=", "==~", "<=>", "...", "..<", "?.", "*.", "==", "!=", "<=", ">=",
    "&&", "||", "**", "=~", "?:", "->", "..", "<<", ">>", "+=", "-=", "*=", "/=", "%=",
    "::", "++", "--", "=", "<", ">", "!", "+", "-", "*", "/", "%", "?", "|", "&", "^",
    "~", "@",
];

pub struct Lexer;

impl Lexer {
    pub fn new() -> Self {
        Lexer
    }

    pub fn tokenize(&self, input: &str) -> Vec<Token> {
        let mut scanner = Scanner::new(input);
        let mut tokens = Vec::new();
        loop {
            match scanner.scan_token() {
                Some(token) => tokens.push(token),
                None => break,
            }
        }
        tokens
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Lexer::new()
    }
}

struct Scanner<'a> {
    input: &'a str,
    bytes: &'a [u8],
    offset: usize,
    line: usize,
    col: usize,
    /// Whether the previous significant token can end an expression. A
    /// `/` in operand position starts a slashy string, otherwise it
    /// divides.
    prev_ends_operand: bool,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Scanner {
            input,
            bytes: input.as_bytes(),
            offset: 0,
            line: 0,
            col: 0,
            prev_ends_operand: false,
        }
    }

    fn location(&self) -> ParseLocation {
        ParseLocation::new(self.offset, self.line, self.col)
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> char {
        self.input[self.offset..]
            .chars()
            .nth(ahead)
            .unwrap_or(chars::EOF)
    }

    fn advance(&mut self) -> char {
        let ch = self.peek();
        if ch == chars::EOF {
            return ch;
        }
        self.offset += ch.len_utf8();
        if ch == chars::NEWLINE {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        ch
    }

    fn at_end(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    fn scan_token(&mut self) -> Option<Token> {
        self.skip_blank();
        if self.at_end() {
            return None;
        }

        let start = self.location();
        let ch = self.peek();

        if chars::is_newline(ch) || ch == chars::SEMICOLON {
            self.advance();
            let token = Token::new(
                start,
                self.location(),
                TokenType::Newline,
                0.0,
                ch.to_string(),
            );
            self.prev_ends_operand = false;
            return Some(token);
        }

        // Shebang only at the very start of the file.
        if ch == chars::HASH && self.offset == 0 && self.peek_at(1) == chars::BANG {
            while !self.at_end() && !chars::is_newline(self.peek()) {
                self.advance();
            }
            return self.scan_token();
        }

        if chars::is_identifier_start(ch) {
            return Some(self.scan_identifier(start));
        }
        if chars::is_digit(ch) || (ch == chars::PERIOD && chars::is_digit(self.peek_at(1))) {
            return Some(self.scan_number(start));
        }
        if chars::is_quote(ch) {
            return Some(self.scan_string(start));
        }
        if ch == chars::SLASH && !self.prev_ends_operand && self.is_slashy_start() {
            return Some(self.scan_slashy_string(start));
        }

        match ch {
            '(' | ')' | '[' | ']' | '{' | '}' | ',' | '.' | ':' => {
                // '..' and '?.' style operators take precedence over the
                // bare character forms.
                if let Some(op) = self.match_operator() {
                    return Some(self.finish_operator(start, op));
                }
                self.advance();
                let token = Token::new(
                    start,
                    self.location(),
                    TokenType::Character,
                    0.0,
                    ch.to_string(),
                );
                self.prev_ends_operand = matches!(ch, ')' | ']' | '}');
                Some(token)
            }
            _ => {
                if let Some(op) = self.match_operator() {
                    return Some(self.finish_operator(start, op));
                }
                self.advance();
                self.prev_ends_operand = false;
                Some(Token::new(
                    start,
                    self.location(),
                    TokenType::Error,
                    0.0,
                    format!("Unexpected character '{}'", ch),
                ))
            }
        }
    }

    fn skip_blank(&mut self) {
        loop {
            let ch = self.peek();
            if chars::is_whitespace(ch) {
                self.advance();
                continue;
            }
            // Line comment
            if ch == chars::SLASH && self.peek_at(1) == chars::SLASH {
                while !self.at_end() && !chars::is_newline(self.peek()) {
                    self.advance();
                }
                continue;
            }
            // Block comment
            if ch == chars::SLASH && self.peek_at(1) == chars::STAR {
                self.advance();
                self.advance();
                while !self.at_end()
                    && !(self.peek() == chars::STAR && self.peek_at(1) == chars::SLASH)
                {
                    self.advance();
                }
                if !self.at_end() {
                    self.advance();
                    self.advance();
                }
                continue;
            }
            // Escaped line continuation
            if ch == chars::BACKSLASH && chars::is_newline(self.peek_at(1)) {
                self.advance();
                self.advance();
                continue;
            }
            break;
        }
    }

    fn scan_identifier(&mut self, start: ParseLocation) -> Token {
        while chars::is_identifier_part(self.peek()) {
            self.advance();
        }
        let text = &self.input[start.offset..self.offset];
        let token_type = if KEYWORDS.contains(&text) {
            TokenType::Keyword
        } else {
            TokenType::Identifier
        };
        // `true`/`false`/`null` end an operand; other keywords do not.
        self.prev_ends_operand = token_type == TokenType::Identifier
            || matches!(text, "true" | "false" | "null");
        Token::new(start, self.location(), token_type, 0.0, text.to_string())
    }

    fn scan_number(&mut self, start: ParseLocation) -> Token {
        if self.peek() == '0' && matches!(self.peek_at(1), 'x' | 'X') {
            self.advance();
            self.advance();
            while self.peek().is_ascii_hexdigit() || self.peek() == chars::UNDERSCORE {
                self.advance();
            }
        } else {
            while chars::is_digit(self.peek()) || self.peek() == chars::UNDERSCORE {
                self.advance();
            }
            if self.peek() == chars::PERIOD && chars::is_digit(self.peek_at(1)) {
                self.advance();
                while chars::is_digit(self.peek()) || self.peek() == chars::UNDERSCORE {
                    self.advance();
                }
            }
            if matches!(self.peek(), 'e' | 'E') && {
                let next = self.peek_at(1);
                chars::is_digit(next)
                    || ((next == chars::PLUS || next == chars::MINUS)
                        && chars::is_digit(self.peek_at(2)))
            } {
                self.advance();
                if matches!(self.peek(), '+' | '-') {
                    self.advance();
                }
                while chars::is_digit(self.peek()) {
                    self.advance();
                }
            }
        }
        let raw = &self.input[start.offset..self.offset];
        let cleaned: String = raw.chars().filter(|c| *c != chars::UNDERSCORE).collect();
        let value = if let Some(hex) = cleaned.strip_prefix("0x").or(cleaned.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16).map(|v| v as f64).unwrap_or(0.0)
        } else {
            cleaned.parse::<f64>().unwrap_or(0.0)
        };
        self.prev_ends_operand = true;
        // The raw spelling stays in str_value; the parser derives the
        // integer/float split from it.
        Token::new(start, self.location(), TokenType::Number, value, raw.to_string())
    }

    fn scan_string(&mut self, start: ParseLocation) -> Token {
        let quote = self.peek();
        let triple = self.peek_at(1) == quote && self.peek_at(2) == quote;
        let kind = match (quote, triple) {
            (q, false) if q == chars::SQ => StringTokenKind::SingleQuoted,
            (q, true) if q == chars::SQ => StringTokenKind::TripleSingleQuoted,
            (_, false) => StringTokenKind::DoubleQuoted,
            (_, true) => StringTokenKind::TripleDoubleQuoted,
        };
        self.advance();
        if triple {
            self.advance();
            self.advance();
        }
        let interpolating = quote == chars::DQ;
        let mut value = String::new();
        let mut interpolations = Vec::new();
        loop {
            let ch = self.peek();
            if ch == chars::EOF {
                self.prev_ends_operand = true;
                return Token::new(
                    start,
                    self.location(),
                    TokenType::Error,
                    0.0,
                    "Unterminated string".to_string(),
                );
            }
            if !triple && chars::is_newline(ch) {
                self.prev_ends_operand = true;
                return Token::new(
                    start,
                    self.location(),
                    TokenType::Error,
                    0.0,
                    "Unterminated string".to_string(),
                );
            }
            if ch == quote {
                if !triple {
                    self.advance();
                    break;
                }
                if self.peek_at(1) == quote && self.peek_at(2) == quote {
                    self.advance();
                    self.advance();
                    self.advance();
                    break;
                }
                value.push(self.advance());
                continue;
            }
            if ch == chars::BACKSLASH {
                self.advance();
                let escaped = self.advance();
                value.push(unescape(escaped));
                continue;
            }
            if interpolating && ch == chars::DOLLAR {
                if let Some(segment) = self.scan_interpolation() {
                    value.push_str(&format!("${{{}}}", segment.text));
                    interpolations.push(segment);
                    continue;
                }
            }
            value.push(self.advance());
        }
        self.prev_ends_operand = true;
        let mut token = Token::new(start, self.location(), TokenType::String, 0.0, value);
        token.string_kind = Some(kind);
        token.interpolations = interpolations;
        token
    }

    /// Scan `$name`, `$name.prop` or `${expr}` inside an interpolating
    /// string. The cursor sits on the `$`.
    fn scan_interpolation(&mut self) -> Option<InterpolationSegment> {
        let next = self.peek_at(1);
        if next == chars::LBRACE {
            self.advance(); // $
            self.advance(); // {
            let expr_start = self.location();
            let mut depth = 1usize;
            let text_start = self.offset;
            loop {
                let ch = self.peek();
                if ch == chars::EOF {
                    return None;
                }
                if ch == chars::LBRACE {
                    depth += 1;
                } else if ch == chars::RBRACE {
                    depth -= 1;
                    if depth == 0 {
                        let text = self.input[text_start..self.offset].to_string();
                        self.advance(); // }
                        return Some(InterpolationSegment { text, start: expr_start });
                    }
                }
                self.advance();
            }
        }
        if chars::is_identifier_start(next) && next != chars::DOLLAR {
            self.advance(); // $
            let expr_start = self.location();
            let text_start = self.offset;
            while chars::is_identifier_part(self.peek()) {
                self.advance();
            }
            // Dotted continuation: $params.outdir
            while self.peek() == chars::PERIOD && chars::is_identifier_start(self.peek_at(1)) {
                self.advance();
                while chars::is_identifier_part(self.peek()) {
                    self.advance();
                }
            }
            let text = self.input[text_start..self.offset].to_string();
            return Some(InterpolationSegment { text, start: expr_start });
        }
        None
    }

    /// A slashy string needs a closing `/` before the end of the line to
    /// disambiguate from division against a missing operand.
    fn is_slashy_start(&self) -> bool {
        let rest = &self.input[self.offset + 1..];
        let next = rest.chars().next().unwrap_or(chars::EOF);
        if next == chars::SLASH || next == chars::STAR || next == chars::EOF {
            return false;
        }
        let mut escaped = false;
        for ch in rest.chars() {
            if chars::is_newline(ch) {
                return false;
            }
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                c if c == chars::BACKSLASH => escaped = true,
                c if c == chars::SLASH => return true,
                _ => {}
            }
        }
        false
    }

    fn scan_slashy_string(&mut self, start: ParseLocation) -> Token {
        self.advance(); // opening /
        let mut value = String::new();
        let mut interpolations = Vec::new();
        loop {
            let ch = self.peek();
            if ch == chars::EOF || chars::is_newline(ch) {
                self.prev_ends_operand = true;
                return Token::new(
                    start,
                    self.location(),
                    TokenType::Error,
                    0.0,
                    "Unterminated slashy string".to_string(),
                );
            }
            if ch == chars::BACKSLASH && self.peek_at(1) == chars::SLASH {
                self.advance();
                value.push(self.advance());
                continue;
            }
            if ch == chars::SLASH {
                self.advance();
                break;
            }
            if ch == chars::DOLLAR {
                if let Some(segment) = self.scan_interpolation() {
                    value.push_str(&format!("${{{}}}", segment.text));
                    interpolations.push(segment);
                    continue;
                }
            }
            value.push(self.advance());
        }
        self.prev_ends_operand = true;
        let mut token = Token::new(start, self.location(), TokenType::String, 0.0, value);
        token.string_kind = Some(StringTokenKind::Slashy);
        token.interpolations = interpolations;
        token
    }

    fn match_operator(&self) -> Option<&'static str> {
        let rest = &self.input[self.offset..];
        OPERATORS.iter().copied().find(|op| rest.starts_with(op))
    }

    fn finish_operator(&mut self, start: ParseLocation, op: &'static str) -> Token {
        for _ in 0..op.chars().count() {
            self.advance();
        }
        // Postfix ++/-- end an operand, everything else expects one.
        self.prev_ends_operand = matches!(op, "++" | "--");
        Token::new(
            start,
            self.location(),
            TokenType::Operator,
            0.0,
            op.to_string(),
        )
    }
}

fn unescape(code: char) -> char {
    match code {
        'n' => chars::NEWLINE,
        't' => chars::TAB,
        'r' => chars::RETURN,
        '0' => chars::EOF,
        other => other,
    }
}
