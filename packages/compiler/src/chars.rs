//! Character constants shared by the script and config lexers

// Special characters
pub const EOF: char = '\0';
pub const TAB: char = '\t';
pub const NEWLINE: char = '\n';
pub const RETURN: char = '\r';
pub const SPACE: char = ' ';

// Punctuation
pub const BANG: char = '!';
pub const DQ: char = '"';
pub const HASH: char = '#';
pub const DOLLAR: char = '$';
pub const PERCENT: char = '%';
pub const AMPERSAND: char = '&';
pub const SQ: char = '\'';
pub const LPAREN: char = '(';
pub const RPAREN: char = ')';
pub const STAR: char = '*';
pub const PLUS: char = '+';
pub const COMMA: char = ',';
pub const MINUS: char = '-';
pub const PERIOD: char = '.';
pub const SLASH: char = '/';
pub const COLON: char = ':';
pub const SEMICOLON: char = ';';
pub const LT: char = '<';
pub const EQ: char = '=';
pub const GT: char = '>';
pub const QUESTION: char = '?';
pub const AT: char = '@';

// Brackets and braces
pub const LBRACKET: char = '[';
pub const BACKSLASH: char = '\\';
pub const RBRACKET: char = ']';
pub const CARET: char = '^';
pub const UNDERSCORE: char = '_';
pub const LBRACE: char = '{';
pub const BAR: char = '|';
pub const RBRACE: char = '}';
pub const TILDE: char = '~';

pub fn is_whitespace(code: char) -> bool {
    code == SPACE || code == TAB || code == RETURN
}

pub fn is_newline(code: char) -> bool {
    code == NEWLINE
}

pub fn is_digit(code: char) -> bool {
    code.is_ascii_digit()
}

pub fn is_identifier_start(code: char) -> bool {
    code.is_ascii_alphabetic() || code == UNDERSCORE || code == DOLLAR
}

pub fn is_identifier_part(code: char) -> bool {
    code.is_ascii_alphanumeric() || code == UNDERSCORE || code == DOLLAR
}

pub fn is_quote(code: char) -> bool {
    code == DQ || code == SQ
}
