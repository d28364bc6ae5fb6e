//! Lexer Tests
//!
//! Token-level behavior of the script lexer: identifiers, keywords,
//! numbers, the string kinds with interpolation capture, operators,
//! statement separators, and error tokens for malformed input.

#[cfg(test)]
mod tests {
    use nextflow_compiler::script::lexer::{Lexer, StringTokenKind, Token, TokenType};

    fn lex(text: &str) -> Vec<Token> {
        Lexer::new().tokenize(text)
    }

    fn expect_token(token: &Token, offset: usize, end: usize) {
        assert_eq!(token.start.offset, offset, "token start mismatch");
        assert_eq!(token.end.offset, end, "token end mismatch");
    }

    fn expect_identifier(token: &Token, offset: usize, end: usize, name: &str) {
        expect_token(token, offset, end);
        assert!(token.is_identifier(), "expected identifier, got {:?}", token);
        assert_eq!(token.str_value, name);
    }

    fn expect_keyword(token: &Token, keyword: &str) {
        assert!(token.is_keyword(keyword), "expected keyword '{}', got {:?}", keyword, token);
    }

    fn expect_operator(token: &Token, operator: &str) {
        assert!(
            token.is_operator(operator),
            "expected operator '{}', got {:?}",
            operator,
            token
        );
    }

    fn expect_number(token: &Token, value: f64) {
        assert!(token.is_number(), "expected number, got {:?}", token);
        assert!((token.num_value - value).abs() < f64::EPSILON);
    }

    #[test]
    fn should_tokenize_a_simple_identifier() {
        let tokens = lex("ch");
        assert_eq!(tokens.len(), 1);
        expect_identifier(&tokens[0], 0, 2, "ch");
    }

    #[test]
    fn should_tokenize_keywords_and_identifiers() {
        let tokens = lex("def x = true");
        assert_eq!(tokens.len(), 4);
        expect_keyword(&tokens[0], "def");
        expect_identifier(&tokens[1], 4, 5, "x");
        expect_operator(&tokens[2], "=");
        expect_keyword(&tokens[3], "true");
    }

    #[test]
    fn should_tokenize_dotted_access_as_separate_tokens() {
        let tokens = lex("params.outdir");
        assert_eq!(tokens.len(), 3);
        expect_identifier(&tokens[0], 0, 6, "params");
        assert!(tokens[1].is_character('.'));
        expect_identifier(&tokens[2], 7, 13, "outdir");
    }

    #[test]
    fn should_tokenize_numbers() {
        let tokens = lex("42 3.14 0x1F 1_000");
        expect_number(&tokens[0], 42.0);
        expect_number(&tokens[1], 3.14);
        expect_number(&tokens[2], 31.0);
        expect_number(&tokens[3], 1000.0);
    }

    #[test]
    fn should_keep_the_raw_spelling_of_numbers() {
        let tokens = lex("3.14");
        assert_eq!(tokens[0].str_value, "3.14");
    }

    #[test]
    fn should_tokenize_single_quoted_strings() {
        let tokens = lex("'hello world'");
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_string());
        assert_eq!(tokens[0].str_value, "hello world");
        assert_eq!(tokens[0].string_kind, Some(StringTokenKind::SingleQuoted));
        assert!(!tokens[0].is_interpolated());
    }

    #[test]
    fn should_capture_interpolation_in_double_quoted_strings() {
        let tokens = lex("\"count: ${x + 1}\"");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].string_kind, Some(StringTokenKind::DoubleQuoted));
        assert_eq!(tokens[0].interpolations.len(), 1);
        assert_eq!(tokens[0].interpolations[0].text, "x + 1");
    }

    #[test]
    fn should_capture_dollar_name_interpolation() {
        let tokens = lex("\"dir: $params.outdir\"");
        assert_eq!(tokens[0].interpolations.len(), 1);
        assert_eq!(tokens[0].interpolations[0].text, "params.outdir");
    }

    #[test]
    fn should_not_interpolate_single_quoted_strings() {
        let tokens = lex("'$x'");
        assert!(!tokens[0].is_interpolated());
        assert_eq!(tokens[0].str_value, "$x");
    }

    #[test]
    fn should_tokenize_triple_quoted_strings_across_lines() {
        let tokens = lex("\"\"\"\n  echo hi\n  \"\"\"");
        assert_eq!(tokens.len(), 1);
        assert_eq!(
            tokens[0].string_kind,
            Some(StringTokenKind::TripleDoubleQuoted)
        );
        assert!(tokens[0].str_value.contains("echo hi"));
    }

    #[test]
    fn should_tokenize_a_slashy_string_in_operand_position() {
        let tokens = lex("x = /fastq$/");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].string_kind, Some(StringTokenKind::Slashy));
        assert_eq!(tokens[2].str_value, "fastq$");
    }

    #[test]
    fn should_tokenize_division_after_an_operand() {
        let tokens = lex("a / b");
        assert_eq!(tokens.len(), 3);
        expect_operator(&tokens[1], "/");
    }

    #[test]
    fn should_tokenize_multi_character_operators_greedily() {
        let tokens = lex("a <= b ==~ c ?: d");
        expect_operator(&tokens[1], "<=");
        expect_operator(&tokens[3], "==~");
        expect_operator(&tokens[5], "?:");
    }

    #[test]
    fn should_tokenize_ranges() {
        let tokens = lex("1..5 1..<5");
        expect_operator(&tokens[1], "..");
        expect_operator(&tokens[4], "..<");
    }

    #[test]
    fn should_emit_newline_tokens_for_separators() {
        let tokens = lex("a\nb;c");
        assert_eq!(tokens.len(), 5);
        assert!(tokens[1].is_newline());
        assert!(tokens[3].is_newline());
    }

    #[test]
    fn should_skip_line_and_block_comments() {
        let tokens = lex("a // trailing\n/* block */ b");
        let names: Vec<&str> = tokens
            .iter()
            .filter(|t| t.is_identifier())
            .map(|t| t.str_value.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn should_skip_a_shebang_line() {
        let tokens = lex("#!/usr/bin/env nextflow\nx");
        assert!(tokens.iter().any(|t| t.is_identifier() && t.str_value == "x"));
        assert!(!tokens.iter().any(|t| t.token_type == TokenType::Error));
    }

    #[test]
    fn should_produce_an_error_token_for_an_unterminated_string() {
        let tokens = lex("'abc");
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_error());
        assert!(tokens[0].str_value.contains("Unterminated"));
    }

    #[test]
    fn should_track_line_and_column_positions() {
        let tokens = lex("a\n  b");
        assert_eq!(tokens[0].start.line, 0);
        assert_eq!(tokens[2].start.line, 1);
        assert_eq!(tokens[2].start.col, 2);
    }

    #[test]
    fn should_tokenize_the_same_input_identically_twice() {
        let first = lex("process foo { cpus 4 }");
        let second = lex("process foo { cpus 4 }");
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.token_type, b.token_type);
            assert_eq!(a.str_value, b.str_value);
            assert_eq!(a.start, b.start);
        }
    }
}
