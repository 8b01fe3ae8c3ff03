#[cfg(test)]
mod scanner_tests {
    use rox::error::LoxError;
    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn assert_token_matches(
        result: &Result<Token, LoxError>,
        expected_type: TokenType,
        expected_lexeme: &str,
    ) {
        match result {
            Ok(token) => {
                assert_eq!(
                    token.token_type, expected_type,
                    "Expected token type {:?}, got {:?}",
                    expected_type, token.token_type
                );
                assert_eq!(
                    token.lexeme, expected_lexeme,
                    "Expected lexeme '{}', got '{}'",
                    expected_lexeme, token.lexeme
                );
            }
            Err(e) => panic!("Expected token but got error: {}", e),
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >= /",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "and class else false for fun if nil or print return super this true var while orchid _x1",
            &[
                (TokenType::AND, "and"),
                (TokenType::CLASS, "class"),
                (TokenType::ELSE, "else"),
                (TokenType::FALSE, "false"),
                (TokenType::FOR, "for"),
                (TokenType::FUN, "fun"),
                (TokenType::IF, "if"),
                (TokenType::NIL, "nil"),
                (TokenType::OR, "or"),
                (TokenType::PRINT, "print"),
                (TokenType::RETURN, "return"),
                (TokenType::SUPER, "super"),
                (TokenType::THIS, "this"),
                (TokenType::TRUE, "true"),
                (TokenType::VAR, "var"),
                (TokenType::WHILE, "while"),
                (TokenType::IDENTIFIER, "orchid"),
                (TokenType::IDENTIFIER, "_x1"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_integer_literal() {
        let (tokens, diagnostics) = scan("192304");

        assert!(diagnostics.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].token_type, TokenType::NUMBER(0.0));
        assert_eq!(tokens[0].literal(), Some(Literal::Number(192304.0)));
        assert_eq!(tokens[0].to_string(), "NUMBER 192304 192304.0");
    }

    #[test]
    fn test_scanner_05_fraction_and_trailing_dot() {
        let (tokens, diagnostics) = scan("3.25 7.");

        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].literal(), Some(Literal::Number(3.25)));
        assert_eq!(tokens[0].to_string(), "NUMBER 3.25 3.25");

        // The dot is not part of the number when no digit follows it.
        assert_eq!(tokens[1].literal(), Some(Literal::Number(7.0)));
        assert_eq!(tokens[2].token_type, TokenType::DOT);
    }

    #[test]
    fn test_scanner_06_string_literal() {
        let (tokens, diagnostics) = scan("\"hello world\"");

        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].lexeme, "\"hello world\"");
        assert_eq!(tokens[0].literal(), Some(Literal::Str("hello world")));
        assert_eq!(
            tokens[0].to_string(),
            "STRING \"hello world\" hello world"
        );
    }

    #[test]
    fn test_scanner_07_multiline_string_counts_lines() {
        let (tokens, diagnostics) = scan("\"a\nb\"\nx");

        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].literal(), Some(Literal::Str("a\nb")));
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_scanner_08_unterminated_string() {
        let (tokens, diagnostics) = scan("\"abc");

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, TokenType::EOF);

        assert_eq!(diagnostics.len(), 1);
        let error = diagnostics.iter().next().map(|e| e.to_string());
        assert_eq!(error.as_deref(), Some("[line 1] Error: Unterminated string."));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        let results: Vec<_> = scanner.collect();

        // COMMA, DOT, error for '$', LEFT_PAREN, error for '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert_eq!(err.to_string(), "[line 1] Error: Unexpected character.");
        }
    }

    #[test]
    fn test_scanner_09_multibyte_character_reported_once() {
        let (tokens, diagnostics) = scan("é;");

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(tokens[0].token_type, TokenType::SEMICOLON);
    }

    #[test]
    fn test_scanner_10_number_followed_by_letter() {
        let (tokens, diagnostics) = scan("123abc");

        assert_eq!(diagnostics.len(), 1);
        let message = diagnostics.iter().next().map(|e| e.message());
        assert_eq!(message.as_deref(), Some("Unexpected character in number."));

        // No NUMBER token is produced; the letters come back as an identifier.
        assert!(tokens
            .iter()
            .all(|t| t.token_type != TokenType::NUMBER(0.0)));
        assert_token_sequence(
            "123abc",
            &[(TokenType::IDENTIFIER, "abc"), (TokenType::EOF, "")],
        );
    }

    #[test]
    fn test_scanner_11_comments_and_lines() {
        let source = "var a = 1; // trailing comment\n// whole line\n\nprint a;";
        let (tokens, diagnostics) = scan(source);

        assert!(diagnostics.is_empty());

        let print = tokens
            .iter()
            .find(|t| t.token_type == TokenType::PRINT)
            .map(|t| t.line);
        assert_eq!(print, Some(4));

        let eof = tokens.last().map(|t| (t.token_type.name(), t.line));
        assert_eq!(eof, Some(("EOF", 4)));
    }

    #[test]
    fn test_scanner_12_comment_at_end_of_input() {
        assert_token_sequence("+ // nothing after", &[(TokenType::PLUS, "+"), (TokenType::EOF, "")]);
    }

    #[test]
    fn test_scanner_13_exactly_one_eof_and_fused() {
        let mut scanner = Scanner::new("");

        assert!(matches!(scanner.next(), Some(Ok(ref t)) if t.token_type == TokenType::EOF));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_scanner_14_display_without_literal() {
        let (tokens, _) = scan("var");

        assert_eq!(tokens[0].to_string(), "VAR var null");
        assert_eq!(tokens[1].to_string(), "EOF  null");
    }

    #[test]
    fn test_scanner_15_json_shape() {
        let (tokens, _) = scan("(\"s\"");

        let json = serde_json::to_value(&tokens[1]).unwrap_or_default();
        assert_eq!(json["lexeme"], "\"s\"");
        assert_eq!(json["line"], 1);
        assert_eq!(json["token_type"]["STRING"], "s");
    }
}
