use lox::scanner::Scanner;
use lox::token::{Token, TokenType};

fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
    let scanner = Scanner::new(source);
    let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

    assert_eq!(
        tokens.len(),
        expected.len(),
        "token count mismatch for {:?}: {:?}",
        source,
        tokens
    );

    for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
        assert_eq!(actual.token_type, *expected_type);
        assert_eq!(actual.lexeme, *expected_lexeme);
    }
}

#[test]
fn single_character_symbols() {
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
fn ternary_tokens() {
    assert_token_sequence(
        "a ? b : c",
        &[
            (TokenType::IDENTIFIER, "a"),
            (TokenType::QUESTION_MARK, "?"),
            (TokenType::IDENTIFIER, "b"),
            (TokenType::COLON, ":"),
            (TokenType::IDENTIFIER, "c"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn one_or_two_character_operators() {
    assert_token_sequence(
        "! != = == < <= > >=",
        &[
            (TokenType::BANG, "!"),
            (TokenType::BANG_EQUAL, "!="),
            (TokenType::EQUAL, "="),
            (TokenType::EQUAL_EQUAL, "=="),
            (TokenType::LESS, "<"),
            (TokenType::LESS_EQUAL, "<="),
            (TokenType::GREATER, ">"),
            (TokenType::GREATER_EQUAL, ">="),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn keywords_and_identifiers() {
    assert_token_sequence(
        "var breakfast = break_time;",
        &[
            (TokenType::VAR, "var"),
            (TokenType::IDENTIFIER, "breakfast"),
            (TokenType::EQUAL, "="),
            (TokenType::IDENTIFIER, "break_time"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn break_is_a_keyword() {
    assert_token_sequence(
        "while (true) break;",
        &[
            (TokenType::WHILE, "while"),
            (TokenType::LEFT_PAREN, "("),
            (TokenType::TRUE, "true"),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::BREAK, "break"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn number_literals() {
    let tokens: Vec<Token> = Scanner::new("3.14 42").filter_map(Result::ok).collect();

    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[0].token_type, TokenType::NUMBER(0.0));
    assert!(matches!(tokens[0].token_type, TokenType::NUMBER(n) if n == 3.14));
    assert!(matches!(tokens[1].token_type, TokenType::NUMBER(n) if n == 42.0));
}

#[test]
fn trailing_dot_is_not_part_of_a_number() {
    assert_token_sequence(
        "123.",
        &[
            (TokenType::NUMBER(0.0), "123"),
            (TokenType::DOT, "."),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn string_literal_payload() {
    let tokens: Vec<Token> = Scanner::new("\"hello\"").filter_map(Result::ok).collect();

    assert_eq!(tokens.len(), 2);
    assert!(matches!(&tokens[0].token_type, TokenType::STRING(s) if s == "hello"));
    assert_eq!(tokens[0].lexeme, "\"hello\"");
}

#[test]
fn multiline_string_advances_line_counter() {
    let tokens: Vec<Token> = Scanner::new("\"a\nb\"\nx").filter_map(Result::ok).collect();

    assert_eq!(tokens.len(), 3);
    assert!(matches!(&tokens[0].token_type, TokenType::STRING(s) if s == "a\nb"));

    // The identifier after the string sits on line 3.
    assert_eq!(tokens[1].token_type, TokenType::IDENTIFIER);
    assert_eq!(tokens[1].line, 3);
}

#[test]
fn line_comments_are_skipped() {
    assert_token_sequence(
        "1 // the rest is ignored ; * /\n2",
        &[
            (TokenType::NUMBER(0.0), "1"),
            (TokenType::NUMBER(0.0), "2"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn block_comments_are_skipped() {
    assert_token_sequence(
        "1 /* a\nmultiline\ncomment */ 2",
        &[
            (TokenType::NUMBER(0.0), "1"),
            (TokenType::NUMBER(0.0), "2"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn unterminated_block_comment_runs_to_eof_silently() {
    let results: Vec<_> = Scanner::new("1 /* never closed").collect();

    assert!(results.iter().all(Result::is_ok));

    let tokens: Vec<Token> = results.into_iter().filter_map(Result::ok).collect();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[1].token_type, TokenType::EOF);
}

#[test]
fn unterminated_string_reports_opening_line() {
    let results: Vec<_> = Scanner::new("\n\"abc\ndef").collect();

    let errors: Vec<String> = results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .map(|e| e.to_string())
        .collect();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0], "[line 2] Error: Unterminated string.");
}

#[test]
fn token_display_includes_literal_payloads() {
    let tokens: Vec<Token> = Scanner::new("x = 3.0 + \"hi\"")
        .filter_map(Result::ok)
        .collect();

    assert_eq!(tokens[0].to_string(), "IDENTIFIER x null");
    assert_eq!(tokens[1].to_string(), "EQUAL = null");
    assert_eq!(tokens[2].to_string(), "NUMBER 3.0 3.0");
    assert_eq!(tokens[4].to_string(), "STRING \"hi\" hi");
}

#[test]
fn unexpected_characters_do_not_stop_scanning() {
    let results: Vec<_> = Scanner::new(",.$(#").collect();

    // COMMA, DOT, error, LEFT_PAREN, error, EOF.
    assert_eq!(results.len(), 6);

    let error_count = results.iter().filter(|r| r.is_err()).count();
    assert_eq!(error_count, 2);

    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            err.to_string().contains("Unexpected character."),
            "unexpected message: {}",
            err
        );
    }

    let tokens: Vec<Token> = results.into_iter().filter_map(Result::ok).collect();
    assert_eq!(tokens[0].token_type, TokenType::COMMA);
    assert_eq!(tokens[1].token_type, TokenType::DOT);
    assert_eq!(tokens[2].token_type, TokenType::LEFT_PAREN);
    assert_eq!(tokens[3].token_type, TokenType::EOF);
}
