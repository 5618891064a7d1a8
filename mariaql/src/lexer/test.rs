use super::*;

fn kinds(src: &str) -> Vec<TokenKind> {
    Lexer::tokenize(src, ReservedWordDialect::MariaDb)
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn integer_literals() {
    assert_eq!(
        kinds("42 0 9223372036854775807"),
        vec![
            TokenKind::Integer(42),
            TokenKind::Integer(0),
            TokenKind::Integer(i64::MAX),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn float_literals() {
    let toks = kinds("3.14 1e10 .5 1.0e-3");
    assert!(matches!(toks[0], TokenKind::Float(v) if (v - 3.14).abs() < 1e-12));
    assert!(matches!(toks[1], TokenKind::Float(v) if (v - 1e10).abs() < 1.0));
    assert!(matches!(toks[2], TokenKind::Float(v) if (v - 0.5).abs() < 1e-12));
    assert!(matches!(toks[3], TokenKind::Float(v) if (v - 1e-3).abs() < 1e-15));
}

#[test]
fn integer_overflow_is_error_token() {
    let toks = kinds("99999999999999999999");
    assert!(matches!(toks[0], TokenKind::Error(_)));
}

#[test]
fn string_literals_and_escapes() {
    assert_eq!(
        kinds("'hello' 'it''s' \"x\" \"a\"\"b\" ''"),
        vec![
            TokenKind::String("hello".into()),
            TokenKind::String("it's".into()),
            TokenKind::String("x".into()),
            TokenKind::String("a\"b".into()),
            TokenKind::String(String::new()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn unterminated_string_is_error_token() {
    let toks = kinds("'oops");
    assert!(matches!(toks[0], TokenKind::Error(_)));
    // the lexer stays total: we still get Eof
    assert_eq!(*toks.last().unwrap(), TokenKind::Eof);
}

#[test]
fn backtick_identifiers() {
    assert_eq!(
        kinds("`order` `a``b`"),
        vec![
            TokenKind::QuotedName("order".into()),
            TokenKind::QuotedName("a`b".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn keywords_are_case_insensitive() {
    assert_eq!(
        kinds("select FROM WhErE"),
        vec![
            TokenKind::Keyword("SELECT".into()),
            TokenKind::Keyword("FROM".into()),
            TokenKind::Keyword("WHERE".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn non_reserved_words_are_names() {
    assert_eq!(
        kinds("customers customerName COUNT"),
        vec![
            TokenKind::Name("customers".into()),
            TokenKind::Name("customerName".into()),
            TokenKind::Name("COUNT".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn oracle_dialect_reserves_more() {
    let toks = Lexer::tokenize("sysdate", ReservedWordDialect::MariaDb);
    assert_eq!(toks[0].kind, TokenKind::Name("sysdate".into()));
    let toks = Lexer::tokenize("sysdate", ReservedWordDialect::MariaDbOracle);
    assert_eq!(toks[0].kind, TokenKind::Keyword("SYSDATE".into()));
}

#[test]
fn operators_greedy() {
    assert_eq!(
        kinds("<= >= <> != || := << >> < > = | & ^ ~"),
        vec![
            TokenKind::Lte,
            TokenKind::Gte,
            TokenKind::Neq,
            TokenKind::Neq,
            TokenKind::Concat,
            TokenKind::Assign,
            TokenKind::ShiftLeft,
            TokenKind::ShiftRight,
            TokenKind::Lt,
            TokenKind::Gt,
            TokenKind::Eq,
            TokenKind::Pipe,
            TokenKind::Ampersand,
            TokenKind::Caret,
            TokenKind::Tilde,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn punctuation() {
    assert_eq!(
        kinds(", ( ) . ; * + - / % ?"),
        vec![
            TokenKind::Comma,
            TokenKind::LeftParen,
            TokenKind::RightParen,
            TokenKind::Dot,
            TokenKind::Semicolon,
            TokenKind::Star,
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Slash,
            TokenKind::Percent,
            TokenKind::Question,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn comments_are_skipped() {
    assert_eq!(
        kinds("SELECT -- trailing\n a /* block\n comment */ FROM b"),
        vec![
            TokenKind::Keyword("SELECT".into()),
            TokenKind::Name("a".into()),
            TokenKind::Keyword("FROM".into()),
            TokenKind::Name("b".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn qualified_identifier_tokens() {
    assert_eq!(
        kinds("c.customerName"),
        vec![
            TokenKind::Name("c".into()),
            TokenKind::Dot,
            TokenKind::Name("customerName".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn line_and_column_tracking() {
    let toks = Lexer::tokenize("SELECT\n  a", ReservedWordDialect::MariaDb);
    assert_eq!((toks[0].line, toks[0].col), (1, 1));
    assert_eq!((toks[1].line, toks[1].col), (2, 3));
}

#[test]
fn reader_peek_and_slice() {
    let toks = Lexer::tokenize("a b c d", ReservedWordDialect::MariaDb);
    let reader = TokenReader::new(&toks);
    assert_eq!(reader.peek(2).name(), Some("c"));

    let mut sub = reader.slice(1, 3);
    assert_eq!(sub.next().name(), Some("b"));
    assert_eq!(sub.next().name(), Some("c"));
    assert!(sub.at_end());
}

#[test]
fn reader_expect_mismatch_reports_position() {
    let toks = Lexer::tokenize("SELECT 1", ReservedWordDialect::MariaDb);
    let mut reader = TokenReader::new(&toks);
    reader.advance();
    let err = reader.expect_keyword("FROM").unwrap_err();
    assert_eq!(err.position, 7);
    assert_eq!(err.expected, "FROM");
}
