use super::*;

fn kinds(src: &str) -> Vec<TokenKind> {
    lex(src).unwrap().into_iter().map(|t| t.kind).collect()
}

#[test]
fn lexes_keywords_and_punctuation() {
    assert_eq!(
        kinds("fn path(t) { return { x: t, y: 0 }; }"),
        vec![
            TokenKind::Fn,
            TokenKind::Ident("path".to_owned()),
            TokenKind::LParen,
            TokenKind::Ident("t".to_owned()),
            TokenKind::RParen,
            TokenKind::LBrace,
            TokenKind::Return,
            TokenKind::LBrace,
            TokenKind::Ident("x".to_owned()),
            TokenKind::Colon,
            TokenKind::Ident("t".to_owned()),
            TokenKind::Comma,
            TokenKind::Ident("y".to_owned()),
            TokenKind::Colon,
            TokenKind::Number(0.0),
            TokenKind::RBrace,
            TokenKind::Semicolon,
            TokenKind::RBrace,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn lexes_numbers_and_compound_assignment() {
    assert_eq!(
        kinds("a += .5e1 * 2.25"),
        vec![
            TokenKind::Ident("a".to_owned()),
            TokenKind::PlusAssign,
            TokenKind::Number(5.0),
            TokenKind::Star,
            TokenKind::Number(2.25),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn skips_line_comments() {
    assert_eq!(
        kinds("1 // trailing\n+ 2"),
        vec![
            TokenKind::Number(1.0),
            TokenKind::Plus,
            TokenKind::Number(2.0),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn rejects_unknown_characters_with_offset() {
    let err = lex("a # b").unwrap_err();
    assert_eq!(err.offset, 2);
    assert!(err.message.contains('#'));
}

#[test]
fn rejects_non_ascii_without_panicking() {
    let err = lex("x = π").unwrap_err();
    assert_eq!(err.offset, 4);
}

#[test]
fn rejects_bad_exponent() {
    assert!(lex("1e+").is_err());
}
