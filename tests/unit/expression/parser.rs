use super::*;
use crate::expression::ast::{Expr, Stmt};

#[test]
fn parses_arithmetic_precedence() {
    let e = parse_expr("1+2*3").unwrap();
    match e {
        Expr::Binary {
            op: BinaryOp::Add,
            right,
            ..
        } => assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        )),
        other => panic!("unexpected ast: {other:?}"),
    }
}

#[test]
fn parses_calls_and_ternary() {
    let e = parse_expr("t > 0.5 ? min(1, 2) : 0").unwrap();
    match e {
        Expr::Ternary { then, .. } => match *then {
            Expr::Call { func, args, .. } => {
                assert_eq!(func, "min");
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected ast: {other:?}"),
        },
        other => panic!("unexpected ast: {other:?}"),
    }
}

#[test]
fn parses_function_with_statements() {
    let decl = parse_function(
        r#"
        fn path(t, phase) {
            let a = t * 2;
            a += phase;
            if (a > 1) { a = a - 1; } else if (a < 0) { a = 0; } else { a = a; }
            while (false) { a = 0; }
            return { y: a, x: 0 };
        }
        "#,
    )
    .unwrap();
    assert_eq!(decl.name, "path");
    assert_eq!(decl.params.len(), 2);
    assert_eq!(decl.body.len(), 5);
    assert!(matches!(decl.body[1], Stmt::Assign { op: Some(BinaryOp::Add), .. }));
    match &decl.body[4] {
        Stmt::ReturnVec { x, .. } => assert_eq!(*x, Expr::Lit(Lit::F64(0.0))),
        other => panic!("unexpected stmt: {other:?}"),
    }
}

#[test]
fn rejects_member_access() {
    let err = parse_expr("Math.sin(t)").unwrap_err();
    assert_eq!(err.offset, 4);
    assert!(err.message.contains("member access"));
}

#[test]
fn rejects_incomplete_vec_literal() {
    let err = parse_function("fn path(t) { return { x: t }; }").unwrap_err();
    assert!(err.message.contains("'x' and 'y'"));
}

#[test]
fn rejects_unclosed_block() {
    let err = parse_function("fn path(t) { let a = 1;").unwrap_err();
    assert!(err.message.contains("unclosed block"));
}

#[test]
fn rejects_trailing_input() {
    assert!(parse_function("fn scale(t) { return 1; } fn other() {}").is_err());
}

#[test]
fn rejects_runaway_nesting() {
    let src = format!("{}1{}", "(".repeat(200), ")".repeat(200));
    let err = parse_expr(&src).unwrap_err();
    assert!(err.message.contains("too deep"));
}
