use super::*;

fn compile_err(src: &str, kind: FunctionKind) -> CompileError {
    compile_source(src, kind).unwrap_err()
}

#[test]
fn compiles_path_with_all_parameters() {
    let p = compile_source(
        "fn path(t, phase, layer, unit, s) { return { x: t * s, y: phase + layer + unit }; }",
        FunctionKind::Path,
    )
    .unwrap();
    assert_eq!(p.params, 5);
    assert_eq!(p.locals, 5);
    assert_eq!(p.ops.last(), Some(&Op::ReturnVec));
}

#[test]
fn let_bindings_get_their_own_slots() {
    let p = compile_source(
        "fn scale(t) { let a = t; if (a > 0.5) { let b = a * 2; a = b; } return a; }",
        FunctionKind::Scale,
    )
    .unwrap();
    assert_eq!(p.locals, 3);
}

#[test]
fn rejects_wrong_function_name() {
    let err = compile_err("fn scale(t) { return 1; }", FunctionKind::Path);
    assert!(err.message.contains("expected a function named 'path'"));
    assert_eq!(err.offset, 3);
}

#[test]
fn rejects_too_many_parameters() {
    let err = compile_err("fn scale(t, u) { return 1; }", FunctionKind::Scale);
    assert!(err.message.contains("at most 1"));
}

#[test]
fn rejects_identifiers_outside_the_allow_list() {
    let err = compile_err(
        "fn path(t) { return { x: window, y: 0 }; }",
        FunctionKind::Path,
    );
    assert!(err.message.contains("'window' is not available"));

    let err = compile_err(
        "fn path(t) { return { x: fetch(t), y: 0 }; }",
        FunctionKind::Path,
    );
    assert!(err.message.contains("'fetch' is not allowed"));
}

#[test]
fn rejects_wrong_return_shape() {
    let err = compile_err("fn path(t) { return t; }", FunctionKind::Path);
    assert!(err.message.contains("{ x: ..., y: ... }"));
    let err = compile_err("fn scale(t) { return { x: t, y: t }; }", FunctionKind::Scale);
    assert!(err.message.contains("must return a number"));
}

#[test]
fn rejects_missing_return() {
    let err = compile_err("fn scale(t) { let a = t; }", FunctionKind::Scale);
    assert!(err.message.contains("never returns"));
}

#[test]
fn rejects_assignment_to_undeclared_or_constant() {
    let err = compile_err("fn scale(t) { b = 1; return t; }", FunctionKind::Scale);
    assert!(err.message.contains("undeclared variable 'b'"));
    let err = compile_err("fn scale(t) { PI = 3; return t; }", FunctionKind::Scale);
    assert!(err.message.contains("constant 'PI'"));
}

#[test]
fn rejects_builtin_arity_mismatch() {
    let err = compile_err("fn scale(t) { return clamp(t, 0); }", FunctionKind::Scale);
    assert!(err.message.contains("expects 3 argument(s), got 2"));
}

#[test]
fn block_scoped_bindings_are_not_visible_outside() {
    let err = compile_err(
        "fn scale(t) { if (t > 0) { let b = 1; } return b; }",
        FunctionKind::Scale,
    );
    assert!(err.message.contains("'b' is not available"));
}

#[test]
fn rejects_shadowing_reserved_names() {
    let err = compile_err("fn scale(sin) { return 1; }", FunctionKind::Scale);
    assert!(err.message.contains("reserved"));
}

fn sum_chain(terms: usize) -> String {
    let body = vec!["1"; terms].join("+");
    format!("fn scale(t) {{ return {body}; }}")
}

#[test]
fn long_operator_chain_is_a_compile_error() {
    let src = sum_chain(20_000);
    let v = crate::expression::sandbox::Sandbox::default().validate(&src, FunctionKind::Scale);
    assert!(!v.valid);
    assert!(v.error.unwrap().contains("too many operators"));

    let err = compile_err(&sum_chain(200_000), FunctionKind::Scale);
    assert!(err.message.contains("limit 1024"));
}

#[test]
fn operator_limit_counts_across_the_whole_function() {
    let half = vec!["t"; 600].join("*");
    let src = format!("fn scale(t) {{ let a = {half}; let b = {half}; return a + b; }}");
    let err = compile_err(&src, FunctionKind::Scale);
    assert!(err.message.contains("too many operators"));
}

#[test]
fn chains_below_the_operator_limit_compile() {
    let p = compile_source(&sum_chain(400), FunctionKind::Scale).unwrap();
    assert_eq!(p.ops.last(), Some(&Op::Return));
}
