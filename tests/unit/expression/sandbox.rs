use super::*;

const ORBIT: &str = "fn path(t, phase) { return { x: 0.25 * cos(TAU * (t + phase)), y: 0.25 * sin(TAU * (t + phase)) }; }";

fn input(t: f64) -> MotionInput {
    MotionInput {
        t,
        phase: 0.0,
        layer_index: 0,
        base_unit: 16.0,
        motion_scale: 1.0,
    }
}

#[test]
fn validate_reports_errors_without_compiling() {
    let sandbox = Sandbox::default();
    assert_eq!(
        sandbox.validate(ORBIT, FunctionKind::Path),
        Validation {
            valid: true,
            error: None
        }
    );
    let v = sandbox.validate("fn path(t) { return { x: t, y: ", FunctionKind::Path);
    assert!(!v.valid);
    assert!(v.error.unwrap().contains("compile error"));
}

#[test]
fn compile_reuses_handle_for_identical_source() {
    let mut sandbox = Sandbox::default();
    let a = sandbox.compile(ORBIT, FunctionKind::Path).unwrap();
    let b = sandbox.compile(ORBIT, FunctionKind::Path).unwrap();
    assert_eq!(a, b);
    assert!(Arc::ptr_eq(&a.program, &b.program));
}

#[test]
fn source_hash_is_xxh3_of_the_text() {
    let mut sandbox = Sandbox::default();
    let h = sandbox.compile(ORBIT, FunctionKind::Path).unwrap();
    assert_eq!(h.source_hash(), xxh3_64(ORBIT.as_bytes()));
}

#[test]
fn evaluates_path_handle() {
    let mut sandbox = Sandbox::default();
    let h = sandbox.compile(ORBIT, FunctionKind::Path).unwrap();
    let p = sandbox.evaluate_path(&h, &input(0.25)).unwrap();
    assert!(p.x.abs() < 1e-12);
    assert!((p.y - 0.25).abs() < 1e-12);
}

#[test]
fn kind_mismatch_is_a_runtime_error() {
    let mut sandbox = Sandbox::default();
    let h = sandbox.compile(ORBIT, FunctionKind::Path).unwrap();
    assert!(matches!(
        sandbox.evaluate_scale(&h, 0.0),
        Err(EvalError::Runtime(_))
    ));
}

#[test]
fn timeout_does_not_poison_later_calls() {
    let mut sandbox = Sandbox::default();
    let spin = sandbox
        .compile(
            "fn path(t) { while (true) { } return { x: 0, y: 0 }; }",
            FunctionKind::Path,
        )
        .unwrap();
    let ok = sandbox.compile(ORBIT, FunctionKind::Path).unwrap();

    assert!(matches!(
        sandbox.evaluate_path(&spin, &input(0.0)),
        Err(EvalError::Timeout { .. })
    ));
    for i in 0..8 {
        assert!(sandbox.evaluate_path(&ok, &input(f64::from(i) / 8.0)).is_ok());
    }
}

#[test]
fn cache_is_bounded() {
    let mut sandbox = Sandbox::default();
    for i in 0..(CACHE_CAPACITY + 5) {
        let src = format!("fn scale(t) {{ return {i}; }}");
        sandbox.compile(&src, FunctionKind::Scale).unwrap();
    }
    assert_eq!(sandbox.cache.len(), CACHE_CAPACITY);
    assert_eq!(sandbox.cache_order.len(), CACHE_CAPACITY);
}
