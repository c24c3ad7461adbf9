use super::*;

#[test]
fn speed_maps_linearly_onto_engine_units() {
    assert_eq!(speed_units(0.0), 0.0);
    assert_eq!(speed_units(100.0), 12.5);
    assert_eq!(speed_units(50.0), 6.25);
    assert_eq!(speed_units(400.0), 12.5);
}

#[test]
fn intensity_maps_to_unit_scale() {
    assert_eq!(motion_scale(50.0), 0.5);
    assert_eq!(motion_scale(-3.0), 0.0);
}

#[test]
fn looping_progress_wraps() {
    let timing = CycleTiming {
        duration: 12.5,
        looping: true,
    };
    assert!((timing.progress(0.5, 100.0) - 0.5).abs() < 1e-12);
    assert!((timing.progress(1.25, 100.0) - 0.25).abs() < 1e-12);
    assert!(timing.progress(1.0, 100.0) < 1.0);
}

#[test]
fn non_looping_progress_holds_at_one() {
    let timing = CycleTiming {
        duration: 12.5,
        looping: false,
    };
    assert_eq!(timing.progress(3.0, 100.0), 1.0);
    assert!((timing.progress(0.5, 100.0) - 0.5).abs() < 1e-12);
}

#[test]
fn degenerate_inputs_yield_zero() {
    let timing = CycleTiming {
        duration: 0.0,
        looping: true,
    };
    assert_eq!(timing.progress(2.0, 50.0), 0.0);
    assert_eq!(CycleTiming::default().progress(f64::NAN, 50.0), 0.0);
    assert_eq!(CycleTiming::default().progress(5.0, 0.0), 0.0);
}

#[test]
fn serde_uses_loop_key() {
    let v = serde_json::to_value(CycleTiming::default()).unwrap();
    assert_eq!(v["loop"], true);
}
