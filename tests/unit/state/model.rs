use super::*;

#[test]
fn default_state_is_valid() {
    let state = GeneratorState::default();
    state.validate().unwrap();
    assert_eq!(state.schema_version, SCHEMA_VERSION);
    assert_eq!(state.movement_mode, MovementMode::Drift);
}

#[test]
fn json_uses_camel_case_and_wire_enum_names() {
    let mut state = GeneratorState::default();
    state.blend_mode = BlendMode::HardLight;
    state.effects.quantize.bits = ColorDepth::Bits8;
    state.effects.noise.kind = NoiseType::Crt;
    let v = serde_json::to_value(&state).unwrap();
    assert_eq!(v["blendMode"], "HARD_LIGHT");
    assert_eq!(v["movementMode"], "drift");
    assert_eq!(v["effects"]["quantize"]["bits"], 8);
    assert_eq!(v["effects"]["noise"]["type"], "crt");
    assert!(v.get("thumbnailMode").is_none());

    let back = GeneratorState::from_json_str(&v.to_string()).unwrap();
    assert_eq!(back, state);
}

#[test]
fn missing_fields_take_defaults() {
    let state = GeneratorState::from_json_str(r#"{"schemaVersion":2,"seed":"abc"}"#).unwrap();
    assert_eq!(state.seed, "abc");
    assert_eq!(state.motion_intensity, 50.0);
}

#[test]
fn rejects_unknown_color_depth() {
    let err = GeneratorState::from_json_str(
        r#"{"schemaVersion":2,"effects":{"quantize":{"enabled":true,"bits":12}}}"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("unsupported color depth 12"));
}

#[test]
fn validate_reports_out_of_range_fields() {
    let mut state = GeneratorState::default();
    state.motion_speed = 140.0;
    let err = state.validate().unwrap_err();
    assert!(err.to_string().contains("motionSpeed must be in [0, 100]"));

    let mut state = GeneratorState::default();
    state.use_custom_motion = true;
    assert!(state.validate().is_err());

    let mut state = GeneratorState::default();
    state.schema_version = 1;
    assert!(state.validate().unwrap_err().to_string().contains("migrate"));
}

#[test]
fn normalized_clamps_into_range() {
    let mut state = GeneratorState::default();
    state.motion_intensity = -5.0;
    state.density = f64::NAN;
    state.layer_count = 0;
    state.effects.pixelate.block_size = 10_000;
    state.use_custom_motion = true;
    let state = state.normalized();
    state.validate().unwrap();
    assert_eq!(state.motion_intensity, 0.0);
    assert_eq!(state.density, GeneratorState::default().density);
    assert_eq!(state.layer_count, 1);
    assert_eq!(state.effects.pixelate.block_size, MAX_BLOCK_SIZE);
    assert!(!state.use_custom_motion);
}

#[test]
fn thumbnail_overrides_are_range_checked() {
    let mut state = GeneratorState::default();
    state.thumbnail_mode = Some(ThumbnailMode {
        primary_scale: 1e6,
        ..ThumbnailMode::default()
    });
    let err = state.validate().unwrap_err();
    assert!(err.to_string().contains("thumbnailMode.primaryScale"));

    state.thumbnail_mode = Some(ThumbnailMode {
        count: MAX_THUMBNAIL_COUNT + 1,
        ..ThumbnailMode::default()
    });
    assert!(state.validate().unwrap_err().to_string().contains("thumbnailMode.count"));

    state.thumbnail_mode = Some(ThumbnailMode {
        primary_scale: 1e6,
        secondary_scale: -3.0,
        count: u32::MAX,
        ..ThumbnailMode::default()
    });
    let state = state.normalized();
    state.validate().unwrap();
    let thumb = state.thumbnail_mode.unwrap();
    assert_eq!(thumb.primary_scale, MAX_THUMBNAIL_SCALE);
    assert_eq!(thumb.secondary_scale, 0.0);
    assert_eq!(thumb.count, MAX_THUMBNAIL_COUNT);
}

#[test]
fn color_depth_levels() {
    assert_eq!(ColorDepth::Bits4.levels(), Some(4));
    assert_eq!(ColorDepth::Bits8.levels(), Some(6));
    assert_eq!(ColorDepth::Bits16.levels(), Some(32));
    assert_eq!(ColorDepth::Bits24.levels(), None);
}

#[test]
fn blank_scale_source_is_absent() {
    let code = CodeFunctions {
        path: "fn path(t) { return { x: t, y: 0 }; }".to_owned(),
        scale: Some("   ".to_owned()),
    };
    assert!(code.has_path());
    assert!(code.scale_source().is_none());
}

#[test]
fn blend_mode_parse_is_loose_and_matches_serde_names() {
    assert_eq!(BlendMode::parse("hard-light"), Some(BlendMode::HardLight));
    assert_eq!(BlendMode::parse("softLight"), Some(BlendMode::SoftLight));
    assert_eq!(BlendMode::parse("SCREEN"), Some(BlendMode::Screen));
    assert_eq!(BlendMode::parse("dodge"), None);
    for mode in BlendMode::ALL {
        assert_eq!(
            serde_json::to_value(mode).unwrap(),
            serde_json::Value::String(mode.as_str().to_owned())
        );
    }
}
