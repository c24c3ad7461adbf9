use super::*;
use crate::state::delta::Param;

#[test]
fn empty_object_is_the_default_config() {
    let config = PixliConfig::from_json_str("{}").unwrap();
    assert_eq!(config, PixliConfig::default());
    assert!(!config.websocket.enabled);
    assert!(!config.osc.enabled);
    assert!(!config.dmx.enabled);
    assert_eq!(config.debounce(), Duration::from_millis(500));
    assert_eq!(config.sandbox.budget(), EvalBudget::default());
}

#[test]
fn named_sections_enable_their_adapter() {
    let config = PixliConfig::from_json_str(
        r#"{
            "canvas": {"width": 320, "height": 240},
            "fps": {"num": 30, "den": 1},
            "timing": {"duration": 8.0, "loop": false},
            "websocket": {"url": "ws://10.0.0.2:9001"},
            "osc": {"bind": "127.0.0.1:9100", "replyTo": "127.0.0.1:9101"},
            "midi": {"ccMappings": [{"controller": 7, "param": "density"}]},
            "dmx": {"enabled": true, "target": "10.0.0.9:6454", "universe": 2}
        }"#,
    )
    .unwrap();
    assert_eq!(config.canvas, Canvas { width: 320, height: 240 });
    assert!(!config.timing.looping);
    assert!(config.websocket.enabled);
    assert_eq!(config.websocket.reconnect.max_attempts, 5);
    assert!(config.osc.enabled);
    assert_eq!(config.osc.reply_to, Some("127.0.0.1:9101".parse().unwrap()));
    assert_eq!(config.midi.cc_mappings[0].param, Param::Density);
    assert_eq!(config.dmx.universe, 2);
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(PixliConfig::from_json_str(r#"{"canvass": {}}"#).is_err());
    assert!(PixliConfig::from_json_str(r#"{"osc": {"port": 1}}"#).is_err());
}

#[test]
fn validation_catches_bad_values() {
    for json in [
        r#"{"canvas": {"width": 0, "height": 10}}"#,
        r#"{"canvas": {"width": 10000, "height": 10}}"#,
        r#"{"fps": {"num": 30, "den": 0}}"#,
        r#"{"fps": {"num": 1000, "den": 1}}"#,
        r#"{"timing": {"duration": 0.0, "loop": true}}"#,
        r#"{"sandbox": {"maxInstructions": 0}}"#,
        r#"{"websocket": {"url": "http://example.com"}}"#,
        r#"{"dmx": {"universe": 40000}}"#,
        r#"{"midi": {"ccMappings": [{"controller": 1, "param": "density"}, {"controller": 1, "param": "spriteSize"}]}}"#,
        r#"{"midi": {"ccMappings": [{"controller": 200, "param": "density"}]}}"#,
    ] {
        let err = PixliConfig::from_json_str(json).unwrap_err();
        assert!(err.to_string().starts_with("validation error"), "{json}: {err}");
    }
}

#[test]
fn load_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pixli.json");
    std::fs::write(&path, r#"{"debounceMs": 250}"#).unwrap();
    let config = PixliConfig::load(&path).unwrap();
    assert_eq!(config.debounce(), Duration::from_millis(250));

    let missing = PixliConfig::load(&dir.path().join("nope.json")).unwrap_err();
    assert!(missing.to_string().contains("nope.json"));
}
