use super::*;
use crate::animation::modes::MovementMode;
use crate::animation::resolver::ResolverState;
use crate::render::fingerprint::fingerprint_frame;
use crate::render::sink::InMemorySink;
use crate::state::delta::{Param, StateDelta};
use crate::state::model::CodeFunctions;
use crate::state::owner::DeltaSource;
use crate::state::scenes::MemorySceneStore;

fn config() -> PixliConfig {
    PixliConfig::from_json_str(r#"{"canvas": {"width": 40, "height": 24}, "fps": {"num": 30, "den": 1}}"#)
        .unwrap()
}

fn session() -> LiveSession {
    LiveSession::from_config(
        &config(),
        GeneratorState::default(),
        Arc::new(MemorySceneStore::new()),
    )
    .unwrap()
}

#[test]
fn ticks_advance_the_frame_index() {
    let mut s = session();
    let a = s.tick(Instant::now()).unwrap();
    let b = s.tick(Instant::now()).unwrap();
    assert_eq!(a.index, FrameIndex(0));
    assert_eq!(b.index, FrameIndex(1));
    assert_eq!((a.frame.width, a.frame.height), (40, 24));
    assert_eq!(s.stats().frames, 2);
}

#[test]
fn queued_deltas_land_on_the_next_tick() {
    let mut s = session();
    let handle = s.handle();
    handle
        .send(DeltaSource::Osc, StateDelta::Set(Param::MotionIntensity, 90.0))
        .unwrap();
    handle
        .send(DeltaSource::Osc, StateDelta::PaletteId("no-such-palette".into()))
        .unwrap();
    let tick = s.tick(Instant::now()).unwrap();
    assert_eq!(tick.snapshot.state.motion_intensity, 90.0);
    assert_eq!(s.stats().deltas_applied + s.stats().deltas_rejected, 2);
}

#[test]
fn same_inputs_replay_the_same_frames() {
    let mut a = session();
    let mut b = session();
    for s in [&a, &b] {
        s.handle()
            .send(DeltaSource::Ui, StateDelta::MovementMode(MovementMode::Spiral))
            .unwrap();
    }
    for _ in 0..3 {
        let fa = a.tick(Instant::now()).unwrap();
        let fb = b.tick(Instant::now()).unwrap();
        assert_eq!(fingerprint_frame(&fa.frame), fingerprint_frame(&fb.frame));
    }
}

#[test]
fn custom_code_switches_resolver_state() {
    let mut s = session();
    let code = CodeFunctions {
        path: "fn path(t) { return { x: 0.1 * sin(t * TAU), y: 0 }; }".into(),
        scale: None,
    };
    s.handle()
        .send(DeltaSource::Ui, StateDelta::CodeFunctions(code))
        .unwrap();
    s.handle()
        .send(DeltaSource::Ui, StateDelta::UseCustomMotion(true))
        .unwrap();
    s.tick(Instant::now()).unwrap();
    assert!(matches!(s.resolver().state(), ResolverState::Custom { .. }));
    assert!(s.resolver().last_error().is_none());
}

#[test]
fn render_into_feeds_the_sink() {
    let mut s = session();
    let mut sink = InMemorySink::new();
    let stats = s.render_into(4, &mut sink).unwrap();
    assert_eq!(stats.frames, 4);
    assert_eq!(sink.frames.len(), 4);
    assert!(sink.is_ended());
    assert_eq!(sink.config().map(|c| c.fps), Some(Fps { num: 30, den: 1 }));
}

#[test]
fn frame_at_matches_the_ticked_frame() {
    let mut ticking = session();
    ticking.tick(Instant::now()).unwrap();
    ticking.tick(Instant::now()).unwrap();
    let third = ticking.tick(Instant::now()).unwrap();

    let mut direct = session();
    let frame = direct.frame_at(FrameIndex(2), Instant::now()).unwrap();
    assert_eq!(fingerprint_frame(&frame), fingerprint_frame(&third.frame));
    assert_eq!(direct.stats().frames, 0);
}
