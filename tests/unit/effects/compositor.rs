use super::*;
use crate::effects::quantize::level_table;
use crate::state::palette::BuiltinPalettes;

fn canvas() -> Canvas {
    Canvas::new(24, 16).unwrap()
}

fn busy_frame() -> FrameRgba {
    let mut frame = FrameRgba::filled(canvas(), Rgb8::new(30, 40, 50)).unwrap();
    for y in 0..16 {
        for x in 0..24 {
            frame.set_pixel(x, y, [(x * 10) as u8, (y * 15) as u8, ((x + y) * 5) as u8, 255]);
        }
    }
    frame
}

fn patch(color: Rgba8, w: u32, h: u32, x0: i64, y0: i64) -> SpritePatch {
    SpritePatch {
        x0,
        y0,
        width: w,
        height: h,
        pixels: vec![color; (w * h) as usize],
    }
}

#[test]
fn passthrough_plan_is_identity() {
    let mut c = FrameCompositor::new(1);
    let original = busy_frame();
    let mut frame = original.clone();
    c.post_process(&mut frame, &CompositorPlan::passthrough(), 0.5)
        .unwrap();
    assert_eq!(frame, original);
}

#[test]
fn draw_patch_blends_and_clips() {
    let c = FrameCompositor::new(1);
    let mut frame = c.begin(canvas(), Rgb8::new(200, 200, 200)).unwrap();
    c.draw_patch(
        &mut frame,
        BlendMode::Multiply,
        &patch([128, 255, 0, 255], 4, 4, -2, -2),
    )
    .unwrap();
    assert_eq!(frame.pixel(0, 0), [100, 200, 0, 255]);
    assert_eq!(frame.pixel(2, 2), [200, 200, 200, 255]);

    let bad = SpritePatch {
        pixels: Vec::new(),
        ..patch([0; 4], 2, 2, 0, 0)
    };
    assert!(c.draw_patch(&mut frame, BlendMode::None, &bad).is_err());
}

#[test]
fn quantize_runs_after_pixelate() {
    let mut c = FrameCompositor::new(1);
    let plan = CompositorPlan {
        blend: BlendMode::None,
        pixelate: Some(PixelateStage {
            block_size: 4,
            grid: None,
        }),
        quantize: Some(ColorDepth::Bits4),
        noise: None,
    };
    let mut frame = busy_frame();
    c.post_process(&mut frame, &plan, 0.0).unwrap();
    let lut = level_table(4);
    for px in frame.data.chunks_exact(4) {
        for &v in &px[..3] {
            assert_eq!(lut[usize::from(v)], v, "pixelate averages must be re-quantized");
        }
    }
}

#[test]
fn noise_runs_last() {
    let mut c = FrameCompositor::new(9);
    let plan = CompositorPlan {
        blend: BlendMode::None,
        pixelate: None,
        quantize: Some(ColorDepth::Bits4),
        noise: Some(NoiseStage {
            kind: NoiseType::Grain,
            strength: 100.0,
            animated: false,
        }),
    };
    let mut frame = busy_frame();
    c.post_process(&mut frame, &plan, 0.0).unwrap();
    let lut = level_table(4);
    let off_level = frame
        .data
        .chunks_exact(4)
        .flat_map(|p| p[..3].to_vec())
        .any(|v| lut[usize::from(v)] != v);
    assert!(off_level, "noise must apply after quantization");
}

#[test]
fn plan_from_state_respects_toggles() {
    let palettes = BuiltinPalettes::new().unwrap();
    let mut state = GeneratorState::default();
    let plan = CompositorPlan::from_state(&state, palettes.first());
    assert!(!plan.is_enabled(Stage::Pixelate));
    assert!(!plan.is_enabled(Stage::Quantize));
    assert!(!plan.is_enabled(Stage::Noise));
    assert!(plan.is_enabled(Stage::Blend));

    state.effects.pixelate.enabled = true;
    state.effects.pixelate.grid = true;
    state.effects.pixelate.grid_brightness = 100.0;
    state.effects.quantize.enabled = true;
    state.effects.quantize.bits = ColorDepth::Bits24;
    state.effects.noise.enabled = true;
    state.effects.noise.strength = 0.0;
    let plan = CompositorPlan::from_state(&state, palettes.first());
    assert_eq!(
        plan.pixelate,
        Some(PixelateStage {
            block_size: 8,
            grid: Some(Rgb8::WHITE)
        })
    );
    assert_eq!(plan.quantize, None);
    assert_eq!(plan.noise, None);
}

#[test]
fn static_noise_differs_between_calls() {
    let mut c = FrameCompositor::new(3);
    let plan = CompositorPlan {
        noise: Some(NoiseStage {
            kind: NoiseType::Static,
            strength: 80.0,
            animated: false,
        }),
        ..CompositorPlan::passthrough()
    };
    let mut a = busy_frame();
    let mut b = busy_frame();
    c.post_process(&mut a, &plan, 0.0).unwrap();
    c.post_process(&mut b, &plan, 0.0).unwrap();
    assert_ne!(a, b);
}

#[test]
fn mismatched_buffer_is_a_resource_error() {
    let mut c = FrameCompositor::new(1);
    let mut frame = busy_frame();
    frame.data.pop();
    let err = c
        .post_process(&mut frame, &CompositorPlan::passthrough(), 0.0)
        .unwrap_err();
    assert!(err.to_string().starts_with("resource error"));
}
