use super::*;
use crate::foundation::core::{Canvas, Rgb8};

fn params(kind: NoiseType) -> NoiseParams {
    NoiseParams {
        kind,
        strength: 60.0,
        animated: true,
        seed: 42,
        time: 1.0,
        call: 0,
    }
}

fn grey() -> FrameRgba {
    FrameRgba::filled(Canvas::new(16, 12).unwrap(), Rgb8::new(120, 130, 140)).unwrap()
}

const ALL: [NoiseType; 5] = [
    NoiseType::Grain,
    NoiseType::Crt,
    NoiseType::Bayer,
    NoiseType::Static,
    NoiseType::Scanlines,
];

#[test]
fn zero_strength_is_identity() {
    for kind in ALL {
        let original = grey();
        let mut frame = original.clone();
        apply_noise(
            &mut frame,
            &NoiseParams {
                strength: 0.0,
                ..params(kind)
            },
        );
        assert_eq!(frame, original, "{kind:?}");
    }
}

#[test]
fn every_kind_changes_the_frame() {
    for kind in ALL {
        let mut frame = grey();
        apply_noise(&mut frame, &params(kind));
        assert_ne!(frame, grey(), "{kind:?}");
        assert!(frame.data.chunks_exact(4).all(|p| p[3] == 255));
    }
}

#[test]
fn grain_is_deterministic_for_same_inputs() {
    let a = noise_layer(&params(NoiseType::Grain), 32, 32);
    let b = noise_layer(&params(NoiseType::Grain), 32, 32);
    assert_eq!(a, b);
}

#[test]
fn animated_noise_varies_with_time_only_when_animated() {
    let p = params(NoiseType::Grain);
    let later = NoiseParams { time: 2.0, ..p };
    assert_ne!(noise_layer(&p, 16, 16), noise_layer(&later, 16, 16));

    let still = NoiseParams { animated: false, ..p };
    let still_later = NoiseParams { time: 2.0, ..still };
    assert_eq!(noise_layer(&still, 16, 16), noise_layer(&still_later, 16, 16));
}

#[test]
fn static_noise_reseeds_every_call() {
    let p = NoiseParams {
        animated: false,
        ..params(NoiseType::Static)
    };
    let next = NoiseParams { call: 1, ..p };
    assert_ne!(noise_layer(&p, 16, 16), noise_layer(&next, 16, 16));
    assert_eq!(noise_layer(&p, 16, 16), noise_layer(&p, 16, 16));
}

#[test]
fn bayer_matrix_covers_sixteen_thresholds() {
    let layer = noise_layer(
        &NoiseParams {
            animated: false,
            ..params(NoiseType::Bayer)
        },
        4,
        4,
    );
    let mut sorted = layer.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), 16);
}
