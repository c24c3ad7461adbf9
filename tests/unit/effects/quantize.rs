use super::*;

fn ramp() -> FrameRgba {
    let mut data = Vec::new();
    for v in 0..=255u8 {
        data.extend_from_slice(&[v, 255 - v, v / 2, v]);
    }
    FrameRgba::from_raw(256, 1, data).unwrap()
}

fn distinct(frame: &FrameRgba) -> usize {
    let mut seen: Vec<u8> = frame.data.chunks_exact(4).map(|p| p[0]).collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

#[test]
fn full_depth_is_identity() {
    let original = ramp();
    let mut frame = original.clone();
    quantize_in_place(&mut frame, ColorDepth::Bits24);
    assert_eq!(frame, original);
}

#[test]
fn level_counts_per_depth() {
    for (depth, levels) in [
        (ColorDepth::Bits4, 4),
        (ColorDepth::Bits8, 6),
        (ColorDepth::Bits16, 32),
    ] {
        let mut frame = ramp();
        quantize_in_place(&mut frame, depth);
        assert_eq!(distinct(&frame), levels, "{depth:?}");
    }
}

#[test]
fn four_levels_round_to_nearest_step() {
    let lut = level_table(4);
    assert_eq!(lut[0], 0);
    assert_eq!(lut[42], 0);
    assert_eq!(lut[43], 85);
    assert_eq!(lut[128], 170);
    assert_eq!(lut[255], 255);
}

#[test]
fn alpha_is_preserved() {
    let mut frame = ramp();
    quantize_in_place(&mut frame, ColorDepth::Bits4);
    for (i, px) in frame.data.chunks_exact(4).enumerate() {
        assert_eq!(usize::from(px[3]), i);
    }
}
