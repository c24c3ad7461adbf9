use super::*;

#[test]
fn multiply_and_screen() {
    assert_eq!(blend_channel(BlendMode::Multiply, 255, 77), 77);
    assert_eq!(blend_channel(BlendMode::Multiply, 0, 200), 0);
    assert_eq!(blend_channel(BlendMode::Multiply, 128, 128), 64);
    assert_eq!(blend_channel(BlendMode::Screen, 0, 77), 77);
    assert_eq!(blend_channel(BlendMode::Screen, 255, 10), 255);
    assert_eq!(blend_channel(BlendMode::Screen, 128, 128), 192);
}

#[test]
fn darkest_and_lightest_are_min_max() {
    assert_eq!(blend_channel(BlendMode::Darkest, 30, 200), 30);
    assert_eq!(blend_channel(BlendMode::Lightest, 30, 200), 200);
}

#[test]
fn hard_light_is_overlay_with_roles_swapped() {
    for b in [0u8, 40, 127, 128, 200, 255] {
        for s in [0u8, 60, 127, 128, 190, 255] {
            assert_eq!(
                blend_channel(BlendMode::HardLight, b, s),
                blend_channel(BlendMode::Overlay, s, b)
            );
        }
    }
    assert_eq!(blend_channel(BlendMode::Overlay, 0, 255), 0);
    assert_eq!(blend_channel(BlendMode::Overlay, 255, 0), 255);
}

#[test]
fn soft_light_keeps_extremes_and_neutral_grey() {
    assert_eq!(blend_channel(BlendMode::SoftLight, 0, 180), 0);
    assert_eq!(blend_channel(BlendMode::SoftLight, 255, 30), 255);
    // A mid-grey source leaves the backdrop (nearly) unchanged.
    assert!((i16::from(blend_channel(BlendMode::SoftLight, 100, 128)) - 100).abs() <= 1);
}

#[test]
fn none_replaces_and_zero_alpha_is_untouched() {
    let dst = [10, 20, 30, 255];
    assert_eq!(blend_pixel(BlendMode::None, dst, [200, 100, 50, 255]), [200, 100, 50, 255]);
    assert_eq!(blend_pixel(BlendMode::Multiply, dst, [0, 0, 0, 0]), dst);
}

#[test]
fn partial_coverage_mixes_toward_backdrop() {
    let out = blend_pixel(BlendMode::None, [0, 0, 0, 255], [255, 255, 255, 128]);
    assert_eq!(out, [128, 128, 128, 255]);
}

#[test]
fn blend_in_place_checks_lengths() {
    let mut dst = vec![0u8; 8];
    assert!(blend_in_place(BlendMode::Screen, &mut dst, &[0u8; 4]).is_err());
    blend_in_place(BlendMode::Screen, &mut dst, &[255u8; 8]).unwrap();
    assert_eq!(dst, vec![255u8; 8]);
}
