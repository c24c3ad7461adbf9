use super::*;

#[test]
fn canvas_rejects_empty_dimensions() {
    assert!(Canvas::new(0, 10).is_err());
    assert!(Canvas::new(10, 0).is_err());
    assert_eq!(Canvas::new(4, 3).unwrap().rgba_len().unwrap(), 48);
}

#[test]
fn fps_frame_duration() {
    let fps = Fps::new(60, 1).unwrap();
    assert!((fps.frames_to_secs(30) - 0.5).abs() < 1e-12);
    assert!(Fps::new(0, 1).is_err());
}

#[test]
fn hex_colors_parse() {
    assert_eq!(Rgb8::from_hex("#ff8000").unwrap(), Rgb8::new(255, 128, 0));
    assert_eq!(Rgb8::from_hex("00ff00").unwrap(), Rgb8::new(0, 255, 0));
    assert!(Rgb8::from_hex("#fff").is_err());
    assert!(Rgb8::from_hex("#gg0000").is_err());
}

#[test]
fn hue_rotation_cycles_primaries() {
    let red = Rgb8::new(255, 0, 0);
    assert_eq!(red.hue_rotated(0.0), red);
    assert_eq!(red.hue_rotated(120.0), Rgb8::new(0, 255, 0));
    assert_eq!(red.hue_rotated(240.0), Rgb8::new(0, 0, 255));
    assert_eq!(red.hue_rotated(360.0), red);
}

#[test]
fn hsv_roundtrip_for_grey() {
    let grey = Rgb8::new(128, 128, 128);
    let (h, s, v) = grey.to_hsv();
    assert_eq!(Rgb8::from_hsv(h, s, v), grey);
}

#[test]
fn frame_from_raw_checks_length() {
    assert!(FrameRgba::from_raw(2, 2, vec![0; 15]).is_err());
    let mut f = FrameRgba::from_raw(2, 2, vec![0; 16]).unwrap();
    f.set_pixel(1, 1, [1, 2, 3, 4]);
    assert_eq!(f.pixel(1, 1), [1, 2, 3, 4]);
    assert_eq!(f.pixel(0, 1), [0, 0, 0, 0]);
}

#[test]
fn filled_frame_is_opaque() {
    let f = FrameRgba::filled(Canvas::new(3, 2).unwrap(), Rgb8::new(9, 8, 7)).unwrap();
    assert_eq!(f.data.len(), 24);
    assert!(f.data.chunks_exact(4).all(|p| p == [9, 8, 7, 255]));
}
