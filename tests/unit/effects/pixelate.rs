use super::*;
use crate::foundation::core::Canvas;

fn gradient(w: u32, h: u32) -> FrameRgba {
    let mut data = Vec::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        for x in 0..w {
            data.extend_from_slice(&[(x * 17 % 256) as u8, (y * 29 % 256) as u8, ((x + y) * 7 % 256) as u8, 255]);
        }
    }
    FrameRgba::from_raw(w, h, data).unwrap()
}

#[test]
fn block_of_one_is_identity() {
    let original = gradient(13, 7);
    let mut frame = original.clone();
    pixelate_in_place(&mut frame, 1);
    assert_eq!(frame, original);
    pixelate_in_place(&mut frame, 0);
    assert_eq!(frame, original);
}

#[test]
fn blocks_are_uniform_averages() {
    let mut frame = FrameRgba::filled(Canvas::new(4, 2).unwrap(), Rgb8::BLACK).unwrap();
    frame.set_pixel(0, 0, [100, 0, 0, 255]);
    frame.set_pixel(1, 1, [100, 0, 0, 255]);
    pixelate_in_place(&mut frame, 2);
    for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        assert_eq!(frame.pixel(x, y), [50, 0, 0, 255]);
    }
    assert_eq!(frame.pixel(3, 1), [0, 0, 0, 255]);
}

#[test]
fn cell_count_is_floor_of_dimension_over_block() {
    let mut frame = gradient(10, 10);
    pixelate_in_place(&mut frame, 3);
    // 10 / 3 = 3 cells per axis, so exactly three distinct columns per row.
    let mut distinct: Vec<[u8; 4]> = (0..10).map(|x| frame.pixel(x, 0)).collect();
    distinct.dedup();
    assert_eq!(distinct.len(), 3);
}

#[test]
fn oversized_block_collapses_to_one_cell() {
    let mut frame = gradient(5, 3);
    pixelate_in_place(&mut frame, 64);
    let first = frame.pixel(0, 0);
    for y in 0..3 {
        for x in 0..5 {
            assert_eq!(frame.pixel(x, y), first);
        }
    }
}

#[test]
fn grid_lines_follow_block_edges() {
    let mut frame = FrameRgba::filled(Canvas::new(8, 8).unwrap(), Rgb8::BLACK).unwrap();
    draw_grid(&mut frame, 4, Rgb8::WHITE);
    assert_eq!(frame.pixel(4, 0), [255, 255, 255, 255]);
    assert_eq!(frame.pixel(0, 4), [255, 255, 255, 255]);
    assert_eq!(frame.pixel(0, 0), [0, 0, 0, 255]);
    assert_eq!(frame.pixel(3, 3), [0, 0, 0, 255]);
}

#[test]
fn grid_color_interpolates_through_reference() {
    let red = Rgb8::new(200, 0, 0);
    assert_eq!(grid_color(0.0, Some(red)), Rgb8::BLACK);
    assert_eq!(grid_color(50.0, Some(red)), red);
    assert_eq!(grid_color(100.0, Some(red)), Rgb8::WHITE);
    assert_eq!(grid_color(50.0, None), Rgb8::new(128, 128, 128));
    assert_eq!(grid_color(25.0, None), Rgb8::new(64, 64, 64));
}
