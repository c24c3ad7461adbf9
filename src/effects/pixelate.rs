//! Block pixelation and the optional block grid.

use crate::foundation::core::{FrameRgba, Rgb8};
use crate::foundation::math::lerp_u8;

const GRID_MID_GREY: Rgb8 = Rgb8::new(128, 128, 128);

/// Downsample to `floor(dim / block)` cells by box average, then upscale with
/// nearest-neighbor. `block <= 1` leaves the frame untouched.
pub fn pixelate_in_place(frame: &mut FrameRgba, block: u32) {
    if block <= 1 {
        return;
    }
    let (w, h) = (frame.width, frame.height);
    let cw = (w / block).max(1);
    let ch = (h / block).max(1);

    let cells = (cw as usize) * (ch as usize);
    let mut sums = vec![[0u64; 4]; cells];
    let mut counts = vec![0u64; cells];
    for y in 0..h {
        let cy = cell(y, h, ch);
        for x in 0..w {
            let i = (cy as usize) * (cw as usize) + cell(x, w, cw) as usize;
            let px = frame.pixel(x, y);
            for (acc, v) in sums[i].iter_mut().zip(px) {
                *acc += u64::from(v);
            }
            counts[i] += 1;
        }
    }

    let averages: Vec<[u8; 4]> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| {
            let n = n.max(1);
            [0, 1, 2, 3].map(|c| ((s[c] + n / 2) / n) as u8)
        })
        .collect();

    for y in 0..h {
        let cy = cell(y, h, ch);
        for x in 0..w {
            let i = (cy as usize) * (cw as usize) + cell(x, w, cw) as usize;
            frame.set_pixel(x, y, averages[i]);
        }
    }
}

/// Draw one-pixel lines on the block boundaries produced by [`pixelate_in_place`].
pub fn draw_grid(frame: &mut FrameRgba, block: u32, color: Rgb8) {
    if block <= 1 {
        return;
    }
    let (w, h) = (frame.width, frame.height);
    let cw = (w / block).max(1);
    let ch = (h / block).max(1);
    let px = [color.r, color.g, color.b, 255];
    for y in 0..h {
        let row_edge = y > 0 && cell(y, h, ch) != cell(y - 1, h, ch);
        for x in 0..w {
            let col_edge = x > 0 && cell(x, w, cw) != cell(x - 1, w, cw);
            if row_edge || col_edge {
                frame.set_pixel(x, y, px);
            }
        }
    }
}

/// Grid color for `brightness` in `[0, 100]`: black at 0, the reference color
/// (mid grey when absent) at 50, white at 100.
pub fn grid_color(brightness: f64, reference: Option<Rgb8>) -> Rgb8 {
    let mid = reference.unwrap_or(GRID_MID_GREY);
    let b = if brightness.is_finite() {
        brightness.clamp(0.0, 100.0)
    } else {
        50.0
    };
    let (from, to, t) = if b <= 50.0 {
        (Rgb8::BLACK, mid, b / 50.0)
    } else {
        (mid, Rgb8::WHITE, (b - 50.0) / 50.0)
    };
    Rgb8::new(
        lerp_u8(from.r, to.r, t),
        lerp_u8(from.g, to.g, t),
        lerp_u8(from.b, to.b, t),
    )
}

fn cell(pos: u32, len: u32, cells: u32) -> u32 {
    ((u64::from(pos) * u64::from(cells)) / u64::from(len)) as u32
}

#[cfg(test)]
#[path = "../../tests/unit/effects/pixelate.rs"]
mod tests;
