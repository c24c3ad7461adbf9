//! Per-channel color depth reduction.

use crate::foundation::core::FrameRgba;
use crate::state::model::ColorDepth;

/// Round every color channel to the nearest of `depth.levels()` evenly spaced
/// values. Full depth is a no-op; alpha is never touched.
pub fn quantize_in_place(frame: &mut FrameRgba, depth: ColorDepth) {
    let Some(levels) = depth.levels() else {
        return;
    };
    let lut = level_table(levels);
    for px in frame.data.chunks_exact_mut(4) {
        for c in &mut px[..3] {
            *c = lut[usize::from(*c)];
        }
    }
}

/// Lookup table mapping each channel value to its quantized value.
pub fn level_table(levels: u16) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if levels < 2 {
        return lut;
    }
    let step = 255.0 / f64::from(levels - 1);
    for (v, out) in lut.iter_mut().enumerate() {
        let k = (v as f64 / step).round();
        *out = (k * step).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

#[cfg(test)]
#[path = "../../tests/unit/effects/quantize.rs"]
mod tests;
