//! Noise and dither overlays.
//!
//! Each pattern is generated as its own grey layer (128 is neutral) and then
//! overlay-blended onto the frame at `strength / 100`.

use crate::effects::blend::blend_channel;
use crate::foundation::core::FrameRgba;
use crate::foundation::math::{Fnv1a64, hash01, lerp_u8};
use crate::state::model::{BlendMode, NoiseType};

const BAYER4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseParams {
    pub kind: NoiseType,
    /// `[0, 100]`; 0 is a no-op.
    pub strength: f64,
    pub animated: bool,
    pub seed: u64,
    /// Seconds since the session started; only read when `animated`.
    pub time: f64,
    /// Monotonic call counter; `Static` noise re-seeds from it on every call.
    pub call: u64,
}

/// Generate the grey noise layer for a `width` x `height` frame.
pub fn noise_layer(params: &NoiseParams, width: u32, height: u32) -> Vec<u8> {
    let tick = if params.animated {
        (params.time.max(0.0) * 60.0).floor() as u64
    } else {
        0
    };
    let seed = match params.kind {
        NoiseType::Static => mix(params.seed, params.call),
        _ => mix(params.seed, tick),
    };

    let mut layer = Vec::with_capacity((width as usize) * (height as usize));
    for y in 0..height {
        let row_jitter = hash01(seed, 0, y);
        for x in 0..width {
            let v = match params.kind {
                NoiseType::Grain | NoiseType::Static => (hash01(seed, x, y) * 256.0) as u8,
                NoiseType::Crt => {
                    let base = if y % 2 == 0 { 104.0 } else { 152.0 };
                    let fine = (hash01(seed, x, y) - 0.5) * 48.0;
                    (base + (row_jitter - 0.5) * 32.0 + fine).round().clamp(0.0, 255.0) as u8
                }
                NoiseType::Bayer => {
                    let shift = (tick % 4) as u32;
                    let t = BAYER4[((y + shift) % 4) as usize][((x + shift) % 4) as usize];
                    ((f64::from(t) + 0.5) / 16.0 * 255.0).round() as u8
                }
                NoiseType::Scanlines => {
                    let roll = (tick / 2) as u32;
                    if (y.wrapping_add(roll)) % 3 == 0 { 64 } else { 128 }
                }
            };
            layer.push(v);
        }
    }
    layer
}

/// Overlay noise onto `frame`. Strength 0 returns without touching it.
pub fn apply_noise(frame: &mut FrameRgba, params: &NoiseParams) {
    let strength = if params.strength.is_finite() {
        params.strength.clamp(0.0, 100.0) / 100.0
    } else {
        0.0
    };
    if strength <= 0.0 {
        return;
    }
    let layer = noise_layer(params, frame.width, frame.height);
    for (px, &n) in frame.data.chunks_exact_mut(4).zip(&layer) {
        for c in &mut px[..3] {
            let lit = blend_channel(BlendMode::Overlay, *c, n);
            *c = lerp_u8(*c, lit, strength);
        }
    }
}

fn mix(seed: u64, v: u64) -> u64 {
    let mut h = Fnv1a64::new(seed);
    h.write_u64(v);
    h.finish()
}

#[cfg(test)]
#[path = "../../tests/unit/effects/noise.rs"]
mod tests;
