//! Per-channel blend rules for drawing sprites into the accumulation buffer.
//!
//! Frames are opaque; `source` pixels carry coverage in their alpha channel.

use crate::foundation::error::{PixliError, PixliResult};
use crate::foundation::math::mul_div255_u8;
use crate::state::model::BlendMode;

pub type Rgba8 = [u8; 4];

/// Combine one backdrop channel with one source channel.
pub fn blend_channel(mode: BlendMode, backdrop: u8, source: u8) -> u8 {
    let b = u16::from(backdrop);
    let s = u16::from(source);
    match mode {
        BlendMode::None => source,
        BlendMode::Multiply => mul_div255_u8(b, s),
        BlendMode::Screen => 255 - mul_div255_u8(255 - b, 255 - s),
        BlendMode::Overlay => overlay(b, s),
        BlendMode::HardLight => overlay(s, b),
        BlendMode::SoftLight => soft_light(backdrop, source),
        BlendMode::Darkest => backdrop.min(source),
        BlendMode::Lightest => backdrop.max(source),
    }
}

/// Draw `src` over `dst` with `mode`, weighted by the source alpha.
pub fn blend_pixel(mode: BlendMode, dst: Rgba8, src: Rgba8) -> Rgba8 {
    let a = u16::from(src[3]);
    if a == 0 {
        return dst;
    }
    let inv = 255 - a;
    let mut out = [0u8; 4];
    for i in 0..3 {
        let mixed = blend_channel(mode, dst[i], src[i]);
        out[i] = mul_div255_u8(u16::from(mixed), a).saturating_add(mul_div255_u8(u16::from(dst[i]), inv));
    }
    out[3] = 255;
    out
}

/// Blend an equally sized RGBA8 layer onto `dst`.
pub fn blend_in_place(mode: BlendMode, dst: &mut [u8], src: &[u8]) -> PixliResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(PixliError::resource(
            "blend_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = blend_pixel(mode, [d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

fn overlay(b: u16, s: u16) -> u8 {
    if b < 128 {
        mul_div255_u8(2 * b, s)
    } else {
        255 - mul_div255_u8(2 * (255 - b), 255 - s)
    }
}

fn soft_light(backdrop: u8, source: u8) -> u8 {
    let b = f64::from(backdrop) / 255.0;
    let s = f64::from(source) / 255.0;
    let v = (1.0 - 2.0 * s) * b * b + 2.0 * s * b;
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blend.rs"]
mod tests;
