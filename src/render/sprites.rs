//! Seeded sprite population and rasterization.

use kurbo::Vec2;

use crate::animation::motion::MotionSample;
use crate::effects::compositor::SpritePatch;
use crate::foundation::core::{Canvas, Rgb8};
use crate::foundation::math::{Rng64, seed_from_str};
use crate::state::model::{GeneratorState, SpriteShape};

/// Population at `density = 100`.
pub const MAX_SPRITES: u32 = 400;

/// One sprite's fixed, per-session attributes. Motion is applied on top.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    /// Normalized canvas position, `(0.5, 0.5)` is the center.
    pub anchor: Vec2,
    pub phase: f64,
    pub layer_index: u32,
    /// Multiplier on the population base unit.
    pub size: f64,
    pub color_index: usize,
    /// Per-channel color variance in `[-1, 1)`.
    pub jitter: [f64; 3],
}

#[derive(Clone, Debug, PartialEq)]
pub struct Population {
    pub sprites: Vec<Sprite>,
    /// Sprite base size in pixels.
    pub base_unit: f64,
}

/// Build the sprite population for `state`. Identical inputs give identical output.
pub fn populate(state: &GeneratorState, canvas: Canvas) -> Population {
    let min_side = f64::from(canvas.min_side());
    let base_unit = min_side * (0.02 + 0.18 * state.sprite_size.clamp(0.0, 100.0) / 100.0);

    if let Some(thumb) = &state.thumbnail_mode {
        let n = thumb.count.max(1);
        let sprites = (0..n)
            .map(|i| {
                let angle = std::f64::consts::TAU * f64::from(i) / f64::from(n);
                let (anchor, size) = if i == 0 {
                    (thumb.position, thumb.primary_scale)
                } else {
                    (
                        thumb.position + Vec2::new(angle.cos(), angle.sin()) * 0.25,
                        thumb.secondary_scale,
                    )
                };
                Sprite {
                    anchor,
                    phase: f64::from(i) / f64::from(n),
                    layer_index: i % state.layer_count.max(1),
                    size,
                    color_index: thumb.color_index.wrapping_add(i as usize),
                    jitter: [0.0; 3],
                }
            })
            .collect();
        return Population { sprites, base_unit };
    }

    let count = 1 + (state.density.clamp(0.0, 100.0) / 100.0 * f64::from(MAX_SPRITES - 1)).round() as u32;
    let place_seed = seed_from_str(&state.seed, "");
    let color_seed = seed_from_str(&state.seed, &format!("color:{}", state.color_seed_suffix));
    let layers = state.layer_count.max(1);

    let sprites = (0..count)
        .map(|i| {
            let mut place = Rng64::derive(place_seed, u64::from(i));
            let mut color = Rng64::derive(color_seed, u64::from(i));
            Sprite {
                anchor: Vec2::new(place.next_f64_01(), place.next_f64_01()),
                phase: place.next_f64_01(),
                layer_index: place.index(layers as usize) as u32,
                size: place.range_f64(0.5, 1.5),
                color_index: color.index(64),
                jitter: [
                    color.range_f64(-1.0, 1.0),
                    color.range_f64(-1.0, 1.0),
                    color.range_f64(-1.0, 1.0),
                ],
            }
        })
        .collect();
    Population { sprites, base_unit }
}

/// Rasterize one sprite after motion, clipped to the canvas. Returns `None`
/// when it covers no on-canvas pixel.
pub fn rasterize(
    sprite: &Sprite,
    sample: &MotionSample,
    base_unit: f64,
    canvas: Canvas,
    shape: SpriteShape,
    color: Rgb8,
) -> Option<SpritePatch> {
    let side = base_unit * sprite.size * sample.scale;
    if !side.is_finite() || side < 0.5 {
        return None;
    }
    let min_side = f64::from(canvas.min_side());
    let cx = sprite.anchor.x * f64::from(canvas.width) + sample.offset.x * min_side;
    let cy = sprite.anchor.y * f64::from(canvas.height) + sample.offset.y * min_side;
    if !cx.is_finite() || !cy.is_finite() {
        return None;
    }
    let half = side / 2.0;
    let x0 = (cx - half).floor().max(0.0);
    let y0 = (cy - half).floor().max(0.0);
    let x1 = (cx + half).ceil().min(f64::from(canvas.width));
    let y1 = (cy + half).ceil().min(f64::from(canvas.height));
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    let width = (x1 - x0) as u32;
    let height = (y1 - y0) as u32;

    let on = [color.r, color.g, color.b, 255];
    let mut pixels = Vec::with_capacity((width as usize) * (height as usize));
    let mut any = false;
    for py in 0..height {
        let dy = y0 + f64::from(py) + 0.5 - cy;
        for px in 0..width {
            let dx = x0 + f64::from(px) + 0.5 - cx;
            let inside = match shape {
                SpriteShape::Square => dx.abs() <= half && dy.abs() <= half,
                SpriteShape::Circle => dx * dx + dy * dy <= half * half,
                SpriteShape::Diamond => dx.abs() + dy.abs() <= half,
            };
            any |= inside;
            pixels.push(if inside { on } else { [0; 4] });
        }
    }
    any.then_some(SpritePatch {
        x0: x0 as i64,
        y0: y0 as i64,
        width,
        height,
        pixels,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/sprites.rs"]
mod tests;
