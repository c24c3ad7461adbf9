//! Ordered post-processing for one frame.
//!
//! Stage order is fixed: blend (while sprites are drawn), pixelate (+ grid),
//! quantize, noise. Each stage reads only the output of the one before it.

use crate::effects::blend::{Rgba8, blend_pixel};
use crate::effects::noise::{NoiseParams, apply_noise};
use crate::effects::pixelate::{draw_grid, grid_color, pixelate_in_place};
use crate::effects::quantize::quantize_in_place;
use crate::foundation::core::{Canvas, FrameRgba, Rgb8};
use crate::foundation::error::{PixliError, PixliResult};
use crate::foundation::math::seed_from_str;
use crate::state::model::{BlendMode, ColorDepth, GeneratorState, NoiseType};
use crate::state::palette::Palette;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Blend,
    Pixelate,
    Quantize,
    Noise,
}

impl Stage {
    pub const ORDER: [Self; 4] = [Self::Blend, Self::Pixelate, Self::Quantize, Self::Noise];
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelateStage {
    pub block_size: u32,
    pub grid: Option<Rgb8>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseStage {
    pub kind: NoiseType,
    pub strength: f64,
    pub animated: bool,
}

/// A rasterized sprite: `width` x `height` RGBA8 pixels (alpha = coverage)
/// whose top-left corner lands at `(x0, y0)` in frame pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpritePatch {
    pub x0: i64,
    pub y0: i64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Rgba8>,
}

/// What the compositor does for one frame; `None` disables a stage.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositorPlan {
    pub blend: BlendMode,
    pub pixelate: Option<PixelateStage>,
    pub quantize: Option<ColorDepth>,
    pub noise: Option<NoiseStage>,
}

impl CompositorPlan {
    /// A plan that leaves sprites drawn normally and skips every post stage.
    pub fn passthrough() -> Self {
        Self {
            blend: BlendMode::None,
            pixelate: None,
            quantize: None,
            noise: None,
        }
    }

    pub fn from_state(state: &GeneratorState, palette: &Palette) -> Self {
        let fx = &state.effects;
        let pixelate = (fx.pixelate.enabled && fx.pixelate.block_size > 1).then(|| PixelateStage {
            block_size: fx.pixelate.block_size,
            grid: fx.pixelate.grid.then(|| {
                let reference = fx.pixelate.grid_color_index.map(|i| palette.color(i));
                grid_color(fx.pixelate.grid_brightness, reference)
            }),
        });
        let quantize = (fx.quantize.enabled && fx.quantize.bits.levels().is_some())
            .then_some(fx.quantize.bits);
        let noise = (fx.noise.enabled && fx.noise.strength > 0.0).then_some(NoiseStage {
            kind: fx.noise.kind,
            strength: fx.noise.strength,
            animated: fx.noise.animated,
        });
        Self {
            blend: state.blend_mode,
            pixelate,
            quantize,
            noise,
        }
    }

    pub fn is_enabled(&self, stage: Stage) -> bool {
        match stage {
            Stage::Blend => true,
            Stage::Pixelate => self.pixelate.is_some(),
            Stage::Quantize => self.quantize.is_some(),
            Stage::Noise => self.noise.is_some(),
        }
    }
}

/// Owns the noise seed and the per-call counter that `Static` noise re-seeds from.
#[derive(Debug)]
pub struct FrameCompositor {
    seed: u64,
    calls: u64,
}

impl FrameCompositor {
    pub fn new(seed: u64) -> Self {
        Self { seed, calls: 0 }
    }

    pub fn for_state(state: &GeneratorState) -> Self {
        Self::new(seed_from_str(&state.seed, "noise"))
    }

    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.calls = 0;
    }

    /// Allocate the accumulation buffer the blend stage draws into.
    pub fn begin(&self, canvas: Canvas, background: Rgb8) -> PixliResult<FrameRgba> {
        FrameRgba::filled(canvas, background)
    }

    /// Blend stage: draw one patch, clipped to the frame.
    pub fn draw_patch(&self, frame: &mut FrameRgba, mode: BlendMode, patch: &SpritePatch) -> PixliResult<()> {
        let (width, height) = (patch.width, patch.height);
        if patch.pixels.len() != (width as usize) * (height as usize) {
            return Err(PixliError::resource(format!(
                "sprite patch has {} pixels, expected {width}x{height}",
                patch.pixels.len()
            )));
        }
        let fw = i64::from(frame.width);
        let fh = i64::from(frame.height);
        for py in 0..height {
            let y = patch.y0 + i64::from(py);
            if y < 0 || y >= fh {
                continue;
            }
            for px in 0..width {
                let x = patch.x0 + i64::from(px);
                if x < 0 || x >= fw {
                    continue;
                }
                let src = patch.pixels[(py as usize) * (width as usize) + px as usize];
                if src[3] == 0 {
                    continue;
                }
                let (x, y) = (x as u32, y as u32);
                let out = blend_pixel(mode, frame.pixel(x, y), src);
                frame.set_pixel(x, y, out);
            }
        }
        Ok(())
    }

    /// Run the post stages in order on a frame whose blend stage is done.
    #[tracing::instrument(level = "trace", skip(self, frame, plan), fields(w = frame.width, h = frame.height))]
    pub fn post_process(&mut self, frame: &mut FrameRgba, plan: &CompositorPlan, time: f64) -> PixliResult<()> {
        let expected = frame.canvas().rgba_len()?;
        if frame.data.len() != expected {
            return Err(PixliError::resource(format!(
                "frame buffer is {} bytes, expected {expected}",
                frame.data.len()
            )));
        }

        for stage in Stage::ORDER {
            match stage {
                Stage::Blend => {}
                Stage::Pixelate => {
                    if let Some(p) = plan.pixelate {
                        pixelate_in_place(frame, p.block_size);
                        if let Some(color) = p.grid {
                            draw_grid(frame, p.block_size, color);
                        }
                    }
                }
                Stage::Quantize => {
                    if let Some(depth) = plan.quantize {
                        quantize_in_place(frame, depth);
                    }
                }
                Stage::Noise => {
                    if let Some(n) = plan.noise {
                        apply_noise(
                            frame,
                            &NoiseParams {
                                kind: n.kind,
                                strength: n.strength,
                                animated: n.animated,
                                seed: self.seed,
                                time,
                                call: self.calls,
                            },
                        );
                    }
                }
            }
        }
        self.calls = self.calls.wrapping_add(1);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/compositor.rs"]
mod tests;
