use std::sync::Arc;

use rayon::prelude::*;

use crate::animation::motion::{MotionSample, MotionSource};
use crate::animation::timing::{CycleTiming, motion_scale};
use crate::effects::compositor::{CompositorPlan, FrameCompositor};
use crate::expression::sandbox::{MotionInput, Sandbox};
use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRgba};
use crate::foundation::error::PixliResult;
use crate::foundation::math::seed_from_str;
use crate::render::sprites::{populate, rasterize};
use crate::state::model::GeneratorState;
use crate::state::palette::{
    BuiltinPalettes, Palette, PaletteSource, background_color, resolve_palette, sprite_color,
};

/// Counters for the most recent frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub sprites: usize,
    pub drawn: usize,
    /// Sprites whose motion call failed and were drawn with the identity transform.
    pub motion_failures: usize,
}

/// Turns a state snapshot plus a motion source into pixels.
pub struct Renderer {
    canvas: Canvas,
    timing: CycleTiming,
    palettes: Arc<dyn PaletteSource>,
    fallback: Palette,
    compositor: FrameCompositor,
    noise_seed: u64,
    last_report: FrameReport,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("canvas", &self.canvas)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    pub fn new(canvas: Canvas, timing: CycleTiming, palettes: Arc<dyn PaletteSource>) -> PixliResult<Self> {
        let builtin = BuiltinPalettes::new()?;
        let fallback = builtin.first().clone();
        Ok(Self {
            canvas,
            timing,
            palettes,
            fallback,
            compositor: FrameCompositor::new(0),
            noise_seed: 0,
            last_report: FrameReport::default(),
        })
    }

    /// A renderer backed by the built-in palettes.
    pub fn with_builtin_palettes(canvas: Canvas, timing: CycleTiming) -> PixliResult<Self> {
        Self::new(canvas, timing, Arc::new(BuiltinPalettes::new()?))
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn last_report(&self) -> FrameReport {
        self.last_report
    }

    /// The palette `state` resolves to, falling back to the first built-in.
    pub fn palette(&self, state: &GeneratorState) -> Palette {
        resolve_palette(self.palettes.as_ref(), &state.palette_id, &self.fallback)
    }

    /// Render frame `idx` of a session running at `fps`.
    pub fn render_at(
        &mut self,
        state: &GeneratorState,
        motion: &MotionSource,
        sandbox: &Sandbox,
        idx: FrameIndex,
        fps: Fps,
    ) -> PixliResult<FrameRgba> {
        self.render(state, motion, sandbox, fps.frames_to_secs(idx.0))
    }

    /// Render the frame at `elapsed_secs` since the session started.
    ///
    /// Sprite transforms are evaluated in parallel; drawing and post stages run
    /// in a fixed order on this thread.
    ///
    /// `Static` noise re-seeds from this renderer's call count, so rendering the
    /// same `elapsed_secs` twice on one renderer differs when it is enabled.
    /// A fresh renderer replays the same sequence of calls identically.
    #[tracing::instrument(level = "debug", skip_all, fields(elapsed_secs = elapsed_secs))]
    pub fn render(
        &mut self,
        state: &GeneratorState,
        motion: &MotionSource,
        sandbox: &Sandbox,
        elapsed_secs: f64,
    ) -> PixliResult<FrameRgba> {
        let noise_seed = seed_from_str(&state.seed, "noise");
        if noise_seed != self.noise_seed {
            self.noise_seed = noise_seed;
            self.compositor.reseed(noise_seed);
        }

        let palette = self.palette(state);
        let population = populate(state, self.canvas);
        let t = self.timing.progress(elapsed_secs, state.motion_speed);
        let scale = motion_scale(state.motion_intensity);
        let base_unit = population.base_unit;

        let samples: Vec<(MotionSample, bool)> = population
            .sprites
            .par_iter()
            .map(|sprite| {
                let input = MotionInput {
                    t,
                    phase: sprite.phase,
                    layer_index: sprite.layer_index,
                    base_unit,
                    motion_scale: scale,
                };
                match motion.try_sample(sandbox, &input) {
                    Ok(sample) => (sample, false),
                    Err(e) => {
                        tracing::debug!(layer = sprite.layer_index, error = %e, "sprite motion failed");
                        (MotionSample::IDENTITY, true)
                    }
                }
            })
            .collect();

        let mut frame = self
            .compositor
            .begin(self.canvas, background_color(&palette, state))?;

        let mut order: Vec<usize> = (0..population.sprites.len()).collect();
        order.sort_by_key(|&i| population.sprites[i].layer_index);

        let mut drawn = 0usize;
        for i in order {
            let sprite = &population.sprites[i];
            let color = sprite_color(&palette, state, sprite.color_index, sprite.jitter, elapsed_secs);
            if let Some(patch) = rasterize(
                sprite,
                &samples[i].0,
                base_unit,
                self.canvas,
                state.sprite_shape,
                color,
            ) {
                self.compositor.draw_patch(&mut frame, state.blend_mode, &patch)?;
                drawn += 1;
            }
        }

        let plan = CompositorPlan::from_state(state, &palette);
        self.compositor.post_process(&mut frame, &plan, elapsed_secs)?;

        self.last_report = FrameReport {
            sprites: population.sprites.len(),
            drawn,
            motion_failures: samples.iter().filter(|(_, failed)| *failed).count(),
        };
        Ok(frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
