use std::sync::Arc;
use std::time::Instant;

use crate::animation::resolver::AnimationResolver;
use crate::config::PixliConfig;
use crate::expression::sandbox::Sandbox;
use crate::foundation::core::{Fps, FrameIndex, FrameRgba};
use crate::foundation::error::PixliResult;
use crate::protocol::AdapterContext;
use crate::render::renderer::{FrameReport, Renderer};
use crate::render::sink::{FrameSink, SinkConfig};
use crate::state::model::GeneratorState;
use crate::state::owner::{StateHandle, StateOwner, StateSnapshot};
use crate::state::scenes::SceneStore;

/// Running totals across a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub deltas_applied: u64,
    pub deltas_rejected: u64,
    pub motion_failures: u64,
}

/// Output of one tick.
#[derive(Debug)]
pub struct Tick {
    pub index: FrameIndex,
    pub frame: FrameRgba,
    pub snapshot: StateSnapshot,
    pub report: FrameReport,
}

/// The frame loop: drain the state queue, resolve motion, render.
///
/// Elapsed time is derived from the frame index so a session replays the same
/// frames for the same inputs; wall-clock `now` only drives the edit debounce.
pub struct LiveSession {
    owner: StateOwner,
    resolver: AnimationResolver,
    renderer: Renderer,
    fps: Fps,
    next: FrameIndex,
    stats: SessionStats,
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("fps", &self.fps)
            .field("next", &self.next)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl LiveSession {
    pub fn new(owner: StateOwner, resolver: AnimationResolver, renderer: Renderer, fps: Fps) -> Self {
        Self {
            owner,
            resolver,
            renderer,
            fps,
            next: FrameIndex(0),
            stats: SessionStats::default(),
        }
    }

    pub fn from_config(
        config: &PixliConfig,
        initial: GeneratorState,
        scenes: Arc<dyn SceneStore>,
    ) -> PixliResult<Self> {
        config.validate()?;
        let owner = StateOwner::new(initial, scenes)?;
        let resolver =
            AnimationResolver::new(Sandbox::new(config.sandbox.budget()), config.debounce());
        let renderer = Renderer::with_builtin_palettes(config.canvas, config.timing)?;
        Ok(Self::new(owner, resolver, renderer, config.fps))
    }

    pub fn handle(&self) -> StateHandle {
        self.owner.handle()
    }

    /// Context for protocol adapters feeding this session.
    pub fn adapter_context(&self) -> AdapterContext {
        AdapterContext::new(self.owner.handle(), Arc::clone(self.owner.scenes()))
    }

    pub fn resolver(&self) -> &AnimationResolver {
        &self.resolver
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn sink_config(&self) -> SinkConfig {
        let canvas = self.renderer.canvas();
        SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps: self.fps,
        }
    }

    /// Produce the next frame.
    #[tracing::instrument(level = "debug", skip_all, fields(frame = self.next.0))]
    pub fn tick(&mut self, now: Instant) -> PixliResult<Tick> {
        let index = self.next;
        let drained = self.owner.begin_frame();
        let state = Arc::clone(&drained.snapshot.state);
        let motion = self.resolver.observe(&state, now).clone();
        let elapsed = self.fps.frames_to_secs(index.0);
        let frame = self
            .renderer
            .render(&state, &motion, self.resolver.sandbox(), elapsed)?;
        let report = self.renderer.last_report();

        self.next = FrameIndex(index.0 + 1);
        self.stats.frames += 1;
        self.stats.deltas_applied += drained.applied as u64;
        self.stats.deltas_rejected += drained.rejected as u64;
        self.stats.motion_failures += report.motion_failures as u64;

        Ok(Tick {
            index,
            frame,
            snapshot: drained.snapshot,
            report,
        })
    }

    /// Render frame `index` from the current state without advancing the session.
    /// With `Static` noise on, the grain still advances per call (see [`Renderer::render`]).
    pub fn frame_at(&mut self, index: FrameIndex, now: Instant) -> PixliResult<FrameRgba> {
        let drained = self.owner.begin_frame();
        let motion = self.resolver.observe(&drained.snapshot.state, now).clone();
        self.renderer.render_at(
            &drained.snapshot.state,
            &motion,
            self.resolver.sandbox(),
            index,
            self.fps,
        )
    }

    /// Tick `frames` times without pacing and push every frame into `sink`.
    pub fn render_into(&mut self, frames: u64, sink: &mut dyn FrameSink) -> PixliResult<SessionStats> {
        sink.begin(self.sink_config())?;
        for _ in 0..frames {
            let tick = self.tick(Instant::now())?;
            sink.push_frame(tick.index, &tick.frame)?;
        }
        sink.end()?;
        Ok(self.stats)
    }

    /// Stop the resolver's pending work.
    pub fn teardown(&mut self) {
        self.resolver.teardown();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/session.rs"]
mod tests;
