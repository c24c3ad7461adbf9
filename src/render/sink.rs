use std::path::PathBuf;

use anyhow::Context;

use crate::foundation::core::{Fps, FrameIndex, FrameRgba};
use crate::foundation::error::{PixliError, PixliResult};
use crate::render::fingerprint::{FrameFingerprint, fingerprint_frame};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
}

/// Consumer of presented frames.
///
/// `push_frame` is called in strictly increasing `FrameIndex` order between
/// `begin` and `end`.
pub trait FrameSink: Send {
    fn begin(&mut self, cfg: SinkConfig) -> PixliResult<()>;
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgba) -> PixliResult<()>;
    fn end(&mut self) -> PixliResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    /// Frames in presentation order.
    pub frames: Vec<(FrameIndex, FrameRgba)>,
    ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> PixliResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgba) -> PixliResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> PixliResult<()> {
        self.ended = true;
        Ok(())
    }
}

/// Writes `frame_000000.png`, `frame_000001.png`, ... into a directory.
///
/// With `skip_repeats`, a frame identical to the previous one is not written again.
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    skip_repeats: bool,
    cfg: Option<SinkConfig>,
    last: Option<FrameFingerprint>,
    written: u64,
}

impl PngSequenceSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            skip_repeats: false,
            cfg: None,
            last: None,
            written: 0,
        }
    }

    pub fn skip_repeats(mut self, on: bool) -> Self {
        self.skip_repeats = on;
        self
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn frame_path(&self, idx: FrameIndex) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", idx.0))
    }
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, cfg: SinkConfig) -> PixliResult<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output dir '{}'", self.dir.display()))?;
        self.cfg = Some(cfg);
        self.last = None;
        self.written = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgba) -> PixliResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| PixliError::evaluation("png sink received a frame before begin"))?;
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(PixliError::resource(format!(
                "frame is {}x{}, sink expects {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if self.skip_repeats {
            let fp = fingerprint_frame(frame);
            if self.last == Some(fp) {
                return Ok(());
            }
            self.last = Some(fp);
        }
        let path = self.frame_path(idx);
        image::save_buffer_with_format(
            &path,
            &frame.data,
            frame.width,
            frame.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        self.written += 1;
        Ok(())
    }

    fn end(&mut self) -> PixliResult<()> {
        tracing::info!(dir = %self.dir.display(), frames = self.written, "png sequence finished");
        Ok(())
    }
}

/// Presents every frame on a primary surface and, when attached, a mirror.
///
/// A failing mirror is detached and logged; the primary keeps running.
pub struct MirrorSink {
    primary: Box<dyn FrameSink>,
    mirror: Option<Box<dyn FrameSink>>,
}

impl std::fmt::Debug for MirrorSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorSink")
            .field("mirrored", &self.mirror.is_some())
            .finish_non_exhaustive()
    }
}

impl MirrorSink {
    pub fn new(primary: Box<dyn FrameSink>, mirror: Option<Box<dyn FrameSink>>) -> Self {
        Self { primary, mirror }
    }

    pub fn is_mirroring(&self) -> bool {
        self.mirror.is_some()
    }

    fn on_mirror(&mut self, op: impl FnOnce(&mut dyn FrameSink) -> PixliResult<()>) {
        if let Some(mirror) = self.mirror.as_deref_mut()
            && let Err(e) = op(mirror)
        {
            tracing::warn!(error = %e, "mirror output failed, detaching");
            self.mirror = None;
        }
    }
}

impl FrameSink for MirrorSink {
    fn begin(&mut self, cfg: SinkConfig) -> PixliResult<()> {
        self.primary.begin(cfg)?;
        self.on_mirror(|m| m.begin(cfg));
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgba) -> PixliResult<()> {
        self.primary.push_frame(idx, frame)?;
        self.on_mirror(|m| m.push_frame(idx, frame));
        Ok(())
    }

    fn end(&mut self) -> PixliResult<()> {
        self.primary.end()?;
        self.on_mirror(|m| m.end());
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/sink.rs"]
mod tests;
