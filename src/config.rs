//! Session configuration loaded from a JSON file.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use crate::animation::timing::CycleTiming;
use crate::expression::vm::EvalBudget;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{PixliError, PixliResult};
use crate::protocol::dmx::DmxSettings;
use crate::protocol::midi::MidiSettings;
use crate::protocol::osc::OscSettings;
use crate::protocol::websocket::WebSocketSettings;

pub const MAX_CANVAS_SIDE: u32 = 8192;
pub const MAX_FPS: f64 = 240.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SandboxSettings {
    pub max_instructions: u64,
    pub max_duration_ms: u64,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        let budget = EvalBudget::default();
        Self {
            max_instructions: budget.max_instructions,
            max_duration_ms: budget.max_duration.as_millis() as u64,
        }
    }
}

impl SandboxSettings {
    pub fn budget(&self) -> EvalBudget {
        EvalBudget {
            max_instructions: self.max_instructions,
            max_duration: Duration::from_millis(self.max_duration_ms),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PixliConfig {
    pub canvas: Canvas,
    pub fps: Fps,
    pub timing: CycleTiming,
    pub sandbox: SandboxSettings,
    pub debounce_ms: u64,
    pub websocket: WebSocketSettings,
    pub midi: MidiSettings,
    pub osc: OscSettings,
    pub dmx: DmxSettings,
}

impl Default for PixliConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas {
                width: 640,
                height: 360,
            },
            fps: Fps { num: 60, den: 1 },
            timing: CycleTiming::default(),
            sandbox: SandboxSettings::default(),
            debounce_ms: crate::animation::debounce::DEFAULT_QUIET.as_millis() as u64,
            // Network inputs stay off until a config section names them.
            websocket: WebSocketSettings {
                enabled: false,
                ..WebSocketSettings::default()
            },
            midi: MidiSettings::default(),
            osc: OscSettings {
                enabled: false,
                ..OscSettings::default()
            },
            dmx: DmxSettings::default(),
        }
    }
}

impl PixliConfig {
    pub fn from_json_str(s: &str) -> PixliResult<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> PixliResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> PixliResult<()> {
        Canvas::new(self.canvas.width, self.canvas.height)?;
        if self.canvas.width > MAX_CANVAS_SIDE || self.canvas.height > MAX_CANVAS_SIDE {
            return Err(PixliError::validation(format!(
                "canvas {}x{} exceeds {MAX_CANVAS_SIDE} per side",
                self.canvas.width, self.canvas.height
            )));
        }
        let fps = Fps::new(self.fps.num, self.fps.den)?;
        if fps.num == 0 || fps.as_f64() > MAX_FPS {
            return Err(PixliError::validation(format!(
                "fps must be in (0, {MAX_FPS}], got {}",
                fps.as_f64()
            )));
        }
        if !self.timing.duration.is_finite() || self.timing.duration <= 0.0 {
            return Err(PixliError::validation("timing.duration must be > 0"));
        }
        if self.sandbox.max_instructions == 0 || self.sandbox.max_duration_ms == 0 {
            return Err(PixliError::validation("sandbox budgets must be > 0"));
        }
        if self.websocket.enabled
            && !(self.websocket.url.starts_with("ws://") || self.websocket.url.starts_with("wss://"))
        {
            return Err(PixliError::validation(format!(
                "websocket.url must use ws:// or wss://, got '{}'",
                self.websocket.url
            )));
        }
        if self.websocket.reconnect.base_delay_ms == 0 {
            return Err(PixliError::validation("websocket.reconnect.baseDelayMs must be > 0"));
        }
        if self.dmx.universe > 0x7FFF {
            return Err(PixliError::validation(format!(
                "dmx.universe must be <= 32767, got {}",
                self.dmx.universe
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for m in &self.midi.cc_mappings {
            if m.controller > 127 {
                return Err(PixliError::validation(format!(
                    "midi controller {} out of range",
                    m.controller
                )));
            }
            if !seen.insert(m.controller) {
                return Err(PixliError::validation(format!(
                    "midi controller {} mapped twice",
                    m.controller
                )));
            }
        }
        if self.midi.preset_base_note > 127 - crate::state::scenes::PRESET_SLOTS + 1 {
            return Err(PixliError::validation("midi.presetBaseNote leaves no room for 5 slots"));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
