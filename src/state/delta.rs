//! Every mutation the fan-in boundary accepts.

use crate::animation::modes::MovementMode;
use crate::foundation::error::{PixliError, PixliResult};
use crate::foundation::math::Rng64;
use crate::state::model::{
    BackgroundMode, BlendMode, CodeFunctions, EffectSettings, GeneratorState, SpriteShape,
};
use crate::state::scenes::SceneStore;

/// Numeric `[0, 100]` parameters addressable by controllers.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Param {
    MotionIntensity,
    MotionSpeed,
    HueRotationSpeed,
    PaletteVariance,
    Density,
    SpriteSize,
    BackgroundBrightness,
    NoiseStrength,
    GridBrightness,
}

impl Param {
    fn slot(self, state: &mut GeneratorState) -> &mut f64 {
        match self {
            Self::MotionIntensity => &mut state.motion_intensity,
            Self::MotionSpeed => &mut state.motion_speed,
            Self::HueRotationSpeed => &mut state.hue_rotation_speed,
            Self::PaletteVariance => &mut state.palette_variance,
            Self::Density => &mut state.density,
            Self::SpriteSize => &mut state.sprite_size,
            Self::BackgroundBrightness => &mut state.background_brightness,
            Self::NoiseStrength => &mut state.effects.noise.strength,
            Self::GridBrightness => &mut state.effects.pixelate.grid_brightness,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StateDelta {
    /// Set a `[0, 100]` parameter; out-of-range values are clamped.
    Set(Param, f64),
    MovementMode(MovementMode),
    BlendMode(BlendMode),
    PaletteId(String),
    PaletteCycling(bool),
    CodeFunctions(CodeFunctions),
    UseCustomMotion(bool),
    Effects(EffectSettings),
    Seed(String),
    LoadScene(String),
    /// 1-based preset slot.
    LoadPreset(u8),
    SequenceNext,
    SequencePrevious,
    RandomizeAll { nonce: u64 },
    /// Replace the whole state with a complete snapshot.
    Replace(Box<GeneratorState>),
}

impl StateDelta {
    /// Apply to `state`. On error `state` is left untouched.
    pub(crate) fn apply(&self, state: &mut GeneratorState, scenes: &dyn SceneStore) -> PixliResult<()> {
        match self {
            Self::Set(param, value) => {
                if !value.is_finite() {
                    return Err(PixliError::validation(format!(
                        "{param:?} value must be finite"
                    )));
                }
                *param.slot(state) = value.clamp(0.0, 100.0);
            }
            Self::MovementMode(mode) => {
                state.movement_mode = *mode;
                state.use_custom_motion = false;
            }
            Self::BlendMode(mode) => state.blend_mode = *mode,
            Self::PaletteId(id) => {
                if id.trim().is_empty() {
                    return Err(PixliError::validation("palette id must not be empty"));
                }
                state.palette_id = id.clone();
            }
            Self::PaletteCycling(on) => state.palette_cycling = *on,
            Self::CodeFunctions(code) => {
                state.code_functions = code.clone();
                if !code.has_path() {
                    state.use_custom_motion = false;
                }
            }
            Self::UseCustomMotion(on) => {
                if *on && !state.code_functions.has_path() {
                    return Err(PixliError::validation(
                        "cannot enable custom motion without path source",
                    ));
                }
                state.use_custom_motion = *on;
            }
            Self::Effects(effects) => {
                let mut next = state.clone();
                next.effects = effects.clone();
                *state = next.normalized();
            }
            Self::Seed(seed) => state.seed = seed.clone(),
            Self::LoadScene(id) => {
                let loaded = scenes
                    .load(id)
                    .ok_or_else(|| PixliError::validation(format!("unknown scene '{id}'")))?;
                *state = scene_snapshot(loaded, id)?;
            }
            Self::LoadPreset(slot) => {
                let summary = scenes.preset(*slot).ok_or_else(|| {
                    PixliError::validation(format!("preset slot {slot} is empty"))
                })?;
                let loaded = scenes.load(&summary.id).ok_or_else(|| {
                    PixliError::validation(format!("unknown scene '{}'", summary.id))
                })?;
                *state = scene_snapshot(loaded, &summary.id)?;
            }
            Self::SequenceNext | Self::SequencePrevious => {
                let list = scenes.list();
                if list.is_empty() {
                    return Err(PixliError::validation("scene sequence is empty"));
                }
                let n = list.len();
                let current = state
                    .scene_id
                    .as_deref()
                    .and_then(|id| list.iter().position(|s| s.id == id));
                let next = match (self, current) {
                    (Self::SequenceNext, Some(i)) => (i + 1) % n,
                    (Self::SequenceNext, None) => 0,
                    (_, Some(i)) => (i + n - 1) % n,
                    (_, None) => n - 1,
                };
                let id = &list[next].id;
                let loaded = scenes
                    .load(id)
                    .ok_or_else(|| PixliError::validation(format!("unknown scene '{id}'")))?;
                *state = scene_snapshot(loaded, id)?;
            }
            Self::RandomizeAll { nonce } => randomize(state, *nonce),
            Self::Replace(next) => {
                next.validate()?;
                *state = (**next).clone();
            }
        }
        Ok(())
    }
}

fn scene_snapshot(mut loaded: GeneratorState, id: &str) -> PixliResult<GeneratorState> {
    loaded.validate()?;
    loaded.scene_id = Some(id.to_owned());
    Ok(loaded)
}

fn randomize(state: &mut GeneratorState, nonce: u64) {
    let mut rng = Rng64::new(nonce);
    state.seed = format!("{:016x}", rng.next_u64());
    state.movement_mode = MovementMode::ALL[rng.index(MovementMode::ALL.len())];
    state.use_custom_motion = false;
    state.blend_mode = BlendMode::ALL[rng.index(BlendMode::ALL.len())];
    state.motion_intensity = rng.range_f64(20.0, 90.0).round();
    state.motion_speed = rng.range_f64(20.0, 80.0).round();
    state.density = rng.range_f64(15.0, 85.0).round();
    state.sprite_size = rng.range_f64(10.0, 70.0).round();
    state.palette_variance = rng.range_f64(0.0, 40.0).round();
    state.hue_shift = rng.range_f64(0.0, 360.0).round();
    state.background_mode = [
        BackgroundMode::Solid,
        BackgroundMode::Darkest,
        BackgroundMode::Black,
    ][rng.index(3)];
    state.background_color_index = rng.index(8);
    state.sprite_shape = [SpriteShape::Square, SpriteShape::Circle, SpriteShape::Diamond][rng.index(3)];
    state.scene_id = None;
}

#[cfg(test)]
#[path = "../../tests/unit/state/delta.rs"]
mod tests;
